//! Database schema definitions
//!
//! Table and column names match the hosted store so both backends share
//! the same record types.

pub const MEMBERS_TABLE: &str = "members_dim";
pub const RACE_TIMES_TABLE: &str = "race_times_fact";

/// SQL to create all tables
/// NOTE: dates and race times are stored as TEXT (`YYYY-MM-DD`, `HH:MM:SS`)
pub const CREATE_TABLES: &str = r#"
-- Registered runners
CREATE TABLE IF NOT EXISTS members_dim (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    birth_date TEXT NOT NULL,
    gender TEXT NOT NULL,
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- One row per submitted race time
CREATE TABLE IF NOT EXISTS race_times_fact (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    runner_id INTEGER NOT NULL REFERENCES members_dim(id),
    race_distance TEXT NOT NULL,
    race_time TEXT NOT NULL,
    race_date TEXT,
    race_location TEXT,
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- ========== INDEXES ==========

CREATE INDEX IF NOT EXISTS idx_members_name ON members_dim(name);
CREATE INDEX IF NOT EXISTS idx_members_gender ON members_dim(gender);
CREATE INDEX IF NOT EXISTS idx_race_times_runner ON race_times_fact(runner_id, race_distance)
"#;
