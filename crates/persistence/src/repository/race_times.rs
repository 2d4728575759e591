//! Race times repository — append-only race results

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A race result as stored in `race_times_fact`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RaceTimeRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub runner_id: i64,
    pub race_distance: String,
    /// `HH:MM:SS`
    pub race_time: String,
    #[serde(default)]
    pub race_date: Option<String>,
    #[serde(default)]
    pub race_location: Option<String>,
}

/// Insert payload; the id is generated by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRaceTimeRecord {
    pub runner_id: i64,
    pub race_distance: String,
    pub race_time: String,
    pub race_date: Option<String>,
    pub race_location: Option<String>,
}

/// Repository for race results
pub struct RaceTimeRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RaceTimeRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Every race result, in insertion order
    pub async fn list(&self) -> DbResult<Vec<RaceTimeRecord>> {
        let records = sqlx::query_as::<_, RaceTimeRecord>(
            r#"SELECT id, runner_id, race_distance, race_time, race_date, race_location
               FROM race_times_fact
               ORDER BY id"#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    pub async fn insert(&self, race_time: &NewRaceTimeRecord) -> DbResult<RaceTimeRecord> {
        let result = sqlx::query(
            r#"INSERT INTO race_times_fact
                (runner_id, race_distance, race_time, race_date, race_location)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(race_time.runner_id)
        .bind(&race_time.race_distance)
        .bind(&race_time.race_time)
        .bind(&race_time.race_date)
        .bind(&race_time.race_location)
        .execute(self.pool)
        .await?;

        Ok(RaceTimeRecord {
            id: Some(result.last_insert_rowid()),
            runner_id: race_time.runner_id,
            race_distance: race_time.race_distance.clone(),
            race_time: race_time.race_time.clone(),
            race_date: race_time.race_date.clone(),
            race_location: race_time.race_location.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemberRepository, NewMemberRecord};
    use crate::Database;

    async fn seed_runner(db: &Database) -> i64 {
        MemberRepository::new(db.pool())
            .insert(&NewMemberRecord {
                name: "Anna".into(),
                birth_date: "1990-01-01".into(),
                gender: "Kvinde".into(),
            })
            .await
            .unwrap()
            .id
    }

    fn new_time(runner_id: i64, distance: &str, time: &str) -> NewRaceTimeRecord {
        NewRaceTimeRecord {
            runner_id,
            race_distance: distance.into(),
            race_time: time.into(),
            race_date: Some("2024-05-01".into()),
            race_location: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::in_memory().await.unwrap();
        let runner = seed_runner(&db).await;
        let repo = RaceTimeRepository::new(db.pool());

        repo.insert(&new_time(runner, "5K", "00:25:10")).await.unwrap();
        repo.insert(&new_time(runner, "5K", "00:24:59")).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].race_time, "00:25:10");
        assert_eq!(all[1].race_date.as_deref(), Some("2024-05-01"));
        assert!(all.iter().all(|row| row.runner_id == runner));
    }

    #[tokio::test]
    async fn test_insert_rejects_unknown_runner() {
        let db = Database::in_memory().await.unwrap();
        let repo = RaceTimeRepository::new(db.pool());

        let result = repo.insert(&new_time(42, "10K", "00:50:00")).await;
        assert!(result.is_err());
    }
}
