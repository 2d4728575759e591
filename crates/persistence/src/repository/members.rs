//! Members repository — registered runners

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A runner as stored in `members_dim`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MemberRecord {
    pub id: i64,
    pub name: String,
    /// `YYYY-MM-DD`
    pub birth_date: String,
    pub gender: String,
}

/// Insert payload; the id is generated by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMemberRecord {
    pub name: String,
    pub birth_date: String,
    pub gender: String,
}

/// Repository for runner records
pub struct MemberRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MemberRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// All members, optionally restricted to any of the given gender spellings.
    /// Matching ignores case and surrounding whitespace.
    pub async fn list(&self, genders: Option<&[&str]>) -> DbResult<Vec<MemberRecord>> {
        let Some(genders) = genders else {
            let records = sqlx::query_as::<_, MemberRecord>(
                "SELECT id, name, birth_date, gender FROM members_dim ORDER BY id",
            )
            .fetch_all(self.pool)
            .await?;
            return Ok(records);
        };

        if genders.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (1..=genders.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT id, name, birth_date, gender FROM members_dim \
             WHERE lower(trim(gender)) IN ({}) ORDER BY id",
            placeholders.join(", ")
        );

        let mut query = sqlx::query_as::<_, MemberRecord>(&sql);
        for gender in genders {
            query = query.bind(gender.trim().to_lowercase());
        }

        Ok(query.fetch_all(self.pool).await?)
    }

    /// First member with exactly this name (lowest id wins)
    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<MemberRecord>> {
        let record = sqlx::query_as::<_, MemberRecord>(
            "SELECT id, name, birth_date, gender FROM members_dim WHERE name = ?1 ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    pub async fn insert(&self, member: &NewMemberRecord) -> DbResult<MemberRecord> {
        let result = sqlx::query(
            "INSERT INTO members_dim (name, birth_date, gender) VALUES (?1, ?2, ?3)",
        )
        .bind(&member.name)
        .bind(&member.birth_date)
        .bind(&member.gender)
        .execute(self.pool)
        .await?;

        Ok(MemberRecord {
            id: result.last_insert_rowid(),
            name: member.name.clone(),
            birth_date: member.birth_date.clone(),
            gender: member.gender.clone(),
        })
    }
}
