//! Race time submission: read-or-create the runner, then append the result
//!
//! The two writes are not wrapped in a transaction. An interruption between
//! them can leave a new runner without a race time.

use crate::age::DATE_FORMAT;
use crate::error::{EngineResult, ValidationError};
use crate::types::{Distance, Gender, RaceTime};
use chrono::NaiveDate;
use persistence::{ClubStore, NewMemberRecord, NewRaceTimeRecord};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A race time as entered on the submission form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceTimeSubmission {
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub distance: Distance,
    /// `HH:MM:SS` exactly as typed
    pub race_time: String,
    #[serde(default)]
    pub race_date: Option<NaiveDate>,
    #[serde(default)]
    pub race_location: Option<String>,
}

impl RaceTimeSubmission {
    /// Check the form before anything is written; returns the parsed time
    pub fn validate(&self) -> Result<RaceTime, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        self.race_time
            .parse()
            .map_err(|_| ValidationError::RaceTimeFormat(self.race_time.clone()))
    }

    fn location(&self) -> Option<String> {
        self.race_location
            .as_deref()
            .map(str::trim)
            .filter(|loc| !loc.is_empty())
            .map(str::to_string)
    }
}

/// What was written for one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub runner_id: i64,
    pub runner_name: String,
    /// True when the submission created the runner
    pub new_runner: bool,
    pub race_time_id: Option<i64>,
    pub distance: Distance,
    pub race_time: RaceTime,
    pub race_date: NaiveDate,
}

/// Form pre-fill carried from one submission to the next.
///
/// Held by the caller for the duration of a session; nothing is cached
/// process-wide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDefaults {
    pub name: Option<String>,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub distance: Distance,
}

impl Default for SubmissionDefaults {
    fn default() -> Self {
        Self {
            name: None,
            birth_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            gender: Gender::Mand,
            distance: Distance::FiveK,
        }
    }
}

impl From<&RaceTimeSubmission> for SubmissionDefaults {
    fn from(submission: &RaceTimeSubmission) -> Self {
        Self {
            name: Some(submission.name.trim().to_string()),
            birth_date: submission.birth_date,
            gender: submission.gender,
            distance: submission.distance,
        }
    }
}

/// Record a race time.
///
/// The runner is looked up by exact name. A match is treated as the same
/// runner even when the submitted birth date or gender differ.
pub async fn submit_race_time<S>(
    store: &S,
    submission: &RaceTimeSubmission,
    today: NaiveDate,
) -> EngineResult<SubmissionReceipt>
where
    S: ClubStore + ?Sized,
{
    let race_time = submission.validate()?;
    let name = submission.name.trim();
    let birth_date = submission.birth_date.format(DATE_FORMAT).to_string();

    let (runner_id, new_runner) = match store.find_member_by_name(name).await? {
        Some(existing) => {
            if existing.birth_date != birth_date || existing.gender != submission.gender.label() {
                warn!(
                    runner_id = existing.id,
                    name,
                    stored_birth_date = %existing.birth_date,
                    submitted_birth_date = %birth_date,
                    "Name matches an existing runner with different details, using existing runner"
                );
            }
            (existing.id, false)
        }
        None => {
            let created = store
                .insert_member(&NewMemberRecord {
                    name: name.to_string(),
                    birth_date,
                    gender: submission.gender.label().to_string(),
                })
                .await?;
            info!(runner_id = created.id, name, "Registered new runner");
            (created.id, true)
        }
    };

    let race_date = submission.race_date.unwrap_or(today);
    let record = store
        .insert_race_time(&NewRaceTimeRecord {
            runner_id,
            race_distance: submission.distance.label().to_string(),
            race_time: race_time.to_string(),
            race_date: Some(race_date.format(DATE_FORMAT).to_string()),
            race_location: submission.location(),
        })
        .await?;

    info!(
        runner_id,
        distance = %submission.distance,
        time = %race_time,
        "Race time recorded"
    );

    Ok(SubmissionReceipt {
        runner_id,
        runner_name: name.to_string(),
        new_runner,
        race_time_id: record.id,
        distance: submission.distance,
        race_time,
        race_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use persistence::Database;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn submission(name: &str, time: &str) -> RaceTimeSubmission {
        RaceTimeSubmission {
            name: name.into(),
            birth_date: date(1990, 1, 1),
            gender: Gender::Kvinde,
            distance: Distance::TenK,
            race_time: time.into(),
            race_date: Some(date(2026, 9, 1)),
            race_location: None,
        }
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            submission("Anna", "00:48:12").validate().unwrap().to_string(),
            "00:48:12"
        );
        assert_eq!(
            submission("  ", "00:48:12").validate(),
            Err(ValidationError::EmptyName)
        );
        assert_eq!(
            submission("Anna", "48:12").validate(),
            Err(ValidationError::RaceTimeFormat("48:12".into()))
        );
    }

    #[tokio::test]
    async fn test_submit_creates_runner_then_reuses_by_name() {
        let db = Database::in_memory().await.unwrap();
        let today = date(2026, 10, 19);

        let first = submit_race_time(&db, &submission("Anna", "00:48:12"), today)
            .await
            .unwrap();
        assert!(first.new_runner);

        let second = submit_race_time(&db, &submission(" Anna ", "0:47:30"), today)
            .await
            .unwrap();
        assert!(!second.new_runner);
        assert_eq!(second.runner_id, first.runner_id);

        assert_eq!(db.list_members(None).await.unwrap().len(), 1);
        let times = db.list_race_times().await.unwrap();
        assert_eq!(times.len(), 2);
        assert_eq!(times[1].race_time, "00:47:30");
        assert_eq!(times[1].race_distance, "10K");
    }

    #[tokio::test]
    async fn test_submit_existing_name_with_different_details_is_not_an_error() {
        let db = Database::in_memory().await.unwrap();
        let today = date(2026, 10, 19);
        submit_race_time(&db, &submission("Bo", "00:40:00"), today)
            .await
            .unwrap();

        let mut other = submission("Bo", "00:45:00");
        other.birth_date = date(1975, 3, 3);
        other.gender = Gender::Mand;
        let receipt = submit_race_time(&db, &other, today).await.unwrap();

        assert!(!receipt.new_runner);
        let members = db.list_members(None).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].birth_date, "1990-01-01");
    }

    #[tokio::test]
    async fn test_submit_invalid_time_writes_nothing() {
        let db = Database::in_memory().await.unwrap();
        let result = submit_race_time(&db, &submission("Anna", "fast"), date(2026, 10, 19)).await;

        assert!(matches!(
            result,
            Err(EngineError::Validation(ValidationError::RaceTimeFormat(_)))
        ));
        assert!(db.list_members(None).await.unwrap().is_empty());
        assert!(db.list_race_times().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_defaults_race_date_and_trims_location() {
        let db = Database::in_memory().await.unwrap();
        let today = date(2026, 10, 19);
        let mut form = submission("Carl", "03:59:59");
        form.distance = Distance::Marathon;
        form.race_date = None;
        form.race_location = Some("  Berlin ".into());

        let receipt = submit_race_time(&db, &form, today).await.unwrap();
        assert_eq!(receipt.race_date, today);

        let stored = &db.list_race_times().await.unwrap()[0];
        assert_eq!(stored.race_date.as_deref(), Some("2026-10-19"));
        assert_eq!(stored.race_location.as_deref(), Some("Berlin"));
        assert_eq!(stored.race_distance, "Marathon");
    }

    #[test]
    fn test_defaults_follow_last_submission() {
        let defaults = SubmissionDefaults::default();
        assert_eq!(defaults.birth_date, date(2000, 1, 1));
        assert_eq!(defaults.name, None);

        let next = SubmissionDefaults::from(&submission(" Anna ", "00:48:12"));
        assert_eq!(next.name.as_deref(), Some("Anna"));
        assert_eq!(next.gender, Gender::Kvinde);
        assert_eq!(next.distance, Distance::TenK);
    }
}
