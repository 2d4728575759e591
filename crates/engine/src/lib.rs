//! KICK race time engine — leaderboard building and race time entry
//!
//! Provides:
//! - Age derivation from birth dates
//! - Best-time reduction, per-distance pivot and member join (the leaderboard)
//! - Race time submission against any `ClubStore`

pub mod age;
pub mod error;
pub mod leaderboard;
pub mod submission;
pub mod types;

// Re-exports for convenience
pub use age::{age_on, parse_date, DATE_FORMAT};
pub use error::{EngineError, EngineResult, ParseError, ValidationError};
pub use leaderboard::{
    best_times, build_leaderboard, filter_by_age, load_leaderboard, pivot_best_times,
    sort_by_distance, BestTimes, LeaderboardQuery, LeaderboardRow,
};
pub use submission::{submit_race_time, RaceTimeSubmission, SubmissionDefaults, SubmissionReceipt};
pub use types::*;
