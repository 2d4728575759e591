//! Error types for the race time engine

use persistence::DbError;
use thiserror::Error;

/// A value from user input or a store record that is outside its closed set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown gender '{0}' (expected Mand or Kvinde)")]
    Gender(String),

    #[error("unknown race distance '{0}' (expected 5K, 10K, Half Marathon or Marathon)")]
    Distance(String),

    #[error("invalid race time '{0}' (expected HH:MM:SS)")]
    RaceTime(String),

    #[error("invalid age range '{0}'")]
    AgeRange(String),

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    Date(String),
}

/// Reasons a race time submission is rejected before anything is written
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Wrong time format '{0}'. Please enter the time as HH:MM:SS")]
    RaceTimeFormat(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid submission: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] DbError),
}

pub type EngineResult<T> = Result<T, EngineError>;
