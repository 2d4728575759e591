//! Repository implementations for database operations

pub mod members;
pub mod race_times;

pub use members::*;
pub use race_times::*;
