//! Domain types: runners, race results, distances and leaderboard filters

use crate::age::parse_date;
use crate::error::{EngineError, ParseError};
use chrono::NaiveDate;
use persistence::{MemberRecord, RaceTimeRecord};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

/// Gender class as stored in `members_dim.gender`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Gender {
    Mand,
    Kvinde,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Mand, Gender::Kvinde];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Mand => "Mand",
            Self::Kvinde => "Kvinde",
        }
    }

    /// Every lowercase spelling read as this gender, canonical label first
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            Self::Mand => &["mand", "male", "m"],
            Self::Kvinde => &["kvinde", "female", "k", "f"],
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Gender {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|gender| gender.spellings().iter().any(|spelling| *spelling == wanted))
            .ok_or_else(|| ParseError::Gender(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Distance
// ---------------------------------------------------------------------------

/// Race distance, declared in canonical leaderboard column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Distance {
    #[serde(rename = "5K")]
    FiveK,
    #[serde(rename = "10K")]
    TenK,
    #[serde(rename = "Half Marathon")]
    HalfMarathon,
    Marathon,
}

impl Distance {
    pub const ALL: [Distance; 4] = [
        Distance::FiveK,
        Distance::TenK,
        Distance::HalfMarathon,
        Distance::Marathon,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::FiveK => "5K",
            Self::TenK => "10K",
            Self::HalfMarathon => "Half Marathon",
            Self::Marathon => "Marathon",
        }
    }

    /// Position in `Distance::ALL`
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Distance {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect();
        match normalized.as_str() {
            "5k" | "5" => Ok(Self::FiveK),
            "10k" | "10" => Ok(Self::TenK),
            "halfmarathon" | "half" => Ok(Self::HalfMarathon),
            "marathon" => Ok(Self::Marathon),
            _ => Err(ParseError::Distance(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Distance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// RaceTime
// ---------------------------------------------------------------------------

/// Elapsed race time with whole-second precision.
///
/// Parsed from `H:MM:SS` or `HH:MM:SS` (hours 0-23) and always rendered as
/// fixed-width `HH:MM:SS`, so ordering never depends on string comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RaceTime {
    seconds: u32,
}

impl RaceTime {
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Option<Self> {
        if hours > 23 || minutes > 59 || seconds > 59 {
            return None;
        }
        Some(Self {
            seconds: hours * 3600 + minutes * 60 + seconds,
        })
    }

    pub fn as_seconds(&self) -> u32 {
        self.seconds
    }
}

impl fmt::Display for RaceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.seconds / 3600,
            (self.seconds / 60) % 60,
            self.seconds % 60
        )
    }
}

impl FromStr for RaceTime {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::RaceTime(s.to_string());

        let parts: Vec<&str> = s.trim().split(':').collect();
        let [hours, minutes, seconds] = parts.as_slice() else {
            return Err(invalid());
        };

        let field = |text: &str, min_len: usize| -> Option<u32> {
            if text.len() < min_len || text.len() > 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            text.parse().ok()
        };

        let (Some(h), Some(m), Some(sec)) = (field(*hours, 1), field(*minutes, 2), field(*seconds, 2))
        else {
            return Err(invalid());
        };

        Self::from_hms(h, m, sec).ok_or_else(invalid)
    }
}

impl Serialize for RaceTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RaceTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Gender selector for the leaderboard; pushed down to the member query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenderFilter {
    #[default]
    All,
    Only(Gender),
}

impl GenderFilter {
    /// Spellings for the store's case-insensitive gender filter, `None` when unfiltered
    pub fn store_spellings(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::All => None,
            Self::Only(gender) => Some(gender.spellings()),
        }
    }

    pub fn matches(&self, gender: Gender) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == gender,
        }
    }
}

impl fmt::Display for GenderFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(gender) => fmt::Display::fmt(gender, f),
        }
    }
}

impl FromStr for GenderFilter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" | "alle" => Ok(Self::All),
            _ => s.parse().map(Self::Only),
        }
    }
}

impl Serialize for GenderFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Inclusive age bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, age: u32) -> bool {
        self.min <= age && age <= self.max
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Accepts a preset label (`all`, `<20`, `30-39`, `>59`, ...) or `MIN-MAX`
impl FromStr for AgeRange {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(group) = s.parse::<AgeGroup>() {
            return Ok(group.range());
        }

        let invalid = || ParseError::AgeRange(s.to_string());
        let (min, max) = s.trim().split_once('-').ok_or_else(invalid)?;
        let min: u32 = min.trim().parse().map_err(|_| invalid())?;
        let max: u32 = max.trim().parse().map_err(|_| invalid())?;
        if min > max {
            return Err(invalid());
        }
        Ok(Self::new(min, max))
    }
}

/// Age group presets offered by the leaderboard filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeGroup {
    All,
    Under20,
    Twenties,
    Thirties,
    Forties,
    Fifties,
    Over59,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 7] = [
        AgeGroup::All,
        AgeGroup::Under20,
        AgeGroup::Twenties,
        AgeGroup::Thirties,
        AgeGroup::Forties,
        AgeGroup::Fifties,
        AgeGroup::Over59,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Under20 => "<20",
            Self::Twenties => "20-29",
            Self::Thirties => "30-39",
            Self::Forties => "40-49",
            Self::Fifties => "50-59",
            Self::Over59 => ">59",
        }
    }

    pub fn range(&self) -> AgeRange {
        match self {
            Self::All => AgeRange::new(0, 200),
            Self::Under20 => AgeRange::new(0, 19),
            Self::Twenties => AgeRange::new(20, 29),
            Self::Thirties => AgeRange::new(30, 39),
            Self::Forties => AgeRange::new(40, 49),
            Self::Fifties => AgeRange::new(50, 59),
            Self::Over59 => AgeRange::new(60, 200),
        }
    }
}

impl FromStr for AgeGroup {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        let wanted = if wanted == "alle" { "all".to_string() } else { wanted };
        Self::ALL
            .into_iter()
            .find(|group| group.label() == wanted)
            .ok_or_else(|| ParseError::AgeRange(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Runners and results
// ---------------------------------------------------------------------------

/// A registered runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
}

impl TryFrom<MemberRecord> for Member {
    type Error = EngineError;

    fn try_from(record: MemberRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            birth_date: parse_date(&record.birth_date)?,
            gender: record.gender.parse()?,
            name: record.name,
        })
    }
}

/// One timed performance by a runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceResult {
    pub runner_id: i64,
    pub distance: Distance,
    pub time: RaceTime,
    pub race_date: Option<NaiveDate>,
    pub race_location: Option<String>,
}

impl TryFrom<RaceTimeRecord> for RaceResult {
    type Error = EngineError;

    fn try_from(record: RaceTimeRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            runner_id: record.runner_id,
            distance: record.race_distance.parse()?,
            time: record.race_time.parse()?,
            race_date: record.race_date.as_deref().map(parse_date).transpose()?,
            race_location: record.race_location,
        })
    }
}
