//! Leaderboard Builder — best time per runner and distance, one row per runner
//!
//! Pipeline: age enrichment → age filter → best-time reduction → pivot to one
//! cell per distance → left join onto the filtered members.

use crate::age::age_on;
use crate::error::EngineResult;
use crate::types::{AgeRange, Distance, Gender, GenderFilter, Member, RaceResult, RaceTime};
use chrono::NaiveDate;
use persistence::ClubStore;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Best time per distance for one runner, indexed by `Distance::index`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BestTimes([Option<RaceTime>; 4]);

impl BestTimes {
    pub fn get(&self, distance: Distance) -> Option<RaceTime> {
        self.0[distance.index()]
    }
}

/// A member with their age on the render date
#[derive(Debug, Clone, Copy)]
pub struct AgedMember<'a> {
    pub member: &'a Member,
    pub age: u32,
}

/// One leaderboard line. Serializes in display column order:
/// name, gender, age, then every distance in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    #[serde(skip)]
    pub runner_id: i64,
    pub name: String,
    pub gender: Gender,
    pub age: u32,
    #[serde(rename = "5K")]
    pub five_k: Option<RaceTime>,
    #[serde(rename = "10K")]
    pub ten_k: Option<RaceTime>,
    #[serde(rename = "Half Marathon")]
    pub half_marathon: Option<RaceTime>,
    #[serde(rename = "Marathon")]
    pub marathon: Option<RaceTime>,
}

impl LeaderboardRow {
    fn new(aged: AgedMember<'_>, times: BestTimes) -> Self {
        Self {
            runner_id: aged.member.id,
            name: aged.member.name.clone(),
            gender: aged.member.gender,
            age: aged.age,
            five_k: times.get(Distance::FiveK),
            ten_k: times.get(Distance::TenK),
            half_marathon: times.get(Distance::HalfMarathon),
            marathon: times.get(Distance::Marathon),
        }
    }

    pub fn time(&self, distance: Distance) -> Option<RaceTime> {
        match distance {
            Distance::FiveK => self.five_k,
            Distance::TenK => self.ten_k,
            Distance::HalfMarathon => self.half_marathon,
            Distance::Marathon => self.marathon,
        }
    }
}

/// Filters for one leaderboard render
#[derive(Debug, Clone, Default)]
pub struct LeaderboardQuery {
    pub gender: GenderFilter,
    pub age_range: Option<AgeRange>,
    pub sort_by: Option<Distance>,
}

// ---------------------------------------------------------------------------
// Transformation steps
// ---------------------------------------------------------------------------

/// Attach ages and keep members inside the inclusive range.
/// `None` keeps everyone.
pub fn filter_by_age(
    members: &[Member],
    age_range: Option<AgeRange>,
    today: NaiveDate,
) -> Vec<AgedMember<'_>> {
    members
        .iter()
        .map(|member| AgedMember {
            member,
            age: age_on(member.birth_date, today),
        })
        .filter(|aged| age_range.map_or(true, |range| range.contains(aged.age)))
        .collect()
}

/// Keep every result whose time equals the minimum for its (runner, distance).
///
/// Ties are all retained; input order is preserved.
pub fn best_times(results: &[RaceResult]) -> Vec<&RaceResult> {
    let mut minimum: HashMap<(i64, Distance), RaceTime> = HashMap::new();
    for result in results {
        minimum
            .entry((result.runner_id, result.distance))
            .and_modify(|best| {
                if result.time < *best {
                    *best = result.time;
                }
            })
            .or_insert(result.time);
    }

    results
        .iter()
        .filter(|r| minimum.get(&(r.runner_id, r.distance)) == Some(&r.time))
        .collect()
}

/// Reshape reduced results into one `BestTimes` per runner.
///
/// When a (runner, distance) cell is already filled the first value wins.
pub fn pivot_best_times<'a>(
    reduced: impl IntoIterator<Item = &'a RaceResult>,
) -> HashMap<i64, BestTimes> {
    let mut table: HashMap<i64, BestTimes> = HashMap::new();
    for result in reduced {
        let cell = &mut table.entry(result.runner_id).or_default().0[result.distance.index()];
        match *cell {
            Some(kept) => debug!(
                runner_id = result.runner_id,
                distance = %result.distance,
                kept = %kept,
                dropped = %result.time,
                "Duplicate best time collapsed"
            ),
            None => *cell = Some(result.time),
        }
    }
    table
}

/// Build the leaderboard from already-fetched members and results.
///
/// Every member inside `age_range` appears exactly once, in input order,
/// with empty cells for distances they have no result for.
pub fn build_leaderboard(
    members: &[Member],
    results: &[RaceResult],
    age_range: Option<AgeRange>,
    today: NaiveDate,
) -> Vec<LeaderboardRow> {
    let eligible = filter_by_age(members, age_range, today);
    let best = pivot_best_times(best_times(results));

    eligible
        .into_iter()
        .map(|aged| {
            let times = best.get(&aged.member.id).copied().unwrap_or_default();
            LeaderboardRow::new(aged, times)
        })
        .collect()
}

/// Stable ascending sort on one distance; runners without a time go last
pub fn sort_by_distance(rows: &mut [LeaderboardRow], distance: Distance) {
    rows.sort_by_key(|row| match row.time(distance) {
        Some(time) => (false, time),
        None => (true, RaceTime::default()),
    });
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Fetch members and race times once, then build the leaderboard.
///
/// Store failures and malformed member records are returned as errors.
/// Race time records that cannot be read are skipped.
pub async fn load_leaderboard<S>(
    store: &S,
    query: &LeaderboardQuery,
    today: NaiveDate,
) -> EngineResult<Vec<LeaderboardRow>>
where
    S: ClubStore + ?Sized,
{
    info!(gender = %query.gender, age_range = ?query.age_range, "Building leaderboard");

    let member_records = store.list_members(query.gender.store_spellings()).await?;
    let race_records = store.list_race_times().await?;

    let mut members = member_records
        .into_iter()
        .map(Member::try_from)
        .collect::<EngineResult<Vec<_>>>()?;
    members.retain(|member| query.gender.matches(member.gender));

    let results: Vec<RaceResult> = race_records
        .into_iter()
        .filter_map(|record| {
            let id = record.id;
            match RaceResult::try_from(record) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!(id = ?id, error = %e, "Skipping unreadable race time");
                    None
                }
            }
        })
        .collect();

    let mut rows = build_leaderboard(&members, &results, query.age_range, today);
    if let Some(distance) = query.sort_by {
        sort_by_distance(&mut rows, distance);
    }

    info!(
        members = members.len(),
        results = results.len(),
        rows = rows.len(),
        "Leaderboard built"
    );
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
