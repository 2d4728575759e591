//! Store-client handle shared by the leaderboard and the submission flow

use crate::repository::{
    MemberRecord, MemberRepository, NewMemberRecord, NewRaceTimeRecord, RaceTimeRecord,
    RaceTimeRepository,
};
use crate::{Database, DbResult};
use async_trait::async_trait;

/// Read and append operations against the club's member and race time tables.
///
/// Implementations are injected into the engine; nothing in this trait keeps
/// state between calls.
#[async_trait]
pub trait ClubStore: Send + Sync {
    /// Members, restricted to those whose stored gender equals one of
    /// `genders` (ignoring case) when set
    async fn list_members(&self, genders: Option<&[&str]>) -> DbResult<Vec<MemberRecord>>;

    /// Every race result
    async fn list_race_times(&self) -> DbResult<Vec<RaceTimeRecord>>;

    /// First member whose name matches exactly
    async fn find_member_by_name(&self, name: &str) -> DbResult<Option<MemberRecord>>;

    /// Insert a member and return it with its generated id
    async fn insert_member(&self, member: &NewMemberRecord) -> DbResult<MemberRecord>;

    /// Append a race result and return it with its generated id
    async fn insert_race_time(&self, race_time: &NewRaceTimeRecord) -> DbResult<RaceTimeRecord>;
}

#[async_trait]
impl ClubStore for Database {
    async fn list_members(&self, genders: Option<&[&str]>) -> DbResult<Vec<MemberRecord>> {
        MemberRepository::new(self.pool()).list(genders).await
    }

    async fn list_race_times(&self) -> DbResult<Vec<RaceTimeRecord>> {
        RaceTimeRepository::new(self.pool()).list().await
    }

    async fn find_member_by_name(&self, name: &str) -> DbResult<Option<MemberRecord>> {
        MemberRepository::new(self.pool()).find_by_name(name).await
    }

    async fn insert_member(&self, member: &NewMemberRecord) -> DbResult<MemberRecord> {
        MemberRepository::new(self.pool()).insert(member).await
    }

    async fn insert_race_time(&self, race_time: &NewRaceTimeRecord) -> DbResult<RaceTimeRecord> {
        RaceTimeRepository::new(self.pool()).insert(race_time).await
    }
}
