//! Supabase store — the hosted PostgREST backend
//!
//! Uses `<project>/rest/v1/<table>` with the project's anon key. Name lookups use
//! PostgREST's `column=eq.value` syntax; gender lists use an `or=(...)` of
//! case-insensitive `ilike` matches. Inserts ask for the inserted row back.

use crate::repository::{MemberRecord, NewMemberRecord, NewRaceTimeRecord, RaceTimeRecord};
use crate::schema::{MEMBERS_TABLE, RACE_TIMES_TABLE};
use crate::store::ClubStore;
use crate::{DbError, DbResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const REST_PATH: &str = "rest/v1";
const MEMBER_COLUMNS: &str = "id,name,birth_date,gender";
const RACE_TIME_COLUMNS: &str = "id,runner_id,race_distance,race_time,race_date,race_location";

/// PostgREST client for the club's Supabase project
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
}

/// PostgREST equality filter value
fn eq_filter(value: &str) -> String {
    format!("eq.{}", value)
}

/// `or` filter matching `column` against any of `values`, ignoring case.
/// `ilike` without wildcards is a case-insensitive equality.
fn any_ilike_filter(column: &str, values: &[&str]) -> String {
    let terms: Vec<String> = values
        .iter()
        .map(|value| format!("{}.ilike.{}", column, value.trim().to_lowercase()))
        .collect();
    format!("({})", terms.join(","))
}

impl SupabaseStore {
    pub fn new(project_url: &str, api_key: &str) -> DbResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: format!("{}/{}", project_url.trim_end_matches('/'), REST_PATH),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn get(&self, table: &str) -> RequestBuilder {
        self.client
            .get(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn post(&self, table: &str) -> RequestBuilder {
        self.client
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
    }

    fn members_request(&self, genders: Option<&[&str]>) -> RequestBuilder {
        let request = self.get(MEMBERS_TABLE).query(&[("select", MEMBER_COLUMNS)]);
        match genders {
            Some(genders) => request.query(&[("or", any_ilike_filter("gender", genders))]),
            None => request,
        }
    }

    fn member_by_name_request(&self, name: &str) -> RequestBuilder {
        self.get(MEMBERS_TABLE).query(&[
            ("select", MEMBER_COLUMNS.to_string()),
            ("name", eq_filter(name)),
            ("order", "id.asc".to_string()),
            ("limit", "1".to_string()),
        ])
    }

    async fn send(request: RequestBuilder, what: &str) -> DbResult<Response> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DbError::Remote(format!("{} failed with {}: {}", what, status, body)));
        }
        Ok(resp)
    }

    async fn insert_one<T, R>(&self, table: &str, row: &T) -> DbResult<R>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let resp = Self::send(self.post(table).json(row), table).await?;
        let rows: Vec<R> = resp.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::Remote(format!("insert into {} returned no row", table)))
    }
}

#[async_trait]
impl ClubStore for SupabaseStore {
    async fn list_members(&self, genders: Option<&[&str]>) -> DbResult<Vec<MemberRecord>> {
        if genders.is_some_and(|genders| genders.is_empty()) {
            return Ok(Vec::new());
        }
        debug!(?genders, "Fetching members");

        let request = self.members_request(genders);
        let members: Vec<MemberRecord> = Self::send(request, MEMBERS_TABLE).await?.json().await?;
        debug!(count = members.len(), "Members fetched");
        Ok(members)
    }

    async fn list_race_times(&self) -> DbResult<Vec<RaceTimeRecord>> {
        let request = self
            .get(RACE_TIMES_TABLE)
            .query(&[("select", RACE_TIME_COLUMNS)]);
        debug!("Fetching race times");

        let times: Vec<RaceTimeRecord> = Self::send(request, RACE_TIMES_TABLE).await?.json().await?;
        debug!(count = times.len(), "Race times fetched");
        Ok(times)
    }

    async fn find_member_by_name(&self, name: &str) -> DbResult<Option<MemberRecord>> {
        let request = self.member_by_name_request(name);
        let members: Vec<MemberRecord> = Self::send(request, MEMBERS_TABLE).await?.json().await?;
        Ok(members.into_iter().next())
    }

    async fn insert_member(&self, member: &NewMemberRecord) -> DbResult<MemberRecord> {
        debug!(name = %member.name, "Inserting member");
        self.insert_one(MEMBERS_TABLE, member).await
    }

    async fn insert_race_time(&self, race_time: &NewRaceTimeRecord) -> DbResult<RaceTimeRecord> {
        debug!(
            runner_id = race_time.runner_id,
            distance = %race_time.race_distance,
            "Inserting race time"
        );
        self.insert_one(RACE_TIMES_TABLE, race_time).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn query_of(request: &reqwest::Request) -> HashMap<String, String> {
        request.url().query_pairs().into_owned().collect()
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw).to_lowercase();
        let Some(head_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..head_end]
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= head_end + 4 + content_length
    }

    /// Answer a single HTTP request with `status` and `body`, handing back the raw request text
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&raw) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    /// Decoded query parameters from the request line of a raw request
    fn query_of_raw(raw: &str) -> HashMap<String, String> {
        let target = raw.split_whitespace().nth(1).unwrap();
        Url::parse(&format!("http://stub{}", target))
            .unwrap()
            .query_pairs()
            .into_owned()
            .collect()
    }

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let store = SupabaseStore::new("https://club.supabase.co/", "anon").unwrap();
        assert_eq!(
            store.table_url(MEMBERS_TABLE),
            "https://club.supabase.co/rest/v1/members_dim"
        );
    }

    #[test]
    fn test_eq_filter() {
        assert_eq!(eq_filter("Kvinde"), "eq.Kvinde");
        assert_eq!(eq_filter("Morten Westergaard"), "eq.Morten Westergaard");
    }

    #[test]
    fn test_any_ilike_filter() {
        assert_eq!(
            any_ilike_filter("gender", &["Mand", "male", " M "]),
            "(gender.ilike.mand,gender.ilike.male,gender.ilike.m)"
        );
    }

    #[test]
    fn test_members_request_filters_every_spelling() {
        let store = SupabaseStore::new("https://club.supabase.co", "anon").unwrap();

        let request = store
            .members_request(Some(&["mand", "male", "m"]))
            .build()
            .unwrap();
        let query = query_of(&request);
        assert_eq!(request.url().path(), "/rest/v1/members_dim");
        assert_eq!(query["select"], MEMBER_COLUMNS);
        assert_eq!(
            query["or"],
            "(gender.ilike.mand,gender.ilike.male,gender.ilike.m)"
        );
        assert_eq!(request.headers()["apikey"], "anon");
        assert_eq!(request.headers()["authorization"], "Bearer anon");

        let unfiltered = store.members_request(None).build().unwrap();
        assert!(!query_of(&unfiltered).contains_key("or"));
    }

    #[test]
    fn test_member_by_name_request_uses_first_exact_match() {
        let store = SupabaseStore::new("https://club.supabase.co", "anon").unwrap();
        let request = store.member_by_name_request("Anna Holm").build().unwrap();
        let query = query_of(&request);
        assert_eq!(query["name"], "eq.Anna Holm");
        assert_eq!(query["order"], "id.asc");
        assert_eq!(query["limit"], "1");
    }

    #[test]
    fn test_post_asks_for_inserted_row() {
        let store = SupabaseStore::new("https://club.supabase.co", "anon").unwrap();
        let request = store.post(RACE_TIMES_TABLE).build().unwrap();
        assert_eq!(*request.method(), reqwest::Method::POST);
        assert_eq!(request.headers()["prefer"], "return=representation");
        assert_eq!(request.headers()["apikey"], "anon");
    }

    #[tokio::test]
    async fn test_list_members_sends_gender_filter() {
        let (url, server) = serve_once(
            "200 OK",
            r#"[{"id": 3, "name": "Legacy", "birth_date": "1980-02-02", "gender": "male"}]"#,
        )
        .await;
        let store = SupabaseStore::new(&url, "anon").unwrap();

        let members = store.list_members(Some(&["mand", "male"])).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].gender, "male");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /rest/v1/members_dim?"));
        assert_eq!(
            query_of_raw(&raw)["or"],
            "(gender.ilike.mand,gender.ilike.male)"
        );
    }

    #[tokio::test]
    async fn test_empty_spelling_list_skips_request() {
        let store = SupabaseStore::new("http://127.0.0.1:9", "anon").unwrap();
        let none: [&str; 0] = [];
        assert!(store.list_members(Some(&none)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_status_becomes_remote_error() {
        let (url, server) = serve_once(
            "401 Unauthorized",
            r#"{"message":"Invalid API key"}"#,
        )
        .await;
        let store = SupabaseStore::new(&url, "wrong").unwrap();

        let err = store.list_race_times().await.unwrap_err();
        match err {
            DbError::Remote(msg) => {
                assert!(msg.starts_with("race_times_fact failed with 401"), "{}", msg);
                assert!(msg.contains("Invalid API key"), "{}", msg);
            }
            other => panic!("expected Remote error, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_returns_first_row() {
        let (url, server) = serve_once(
            "201 Created",
            r#"[{"id": 11, "runner_id": 3, "race_distance": "10K", "race_time": "00:45:00", "race_date": "2026-10-19", "race_location": null}]"#,
        )
        .await;
        let store = SupabaseStore::new(&url, "anon").unwrap();

        let row = store
            .insert_race_time(&NewRaceTimeRecord {
                runner_id: 3,
                race_distance: "10K".to_string(),
                race_time: "00:45:00".to_string(),
                race_date: Some("2026-10-19".to_string()),
                race_location: None,
            })
            .await
            .unwrap();
        assert_eq!(row.id, Some(11));

        let raw = server.await.unwrap();
        let lowered = raw.to_lowercase();
        assert!(raw.starts_with("POST /rest/v1/race_times_fact"));
        assert!(lowered.contains("prefer: return=representation"));
        assert!(raw.contains(r#""race_distance":"10K""#));
    }

    #[tokio::test]
    async fn test_insert_without_returned_row_is_an_error() {
        let (url, server) = serve_once("201 Created", "[]").await;
        let store = SupabaseStore::new(&url, "anon").unwrap();

        let err = store
            .insert_member(&NewMemberRecord {
                name: "Anna".to_string(),
                birth_date: "1990-01-01".to_string(),
                gender: "Kvinde".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Remote(msg) if msg.contains("returned no row")));
        server.await.unwrap();
    }

    #[test]
    fn test_member_row_deserializes_from_postgrest_json() {
        let json = r#"[{"id": 7, "name": "A", "birth_date": "1990-01-01", "gender": "Mand"}]"#;
        let rows: Vec<MemberRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(rows[0].id, 7);
        assert_eq!(rows[0].gender, "Mand");
    }

    #[test]
    fn test_race_time_row_tolerates_missing_metadata() {
        let json = r#"{"runner_id": 1, "race_distance": "5K", "race_time": "00:30:00"}"#;
        let row: RaceTimeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(row.id, None);
        assert_eq!(row.race_location, None);
    }
}
