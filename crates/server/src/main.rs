//! KICK Race Time Tracker — leaderboard and race time entry for the club
//!
//! Usage:
//!   kick-racetime serve --port 8080                     — Launch the JSON API
//!   kick-racetime leaderboard --gender Kvinde --age-group 30-39 --sort-by 5K
//!   kick-racetime submit --name "Anna" --birth-date 1990-01-01 --gender Kvinde \
//!                        --distance 10K --time 00:48:12

mod config;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use config::AppConfig;
use engine::{
    load_leaderboard, submit_race_time, AgeGroup, AgeRange, Distance, EngineError, Gender,
    GenderFilter, LeaderboardQuery, LeaderboardRow, RaceTimeSubmission, SubmissionDefaults,
};
use persistence::ClubStore;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "kick-racetime")]
#[command(about = "KICK race time tracker: club leaderboard and race time entry", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the JSON API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
    /// Print the leaderboard
    Leaderboard {
        /// Gender filter: all, Mand, Kvinde
        #[arg(long, default_value = "all")]
        gender: GenderFilter,
        /// Age group (all, <20, 20-29, 30-39, 40-49, 50-59, >59) or MIN-MAX
        #[arg(long, default_value = "all")]
        age_group: AgeRange,
        /// Sort by best time on this distance (5K, 10K, Half Marathon, Marathon)
        #[arg(long)]
        sort_by: Option<Distance>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Record a new race time
    Submit {
        /// Runner name (an existing runner with this exact name is reused)
        #[arg(long)]
        name: String,
        /// Birth date, YYYY-MM-DD (used when the runner is new)
        #[arg(long)]
        birth_date: NaiveDate,
        /// Mand or Kvinde (used when the runner is new)
        #[arg(long)]
        gender: Gender,
        /// 5K, 10K, Half Marathon or Marathon
        #[arg(long)]
        distance: Distance,
        /// Race time, HH:MM:SS
        #[arg(long)]
        time: String,
        /// Race date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        race_date: Option<NaiveDate>,
        /// Where the race was run
        #[arg(long)]
        location: Option<String>,
    },
    /// List distances, genders and age groups
    Catalog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone)]
struct AppState {
    store: Arc<dyn ClubStore>,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,engine=debug,persistence=debug,kick_racetime=debug")
    } else {
        EnvFilter::new("info,engine=info,persistence=info,kick_racetime=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Serve { host, port } => {
            cmd_serve(&host, port).await?;
        }
        Commands::Leaderboard {
            gender,
            age_group,
            sort_by,
            format,
        } => {
            let query = LeaderboardQuery {
                gender,
                age_range: Some(age_group),
                sort_by,
            };
            cmd_leaderboard(query, format).await?;
        }
        Commands::Submit {
            name,
            birth_date,
            gender,
            distance,
            time,
            race_date,
            location,
        } => {
            let submission = RaceTimeSubmission {
                name,
                birth_date,
                gender,
                distance,
                race_time: time,
                race_date,
                race_location: location,
            };
            cmd_submit(submission).await?;
        }
        Commands::Catalog => {
            println!("{}", serde_json::to_string_pretty(&catalog_json())?);
        }
    }

    Ok(())
}

// ============================================================================
// Serve command — Axum web server
// ============================================================================

async fn cmd_serve(host: &str, port: u16) -> anyhow::Result<()> {
    info!("KICK race time tracker v{} starting...", APP_VERSION);

    let config = AppConfig::from_env()?;
    let store = config.open_store().await.map_err(|e| {
        error!("Failed to open store: {}", e);
        e
    })?;

    let state = AppState { store };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(api_health))
        .route("/catalog", get(api_catalog))
        .route("/leaderboard", get(api_leaderboard))
        .route("/race-times", post(api_submit_race_time))
        .with_state(state);

    let app = Router::new().nest("/api", api_routes).layer(cors);

    let addr: std::net::SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("\n=== KICK Race Time Tracker v{} ===", APP_VERSION);
    println!("Listening on http://{}", addr);
    println!("\nEndpoints:");
    println!("  GET  /api/health              - Health check");
    println!("  GET  /api/catalog             - Distances, genders, age groups");
    println!("  GET  /api/leaderboard         - Leaderboard (?gender=&age_group=&sort_by=)");
    println!("  POST /api/race-times          - Record a race time");
    println!("\n  Store: {}", config.store_label());
    println!("\nPress Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Leaderboard command — CLI mode
// ============================================================================

async fn cmd_leaderboard(query: LeaderboardQuery, format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let store = config.open_store().await?;

    let rows = load_leaderboard(store.as_ref(), &query, today()).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => {
            println!(
                "\nFiltering by {} gender and {} age group{}.",
                query.gender,
                query.age_range.map(|r| r.to_string()).unwrap_or_else(|| "any".into()),
                query
                    .sort_by
                    .map(|d| format!(", sorted by {} race time", d))
                    .unwrap_or_default()
            );
            print_leaderboard(&rows);
        }
    }

    Ok(())
}

fn print_leaderboard(rows: &[LeaderboardRow]) {
    if rows.is_empty() {
        println!("\nNo runners match the filters.");
        return;
    }

    println!(
        "\n  {:<24} {:<7} {:>4} {:>9} {:>9} {:>14} {:>9}",
        "Name", "Gender", "Age", "5K", "10K", "Half Marathon", "Marathon"
    );
    println!("  {}", "-".repeat(82));
    for row in rows {
        let cell = |d: Distance| {
            row.time(d)
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "  {:<24} {:<7} {:>4} {:>9} {:>9} {:>14} {:>9}",
            row.name,
            row.gender,
            row.age,
            cell(Distance::FiveK),
            cell(Distance::TenK),
            cell(Distance::HalfMarathon),
            cell(Distance::Marathon),
        );
    }
}

// ============================================================================
// Submit command — CLI mode
// ============================================================================

async fn cmd_submit(submission: RaceTimeSubmission) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let store = config.open_store().await?;

    let message = record_submission(store.as_ref(), &submission, today()).await?;
    println!("{}", message);

    Ok(())
}

/// Submit one race time and describe the outcome; rejected input is an error
async fn record_submission(
    store: &dyn ClubStore,
    submission: &RaceTimeSubmission,
    today: NaiveDate,
) -> anyhow::Result<String> {
    let receipt = submit_race_time(store, submission, today).await?;
    Ok(format!(
        "Race time {} on {} for {} added successfully!{}",
        receipt.race_time,
        receipt.distance,
        receipt.runner_name,
        if receipt.new_runner { " (new runner)" } else { "" }
    ))
}

// ============================================================================
// API Handlers
// ============================================================================

type ApiResult = Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)>;

fn api_error(status: StatusCode, message: String) -> (StatusCode, Json<serde_json::Value>) {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": message,
        })),
    )
}

/// GET /api/health
async fn api_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "kick-racetime",
        "version": APP_VERSION,
    }))
}

fn catalog_json() -> serde_json::Value {
    let age_groups: Vec<serde_json::Value> = AgeGroup::ALL
        .iter()
        .map(|g| {
            let range = g.range();
            serde_json::json!({ "label": g.label(), "min": range.min, "max": range.max })
        })
        .collect();

    serde_json::json!({
        "distances": Distance::ALL,
        "genders": Gender::ALL,
        "age_groups": age_groups,
        "defaults": SubmissionDefaults::default(),
    })
}

/// GET /api/catalog — selectable values for filters and the entry form
async fn api_catalog() -> Json<serde_json::Value> {
    Json(catalog_json())
}

#[derive(Debug, Deserialize)]
struct LeaderboardParams {
    gender: Option<String>,
    age_group: Option<String>,
    sort_by: Option<String>,
}

impl LeaderboardParams {
    fn into_query(self) -> Result<LeaderboardQuery, engine::ParseError> {
        Ok(LeaderboardQuery {
            gender: self.gender.as_deref().unwrap_or("all").parse()?,
            age_range: self.age_group.as_deref().map(str::parse).transpose()?,
            sort_by: self.sort_by.as_deref().map(str::parse).transpose()?,
        })
    }
}

/// GET /api/leaderboard — best time per distance for every runner matching the filters
async fn api_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> ApiResult {
    let query = params
        .into_query()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    match load_leaderboard(state.store.as_ref(), &query, today()).await {
        Ok(rows) => Ok(Json(serde_json::json!({
            "success": true,
            "filters": {
                "gender": query.gender,
                "age_range": query.age_range,
                "sort_by": query.sort_by,
            },
            "total": rows.len(),
            "data": rows,
        }))),
        Err(e) => {
            error!("Leaderboard failed: {}", e);
            Err(api_error(
                StatusCode::BAD_GATEWAY,
                format!("Failed to build leaderboard: {}", e),
            ))
        }
    }
}

/// POST /api/race-times — record a race time, creating the runner if needed
async fn api_submit_race_time(
    State(state): State<AppState>,
    Json(submission): Json<RaceTimeSubmission>,
) -> ApiResult {
    match submit_race_time(state.store.as_ref(), &submission, today()).await {
        Ok(receipt) => Ok(Json(serde_json::json!({
            "success": true,
            "message": format!("Race time for {} added successfully!", receipt.runner_name),
            "receipt": receipt,
            "defaults": SubmissionDefaults::from(&submission),
        }))),
        Err(EngineError::Validation(e)) => {
            warn!(error = %e, "Rejected race time submission");
            Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
        }
        Err(e) => {
            error!("Race time submission failed: {}", e);
            Err(api_error(
                StatusCode::BAD_GATEWAY,
                format!("Failed to record race time: {}", e),
            ))
        }
    }
}
