//! Runtime configuration, read from the environment (and `.env` via dotenvy)

use anyhow::{bail, Context};
use persistence::{ClubStore, Database, SupabaseStore};
use std::sync::Arc;
use tracing::info;

const DEFAULT_DB_PATH: &str = "data/racetimes.db";

/// Which backend holds members and race times
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Local SQLite file
    Sqlite { path: String },
    /// Hosted Supabase project
    Supabase { url: String, key: String },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreConfig,
}

impl AppConfig {
    /// Read `KICK_STORE`, `KICK_DB_PATH`, `SUPABASE_URL` and `SUPABASE_KEY`
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let backend = lookup("KICK_STORE").unwrap_or_else(|| "sqlite".to_string());

        let store = match backend.trim().to_lowercase().as_str() {
            "sqlite" => StoreConfig::Sqlite {
                path: lookup("KICK_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            },
            "supabase" => StoreConfig::Supabase {
                url: lookup("SUPABASE_URL").context("SUPABASE_URL must be set when KICK_STORE=supabase")?,
                key: lookup("SUPABASE_KEY").context("SUPABASE_KEY must be set when KICK_STORE=supabase")?,
            },
            other => bail!("Unknown KICK_STORE '{}' (expected sqlite or supabase)", other),
        };

        Ok(Self { store })
    }

    /// Human-readable store location for startup banners
    pub fn store_label(&self) -> String {
        match &self.store {
            StoreConfig::Sqlite { path } => format!("sqlite ({})", path),
            StoreConfig::Supabase { url, .. } => format!("supabase ({})", url),
        }
    }

    /// Open the configured store
    pub async fn open_store(&self) -> anyhow::Result<Arc<dyn ClubStore>> {
        let store: Arc<dyn ClubStore> = match &self.store {
            StoreConfig::Sqlite { path } => {
                let db = Database::new(path)
                    .await
                    .map_err(|e| anyhow::anyhow!("Database initialization failed: {}", e))?;
                Arc::new(db)
            }
            StoreConfig::Supabase { url, key } => Arc::new(SupabaseStore::new(url, key)?),
        };
        info!("Store ready: {}", self.store_label());
        Ok(store)
    }
}
