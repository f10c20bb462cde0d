//! # warden-store
//!
//! Persistence for Warden: the WhatsApp auth-state key-value store and the
//! per-user warning counters. Two interchangeable backends:
//! - [`SqliteStore`]: local SQLite file
//! - [`RestStore`]: hosted PostgREST endpoint (Supabase-compatible)

pub mod rest;
pub mod sqlite;

pub use rest::RestStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;
use tracing::info;
use warden_core::{
    config::{StoreBackend, StoreConfig},
    error::WardenError,
    traits::{KeyValueStore, WarningStore},
};

/// Both stores, backed by the same configured backend.
#[derive(Clone)]
pub struct Stores {
    pub sessions: Arc<dyn KeyValueStore>,
    pub warnings: Arc<dyn WarningStore>,
}

/// Open the configured backend.
pub async fn open(config: &StoreConfig) -> Result<Stores, WardenError> {
    match config.backend {
        StoreBackend::Sqlite => {
            let store = Arc::new(SqliteStore::new(&config.db_path).await?);
            Ok(Stores {
                sessions: store.clone(),
                warnings: store,
            })
        }
        StoreBackend::Rest => {
            let store = Arc::new(RestStore::new(&config.url, &config.api_key)?);
            info!("Using REST store at {}", store.base_url());
            Ok(Stores {
                sessions: store.clone(),
                warnings: store,
            })
        }
    }
}
