// src/state.rs
use anyhow::Result;
use chrono::NaiveDate;
use log::info;
use std::sync::Arc;

use crate::config::{AppConfig, Storage};
use crate::services::backend::SheetBackend;
use crate::services::dashboard::Dashboard;
use crate::services::memory::MemorySheet;
use crate::services::session::SessionRegistry;
use crate::services::sheets::SheetsStore;

pub type Today = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Everything the handlers share.
pub struct AppState {
    pub dashboard: Dashboard,
    pub sessions: SessionRegistry,
    today: Today,
}

impl AppState {
    pub fn new(dashboard: Dashboard, today: Today) -> Self {
        AppState {
            dashboard,
            sessions: SessionRegistry::new(),
            today,
        }
    }

    /// Wires the configured backend into a ready-to-serve state.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let backend: Arc<dyn SheetBackend> = match config.storage {
            Storage::Sheets => Arc::new(SheetsStore::new(config.sheets()?)?),
            Storage::Memory => {
                info!("Using an in-memory worksheet; data is lost on restart");
                Arc::new(MemorySheet::new(&["data", "gerado"]))
            }
        };

        let dashboard = Dashboard::new(backend, config.column_mapping(), config.cache_ttl());
        let config = config.clone();
        Ok(AppState::new(dashboard, Arc::new(move || config.today())))
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }
}
