// src/services/dashboard.rs
use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate};
use log::{error, info, warn};
use std::sync::Arc;

use crate::models::GenerationRecord;
use crate::services::backend::SheetBackend;
use crate::services::cache::TtlCache;
use crate::services::loader::{load_records, ColumnMapping, LoadError, LoadedSheet, SheetLayout};
use crate::services::locale::{format_date_br, format_decimal_comma, format_number_br};
use crate::services::session::Session;

const ROWS_KEY: &str = "rows";

/// Sheet row for a zero-based data row index (row 1 holds the header).
pub fn sheet_row_number(row_index: usize) -> usize {
    row_index + 2
}

/// Reads and writes generation records through a [`SheetBackend`], with a
/// short-lived cache of the raw rows that every successful write clears.
pub struct Dashboard {
    backend: Arc<dyn SheetBackend>,
    mapping: ColumnMapping,
    cache: TtlCache<Arc<Vec<Vec<String>>>>,
    ttl: Duration,
}

impl Dashboard {
    pub fn new(backend: Arc<dyn SheetBackend>, mapping: ColumnMapping, ttl: Duration) -> Self {
        Self::with_cache(backend, mapping, ttl, TtlCache::new())
    }

    pub fn with_cache(
        backend: Arc<dyn SheetBackend>,
        mapping: ColumnMapping,
        ttl: Duration,
        cache: TtlCache<Arc<Vec<Vec<String>>>>,
    ) -> Self {
        info!("Dashboard backed by {}", backend.describe());
        Dashboard {
            backend,
            mapping,
            cache,
            ttl,
        }
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Raw worksheet rows, header first.
    pub async fn list_all(&self) -> Result<Arc<Vec<Vec<String>>>> {
        let backend = self.backend.clone();
        self.cache
            .get_or_compute(ROWS_KEY, self.ttl, || async move {
                backend.fetch_rows().await.map(Arc::new)
            })
            .await
    }

    /// Normalized records plus the worksheet layout.
    pub async fn load_sheet(&self) -> Result<std::result::Result<LoadedSheet, LoadError>> {
        let rows = self.list_all().await?;
        Ok(load_records(&rows, &self.mapping))
    }

    /// Records for display. Failures are reported to the session and yield
    /// an empty list.
    pub async fn load(&self, session: &mut Session) -> Vec<GenerationRecord> {
        match self.load_sheet().await {
            Ok(Ok(sheet)) => sheet.records,
            Ok(Err(schema)) => {
                warn!("Worksheet schema problem: {}", schema);
                session.error(format!("Erro de configuração: {}", schema));
                Vec::new()
            }
            Err(e) => {
                error!("Failed to load records: {:#}", e);
                session.error(format!("Erro ao carregar dados: {}", e));
                Vec::new()
            }
        }
    }

    /// Drops the cached rows so the next read hits the worksheet.
    pub async fn refresh(&self) {
        self.cache.invalidate(ROWS_KEY).await;
    }

    /// Column layout (`None` for a worksheet without a header) and the
    /// number of data rows.
    async fn shape(&self) -> Result<(Option<SheetLayout>, usize)> {
        let rows = self.list_all().await?;
        let sheet = load_records(&rows, &self.mapping)?;
        Ok((sheet.layout, rows.len().saturating_sub(1)))
    }

    /// Layout for a write to the existing data row `row_index`.
    async fn existing_row(&self, row_index: usize) -> Result<SheetLayout> {
        let (layout, data_rows) = self.shape().await?;
        if row_index >= data_rows {
            return Err(anyhow!(
                "row {} does not exist (the worksheet has {} data rows)",
                row_index,
                data_rows
            ));
        }
        Ok(layout.unwrap_or_else(SheetLayout::two_column))
    }

    fn check_energy(session: &mut Session, energy_kwh: f64) -> bool {
        if energy_kwh.is_finite() && energy_kwh >= 0.0 {
            return true;
        }
        session.error(format!("Energia inválida: {} kWh", energy_kwh));
        false
    }

    /// Adds a reading. Returns whether it was saved.
    pub async fn append(&self, session: &mut Session, date: NaiveDate, energy_kwh: f64) -> bool {
        if !Self::check_energy(session, energy_kwh) {
            return false;
        }

        let result = async {
            let layout = match self.shape().await?.0 {
                Some(layout) => layout,
                None => {
                    info!("Worksheet is empty, writing the header row first");
                    self.backend.append_row(self.mapping.header_row()).await?;
                    self.refresh().await;
                    SheetLayout::two_column()
                }
            };
            let row = layout.row(format_date_br(date), format_decimal_comma(energy_kwh));
            self.backend.append_row(row).await
        }
        .await;

        match result {
            Ok(()) => {
                info!("Appended {} = {} kWh", date, energy_kwh);
                self.refresh().await;
                session.success(format!(
                    "Registro de {} salvo: {} kWh",
                    format_date_br(date),
                    format_number_br(energy_kwh, 2)
                ));
                true
            }
            Err(e) => {
                error!("Failed to append record for {}: {:#}", date, e);
                session.error(format!("Erro ao salvar: {}", e));
                false
            }
        }
    }

    /// Rewrites the data row at zero-based `row_index`.
    pub async fn update(&self, session: &mut Session, row_index: usize, date: NaiveDate, energy_kwh: f64) -> bool {
        if !Self::check_energy(session, energy_kwh) {
            return false;
        }

        let row_number = sheet_row_number(row_index);
        let result = async {
            let layout = self.existing_row(row_index).await?;
            let cells = vec![
                (layout.date_col, format_date_br(date)),
                (layout.energy_col, format_decimal_comma(energy_kwh)),
            ];
            self.backend.update_cells(row_number, cells).await
        }
        .await;

        match result {
            Ok(()) => {
                info!("Updated sheet row {} to {} = {} kWh", row_number, date, energy_kwh);
                self.refresh().await;
                session.success("Registro atualizado");
                true
            }
            Err(e) => {
                error!("Failed to update sheet row {}: {:#}", row_number, e);
                session.error(format!("Erro ao atualizar: {}", e));
                false
            }
        }
    }

    /// Removes the data row at zero-based `row_index`.
    pub async fn delete(&self, session: &mut Session, row_index: usize) -> bool {
        let row_number = sheet_row_number(row_index);
        let result = async {
            self.existing_row(row_index).await?;
            self.backend.delete_row(row_number).await
        }
        .await;

        match result {
            Ok(()) => {
                info!("Deleted sheet row {}", row_number);
                self.refresh().await;
                session.success("Registro excluído");
                true
            }
            Err(e) => {
                error!("Failed to delete sheet row {}: {:#}", row_number, e);
                session.error(format!("Erro ao excluir: {}", e));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::MemorySheet;
    use crate::services::session::NoticeLevel;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dashboard_over(sheet: Arc<MemorySheet>) -> Dashboard {
        Dashboard::new(sheet, ColumnMapping::default(), Duration::minutes(5))
    }

    #[test]
    fn row_numbers_skip_the_header() {
        assert_eq!(sheet_row_number(0), 2);
        assert_eq!(sheet_row_number(41), 43);
    }

    #[tokio::test]
    async fn append_then_reload_round_trips() {
        let sheet = Arc::new(MemorySheet::new(&["Data", "Gerado"]));
        let dashboard = dashboard_over(sheet.clone());
        let mut session = Session::new();

        assert!(dashboard.load(&mut session).await.is_empty());
        assert!(dashboard.append(&mut session, ymd(2025, 6, 1), 23.456).await);
        assert!(dashboard.append(&mut session, ymd(2025, 5, 31), 0.1 + 0.2).await);

        assert_eq!(sheet.snapshot().await[1], vec!["01/06/2025", "23,456"]);

        let records = dashboard.load(&mut session).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, ymd(2025, 5, 31));
        assert!((records[0].energy_kwh - 0.3).abs() < 0.005);
        assert_eq!(records[1].date, ymd(2025, 6, 1));
        assert!((records[1].energy_kwh - 23.456).abs() < 0.005);
        assert_eq!(records[1].source_row, Some(0));

        let notices = session.take_notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.level == NoticeLevel::Success));
    }

    #[tokio::test]
    async fn writes_land_in_mapped_columns() {
        let sheet = Arc::new(MemorySheet::with_rows(vec![
            vec!["obs".into(), "gerado".into(), "data".into()],
            vec!["".into(), "5".into(), "01/01/2025".into()],
        ]));
        let dashboard = dashboard_over(sheet.clone());
        let mut session = Session::new();

        assert!(dashboard.update(&mut session, 0, ymd(2025, 1, 2), 7.5).await);
        assert!(dashboard.append(&mut session, ymd(2025, 1, 3), 8.0).await);

        let rows = sheet.snapshot().await;
        assert_eq!(rows[1], vec!["", "7,5", "02/01/2025"]);
        assert_eq!(rows[2], vec!["", "8", "03/01/2025"]);
    }

    #[tokio::test]
    async fn writes_invalidate_the_cache() {
        let sheet = Arc::new(MemorySheet::new(&["data", "gerado"]));
        let dashboard = dashboard_over(sheet.clone());
        let mut session = Session::new();

        dashboard.append(&mut session, ymd(2025, 1, 1), 10.0).await;
        assert_eq!(dashboard.load(&mut session).await.len(), 1);

        // out-of-band change stays hidden behind the cache
        sheet.append_row(vec!["02/01/2025".into(), "3".into()]).await.unwrap();
        assert_eq!(dashboard.load(&mut session).await.len(), 1);

        assert!(dashboard.delete(&mut session, 0).await);
        let records = dashboard.load(&mut session).await;
        assert_eq!(records, vec![GenerationRecord::new(ymd(2025, 1, 2), 3.0).at_row(0)]);
    }

    #[tokio::test]
    async fn failures_report_false_with_a_notice() {
        let sheet = Arc::new(MemorySheet::new(&["data", "gerado"]));
        let dashboard = dashboard_over(sheet.clone());
        let mut session = Session::new();

        sheet.set_offline(true);
        assert!(!dashboard.append(&mut session, ymd(2025, 1, 1), 1.0).await);
        assert!(!dashboard.update(&mut session, 0, ymd(2025, 1, 1), 1.0).await);
        assert!(!dashboard.delete(&mut session, 0).await);
        assert!(dashboard.load(&mut session).await.is_empty());

        let notices = session.take_notices();
        assert_eq!(notices.len(), 4);
        assert!(notices.iter().all(|n| n.level == NoticeLevel::Error));
    }

    #[tokio::test]
    async fn rejects_negative_energy_without_touching_the_sheet() {
        let sheet = Arc::new(MemorySheet::new(&["data", "gerado"]));
        let dashboard = dashboard_over(sheet.clone());
        let mut session = Session::new();

        assert!(!dashboard.append(&mut session, ymd(2025, 1, 1), -2.0).await);
        assert!(!dashboard.append(&mut session, ymd(2025, 1, 1), f64::NAN).await);
        assert_eq!(sheet.snapshot().await.len(), 1);
        assert_eq!(session.take_notices().len(), 2);
    }

    #[tokio::test]
    async fn schema_errors_surface_and_block_writes() {
        let sheet = Arc::new(MemorySheet::new(&["dia", "kwh"]));
        let dashboard = dashboard_over(sheet.clone());
        let mut session = Session::new();

        assert!(dashboard.load(&mut session).await.is_empty());
        assert!(!dashboard.append(&mut session, ymd(2025, 1, 1), 1.0).await);

        let notices = session.take_notices();
        assert_eq!(notices.len(), 2);
        assert!(notices[0].message.contains("configuração"));
        assert_eq!(sheet.snapshot().await.len(), 1);
    }

    /// Accepts writes to any row, like the Sheets grid does.
    struct LooseSheet {
        rows: Vec<Vec<String>>,
        writes: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl SheetBackend for LooseSheet {
        async fn fetch_rows(&self) -> Result<Vec<Vec<String>>> {
            Ok(self.rows.clone())
        }

        async fn append_row(&self, _cells: Vec<String>) -> Result<()> {
            Ok(())
        }

        async fn update_cells(&self, row_number: usize, _cells: Vec<(usize, String)>) -> Result<()> {
            self.writes.lock().unwrap().push(row_number);
            Ok(())
        }

        async fn delete_row(&self, row_number: usize) -> Result<()> {
            self.writes.lock().unwrap().push(row_number);
            Ok(())
        }

        fn describe(&self) -> String {
            "loose sheet".to_string()
        }
    }

    #[tokio::test]
    async fn edits_past_the_last_data_row_fail() {
        let sheet = Arc::new(LooseSheet {
            rows: vec![
                vec!["data".into(), "gerado".into()],
                vec!["01/01/2025".into(), "5".into()],
            ],
            writes: std::sync::Mutex::new(Vec::new()),
        });
        let dashboard = Dashboard::new(sheet.clone(), ColumnMapping::default(), Duration::minutes(5));
        let mut session = Session::new();

        assert!(!dashboard.update(&mut session, 500, ymd(2025, 1, 2), 1.0).await);
        assert!(!dashboard.delete(&mut session, 1).await);
        assert!(sheet.writes.lock().unwrap().is_empty());

        let notices = session.take_notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.level == NoticeLevel::Error));

        assert!(dashboard.delete(&mut session, 0).await);
        assert_eq!(*sheet.writes.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn first_append_to_a_blank_sheet_writes_the_header() {
        let sheet = Arc::new(MemorySheet::with_rows(Vec::new()));
        let dashboard = dashboard_over(sheet.clone());
        let mut session = Session::new();

        assert!(dashboard.append(&mut session, ymd(2025, 1, 1), 10.0).await);

        let rows = sheet.snapshot().await;
        assert_eq!(rows, vec![vec!["data", "gerado"], vec!["01/01/2025", "10"]]);
        let records = dashboard.load(&mut session).await;
        assert_eq!(records, vec![GenerationRecord::new(ymd(2025, 1, 1), 10.0).at_row(0)]);
    }
}
