// src/services/backend.rs
use anyhow::Result;
use async_trait::async_trait;

/// Row-level access to the worksheet holding the readings.
///
/// `row_number` is the 1-based worksheet row, header included.
#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// Every row, header first. Trailing empty cells may be missing.
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>>;

    async fn append_row(&self, cells: Vec<String>) -> Result<()>;

    /// Overwrites the given `(column, value)` cells of one row.
    async fn update_cells(&self, row_number: usize, cells: Vec<(usize, String)>) -> Result<()>;

    async fn delete_row(&self, row_number: usize) -> Result<()>;

    /// Human readable description for logs.
    fn describe(&self) -> String;
}
