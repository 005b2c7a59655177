// src/services/memory.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::services::backend::SheetBackend;

/// A worksheet kept in memory. Used for local runs without Google
/// credentials and by the tests.
pub struct MemorySheet {
    rows: RwLock<Vec<Vec<String>>>,
    offline: AtomicBool,
}

impl MemorySheet {
    pub fn new(header: &[&str]) -> Self {
        Self::with_rows(vec![header.iter().map(|h| h.to_string()).collect()])
    }

    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        MemorySheet {
            rows: RwLock::new(rows),
            offline: AtomicBool::new(false),
        }
    }

    /// Makes every call fail, as if the remote store were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.read().await.clone()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(anyhow!("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SheetBackend for MemorySheet {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>> {
        self.check_online()?;
        Ok(self.snapshot().await)
    }

    async fn append_row(&self, cells: Vec<String>) -> Result<()> {
        self.check_online()?;
        self.rows.write().await.push(cells);
        Ok(())
    }

    async fn update_cells(&self, row_number: usize, cells: Vec<(usize, String)>) -> Result<()> {
        self.check_online()?;
        let mut rows = self.rows.write().await;
        let row = row_number
            .checked_sub(1)
            .and_then(|index| rows.get_mut(index))
            .ok_or_else(|| anyhow!("row {} is out of range", row_number))?;
        for (column, value) in cells {
            if row.len() <= column {
                row.resize(column + 1, String::new());
            }
            row[column] = value;
        }
        Ok(())
    }

    async fn delete_row(&self, row_number: usize) -> Result<()> {
        self.check_online()?;
        let mut rows = self.rows.write().await;
        if row_number < 2 || row_number > rows.len() {
            return Err(anyhow!("row {} is out of range", row_number));
        }
        rows.remove(row_number - 1);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory worksheet".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn behaves_like_a_worksheet() {
        let sheet = MemorySheet::new(&["data", "gerado"]);
        sheet.append_row(vec!["01/01/2025".into(), "10".into()]).await.unwrap();
        sheet.append_row(vec!["02/01/2025".into(), "11".into()]).await.unwrap();

        sheet.update_cells(3, vec![(1, "12,5".into()), (3, "obs".into())]).await.unwrap();
        assert_eq!(sheet.snapshot().await[2], vec!["02/01/2025", "12,5", "", "obs"]);

        sheet.delete_row(2).await.unwrap();
        let rows = sheet.fetch_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "02/01/2025");

        assert!(sheet.delete_row(1).await.is_err());
        assert!(sheet.update_cells(9, vec![]).await.is_err());
    }

    #[tokio::test]
    async fn offline_sheet_fails_every_call() {
        let sheet = MemorySheet::new(&["data", "gerado"]);
        sheet.set_offline(true);
        assert!(sheet.fetch_rows().await.is_err());
        assert!(sheet.append_row(vec![]).await.is_err());
    }
}
