// src/services/loader.rs
use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::models::GenerationRecord;
use crate::services::locale::{parse_date, parse_decimal};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("worksheet must contain a '{expected}' column (accepted headers: {accepted}; found: {found})")]
    MissingColumn {
        expected: &'static str,
        accepted: String,
        found: String,
    },
}

/// Which worksheet headers hold the date and the generated amount.
///
/// Headers are compared after trimming and lowercasing.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pub date_aliases: Vec<String>,
    pub energy_aliases: Vec<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        ColumnMapping {
            date_aliases: vec!["data".to_string(), "date".to_string()],
            energy_aliases: vec!["gerado".to_string(), "generated".to_string()],
        }
    }
}

impl ColumnMapping {
    /// Puts `date`/`energy` in front of the default aliases.
    pub fn with_preferred(date: Option<&str>, energy: Option<&str>) -> Self {
        let mut mapping = ColumnMapping::default();
        if let Some(date) = date {
            mapping.date_aliases.insert(0, normalize_header(date));
        }
        if let Some(energy) = energy {
            mapping.energy_aliases.insert(0, normalize_header(energy));
        }
        mapping
    }

    /// Header of a new worksheet, in [`SheetLayout::two_column`] order.
    pub fn header_row(&self) -> Vec<String> {
        let first = |aliases: &[String], fallback: &str| {
            aliases.first().cloned().unwrap_or_else(|| fallback.to_string())
        };
        vec![first(&self.date_aliases[..], "data"), first(&self.energy_aliases[..], "gerado")]
    }

    /// Finds the column positions for `header`.
    pub fn resolve(&self, header: &[String]) -> Result<SheetLayout, LoadError> {
        let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();

        let find = |aliases: &[String], expected: &'static str| {
            aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias))
                .ok_or_else(|| LoadError::MissingColumn {
                    expected,
                    accepted: aliases.join(", "),
                    found: normalized.join(", "),
                })
        };

        Ok(SheetLayout {
            date_col: find(&self.date_aliases[..], "date")?,
            energy_col: find(&self.energy_aliases[..], "generated amount")?,
            width: header.len(),
        })
    }
}

/// Resolved column positions of a worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SheetLayout {
    pub date_col: usize,
    pub energy_col: usize,
    pub width: usize,
}

impl SheetLayout {
    /// Layout of a freshly created worksheet: `data | gerado`.
    pub fn two_column() -> Self {
        SheetLayout {
            date_col: 0,
            energy_col: 1,
            width: 2,
        }
    }

    /// A full row with `date` and `energy` in their columns.
    pub fn row(&self, date: String, energy: String) -> Vec<String> {
        let width = self.width.max(self.date_col.max(self.energy_col) + 1);
        let mut cells = vec![String::new(); width];
        cells[self.date_col] = date;
        cells[self.energy_col] = energy;
        cells
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadedSheet {
    pub layout: Option<SheetLayout>,
    pub records: Vec<GenerationRecord>,
    pub dropped_rows: usize,
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Turns raw worksheet rows (header first) into clean records.
///
/// The result is sorted by date with one record per date; when a date
/// repeats the row that appears last in the sheet wins.
pub fn load_records(rows: &[Vec<String>], mapping: &ColumnMapping) -> Result<LoadedSheet, LoadError> {
    let Some((header, data)) = rows.split_first() else {
        return Ok(LoadedSheet::default());
    };

    let layout = mapping.resolve(header)?;

    let mut records = Vec::with_capacity(data.len());
    let mut dropped_rows = 0;
    for (row_index, row) in data.iter().enumerate() {
        match parse_row(row, &layout) {
            Some(record) => records.push(record.at_row(row_index)),
            None => dropped_rows += 1,
        }
    }

    if dropped_rows > 0 {
        debug!("Dropped {} unparseable worksheet rows", dropped_rows);
    }

    // stable sort keeps sheet order among equal dates
    records.sort_by_key(|r| r.date);
    let mut deduped: Vec<GenerationRecord> = Vec::with_capacity(records.len());
    for record in records {
        match deduped.last_mut() {
            Some(last) if last.date == record.date => *last = record,
            _ => deduped.push(record),
        }
    }

    Ok(LoadedSheet {
        layout: Some(layout),
        records: deduped,
        dropped_rows,
    })
}

fn parse_row(row: &[String], layout: &SheetLayout) -> Option<GenerationRecord> {
    let date = parse_date(row.get(layout.date_col)?)?;
    let energy = parse_decimal(row.get(layout.energy_col)?)?;
    if energy < 0.0 {
        return None;
    }
    Some(GenerationRecord::new(date, energy))
}
