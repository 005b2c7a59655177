// src/models.rs
use serde::{Serialize, Deserialize};
use chrono::NaiveDate;

/// One day of generation, as read back from the worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub date: NaiveDate,
    pub energy_kwh: f64,
    /// Zero-based position of the source row among the worksheet's data rows.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_row: Option<usize>,
}

impl GenerationRecord {
    pub fn new(date: NaiveDate, energy_kwh: f64) -> Self {
        GenerationRecord {
            date,
            energy_kwh,
            source_row: None,
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.source_row = Some(row);
        self
    }
}

/// Body of record create/edit requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordInput {
    pub date: NaiveDate,
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayValue {
    pub date: NaiveDate,
    pub energy_kwh: f64,
}
