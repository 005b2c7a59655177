use log::{error, info};
use solar_dashboard::config::AppConfig;
use solar_dashboard::services::aggregation::{available_years, summarize};
use solar_dashboard::services::backend::SheetBackend;
use solar_dashboard::services::loader::load_records;
use solar_dashboard::services::locale::{format_date_br, format_number_br};
use solar_dashboard::services::sheets::SheetsStore;
use solar_dashboard::BoxError;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();

    info!("Testing Google Sheets connectivity and data reading...");

    let config = AppConfig::from_env()?;
    let store = SheetsStore::new(config.sheets()?)?;

    let rows = match store.fetch_rows().await {
        Ok(rows) => {
            info!("✓ Read {} rows from {}", rows.len(), store.describe());
            rows
        }
        Err(e) => {
            error!("✗ Failed to read worksheet: {:#}", e);
            return Err(e.into());
        }
    };

    let sheet = load_records(&rows, &config.column_mapping())?;
    let summary = summarize(&sheet.records);
    info!("  Valid records: {} ({} rows dropped)", sheet.records.len(), sheet.dropped_rows);
    info!("  Years: {:?}", available_years(&sheet.records));
    info!("  Total: {} kWh", format_number_br(summary.total_kwh, 2));
    info!("  Daily average: {} kWh", format_number_br(summary.mean_kwh, 2));
    if let Some(best) = summary.best_day {
        info!("  Best day: {} ({} kWh)", format_date_br(best.date), format_number_br(best.energy_kwh, 2));
    }

    Ok(())
}
