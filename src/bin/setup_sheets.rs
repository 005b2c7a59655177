//src/bin/setup_sheets.rs
use log::{error, info};
use solar_dashboard::config::AppConfig;
use solar_dashboard::services::sheets::SheetsStore;
use solar_dashboard::BoxError;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();

    let config = AppConfig::from_env()?;
    let store = SheetsStore::new(config.sheets()?)?;
    info!(
        "Setting up worksheet '{}' as {}",
        store.config.worksheet,
        store.service_account()
    );

    let date_header = config.date_column.as_deref().unwrap_or("data");
    let energy_header = config.energy_column.as_deref().unwrap_or("gerado");

    match store.ensure_worksheet(&[date_header, energy_header]).await {
        Ok(true) => info!("Worksheet created with header [{}, {}]", date_header, energy_header),
        Ok(false) => info!("Nothing to do"),
        Err(e) => {
            error!("Failed to set up worksheet: {:#}", e);
            error!(
                "Make sure the spreadsheet is shared with {} as an editor",
                store.service_account()
            );
            return Err(e.into());
        }
    }

    Ok(())
}
