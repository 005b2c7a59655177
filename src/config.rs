// src/config.rs
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use log::warn;
use std::env;
use thiserror::Error;

use crate::services::loader::ColumnMapping;
use crate::services::sheets::SheetsConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    Sheets,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub storage: Storage,
    pub spreadsheet_id: Option<String>,
    pub service_account_json: Option<String>,
    pub worksheet: String,
    pub date_column: Option<String>,
    pub energy_column: Option<String>,
    pub cache_ttl_secs: i64,
    pub timezone: Tz,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            port: 3030,
            storage: Storage::Sheets,
            spreadsheet_id: None,
            service_account_json: None,
            worksheet: "solardaily".to_string(),
            date_column: None,
            energy_column: None,
            cache_ttl_secs: 300,
            timezone: chrono_tz::America::Sao_Paulo,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

impl AppConfig {
    /// Reads the configuration from the process environment (and `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        match lookup("PORT") {
            Some(port) => config.port = parse_var("PORT", port)?,
            None => warn!("$PORT not set, defaulting to {}", config.port),
        }

        if let Some(storage) = lookup("SOLAR_STORAGE") {
            config.storage = match storage.trim().to_lowercase().as_str() {
                "sheets" => Storage::Sheets,
                "memory" => Storage::Memory,
                _ => return Err(ConfigError::Invalid { name: "SOLAR_STORAGE", value: storage }),
            };
        }

        config.spreadsheet_id = lookup("GOOGLE_SHEETS_ID").filter(|v| !v.trim().is_empty());
        config.service_account_json = lookup("SERVICE_ACCOUNT_JSON").filter(|v| !v.trim().is_empty());
        if let Some(worksheet) = lookup("SOLAR_WORKSHEET").filter(|v| !v.trim().is_empty()) {
            config.worksheet = worksheet;
        }
        config.date_column = lookup("SOLAR_DATE_COLUMN").filter(|v| !v.trim().is_empty());
        config.energy_column = lookup("SOLAR_ENERGY_COLUMN").filter(|v| !v.trim().is_empty());

        if let Some(ttl) = lookup("SOLAR_CACHE_TTL_SECS") {
            config.cache_ttl_secs = parse_var("SOLAR_CACHE_TTL_SECS", ttl)?;
        }
        if let Some(tz) = lookup("SOLAR_TIMEZONE") {
            config.timezone = parse_var("SOLAR_TIMEZONE", tz)?;
        }

        Ok(config)
    }

    /// Sheets connection settings; both variables are required.
    pub fn sheets(&self) -> Result<SheetsConfig, ConfigError> {
        Ok(SheetsConfig {
            spreadsheet_id: self
                .spreadsheet_id
                .clone()
                .ok_or(ConfigError::Missing("GOOGLE_SHEETS_ID"))?,
            service_account_json_path: self
                .service_account_json
                .clone()
                .ok_or(ConfigError::Missing("SERVICE_ACCOUNT_JSON"))?,
            worksheet: self.worksheet.clone(),
        })
    }

    pub fn column_mapping(&self) -> ColumnMapping {
        ColumnMapping::with_preferred(self.date_column.as_deref(), self.energy_column.as_deref())
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs.max(0))
    }

    /// Today's date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 3030);
        assert_eq!(config.storage, Storage::Sheets);
        assert_eq!(config.worksheet, "solardaily");
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.timezone, chrono_tz::America::Sao_Paulo);
        assert!(matches!(config.sheets(), Err(ConfigError::Missing("GOOGLE_SHEETS_ID"))));
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("SOLAR_STORAGE", "Memory"),
            ("GOOGLE_SHEETS_ID", "abc"),
            ("SERVICE_ACCOUNT_JSON", "/etc/key.json"),
            ("SOLAR_WORKSHEET", "geracao"),
            ("SOLAR_DATE_COLUMN", "Dia"),
            ("SOLAR_ENERGY_COLUMN", "kWh"),
            ("SOLAR_CACHE_TTL_SECS", "60"),
            ("SOLAR_TIMEZONE", "America/Manaus"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.storage, Storage::Memory);
        let sheets = config.sheets().unwrap();
        assert_eq!(sheets.spreadsheet_id, "abc");
        assert_eq!(sheets.worksheet, "geracao");
        assert_eq!(config.column_mapping().date_aliases[0], "dia");
        assert_eq!(config.column_mapping().energy_aliases[0], "kwh");
        assert_eq!(config.cache_ttl(), chrono::Duration::seconds(60));
        assert_eq!(config.timezone, chrono_tz::America::Manaus);
    }

    #[test]
    fn rejects_bad_values() {
        let err = AppConfig::from_lookup(lookup_from(&[("PORT", "porta")])).unwrap_err();
        assert_eq!(err.to_string(), "PORT has an invalid value 'porta'");

        let err = AppConfig::from_lookup(lookup_from(&[("SOLAR_STORAGE", "s3")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SOLAR_STORAGE", .. }));

        assert!(AppConfig::from_lookup(lookup_from(&[("SOLAR_TIMEZONE", "Mars/Olympus")])).is_err());
    }
}
