// src/services/sheets.rs

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::services::backend::SheetBackend;
use crate::services::google_oauth::{ServiceAccountKey, TokenProvider};

pub const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

#[derive(Clone, Debug)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub service_account_json_path: String,
    pub worksheet: String,
}

/// The daily generation worksheet in Google Sheets.
pub struct SheetsStore {
    pub config: SheetsConfig,
    api_base: String,
    client: Client,
    tokens: TokenProvider,
    sheet_id: Mutex<Option<i64>>,
}

/// Column letter for a zero-based index: 0 → A, 25 → Z, 26 → AA.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Sheet name quoted for A1 notation, `'It''s'` style.
pub fn quoted_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Converts the `values` array of a Sheets response into strings.
pub fn rows_from_values(response: &Value) -> Vec<Vec<String>> {
    response["values"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| {
                            cells
                                .iter()
                                .map(|cell| match cell {
                                    Value::String(s) => s.clone(),
                                    Value::Null => String::new(),
                                    other => other.to_string(),
                                })
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

impl SheetsStore {
    pub fn new(config: SheetsConfig) -> Result<Self> {
        let key = ServiceAccountKey::from_file(&config.service_account_json_path)?;
        Ok(Self::with_key(config, key, SHEETS_API))
    }

    /// Store talking to `api_base` (the `.../v4/spreadsheets/` root), with
    /// tokens exchanged at the key's `token_uri`.
    pub fn with_key(config: SheetsConfig, key: ServiceAccountKey, api_base: &str) -> Self {
        let client = Client::new();
        let tokens = TokenProvider::new(key, client.clone());
        SheetsStore {
            config,
            api_base: api_base.to_string(),
            client,
            tokens,
            sheet_id: Mutex::new(None),
        }
    }

    pub async fn get_auth_token(&self) -> Result<String> {
        self.tokens.token().await
    }

    pub fn service_account(&self) -> &str {
        self.tokens.service_account()
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| anyhow!("invalid Sheets API base url"))?;
            path.pop_if_empty().push(&self.config.spreadsheet_id);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// `POST {spreadsheet}:suffix` style url, e.g. `:batchUpdate`.
    fn spreadsheet_method_url(&self, method: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("invalid Sheets API base url"))?
            .pop_if_empty()
            .push(&format!("{}:{}", self.config.spreadsheet_id, method));
        Ok(url)
    }

    async fn checked(&self, response: reqwest::Response, action: &str) -> Result<Value> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.reset().await;
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Failed to {}: {} - {}", action, status, error_text));
        }
        Ok(response.json().await.unwrap_or(Value::Null))
    }

    /// Spreadsheet metadata: titles and ids of all worksheets.
    pub async fn worksheets(&self) -> Result<Vec<(String, i64)>> {
        let token = self.get_auth_token().await?;
        let mut url = self.url(&[])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");

        let response = self.client.get(url).bearer_auth(token).send().await?;
        let metadata = self.checked(response, "read spreadsheet metadata").await?;

        Ok(metadata["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|sheet| {
                        let props = &sheet["properties"];
                        Some((props["title"].as_str()?.to_string(), props["sheetId"].as_i64()?))
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn worksheet_id(&self) -> Result<i64> {
        let mut cached = self.sheet_id.lock().await;
        if let Some(id) = *cached {
            return Ok(id);
        }

        let id = self
            .worksheets()
            .await?
            .into_iter()
            .find(|(title, _)| *title == self.config.worksheet)
            .map(|(_, id)| id)
            .ok_or_else(|| anyhow!("worksheet '{}' does not exist in the spreadsheet", self.config.worksheet))?;
        *cached = Some(id);
        Ok(id)
    }

    /// Creates the worksheet with `headers` in row 1 unless it already exists.
    /// Returns whether anything was created.
    pub async fn ensure_worksheet(&self, headers: &[&str]) -> Result<bool> {
        let exists = self
            .worksheets()
            .await?
            .iter()
            .any(|(title, _)| *title == self.config.worksheet);
        if exists {
            info!("Worksheet '{}' already exists", self.config.worksheet);
            return Ok(false);
        }

        info!("Creating worksheet '{}'...", self.config.worksheet);
        let token = self.get_auth_token().await?;
        let body = json!({
            "requests": [{
                "addSheet": { "properties": { "title": self.config.worksheet } }
            }]
        });
        let response = self
            .client
            .post(self.spreadsheet_method_url("batchUpdate")?)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        self.checked(response, "create worksheet").await?;

        let range = format!(
            "{}!A1:{}1",
            quoted_sheet(&self.config.worksheet),
            column_letter(headers.len().saturating_sub(1))
        );
        let mut url = self.url(&["values", &range])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let response = self
            .client
            .put(url)
            .bearer_auth(&token)
            .json(&json!({ "values": [headers] }))
            .send()
            .await?;
        self.checked(response, "write header row").await?;
        Ok(true)
    }
}

#[async_trait]
impl SheetBackend for SheetsStore {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>> {
        let token = self.get_auth_token().await?;
        let range = quoted_sheet(&self.config.worksheet);
        let url = self.url(&["values", &range])?;

        let response = self.client.get(url).bearer_auth(token).send().await?;
        let body = self
            .checked(response, "read worksheet")
            .await
            .with_context(|| format!("reading worksheet '{}'", self.config.worksheet))?;

        let rows = rows_from_values(&body);
        debug!("Fetched {} rows from '{}'", rows.len(), self.config.worksheet);
        Ok(rows)
    }

    async fn append_row(&self, cells: Vec<String>) -> Result<()> {
        let token = self.get_auth_token().await?;
        let range = format!("{}!A1:append", quoted_sheet(&self.config.worksheet));
        let mut url = self.url(&["values", &range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "values": [cells] }))
            .send()
            .await?;
        let body = self.checked(response, "append row").await?;
        info!("append_row updated range: {}", body["updates"]["updatedRange"]);
        Ok(())
    }

    async fn update_cells(&self, row_number: usize, cells: Vec<(usize, String)>) -> Result<()> {
        let token = self.get_auth_token().await?;
        let sheet = quoted_sheet(&self.config.worksheet);
        let data: Vec<Value> = cells
            .into_iter()
            .map(|(column, value)| {
                json!({
                    "range": format!("{}!{}{}", sheet, column_letter(column), row_number),
                    "values": [[value]],
                })
            })
            .collect();

        let url = self.url(&["values:batchUpdate"])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "valueInputOption": "USER_ENTERED", "data": data }))
            .send()
            .await?;
        let body = self.checked(response, "update row").await?;
        info!("update_cells response: {} cells updated", body["totalUpdatedCells"]);
        Ok(())
    }

    async fn delete_row(&self, row_number: usize) -> Result<()> {
        if row_number < 2 {
            return Err(anyhow!("refusing to delete header row {}", row_number));
        }
        let sheet_id = self.worksheet_id().await?;
        let token = self.get_auth_token().await?;

        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row_number - 1,
                        "endIndex": row_number,
                    }
                }
            }]
        });
        let response = self
            .client
            .post(self.spreadsheet_method_url("batchUpdate")?)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        self.checked(response, "delete row").await?;
        info!("Deleted row {} of '{}'", row_number, self.config.worksheet);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Google Sheets {}/{}", self.config.spreadsheet_id, self.config.worksheet)
    }
}
