//! Sheets v4 `values` client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;

use super::{GoogleError, TokenProvider};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Spreadsheet operations the sheet-backed task store relies on.
///
/// Ranges use A1 notation (`'Tasks'!A2`). Reads return unformatted values as
/// strings; writes take JSON values so numbers and booleans keep their type.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Titles of all worksheets in the spreadsheet.
    async fn worksheet_titles(&self) -> Result<Vec<String>, GoogleError>;

    async fn add_worksheet(&self, title: &str) -> Result<(), GoogleError>;

    /// All rows in `range`; trailing empty cells are omitted.
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, GoogleError>;

    /// Append one row after the last row of the table in `range`.
    async fn append_row(&self, range: &str, row: Vec<serde_json::Value>) -> Result<(), GoogleError>;

    /// Overwrite cells starting at the top-left of `range`.
    async fn update_values(
        &self,
        range: &str,
        rows: Vec<Vec<serde_json::Value>>,
    ) -> Result<(), GoogleError>;
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// REST client for one spreadsheet.
pub struct GoogleSheetsClient {
    http: Client,
    tokens: Arc<TokenProvider>,
    spreadsheet_id: String,
}

impl GoogleSheetsClient {
    pub fn new(tokens: Arc<TokenProvider>, spreadsheet_id: &str) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            tokens,
            spreadsheet_id: spreadsheet_id.to_string(),
        }
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/{}", SHEETS_API_BASE, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/values/{}{}",
            self.spreadsheet_url(),
            urlencoding::encode(range),
            suffix
        )
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<serde_json::Value>,
    ) -> Result<String, GoogleError> {
        let token = self.tokens.access_token().await?;
        let mut req = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| GoogleError::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GoogleError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(GoogleError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn worksheet_titles(&self) -> Result<Vec<String>, GoogleError> {
        let url = format!("{}?fields=sheets.properties.title", self.spreadsheet_url());
        let text = self.send(Method::GET, url, None).await?;
        let meta: SpreadsheetMeta =
            serde_json::from_str(&text).map_err(|e| GoogleError::Parse(e.to_string()))?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|s| s.properties.title)
            .collect())
    }

    async fn add_worksheet(&self, title: &str) -> Result<(), GoogleError> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let body = serde_json::json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        self.send(Method::POST, url, Some(body)).await?;
        Ok(())
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, GoogleError> {
        let url = self.values_url(range, "?valueRenderOption=UNFORMATTED_VALUE");
        let text = self.send(Method::GET, url, None).await?;
        let parsed: ValueRange =
            serde_json::from_str(&text).map_err(|e| GoogleError::Parse(e.to_string()))?;
        Ok(parsed
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append_row(&self, range: &str, row: Vec<serde_json::Value>) -> Result<(), GoogleError> {
        let url = self.values_url(
            range,
            ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
        );
        let body = serde_json::json!({ "majorDimension": "ROWS", "values": [row] });
        self.send(Method::POST, url, Some(body)).await?;
        Ok(())
    }

    async fn update_values(
        &self,
        range: &str,
        rows: Vec<Vec<serde_json::Value>>,
    ) -> Result<(), GoogleError> {
        let url = self.values_url(range, "?valueInputOption=RAW");
        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": rows,
        });
        self.send(Method::PUT, url, Some(body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_stringified() {
        assert_eq!(cell_to_string(&serde_json::json!("abc")), "abc");
        assert_eq!(cell_to_string(&serde_json::json!(42)), "42");
        assert_eq!(cell_to_string(&serde_json::json!(true)), "true");
        assert_eq!(cell_to_string(&serde_json::Value::Null), "");
    }

    #[test]
    fn empty_value_range_has_no_rows() {
        let parsed: ValueRange =
            serde_json::from_str(r#"{"range": "Tasks!A1:Z1000", "majorDimension": "ROWS"}"#)
                .expect("value range");
        assert!(parsed.values.is_empty());
    }
}
