//! Google Sheets v4 access for the dashboard loader.
//!
//! Credential handling is delegated to the `yup-oauth2` service-account
//! authenticator; this module only asks it for a scoped bearer token and then
//! talks to the Sheets REST API with `reqwest`. The fetch targets the first
//! worksheet of a fixed spreadsheet and returns all rows as loosely-typed
//! cells with a header inferred from the first row.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::models::CellValue;
use crate::Config;

// ---

/// Scopes requested for the service account. The write-capable spreadsheet
/// scope and the drive scope are requested even though only reads occur, for
/// compatibility with future write use.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

/// Raw sheet contents: header row plus data rows, untyped beyond cell shape.
#[derive(Debug, Clone)]
pub struct SheetTable {
    // ---
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

// ---

/// Minimal client for the spreadsheet API, fixed to one spreadsheet id.
pub struct SheetsClient {
    // ---
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    credentials_path: PathBuf,
}

#[derive(Debug, Deserialize)]
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

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl SheetsClient {
    // ---
    pub fn new(cfg: &Config) -> Self {
        // ---
        SheetsClient {
            http: reqwest::Client::new(),
            base_url: cfg.sheets_api_url.clone(),
            spreadsheet_id: cfg.spreadsheet_id.clone(),
            credentials_path: PathBuf::from(&cfg.credentials_path),
        }
    }

    /// Fetch all rows of the first worksheet. Every failure along the way
    /// (credentials, network, malformed response) propagates as one error
    /// for the loader boundary to catch.
    pub async fn fetch_table(&self) -> Result<SheetTable> {
        // ---
        let token = self.access_token().await?;
        let title = self.first_worksheet_title(&token).await?;
        debug!("Fetching values from worksheet '{}'", title);
        let values = self.values(&token, &title).await?;
        Ok(split_table(values))
    }

    /// Exchange the local service-account key for a scoped access token.
    async fn access_token(&self) -> Result<String> {
        // ---
        let key = yup_oauth2::read_service_account_key(&self.credentials_path)
            .await
            .with_context(|| {
                format!(
                    "reading service-account credentials from {}",
                    self.credentials_path.display()
                )
            })?;

        let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .context("building service-account authenticator")?;

        let token = auth
            .token(SCOPES)
            .await
            .context("exchanging service-account key for access token")?;

        token
            .token()
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("credential exchange returned no access token"))
    }

    async fn first_worksheet_title(&self, token: &str) -> Result<String> {
        // ---
        let mut url = reqwest::Url::parse(&self.base_url).context("invalid sheets API URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("sheets API URL cannot be a base"))?
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()]);

        let meta: SpreadsheetMeta = self
            .http
            .get(url)
            .query(&[("fields", "sheets.properties.title")])
            .bearer_auth(token)
            .send()
            .await
            .context("requesting spreadsheet metadata")?
            .error_for_status()
            .context("spreadsheet metadata request rejected")?
            .json()
            .await
            .context("decoding spreadsheet metadata")?;

        meta.sheets
            .into_iter()
            .next()
            .map(|s| s.properties.title)
            .ok_or_else(|| anyhow!("spreadsheet has no worksheets"))
    }

    async fn values(&self, token: &str, title: &str) -> Result<Vec<Vec<serde_json::Value>>> {
        // ---
        let mut url = reqwest::Url::parse(&self.base_url).context("invalid sheets API URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("sheets API URL cannot be a base"))?
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", title]);

        // Numbers come back as JSON numbers; date-time cells as the formatted
        // strings the sheet displays, which is what the timestamp parser expects.
        let range: ValueRange = self
            .http
            .get(url)
            .query(&[
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("dateTimeRenderOption", "FORMATTED_STRING"),
            ])
            .bearer_auth(token)
            .send()
            .await
            .context("requesting worksheet values")?
            .error_for_status()
            .context("worksheet values request rejected")?
            .json()
            .await
            .context("decoding worksheet values")?;

        Ok(range.values)
    }
}

// ---

/// Split a raw values range into a header row and typed data rows.
///
/// The header is inferred from the first row; short data rows are padded with
/// empty cells and overlong ones truncated so every row matches the header
/// width.
pub fn split_table(mut values: Vec<Vec<serde_json::Value>>) -> SheetTable {
    // ---
    if values.is_empty() {
        return SheetTable {
            headers: Vec::new(),
            rows: Vec::new(),
        };
    }

    let headers: Vec<String> = values.remove(0).into_iter().map(header_name).collect();

    let rows = values
        .into_iter()
        .map(|row| {
            let mut cells: Vec<CellValue> = row
                .into_iter()
                .take(headers.len())
                .map(CellValue::from_json)
                .collect();
            cells.resize(headers.len(), CellValue::Empty);
            cells
        })
        .collect();

    SheetTable { headers, rows }
}

fn header_name(value: serde_json::Value) -> String {
    // ---
    match value {
        serde_json::Value::String(s) => s.trim().to_owned(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_table_infers_header_from_first_row() {
        // ---
        let table = split_table(vec![
            vec![json!("FechaHora"), json!("Voltaje")],
            vec![json!("2024-01-01 10:00:00"), json!(3.3)],
        ]);

        assert_eq!(table.headers, vec!["FechaHora", "Voltaje"]);
        assert_eq!(
            table.rows,
            vec![vec![
                CellValue::Text("2024-01-01 10:00:00".into()),
                CellValue::Number(3.3),
            ]]
        );
    }

    #[test]
    fn test_split_table_pads_and_truncates_rows() {
        // ---
        let table = split_table(vec![
            vec![json!("A"), json!("B")],
            vec![json!(1.0)],
            vec![json!(1.0), json!(2.0), json!(3.0)],
        ]);

        assert_eq!(table.rows[0], vec![CellValue::Number(1.0), CellValue::Empty]);
        assert_eq!(
            table.rows[1],
            vec![CellValue::Number(1.0), CellValue::Number(2.0)]
        );
    }

    #[test]
    fn test_split_table_empty_values() {
        // ---
        let table = split_table(Vec::new());
        assert!(table.headers.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_header_name_normalizes_non_string_cells() {
        // ---
        assert_eq!(header_name(json!(" Voltaje ")), "Voltaje");
        assert_eq!(header_name(json!(42)), "42");
        assert_eq!(header_name(json!(null)), "");
    }
}
