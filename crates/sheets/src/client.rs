use std::path::Path;

use packtrace_core::{AuditRow, SheetsConfig};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::{AuthError, ServiceAccountKey, TokenSource};

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Sheets request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sheets API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Client for the two spreadsheet operations the system performs: appending
/// audit rows to the log worksheet and reading the product list from the
/// products worksheet. Holds its own token source; callers inject the HTTP
/// client so connection pools are shared.
pub struct SheetsClient {
    http: reqwest::Client,
    tokens: TokenSource,
    spreadsheet_id: String,
    log_worksheet: String,
    products_worksheet: String,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, key: ServiceAccountKey, cfg: &SheetsConfig) -> Self {
        Self {
            http,
            tokens: TokenSource::new(key),
            spreadsheet_id: cfg.spreadsheet_id.clone(),
            log_worksheet: cfg.log_worksheet.clone(),
            products_worksheet: cfg.products_worksheet.clone(),
        }
    }

    /// Load the service-account key from the configured path and build the
    /// client. Fails eagerly: a missing or malformed key is a startup error,
    /// not something to discover on the first scan of the day.
    pub fn from_config(http: reqwest::Client, cfg: &SheetsConfig) -> Result<Self, SheetsError> {
        let key = ServiceAccountKey::from_file(Path::new(&cfg.key_path))?;
        Ok(Self::new(http, key, cfg))
    }

    /// Append audit rows to the log worksheet. Returns the number of rows
    /// the API reports written. A no-op for an empty slice.
    pub async fn append_rows(&self, rows: &[AuditRow]) -> Result<u64, SheetsError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let url = format!(
            "{SHEETS_BASE}/{}/values/{}!A1:append",
            self.spreadsheet_id, self.log_worksheet
        );
        let values: Vec<&[String]> = rows.iter().map(AuditRow::cells).collect();
        let body = serde_json::json!({ "values": values });

        let token = self.tokens.access_token(&self.http).await?;
        let resp = self
            .http
            .post(&url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let appended: AppendResponse = resp.json().await?;
        let written = appended.updated_rows();
        info!(rows = written, worksheet = %self.log_worksheet, "appended audit rows");
        Ok(written)
    }

    /// The product list: every non-blank cell in the first column of the
    /// products worksheet, in sheet order.
    pub async fn product_variants(&self) -> Result<Vec<String>, SheetsError> {
        let url = format!(
            "{SHEETS_BASE}/{}/values/{}!A:A",
            self.spreadsheet_id, self.products_worksheet
        );

        let token = self.tokens.access_token(&self.http).await?;
        let resp = self.http.get(&url).bearer_auth(&token).send().await?;

        let resp = check_status(resp).await?;
        let range: ValueRange = resp.json().await?;
        let products = first_column(range.values);
        debug!(count = products.len(), "fetched product variants");
        Ok(products)
    }
}

/// Non-2xx responses become `Api` errors carrying the response body, which
/// is where Google puts the human-readable reason.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SheetsError::Api { status: status.as_u16(), body })
}

#[derive(Deserialize)]
struct AppendResponse {
    updates: Option<AppendUpdates>,
}

#[derive(Deserialize)]
struct AppendUpdates {
    #[serde(rename = "updatedRows")]
    updated_rows: Option<u64>,
}

impl AppendResponse {
    fn updated_rows(&self) -> u64 {
        self.updates
            .as_ref()
            .and_then(|u| u.updated_rows)
            .unwrap_or(0)
    }
}

/// The values API omits the `values` key entirely for an empty range.
#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

fn first_column(values: Vec<Vec<String>>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|mut row| (!row.is_empty()).then(|| row.remove(0)))
        .map(|cell| cell.trim().to_string())
        .filter(|cell| !cell.is_empty())
        .collect()
}
