//! Spreadsheet sink for accepted contact submissions.
//!
//! Handlers must return promptly, so `submit` only spawns the append; the
//! HTTP reply never waits on Google. A submission arriving while no valid
//! access token exists (consent pending, refresh failing) is logged and
//! dropped.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::error::{RelayError, Result};
use crate::oauth::{unix_now, CredentialStore};
use crate::utils::logging::sanitize;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Base URL of the Sheets v4 API.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// A validated contact row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub number: String,
}

/// Destination for accepted submissions.
pub trait SubmissionSink: Send + Sync {
    /// Queue a submission. Must not block.
    fn submit(&self, submission: Submission);
}

/// Appends rows to a Google spreadsheet.
#[derive(Clone)]
pub struct SheetsClient {
    http_client: Client,
    store: CredentialStore,
    api_base: String,
    spreadsheet_id: String,
    range: String,
}

impl SheetsClient {
    pub fn new(
        store: CredentialStore,
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            store,
            api_base: SHEETS_API_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
        })
    }

    /// Point at another API base, for tests against a mock server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn append_url(&self) -> String {
        format!(
            "{}/{}/values/{}:append?valueInputOption=RAW",
            self.api_base.trim_end_matches('/'),
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(&self.range),
        )
    }

    /// Append one row with the current access token.
    pub async fn append(&self, submission: &Submission) -> Result<()> {
        let access_token = self.store.access_token(unix_now()).await.ok_or_else(|| {
            RelayError::Sheets("No valid access token; authorization pending or refresh failing".to_string())
        })?;

        let body = json!({ "values": [[submission.name, submission.number]] });

        let response = self
            .http_client
            .post(self.append_url())
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RelayError::Sheets(format!(
                "HTTP {}: {}",
                status.as_u16(),
                sanitize(&error_text)
            )));
        }

        debug!("Appended row to {}", self.range);
        Ok(())
    }
}

impl SubmissionSink for SheetsClient {
    fn submit(&self, submission: Submission) {
        let client = self.clone();
        tokio::spawn(async move {
            if client.store.access_token(unix_now()).await.is_none() {
                warn!(
                    name = %submission.name,
                    "Submission not appended: authorization pending or refresh failing"
                );
                crate::metrics::record_sheet_append("skipped");
                return;
            }

            match client.append(&submission).await {
                Ok(()) => {
                    info!(name = %submission.name, "Submission appended to spreadsheet");
                    crate::metrics::record_sheet_append("success");
                }
                Err(e) => {
                    warn!(name = %submission.name, "Spreadsheet append failed: {}", e);
                    crate::metrics::record_sheet_append("failure");
                }
            }
        });
    }
}
