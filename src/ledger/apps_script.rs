//! HTTP client for the spreadsheet web app that keeps the intake ledger.
//!
//! Each line is posted as JSON. The web app answers `{"ok": true}` when the row was
//! appended; a non-2xx status, an unparsable body or a body without that flag is a
//! failure, reported with the body text so the operator sees the web app's message.

use super::{Ledger, LedgerEntry};
use crate::{
    config::Settings,
    errors::{Error, Result},
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Default connect timeout for ledger requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const GENERIC_FAILURE: &str = "Error al registrar en Sheets";

/// Ledger backed by the spreadsheet web app at `url`.
pub struct AppsScriptLedger {
    client: Client,
    url: Option<String>,
}

impl AppsScriptLedger {
    /// Creates a ledger client. With `url` unset every call fails.
    pub fn new(url: Option<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            url: url.filter(|u| !u.trim().is_empty()),
        })
    }

    /// Creates a ledger client from the application settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.ledger_url.clone(), settings.ledger_timeout())
    }
}

fn acknowledged(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("ok").and_then(Value::as_bool))
        .unwrap_or(false)
}

#[async_trait]
impl Ledger for AppsScriptLedger {
    async fn forward(&self, entry: &LedgerEntry) -> Result<()> {
        let Some(url) = self.url.as_deref() else {
            return Err(Error::Ledger {
                message: "APPS_SCRIPT_URL no configurada".to_string(),
            });
        };

        let response = self
            .client
            .post(url)
            .json(entry)
            .send()
            .await
            .map_err(|e| Error::Ledger {
                message: format!("{GENERIC_FAILURE}: {e}"),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() || !acknowledged(&body) {
            warn!(
                "Ledger rejected line {} / {} ({}): {}",
                entry.numero_lote, entry.producto, status, body
            );
            let message = if body.trim().is_empty() {
                GENERIC_FAILURE.to_string()
            } else {
                body
            };
            return Err(Error::Ledger { message });
        }

        debug!("Ledger recorded {} / {}", entry.numero_lote, entry.producto);
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}
