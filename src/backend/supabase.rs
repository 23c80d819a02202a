//! Supabase PostgREST backend.
//!
//! Queries go through the `execute_sql` RPC function exposed by PostgREST:
//! `POST {SUPABASE_URL}/rest/v1/rpc/execute_sql` with body `{"query": "..."}`.
//! Requests authenticate with the anon key, so row-level security applies.

use super::{QueryBackend, rows_from_json};
use crate::error::{ReportError, ReportResult};
use crate::models::Row;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;
use tracing::debug;
use url::Url;

const RPC_PATH: &str = "rest/v1/rpc/execute_sql";

/// Error body returned by PostgREST for failed requests.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    hint: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

pub struct SupabaseBackend {
    client: Client,
    endpoint: Url,
    anon_key: String,
}

impl std::fmt::Debug for SupabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseBackend")
            .field("endpoint", &self.endpoint.as_str())
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

impl SupabaseBackend {
    /// Create a backend for the project at `base_url`.
    ///
    /// `request_timeout` bounds the whole HTTP exchange; `connect_timeout` only the
    /// TCP/TLS handshake.
    pub fn new(
        base_url: &Url,
        anon_key: impl Into<String>,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> ReportResult<Self> {
        let endpoint = rpc_endpoint(base_url)?;
        let client = Client::builder()
            .user_agent(concat!("roleplay-reports-mcp/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            anon_key: anon_key.into(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// `{base}/rest/v1/rpc/execute_sql`, keeping any path prefix of the base URL.
fn rpc_endpoint(base_url: &Url) -> ReportResult<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(RPC_PATH).map_err(|e| {
        ReportError::connection(
            format!("Invalid Supabase URL '{}': {}", base_url, e),
            "Set SUPABASE_URL to the project URL, e.g. https://<project>.supabase.co",
        )
    })
}

/// Map a non-2xx PostgREST response to an error.
fn error_from_response(status: StatusCode, body: &str) -> ReportError {
    match serde_json::from_str::<PostgrestError>(body) {
        Ok(err) => {
            let message = match err.details {
                Some(details) if !details.is_empty() => format!("{} ({})", err.message, details),
                _ => err.message,
            };
            ReportError::database(message, err.code, err.hint)
        }
        Err(_) if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
            ReportError::connection(
                format!("Supabase rejected the request with HTTP {}", status),
                "Check SUPABASE_ANON_KEY",
            )
        }
        Err(_) => ReportError::connection(
            format!("Supabase returned HTTP {}: {}", status, body.trim()),
            "Check SUPABASE_URL and that the execute_sql function exists",
        ),
    }
}

#[async_trait]
impl QueryBackend for SupabaseBackend {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn execute_sql(&self, sql: &str) -> ReportResult<Vec<Row>> {
        debug!(endpoint = %self.endpoint, sql_len = sql.len(), "Calling execute_sql RPC");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&json!({ "query": sql }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status, &body));
        }

        let body: JsonValue = response.json().await?;
        rows_from_json(body)
    }
}
