//! Configuration handling for the roleplay reports MCP server.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::models::{CHARACTER_LIMIT, DEFAULT_QUERY_TIMEOUT_SECS, ReportView};
use crate::tools::ReportSettings;
use clap::{Parser, ValueEnum};
use std::time::Duration;
use url::Url;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Startup error when Supabase credentials are absent.
pub const MISSING_SUPABASE_CREDENTIALS: &str =
    "Missing required environment variables: SUPABASE_URL or SUPABASE_ANON_KEY";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Which query backend serves the report tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendKind {
    /// Supabase PostgREST `execute_sql` RPC, authenticated with the anon key
    #[default]
    Supabase,
    /// Direct PostgreSQL connection pool
    Postgres,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supabase => write!(f, "supabase"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// Validated backend connection settings.
#[derive(Clone, PartialEq)]
pub enum BackendConfig {
    Supabase { url: Url, anon_key: String },
    Postgres { database_url: String },
}

// Credentials stay out of logs.
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supabase { url, .. } => f
                .debug_struct("Supabase")
                .field("url", &url.as_str())
                .field("anon_key", &"<redacted>")
                .finish(),
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"<redacted>")
                .finish(),
        }
    }
}

/// Configuration for the roleplay reports MCP server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "roleplay-reports-mcp",
    about = "MCP server for read-only reporting queries over the roleplay_daily_reports view",
    version,
    author
)]
pub struct Config {
    /// Query backend (supabase or postgres)
    #[arg(long, value_enum, default_value = "supabase", env = "REPORTS_BACKEND")]
    pub backend: BackendKind,

    /// Supabase project URL (supabase backend)
    #[arg(long, value_name = "URL", env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase anon key; row-level security applies (supabase backend)
    #[arg(long, value_name = "KEY", env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub supabase_anon_key: Option<String>,

    /// PostgreSQL connection URL (postgres backend)
    #[arg(long, value_name = "URL", env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Query timeout in seconds (at least 1)
    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Connection timeout in seconds (at least 1)
    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MCP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Maximum pooled connections (postgres backend)
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONNECTIONS,
        env = "MCP_MAX_CONNECTIONS"
    )]
    pub max_connections: u32,

    /// Response budget in characters of pretty-printed JSON
    #[arg(
        long,
        default_value_t = CHARACTER_LIMIT,
        env = "REPORTS_CHARACTER_LIMIT"
    )]
    pub character_limit: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            backend: BackendKind::Supabase,
            supabase_url: None,
            supabase_anon_key: None,
            database_url: None,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            character_limit: CHARACTER_LIMIT,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Validate and assemble the settings of the selected backend.
    ///
    /// Empty values count as missing.
    pub fn backend_config(&self) -> Result<BackendConfig, String> {
        match self.backend {
            BackendKind::Supabase => {
                let (Some(raw_url), Some(anon_key)) = (
                    non_empty(self.supabase_url.as_deref()),
                    non_empty(self.supabase_anon_key.as_deref()),
                ) else {
                    return Err(MISSING_SUPABASE_CREDENTIALS.to_string());
                };

                let url = Url::parse(raw_url)
                    .map_err(|e| format!("Invalid SUPABASE_URL '{}': {}", raw_url, e))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(format!(
                        "SUPABASE_URL must use http or https, got '{}'",
                        url.scheme()
                    ));
                }

                Ok(BackendConfig::Supabase {
                    url,
                    anon_key: anon_key.to_string(),
                })
            }
            BackendKind::Postgres => {
                let database_url = non_empty(self.database_url.as_deref())
                    .ok_or("Missing required environment variable: DATABASE_URL")?;
                if !(database_url.starts_with("postgres://")
                    || database_url.starts_with("postgresql://"))
                {
                    return Err(
                        "DATABASE_URL must start with postgres:// or postgresql://".to_string()
                    );
                }
                Ok(BackendConfig::Postgres {
                    database_url: database_url.to_string(),
                })
            }
        }
    }

    /// Settings shared by both report tools.
    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            max_response_chars: self.character_limit,
            query_timeout: self.query_timeout_duration(),
            view: ReportView::default(),
        }
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
