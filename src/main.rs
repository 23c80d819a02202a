//! Roleplay Reports MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to run read-only reporting queries over the roleplay_daily_reports view.

use clap::Parser;
use roleplay_reports_mcp::backend::postgres::PgPoolSettings;
use roleplay_reports_mcp::backend::{PostgresBackend, QueryBackend, SupabaseBackend};
use roleplay_reports_mcp::config::{BackendConfig, Config, TransportMode};
use roleplay_reports_mcp::error::ReportResult;
use roleplay_reports_mcp::mcp::ReportService;
use roleplay_reports_mcp::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

/// Create the shared query backend for the validated configuration.
async fn create_backend(
    config: &Config,
    backend_config: BackendConfig,
) -> ReportResult<Arc<dyn QueryBackend>> {
    match backend_config {
        BackendConfig::Supabase { url, anon_key } => {
            info!(url = %url, "Using Supabase backend");
            let backend = SupabaseBackend::new(
                &url,
                anon_key,
                config.query_timeout_duration(),
                config.connect_timeout_duration(),
            )?;
            Ok(Arc::new(backend))
        }
        BackendConfig::Postgres { database_url } => {
            info!("Using PostgreSQL backend");
            let settings = PgPoolSettings {
                max_connections: config.max_connections,
                acquire_timeout: config.connect_timeout_duration(),
            };
            let backend = PostgresBackend::connect(&database_url, settings).await?;
            Ok(Arc::new(backend))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    let backend_config = match config.backend_config() {
        Ok(backend_config) => backend_config,
        Err(message) => {
            error!("{}", message);
            eprintln!("Error: {}", message);
            std::process::exit(1);
        }
    };

    info!(
        transport = %config.transport,
        backend = %config.backend,
        character_limit = config.character_limit,
        "Starting Roleplay Reports MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let backend = create_backend(&config, backend_config).await?;
    let service = ReportService::new(backend, config.report_settings());

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(service);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                service,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
