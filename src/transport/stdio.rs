//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.
//! Logs must therefore go to stderr.

use crate::error::{ReportError, ReportResult};
use crate::mcp::ReportService;
use crate::transport::{Transport, close_backend, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout.
pub struct StdioTransport {
    service: ReportService,
}

impl StdioTransport {
    pub fn new(service: ReportService) -> Self {
        Self { service }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> ReportResult<()> {
        info!("Starting MCP server with stdio transport");

        let running_service = match self.service.clone().serve(stdio()).await {
            Ok(running_service) => running_service,
            Err(e) => {
                close_backend(&self.service).await;
                return Err(ReportError::internal(format!(
                    "Failed to start stdio transport: {}",
                    e
                )));
            }
        };

        let (outcome, shutdown_requested) = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                        (Ok(()), false)
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        let err = ReportError::internal(format!("Stdio transport error: {}", e));
                        (Err(err), false)
                    }
                }
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                (Ok(()), true)
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        close_backend(&self.service).await;

        if shutdown_requested {
            // A blocking stdin read cannot be interrupted by select!
            info!("Exiting process");
            std::process::exit(0);
        }

        outcome
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::test_support::idle_service;

    #[test]
    fn test_stdio_transport_creation() {
        let transport = StdioTransport::new(idle_service());
        assert_eq!(transport.name(), "stdio");
    }
}
