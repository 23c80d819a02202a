//! Report tool handlers.
//!
//! Orchestrates the two report tools: guard the query, cap its row count, run it on
//! the backend under a timeout, then shrink the response to the character budget.
//! Every failure leaves this module as an [`ErrorEnvelope`].

use crate::backend::QueryBackend;
use crate::error::{ReportError, ReportResult};
use crate::models::{
    CHARACTER_LIMIT, DEFAULT_QUERY_TIMEOUT_SECS, ErrorEnvelope, QueryEnvelope, ReportView, Row,
    RowLimit, SchemaEnvelope, TruncationNotice, ViewMetadata, describe_columns,
};
use crate::tools::guard;
use crate::tools::limit::enforce_limit;
use crate::tools::shaper;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// Example shown when a query fails validation.
pub const VALIDATION_SUGGESTION: &str = r#"请使用 SELECT 查询，例如: SELECT "餐厅完整名称", "总体任务完成率" FROM roleplay_daily_reports WHERE "运营日期"::date = CURRENT_DATE - 1"#;

/// Hint attached to custom query failures.
pub const QUERY_FAILURE_SUGGESTION: &str = "请检查SQL语法是否正确，特别注意中文列名需要使用双引号。可以先调用 get_view_schema_and_samples 查看可用的列名。";

/// Hint attached to schema introspection failures.
pub const SCHEMA_FAILURE_SUGGESTION: &str =
    "Please check database connection and ensure the roleplay_daily_reports view exists.";

/// Runtime settings for the report tools.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    /// Budget for the pretty-printed JSON response, in characters
    pub max_response_chars: usize,
    /// Upper bound for each backend call
    pub query_timeout: Duration,
    pub view: ReportView,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            max_response_chars: CHARACTER_LIMIT,
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            view: ReportView::default(),
        }
    }
}

fn truncation_message(max_chars: usize) -> String {
    format!(
        "Response was truncated to fit within {} character limit",
        max_chars
    )
}

/// Handler for the report tools.
#[derive(Clone)]
pub struct ReportToolHandler {
    backend: Arc<dyn QueryBackend>,
    settings: ReportSettings,
}

impl std::fmt::Debug for ReportToolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportToolHandler")
            .field("backend", &self.backend.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl ReportToolHandler {
    pub fn new(backend: Arc<dyn QueryBackend>, settings: ReportSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub fn backend(&self) -> &Arc<dyn QueryBackend> {
        &self.backend
    }

    /// Run one statement on the backend, bounded by the configured timeout.
    async fn run(&self, sql: &str) -> ReportResult<Vec<Row>> {
        let timeout = self.settings.query_timeout;
        tokio::time::timeout(timeout, self.backend.execute_sql(sql))
            .await
            .map_err(|_| ReportError::timeout("query execution", timeout.as_secs()))?
    }

    /// Sample rows, aggregate row and entity names, in that order.
    async fn load_schema(&self) -> ReportResult<(Vec<Row>, Option<Row>, Vec<Row>)> {
        let view = &self.settings.view;
        let samples = self.run(&view.sample_query()).await?;
        let aggregate = self.run(&view.metadata_query()).await?.into_iter().next();
        let names = self.run(&view.entity_names_query()).await?;
        Ok((samples, aggregate, names))
    }

    /// Describe the reporting view: columns, recent samples, metadata and usage hints.
    pub async fn get_view_schema_and_samples(&self) -> Result<SchemaEnvelope, ErrorEnvelope> {
        let span = info_span!(
            "tool_call",
            tool = "get_view_schema_and_samples",
            call_id = %Uuid::new_v4().simple(),
            backend = self.backend.name()
        );

        async move {
            let view = &self.settings.view;
            let (samples, aggregate, names) = self.load_schema().await.map_err(|e| {
                error!(error = %e, "Schema introspection failed");
                ErrorEnvelope::database(
                    format!("Failed to retrieve schema and samples: {}", e.detail()),
                    SCHEMA_FAILURE_SUGGESTION,
                )
            })?;

            let columns = describe_columns(&samples);
            let metadata = ViewMetadata::from_rows(aggregate.as_ref(), &names, view.entity_name_column);
            let usage_hints = view.usage_hints();
            let max_chars = self.settings.max_response_chars;

            let shaped = shaper::fit_rows(&samples, max_chars, |prefix, truncated| SchemaEnvelope {
                success: true,
                view_name: view.name.to_string(),
                description: view.description.to_string(),
                columns: columns.clone(),
                sample_data: prefix.to_vec(),
                metadata: metadata.clone(),
                usage_hints: usage_hints.clone(),
                truncation: truncated.then(|| TruncationNotice::new(truncation_message(max_chars))),
            })
            .map_err(|e| {
                error!(error = %e, "Failed to render schema response");
                ErrorEnvelope::database(
                    format!("Failed to retrieve schema and samples: {}", e),
                    SCHEMA_FAILURE_SUGGESTION,
                )
            })?;

            info!(
                columns = columns.len(),
                samples = shaped.kept,
                restaurants = metadata.restaurants.len(),
                truncated = shaped.truncated,
                "Schema introspection completed"
            );
            Ok(shaped.envelope)
        }
        .instrument(span)
        .await
    }

    /// Validate, cap and execute a caller-supplied SELECT.
    ///
    /// `row_limit` is clamped to `[1, MAX_ROW_LIMIT]` before the LIMIT clause is enforced.
    pub async fn execute_custom_query(
        &self,
        query: &str,
        row_limit: u32,
    ) -> Result<QueryEnvelope, ErrorEnvelope> {
        let span = info_span!(
            "tool_call",
            tool = "execute_custom_query",
            call_id = %Uuid::new_v4().simple(),
            backend = self.backend.name()
        );

        async move {
            if let Err(rejection) = guard::validate_query(query) {
                warn!(
                    keyword = rejection.keyword().unwrap_or_default(),
                    "Query rejected by guard"
                );
                return Err(ErrorEnvelope::query_validation(
                    rejection.to_string(),
                    VALIDATION_SUGGESTION,
                ));
            }

            let limit = RowLimit::clamped(row_limit);
            let final_query = enforce_limit(query, limit);

            let start = Instant::now();
            let rows = self.run(&final_query).await.map_err(|e| {
                error!(error = %e, "Custom query failed");
                ErrorEnvelope::database(
                    format!("Query execution failed: {}", e.detail()),
                    QUERY_FAILURE_SUGGESTION,
                )
            })?;
            let execution_time_ms = start.elapsed().as_millis() as u64;

            let original_count = rows.len();
            let max_chars = self.settings.max_response_chars;
            let shaped = shaper::fit_rows(&rows, max_chars, |prefix, truncated| QueryEnvelope {
                success: true,
                query: final_query.clone(),
                row_count: prefix.len(),
                execution_time_ms,
                data: prefix.to_vec(),
                truncation: truncated.then(|| {
                    TruncationNotice::new(format!(
                        "{}. Original row count: {}",
                        truncation_message(max_chars),
                        original_count
                    ))
                }),
            })
            .map_err(|e| {
                error!(error = %e, "Failed to render query response");
                ErrorEnvelope::database(
                    format!("Query execution failed: {}", e),
                    QUERY_FAILURE_SUGGESTION,
                )
            })?;

            info!(
                row_limit = limit.get(),
                row_count = shaped.kept,
                original_row_count = original_count,
                truncated = shaped.truncated,
                execution_time_ms,
                "Custom query completed"
            );
            Ok(shaped.envelope)
        }
        .instrument(span)
        .await
    }
}
