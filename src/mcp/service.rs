//! MCP service implementation using rmcp.
//!
//! This module defines the ReportService struct exposing the two report tools
//! via the MCP protocol using the rmcp framework's macros. Both tools answer with
//! the envelope rendered as pretty JSON text; error envelopes set `isError`.

use crate::backend::QueryBackend;
use crate::error::ReportError;
use crate::models::{DEFAULT_ROW_LIMIT, MAX_QUERY_CHARS, MAX_ROW_LIMIT, MIN_QUERY_CHARS};
use crate::tools::{ReportSettings, ReportToolHandler};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_row_limit() -> u32 {
    DEFAULT_ROW_LIMIT
}

/// Input for the execute_custom_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CustomQueryInput {
    /// SQL SELECT query to execute on the roleplay_daily_reports view. Must be a read-only SELECT statement. Use double quotes for Chinese column names like "餐厅完整名称".
    #[schemars(length(min = 10, max = 5000))]
    pub query: String,
    /// Maximum number of rows to return. Default: 100, Maximum: 1000
    #[serde(default = "default_row_limit")]
    #[schemars(range(min = 1, max = 1000))]
    pub row_limit: u32,
}

impl CustomQueryInput {
    /// Enforce the advertised bounds; clients are not required to honour the schema.
    fn validate(&self) -> Result<(), ReportError> {
        let chars = self.query.chars().count();
        if !(MIN_QUERY_CHARS..=MAX_QUERY_CHARS).contains(&chars) {
            return Err(ReportError::invalid_input(format!(
                "query must be between {} and {} characters, got {}",
                MIN_QUERY_CHARS, MAX_QUERY_CHARS, chars
            )));
        }
        if !(1..=MAX_ROW_LIMIT).contains(&self.row_limit) {
            return Err(ReportError::invalid_input(format!(
                "row_limit must be between 1 and {}, got {}",
                MAX_ROW_LIMIT, self.row_limit
            )));
        }
        Ok(())
    }
}

/// Render an envelope as the tool's text content.
fn render<T: Serialize>(envelope: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(envelope).map_err(|e| ReportError::from(e).into())
}

/// Success envelopes become normal results, error envelopes `isError` results.
fn envelope_result<T: Serialize, E: Serialize>(
    outcome: Result<T, E>,
) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(envelope) => Ok(CallToolResult::success(vec![Content::text(render(&envelope)?)])),
        Err(envelope) => Ok(CallToolResult::error(vec![Content::text(render(&envelope)?)])),
    }
}

#[derive(Clone)]
pub struct ReportService {
    /// Report tool handler sharing the backend handle across calls
    handler: ReportToolHandler,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl ReportService {
    /// Create a new ReportService instance.
    ///
    /// # Arguments
    ///
    /// * `backend` - Shared query backend, created once at startup
    /// * `settings` - Response budget, query timeout and view description
    pub fn new(backend: Arc<dyn QueryBackend>, settings: ReportSettings) -> Self {
        Self {
            handler: ReportToolHandler::new(backend, settings),
            tool_router: Self::tool_router(),
        }
    }

    pub fn handler(&self) -> &ReportToolHandler {
        &self.handler
    }
}

#[tool_router]
impl ReportService {
    #[tool(
        description = "REQUIRED FIRST STEP: call this tool before executing any queries.\n\
        Returns the complete schema and sample data of the roleplay_daily_reports view:\n\
        - every column with its Chinese name, English name, inferred data type and description\n\
        - the 5 most recent records\n\
        - metadata: row count, date range, restaurant count and restaurant list\n\
        - SQL usage hints\n\
        All column names are Chinese and must be double-quoted in queries, e.g. \"餐厅完整名称\", \"总体任务完成率\".\n\
        获取 roleplay_daily_reports 视图的完整结构和示例数据。"
    )]
    async fn get_view_schema_and_samples(&self) -> Result<CallToolResult, McpError> {
        envelope_result(self.handler.get_view_schema_and_samples().await)
    }

    #[tool(
        description = "PREREQUISITE: call get_view_schema_and_samples first.\n\
        Execute a read-only SQL SELECT on the roleplay_daily_reports view to build performance reports.\n\
        When a report is requested, select all columns for the requested scope and let WHERE do the filtering.\n\
        - Daily report: SELECT * for a single date\n\
        - Weekly/monthly: a date range, optionally AVG/SUM\n\
        - Multi-restaurant: omit the restaurant filter, optionally GROUP BY \"餐厅完整名称\"\n\
        - Opening (开市): 开店时段, 午市准备时段, 晚市准备时段; closing (闭市): 午市收市时段, 收市打烊时段\n\
        Example: WHERE \"餐厅完整名称\" ILIKE '%name%' AND \"运营日期\"::date = 'YYYY-MM-DD'\n\
        SELECT only. A LIMIT of row_limit (default 100, max 1000) is enforced and responses over the character limit are truncated.\n\
        在 roleplay_daily_reports 视图上执行自定义SQL查询。"
    )]
    async fn execute_custom_query(
        &self,
        Parameters(input): Parameters<CustomQueryInput>,
    ) -> Result<CallToolResult, McpError> {
        input.validate()?;
        envelope_result(
            self.handler
                .execute_custom_query(&input.query, input.row_limit)
                .await,
        )
    }
}

#[tool_handler]
impl ServerHandler for ReportService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "roleplay-reports".to_owned(),
                title: Some("Roleplay Reports MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "This server provides read-only access to restaurant roleplay task performance data.\n\
                \n\
                ## Required workflow\n\
                1. Call `get_view_schema_and_samples` first to learn the data structure\n\
                2. Then call `execute_custom_query` with column names from step 1\n\
                \n\
                ## Why\n\
                - All column names are Chinese and require double quotes in SQL\n\
                - Without the schema, queries will reference columns that do not exist\n\
                - The schema tool lists every column with a description\n\
                \n\
                ## Limits\n\
                - Only SELECT statements are accepted\n\
                - At most 1000 rows per query (default 100)\n\
                - Large responses are truncated and flagged with `_truncated`"
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportResult;
    use crate::models::Row;
    use async_trait::async_trait;
    use serde_json::{Value as JsonValue, json};

    struct StaticBackend(Vec<Row>);

    #[async_trait]
    impl QueryBackend for StaticBackend {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn execute_sql(&self, _sql: &str) -> ReportResult<Vec<Row>> {
            Ok(self.0.clone())
        }
    }

    fn create_test_service() -> ReportService {
        let row = json!({"餐厅ID": 7, "餐厅完整名称": "测试-绵阳-一店"});
        let rows = vec![row.as_object().cloned().unwrap()];
        ReportService::new(Arc::new(StaticBackend(rows)), ReportSettings::default())
    }

    fn input(query: &str, row_limit: u32) -> Parameters<CustomQueryInput> {
        Parameters(CustomQueryInput {
            query: query.to_string(),
            row_limit,
        })
    }

    /// (isError, parsed text content) of a tool result.
    fn unpack(result: CallToolResult) -> (bool, JsonValue) {
        let value = serde_json::to_value(&result).unwrap();
        let is_error = value["isError"].as_bool().unwrap_or(false);
        let text = value["content"][0]["text"].as_str().unwrap().to_string();
        (is_error, serde_json::from_str(&text).unwrap())
    }

    #[test]
    fn test_server_info() {
        let service = create_test_service();
        let info = service.get_info();
        assert_eq!(info.server_info.name, "roleplay-reports");
        assert!(info.capabilities.tools.is_some());
        assert!(
            info.instructions
                .unwrap()
                .contains("get_view_schema_and_samples")
        );
    }

    #[test]
    fn test_row_limit_defaults_when_omitted() {
        let input: CustomQueryInput =
            serde_json::from_value(json!({"query": "SELECT * FROM roleplay_daily_reports"}))
                .unwrap();
        assert_eq!(input.row_limit, DEFAULT_ROW_LIMIT);
    }

    #[test]
    fn test_negative_row_limit_fails_to_deserialize() {
        let result = serde_json::from_value::<CustomQueryInput>(
            json!({"query": "SELECT * FROM roleplay_daily_reports", "row_limit": -1}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_counts_characters() {
        // 8 Chinese characters plus "SELECT " is 15 characters but 31 bytes.
        let ok = CustomQueryInput {
            query: "SELECT 餐厅完整名称总体".to_string(),
            row_limit: 1,
        };
        assert!(ok.validate().is_ok());

        let short = CustomQueryInput {
            query: "SELECT 1".to_string(),
            row_limit: 1,
        };
        let err = short.validate().unwrap_err();
        assert!(err.to_string().contains("between 10 and 5000 characters, got 8"));
    }

    #[test]
    fn test_validate_rejects_long_query() {
        let long = CustomQueryInput {
            query: format!("SELECT {}", "a".repeat(MAX_QUERY_CHARS)),
            row_limit: 100,
        };
        assert!(long.validate().is_err());
    }

    #[tokio::test]
    async fn test_out_of_range_row_limit_is_invalid_params() {
        let service = create_test_service();
        let err = service
            .execute_custom_query(input("SELECT * FROM roleplay_daily_reports", 5000))
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32602);
        assert!(err.message.contains("row_limit"));

        let err = service
            .execute_custom_query(input("SELECT * FROM roleplay_daily_reports", 0))
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_custom_query_success_content() {
        let service = create_test_service();
        let result = service
            .execute_custom_query(input("SELECT * FROM roleplay_daily_reports", 20))
            .await
            .unwrap();

        let (is_error, body) = unpack(result);
        assert!(!is_error);
        assert_eq!(body["success"], true);
        assert_eq!(body["query"], "SELECT * FROM roleplay_daily_reports LIMIT 20");
        assert_eq!(body["row_count"], 1);
        assert_eq!(body["data"][0]["餐厅ID"], 7);
        assert!(body.get("_truncated").is_none());
    }

    #[tokio::test]
    async fn test_rejected_query_sets_is_error() {
        let service = create_test_service();
        let result = service
            .execute_custom_query(input("DROP TABLE roleplay_daily_reports", 100))
            .await
            .unwrap();

        let (is_error, body) = unpack(result);
        assert!(is_error);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["type"], "QueryValidationError");
    }

    #[tokio::test]
    async fn test_schema_tool_content() {
        let service = create_test_service();
        let result = service.get_view_schema_and_samples().await.unwrap();

        let (is_error, body) = unpack(result);
        assert!(!is_error);
        assert_eq!(body["view_name"], "roleplay_daily_reports");
        assert_eq!(body["columns"][0]["name"], "餐厅ID");
        assert_eq!(body["columns"][0]["name_english"], "restaurant_id");
        assert_eq!(body["columns"][0]["data_type"], "integer");
        assert_eq!(body["usage_hints"].as_array().unwrap().len(), 7);
    }
}
