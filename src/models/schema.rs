//! Reporting view schema models.
//!
//! The view is described from sample data rather than a schema catalog: column
//! descriptors come from the first sample row, enriched with a curated mapping of
//! the view's Chinese column names.

use crate::models::query::Row;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Description used for columns missing from the curated mapping.
pub const GENERIC_COLUMN_DESCRIPTION: &str = "列数据";

/// Static description of the reporting view queried by the tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportView {
    /// View name used in generated queries
    pub name: &'static str,
    /// Human-readable summary shown by the schema tool
    pub description: &'static str,
    /// Date column used to order samples and compute the date range
    pub date_column: &'static str,
    /// Column identifying the reporting entity (restaurant)
    pub entity_id_column: &'static str,
    /// Column holding the entity's display name
    pub entity_name_column: &'static str,
}

impl ReportView {
    /// The restaurant roleplay daily KPI materialized view.
    pub const ROLEPLAY_DAILY_REPORTS: ReportView = ReportView {
        name: "roleplay_daily_reports",
        description: "餐厅角色扮演任务日报数据 - 57个KPI指标，涵盖总体、角色、时段维度的任务完成情况",
        date_column: "运营日期",
        entity_id_column: "餐厅ID",
        entity_name_column: "餐厅完整名称",
    };

    /// Five most recent rows, newest first.
    pub fn sample_query(&self) -> String {
        format!(
            r#"SELECT * FROM {} ORDER BY "{}" DESC LIMIT 5"#,
            self.name, self.date_column
        )
    }

    /// Row count, date range and distinct entity count in a single row.
    pub fn metadata_query(&self) -> String {
        format!(
            r#"SELECT COUNT(*) as total_rows, MIN("{date}") as earliest_date, MAX("{date}") as latest_date, COUNT(DISTINCT "{id}") as restaurant_count FROM {view}"#,
            date = self.date_column,
            id = self.entity_id_column,
            view = self.name
        )
    }

    /// Distinct entity names in name order.
    pub fn entity_names_query(&self) -> String {
        format!(
            r#"SELECT DISTINCT "{name}" FROM {view} ORDER BY "{name}""#,
            name = self.entity_name_column,
            view = self.name
        )
    }

    /// Static query-writing guidance returned with the schema.
    pub fn usage_hints(&self) -> Vec<String> {
        vec![
            format!(
                r#"查询时使用中文列名并加双引号: SELECT "餐厅完整名称", "总体任务完成率" FROM {}"#,
                self.name
            ),
            r#"日期过滤: WHERE "运营日期"::date = '2025-10-21'"#.to_string(),
            r#"模糊搜索餐厅: WHERE "餐厅完整名称" ILIKE '%绵阳%'"#.to_string(),
            r#"排除零任务: WHERE "总任务数量" > 0"#.to_string(),
            r#"按完成率排序: ORDER BY "总体任务完成率" DESC"#.to_string(),
            format!(
                r#"聚合查询: SELECT AVG("总体任务完成率") FROM {} WHERE ..."#,
                self.name
            ),
            r#"分组统计: GROUP BY "餐厅完整名称""#.to_string(),
        ]
    }
}

impl Default for ReportView {
    fn default() -> Self {
        Self::ROLEPLAY_DAILY_REPORTS
    }
}

/// Curated (column, english name, description) entries for the roleplay view.
const COLUMN_MAPPING: &[(&str, &str, &str)] = &[
    ("报表唯一标识", "report_id", "每条记录的唯一标识"),
    ("运营日期", "operating_date", "报表对应的运营日期"),
    ("餐厅ID", "restaurant_id", "餐厅的唯一标识"),
    ("餐厅完整名称", "restaurant_name", "餐厅名称（品牌-城市-门店）"),
    ("总任务数量", "total_tasks", "当天所有任务的总数"),
    ("已完成任务数量", "completed_tasks", "当天已完成的任务数量"),
    ("总体任务完成率", "overall_completion_rate", "总体任务完成百分比 (0-100)"),
    ("总体任务准时率", "overall_ontime_rate", "总体任务准时完成百分比 (0-100)"),
    ("店长总任务数量", "manager_total_tasks", "店长角色的总任务数"),
    ("店长已完成任务数量", "manager_completed_tasks", "店长已完成的任务数"),
    ("店长任务完成率", "manager_completion_rate", "店长任务完成百分比"),
    ("店长任务准时率", "manager_ontime_rate", "店长任务准时完成百分比"),
    ("值班经理总任务数量", "duty_manager_total_tasks", "值班经理角色的总任务数"),
    ("值班经理已完成任务数量", "duty_manager_completed_tasks", "值班经理已完成的任务数"),
    ("值班经理任务完成率", "duty_manager_completion_rate", "值班经理任务完成百分比"),
    ("值班经理任务准时率", "duty_manager_ontime_rate", "值班经理任务准时完成百分比"),
    ("厨师总任务数量", "chef_total_tasks", "厨师角色的总任务数"),
    ("厨师已完成任务数量", "chef_completed_tasks", "厨师已完成的任务数"),
    ("厨师任务完成率", "chef_completion_rate", "厨师任务完成百分比"),
    ("厨师任务准时率", "chef_ontime_rate", "厨师任务准时完成百分比"),
    ("手动闭店任务是否完成", "manual_closing_completed", "手动闭店任务的完成状态 (true/false)"),
    ("闭店任务ID", "closing_task_id", "闭店任务的唯一标识"),
];

/// Look up the curated English name and description for a column.
pub fn column_annotation(column: &str) -> Option<(&'static str, &'static str)> {
    COLUMN_MAPPING
        .iter()
        .find(|(name, _, _)| *name == column)
        .map(|(_, english, description)| (*english, *description))
}

/// Data type inferred from a sample value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InferredType {
    Boolean,
    Integer,
    Numeric,
    Text,
    Unknown,
}

impl InferredType {
    /// Infer the type of a single JSON value. Nulls and nested values are unknown.
    pub fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::Bool(_) => Self::Boolean,
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            JsonValue::Number(_) => Self::Numeric,
            JsonValue::String(_) => Self::Text,
            JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => Self::Unknown,
        }
    }
}

/// Column description derived from a sample row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub name_english: String,
    pub data_type: InferredType,
    pub description: String,
}

/// Build column descriptors from the first sample row, in field order.
///
/// Returns an empty list when there are no samples.
pub fn describe_columns(samples: &[Row]) -> Vec<ColumnDescriptor> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };

    first
        .iter()
        .map(|(name, value)| {
            let (name_english, description) = column_annotation(name)
                .map(|(english, description)| (english.to_string(), description.to_string()))
                .unwrap_or_else(|| (name.clone(), GENERIC_COLUMN_DESCRIPTION.to_string()));

            ColumnDescriptor {
                name: name.clone(),
                name_english,
                data_type: InferredType::of(value),
                description,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DateRange {
    pub earliest: String,
    pub latest: String,
}

/// Aggregate statistics about the reporting view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewMetadata {
    pub total_rows: JsonValue,
    pub date_range: DateRange,
    pub restaurant_count: JsonValue,
    pub restaurants: Vec<String>,
}

impl ViewMetadata {
    /// Assemble metadata from the aggregate row and the entity-name rows.
    ///
    /// Missing aggregates default to `0`, missing dates to an empty string.
    pub fn from_rows(aggregate: Option<&Row>, names: &[Row], name_column: &str) -> Self {
        let field = |key: &str| aggregate.and_then(|row| row.get(key));

        Self {
            total_rows: field("total_rows").cloned().unwrap_or_else(|| 0.into()),
            date_range: DateRange {
                earliest: display_value(field("earliest_date")),
                latest: display_value(field("latest_date")),
            },
            restaurant_count: field("restaurant_count")
                .cloned()
                .unwrap_or_else(|| 0.into()),
            restaurants: names
                .iter()
                .map(|row| display_value(row.get(name_column)))
                .collect(),
        }
    }
}

/// Render a scalar for display: strings verbatim, null or missing as empty.
fn display_value(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: JsonValue) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_infer_types() {
        assert_eq!(InferredType::of(&json!(true)), InferredType::Boolean);
        assert_eq!(InferredType::of(&json!(42)), InferredType::Integer);
        assert_eq!(InferredType::of(&json!(-7)), InferredType::Integer);
        assert_eq!(InferredType::of(&json!(87.5)), InferredType::Numeric);
        assert_eq!(InferredType::of(&json!("绵阳")), InferredType::Text);
        assert_eq!(InferredType::of(&JsonValue::Null), InferredType::Unknown);
        assert_eq!(InferredType::of(&json!([1, 2])), InferredType::Unknown);
    }

    #[test]
    fn test_inferred_type_serializes_lowercase() {
        assert_eq!(serde_json::to_value(InferredType::Numeric).unwrap(), "numeric");
    }

    #[test]
    fn test_describe_columns_uses_curated_mapping() {
        let samples = vec![row(json!({
            "餐厅完整名称": "品牌-绵阳-一店",
            "总体任务完成率": 92.5,
            "手动闭店任务是否完成": true
        }))];

        let columns = describe_columns(&samples);
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "餐厅完整名称");
        assert_eq!(columns[0].name_english, "restaurant_name");
        assert_eq!(columns[0].data_type, InferredType::Text);
        assert_eq!(columns[1].name_english, "overall_completion_rate");
        assert_eq!(columns[1].data_type, InferredType::Numeric);
        assert_eq!(columns[2].data_type, InferredType::Boolean);
    }

    #[test]
    fn test_describe_columns_falls_back_for_unmapped_column() {
        let samples = vec![row(json!({ "开店时段任务完成率": null }))];
        let columns = describe_columns(&samples);
        assert_eq!(columns[0].name_english, "开店时段任务完成率");
        assert_eq!(columns[0].description, GENERIC_COLUMN_DESCRIPTION);
        assert_eq!(columns[0].data_type, InferredType::Unknown);
    }

    #[test]
    fn test_describe_columns_only_reads_first_row() {
        let samples = vec![row(json!({ "a": 1 })), row(json!({ "a": "x", "b": 2 }))];
        let columns = describe_columns(&samples);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].data_type, InferredType::Integer);
    }

    #[test]
    fn test_describe_columns_empty_samples() {
        assert!(describe_columns(&[]).is_empty());
    }

    #[test]
    fn test_metadata_from_rows() {
        let aggregate = row(json!({
            "total_rows": 1234,
            "earliest_date": "2025-09-01",
            "latest_date": "2025-10-21",
            "restaurant_count": 12
        }));
        let names = vec![
            row(json!({ "餐厅完整名称": "品牌-成都-一店" })),
            row(json!({ "餐厅完整名称": "品牌-绵阳-二店" })),
        ];

        let metadata = ViewMetadata::from_rows(Some(&aggregate), &names, "餐厅完整名称");
        assert_eq!(metadata.total_rows, json!(1234));
        assert_eq!(metadata.date_range.earliest, "2025-09-01");
        assert_eq!(metadata.date_range.latest, "2025-10-21");
        assert_eq!(metadata.restaurant_count, json!(12));
        assert_eq!(metadata.restaurants, vec!["品牌-成都-一店", "品牌-绵阳-二店"]);
    }

    #[test]
    fn test_metadata_defaults_when_aggregate_missing() {
        let metadata = ViewMetadata::from_rows(None, &[], "餐厅完整名称");
        assert_eq!(metadata.total_rows, json!(0));
        assert_eq!(metadata.restaurant_count, json!(0));
        assert_eq!(metadata.date_range, DateRange::default());
        assert!(metadata.restaurants.is_empty());
    }

    #[test]
    fn test_metadata_null_dates_render_empty() {
        let aggregate = row(json!({ "total_rows": 0, "earliest_date": null, "latest_date": null }));
        let metadata = ViewMetadata::from_rows(Some(&aggregate), &[], "餐厅完整名称");
        assert_eq!(metadata.date_range.earliest, "");
        assert_eq!(metadata.date_range.latest, "");
    }

    #[test]
    fn test_view_queries_reference_view_and_columns() {
        let view = ReportView::ROLEPLAY_DAILY_REPORTS;
        assert_eq!(
            view.sample_query(),
            r#"SELECT * FROM roleplay_daily_reports ORDER BY "运营日期" DESC LIMIT 5"#
        );
        assert!(view.metadata_query().contains(r#"COUNT(DISTINCT "餐厅ID")"#));
        assert!(!view.metadata_query().ends_with(';'));
        assert!(view.entity_names_query().starts_with(r#"SELECT DISTINCT "餐厅完整名称""#));
        assert_eq!(view.usage_hints().len(), 7);
    }
}
