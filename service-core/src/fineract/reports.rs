//! Reports and report execution (`/reports`, `/runreports`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{CommandResult, FineractClient, segment};
use super::error::FineractError;
use super::normalize::into_items;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub report_name: String,
    pub report_type: Option<String>,
    pub report_sub_type: Option<String>,
    pub report_category: Option<String>,
    pub description: Option<String>,
    pub report_sql: Option<String>,
    #[serde(default)]
    pub core_report: bool,
    #[serde(default)]
    pub use_report: bool,
    #[serde(default)]
    pub report_parameters: Vec<ReportParameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParameter {
    pub id: Option<i64>,
    pub parameter_id: i64,
    pub parameter_name: String,
    pub report_parameter_name: Option<String>,
}

impl ReportParameter {
    /// Name used in the `R_<name>` query parameter when running the report.
    pub fn run_name(&self) -> String {
        let name = self
            .report_parameter_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.parameter_name);
        name.trim_end_matches("Select").to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub report_name: String,
    pub report_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_sql: Option<String>,
    pub use_report: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnHeader {
    pub column_name: String,
    pub column_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResultRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenericResultSet {
    #[serde(default)]
    column_headers: Vec<ColumnHeader>,
    #[serde(default)]
    data: Vec<ResultRow>,
}

/// Tabular result of running a report, with every cell rendered as text.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportResultSet {
    pub column_headers: Vec<ColumnHeader>,
    pub rows: Vec<Vec<String>>,
}

impl ReportResultSet {
    pub fn column_names(&self) -> Vec<String> {
        self.column_headers
            .iter()
            .map(|c| c.column_name.clone())
            .collect()
    }
}

impl From<GenericResultSet> for ReportResultSet {
    fn from(set: GenericResultSet) -> Self {
        let rows = set
            .data
            .into_iter()
            .map(|r| r.row.iter().map(cell_text).collect())
            .collect();
        Self {
            column_headers: set.column_headers,
            rows,
        }
    }
}

/// Render a JSON cell the way a table should show it.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(parts) if parts.len() == 3 && parts.iter().all(Value::is_i64) => {
            // [yyyy, m, d]
            let p: Vec<i64> = parts.iter().filter_map(Value::as_i64).collect();
            format!("{:04}-{:02}-{:02}", p[0], p[1], p[2])
        }
        other => other.to_string(),
    }
}

impl FineractClient {
    pub async fn list_reports(&self) -> Result<Vec<Report>, FineractError> {
        let value = self.get_value("reports", &[]).await?;
        into_items(value)
    }

    pub async fn get_report(&self, report_id: i64) -> Result<Report, FineractError> {
        self.get_json(&format!("reports/{report_id}"), &[]).await
    }

    pub async fn create_report(&self, request: &ReportRequest) -> Result<CommandResult, FineractError> {
        let result: CommandResult = self.post_json("reports", &[], request).await?;
        tracing::info!(report_id = ?result.resource_id, name = %request.report_name, "Report created");
        Ok(result)
    }

    pub async fn update_report(
        &self,
        report_id: i64,
        request: &ReportRequest,
    ) -> Result<CommandResult, FineractError> {
        self.put_json(&format!("reports/{report_id}"), request).await
    }

    /// Core reports cannot be deleted; Fineract rejects the call.
    pub async fn delete_report(&self, report_id: i64) -> Result<CommandResult, FineractError> {
        self.delete_json(&format!("reports/{report_id}")).await
    }

    /// Run a report; `params` are sent as `R_<name>=<value>`.
    pub async fn run_report(
        &self,
        report_name: &str,
        params: &[(String, String)],
    ) -> Result<ReportResultSet, FineractError> {
        let mut query: Vec<(&str, String)> = vec![("genericResultSet", "true".to_string())];
        let named: Vec<(String, String)> = params
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (format!("R_{}", k.trim_start_matches("R_")), v.trim().to_string()))
            .collect();
        query.extend(named.iter().map(|(k, v)| (k.as_str(), v.clone())));

        let set: GenericResultSet = self
            .get_json(&format!("runreports/{}", segment(report_name)), &query)
            .await?;
        tracing::info!(report = %report_name, rows = set.data.len(), "Report executed");
        Ok(set.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_set_renders_cells() {
        let set: GenericResultSet = serde_json::from_value(json!({
            "columnHeaders": [{"columnName": "id"}, {"columnName": "name"}, {"columnName": "opened"}, {"columnName": "note"}],
            "data": [{"row": [1, "Head Office", [2009, 1, 1], null]}]
        }))
        .unwrap();
        let result = ReportResultSet::from(set);
        assert_eq!(result.column_names(), vec!["id", "name", "opened", "note"]);
        assert_eq!(result.rows[0], vec!["1", "Head Office", "2009-01-01", ""]);
    }

    #[test]
    fn parameter_run_name_strips_select_suffix() {
        let param = ReportParameter {
            id: Some(1),
            parameter_id: 5,
            parameter_name: "OfficeIdSelectOne".to_string(),
            report_parameter_name: Some("officeIdSelect".to_string()),
        };
        assert_eq!(param.run_name(), "officeId");
    }
}
