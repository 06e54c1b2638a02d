//! Custom data tables registered against core entities (`/datatables`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::client::{CommandResult, FineractClient, segment};
use super::dates::{Localized, format_date, parse_iso_date};
use super::error::FineractError;
use super::normalize::into_items;
use super::reports::{ColumnHeader, ReportResultSet, cell_text};

/// Core tables a datatable can be attached to.
pub const APP_TABLES: &[(&str, &str)] = &[
    ("m_client", "Client"),
    ("m_group", "Group"),
    ("m_center", "Center"),
    ("m_office", "Office"),
    ("m_loan", "Loan"),
    ("m_savings_account", "Savings account"),
    ("m_product_loan", "Loan product"),
    ("m_savings_product", "Savings product"),
];

/// Column types accepted when creating a datatable.
pub const COLUMN_TYPES: &[&str] = &[
    "String", "Number", "Decimal", "Boolean", "Date", "DateTime", "Text", "Dropdown",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datatable {
    pub application_table_name: String,
    pub registered_table_name: String,
    pub entity_sub_type: Option<String>,
    #[serde(default)]
    pub column_header_data: Vec<DatatableColumn>,
}

impl Datatable {
    /// Columns a user fills in; the key and audit columns are managed by Fineract.
    pub fn editable_columns(&self) -> impl Iterator<Item = &DatatableColumn> {
        self.column_header_data.iter().filter(|c| {
            !c.is_column_primary_key
                && !matches!(
                    c.column_name.as_str(),
                    "id" | "client_id" | "loan_id" | "group_id" | "office_id"
                        | "savings_account_id" | "created_at" | "updated_at"
                )
        })
    }

    /// Request body for a new row. Blank values are left out so nullable
    /// columns stay null; date columns arrive as `yyyy-mm-dd` and are
    /// rewritten to the format announced by [`Localized`].
    pub fn entry_body(&self, values: &BTreeMap<String, String>) -> Result<Map<String, Value>, FineractError> {
        let mut body = Map::new();
        for (name, value) in values {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let is_date = self
                .column_header_data
                .iter()
                .any(|c| c.column_name == *name && c.is_date());
            let value = if is_date {
                let date = parse_iso_date(value).ok_or_else(|| {
                    FineractError::Invalid(format!("{} must be a date", name.replace('_', " ")))
                })?;
                format_date(date)
            } else {
                value.to_string()
            };
            body.insert(name.clone(), Value::String(value));
        }
        if body.is_empty() {
            return Err(FineractError::Invalid("Enter at least one value".to_string()));
        }
        Ok(body)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatatableColumn {
    pub column_name: String,
    pub column_type: Option<String>,
    pub column_display_type: Option<String>,
    pub column_length: Option<i64>,
    #[serde(default)]
    pub is_column_nullable: bool,
    #[serde(default)]
    pub is_column_primary_key: bool,
    pub column_code: Option<String>,
}

impl DatatableColumn {
    pub fn is_date(&self) -> bool {
        matches!(
            self.column_display_type.as_deref().or(self.column_type.as_deref()),
            Some("DATE") | Some("Date")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    pub mandatory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatatableRequest {
    pub datatable_name: String,
    pub apptable_name: String,
    pub multi_row: bool,
    pub columns: Vec<ColumnSpec>,
}

impl DatatableRequest {
    pub fn validate(&self) -> Result<(), FineractError> {
        let name = self.datatable_name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FineractError::Invalid(
                "Table name may only contain letters, digits and underscores".to_string(),
            ));
        }
        if !APP_TABLES.iter().any(|(t, _)| *t == self.apptable_name) {
            return Err(FineractError::Invalid(format!(
                "Unknown entity table '{}'",
                self.apptable_name
            )));
        }
        if self.columns.is_empty() {
            return Err(FineractError::Invalid("Add at least one column".to_string()));
        }
        let mut names = std::collections::HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(FineractError::Invalid("Column names are required".to_string()));
            }
            if !names.insert(column.name.to_lowercase()) {
                return Err(FineractError::Invalid(format!(
                    "Column '{}' is defined twice",
                    column.name
                )));
            }
            if !COLUMN_TYPES.contains(&column.kind.as_str()) {
                return Err(FineractError::Invalid(format!(
                    "Column '{}' has unknown type '{}'",
                    column.name, column.kind
                )));
            }
            if column.kind == "String" && column.length.is_none_or(|l| l == 0) {
                return Err(FineractError::Invalid(format!(
                    "String column '{}' needs a length",
                    column.name
                )));
            }
            if column.kind == "Dropdown" && column.code.as_deref().is_none_or(str::is_empty) {
                return Err(FineractError::Invalid(format!(
                    "Dropdown column '{}' needs a code",
                    column.name
                )));
            }
        }
        Ok(())
    }
}

impl FineractClient {
    pub async fn list_datatables(&self, apptable: Option<&str>) -> Result<Vec<Datatable>, FineractError> {
        let query: Vec<(&str, String)> = apptable
            .filter(|t| !t.is_empty())
            .map(|t| vec![("apptable", t.to_string())])
            .unwrap_or_default();
        let value = self.get_value("datatables", &query).await?;
        into_items(value)
    }

    pub async fn get_datatable(&self, name: &str) -> Result<Datatable, FineractError> {
        self.get_json(&format!("datatables/{}", segment(name)), &[])
            .await
    }

    pub async fn create_datatable(&self, request: &DatatableRequest) -> Result<CommandResult, FineractError> {
        request.validate()?;
        let result: CommandResult = self.post_json("datatables", &[], request).await?;
        tracing::info!(
            datatable = %request.datatable_name,
            apptable = %request.apptable_name,
            columns = request.columns.len(),
            "Datatable created"
        );
        Ok(result)
    }

    pub async fn delete_datatable(&self, name: &str) -> Result<CommandResult, FineractError> {
        let result = self
            .delete_json(&format!("datatables/{}", segment(name)))
            .await?;
        tracing::info!(datatable = %name, "Datatable deleted");
        Ok(result)
    }

    pub async fn datatable_entries(&self, name: &str, entity_id: i64) -> Result<ReportResultSet, FineractError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Entries {
            #[serde(default)]
            column_headers: Vec<ColumnHeader>,
            #[serde(default)]
            data: Vec<Row>,
        }
        #[derive(Deserialize)]
        struct Row {
            #[serde(default)]
            row: Vec<Value>,
        }

        let entries: Entries = self
            .get_json(
                &format!("datatables/{}/{entity_id}", segment(name)),
                &[("genericResultSet", "true".to_string())],
            )
            .await?;
        Ok(ReportResultSet {
            column_headers: entries.column_headers,
            rows: entries
                .data
                .iter()
                .map(|r| r.row.iter().map(cell_text).collect())
                .collect(),
        })
    }

    pub async fn add_datatable_entry(
        &self,
        table: &Datatable,
        entity_id: i64,
        values: &BTreeMap<String, String>,
    ) -> Result<CommandResult, FineractError> {
        let body = table.entry_body(values)?;
        let name = &table.registered_table_name;
        let result = self
            .post_json(
                &format!("datatables/{}/{entity_id}", segment(name)),
                &[],
                &Localized::new(body),
            )
            .await?;
        tracing::info!(datatable = %name, entity_id, "Datatable entry added");
        Ok(result)
    }
}
