use axum::{
    extract::{Path, Query},
    http::header,
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use service_core::error::AppError;
use service_core::fineract::reports::{Report, ReportRequest, ReportResultSet};
use validator::Validate;

use crate::forms::{blank_as_none, checkbox, FieldKind, FormErrors, FormField, FormView};
use crate::handlers::{confirm, failure, form_errors, outcome, reject, render, PageError};
use crate::models::user::AuthUser;
use crate::views::{opt, yes_no, Cell, Facts, Link, Page, Row, Table};

const REPORT_TYPES: &[&str] = &["Table", "Chart", "SMS", "Pentaho"];

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportForm {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub report_name: String,
    #[validate(length(min = 1, message = "Select a report type"))]
    pub report_type: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub report_category: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub report_sql: Option<String>,
    #[serde(deserialize_with = "checkbox")]
    pub use_report: bool,
}

impl ReportForm {
    fn from_report(report: &Report) -> Self {
        Self {
            report_name: report.report_name.clone(),
            report_type: report.report_type.clone().unwrap_or_default(),
            report_category: report.report_category.clone(),
            description: report.description.clone(),
            report_sql: report.report_sql.clone(),
            use_report: report.use_report,
        }
    }

    fn to_request(&self) -> ReportRequest {
        ReportRequest {
            report_name: self.report_name.trim().to_string(),
            report_type: self.report_type.clone(),
            report_category: self.report_category.clone(),
            description: self.description.clone(),
            report_sql: self.report_sql.clone(),
            use_report: self.use_report,
        }
    }
}

fn form_page(title: &str, action: &str, form: &ReportForm, errors: &FormErrors) -> Page {
    let types = REPORT_TYPES.iter().map(|t| (t.to_string(), t.to_string()));
    let report_type = if form.report_type.is_empty() { "Table" } else { &form.report_type };
    let view = FormView::new(title, action)
        .field(FormField::text("reportName", "Name").value(&form.report_name).required())
        .field(FormField::select("reportType", "Type", types, report_type).required())
        .field(FormField::text("reportCategory", "Category").value(opt(form.report_category.as_deref())))
        .field(FormField::text("description", "Description").value(opt(form.description.as_deref())))
        .field(
            FormField::text("reportSql", "SQL")
                .kind(FieldKind::TextArea)
                .value(opt(form.report_sql.as_deref()))
                .help("Required for table reports"),
        )
        .field(FormField::checkbox("useReport", "Available to users", form.use_report))
        .cancel("/reports")
        .with_errors(errors);
    Page::new("reports", title).form(view)
}

pub async fn list(user: AuthUser) -> Result<Response, PageError> {
    let reports = user.client.list_reports().await?;
    let table = Table::new(&["Name", "Type", "Category", "Core"])
        .empty("No reports")
        .rows(reports.iter().map(|r| {
            let mut row = Row::new(vec![
                Cell::link(r.report_name.clone(), format!("/reports/{}/run", r.id)),
                opt(r.report_type.as_deref()).into(),
                opt(r.report_category.as_deref()).into(),
                yes_no(r.core_report).into(),
            ])
            .action(Link::get("Run", format!("/reports/{}/run", r.id)));
            if !r.core_report {
                row = row
                    .action(Link::get("Edit", format!("/reports/{}/edit", r.id)))
                    .action(Link::get("Delete", format!("/reports/{}/delete", r.id)).danger());
            }
            row
        }));
    let page = Page::new("reports", "Reports")
        .action(Link::get("New report", "/reports/new"))
        .table(table);
    Ok(render(&user, page).await)
}

pub async fn new(user: AuthUser) -> Response {
    render(&user, form_page("New report", "/reports", &ReportForm::default(), &FormErrors::default())).await
}

pub async fn create(user: AuthUser, Form(form): Form<ReportForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.create_report(&form.to_request()).await {
            Ok(_) => return Ok(user.done("Report created", "/reports").await),
            Err(e) => form_errors(e)?,
        },
    };
    Ok(reject(&user, &errors, form_page("New report", "/reports", &form, &errors)).await)
}

pub async fn edit(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let report = user.client.get_report(id).await?;
    let page = form_page("Edit report", &format!("/reports/{id}"), &ReportForm::from_report(&report), &FormErrors::default());
    Ok(render(&user, page).await)
}

pub async fn update(user: AuthUser, Path(id): Path<i64>, Form(form): Form<ReportForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.update_report(id, &form.to_request()).await {
            Ok(_) => return Ok(user.done("Report updated", "/reports").await),
            Err(e) => form_errors(e)?,
        },
    };
    let page = form_page("Edit report", &format!("/reports/{id}"), &form, &errors);
    Ok(reject(&user, &errors, page).await)
}

pub async fn confirm_delete(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let report = user.client.get_report(id).await?;
    Ok(confirm(
        &user,
        "reports",
        "Delete report",
        format!("Delete report {}?", report.report_name),
        &format!("/reports/{id}/delete"),
        "/reports",
    )
    .await)
}

pub async fn delete(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let result = user.client.delete_report(id).await;
    outcome(&user, result, "Report deleted", "/reports").await
}

fn parameter_form(report: &Report, values: &[(String, String)]) -> FormView {
    let mut view = FormView::new("Parameters", format!("/reports/{}/run", report.id)).submit("Run report");
    for parameter in &report.report_parameters {
        let name = parameter.run_name();
        let value = values
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        view = view.field(
            FormField::text(&name, &parameter.parameter_name)
                .value(value)
                .help(&format!("Sent as R_{name}")),
        );
    }
    view
}

pub(crate) fn result_table(result: &ReportResultSet) -> Table {
    let columns = result.column_names();
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    Table::new(&columns)
        .heading(format!("{} rows", result.rows.len()))
        .empty("The report returned no rows")
        .rows(
            result
                .rows
                .iter()
                .map(|row| Row::new(row.iter().cloned().map(Cell::from).collect())),
        )
}

fn report_facts(report: &Report) -> Facts {
    Facts::new()
        .item("Type", opt(report.report_type.as_deref()))
        .item("Category", opt(report.report_category.as_deref()))
        .item("Description", opt(report.description.as_deref()))
}

pub async fn run_form(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let report = user.client.get_report(id).await?;
    let page = Page::new("reports", report.report_name.clone())
        .facts(report_facts(&report))
        .form(parameter_form(&report, &[]));
    Ok(render(&user, page).await)
}

pub async fn run(user: AuthUser, Path(id): Path<i64>, Form(params): Form<Vec<(String, String)>>) -> Result<Response, PageError> {
    let report = user.client.get_report(id).await?;
    let back = format!("/reports/{id}/run");
    let result = match user.client.run_report(&report.report_name, &params).await {
        Ok(result) => result,
        Err(e) => return failure(&user, e, &back).await,
    };

    let csv_href = format!("/reports/{id}/csv?{}", query_string(&params));
    let page = Page::new("reports", report.report_name.clone())
        .action(Link::get("Download CSV", csv_href))
        .form(parameter_form(&report, &params))
        .table(result_table(&result));
    Ok(render(&user, page).await)
}

pub async fn csv(user: AuthUser, Path(id): Path<i64>, Query(params): Query<Vec<(String, String)>>) -> Result<Response, PageError> {
    let report = user.client.get_report(id).await?;
    let result = user.client.run_report(&report.report_name, &params).await?;
    let body = to_csv(&result)?;
    let filename = format!("{}.csv", report.report_name.replace(|c: char| !c.is_ascii_alphanumeric(), "_"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response())
}

fn query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v.trim())))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn to_csv(result: &ReportResultSet) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(result.column_names())
        .map_err(|e| AppError::InternalError(e.into()))?;
    for row in &result.rows {
        writer
            .write_record(row)
            .map_err(|e| AppError::InternalError(e.into()))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("CSV buffer: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::fineract::reports::ColumnHeader;

    #[test]
    fn csv_quotes_cells_with_commas() {
        let result = ReportResultSet {
            column_headers: vec![
                ColumnHeader { column_name: "office".to_string(), column_type: None },
                ColumnHeader { column_name: "clients".to_string(), column_type: None },
            ],
            rows: vec![vec!["Lagos, Ikeja".to_string(), "12".to_string()]],
        };
        let text = String::from_utf8(to_csv(&result).unwrap()).unwrap();
        assert_eq!(text, "office,clients\n\"Lagos, Ikeja\",12\n");
    }

    #[test]
    fn query_string_skips_blank_values() {
        let params = vec![
            ("officeId".to_string(), "1".to_string()),
            ("loanOfficerId".to_string(), " ".to_string()),
            ("endDate".to_string(), "2024-06-30".to_string()),
        ];
        assert_eq!(query_string(&params), "officeId=1&endDate=2024-06-30");
    }
}
