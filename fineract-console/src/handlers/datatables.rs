use std::collections::BTreeMap;

use askama::Template;
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use serde::Deserialize;
use service_core::fineract::datatables::{
    ColumnSpec, Datatable, DatatableColumn, DatatableRequest, APP_TABLES, COLUMN_TYPES,
};

use crate::forms::{checkbox, FieldKind, FormErrors, FormField, FormView, SelectOption};
use crate::handlers::reports::result_table;
use crate::handlers::{confirm, form_errors, outcome, render, Layout, PageError};
use crate::models::toast::Toast;
use crate::models::user::AuthUser;
use crate::views::{opt, yes_no, Block, Cell, Facts, Link, Page, Row, Table};

const BLANK_COLUMN_ROWS: usize = 8;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatatableFilter {
    pub apptable: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntriesQuery {
    pub apptable: String,
    pub entity_id: i64,
}

/// Column definitions arrive as parallel arrays, one entry per table row.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatatableForm {
    pub datatable_name: String,
    pub apptable_name: String,
    #[serde(deserialize_with = "checkbox")]
    pub multi_row: bool,
    pub column_name: Vec<String>,
    pub column_type: Vec<String>,
    pub column_length: Vec<String>,
    pub column_mandatory: Vec<String>,
    pub column_code: Vec<String>,
}

fn at(values: &[String], index: usize) -> &str {
    values.get(index).map(|v| v.trim()).unwrap_or("")
}

impl DatatableForm {
    fn to_request(&self) -> Result<DatatableRequest, FormErrors> {
        let mut columns = Vec::new();
        for (i, name) in self.column_name.iter().enumerate() {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let length = match at(&self.column_length, i) {
                "" => None,
                value => Some(value.parse::<u32>().map_err(|_| {
                    FormErrors::general(format!("Column '{name}': length must be a whole number"))
                })?),
            };
            let code = at(&self.column_code, i);
            columns.push(ColumnSpec {
                name: name.to_string(),
                kind: at(&self.column_type, i).to_string(),
                length,
                mandatory: at(&self.column_mandatory, i) == "true",
                code: (!code.is_empty()).then(|| code.to_string()),
            });
        }
        let request = DatatableRequest {
            datatable_name: self.datatable_name.trim().to_string(),
            apptable_name: self.apptable_name.clone(),
            multi_row: self.multi_row,
            columns,
        };
        request
            .validate()
            .map_err(|e| FormErrors::general(e.user_message()))?;
        Ok(request)
    }
}

pub struct ColumnRow {
    pub name: String,
    pub types: Vec<SelectOption>,
    pub length: String,
    pub mandatory: bool,
    pub code: String,
}

#[derive(Template)]
#[template(path = "datatable_form.html")]
pub struct DatatableFormTemplate {
    pub layout: Layout,
    pub form: DatatableForm,
    pub apptables: Vec<SelectOption>,
    pub rows: Vec<ColumnRow>,
    pub errors: Vec<String>,
}

fn type_options(selected: &str) -> Vec<SelectOption> {
    COLUMN_TYPES
        .iter()
        .map(|t| SelectOption {
            value: t.to_string(),
            label: t.to_string(),
            selected: *t == selected,
        })
        .collect()
}

async fn form_template(user: &AuthUser, form: DatatableForm, errors: &FormErrors) -> DatatableFormTemplate {
    let filled = form.column_name.iter().filter(|n| !n.trim().is_empty()).count();
    let mut rows: Vec<ColumnRow> = (0..form.column_name.len())
        .filter(|&i| !at(&form.column_name, i).is_empty())
        .map(|i| ColumnRow {
            name: at(&form.column_name, i).to_string(),
            types: type_options(at(&form.column_type, i)),
            length: at(&form.column_length, i).to_string(),
            mandatory: at(&form.column_mandatory, i) == "true",
            code: at(&form.column_code, i).to_string(),
        })
        .collect();
    rows.extend((filled..filled.max(BLANK_COLUMN_ROWS)).map(|_| ColumnRow {
        name: String::new(),
        types: type_options("String"),
        length: String::new(),
        mandatory: false,
        code: String::new(),
    }));
    let apptables = APP_TABLES
        .iter()
        .map(|(table, label)| SelectOption {
            value: table.to_string(),
            label: label.to_string(),
            selected: *table == form.apptable_name,
        })
        .collect();
    let mut messages = errors.general.clone();
    messages.extend(errors.fields.values().cloned());

    DatatableFormTemplate {
        layout: Layout::new(user, "datatables").await,
        form,
        apptables,
        rows,
        errors: messages,
    }
}

fn apptable_label(table: &str) -> &str {
    APP_TABLES
        .iter()
        .find(|(t, _)| *t == table)
        .map(|(_, label)| *label)
        .unwrap_or(table)
}

pub async fn list(user: AuthUser, Query(filter): Query<DatatableFilter>) -> Result<Response, PageError> {
    let tables = user.client.list_datatables(Some(&filter.apptable)).await?;
    let table = Table::new(&["Name", "Attached to", "Columns"])
        .empty("No data tables")
        .rows(tables.iter().map(|t| {
            Row::new(vec![
                Cell::link(t.registered_table_name.clone(), format!("/datatables/{}", t.registered_table_name)),
                apptable_label(&t.application_table_name).into(),
                t.column_header_data.len().to_string().into(),
            ])
            .action(Link::get("Delete", format!("/datatables/{}/delete", t.registered_table_name)).danger())
        }));
    let mut filters = vec![Link::get("All", "/datatables")];
    filters.extend(
        APP_TABLES
            .iter()
            .map(|(t, label)| Link::get(*label, format!("/datatables?apptable={t}"))),
    );
    let page = Page::new("datatables", "Data tables")
        .action(Link::get("New data table", "/datatables/new"))
        .block(Block::Actions(filters))
        .table(table);
    Ok(render(&user, page).await)
}

pub async fn new(user: AuthUser) -> Response {
    let form = DatatableForm {
        apptable_name: "m_client".to_string(),
        ..DatatableForm::default()
    };
    form_template(&user, form, &FormErrors::default()).await.into_response()
}

pub async fn create(user: AuthUser, Form(form): Form<DatatableForm>) -> Result<Response, PageError> {
    let errors = match form.to_request() {
        Err(errors) => errors,
        Ok(request) => match user.client.create_datatable(&request).await {
            Ok(_) => {
                let to = format!("/datatables/{}", request.datatable_name);
                return Ok(user.done("Data table created", &to).await);
            }
            Err(e) => form_errors(e)?,
        },
    };
    user.toast(Toast::error(errors.summary())).await;
    let page = form_template(&user, form, &errors).await;
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

pub async fn show(user: AuthUser, Path(name): Path<String>) -> Result<Response, PageError> {
    let table = user.client.get_datatable(&name).await?;
    let columns = Table::new(&["Column", "Type", "Length", "Nullable", "Code"])
        .heading("Columns")
        .rows(table.column_header_data.iter().map(|c| {
            Row::new(vec![
                c.column_name.clone().into(),
                opt(c.column_display_type.as_deref().or(c.column_type.as_deref())).into(),
                opt(c.column_length).into(),
                yes_no(c.is_column_nullable).into(),
                opt(c.column_code.as_deref()).into(),
            ])
        }));
    let page = Page::new("datatables", table.registered_table_name.clone())
        .action(Link::get("Delete", format!("/datatables/{name}/delete")).danger())
        .facts(
            Facts::new()
                .item("Attached to", apptable_label(&table.application_table_name))
                .item("Sub-type", opt(table.entity_sub_type.as_deref())),
        )
        .table(columns);
    Ok(render(&user, page).await)
}

pub async fn confirm_delete(user: AuthUser, Path(name): Path<String>) -> Response {
    confirm(
        &user,
        "datatables",
        "Delete data table",
        format!("Delete {name} and every entry stored in it?"),
        &format!("/datatables/{name}/delete"),
        &format!("/datatables/{name}"),
    )
    .await
}

pub async fn delete(user: AuthUser, Path(name): Path<String>) -> Result<Response, PageError> {
    let result = user.client.delete_datatable(&name).await;
    outcome(&user, result, "Data table deleted", "/datatables").await
}

fn entry_field(column: &DatatableColumn) -> FormField {
    let label = column.column_name.replace('_', " ");
    let kind = match column.column_display_type.as_deref().or(column.column_type.as_deref()) {
        _ if column.is_date() => FieldKind::Date,
        Some("DECIMAL") | Some("Decimal") => FieldKind::Decimal,
        Some("INTEGER") | Some("Number") | Some("CODELOOKUP") => FieldKind::Number,
        Some("TEXT") | Some("Text") => FieldKind::TextArea,
        _ => FieldKind::Text,
    };
    let mut field = FormField::new(kind, &column.column_name, &label);
    if !column.is_column_nullable {
        field = field.required();
    }
    if let Some(code) = &column.column_code {
        field = field.help(&format!("Code value id from {code}"));
    }
    field
}

fn entry_form(table: &Datatable, entity_id: i64, apptable: &str) -> FormView {
    let action = format!(
        "/datatables/{}/entries/{entity_id}?apptable={apptable}",
        table.registered_table_name
    );
    table
        .editable_columns()
        .fold(FormView::new(format!("Add to {}", table.registered_table_name), action), |view, column| {
            view.field(entry_field(column))
        })
        .submit("Add entry")
}

/// Every data table attached to one record, with its entries.
pub async fn entries(user: AuthUser, Query(query): Query<EntriesQuery>) -> Result<Response, PageError> {
    let tables = user.client.list_datatables(Some(&query.apptable)).await?;
    let mut page = Page::new(
        "datatables",
        format!("{} {} data tables", apptable_label(&query.apptable), query.entity_id),
    );
    if tables.is_empty() {
        page = page.text("No data tables are attached to this kind of record.");
    }
    for table in &tables {
        let result = user
            .client
            .datatable_entries(&table.registered_table_name, query.entity_id)
            .await?;
        page = page
            .table(result_table(&result).heading(table.registered_table_name.clone()).empty("No entries"))
            .form(entry_form(table, query.entity_id, &query.apptable));
    }
    Ok(render(&user, page).await)
}

pub async fn add_entry(
    user: AuthUser,
    Path((name, entity_id)): Path<(String, i64)>,
    Query(filter): Query<DatatableFilter>,
    axum::Form(values): axum::Form<BTreeMap<String, String>>,
) -> Result<Response, PageError> {
    let result = match user.client.get_datatable(&name).await {
        Ok(table) => user.client.add_datatable_entry(&table, entity_id, &values).await,
        Err(e) => Err(e),
    };
    let back = format!("/datatables/entries?apptable={}&entityId={entity_id}", filter.apptable);
    outcome(&user, result, "Entry added", &back).await
}
