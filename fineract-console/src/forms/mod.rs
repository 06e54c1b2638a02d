//! Form descriptions rendered by the shared form partial, plus the typed
//! parsing and validation helpers the handlers use on submission.

mod errors;
pub mod validators;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use service_core::error::AppError;
use service_core::fineract::dates::parse_iso_date;

pub use errors::FormErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Password,
    Email,
    Number,
    Decimal,
    Date,
    Select,
    MultiSelect,
    Checkbox,
    TextArea,
    Hidden,
}

#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub value: String,
    pub required: bool,
    pub options: Vec<SelectOption>,
    pub error: Option<String>,
    pub help: Option<String>,
}

impl FormField {
    pub fn new(kind: FieldKind, name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            value: String::new(),
            required: false,
            options: Vec::new(),
            error: None,
            help: None,
        }
    }

    pub fn text(name: &str, label: &str) -> Self {
        Self::new(FieldKind::Text, name, label)
    }

    pub fn date(name: &str, label: &str) -> Self {
        Self::new(FieldKind::Date, name, label)
    }

    pub fn decimal(name: &str, label: &str) -> Self {
        Self::new(FieldKind::Decimal, name, label)
    }

    pub fn number(name: &str, label: &str) -> Self {
        Self::new(FieldKind::Number, name, label)
    }

    pub fn hidden(name: &str, value: impl ToString) -> Self {
        Self::new(FieldKind::Hidden, name, "").value(value)
    }

    pub fn checkbox(name: &str, label: &str, checked: bool) -> Self {
        Self::new(FieldKind::Checkbox, name, label).value(if checked { "true" } else { "" })
    }

    /// A single-choice select. `options` are `(value, label)` pairs.
    pub fn select<I>(name: &str, label: &str, options: I, selected: &str) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut field = Self::new(FieldKind::Select, name, label);
        field.options = options
            .into_iter()
            .map(|(value, label)| SelectOption {
                selected: value == selected,
                value,
                label,
            })
            .collect();
        field.value = selected.to_string();
        field
    }

    pub fn multi_select<I>(name: &str, label: &str, options: I, selected: &[String]) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut field = Self::new(FieldKind::MultiSelect, name, label);
        field.options = options
            .into_iter()
            .map(|(value, label)| SelectOption {
                selected: selected.contains(&value),
                value,
                label,
            })
            .collect();
        field
    }

    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn value(mut self, value: impl ToString) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn input_type(&self) -> &'static str {
        match self.kind {
            FieldKind::Password => "password",
            FieldKind::Email => "email",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Hidden => "hidden",
            _ => "text",
        }
    }

    pub fn inputmode(&self) -> &'static str {
        match self.kind {
            FieldKind::Decimal => "decimal",
            FieldKind::Number => "numeric",
            _ => "text",
        }
    }

    pub fn is_select(&self) -> bool {
        self.kind == FieldKind::Select
    }

    pub fn is_multi_select(&self) -> bool {
        self.kind == FieldKind::MultiSelect
    }

    pub fn is_checkbox(&self) -> bool {
        self.kind == FieldKind::Checkbox
    }

    pub fn is_textarea(&self) -> bool {
        self.kind == FieldKind::TextArea
    }

    pub fn is_hidden(&self) -> bool {
        self.kind == FieldKind::Hidden
    }

    pub fn is_checked(&self) -> bool {
        self.value == "true"
    }
}

#[derive(Debug, Clone)]
pub struct FormView {
    pub title: String,
    pub action: String,
    pub submit_label: String,
    pub fields: Vec<FormField>,
    pub cancel: Option<String>,
    /// Messages that belong to no particular field.
    pub errors: Vec<String>,
}

impl FormView {
    pub fn new(title: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            action: action.into(),
            submit_label: "Save".to_string(),
            fields: Vec::new(),
            cancel: None,
            errors: Vec::new(),
        }
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn submit(mut self, label: &str) -> Self {
        self.submit_label = label.to_string();
        self
    }

    pub fn cancel(mut self, href: impl Into<String>) -> Self {
        self.cancel = Some(href.into());
        self
    }

    /// Attach errors to their fields; the rest are shown above the form.
    pub fn with_errors(mut self, errors: &FormErrors) -> Self {
        let mut unmatched = errors.general.clone();
        for (name, message) in &errors.fields {
            match self.fields.iter_mut().find(|f| &f.name == name) {
                Some(field) => field.error = Some(message.clone()),
                None => unmatched.push(message.clone()),
            }
        }
        self.errors = unmatched;
        self
    }
}

/// Deserialize an optional form value, treating a blank input as absent.
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
}

/// HTML checkboxes only submit when ticked.
pub fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(matches!(value.as_deref(), Some("true" | "on" | "1")))
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    parse_iso_date(value.trim()).ok_or_else(|| invalid(field, "is not a valid date"))
}

pub fn parse_optional_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    value.map(|v| parse_date(field, v)).transpose()
}

pub fn parse_amount(field: &str, value: &str) -> Result<Decimal, AppError> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| invalid(field, "is not a valid amount"))
}

pub fn parse_id(field: &str, value: &str) -> Result<i64, AppError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| invalid(field, "is not a valid selection"))
}

pub fn parse_optional_id(field: &str, value: Option<&str>) -> Result<Option<i64>, AppError> {
    value.map(|v| parse_id(field, v)).transpose()
}

fn invalid(field: &str, message: &str) -> AppError {
    AppError::BadRequest(anyhow::anyhow!("{field} {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_marks_the_chosen_option() {
        let field = FormField::select(
            "officeId",
            "Office",
            vec![("1".to_string(), "Head Office".to_string()), ("2".to_string(), "Branch".to_string())],
            "2",
        );
        assert!(!field.options[0].selected);
        assert!(field.options[1].selected);
        assert!(field.is_select());
    }

    #[test]
    fn errors_attach_to_named_fields() {
        let mut errors = FormErrors::default();
        errors.add("firstname", "First name is required");
        errors.add("externalId", "External id already exists");

        let form = FormView::new("New client", "/clients")
            .field(FormField::text("firstname", "First name"))
            .with_errors(&errors);

        assert_eq!(form.fields[0].error.as_deref(), Some("First name is required"));
        assert_eq!(form.errors, vec!["External id already exists".to_string()]);
    }

    #[test]
    fn parsers_report_the_field() {
        assert_eq!(
            parse_date("Activation date", "2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        let err = parse_amount("Amount", "ten").unwrap_err();
        assert_eq!(err.user_message(), "Amount is not a valid amount");
        assert_eq!(parse_optional_id("Staff", None).unwrap(), None);
    }

    #[test]
    fn blank_values_deserialize_as_none() {
        #[derive(Deserialize)]
        struct NoteForm {
            #[serde(default, deserialize_with = "blank_as_none")]
            note: Option<String>,
            #[serde(default, deserialize_with = "checkbox")]
            active: bool,
        }
        let form: NoteForm = serde_json::from_str(r#"{"note": "  "}"#).unwrap();
        assert_eq!(form.note, None);
        assert!(!form.active);

        let form: NoteForm = serde_json::from_str(r#"{"note": "paid", "active": "on"}"#).unwrap();
        assert_eq!(form.note.as_deref(), Some("paid"));
        assert!(form.active);
    }
}
