use std::collections::BTreeMap;

use service_core::fineract::FineractError;
use validator::ValidationErrors;

/// Per-field messages collected from validation or from Fineract.
///
/// Keys are the HTML field names, which follow Fineract's camelCase
/// parameter names so both sources line up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    pub fields: BTreeMap<String, String>,
    pub general: Vec<String>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self {
            general: vec![message.into()],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.general.is_empty()
    }

    /// First message, for the error toast.
    pub fn summary(&self) -> String {
        self.general
            .first()
            .or_else(|| self.fields.values().next())
            .cloned()
            .unwrap_or_else(|| "Some fields are invalid".to_string())
    }
}

impl From<&ValidationErrors> for FormErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut out = FormErrors::default();
        for (field, errs) in errors.field_errors() {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "Invalid value".to_string());
            let field = field.to_string();
            if field == "__all__" {
                out.general.push(message);
            } else {
                out.add(&camel_case(&field), message);
            }
        }
        out
    }
}

impl From<&FineractError> for FormErrors {
    fn from(error: &FineractError) -> Self {
        let mut out = FormErrors::default();
        for field_error in error.field_errors() {
            match &field_error.parameter {
                Some(parameter) => out.add(parameter, field_error.message.clone()),
                None => out.general.push(field_error.message.clone()),
            }
        }
        let message = error
            .summary()
            .map(str::to_string)
            .unwrap_or_else(|| error.user_message());
        if !out.fields.values().any(|m| *m == message) && !out.general.contains(&message) {
            out.general.insert(0, message);
        }
        out
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use validator::Validate;

    #[derive(Validate)]
    struct OfficeChoice {
        #[validate(length(min = 1, message = "Office is required"))]
        office_id: String,
    }

    #[test]
    fn validation_keys_become_field_names() {
        let errors = OfficeChoice { office_id: String::new() }.validate().unwrap_err();
        let form_errors = FormErrors::from(&errors);
        assert_eq!(form_errors.fields["officeId"], "Office is required");
        assert_eq!(form_errors.summary(), "Office is required");
    }

    #[test]
    fn fineract_field_errors_are_kept_per_parameter() {
        let error = FineractError::from_response(
            StatusCode::BAD_REQUEST,
            r#"{"defaultUserMessage":"Validation errors exist.",
                "errors":[{"parameterName":"firstname","defaultUserMessage":"The parameter `firstname` is mandatory."}]}"#,
        );
        let form_errors = FormErrors::from(&error);
        assert_eq!(form_errors.fields["firstname"], "The parameter `firstname` is mandatory.");
        assert_eq!(form_errors.general, vec!["Validation errors exist.".to_string()]);
        assert_eq!(form_errors.summary(), "Validation errors exist.");
    }

    #[test]
    fn repeated_envelope_message_is_not_duplicated() {
        let error = FineractError::from_response(
            StatusCode::FORBIDDEN,
            r#"{"defaultUserMessage":"Role with name `Teller` already exists",
                "errors":[{"parameterName":"name","defaultUserMessage":"Role with name `Teller` already exists"}]}"#,
        );
        let form_errors = FormErrors::from(&error);
        assert!(form_errors.general.is_empty());
        assert_eq!(form_errors.fields["name"], "Role with name `Teller` already exists");
    }
}
