use axum::{response::Response, Form};
use serde::Deserialize;
use service_core::fineract::batch::{BatchBuilder, BatchRequest, BatchResponse};

use crate::forms::{checkbox, FieldKind, FormField, FormView};
use crate::handlers::{form_errors, reject, render, PageError};
use crate::models::user::AuthUser;
use crate::views::{opt, Page, Row, Table};

const EXAMPLE: &str = "# METHOD relative-url [ref] | json body\n\
POST clients | {\"officeId\": 1, \"legalFormId\": 1, \"firstname\": \"Ada\", \"lastname\": \"Obi\", \"active\": false}\n\
GET clients/$.clientId ref=1";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BatchForm {
    pub requests: String,
    #[serde(deserialize_with = "checkbox")]
    pub enclosing_transaction: bool,
}

fn batch_form(form: &BatchForm) -> FormView {
    FormView::new("Batch requests", "/batch")
        .field(
            FormField::text("requests", "Requests")
                .kind(FieldKind::TextArea)
                .value(&form.requests)
                .required()
                .help("One request per line. A reference runs the line after the numbered request succeeds."),
        )
        .field(FormField::checkbox(
            "enclosingTransaction",
            "Run in one transaction (all or nothing)",
            form.enclosing_transaction,
        ))
        .submit("Submit batch")
}

fn request_table(requests: &[BatchRequest]) -> Table {
    Table::new(&["#", "Method", "URL", "Ref", "Body"])
        .heading("Requests")
        .rows(requests.iter().map(|r| {
            Row::new(vec![
                r.request_id.to_string().into(),
                r.method.to_string().into(),
                r.relative_url.clone().into(),
                opt(r.reference).into(),
                opt(r.body.as_deref()).into(),
            ])
        }))
}

fn response_table(responses: &[BatchResponse]) -> Table {
    Table::new(&["#", "Status", "Outcome"])
        .heading("Responses")
        .empty("Fineract returned no responses")
        .rows(responses.iter().map(|r| {
            Row::new(vec![
                r.request_id.to_string().into(),
                r.status_code.to_string().into(),
                r.summary().into(),
            ])
        }))
}

pub async fn show(user: AuthUser) -> Response {
    let form = BatchForm {
        requests: EXAMPLE.to_string(),
        enclosing_transaction: true,
    };
    let page = Page::new("batch", "Batch")
        .text("Send several API calls in one round trip. Later requests can use $.field values from the request they reference.")
        .form(batch_form(&form));
    render(&user, page).await
}

pub async fn submit(user: AuthUser, Form(form): Form<BatchForm>) -> Result<Response, PageError> {
    let builder = match BatchBuilder::parse(&form.requests) {
        Ok(builder) => builder,
        Err(e) => {
            let errors = form_errors(e)?;
            let page = Page::new("batch", "Batch").form(batch_form(&form).with_errors(&errors));
            return Ok(reject(&user, &errors, page).await);
        }
    };
    let requests = builder.build();
    let responses = match user.client.submit_batch(&requests, form.enclosing_transaction).await {
        Ok(responses) => responses,
        Err(e) => {
            let errors = form_errors(e)?;
            let page = Page::new("batch", "Batch")
                .table(request_table(&requests))
                .form(batch_form(&form).with_errors(&errors));
            return Ok(reject(&user, &errors, page).await);
        }
    };

    let failed = responses.iter().filter(|r| !r.is_success()).count();
    let summary = match (failed, form.enclosing_transaction) {
        (0, _) => format!("All {} requests succeeded.", responses.len()),
        (_, true) => format!("{failed} request(s) failed; the transaction was rolled back."),
        (_, false) => format!("{failed} of {} request(s) failed.", responses.len()),
    };
    let page = Page::new("batch", "Batch results")
        .text(summary)
        .table(request_table(&requests))
        .table(response_table(&responses))
        .form(batch_form(&form));
    Ok(render(&user, page).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_parses() {
        let builder = BatchBuilder::parse(EXAMPLE).unwrap();
        let table = request_table(builder.requests());
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].cells[3].text, "1");
    }

    #[test]
    fn failed_responses_show_the_fineract_message() {
        let responses = vec![BatchResponse {
            request_id: 1,
            status_code: 404,
            headers: vec![],
            body: Some(r#"{"defaultUserMessage":"Client with identifier 9 does not exist"}"#.to_string()),
        }];
        let table = response_table(&responses);
        assert_eq!(table.rows[0].cells[2].text, "Client with identifier 9 does not exist");
    }
}
