//! Composition and submission of Fineract batch requests (`/batches`).
//!
//! Each sub-request gets an id in insertion order starting at 1. A request
//! may name an earlier one as its `reference`, in which case Fineract runs
//! it only after the referenced request succeeded and lets its body use
//! `$.field` placeholders resolved against the parent's response.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::FineractClient;
use super::error::FineractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl BatchMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Some(BatchMethod::Get),
            "POST" => Some(BatchMethod::Post),
            "PUT" => Some(BatchMethod::Put),
            "DELETE" => Some(BatchMethod::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for BatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchMethod::Get => "GET",
            BatchMethod::Post => "POST",
            BatchMethod::Put => "PUT",
            BatchMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchHeader {
    pub name: String,
    pub value: String,
}

/// One sub-request. `body` holds the JSON document as a string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub request_id: u32,
    pub relative_url: String,
    pub method: BatchMethod,
    pub headers: Vec<BatchHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub request_id: u32,
    pub status_code: u16,
    #[serde(default)]
    pub headers: Vec<BatchHeader>,
    pub body: Option<String>,
}

impl BatchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Error text from a failed sub-request body, or the raw body.
    pub fn summary(&self) -> String {
        let body = self.body.as_deref().unwrap_or("");
        if self.is_success() {
            return body.to_string();
        }
        let status = reqwest::StatusCode::from_u16(self.status_code)
            .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        FineractError::from_response(status, body).user_message()
    }
}

#[derive(Debug, Default, Clone)]
pub struct BatchBuilder {
    requests: Vec<BatchRequest>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Append a request and return its id.
    pub fn push(
        &mut self,
        method: BatchMethod,
        relative_url: &str,
        reference: Option<u32>,
        body: Option<&Value>,
    ) -> Result<u32, FineractError> {
        let request_id = self.requests.len() as u32 + 1;
        let relative_url = relative_url.trim().trim_start_matches('/').to_string();
        if relative_url.is_empty() {
            return Err(FineractError::Invalid(format!(
                "Request {request_id}: relative URL is required"
            )));
        }
        if let Some(parent) = reference
            && (parent == 0 || parent >= request_id)
        {
            return Err(FineractError::Invalid(format!(
                "Request {request_id}: reference {parent} must point to an earlier request"
            )));
        }
        let body = body.map(serde_json::to_string).transpose()?;
        let mut headers = Vec::new();
        if body.is_some() {
            headers.push(BatchHeader {
                name: "Content-Type".to_string(),
                value: "application/json".to_string(),
            });
        }

        self.requests.push(BatchRequest {
            request_id,
            relative_url,
            method,
            headers,
            reference,
            body,
        });
        Ok(request_id)
    }

    /// Parse one request per line: `METHOD relative_url [ref] | json body`.
    ///
    /// Blank lines and lines starting with `#` are skipped. The reference
    /// may be written as `3` or `ref=3`.
    pub fn parse(text: &str) -> Result<Self, FineractError> {
        let mut builder = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line_no = index + 1;
            let (head, body) = match line.split_once('|') {
                Some((head, body)) => (head.trim(), Some(body.trim())),
                None => (line, None),
            };

            let mut parts = head.split_whitespace();
            let method = parts
                .next()
                .and_then(BatchMethod::parse)
                .ok_or_else(|| invalid_line(line_no, "expected GET, POST, PUT or DELETE"))?;
            let url = parts
                .next()
                .ok_or_else(|| invalid_line(line_no, "missing relative URL"))?;
            let reference = parts
                .next()
                .map(|r| {
                    r.trim_start_matches("ref=")
                        .parse::<u32>()
                        .map_err(|_| invalid_line(line_no, "reference must be a request number"))
                })
                .transpose()?;
            if parts.next().is_some() {
                return Err(invalid_line(line_no, "unexpected text before '|'"));
            }

            let body = body
                .filter(|b| !b.is_empty())
                .map(|b| {
                    serde_json::from_str::<Value>(b)
                        .map_err(|e| invalid_line(line_no, &format!("body is not valid JSON ({e})")))
                })
                .transpose()?;

            builder.push(method, url, reference, body.as_ref())?;
        }
        if builder.is_empty() {
            return Err(FineractError::Invalid("Enter at least one request".to_string()));
        }
        Ok(builder)
    }

    pub fn requests(&self) -> &[BatchRequest] {
        &self.requests
    }

    pub fn build(self) -> Vec<BatchRequest> {
        self.requests
    }
}

fn invalid_line(line: usize, message: &str) -> FineractError {
    FineractError::Invalid(format!("Line {line}: {message}"))
}

impl FineractClient {
    pub async fn submit_batch(
        &self,
        requests: &[BatchRequest],
        enclosing_transaction: bool,
    ) -> Result<Vec<BatchResponse>, FineractError> {
        if requests.is_empty() {
            return Err(FineractError::Invalid("Batch is empty".to_string()));
        }
        let responses: Vec<BatchResponse> = self
            .post_json(
                "batches",
                &[("enclosingTransaction", enclosing_transaction.to_string())],
                requests,
            )
            .await?;
        let failed = responses.iter().filter(|r| !r.is_success()).count();
        tracing::info!(
            requests = requests.len(),
            failed,
            enclosing_transaction,
            "Batch submitted"
        );
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assigns_sequential_ids_and_strips_slash() {
        let mut builder = BatchBuilder::new();
        let first = builder
            .push(BatchMethod::Post, "/clients", None, Some(&json!({"firstname": "Ada"})))
            .unwrap();
        let second = builder
            .push(BatchMethod::Get, "clients/$.clientId", Some(first), None)
            .unwrap();
        assert_eq!((first, second), (1, 2));

        let requests = builder.build();
        assert_eq!(requests[0].relative_url, "clients");
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"firstname":"Ada"}"#));
        assert_eq!(requests[1].reference, Some(1));
        assert!(requests[1].headers.is_empty());
    }

    #[test]
    fn rejects_forward_and_self_references() {
        let mut builder = BatchBuilder::new();
        assert!(builder.push(BatchMethod::Get, "offices", Some(1), None).is_err());
        builder.push(BatchMethod::Get, "offices", None, None).unwrap();
        assert!(builder.push(BatchMethod::Get, "offices", Some(2), None).is_err());
        assert!(builder.push(BatchMethod::Get, "offices", Some(0), None).is_err());
    }

    #[test]
    fn body_is_serialised_as_string() {
        let mut builder = BatchBuilder::new();
        builder
            .push(BatchMethod::Post, "loans", None, Some(&json!({"principal": 1000})))
            .unwrap();
        let value = serde_json::to_value(builder.build()).unwrap();
        assert_eq!(value[0]["body"], json!("{\"principal\":1000}"));
        assert_eq!(value[0]["method"], "POST");
        assert_eq!(value[0]["requestId"], 1);
        assert!(value[0].get("reference").is_none());
    }

    #[test]
    fn parses_text_rows() {
        let text = "\
# create then fetch
POST clients | {\"officeId\": 1}

GET clients/$.clientId ref=1
";
        let builder = BatchBuilder::parse(text).unwrap();
        let requests = builder.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, BatchMethod::Post);
        assert_eq!(requests[1].reference, Some(1));
    }

    #[test]
    fn parse_reports_line_numbers() {
        let err = BatchBuilder::parse("GET offices\nPATCH clients").unwrap_err();
        assert!(err.user_message().starts_with("Line 2"));

        let err = BatchBuilder::parse("POST clients | {not json").unwrap_err();
        assert!(err.user_message().contains("not valid JSON"));

        assert!(BatchBuilder::parse("  \n# only comments").is_err());
    }

    #[test]
    fn failed_response_summary_uses_error_message() {
        let response = BatchResponse {
            request_id: 1,
            status_code: 400,
            headers: vec![],
            body: Some(json!({"defaultUserMessage": "Office is required"}).to_string()),
        };
        assert!(!response.is_success());
        assert_eq!(response.summary(), "Office is required");
    }
}
