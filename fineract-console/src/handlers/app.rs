use axum::response::{IntoResponse, Redirect, Response};
use service_core::fineract::clients::ClientQuery;
use service_core::fineract::loans::LoanQuery;
use service_core::fineract::FineractError;

use crate::handlers::{render, PageError};
use crate::models::user::AuthUser;
use crate::views::{Cell, Facts, Link, Page, Row, Table};

pub async fn index() -> impl IntoResponse {
    Redirect::to("/dashboard")
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// Headline numbers; a failing source shows as unavailable, an expired
/// session still sends the operator back to sign in.
pub async fn dashboard(user: AuthUser) -> Result<Response, PageError> {
    let client = &user.client;
    let client_query = ClientQuery::page(0, 1);
    let loan_query = LoanQuery {
        limit: 1,
        ..LoanQuery::default()
    };
    let (clients, loans, jobs, scheduler) = tokio::join!(
        client.list_clients(&client_query),
        client.list_loans(&loan_query),
        client.list_jobs(),
        client.scheduler_status(),
    );

    let clients = count(clients.map(|p| p.total))?;
    let loans = count(loans.map(|p| p.total))?;
    let scheduler = match scheduler {
        Ok(status) if status.active => "Running".to_string(),
        Ok(_) => "Stopped".to_string(),
        Err(FineractError::Unauthorized) => return Err(FineractError::Unauthorized.into()),
        Err(_) => "Unavailable".to_string(),
    };

    let mut page = Page::new("dashboard", "Dashboard");
    let mut facts = Facts::new()
        .item("Clients", clients)
        .item("Loans", loans)
        .item("Scheduler", scheduler);

    match jobs {
        Ok(jobs) => {
            let failed: Vec<_> = jobs.iter().filter(|j| j.last_status() == "failed").collect();
            facts = facts
                .item("Scheduler jobs", jobs.len().to_string())
                .item("Jobs failed on last run", failed.len().to_string());
            page = page.facts(facts);
            if !failed.is_empty() {
                page = page.table(
                    Table::new(&["Job", "Error"]).heading("Failed jobs").rows(failed.iter().map(|job| {
                        let error = job
                            .last_run_history
                            .as_ref()
                            .and_then(|run| run.job_run_error_message.clone())
                            .unwrap_or_default();
                        Row::new(vec![
                            Cell::link(job.display_name.clone(), format!("/jobs/{}/history", job.job_id)),
                            error.into(),
                        ])
                    })),
                );
            }
        }
        Err(FineractError::Unauthorized) => return Err(FineractError::Unauthorized.into()),
        Err(_) => page = page.facts(facts.item("Scheduler jobs", "Unavailable")),
    }

    let page = page
        .action(Link::get("New client", "/clients/new"))
        .action(Link::get("Collection sheet", "/collection-sheet"));
    Ok(render(&user, page).await)
}

fn count(result: Result<u64, FineractError>) -> Result<String, PageError> {
    match result {
        Ok(total) => Ok(total.to_string()),
        Err(FineractError::Unauthorized) => Err(FineractError::Unauthorized.into()),
        Err(err) => {
            tracing::warn!(error = %err, "Dashboard count unavailable");
            Ok("Unavailable".to_string())
        }
    }
}
