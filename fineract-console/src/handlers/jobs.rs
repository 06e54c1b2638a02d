use axum::{
    extract::{Path, Query},
    response::Response,
    Form,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use service_core::fineract::jobs::{Job, JobUpdate};
use validator::Validate;

use crate::forms::validators::validate_cron;
use crate::forms::{checkbox, FormErrors, FormField, FormView};
use crate::handlers::{form_errors, outcome, reject, render, PageError, Paging, PAGE_SIZE};
use crate::models::user::AuthUser;
use crate::views::{opt, yes_no, Cell, Link, Page, Pager, Row, Table};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct JobForm {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub display_name: String,
    #[validate(custom(function = "validate_cron"))]
    pub cron_expression: String,
    #[serde(deserialize_with = "checkbox")]
    pub active: bool,
}

impl JobForm {
    fn from_job(job: &Job) -> Self {
        Self {
            display_name: job.display_name.clone(),
            cron_expression: job.cron_expression.clone().unwrap_or_default(),
            active: job.active,
        }
    }
}

fn time(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

pub async fn list(user: AuthUser) -> Result<Response, PageError> {
    let (jobs, scheduler) = tokio::join!(user.client.list_jobs(), user.client.scheduler_status());
    let jobs = jobs?;
    let scheduler = scheduler?;

    let table = Table::new(&["Job", "Cron", "Active", "Running", "Next run", "Last status"])
        .empty("No jobs")
        .rows(jobs.iter().map(|job| {
            Row::new(vec![
                Cell::link(job.display_name.clone(), format!("/jobs/{}/history", job.job_id)),
                opt(job.cron_expression.as_deref()).into(),
                yes_no(job.active).into(),
                yes_no(job.currently_running).into(),
                opt(job.next_run_time.as_deref()).into(),
                job.last_status().into(),
            ])
            .action(Link::post("Run now", format!("/jobs/{}/run", job.job_id)))
            .action(Link::get("Edit", format!("/jobs/{}/edit", job.job_id)))
        }));

    let (state, toggle) = if scheduler.active {
        ("The scheduler is running.", Link::post("Stop scheduler", "/scheduler/stop").danger())
    } else {
        ("The scheduler is stopped; jobs only run when triggered by hand.", Link::post("Start scheduler", "/scheduler/start"))
    };
    let page = Page::new("jobs", "Scheduler jobs")
        .action(toggle)
        .text(state)
        .table(table);
    Ok(render(&user, page).await)
}

fn form_page(id: i64, form: &JobForm, errors: &FormErrors) -> Page {
    let view = FormView::new("Edit job", format!("/jobs/{id}"))
        .field(FormField::text("displayName", "Name").value(&form.display_name).required())
        .field(
            FormField::text("cronExpression", "Cron expression")
                .value(&form.cron_expression)
                .required()
                .help("Quartz syntax: seconds minutes hours day-of-month month day-of-week [year]"),
        )
        .field(FormField::checkbox("active", "Active", form.active))
        .cancel("/jobs")
        .with_errors(errors);
    Page::new("jobs", "Edit job").form(view)
}

pub async fn edit(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let job = user.client.get_job(id).await?;
    Ok(render(&user, form_page(id, &JobForm::from_job(&job), &FormErrors::default())).await)
}

pub async fn update(user: AuthUser, Path(id): Path<i64>, Form(form): Form<JobForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => {
            let update = JobUpdate {
                display_name: form.display_name.trim().to_string(),
                cron_expression: form.cron_expression.trim().to_string(),
                active: form.active,
            };
            match user.client.update_job(id, &update).await {
                Ok(_) => return Ok(user.done("Job updated", "/jobs").await),
                Err(e) => form_errors(e)?,
            }
        }
    };
    Ok(reject(&user, &errors, form_page(id, &form, &errors)).await)
}

pub async fn run(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let result = user.client.run_job(id).await;
    outcome(&user, result, "Job triggered", "/jobs").await
}

pub async fn history(user: AuthUser, Path(id): Path<i64>, Query(paging): Query<Paging>) -> Result<Response, PageError> {
    let (job, runs) = tokio::join!(
        user.client.get_job(id),
        user.client.job_history(id, paging.offset, PAGE_SIZE)
    );
    let job = job?;
    let runs = runs?;

    let base = format!("/jobs/{id}/history?");
    let table = Table::new(&["Run", "Started", "Finished", "Status", "Trigger", "Error"])
        .empty("This job has not run yet")
        .rows(runs.items.iter().map(|run| {
            Row::new(vec![
                opt(run.version).into(),
                time(run.job_run_start_time).into(),
                time(run.job_run_end_time).into(),
                opt(run.status.as_deref()).into(),
                opt(run.trigger_type.as_deref()).into(),
                opt(run.job_run_error_message.as_deref()).into(),
            ])
        }))
        .pager(Pager::new(&base, paging.offset, PAGE_SIZE, runs.items.len(), runs.total));

    let page = Page::new("jobs", format!("History of {}", job.display_name))
        .action(Link::post("Run now", format!("/jobs/{id}/run")))
        .action(Link::get("All jobs", "/jobs"))
        .table(table);
    Ok(render(&user, page).await)
}

pub async fn start_scheduler(user: AuthUser) -> Result<Response, PageError> {
    let result = user.client.set_scheduler(true).await;
    outcome(&user, result, "Scheduler started", "/jobs").await
}

pub async fn stop_scheduler(user: AuthUser) -> Result<Response, PageError> {
    let result = user.client.set_scheduler(false).await;
    outcome(&user, result, "Scheduler stopped", "/jobs").await
}
