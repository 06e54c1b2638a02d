use axum::{extract::Path, response::Response};
use axum_extra::extract::Form;
use serde::Deserialize;
use service_core::fineract::delinquency::{BucketRequest, DelinquencyBucket, DelinquencyRange, RangeRequest};
use validator::{Validate, ValidationError};

use crate::forms::validators::validate_count;
use crate::forms::{blank_as_none, FormErrors, FormField, FormView};
use crate::handlers::{confirm, form_errors, outcome, reject, render, PageError};
use crate::models::user::AuthUser;
use crate::views::{opt, Cell, Link, Page, Row, Table};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
#[validate(schema(function = "max_not_below_min"))]
pub struct RangeForm {
    #[validate(length(min = 1, max = 100, message = "Classification is required"))]
    pub classification: String,
    #[validate(custom(function = "validate_count"))]
    pub minimum_age_days: String,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_count"))]
    pub maximum_age_days: Option<String>,
}

fn max_not_below_min(form: &RangeForm) -> Result<(), ValidationError> {
    let min = form.minimum_age_days.trim().parse::<i64>();
    let max = form.maximum_age_days.as_deref().map(|m| m.trim().parse::<i64>());
    if let (Ok(min), Some(Ok(max))) = (min, max) {
        if max < min {
            let mut err = ValidationError::new("range");
            err.message = Some("Maximum age days must not be less than minimum age days".into());
            return Err(err);
        }
    }
    Ok(())
}

impl RangeForm {
    fn from_range(range: &DelinquencyRange) -> Self {
        Self {
            classification: range.classification.clone(),
            minimum_age_days: range.minimum_age_days.to_string(),
            maximum_age_days: range.maximum_age_days.map(|m| m.to_string()),
        }
    }

    /// Only called after `validate`, so the numbers parse.
    fn to_request(&self) -> RangeRequest {
        RangeRequest::new(
            self.classification.trim(),
            self.minimum_age_days.trim().parse().unwrap_or_default(),
            self.maximum_age_days.as_deref().and_then(|m| m.trim().parse().ok()),
        )
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct BucketForm {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Select at least one range"))]
    pub ranges: Vec<String>,
}

impl BucketForm {
    fn from_bucket(bucket: &DelinquencyBucket) -> Self {
        Self {
            name: bucket.name.clone(),
            ranges: bucket.ranges.iter().map(|r| r.id.to_string()).collect(),
        }
    }

    fn to_request(&self) -> BucketRequest {
        BucketRequest {
            name: self.name.trim().to_string(),
            ranges: self.ranges.iter().filter_map(|r| r.parse().ok()).collect(),
        }
    }
}

fn range_page(title: &str, action: &str, form: &RangeForm, errors: &FormErrors) -> Page {
    let view = FormView::new(title, action)
        .field(FormField::text("classification", "Classification").value(&form.classification).required())
        .field(FormField::number("minimumAgeDays", "Minimum age (days)").value(&form.minimum_age_days).required())
        .field(
            FormField::number("maximumAgeDays", "Maximum age (days)")
                .value(opt(form.maximum_age_days.as_deref()))
                .help("Leave blank for an open-ended range"),
        )
        .cancel("/delinquency")
        .with_errors(errors);
    Page::new("delinquency", title).form(view)
}

fn bucket_page(title: &str, action: &str, ranges: &[DelinquencyRange], form: &BucketForm, errors: &FormErrors) -> Page {
    let options = ranges.iter().map(|r| (r.id.to_string(), r.label()));
    let view = FormView::new(title, action)
        .field(FormField::text("name", "Name").value(&form.name).required())
        .field(FormField::multi_select("ranges", "Ranges", options, &form.ranges).required())
        .cancel("/delinquency")
        .with_errors(errors);
    Page::new("delinquency", title).form(view)
}

pub async fn list(user: AuthUser) -> Result<Response, PageError> {
    let (ranges, buckets) = tokio::join!(user.client.list_ranges(), user.client.list_buckets());
    let (ranges, buckets) = (ranges?, buckets?);

    let ranges = Table::new(&["Classification", "Minimum days", "Maximum days"])
        .heading("Ranges")
        .empty("No delinquency ranges")
        .rows(ranges.iter().map(|r| {
            Row::new(vec![
                r.classification.clone().into(),
                r.minimum_age_days.to_string().into(),
                opt(r.maximum_age_days).into(),
            ])
            .action(Link::get("Edit", format!("/delinquency/ranges/{}/edit", r.id)))
            .action(Link::get("Delete", format!("/delinquency/ranges/{}/delete", r.id)).danger())
        }));
    let buckets = Table::new(&["Bucket", "Ranges"])
        .heading("Buckets")
        .empty("No delinquency buckets")
        .rows(buckets.iter().map(|b| {
            let labels = b.ranges.iter().map(DelinquencyRange::label).collect::<Vec<_>>().join(", ");
            Row::new(vec![Cell::from(b.name.clone()), labels.into()])
                .action(Link::get("Edit", format!("/delinquency/buckets/{}/edit", b.id)))
                .action(Link::get("Delete", format!("/delinquency/buckets/{}/delete", b.id)).danger())
        }));

    let page = Page::new("delinquency", "Delinquency")
        .action(Link::get("New range", "/delinquency/ranges/new"))
        .action(Link::get("New bucket", "/delinquency/buckets/new"))
        .table(ranges)
        .table(buckets);
    Ok(render(&user, page).await)
}

pub async fn new_range(user: AuthUser) -> Response {
    let page = range_page("New range", "/delinquency/ranges", &RangeForm::default(), &FormErrors::default());
    render(&user, page).await
}

pub async fn create_range(user: AuthUser, Form(form): Form<RangeForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.create_range(&form.to_request()).await {
            Ok(_) => return Ok(user.done("Range created", "/delinquency").await),
            Err(e) => form_errors(e)?,
        },
    };
    Ok(reject(&user, &errors, range_page("New range", "/delinquency/ranges", &form, &errors)).await)
}

pub async fn edit_range(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let range = user.client.get_range(id).await?;
    let page = range_page(
        "Edit range",
        &format!("/delinquency/ranges/{id}"),
        &RangeForm::from_range(&range),
        &FormErrors::default(),
    );
    Ok(render(&user, page).await)
}

pub async fn update_range(user: AuthUser, Path(id): Path<i64>, Form(form): Form<RangeForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.update_range(id, &form.to_request()).await {
            Ok(_) => return Ok(user.done("Range updated", "/delinquency").await),
            Err(e) => form_errors(e)?,
        },
    };
    let page = range_page("Edit range", &format!("/delinquency/ranges/{id}"), &form, &errors);
    Ok(reject(&user, &errors, page).await)
}

pub async fn confirm_delete_range(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let range = user.client.get_range(id).await?;
    Ok(confirm(
        &user,
        "delinquency",
        "Delete range",
        format!("Delete {}? Ranges used by a bucket cannot be deleted.", range.label()),
        &format!("/delinquency/ranges/{id}/delete"),
        "/delinquency",
    )
    .await)
}

pub async fn delete_range(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let result = user.client.delete_range(id).await;
    outcome(&user, result, "Range deleted", "/delinquency").await
}

pub async fn new_bucket(user: AuthUser) -> Result<Response, PageError> {
    let ranges = user.client.list_ranges().await?;
    let page = bucket_page("New bucket", "/delinquency/buckets", &ranges, &BucketForm::default(), &FormErrors::default());
    Ok(render(&user, page).await)
}

pub async fn create_bucket(user: AuthUser, Form(form): Form<BucketForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.create_bucket(&form.to_request()).await {
            Ok(_) => return Ok(user.done("Bucket created", "/delinquency").await),
            Err(e) => form_errors(e)?,
        },
    };
    let ranges = user.client.list_ranges().await?;
    let page = bucket_page("New bucket", "/delinquency/buckets", &ranges, &form, &errors);
    Ok(reject(&user, &errors, page).await)
}

pub async fn edit_bucket(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let (bucket, ranges) = tokio::join!(user.client.get_bucket(id), user.client.list_ranges());
    let (bucket, ranges) = (bucket?, ranges?);
    let page = bucket_page(
        "Edit bucket",
        &format!("/delinquency/buckets/{id}"),
        &ranges,
        &BucketForm::from_bucket(&bucket),
        &FormErrors::default(),
    );
    Ok(render(&user, page).await)
}

pub async fn update_bucket(user: AuthUser, Path(id): Path<i64>, Form(form): Form<BucketForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.update_bucket(id, &form.to_request()).await {
            Ok(_) => return Ok(user.done("Bucket updated", "/delinquency").await),
            Err(e) => form_errors(e)?,
        },
    };
    let ranges = user.client.list_ranges().await?;
    let page = bucket_page("Edit bucket", &format!("/delinquency/buckets/{id}"), &ranges, &form, &errors);
    Ok(reject(&user, &errors, page).await)
}

pub async fn confirm_delete_bucket(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let bucket = user.client.get_bucket(id).await?;
    Ok(confirm(
        &user,
        "delinquency",
        "Delete bucket",
        format!("Delete bucket {}?", bucket.name),
        &format!("/delinquency/buckets/{id}/delete"),
        "/delinquency",
    )
    .await)
}

pub async fn delete_bucket(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let result = user.client.delete_bucket(id).await;
    outcome(&user, result, "Bucket deleted", "/delinquency").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_ended_range_is_valid() {
        let form = RangeForm {
            classification: "Over 90".to_string(),
            minimum_age_days: "91".to_string(),
            maximum_age_days: None,
        };
        assert!(form.validate().is_ok());
        let request = form.to_request();
        assert_eq!(request.minimum_age_days, 91);
        assert_eq!(request.maximum_age_days, None);
    }

    #[test]
    fn inverted_range_is_a_general_error() {
        let form = RangeForm {
            classification: "Bad".to_string(),
            minimum_age_days: "30".to_string(),
            maximum_age_days: Some("10".to_string()),
        };
        let errors = FormErrors::from(&form.validate().unwrap_err());
        assert_eq!(errors.general, vec!["Maximum age days must not be less than minimum age days"]);
    }

    #[test]
    fn bucket_needs_a_range() {
        let form = BucketForm { name: "Default".to_string(), ranges: vec![] };
        let errors = FormErrors::from(&form.validate().unwrap_err());
        assert_eq!(errors.fields.get("ranges").map(String::as_str), Some("Select at least one range"));
    }
}
