//! Delinquency ranges and the buckets that group them.

use serde::{Deserialize, Serialize};

use super::client::{CommandResult, FineractClient};
use super::error::FineractError;
use super::normalize::into_items;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelinquencyRange {
    pub id: i64,
    pub classification: String,
    pub minimum_age_days: i64,
    pub maximum_age_days: Option<i64>,
}

impl DelinquencyRange {
    pub fn label(&self) -> String {
        match self.maximum_age_days {
            Some(max) => format!("{} ({}-{} days)", self.classification, self.minimum_age_days, max),
            None => format!("{} ({}+ days)", self.classification, self.minimum_age_days),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeRequest {
    pub classification: String,
    pub minimum_age_days: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_age_days: Option<i64>,
    pub locale: &'static str,
}

impl RangeRequest {
    pub fn new(classification: impl Into<String>, minimum_age_days: i64, maximum_age_days: Option<i64>) -> Self {
        Self {
            classification: classification.into(),
            minimum_age_days,
            maximum_age_days,
            locale: super::dates::LOCALE,
        }
    }

    pub fn validate(&self) -> Result<(), FineractError> {
        if self.classification.trim().is_empty() {
            return Err(FineractError::Invalid("Classification is required".to_string()));
        }
        if self.minimum_age_days < 0 {
            return Err(FineractError::Invalid(
                "Minimum age days must not be negative".to_string(),
            ));
        }
        if let Some(max) = self.maximum_age_days
            && max < self.minimum_age_days
        {
            return Err(FineractError::Invalid(
                "Maximum age days must not be less than minimum age days".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelinquencyBucket {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub ranges: Vec<DelinquencyRange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketRequest {
    pub name: String,
    pub ranges: Vec<i64>,
}

impl FineractClient {
    pub async fn list_ranges(&self) -> Result<Vec<DelinquencyRange>, FineractError> {
        let value = self.get_value("delinquency/ranges", &[]).await?;
        let mut ranges: Vec<DelinquencyRange> = into_items(value)?;
        ranges.sort_by_key(|r| r.minimum_age_days);
        Ok(ranges)
    }

    pub async fn get_range(&self, range_id: i64) -> Result<DelinquencyRange, FineractError> {
        self.get_json(&format!("delinquency/ranges/{range_id}"), &[])
            .await
    }

    pub async fn create_range(&self, request: &RangeRequest) -> Result<CommandResult, FineractError> {
        request.validate()?;
        let result: CommandResult = self.post_json("delinquency/ranges", &[], request).await?;
        tracing::info!(range_id = ?result.resource_id, classification = %request.classification, "Delinquency range created");
        Ok(result)
    }

    pub async fn update_range(
        &self,
        range_id: i64,
        request: &RangeRequest,
    ) -> Result<CommandResult, FineractError> {
        request.validate()?;
        self.put_json(&format!("delinquency/ranges/{range_id}"), request)
            .await
    }

    pub async fn delete_range(&self, range_id: i64) -> Result<CommandResult, FineractError> {
        self.delete_json(&format!("delinquency/ranges/{range_id}"))
            .await
    }

    pub async fn list_buckets(&self) -> Result<Vec<DelinquencyBucket>, FineractError> {
        let value = self.get_value("delinquency/buckets", &[]).await?;
        into_items(value)
    }

    pub async fn get_bucket(&self, bucket_id: i64) -> Result<DelinquencyBucket, FineractError> {
        self.get_json(&format!("delinquency/buckets/{bucket_id}"), &[])
            .await
    }

    pub async fn create_bucket(&self, request: &BucketRequest) -> Result<CommandResult, FineractError> {
        check_bucket(request)?;
        let result: CommandResult = self.post_json("delinquency/buckets", &[], request).await?;
        tracing::info!(bucket_id = ?result.resource_id, name = %request.name, "Delinquency bucket created");
        Ok(result)
    }

    pub async fn update_bucket(
        &self,
        bucket_id: i64,
        request: &BucketRequest,
    ) -> Result<CommandResult, FineractError> {
        check_bucket(request)?;
        self.put_json(&format!("delinquency/buckets/{bucket_id}"), request)
            .await
    }

    pub async fn delete_bucket(&self, bucket_id: i64) -> Result<CommandResult, FineractError> {
        self.delete_json(&format!("delinquency/buckets/{bucket_id}"))
            .await
    }
}

fn check_bucket(request: &BucketRequest) -> Result<(), FineractError> {
    if request.name.trim().is_empty() {
        return Err(FineractError::Invalid("Bucket name is required".to_string()));
    }
    if request.ranges.is_empty() {
        return Err(FineractError::Invalid("Select at least one range".to_string()));
    }
    Ok(())
}
