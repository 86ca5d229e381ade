// S3 client backed by rust-s3

use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use s3::creds::Credentials;
use s3::region::Region;
use s3::Bucket;
use tracing::debug;

use super::{ObjectPage, ObjectStore};
use crate::config::StorageConfig;
use crate::types::{AppError, AppResult};
use crate::utils::with_retry;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

pub struct S3Client {
    region: Region,
    credentials: Credentials,
    path_style: bool,
    max_retries: u32,
}

impl S3Client {
    /// Build a client from config. Explicit keys are used when both are set;
    /// otherwise credentials come from the ambient environment and profile.
    pub fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse::<Region>()
                .map_err(|e| AppError::Config(format!("Invalid region '{}': {}", config.region, e)))?,
        };

        let credentials = match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key), Some(secret_key)) => Credentials::new(
                Some(access_key.as_str()),
                Some(secret_key.as_str()),
                None,
                None,
                None,
            ),
            _ => Credentials::default(),
        }
        .map_err(|e| AppError::Storage(format!("Failed to load credentials: {}", e)))?;

        Ok(Self {
            region,
            credentials,
            path_style: config.endpoint.is_some(),
            max_retries: config.max_retries,
        })
    }

    fn bucket(&self, name: &str) -> AppResult<Bucket> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(|e| AppError::Storage(format!("Failed to open bucket '{}': {}", name, e)))?;

        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_bucket_names(&self) -> AppResult<Vec<String>> {
        let region = self.region.clone();
        let credentials = self.credentials.clone();

        let response = with_retry(
            move || {
                let region = region.clone();
                let credentials = credentials.clone();
                async move { Bucket::list_buckets(region, credentials).await }.boxed()
            },
            self.max_retries,
            RETRY_BASE_DELAY,
        )
        .await
        .map_err(|e| AppError::Storage(format!("ListBuckets failed: {}", e)))?;

        let names: Vec<String> = response.bucket_names().collect();
        debug!("ListBuckets returned {} bucket(s)", names.len());
        Ok(names)
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> AppResult<ObjectPage> {
        let handle = self.bucket(bucket)?;

        let (result, status) = with_retry(
            move || {
                let handle = handle.clone();
                let token = continuation_token.clone();
                async move { handle.list_page(String::new(), None, token, None, None).await }.boxed()
            },
            self.max_retries,
            RETRY_BASE_DELAY,
        )
        .await
        .map_err(|e| AppError::Storage(format!("ListObjectsV2 on '{}' failed: {}", bucket, e)))?;

        debug!(
            "ListObjectsV2 on '{}' returned {} key(s) (status {}, truncated: {})",
            bucket,
            result.contents.len(),
            status,
            result.is_truncated
        );

        let next_continuation_token = if result.is_truncated {
            result.next_continuation_token
        } else {
            None
        };

        Ok(ObjectPage {
            keys: result.contents.into_iter().map(|object| object.key).collect(),
            next_continuation_token,
        })
    }
}
