//! S3-compatible object store.
//!
//! Fetches a dataset's CSV object with `GetObject`. When the store answers
//! with a non-success status (missing key, access denied, ...) the load
//! yields an empty dataset and logs a warning. Failures before any response
//! arrives (DNS, TLS, timeouts) propagate as [`SourceError::Download`].

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::{Credentials, StalledStreamProtectionConfig};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use patrol_map_incident_models::IncidentRecord;

use crate::config::StoreConfig;
use crate::dataset::DatasetDefinition;
use crate::parsing::parse_csv;
use crate::{RecordStore, SourceError};

/// Loads a dataset's CSV from an S3 bucket.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    id: String,
    dataset: DatasetDefinition,
}

impl S3Store {
    /// Creates a client for `dataset` using explicit credentials.
    #[must_use]
    pub fn new(config: &StoreConfig, dataset: DatasetDefinition) -> Self {
        let creds = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "patrol-map-env",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .region(Region::new(config.region.clone()))
            .credentials_provider(creds)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled());

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            id: dataset.uri(),
            dataset,
        }
    }

    /// The dataset this store reads.
    #[must_use]
    pub const fn dataset(&self) -> &DatasetDefinition {
        &self.dataset
    }
}

/// Decides how a failed `GetObject` call surfaces.
///
/// Returns `None` when the store answered with an error status, in which
/// case the dataset is treated as empty. Anything that failed before a
/// response arrived becomes [`SourceError::Download`].
fn classify(err: SdkError<GetObjectError>, dataset: &DatasetDefinition) -> Option<SourceError> {
    if err.as_service_error().is_some() {
        let status = err
            .raw_response()
            .map(|r| r.status().as_u16().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        log::warn!(
            "  {} returned status {status}, treating dataset as empty",
            dataset.uri()
        );
        return None;
    }

    Some(download_error(err, dataset))
}

fn download_error(
    source: impl std::error::Error + Send + Sync + 'static,
    dataset: &DatasetDefinition,
) -> SourceError {
    SourceError::Download {
        bucket: dataset.bucket.clone(),
        key: dataset.key.clone(),
        source: Box::new(source),
    }
}

#[async_trait]
impl RecordStore for S3Store {
    fn id(&self) -> &str {
        &self.id
    }

    async fn load(&self) -> Result<Vec<IncidentRecord>, SourceError> {
        let bucket = &self.dataset.bucket;
        let key = &self.dataset.key;
        log::info!("Fetching s3://{bucket}/{key}");

        let output = match self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                return match classify(err, &self.dataset) {
                    Some(e) => Err(e),
                    None => Ok(Vec::new()),
                };
            }
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| download_error(e, &self.dataset))?
            .into_bytes();

        #[allow(clippy::cast_precision_loss)] // display-only MB value
        let mb = bytes.len() as f64 / 1_048_576.0;
        log::info!("  downloaded {mb:.1} MB");

        parse_csv(&bytes, &self.dataset)
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_s3::config::http::HttpResponse;
    use aws_sdk_s3::types::error::NoSuchKey;
    use aws_smithy_runtime_api::client::result::ConnectorError;
    use aws_smithy_runtime_api::http::StatusCode;
    use aws_smithy_types::body::SdkBody;

    use super::*;
    use crate::registry::default_dataset;

    fn response(status: u16) -> HttpResponse {
        HttpResponse::new(StatusCode::try_from(status).unwrap(), SdkBody::empty())
    }

    #[test]
    fn error_status_from_store_is_an_empty_dataset() {
        let err = SdkError::service_error(
            GetObjectError::NoSuchKey(NoSuchKey::builder().build()),
            response(404),
        );

        assert!(classify(err, &default_dataset()).is_none());
    }

    #[test]
    fn connection_failure_is_a_download_error() {
        let err = SdkError::dispatch_failure(ConnectorError::io(Box::new(
            std::io::Error::other("connection reset"),
        )));

        let classified = classify(err, &default_dataset());
        assert!(matches!(
            classified,
            Some(SourceError::Download { bucket, key, .. })
                if bucket == "new-trail01" && key == "FIR_Details_Data.csv"
        ));
    }

    #[test]
    fn timeout_is_a_download_error() {
        let err = SdkError::timeout_error(std::io::Error::other("timed out"));

        assert!(matches!(
            classify(err, &default_dataset()),
            Some(SourceError::Download { .. })
        ));
    }

    #[tokio::test]
    async fn store_id_is_the_object_uri() {
        let config = StoreConfig {
            access_key_id: "AKIA123".to_string(),
            secret_access_key: "shh".to_string(),
            region: "ap-south-1".to_string(),
            endpoint_url: Some("http://localhost:9000".to_string()),
        };

        let store = S3Store::new(&config, default_dataset());
        assert_eq!(store.id(), "s3://new-trail01/FIR_Details_Data.csv");
        assert_eq!(store.dataset().id, "fir_details");
    }
}
