//! Object store credentials.
//!
//! Built once at startup from the environment and passed explicitly to the
//! stores that need it.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `AWS_ACCESS_KEY_ID` | Yes | Access key for the bucket |
//! | `AWS_SECRET_ACCESS_KEY` | Yes | Secret key for the bucket |
//! | `AWS_REGION` | Yes | Bucket region (e.g. `ap-south-1`) |
//! | `AWS_ENDPOINT_URL` | No | Custom S3-compatible endpoint |

use crate::SourceError;

/// Credentials and endpoint for the object store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Bucket region.
    pub region: String,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint_url: Option<String>,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

impl StoreConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingEnv`] if any required variable is unset
    /// or empty.
    pub fn from_env() -> Result<Self, SourceError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingEnv`] if any required variable is
    /// missing or empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SourceError> {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| SourceError::MissingEnv {
                    name: name.to_string(),
                })
        };

        Ok(Self {
            access_key_id: require("AWS_ACCESS_KEY_ID")?,
            secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            region: require("AWS_REGION")?,
            endpoint_url: lookup("AWS_ENDPOINT_URL").filter(|v| !v.trim().is_empty()),
        })
    }
}
