use std::fmt;
use std::time::Duration;

use clap::{ArgAction, Args};

use crate::intake::DropzoneOptions;
use crate::{Error, Result};

/// Credentials and location of the bucket uploads land in.
#[derive(Clone, Args)]
pub struct StorageConfig {
    #[clap(long, env = "UPLOAD_ACCESS_KEY_ID")]
    pub access_key_id: String,
    #[clap(long, env = "UPLOAD_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: String,
    #[clap(long, env = "UPLOAD_REGION")]
    pub region: String,
    #[clap(long, env = "UPLOAD_BUCKET")]
    pub bucket: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...).
    #[clap(long, env = "UPLOAD_ENDPOINT")]
    pub endpoint: Option<String>,
    #[clap(long, env = "UPLOAD_FORCE_PATH_STYLE", action = ArgAction::Set, default_value_t = false)]
    pub force_path_style: bool,
}

impl StorageConfig {
    /// Checks what clap cannot: blank values, a bucket that is really a path, a malformed endpoint.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("UPLOAD_ACCESS_KEY_ID", &self.access_key_id),
            ("UPLOAD_SECRET_ACCESS_KEY", &self.secret_access_key),
            ("UPLOAD_REGION", &self.region),
            ("UPLOAD_BUCKET", &self.bucket),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::MissingConfig(name));
            }
        }

        if self.bucket.contains('/') {
            return Err(Error::InvalidConfig {
                field: "UPLOAD_BUCKET",
                reason: "bucket names must not contain '/'".to_string(),
            });
        }

        if let Some(endpoint) = self.endpoint.as_ref() {
            if endpoint.trim().is_empty() {
                return Err(Error::InvalidConfig {
                    field: "UPLOAD_ENDPOINT",
                    reason: "endpoint is set but empty".to_string(),
                });
            }
            endpoint.parse::<http::Uri>()?;
        }

        Ok(())
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

/// What happens to the `Failed` state once the attempt has been cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisplay {
    /// Fall straight through to `Idle`.
    Skip,
    UntilAcknowledged,
    /// Hold `Failed` until acknowledged or until the duration elapses.
    For(Duration),
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Lifetime of the signed URLs handed out by the presigner.
    pub presign_expiry: Duration,
    pub presign_timeout: Duration,
    pub transfer_timeout: Duration,
    pub failure_display: FailureDisplay,
    pub key_prefix: Option<String>,
    pub dropzone: DropzoneOptions,
}

impl Default for UploadOptions {
    fn default() -> Self {
        UploadOptions {
            presign_expiry: Duration::from_secs(900),
            presign_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(60 * 60),
            failure_display: FailureDisplay::For(Duration::from_secs(10)),
            key_prefix: None,
            dropzone: DropzoneOptions::default(),
        }
    }
}

impl UploadOptions {
    /// Object key for a file name, under the configured prefix if any.
    pub fn object_key(&self, file_name: &str) -> String {
        match self.key_prefix.as_deref().map(|p| p.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}/{file_name}"),
            _ => file_name.to_string(),
        }
    }
}
