//! Upload errors

use std::time::Duration;

use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use http::StatusCode;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between configuration and a finished transfer.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("missing configuration value {0}")]
    MissingConfig(&'static str),

    #[error("invalid configuration value {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error(transparent)]
    InvalidUri(#[from] http::uri::InvalidUri),

    #[error("presigning config error: {0}")]
    PresigningConfig(#[from] aws_sdk_s3::presigning::PresigningConfigError),

    #[error("aws sdk presign put object error")]
    PresignPutObject(#[from] SdkError<PutObjectError>),

    #[error("aws sdk presign get object error")]
    PresignGetObject(#[from] SdkError<GetObjectError>),

    #[error("http transfer error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("storage answered the upload with status {0}")]
    UnexpectedStatus(StatusCode),

    #[error("{what} timed out after {after:?}")]
    Timeout { what: &'static str, after: Duration },

    #[error("upload cancelled")]
    Cancelled,
}
