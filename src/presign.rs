//! Signed URLs from the object store's credential issuer.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use http::{Method, Uri};
use tracing::{event, Level};

use crate::config::StorageConfig;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedOperation {
    PutObject,
    GetObject,
}

impl SignedOperation {
    pub fn method(&self) -> Method {
        match self {
            Self::PutObject => Method::PUT,
            Self::GetObject => Method::GET,
        }
    }
}

/// The object a signed URL is scoped to.
#[derive(Debug, Clone, Copy)]
pub struct ObjectTarget<'a> {
    pub key: &'a str,
    pub content_type: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub method: Method,
    pub uri: Uri,
}

#[async_trait]
pub trait Presigner: Send + Sync {
    async fn presign(&self, operation: SignedOperation, target: ObjectTarget<'_>)
        -> Result<SignedUrl>;
}

/// Presigns S3 requests locally with static credentials.
#[derive(Debug, Clone)]
pub struct S3Presigner {
    client: Client,
    bucket: String,
    expires_in: Duration,
}

impl S3Presigner {
    pub async fn new(config: &StorageConfig, expires_in: Duration) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.as_str(),
            config.secret_access_key.as_str(),
            None,
            None,
            "video-upload",
        );

        let mut loader = aws_config::from_env()
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = config.endpoint.as_ref() {
            event!(Level::DEBUG, %endpoint, "using custom storage endpoint");
            loader = loader.endpoint_url(endpoint.as_str());
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Self::from_client(Client::from_conf(s3_config), config.bucket.clone(), expires_in)
    }

    pub fn from_client(client: Client, bucket: impl Into<String>, expires_in: Duration) -> Self {
        S3Presigner {
            client,
            bucket: bucket.into(),
            expires_in,
        }
    }
}

#[async_trait]
impl Presigner for S3Presigner {
    async fn presign(
        &self,
        operation: SignedOperation,
        target: ObjectTarget<'_>,
    ) -> Result<SignedUrl> {
        let presigning = PresigningConfig::expires_in(self.expires_in)?;
        let request = match operation {
            SignedOperation::PutObject => {
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(target.key)
                    .content_type(target.content_type)
                    .presigned(presigning)
                    .await?
            }
            SignedOperation::GetObject => {
                self.client
                    .get_object()
                    .bucket(&self.bucket)
                    .key(target.key)
                    .presigned(presigning)
                    .await?
            }
        };

        let uri: Uri = request.uri().to_string().parse()?;
        event!(Level::DEBUG, ?operation, key = target.key, host = ?uri.host(), "presigned");

        Ok(SignedUrl {
            method: operation.method(),
            uri,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presigner(endpoint: Option<&str>) -> S3Presigner {
        let mut builder = aws_sdk_s3::Config::builder()
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIDEXAMPLE", "secret", None, None, "test"));
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        S3Presigner::from_client(
            Client::from_conf(builder.build()),
            "videos",
            Duration::from_secs(900),
        )
    }

    #[tokio::test]
    async fn presigns_put_for_key() {
        let target = ObjectTarget {
            key: "clip.mp4",
            content_type: "video/mp4",
        };
        let signed = presigner(None)
            .presign(SignedOperation::PutObject, target)
            .await
            .unwrap();

        assert_eq!(signed.method, Method::PUT);
        let uri = signed.uri.to_string();
        assert!(uri.contains("clip.mp4"), "{uri}");
        assert!(uri.contains("X-Amz-Signature="), "{uri}");
        assert!(uri.contains("X-Amz-Expires=900"), "{uri}");
    }

    #[tokio::test]
    async fn presigns_get_against_custom_endpoint() {
        let target = ObjectTarget {
            key: "clip.mp4",
            content_type: "video/mp4",
        };
        let signed = presigner(Some("http://localhost:9000"))
            .presign(SignedOperation::GetObject, target)
            .await
            .unwrap();

        assert_eq!(signed.method, Method::GET);
        assert_eq!(signed.uri.host(), Some("localhost"));
        assert_eq!(signed.uri.path(), "/videos/clip.mp4");
    }
}
