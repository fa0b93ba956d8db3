//! The presigned PUT itself.

use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, Stream};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::StatusCode;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{event, Level};

use crate::intake::FileContent;
use crate::presign::SignedUrl;
use crate::progress::{ProgressHook, TrackableStream};
use crate::Result;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync + 'static>>;

pub struct PutRequest<'a> {
    pub url: &'a SignedUrl,
    pub content: &'a FileContent,
    pub content_type: &'a str,
    pub content_length: u64,
}

/// Sends one complete object body to a signed URL.
///
/// Implementations call the hook as body bytes are handed to the network and resolve with the
/// response status; interpreting the status is up to the caller. Dropping the returned future
/// must abort the transfer.
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn put(&self, request: PutRequest<'_>, hook: ProgressHook) -> Result<StatusCode>;
}

#[derive(Debug, Clone)]
pub struct HttpTransfer {
    client: reqwest::Client,
    chunk_size: usize,
}

impl Default for HttpTransfer {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl HttpTransfer {
    pub fn new(client: reqwest::Client) -> Self {
        HttpTransfer {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Granularity of progress reports.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    async fn body_stream(&self, content: &FileContent) -> Result<BodyStream> {
        let stream: BodyStream = match content {
            FileContent::Path(path) => {
                let file = File::open(path).await?;
                Box::pin(ReaderStream::with_capacity(file, self.chunk_size))
            }
            FileContent::Bytes(bytes) => {
                let bytes = bytes.clone();
                let chunk_size = self.chunk_size;
                let offsets = (0..bytes.len()).step_by(chunk_size);
                Box::pin(stream::iter(offsets.map(move |start| {
                    let end = (start + chunk_size).min(bytes.len());
                    Ok::<_, io::Error>(bytes.slice(start..end))
                })))
            }
        };
        Ok(stream)
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn put(&self, request: PutRequest<'_>, hook: ProgressHook) -> Result<StatusCode> {
        let body = self
            .body_stream(request.content)
            .await?
            .track(request.content_length, hook);

        let response = self
            .client
            .request(request.url.method.clone(), request.url.uri.to_string())
            .header(CONTENT_TYPE, request.content_type)
            .header(CONTENT_LENGTH, request.content_length)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await?;

        let status = response.status();
        event!(Level::DEBUG, %status, "transfer finished");
        Ok(status)
    }
}
