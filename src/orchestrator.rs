use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use tracing::{event, instrument, Level};

use crate::config::{FailureDisplay, UploadOptions};
use crate::intake::SelectedFile;
use crate::presign::{ObjectTarget, Presigner, SignedOperation, SignedUrl};
use crate::progress::{percent, ProgressHook};
use crate::session::SessionStore;
use crate::transfer::{PutRequest, Transfer};
use crate::{Error, Result};

#[derive(Debug)]
pub enum UploadOutcome {
    /// No file was selected.
    Skipped,
    /// Another upload is already in flight.
    Busy,
    Succeeded { key: String, read_url: SignedUrl },
    Failed(Error),
    Cancelled,
}

/// Runs the cleanup of an attempt when dropped, whichever way the attempt ends.
struct ResetGuard<'a> {
    store: &'a SessionStore,
    attempt: u64,
    hold_failure: bool,
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        self.store.finish(self.attempt, self.hold_failure);
    }
}

pub struct Orchestrator {
    presigner: Arc<dyn Presigner>,
    transfer: Arc<dyn Transfer>,
    store: SessionStore,
    options: UploadOptions,
}

impl Orchestrator {
    pub fn new(
        presigner: Arc<dyn Presigner>,
        transfer: Arc<dyn Transfer>,
        store: SessionStore,
        options: UploadOptions,
    ) -> Self {
        Orchestrator {
            presigner,
            transfer,
            store,
            options,
        }
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    #[instrument(skip_all, fields(file = file.as_ref().map(|f| f.name.as_str())))]
    pub async fn upload(&self, file: Option<SelectedFile>) -> UploadOutcome {
        let Some(file) = file else {
            event!(Level::DEBUG, "no file selected");
            return UploadOutcome::Skipped;
        };

        let key = self.options.object_key(&file.name);
        let Some((attempt, cancel)) = self.store.begin(&key) else {
            event!(Level::WARN, "an upload is already in flight");
            return UploadOutcome::Busy;
        };
        event!(Level::INFO, attempt, %key, size = file.size, "upload started");

        let outcome = {
            let _reset = ResetGuard {
                store: &self.store,
                attempt,
                hold_failure: self.options.failure_display != FailureDisplay::Skip,
            };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(Error::Cancelled),
                r = self.run(attempt, &key, &file) => r,
            };

            match result {
                Ok(read_url) => {
                    self.store.succeed(attempt, read_url.clone());
                    event!(Level::INFO, attempt, %key, "upload succeeded");
                    UploadOutcome::Succeeded { key, read_url }
                }
                Err(Error::Cancelled) => {
                    event!(Level::INFO, attempt, "upload cancelled");
                    UploadOutcome::Cancelled
                }
                Err(e) => {
                    event!(Level::ERROR, attempt, error = %e, "error uploading file");
                    self.store.fail(attempt, e.to_string());
                    UploadOutcome::Failed(e)
                }
            }
        };

        if let (UploadOutcome::Failed(_), FailureDisplay::For(hold)) =
            (&outcome, self.options.failure_display)
        {
            let store = self.store.clone();
            tokio::spawn(async move {
                tokio::time::sleep(hold).await;
                store.acknowledge(Some(attempt));
            });
        }

        outcome
    }

    async fn run(&self, attempt: u64, key: &str, file: &SelectedFile) -> Result<SignedUrl> {
        let target = ObjectTarget {
            key,
            content_type: &file.media_type,
        };

        let write_url = deadline(
            "signed upload url request",
            self.options.presign_timeout,
            self.presigner.presign(SignedOperation::PutObject, target),
        )
        .await?;
        self.store.signed(attempt, write_url.clone());

        let store = self.store.clone();
        let hook: ProgressHook = Arc::new(move |_chunk, written, total| {
            store.progress(attempt, percent(written, total));
        });

        let request = PutRequest {
            url: &write_url,
            content: &file.content,
            content_type: &file.media_type,
            content_length: file.size,
        };
        let status = deadline(
            "upload",
            self.options.transfer_timeout,
            self.transfer.put(request, hook),
        )
        .await?;
        if status != StatusCode::OK {
            return Err(Error::UnexpectedStatus(status));
        }

        deadline(
            "signed download url request",
            self.options.presign_timeout,
            self.presigner.presign(SignedOperation::GetObject, target),
        )
        .await
    }
}

async fn deadline<T>(
    what: &'static str,
    after: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| Error::Timeout { what, after })?
}
