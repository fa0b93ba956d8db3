#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use tokio::sync::mpsc;
use video_upload::presign::ObjectTarget;
use video_upload::{
    Error, FailureDisplay, FileCandidate, FileContent, Presigner, ProgressHook, PutRequest,
    Result, SessionEvent, SignedOperation, SignedUrl, Transfer, UploadOptions, UploadStatus,
};

pub fn options(failure_display: FailureDisplay) -> UploadOptions {
    UploadOptions {
        failure_display,
        ..Default::default()
    }
}

pub fn video(name: &str, size: u64) -> FileCandidate {
    FileCandidate {
        name: name.to_string(),
        media_type: "video/mp4".to_string(),
        size,
        content: FileContent::Bytes(Bytes::new()),
    }
}

/// Signs URLs under a fixed base, optionally failing or stalling.
pub struct StaticPresigner {
    base: String,
    pub calls: AtomicUsize,
    fail_put: bool,
    delay: Option<Duration>,
}

impl StaticPresigner {
    pub fn new(base: impl Into<String>) -> Self {
        StaticPresigner {
            base: base.into(),
            calls: AtomicUsize::new(0),
            fail_put: false,
            delay: None,
        }
    }

    pub fn failing() -> Self {
        StaticPresigner {
            fail_put: true,
            ..Self::new("https://videos.example.com")
        }
    }

    pub fn stalling(delay: Duration) -> Self {
        StaticPresigner {
            delay: Some(delay),
            ..Self::new("https://videos.example.com")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Presigner for StaticPresigner {
    async fn presign(
        &self,
        operation: SignedOperation,
        target: ObjectTarget<'_>,
    ) -> Result<SignedUrl> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_put && operation == SignedOperation::PutObject {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "invalid credentials",
            )));
        }
        Ok(SignedUrl {
            method: operation.method(),
            uri: format!("{}/videos/{}?X-Amz-Signature=test", self.base, target.key).parse()?,
        })
    }
}

/// Reports the given percentages of the body and answers with a fixed status.
pub struct ScriptedTransfer {
    percents: Vec<u64>,
    status: StatusCode,
    pub calls: AtomicUsize,
}

impl ScriptedTransfer {
    pub fn new(percents: &[u64], status: StatusCode) -> Self {
        ScriptedTransfer {
            percents: percents.to_vec(),
            status,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transfer for ScriptedTransfer {
    async fn put(&self, request: PutRequest<'_>, hook: ProgressHook) -> Result<StatusCode> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let total = request.content_length;
        let mut written = 0;
        for p in &self.percents {
            let next = total * p / 100;
            hook((next - written) as usize, next, total);
            written = next;
            tokio::task::yield_now().await;
        }
        Ok(self.status)
    }
}

/// Reports some progress, then never finishes. Records when its future is dropped.
pub struct StuckTransfer {
    pub dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transfer for StuckTransfer {
    async fn put(&self, request: PutRequest<'_>, hook: ProgressHook) -> Result<StatusCode> {
        let _flag = DropFlag(self.dropped.clone());
        let total = request.content_length;
        hook((total / 10) as usize, total / 10, total);
        futures::future::pending::<()>().await;
        Ok(StatusCode::OK)
    }
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

pub fn statuses(events: &[SessionEvent]) -> Vec<UploadStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Status(s) => Some(*s),
            _ => None,
        })
        .collect()
}

pub fn progress(events: &[SessionEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect()
}

pub fn resets(events: &[SessionEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Reset { attempt } => Some(*attempt),
            _ => None,
        })
        .collect()
}

pub fn count(events: &[SessionEvent], f: impl Fn(&SessionEvent) -> bool) -> usize {
    events.iter().filter(|e| f(e)).count()
}
