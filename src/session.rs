//! Widget state and the only code allowed to mutate it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{event, Level};

use crate::intake::{FileRejection, PreviewReference, SelectedFile};
use crate::presign::SignedUrl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    pub attempt: u64,
    pub key: Option<String>,
    pub write_url: Option<SignedUrl>,
    pub read_url: Option<SignedUrl>,
    /// 0-100
    pub progress: u8,
    pub status: UploadStatus,
    pub failure: Option<String>,
    cancel: Option<CancellationToken>,
}

impl UploadSession {
    fn is_active(&self, attempt: u64) -> bool {
        self.attempt == attempt && self.status == UploadStatus::Uploading
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedUpload {
    pub key: String,
    pub read_url: SignedUrl,
}

#[derive(Debug, Clone, Default)]
pub struct WidgetState {
    pub selected: Option<SelectedFile>,
    pub preview: Option<PreviewReference>,
    pub session: UploadSession,
    pub completed: Option<CompletedUpload>,
    pub rejections: Vec<FileRejection>,
    /// Attempt whose cleanup has not run yet.
    pending_reset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Selected { name: String },
    Cleared,
    Rejected(Vec<FileRejection>),
    Status(UploadStatus),
    Progress(u8),
    Notified(String),
    Reset { attempt: u64 },
}

pub const SUCCESS_MESSAGE: &str = "Your video is uploaded successfully";

/// Shared handle over the widget state.
///
/// Snapshots go out through a watch channel for rendering; every individual transition is also
/// pushed to an unbounded event log so nothing is lost when snapshots coalesce.
#[derive(Debug, Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<WidgetState>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    next_attempt: Arc<AtomicU64>,
}

impl SessionStore {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (state, _) = watch::channel(WidgetState::default());
        let (events, receiver) = mpsc::unbounded_channel();
        let store = SessionStore {
            state: Arc::new(state),
            events,
            next_attempt: Arc::new(AtomicU64::new(1)),
        };
        (store, receiver)
    }

    pub fn subscribe(&self) -> watch::Receiver<WidgetState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> WidgetState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> UploadStatus {
        self.state.borrow().session.status
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn set_status(&self, session: &mut UploadSession, status: UploadStatus) -> bool {
        if session.status == status {
            return false;
        }
        event!(Level::DEBUG, from = ?session.status, to = ?status, "status");
        session.status = status;
        self.emit(SessionEvent::Status(status));
        true
    }

    /// Replaces the selection, revoking the previous preview. Ignored while uploading.
    pub(crate) fn select(
        &self,
        file: Option<SelectedFile>,
        rejections: Vec<FileRejection>,
    ) -> bool {
        self.state.send_if_modified(|state| {
            if state.session.status == UploadStatus::Uploading {
                event!(Level::DEBUG, "ignoring selection while an upload is in flight");
                return false;
            }

            if let Some(preview) = state.preview.take() {
                preview.revoke();
            }
            if !rejections.is_empty() {
                self.emit(SessionEvent::Rejected(rejections.clone()));
            }
            state.rejections = rejections;
            state.completed = None;

            match file {
                Some(file) => {
                    self.emit(SessionEvent::Selected {
                        name: file.name.clone(),
                    });
                    state.preview = Some(PreviewReference::for_file(&file));
                    state.selected = Some(file);
                }
                None => {
                    if state.selected.take().is_some() {
                        self.emit(SessionEvent::Cleared);
                    }
                }
            }
            true
        })
    }

    /// Starts a new attempt. Returns `None` when one is already in flight.
    pub(crate) fn begin(&self, key: &str) -> Option<(u64, CancellationToken)> {
        let mut started = None;
        self.state.send_if_modified(|state| {
            if state.session.status == UploadStatus::Uploading {
                return false;
            }

            let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
            let token = CancellationToken::new();
            state.completed = None;
            state.pending_reset = Some(attempt);
            state.session.attempt = attempt;
            state.session.key = Some(key.to_string());
            state.session.write_url = None;
            state.session.read_url = None;
            state.session.progress = 0;
            state.session.failure = None;
            state.session.cancel = Some(token.clone());
            self.set_status(&mut state.session, UploadStatus::Uploading);

            started = Some((attempt, token));
            true
        });
        started
    }

    pub(crate) fn signed(&self, attempt: u64, write_url: SignedUrl) {
        self.state.send_if_modified(|state| {
            if !state.session.is_active(attempt) {
                return false;
            }
            state.session.write_url = Some(write_url);
            true
        });
    }

    /// Applies a progress report. Stale attempts, non-uploading states and values that would move
    /// the bar backwards are ignored.
    pub(crate) fn progress(&self, attempt: u64, percent: u8) -> bool {
        let percent = percent.min(100);
        self.state.send_if_modified(|state| {
            if !state.session.is_active(attempt) || percent <= state.session.progress {
                return false;
            }
            state.session.progress = percent;
            self.emit(SessionEvent::Progress(percent));
            true
        })
    }

    pub(crate) fn succeed(&self, attempt: u64, read_url: SignedUrl) -> bool {
        self.state.send_if_modified(|state| {
            if !state.session.is_active(attempt) {
                return false;
            }

            if state.session.progress < 100 {
                state.session.progress = 100;
                self.emit(SessionEvent::Progress(100));
            }
            state.session.read_url = Some(read_url.clone());
            self.set_status(&mut state.session, UploadStatus::Succeeded);

            if let Some(key) = state.session.key.clone() {
                state.completed = Some(CompletedUpload { key, read_url });
            }
            if let Some(preview) = state.preview.take() {
                preview.revoke();
            }
            state.selected = None;
            self.emit(SessionEvent::Notified(SUCCESS_MESSAGE.to_string()));
            true
        })
    }

    pub(crate) fn fail(&self, attempt: u64, reason: String) -> bool {
        self.state.send_if_modified(|state| {
            if !state.session.is_active(attempt) {
                return false;
            }
            state.session.failure = Some(reason);
            self.set_status(&mut state.session, UploadStatus::Failed);
            true
        })
    }

    /// Cleanup for an attempt. Runs at most once per attempt; later calls are no-ops.
    ///
    /// A `Failed` status is kept when `hold_failure` is set so it can be acknowledged.
    pub(crate) fn finish(&self, attempt: u64, hold_failure: bool) -> bool {
        self.state
            .send_if_modified(|state| self.reset(state, attempt, hold_failure))
    }

    /// Forces the in-flight attempt back to `Idle`, fires its cancellation token and cleans it up
    /// on the spot, so nothing from the cancelled attempt touches a later selection or upload.
    pub(crate) fn cancel(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.session.status != UploadStatus::Uploading {
                return false;
            }
            if let Some(token) = state.session.cancel.take() {
                token.cancel();
            }
            self.set_status(&mut state.session, UploadStatus::Idle);
            let attempt = state.session.attempt;
            self.reset(state, attempt, false);
            true
        })
    }

    fn reset(&self, state: &mut WidgetState, attempt: u64, hold_failure: bool) -> bool {
        if state.pending_reset != Some(attempt) {
            return false;
        }
        state.pending_reset = None;

        let session = &mut state.session;
        session.progress = 0;
        session.write_url = None;
        session.read_url = None;
        session.cancel = None;
        if !(hold_failure && session.status == UploadStatus::Failed) {
            session.failure = None;
            self.set_status(session, UploadStatus::Idle);
        }

        if let Some(preview) = state.preview.take() {
            preview.revoke();
        }
        state.selected = None;
        self.emit(SessionEvent::Reset { attempt });
        true
    }

    /// Moves a held `Failed` state to `Idle`. With an attempt id only that attempt's failure is
    /// acknowledged.
    pub(crate) fn acknowledge(&self, attempt: Option<u64>) -> bool {
        self.state.send_if_modified(|state| {
            let session = &mut state.session;
            if session.status != UploadStatus::Failed
                || attempt.map_or(false, |a| a != session.attempt)
            {
                return false;
            }
            session.failure = None;
            self.set_status(session, UploadStatus::Idle)
        })
    }
}
