use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{event, Level};

use crate::config::UploadOptions;
use crate::intake::{FileCandidate, SelectedFile};
use crate::orchestrator::{Orchestrator, UploadOutcome};
use crate::presign::Presigner;
use crate::session::{SessionEvent, SessionStore, WidgetState};
use crate::transfer::Transfer;
use crate::view::{self, View};

/// Intake, orchestrator and projector wired around one shared state.
pub struct UploadWidget {
    store: SessionStore,
    orchestrator: Orchestrator,
}

impl UploadWidget {
    pub fn new(
        presigner: Arc<dyn Presigner>,
        transfer: Arc<dyn Transfer>,
        options: UploadOptions,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (store, events) = SessionStore::new();
        let orchestrator = Orchestrator::new(presigner, transfer, store.clone(), options);
        (
            UploadWidget {
                store,
                orchestrator,
            },
            events,
        )
    }

    /// Drop or file-picker selection. Candidates breaking the dropzone constraints are recorded
    /// as rejections and never selected.
    pub fn on_select(&self, candidates: Vec<FileCandidate>) {
        let (accepted, rejected) = self.orchestrator.options().dropzone.partition(candidates);
        for rejection in &rejected {
            event!(Level::WARN, %rejection, "file rejected");
        }

        let file = accepted.into_iter().next().map(SelectedFile::from);
        self.store.select(file, rejected);
    }

    /// Uploads the current selection. A no-op without one.
    pub async fn upload(&self) -> UploadOutcome {
        let file = self.store.snapshot().selected;
        self.orchestrator.upload(file).await
    }

    /// Aborts the in-flight upload, if any.
    pub fn cancel(&self) -> bool {
        self.store.cancel()
    }

    pub fn acknowledge_failure(&self) -> bool {
        self.store.acknowledge(None)
    }

    pub fn view(&self) -> View {
        view::project(&self.store.snapshot())
    }

    pub fn state(&self) -> WidgetState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<WidgetState> {
        self.store.subscribe()
    }
}
