//! Single-file video uploads straight to object storage through presigned URLs.
//!
//! [`UploadWidget`] ties together file intake, the upload lifecycle and the projection of its
//! state into a renderable [`View`].

pub mod config;
mod error;
pub mod intake;
pub mod orchestrator;
pub mod presign;
pub mod progress;
pub mod session;
pub mod telemetry;
pub mod transfer;
pub mod view;
mod widget;

pub use config::{FailureDisplay, StorageConfig, UploadOptions};
pub use error::{Error, Result};
pub use intake::{DropzoneOptions, FileCandidate, FileContent, PreviewReference, SelectedFile};
pub use orchestrator::UploadOutcome;
pub use presign::{Presigner, S3Presigner, SignedOperation, SignedUrl};
pub use progress::{ProgressHook, TrackableStream};
pub use session::{SessionEvent, UploadStatus, WidgetState};
pub use transfer::{HttpTransfer, PutRequest, Transfer};
pub use view::View;
pub use widget::UploadWidget;
