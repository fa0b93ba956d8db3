//! File selection: dropzone constraints, the selected file and its preview.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use uuid::Uuid;

use crate::Result;

pub const MP4: &str = "video/mp4";

/// 1 GiB
pub const MAX_VIDEO_SIZE: u64 = 1024 * 1024 * 1024;

/// Where the bytes of a file live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Path(PathBuf),
    Bytes(Bytes),
}

/// A file offered to the dropzone, before any constraint has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub media_type: String,
    pub size: u64,
    pub content: FileContent,
}

impl FileCandidate {
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        FileCandidate {
            name: name.into(),
            media_type: media_type.into(),
            size: bytes.len() as u64,
            content: FileContent::Bytes(bytes),
        }
    }

    /// Reads the size from file metadata. Without an explicit media type one is guessed from the
    /// file extension.
    pub async fn from_path(path: impl AsRef<Path>, media_type: Option<String>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = media_type.unwrap_or_else(|| guess_media_type(&name).to_string());

        Ok(FileCandidate {
            name,
            media_type,
            size: metadata.len(),
            content: FileContent::Path(path.to_path_buf()),
        })
    }
}

pub fn guess_media_type(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mp4" | "m4v" => MP4,
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// The single file currently chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
    pub size: u64,
    pub content: FileContent,
}

impl From<FileCandidate> for SelectedFile {
    fn from(c: FileCandidate) -> Self {
        SelectedFile {
            name: c.name,
            media_type: c.media_type,
            size: c.size,
            content: c.content,
        }
    }
}

/// A revocable local reference to the selected file's bytes, used only for rendering.
///
/// Clones share the revocation flag, so revoking any copy invalidates all of them.
#[derive(Debug, Clone)]
pub struct PreviewReference {
    id: Uuid,
    content: FileContent,
    revoked: Arc<AtomicBool>,
}

impl PreviewReference {
    pub fn for_file(file: &SelectedFile) -> Self {
        PreviewReference {
            id: Uuid::new_v4(),
            content: file.content.clone(),
            revoked: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn url(&self) -> String {
        format!("blob:video-upload/{}", self.id)
    }

    pub fn is_live(&self) -> bool {
        !self.revoked.load(Ordering::Acquire)
    }

    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::Release);
    }

    /// The referenced bytes, or `None` once revoked.
    pub fn content(&self) -> Option<&FileContent> {
        self.is_live().then_some(&self.content)
    }
}

impl PartialEq for PreviewReference {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    FileInvalidType,
    FileTooLarge,
    FileTooSmall,
    TooManyFiles,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FileInvalidType => "file type not accepted",
            Self::FileTooLarge => "file is too large",
            Self::FileTooSmall => "file is too small",
            Self::TooManyFiles => "too many files",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRejection {
    pub name: String,
    pub reasons: Vec<RejectionReason>,
}

impl fmt::Display for FileRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name)?;
        for (i, reason) in self.reasons.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{reason}")?;
        }
        Ok(())
    }
}

/// Constraints applied to candidates before they reach the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropzoneOptions {
    /// Media types (`video/mp4`), wildcards (`video/*`) or extensions (`.mp4`).
    pub accept: Vec<String>,
    pub max_files: usize,
    pub max_size: u64,
    pub min_size: u64,
}

impl Default for DropzoneOptions {
    fn default() -> Self {
        DropzoneOptions {
            accept: vec![MP4.to_string()],
            max_files: 1,
            max_size: MAX_VIDEO_SIZE,
            min_size: 0,
        }
    }
}

impl DropzoneOptions {
    pub fn accepts(&self, candidate: &FileCandidate) -> bool {
        if self.accept.is_empty() {
            return true;
        }
        let media_type = candidate.media_type.to_ascii_lowercase();
        let name = candidate.name.to_ascii_lowercase();
        self.accept.iter().map(|a| a.trim().to_ascii_lowercase()).any(|a| {
            if a.starts_with('.') {
                name.ends_with(&a)
            } else if let Some(group) = a.strip_suffix("/*") {
                media_type
                    .split_once('/')
                    .map_or(false, |(g, _)| g == group)
            } else {
                media_type == a
            }
        })
    }

    /// Splits candidates into accepted and rejected ones. When more candidates pass the per-file
    /// checks than `max_files` allows, every one of them is rejected.
    pub fn partition(
        &self,
        candidates: Vec<FileCandidate>,
    ) -> (Vec<FileCandidate>, Vec<FileRejection>) {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for candidate in candidates {
            let mut reasons = Vec::new();
            if !self.accepts(&candidate) {
                reasons.push(RejectionReason::FileInvalidType);
            }
            if candidate.size > self.max_size {
                reasons.push(RejectionReason::FileTooLarge);
            }
            if candidate.size < self.min_size {
                reasons.push(RejectionReason::FileTooSmall);
            }

            if reasons.is_empty() {
                accepted.push(candidate);
            } else {
                rejected.push(FileRejection {
                    name: candidate.name,
                    reasons,
                });
            }
        }

        if self.max_files > 0 && accepted.len() > self.max_files {
            rejected.extend(accepted.drain(..).map(|c| FileRejection {
                name: c.name,
                reasons: vec![RejectionReason::TooManyFiles],
            }));
        }

        (accepted, rejected)
    }
}
