//! Pure projection of [`WidgetState`] into what gets rendered.

use std::fmt;

use crate::session::{UploadStatus, WidgetState, SUCCESS_MESSAGE};

pub const DROPZONE_PROMPT: &str = "Drag and drop an MP4 file here, or click to select one";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    Dropzone,
    Preview { url: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadButton {
    pub label: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressBar {
    pub file_name: String,
    pub percent: u8,
    pub cancellable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Success { message: &'static str, url: String },
    Failure { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub status: UploadStatus,
    pub surface: Surface,
    pub button: UploadButton,
    pub progress: Option<ProgressBar>,
    pub banner: Option<Banner>,
    pub hints: Vec<String>,
}

pub fn project(state: &WidgetState) -> View {
    let status = state.session.status;
    let uploading = status == UploadStatus::Uploading;

    let surface = match (&state.preview, &state.selected) {
        (Some(preview), Some(file)) if preview.is_live() => Surface::Preview {
            url: preview.url(),
            name: file.name.clone(),
        },
        _ => Surface::Dropzone,
    };

    let button = UploadButton {
        label: if uploading { "Uploading..." } else { "Upload" },
        enabled: !uploading && state.selected.is_some(),
    };

    let percent = state.session.progress;
    let progress = (uploading && percent > 0 && percent < 100).then(|| ProgressBar {
        file_name: state
            .selected
            .as_ref()
            .map(|f| f.name.clone())
            .or_else(|| state.session.key.clone())
            .unwrap_or_default(),
        percent,
        cancellable: true,
    });

    let banner = if status == UploadStatus::Failed {
        Some(Banner::Failure {
            reason: state
                .session
                .failure
                .clone()
                .unwrap_or_else(|| "upload failed".to_string()),
        })
    } else {
        state.completed.as_ref().map(|c| Banner::Success {
            message: SUCCESS_MESSAGE,
            url: c.read_url.uri.to_string(),
        })
    };

    View {
        status,
        surface,
        button,
        progress,
        banner,
        hints: state.rejections.iter().map(ToString::to_string).collect(),
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.surface {
            Surface::Dropzone => writeln!(f, "[ {DROPZONE_PROMPT} ]")?,
            Surface::Preview { url, name } => writeln!(f, "[ {name} ({url}) ]")?,
        }
        for hint in &self.hints {
            writeln!(f, "  rejected {hint}")?;
        }

        let enabled = if self.button.enabled { "" } else { " (disabled)" };
        writeln!(f, "< {} >{enabled}", self.button.label)?;

        if let Some(bar) = &self.progress {
            const WIDTH: usize = 40;
            let filled = WIDTH * bar.percent as usize / 100;
            writeln!(
                f,
                "{} - {}% [{}{}] (ctrl-c to cancel)",
                bar.file_name,
                bar.percent,
                "#".repeat(filled),
                " ".repeat(WIDTH - filled)
            )?;
        }

        match &self.banner {
            Some(Banner::Success { message, url }) => writeln!(f, "{message}\n  {url}")?,
            Some(Banner::Failure { reason }) => writeln!(f, "Upload failed: {reason}")?,
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::intake::{FileCandidate, FileRejection, RejectionReason, MP4};
    use crate::session::SessionStore;

    fn store_with_file() -> SessionStore {
        let (store, _) = SessionStore::new();
        let file = FileCandidate::from_bytes("clip.mp4", MP4, Bytes::from_static(b"data"));
        store.select(Some(file.into()), vec![]);
        store
    }

    #[test]
    fn idle_without_file_shows_dropzone() {
        let view = project(&WidgetState::default());
        assert_eq!(view.surface, Surface::Dropzone);
        assert!(!view.button.enabled);
        assert!(view.progress.is_none());
        assert!(view.banner.is_none());
        assert!(view.to_string().contains(DROPZONE_PROMPT));
    }

    #[test]
    fn selection_shows_preview_and_enables_upload() {
        let view = project(&store_with_file().snapshot());
        assert!(matches!(view.surface, Surface::Preview { ref name, .. } if name == "clip.mp4"));
        assert_eq!(view.button, UploadButton { label: "Upload", enabled: true });
    }

    #[test]
    fn progress_bar_only_between_bounds() {
        let store = store_with_file();
        let (attempt, _) = store.begin("clip.mp4").unwrap();

        let view = project(&store.snapshot());
        assert_eq!(view.button, UploadButton { label: "Uploading...", enabled: false });
        assert!(view.progress.is_none());

        store.progress(attempt, 42);
        let view = project(&store.snapshot());
        let bar = view.progress.clone().unwrap();
        assert_eq!((bar.file_name.as_str(), bar.percent), ("clip.mp4", 42));
        assert!(view.to_string().contains("clip.mp4 - 42%"));

        store.progress(attempt, 100);
        assert!(project(&store.snapshot()).progress.is_none());
    }

    #[test]
    fn failure_banner_while_failed() {
        let store = store_with_file();
        let (attempt, _) = store.begin("clip.mp4").unwrap();
        store.fail(attempt, "storage answered the upload with status 500".to_string());
        store.finish(attempt, true);

        let view = project(&store.snapshot());
        assert_eq!(view.status, UploadStatus::Failed);
        assert_eq!(view.surface, Surface::Dropzone);
        assert!(matches!(
            view.banner,
            Some(Banner::Failure { ref reason }) if reason.contains("500")
        ));
    }

    #[test]
    fn rejections_become_hints() {
        let (store, _) = SessionStore::new();
        store.select(
            None,
            vec![FileRejection {
                name: "notes.txt".to_string(),
                reasons: vec![RejectionReason::FileInvalidType],
            }],
        );
        let view = project(&store.snapshot());
        assert_eq!(view.hints, vec!["notes.txt: file type not accepted".to_string()]);
    }
}
