use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{event, Level};

use video_upload::{
    telemetry, FailureDisplay, FileCandidate, HttpTransfer, S3Presigner, SessionEvent,
    StorageConfig, UploadOptions, UploadOutcome, UploadWidget,
};

/// Upload a video to object storage through a presigned URL.
#[derive(Debug, Parser)]
#[clap(version)]
struct Cli {
    #[clap(flatten)]
    storage: StorageConfig,

    /// Files to select. Only a single MP4 of at most 1 GiB is accepted.
    #[clap(required = true)]
    files: Vec<PathBuf>,

    /// Media type to declare instead of guessing from the extension.
    #[clap(long)]
    content_type: Option<String>,

    #[clap(long, env = "UPLOAD_KEY_PREFIX")]
    key_prefix: Option<String>,

    #[clap(long, env = "UPLOAD_PRESIGN_EXPIRY_SECS", default_value_t = 900)]
    presign_expiry_secs: u64,

    #[clap(long, env = "UPLOAD_PRESIGN_TIMEOUT_SECS", default_value_t = 30)]
    presign_timeout_secs: u64,

    #[clap(long, env = "UPLOAD_TRANSFER_TIMEOUT_SECS", default_value_t = 3600)]
    transfer_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::configure()?;

    cli.storage.validate()?;
    let options = UploadOptions {
        presign_expiry: Duration::from_secs(cli.presign_expiry_secs),
        presign_timeout: Duration::from_secs(cli.presign_timeout_secs),
        transfer_timeout: Duration::from_secs(cli.transfer_timeout_secs),
        failure_display: FailureDisplay::UntilAcknowledged,
        key_prefix: cli.key_prefix,
        ..Default::default()
    };

    let presigner = S3Presigner::new(&cli.storage, options.presign_expiry).await;
    let (widget, mut events) = UploadWidget::new(
        Arc::new(presigner),
        Arc::new(HttpTransfer::default()),
        options,
    );
    let widget = Arc::new(widget);

    let mut candidates = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        candidates.push(FileCandidate::from_path(path, cli.content_type.clone()).await?);
    }
    widget.on_select(candidates);

    let view = widget.view();
    print!("{view}");
    if !view.button.enabled {
        return Err("no acceptable file selected".into());
    }

    let renderer = tokio::spawn(async move {
        let mut name = String::new();
        while let Some(e) = events.recv().await {
            match e {
                SessionEvent::Selected { name: n } => name = n,
                SessionEvent::Progress(p) if p < 100 => {
                    eprint!("\r{name} - {p}%");
                    let _ = std::io::stderr().flush();
                }
                SessionEvent::Progress(_) | SessionEvent::Reset { .. } => eprintln!(),
                _ => {}
            }
        }
    });

    let canceller = {
        let widget = widget.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                event!(Level::INFO, "cancelling upload");
                widget.cancel();
            }
        })
    };

    let outcome = widget.upload().await;
    canceller.abort();
    let _ = canceller.await;
    print!("{}", widget.view());
    widget.acknowledge_failure();
    drop(widget);
    let _ = renderer.await;

    match outcome {
        UploadOutcome::Succeeded { .. } => Ok(()),
        UploadOutcome::Failed(e) => Err(e.into()),
        UploadOutcome::Cancelled => Err("upload cancelled".into()),
        UploadOutcome::Skipped | UploadOutcome::Busy => Err("nothing was uploaded".into()),
    }
}
