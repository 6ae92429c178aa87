use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use hoist_core::client::CreateRequest;
use hoist_core::ui::percent_reporter;
use hoist_core::{CancellationToken, Outcome, ProgressEvent, ProgressMultiplexer};
use hoist_transfer::{BlobTransfer, HttpTransport, TransferOptions};
use tracing::info;

use crate::cli::bundle::bundle_weights;
use crate::cli::modelfile::{Modelfile, Resolved, resolve};
use crate::cli::{Context, interruptible, settle};

const TRANSFER_STATUS: &str = "transferring model data";

#[derive(Args, Clone, Debug)]
pub struct CreateArg {
    /// Name of the new model
    pub model: String,

    /// Path to the Modelfile
    #[arg(long, short = 'f', value_name = "FILE")]
    pub file: PathBuf,

    /// Quantize the weights to this level, e.g. q4_0
    #[arg(long, short)]
    pub quantize: Option<String>,
}

pub async fn create(arg: CreateArg, ctx: &Context) -> Result<Outcome<()>> {
    let (cancel, _watcher) = interruptible();
    let path = std::path::absolute(&arg.file)
        .with_context(|| format!("resolving {}", arg.file.display()))?;
    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let base = path.parent().unwrap_or(Path::new("/"));

    let mut display = ProgressMultiplexer::stderr("pulling");
    display.observe(ProgressEvent::status(TRANSFER_STATUS));

    let transfer = blob_transfer(ctx.client.blob_transport(), &display);
    let mut modelfile = Modelfile::parse(&text);
    let home = home::home_dir();
    let uploaded = upload_sources(&mut modelfile, base, home.as_deref(), &transfer, &cancel).await;
    if !matches!(uploaded, Ok(Outcome::Completed(()))) {
        settle(&mut display, &uploaded);
        return uploaded;
    }

    let request = CreateRequest {
        name:      arg.model,
        modelfile: modelfile.render(),
        quantize:  arg.quantize,
    };
    let outcome = ctx.client.create(&request, &cancel, |event| display.observe(event)).await;
    settle(&mut display, &outcome);
    Ok(outcome?)
}

fn blob_transfer<T: HttpTransport>(transport: T, display: &ProgressMultiplexer) -> BlobTransfer<T> {
    let options = match display.status_spinner() {
        Some(spinner) => TransferOptions::default().on_progress(percent_reporter(spinner, TRANSFER_STATUS)),
        None => TransferOptions::default(),
    };
    BlobTransfer::new(transport).with_options(options)
}

/// Send every local FROM/ADAPTER file to the server and point the Modelfile
/// at the resulting blobs. Directories travel as a temporary zip that is
/// removed once its transfer is over.
async fn upload_sources<T: HttpTransport>(
    modelfile: &mut Modelfile,
    base: &Path,
    home: Option<&Path>,
    transfer: &BlobTransfer<T>,
    cancel: &CancellationToken,
) -> Result<Outcome<()>> {
    for (index, kind, arg) in modelfile.sources() {
        let (path, _bundle) = match resolve(kind, &arg, base, home)? {
            Resolved::ModelName => continue,
            Resolved::File(path) => (path, None),
            Resolved::Directory(dir) => {
                let bundle = tokio::task::spawn_blocking(move || bundle_weights(&dir)).await??;
                if cancel.is_cancelled() {
                    return Ok(Outcome::Cancelled);
                }
                (bundle.path().to_path_buf(), Some(bundle))
            }
        };

        match transfer.transfer(&path, cancel).await {
            Ok(report) => {
                info!(path = %path.display(), digest = %report.digest, placement = ?report.placement, "blob ready");
                modelfile.set_arg(index, format!("@{}", report.digest));
            }
            Err(e) if e.is_cancelled() => return Ok(Outcome::Cancelled),
            Err(e) => return Err(e).with_context(|| format!("transferring {}", path.display())),
        }
    }
    Ok(Outcome::Completed(()))
}
