//! Pack a checkpoint directory (safetensors or PyTorch weights plus their
//! json configs and tokenizer) into one zip the server can import.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use tempfile::NamedTempFile;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::cli::sniff::ContentType;

/// Weight layouts in the order they are tried. A layout only counts when
/// every matching file has the expected content; unresolved git-lfs pointers
/// are text and fail that check.
const WEIGHTS: [(&str, &str, ContentType); 3] = [
    ("model", ".safetensors", ContentType::Binary),
    ("pytorch_model", ".bin", ContentType::Zip),
    ("consolidated", ".pth", ContentType::Zip),
];

const TOKENIZER: &str = "tokenizer.model";

/// Zip the importable files of `dir` into a temporary file, removed when the
/// returned handle drops.
pub fn bundle_weights(dir: &Path) -> Result<NamedTempFile> {
    let files = select_files(dir)?;

    let mut bundle = tempfile::Builder::new()
        .prefix("hoist-weights")
        .suffix(".zip")
        .tempfile()
        .context("creating weights bundle")?;
    let mut archive = ZipWriter::new(bundle.as_file_mut());
    for file in &files {
        add_entry(&mut archive, file).with_context(|| format!("bundling {}", file.display()))?;
    }
    archive.finish().context("finishing weights bundle")?;

    debug!(dir = %dir.display(), files = files.len(), bundle = %bundle.path().display(), "bundled weights");
    Ok(bundle)
}

fn select_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = WEIGHTS
        .iter()
        .map(|&(prefix, suffix, expected)| matching(dir, prefix, suffix, expected))
        .find_map(|found| found.ok().filter(|files| !files.is_empty()))
        .ok_or_else(|| anyhow::anyhow!("no safetensors or torch files found in {}", dir.display()))?;

    files.extend(matching(dir, "", ".json", ContentType::Text)?);

    let tokenizer = dir.join(TOKENIZER);
    if tokenizer.is_file() {
        files.extend(checked(vec![tokenizer], ContentType::Binary)?);
    } else if let Some(nested) = nested_tokenizer(dir)? {
        files.extend(checked(vec![nested], ContentType::Binary)?);
    }
    Ok(files)
}

/// Files directly in `dir` named `<prefix>*<suffix>`, sorted, all of which
/// must sniff as `expected`.
fn matching(dir: &Path, prefix: &str, suffix: &str, expected: ContentType) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(prefix) && name.ends_with(suffix) && entry.file_type()?.is_file() {
            found.push(entry.path());
        }
    }
    found.sort();
    checked(found, expected)
}

fn checked(files: Vec<PathBuf>, expected: ContentType) -> Result<Vec<PathBuf>> {
    for file in &files {
        let actual = ContentType::of_file(file).with_context(|| format!("reading {}", file.display()))?;
        if actual != expected {
            bail!("invalid content type for {}: expected {expected:?}, found {actual:?}", file.display());
        }
    }
    Ok(files)
}

/// Some checkpoints keep the tokenizer one directory down.
fn nested_tokenizer(dir: &Path) -> Result<Option<PathBuf>> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            let candidate = entry.path().join(TOKENIZER);
            if candidate.is_file() {
                candidates.push(candidate);
            }
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}

fn add_entry(archive: &mut ZipWriter<&mut File>, path: &Path) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    let mut source = File::open(path)?;
    let len = source.metadata()?.len();

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(len >= u64::from(u32::MAX));
    archive.start_file(name, options)?;
    io::copy(&mut source, archive)?;
    Ok(())
}
