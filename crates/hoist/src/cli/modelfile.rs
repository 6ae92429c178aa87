//! Just enough Modelfile handling to find local weights and point the
//! server at uploaded blobs instead.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// `FROM`: a model name or a weights file.
    Model,
    /// `ADAPTER`: always a file.
    Adapter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Other(String),
    Source { keyword: String, kind: Source, arg: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modelfile {
    lines: Vec<Line>,
}

impl Modelfile {
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|line| {
                let trimmed = line.trim_start();
                let (keyword, rest) = trimmed.split_once(char::is_whitespace).unwrap_or((trimmed, ""));
                let kind = match keyword.to_ascii_uppercase().as_str() {
                    "FROM" => Source::Model,
                    "ADAPTER" => Source::Adapter,
                    _ => return Line::Other(line.to_string()),
                };
                Line::Source {
                    keyword: keyword.to_string(),
                    kind,
                    arg: unquote(rest.trim()).to_string(),
                }
            })
            .collect();
        Self { lines }
    }

    /// `(index, kind, argument)` of every FROM and ADAPTER line.
    pub fn sources(&self) -> Vec<(usize, Source, String)> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| match line {
                Line::Source { kind, arg, .. } => Some((i, *kind, arg.clone())),
                Line::Other(_) => None,
            })
            .collect()
    }

    pub fn set_arg(&mut self, index: usize, value: String) {
        if let Some(Line::Source { arg, .. }) = self.lines.get_mut(index) {
            *arg = value;
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Other(text) => out.push_str(text),
                Line::Source { keyword, arg, .. } => {
                    out.push_str(keyword);
                    out.push(' ');
                    out.push_str(arg);
                }
            }
            out.push('\n');
        }
        out
    }
}

fn unquote(arg: &str) -> &str {
    arg.strip_prefix('"')
        .and_then(|a| a.strip_suffix('"'))
        .unwrap_or(arg)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    File(PathBuf),
    /// A checkpoint directory, bundled before transfer.
    Directory(PathBuf),
    /// Not on disk; the server resolves it.
    ModelName,
}

/// Decide whether a FROM/ADAPTER argument names a local file.
///
/// `~` expands to `home`; other relative paths are taken from `base`, the
/// Modelfile's directory.
pub fn resolve(kind: Source, arg: &str, base: &Path, home: Option<&Path>) -> Result<Resolved> {
    if arg.is_empty() {
        match kind {
            Source::Model => return Ok(Resolved::ModelName),
            Source::Adapter => bail!("ADAPTER needs a path"),
        }
    }

    let expanded = match (arg, home) {
        ("~", Some(home)) => home.to_path_buf(),
        (a, Some(home)) if a.starts_with("~/") => home.join(&a[2..]),
        (a, _) => PathBuf::from(a),
    };
    let path = if expanded.is_absolute() { expanded } else { base.join(expanded) };

    match std::fs::metadata(&path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound && kind == Source::Model => Ok(Resolved::ModelName),
        Err(e) => bail!("{}: {e}", path.display()),
        Ok(meta) if meta.is_dir() => Ok(Resolved::Directory(path)),
        Ok(_) => Ok(Resolved::File(path)),
    }
}
