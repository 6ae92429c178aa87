//! Image paths typed into a prompt for a vision model become attachments.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::cli::sniff::ContentType;

const MAX_IMAGE_BYTES: u64 = 100 * 1024 * 1024;

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Prompt text with image paths removed, plus each image base64-encoded.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Attachments {
    pub prompt: String,
    pub images: Vec<String>,
}

/// Pull every word of `prompt` that names an existing png or jpeg file out
/// of the text. Words that only look like image paths stay in the prompt.
pub fn extract_images(prompt: &str, home: Option<&Path>) -> Result<Attachments> {
    let mut kept = Vec::new();
    let mut images = Vec::new();

    for word in prompt.split(' ') {
        match image_path(word, home) {
            Some(path) => {
                images.push(encode(&path)?);
                eprintln!("Added image '{}'", path.display());
            }
            None => kept.push(word),
        }
    }

    Ok(Attachments {
        prompt: kept.join(" ").trim().to_string(),
        images,
    })
}

fn image_path(word: &str, home: Option<&Path>) -> Option<PathBuf> {
    let word = word.trim_matches(|c| c == '"' || c == '\'');
    let has_extension = Path::new(word)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)));
    if !has_extension {
        return None;
    }

    let path = match (word.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(word),
    };
    path.is_file().then_some(path)
}

fn encode(path: &Path) -> Result<String> {
    let len = path.metadata().with_context(|| format!("reading {}", path.display()))?.len();
    if len > MAX_IMAGE_BYTES {
        bail!("{} is larger than the 100MB image limit", path.display());
    }
    match ContentType::of_file(path)? {
        ContentType::Png | ContentType::Jpeg => {}
        other => bail!("{} is not a png or jpeg image ({other:?})", path.display()),
    }
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR";

    #[test]
    fn image_words_become_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let cat = dir.path().join("cat.PNG");
        std::fs::write(&cat, PNG).unwrap();

        let attached = extract_images(&format!("what is in {} ?", cat.display()), None).unwrap();

        assert_eq!(attached.prompt, "what is in ?");
        assert_eq!(attached.images, vec![STANDARD.encode(PNG)]);
    }

    #[test]
    fn home_relative_paths_expand() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join("dog.jpg"), b"\xff\xd8\xff\xe0jfif").unwrap();

        let attached = extract_images("describe ~/dog.jpg", Some(home.path())).unwrap();

        assert_eq!(attached.prompt, "describe");
        assert_eq!(attached.images.len(), 1);
    }

    #[test]
    fn missing_files_stay_in_the_prompt() {
        let attached = extract_images("rename photo.png to cover.jpeg", None).unwrap();

        assert_eq!(attached.prompt, "rename photo.png to cover.jpeg");
        assert!(attached.images.is_empty());
    }

    #[test]
    fn mislabelled_images_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("notes.png");
        std::fs::write(&fake, b"plain text").unwrap();

        let err = extract_images(&fake.display().to_string(), None).unwrap_err();
        assert!(err.to_string().contains("not a png or jpeg"));
    }
}
