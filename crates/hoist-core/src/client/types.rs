use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ui::progress::ProgressEvent;

#[derive(Debug, Clone, Serialize)]
pub struct CreateRequest {
    pub name:      String,
    pub modelfile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantize:  Option<String>,
}

/// Body of pull and push.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryRequest {
    pub name:     String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub insecure: bool,
}

/// One line of a create, pull or push stream.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ProgressRecord {
    #[serde(default)]
    pub status:    String,
    #[serde(default)]
    pub digest:    Option<String>,
    #[serde(default)]
    pub total:     Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
}

impl ProgressRecord {
    pub fn into_event(self) -> ProgressEvent {
        match self.digest.filter(|d| !d.is_empty()) {
            Some(digest) => ProgressEvent::bytes(
                digest,
                self.completed.unwrap_or_default(),
                self.total.unwrap_or_default(),
            ),
            None => ProgressEvent::status(self.status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role:    String,
    pub content: String,
    /// Base64-encoded images, for multimodal models.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images:  Vec<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role:    "user".into(),
            content: content.into(),
            images:  Vec::new(),
        }
    }

    pub fn assistant() -> Self {
        Self {
            role:    "assistant".into(),
            content: String::new(),
            images:  Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateRequest {
    pub model:      String,
    pub prompt:     String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context:    Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images:     Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format:     Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatRequest {
    pub model:      String,
    pub messages:   Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format:     Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

/// Timing counters carried by the final record of a response.
///
/// Durations are nanoseconds on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub total_duration:       Option<u64>,
    pub load_duration:        Option<u64>,
    pub prompt_eval_count:    Option<u64>,
    pub prompt_eval_duration: Option<u64>,
    pub eval_count:           Option<u64>,
    pub eval_duration:        Option<u64>,
}

impl Metrics {
    /// Multi-line human summary; absent or zero counters are skipped.
    pub fn summary(&self) -> String {
        let nonzero = |v: Option<u64>| v.filter(|&v| v > 0);
        let mut out = String::new();

        if let Some(ns) = nonzero(self.total_duration) {
            let _ = writeln!(out, "total duration:       {:?}", Duration::from_nanos(ns));
        }
        if let Some(ns) = nonzero(self.load_duration) {
            let _ = writeln!(out, "load duration:        {:?}", Duration::from_nanos(ns));
        }
        rate_lines(
            &mut out,
            "prompt eval",
            nonzero(self.prompt_eval_count),
            nonzero(self.prompt_eval_duration),
        );
        rate_lines(&mut out, "eval", nonzero(self.eval_count), nonzero(self.eval_duration));
        out
    }
}

fn rate_lines(out: &mut String, label: &str, count: Option<u64>, duration: Option<u64>) {
    if let Some(count) = count {
        let _ = writeln!(out, "{:<22}{count} token(s)", format!("{label} count:"));
    }
    if let Some(ns) = duration {
        let duration = Duration::from_nanos(ns);
        let _ = writeln!(out, "{:<22}{duration:?}", format!("{label} duration:"));
        if let Some(count) = count {
            let rate = count as f64 / duration.as_secs_f64();
            let _ = writeln!(out, "{:<22}{rate:.2} tokens/s", format!("{label} rate:"));
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRecord {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done:     bool,
    #[serde(default)]
    pub context:  Vec<i64>,
    #[serde(flatten)]
    pub metrics:  Metrics,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRecord {
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub done:    bool,
    #[serde(flatten)]
    pub metrics: Metrics,
}

impl ChatRecord {
    pub fn content(&self) -> &str { self.message.as_ref().map_or("", |m| m.content.as_str()) }
}

/// Body of show and delete.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NameRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyRequest {
    pub source:      String,
    pub destination: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelDetails {
    #[serde(default)]
    pub families: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShowResponse {
    #[serde(default)]
    pub details:  ModelDetails,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ShowResponse {
    pub fn families(&self) -> &[String] { self.details.families.as_deref().unwrap_or_default() }

    /// Models with a vision projector accept images alongside text.
    pub fn is_multimodal(&self) -> bool { self.families().iter().any(|f| f == "clip") }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::progress::ProgressKind;

    #[test]
    fn digest_records_become_byte_progress() {
        let record: ProgressRecord = serde_json::from_str(
            r#"{"status":"pulling 0123","digest":"sha256:0123","total":100,"completed":25}"#,
        )
        .unwrap();
        let event = record.into_event();

        assert_eq!(event.key, "sha256:0123");
        assert_eq!(event.kind, ProgressKind::ByteProgress {
            completed: 25,
            total:     100,
        });
    }

    #[test]
    fn plain_records_become_status() {
        let record: ProgressRecord = serde_json::from_str(r#"{"status":"writing manifest"}"#).unwrap();
        assert_eq!(record.into_event(), ProgressEvent::status("writing manifest"));
    }

    #[test]
    fn requests_omit_empty_options() {
        let body = serde_json::to_value(GenerateRequest {
            model: "tiny".into(),
            prompt: "hi".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"model": "tiny", "prompt": "hi"}));

        let body = serde_json::to_value(RegistryRequest {
            name:     "tiny".into(),
            insecure: true,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"name": "tiny", "insecure": true}));
    }

    #[test]
    fn final_record_carries_metrics() {
        let record: GenerateRecord = serde_json::from_str(
            r#"{"response":"","done":true,"context":[1,2],"total_duration":2000000000,"eval_count":10,"eval_duration":1000000000}"#,
        )
        .unwrap();

        assert!(record.done);
        assert_eq!(record.context, vec![1, 2]);
        let summary = record.metrics.summary();
        assert!(summary.contains("total duration:       2s"));
        assert!(summary.contains("eval count:           10 token(s)"));
        assert!(summary.contains("eval rate:            10.00 tokens/s"));
        assert!(!summary.contains("load duration"));
    }

    #[test]
    fn show_tolerates_null_families() {
        let show: ShowResponse =
            serde_json::from_str(r#"{"details":{"parent_model":"","families":null}}"#).unwrap();
        assert!(show.families().is_empty());
        assert!(!show.is_multimodal());
    }

    #[test]
    fn images_travel_only_when_attached() {
        let plain = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(plain, serde_json::json!({"role": "user", "content": "hi"}));

        let mut with_image = Message::user("what is this");
        with_image.images.push("aGVsbG8=".into());
        let body = serde_json::to_value(&with_image).unwrap();
        assert_eq!(body["images"], serde_json::json!(["aGVsbG8="]));

        let back: Message = serde_json::from_str(r#"{"role":"assistant","content":"a cat"}"#).unwrap();
        assert!(back.images.is_empty());
    }
}
