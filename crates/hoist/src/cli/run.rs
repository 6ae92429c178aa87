use std::io::{IsTerminal, Read, Write};

use anyhow::{Context as _, Result};
use clap::Args;
use hoist_core::client::{ChatRequest, GenerateRequest, Message, Metrics, ShowResponse};
use hoist_core::ui::render::terminal_width;
use hoist_core::{CancellationToken, Outcome, ProgressMultiplexer, Renderer};
use tokio::sync::mpsc;
use tracing::debug;

use crate::cli::images::extract_images;
use crate::cli::registry::{PullArg, pull};
use crate::cli::{Context, interruptible};

const PROMPT: &str = ">>> ";

#[derive(Args, Clone, Debug)]
pub struct RunArg {
    /// Model to run
    pub model: String,

    /// Prompt; without one, start an interactive session
    pub prompt: Vec<String>,

    /// Response format, e.g. json
    #[arg(long)]
    pub format: Option<String>,

    /// How long the model stays loaded, e.g. 5m or 1h30m
    #[arg(long, value_parser = parse_keep_alive)]
    pub keepalive: Option<String>,

    /// Print responses without wrapping words
    #[arg(long)]
    pub nowordwrap: bool,

    /// Use an insecure registry if the model has to be pulled
    #[arg(long)]
    pub insecure: bool,
}

pub async fn run(arg: RunArg, ctx: &Context) -> Result<Outcome<()>> {
    let mut prompts = arg.prompt.clone();
    let piped = !std::io::stdin().is_terminal();
    if piped {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input).context("reading stdin")?;
        prompts.insert(0, input);
    }
    let info = match show_or_pull(&arg, ctx).await? {
        Outcome::Completed(info) => info,
        Outcome::Cancelled => return Ok(Outcome::Cancelled),
    };
    let session = Session {
        model:      arg.model.clone(),
        format:     arg.format.clone(),
        keep_alive: arg.keepalive.clone(),
        wrap:       !arg.nowordwrap && !piped,
        verbose:    ctx.verbose,
        multimodal: info.is_multimodal(),
    };

    if piped || !prompts.is_empty() {
        session.generate(ctx, prompts.join(" ")).await
    } else {
        session.chat(ctx, info.messages).await
    }
}

async fn show_or_pull(arg: &RunArg, ctx: &Context) -> Result<Outcome<ShowResponse>> {
    match ctx.client.show(&arg.model).await {
        Ok(info) => Ok(Outcome::Completed(info)),
        Err(e) if e.is_not_found() => {
            debug!(model = %arg.model, "model not found locally, pulling");
            let pull_arg = PullArg {
                model:    arg.model.clone(),
                insecure: arg.insecure,
            };
            if pull(&pull_arg, ctx).await?.is_cancelled() {
                return Ok(Outcome::Cancelled);
            }
            Ok(Outcome::Completed(ctx.client.show(&arg.model).await?))
        }
        Err(e) => Err(e.into()),
    }
}

struct Session {
    model:      String,
    format:     Option<String>,
    keep_alive: Option<String>,
    wrap:       bool,
    verbose:    bool,
    multimodal: bool,
}

impl Session {
    fn renderer(&self) -> Renderer<std::io::Stdout, fn() -> Option<usize>> {
        Renderer::new(std::io::stdout(), terminal_width as fn() -> Option<usize>, self.wrap)
            .with_waiting(ProgressMultiplexer::stderr("pulling"))
    }

    /// Split image paths out of `text` when the model can see them.
    fn user_message(&self, text: &str) -> Result<Message> {
        let mut message = Message::user(text);
        if self.multimodal {
            let attached = extract_images(text, home::home_dir().as_deref())?;
            message.content = attached.prompt;
            message.images = attached.images;
        }
        Ok(message)
    }

    fn summarize(&self, metrics: &Metrics) {
        if self.verbose {
            eprint!("{}", metrics.summary());
        }
    }

    async fn generate(&self, ctx: &Context, prompt: String) -> Result<Outcome<()>> {
        let (cancel, _watcher) = interruptible();
        let Message { content, images, .. } = self.user_message(&prompt)?;
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: content,
            images,
            format: self.format.clone(),
            keep_alive: self.keep_alive.clone(),
            ..Default::default()
        };

        let mut renderer = self.renderer();
        let outcome = ctx
            .client
            .generate(&request, &cancel, |record| Ok(renderer.render(&record.response)?))
            .await;
        let mut out = renderer.finish()?;

        let last = match outcome? {
            Outcome::Completed(last) => last,
            Outcome::Cancelled => return Ok(Outcome::Cancelled),
        };
        if !request.prompt.is_empty() {
            writeln!(out)?;
            writeln!(out)?;
        }
        if let Some(last) = last.filter(|r| r.done) {
            self.summarize(&last.metrics);
        }
        Ok(Outcome::Completed(()))
    }

    /// Line-based chat. Ctrl-C during a response abandons that response
    /// only; `/bye` or end of input ends the session.
    async fn chat(&self, ctx: &Context, mut messages: Vec<Message>) -> Result<Outcome<()>> {
        let mut lines = spawn_line_reader();
        let mut stdout = std::io::stdout();

        loop {
            write!(stdout, "{PROMPT}")?;
            stdout.flush()?;

            let line = tokio::select! {
                line = lines.recv() => line,
                _ = tokio::signal::ctrl_c() => {
                    writeln!(stdout, "\nUse Ctrl + d or /bye to exit.")?;
                    continue;
                }
            };
            let Some(line) = line.transpose().context("reading input")? else {
                writeln!(stdout)?;
                break;
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "/bye" {
                break;
            }

            let message = match self.user_message(line) {
                Ok(message) => message,
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    continue;
                }
            };
            messages.push(message);
            let (cancel, _watcher) = interruptible();
            if let Some(reply) = self.chat_turn(ctx, &messages, &cancel).await? {
                messages.push(reply);
            }
        }
        Ok(Outcome::Completed(()))
    }

    async fn chat_turn(
        &self,
        ctx: &Context,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> Result<Option<Message>> {
        let request = ChatRequest {
            model:      self.model.clone(),
            messages:   messages.to_vec(),
            format:     self.format.clone(),
            keep_alive: self.keep_alive.clone(),
        };

        let mut reply = Message::assistant();
        let mut renderer = self.renderer();
        let outcome = ctx
            .client
            .chat(&request, cancel, |record| {
                if let Some(message) = &record.message {
                    reply.role.clone_from(&message.role);
                    reply.content.push_str(&message.content);
                }
                Ok(renderer.render(record.content())?)
            })
            .await;
        let mut out = renderer.finish()?;

        match outcome? {
            Outcome::Cancelled => {
                writeln!(out)?;
                Ok(None)
            }
            Outcome::Completed(last) => {
                writeln!(out)?;
                writeln!(out)?;
                if let Some(last) = last {
                    self.summarize(&last.metrics);
                }
                Ok(Some(reply))
            }
        }
    }
}

/// Read stdin lines on a plain thread so a pending read never holds up
/// runtime shutdown.
fn spawn_line_reader() -> mpsc::Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Accept Go-style durations such as `5m`, `1h30m`, `300ms` or `-1s`.
fn parse_keep_alive(raw: &str) -> std::result::Result<String, String> {
    let invalid = || format!("invalid duration {raw:?}");
    let body = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    if body == "0" {
        return Ok(raw.to_string());
    }
    if body.is_empty() {
        return Err(invalid());
    }

    let mut rest = body;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit() && c != '.').unwrap_or(rest.len());
        let (number, tail) = rest.split_at(digits);
        if number.is_empty() || number == "." || number.parse::<f64>().is_err() {
            return Err(invalid());
        }
        let unit = ["ns", "us", "µs", "ms", "s", "m", "h"]
            .into_iter()
            .filter(|unit| tail.starts_with(unit))
            .max_by_key(|unit| unit.len())
            .ok_or_else(invalid)?;
        rest = &tail[unit.len()..];
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoist_core::{Client, ClientConfig};
    use httpmock::prelude::*;

    #[test]
    fn keep_alive_durations() {
        for ok in ["5m", "1h30m", "300ms", "-1s", "0", "1.5h", "10us", "2µs"] {
            assert_eq!(parse_keep_alive(ok).as_deref(), Ok(ok), "{ok}");
        }
        for bad in ["", "5", "m", "5 m", "1x", "-", "1h30"] {
            assert!(parse_keep_alive(bad).is_err(), "{bad}");
        }
    }

    fn context(server: &MockServer) -> Context {
        let config = ClientConfig::from_vars(Some(&server.base_url()), None).unwrap();
        Context {
            client:  Client::from_config(&config).unwrap(),
            verbose: false,
        }
    }

    fn run_arg() -> RunArg {
        RunArg {
            model:      "tiny".into(),
            prompt:     Vec::new(),
            format:     None,
            keepalive:  None,
            nowordwrap: false,
            insecure:   false,
        }
    }

    #[tokio::test]
    async fn missing_model_is_pulled_once() {
        let server = MockServer::start_async().await;
        let show = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/show");
                then.status(404).json_body(serde_json::json!({"error": "model 'tiny' not found"}));
            })
            .await;
        let pulled = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/pull").json_body(serde_json::json!({"name": "tiny"}));
                then.status(200).body("{\"status\":\"success\"}\n");
            })
            .await;

        // The mock keeps answering 404, so the second show still fails.
        let err = show_or_pull(&run_arg(), &context(&server)).await.unwrap_err();

        assert_eq!(pulled.hits_async().await, 1);
        assert_eq!(show.hits_async().await, 2);
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn present_model_is_not_pulled() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/show");
                then.status(200).json_body(serde_json::json!({"details": {"families": ["llama"]}}));
            })
            .await;
        let pulled = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/pull");
                then.status(200);
            })
            .await;

        let info = show_or_pull(&run_arg(), &context(&server)).await.unwrap().completed().unwrap();

        assert_eq!(pulled.hits_async().await, 0);
        assert_eq!(info.families(), ["llama".to_string()]);
    }

    fn session(multimodal: bool) -> Session {
        Session {
            model:      "tiny".into(),
            format:     None,
            keep_alive: None,
            wrap:       false,
            verbose:    false,
            multimodal,
        }
    }

    #[test]
    fn only_multimodal_models_take_images() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("photo.png");
        std::fs::write(&photo, b"\x89PNG\r\n\x1a\n\x00\x00").unwrap();
        let text = format!("describe {}", photo.display());

        let seen = session(true).user_message(&text).unwrap();
        assert_eq!(seen.content, "describe");
        assert_eq!(seen.images.len(), 1);

        let plain = session(false).user_message(&text).unwrap();
        assert_eq!(plain.content, text);
        assert!(plain.images.is_empty());
    }
}
