//! Minimal client for the model server API.
//!
//! Long-running calls answer with newline-delimited JSON. Each record is
//! decoded and handed to a caller-supplied handler in arrival order, and
//! every read is raced against a [`CancellationToken`] so an interrupt
//! unblocks the call immediately.

mod types;

use std::io;
use std::sync::Arc;

use futures_util::StreamExt;
use hoist_transfer::{NoAuth, RequestSigner, ReqwestTransport};
use reqwest::redirect::Policy;
use reqwest::{Method, RequestBuilder, Response, header::AUTHORIZATION};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

pub use types::{
    ChatRecord, ChatRequest, CopyRequest, CreateRequest, GenerateRecord, GenerateRequest, Message,
    Metrics, ModelDetails, ProgressRecord, RegistryRequest, ShowResponse,
};
use types::{ErrorBody, NameRequest};

use crate::cancel::{CancellationToken, Outcome};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::ui::progress::ProgressEvent;

pub struct Client {
    http:      reqwest::Client,
    blob_http: reqwest::Client,
    base:      Url,
    signer:    Arc<dyn RequestSigner>,
}

impl Client {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http:      config.http_builder()?.build()?,
            blob_http: config.http_builder()?.redirect(Policy::none()).build()?,
            base:      config.host.clone(),
            signer:    Arc::new(NoAuth),
        })
    }

    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = signer;
        self
    }

    pub fn base(&self) -> &Url { &self.base }

    /// Blob negotiation and upload against the same server, sharing the
    /// signer. Redirects are answers there, so that client never follows them.
    pub fn blob_transport(&self) -> ReqwestTransport {
        ReqwestTransport::new(self.blob_http.clone(), self.base.clone(), Arc::clone(&self.signer))
    }

    pub async fn create(
        &self,
        request: &CreateRequest,
        cancel: &CancellationToken,
        on_progress: impl FnMut(ProgressEvent),
    ) -> Result<Outcome<()>> {
        self.progress_stream("/api/create", request, cancel, on_progress).await
    }

    pub async fn pull(
        &self,
        request: &RegistryRequest,
        cancel: &CancellationToken,
        on_progress: impl FnMut(ProgressEvent),
    ) -> Result<Outcome<()>> {
        self.progress_stream("/api/pull", request, cancel, on_progress).await
    }

    pub async fn push(
        &self,
        request: &RegistryRequest,
        cancel: &CancellationToken,
        on_progress: impl FnMut(ProgressEvent),
    ) -> Result<Outcome<()>> {
        self.progress_stream("/api/push", request, cancel, on_progress).await
    }

    /// Stream a completion. `on_record` sees every record; the last one is
    /// returned. A handler error of [`ClientError::Cancelled`] ends the call
    /// as [`Outcome::Cancelled`].
    pub async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
        mut on_record: impl FnMut(&GenerateRecord) -> Result<()>,
    ) -> Result<Outcome<Option<GenerateRecord>>> {
        let mut latest = None;
        let outcome = self
            .stream("/api/generate", request, cancel, |record: GenerateRecord| {
                on_record(&record)?;
                latest = Some(record);
                Ok(())
            })
            .await?;
        Ok(outcome.map(|()| latest))
    }

    pub async fn chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        mut on_record: impl FnMut(&ChatRecord) -> Result<()>,
    ) -> Result<Outcome<Option<ChatRecord>>> {
        let mut latest = None;
        let outcome = self
            .stream("/api/chat", request, cancel, |record: ChatRecord| {
                on_record(&record)?;
                latest = Some(record);
                Ok(())
            })
            .await?;
        Ok(outcome.map(|()| latest))
    }

    /// Check that a server answers at all before doing real work.
    pub async fn heartbeat(&self) -> Result<()> {
        let response = self.request(Method::HEAD, "/")?.send().await.map_err(|e| {
            if e.is_connect() {
                ClientError::Unreachable(self.base.to_string())
            } else {
                e.into()
            }
        })?;
        check_status(response).await.map(drop)
    }

    pub async fn copy(&self, request: &CopyRequest) -> Result<()> {
        self.send("/api/copy", request).await.map(drop)
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        self.send_as(Method::DELETE, "/api/delete", &NameRequest { name })
            .await
            .map(drop)
    }

    pub async fn show(&self, name: &str) -> Result<ShowResponse> {
        let response = self.send("/api/show", &NameRequest { name }).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Protocol(format!("show response: {e}")))
    }

    async fn progress_stream(
        &self,
        path: &str,
        body: &impl Serialize,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(ProgressEvent),
    ) -> Result<Outcome<()>> {
        self.stream(path, body, cancel, |record: ProgressRecord| {
            on_progress(record.into_event());
            Ok(())
        })
        .await
    }

    async fn stream<T, H>(
        &self,
        path: &str,
        body: &impl Serialize,
        cancel: &CancellationToken,
        mut handle: H,
    ) -> Result<Outcome<()>>
    where
        T: DeserializeOwned,
        H: FnMut(T) -> Result<()>,
    {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Outcome::Cancelled),
            response = self.send(path, body) => response?,
        };

        let chunks = response.bytes_stream().map(|chunk| chunk.map_err(io::Error::other));
        let mut lines = StreamReader::new(chunks).lines();
        let mut records = 0usize;

        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(path, records, "stream cancelled");
                    return Ok(Outcome::Cancelled);
                }
                line = lines.next_line() => line?,
            };
            let Some(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }

            records += 1;
            match handle(decode(&line)?) {
                Ok(()) => {}
                Err(ClientError::Cancelled) => return Ok(Outcome::Cancelled),
                Err(e) => return Err(e),
            }
        }

        debug!(path, records, "stream finished");
        Ok(Outcome::Completed(()))
    }

    async fn send(&self, path: &str, body: &impl Serialize) -> Result<Response> {
        self.send_as(Method::POST, path, body).await
    }

    async fn send_as(&self, method: Method, path: &str, body: &impl Serialize) -> Result<Response> {
        let response = self.request(method, path)?.json(body).send().await?;
        check_status(response).await
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .base
            .join(path)
            .map_err(|e| ClientError::Config(format!("invalid request url {path}: {e}")))?;
        let mut request = self.http.request(method.clone(), url);
        if let Some(authz) = self.signer.authorization(method.as_str(), path) {
            request = request.header(AUTHORIZATION, authz);
        }
        Ok(request)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody { error }) => error,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
    };
    Err(ClientError::Status {
        code: status.as_u16(),
        message,
    })
}

fn decode<T: DeserializeOwned>(line: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| ClientError::Protocol(format!("malformed record {line:?}: {e}")))?;
    if let Some(message) = value.get("error").and_then(|v| v.as_str()) {
        return Err(ClientError::Remote(message.to_string()));
    }
    serde_json::from_value(value).map_err(|e| ClientError::Protocol(format!("unexpected record: {e}")))
}
