//! Client side of hoist: talking to the model server and showing what it
//! says.
//!
//! - [`client`] - streaming API client
//! - [`config`] - server address, proxies and user agent from the environment
//! - [`ui::progress`] - keyed spinners and bars for long operations
//! - [`ui::render`] - word-wrapping printer for streamed text
//! - [`cancel`] - interrupt watcher and the [`Outcome`] of abortable calls

pub mod cancel;
pub mod client;
pub mod config;
mod error;
pub mod ui;

pub use cancel::{CancellationToken, Outcome, SignalWatcher};
pub use client::Client;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use ui::progress::{ProgressEvent, ProgressKind, ProgressMultiplexer};
pub use ui::render::{RenderState, Renderer};
