use anyhow::{Result, anyhow};
use clap::Args;
use hoist_core::client::RegistryRequest;
use hoist_core::{ClientError, Outcome, ProgressMultiplexer};

use crate::cli::{Context, interruptible, settle};

const PUSH_DENIED: &str =
    "you are not authorized to push to this namespace, create the model under a namespace you own";

#[derive(Args, Clone, Debug)]
pub struct PullArg {
    /// Model to pull
    pub model: String,

    /// Use an insecure registry
    #[arg(long)]
    pub insecure: bool,
}

#[derive(Args, Clone, Debug)]
pub struct PushArg {
    /// Model to push
    pub model: String,

    /// Use an insecure registry
    #[arg(long)]
    pub insecure: bool,
}

pub async fn pull(arg: &PullArg, ctx: &Context) -> Result<Outcome<()>> {
    let (cancel, _watcher) = interruptible();
    let request = RegistryRequest {
        name:     arg.model.clone(),
        insecure: arg.insecure,
    };

    let mut display = ProgressMultiplexer::stderr("pulling");
    let outcome = ctx.client.pull(&request, &cancel, |event| display.observe(event)).await;
    settle(&mut display, &outcome);
    Ok(outcome?)
}

pub async fn push(arg: &PushArg, ctx: &Context) -> Result<Outcome<()>> {
    let (cancel, _watcher) = interruptible();
    let request = RegistryRequest {
        name:     arg.model.clone(),
        insecure: arg.insecure,
    };

    let mut display = ProgressMultiplexer::stderr("pushing");
    let outcome = ctx.client.push(&request, &cancel, |event| display.observe(event)).await;
    settle(&mut display, &outcome);
    outcome.map_err(explain_push_error)
}

fn explain_push_error(e: ClientError) -> anyhow::Error {
    if e.to_string().contains("access denied") {
        anyhow!(PUSH_DENIED)
    } else {
        e.into()
    }
}
