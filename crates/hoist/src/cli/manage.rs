//! Local model bookkeeping: copy and remove.

use anyhow::{Context as _, Result};
use clap::Args;
use hoist_core::Outcome;
use hoist_core::client::CopyRequest;

use crate::cli::Context;

#[derive(Args, Clone, Debug)]
pub struct CopyArg {
    /// Model to copy
    pub source: String,

    /// Name of the copy
    pub destination: String,
}

#[derive(Args, Clone, Debug)]
pub struct RmArg {
    /// Models to remove
    #[arg(required = true, num_args = 1..)]
    pub models: Vec<String>,
}

pub async fn copy(arg: CopyArg, ctx: &Context) -> Result<Outcome<()>> {
    let request = CopyRequest {
        source:      arg.source,
        destination: arg.destination,
    };
    ctx.client
        .copy(&request)
        .await
        .with_context(|| format!("copying '{}'", request.source))?;
    println!("copied '{}' to '{}'", request.source, request.destination);
    Ok(Outcome::Completed(()))
}

/// Stops at the first model the server refuses to delete.
pub async fn remove(arg: &RmArg, ctx: &Context) -> Result<Outcome<()>> {
    for model in &arg.models {
        ctx.client.delete(model).await.with_context(|| format!("deleting '{model}'"))?;
        println!("deleted '{model}'");
    }
    Ok(Outcome::Completed(()))
}
