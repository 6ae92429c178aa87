pub mod app;
pub mod bundle;
pub mod create;
pub mod images;
pub mod manage;
pub mod modelfile;
pub mod registry;
pub mod run;
pub mod sniff;

use anyhow::{Context as _, Result};
use hoist_core::{CancellationToken, Client, ClientConfig, Outcome, ProgressMultiplexer, SignalWatcher};

use crate::cli::app::{App, Commands};

/// What every command needs.
pub struct Context {
    pub client:  Client,
    pub verbose: bool,
}

impl Context {
    pub fn from_env(verbose: bool) -> Result<Self> {
        let config = ClientConfig::from_env().context("reading client configuration")?;
        let client = Client::from_config(&config).context("building http client")?;
        Ok(Self { client, verbose })
    }
}

/// A fresh token cancelled by Ctrl-C for as long as the watcher lives.
pub fn interruptible() -> (CancellationToken, SignalWatcher) {
    let token = CancellationToken::new();
    let watcher = SignalWatcher::interrupt(token.clone());
    (token, watcher)
}

/// Stop every widget; a cancelled operation also erases the display.
pub fn settle<T, E>(display: &mut ProgressMultiplexer, outcome: &std::result::Result<Outcome<T>, E>) {
    match outcome {
        Ok(Outcome::Cancelled) => display.stop_and_clear(),
        _ => display.stop(),
    }
}

pub async fn dispatch(app: App) -> Result<Outcome<()>> {
    let ctx = Context::from_env(app.verbose)?;
    execute(app.cmd, &ctx).await
}

/// Every command needs a reachable server, so check that first.
async fn execute(cmd: Commands, ctx: &Context) -> Result<Outcome<()>> {
    ctx.client.heartbeat().await?;
    match cmd {
        Commands::Create(arg) => create::create(arg, ctx).await,
        Commands::Pull(arg) => registry::pull(&arg, ctx).await,
        Commands::Push(arg) => registry::push(&arg, ctx).await,
        Commands::Run(arg) => run::run(arg, ctx).await,
        Commands::Cp(arg) => manage::copy(arg, ctx).await,
        Commands::Rm(arg) => manage::remove(&arg, ctx).await,
    }
}
