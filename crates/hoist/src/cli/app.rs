use clap::{Parser, Subcommand};

use crate::cli::create::CreateArg;
use crate::cli::manage::{CopyArg, RmArg};
use crate::cli::registry::{PullArg, PushArg};
use crate::cli::run::RunArg;

#[derive(Clone, Debug, Parser)]
#[command(name = "hoist", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    #[command(subcommand)]
    pub cmd: Commands,

    /// Debug logging, and response metrics after `run`
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(name = "create", about = "Create a model from a Modelfile")]
    Create(CreateArg),
    #[command(name = "pull", about = "Pull a model from a registry")]
    Pull(PullArg),
    #[command(name = "push", about = "Push a model to a registry")]
    Push(PushArg),
    #[command(name = "run", about = "Run a model")]
    Run(RunArg),
    #[command(name = "cp", about = "Copy a model")]
    Cp(CopyArg),
    #[command(name = "rm", about = "Remove one or more models")]
    Rm(RmArg),
}
