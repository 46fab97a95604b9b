use clap::{Args, Subcommand, ValueEnum};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod call;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve requests arriving on this process's stdin, replying on stdout.
    Serve(ServeArgs),
    /// Spawn a command and send it one request over its pipes.
    Call(CallArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Call(args) => call::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Built-in method sets `serve` can expose.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum MethodSet {
    /// hello, add, echo, ping.
    Demo,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Method set to expose.
    #[arg(long, value_name = "SET", default_value = "demo")]
    pub methods: MethodSet,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Method name to invoke.
    #[arg(long, short = 'm')]
    pub method: String,
    /// Params as a JSON array (positional) or object (named).
    #[arg(long, default_value = "[]")]
    pub params: String,
    /// Request id. Allocated from the channel counter when omitted.
    #[arg(long, conflicts_with = "notify")]
    pub id: Option<i64>,
    /// Send a notification and exit without waiting for a reply.
    #[arg(long)]
    pub notify: bool,
    /// Maximum time to wait for the reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Command to spawn, after `--`.
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
