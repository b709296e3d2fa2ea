use std::path::PathBuf;

use clap::{Parser, Subcommand};
use intellidoc_lib::LaunchOptions;

#[derive(Parser, Debug)]
#[command(name = "intellidoc")]
#[command(about = "Upload documents, ask questions, summarize and compare them")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Settings file (defaults to <config dir>/intellidoc/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Simulated backend latency in milliseconds
    #[arg(long, global = true)]
    latency_ms: Option<u64>,

    /// Upper bound on a single backend call, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug, Default)]
enum Command {
    /// Interactive session (default)
    #[default]
    Shell,
    /// Run a scripted walkthrough and print the resulting session as JSON
    Demo,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = intellidoc_lib::init_logging(&["intellidoc_lib=info", "intellidoc_core=info"])
    {
        eprintln!("{:#}", e);
    }

    let options = LaunchOptions {
        settings_path: args.settings,
        latency_ms: args.latency_ms,
        timeout_secs: args.timeout_secs,
    };
    let result = match args.command.unwrap_or_default() {
        Command::Shell => intellidoc_lib::run_shell(options),
        Command::Demo => intellidoc_lib::run_demo(options),
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
