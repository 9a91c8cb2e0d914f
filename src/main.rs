// Lanpipe - pipe stdin/stdout between two instances paired over mDNS
// Main entry point

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use lanpipe::cli::{self, Args, Invocation};
use lanpipe::config::load_config;
use lanpipe::rendezvous::{Rendezvous, RendezvousName};
use lanpipe::service::MdnsTransport;

#[tokio::main]
async fn main() -> ExitCode {
    let (args, name) = match cli::parse(std::env::args_os()) {
        Invocation::Run { args, name } => (args, name),
        Invocation::Info(e) => e.exit(),
        Invocation::Usage => {
            eprintln!("{}", cli::usage());
            return ExitCode::FAILURE;
        }
    };

    match run(args, name).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, name: RendezvousName) -> Result<ExitCode> {
    lanpipe::logging::init(args.verbose)?;

    let config = load_config(args.config.as_deref())?;
    let transport = Arc::new(MdnsTransport::new(config.lookup_window())?);
    let rendezvous = Rendezvous::new(name, config, transport);

    let established = tokio::select! {
        result = rendezvous.connect() => result.context("Rendezvous failed")?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted before a peer was found");
            return Ok(ExitCode::from(130));
        }
    };

    info!(role = %established.role, peer = %established.peer, "Connected");

    let report = lanpipe::pipe::run(
        established.stream,
        tokio::io::stdin(),
        tokio::io::stdout(),
    )
    .await;

    info!(sent = report.sent, received = report.received, "Pipe closed");
    Ok(ExitCode::SUCCESS)
}
