//! # Solo-Machine
//!
//! Entry point of the solo-machine agent.
//!
//! ## Commands
//!
//! 1. `init` - create the identity and an example `config.yaml`
//! 2. `link` (`start`) - create clients, open connection and ICS-20 channel
//! 3. `transfer` - send tokens over the open channel
//! 4. `update` - exchange fresh headers with the counterparty
//! 5. `status` - print local and counterparty state
//!
//! Every command resumes from what the store already holds; re-running a
//! failed command continues at the first incomplete step.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sm_04_light_client::HeaderOutcome;
use sm_05_handshake::HandshakeApi;
use solo_runtime::{Args, Command, SoloRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    match &args.command {
        Command::Init => init(&args.home),
        command => run(&args.home, command).await,
    }
}

/// `SOLO_LOG` wins over `RUST_LOG`; `--verbose` only sets the default.
fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let directives = std::env::var("SOLO_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default.to_string());
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_new(&directives).context("invalid log filter")?)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn init(home: &Path) -> Result<()> {
    let report = SoloRuntime::init(home)
        .with_context(|| format!("initializing {}", home.display()))?;
    if report.config_written {
        println!("wrote example configuration to {}", home.join(solo_runtime::CONFIG_FILE).display());
    }
    if report.identity_created {
        println!("created machine identity");
    }
    println!("public key: {}", report.public_key);
    println!("sequence:   {}", report.sequence);
    Ok(())
}

async fn run(home: &Path, command: &Command) -> Result<()> {
    let Some(chain_name) = command.chain_name() else {
        bail!("{command:?} does not act on a chain");
    };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, abandoning confirmation waits");
            let _ = cancel_tx.send(true);
        }
    });

    let runtime = SoloRuntime::open(home, cancel_rx)
        .with_context(|| format!("loading {}", home.display()))?;
    let create = matches!(command, Command::Link(_));
    let service = runtime
        .service(chain_name, create)
        .with_context(|| format!("opening chain link {chain_name}"))?;
    let api: &dyn HandshakeApi = &service;

    match command {
        Command::Link(_) => {
            let link = api.link().await.with_context(|| format!("linking {chain_name}"))?;
            info!(chain = chain_name, "link open");
            print_json(&link)
        }
        Command::Update(_) => {
            let outcome = api.update().await.with_context(|| format!("updating {chain_name}"))?;
            println!("pushed header at sequence {}", outcome.pushed_sequence);
            match outcome.pulled {
                HeaderOutcome::Applied { height, .. } => println!("mirrored client updated to {height}"),
                HeaderOutcome::Unchanged(height) => println!("mirrored client already at {height}"),
            }
            Ok(())
        }
        Command::Transfer(transfer) => {
            let sender = hex::encode(runtime.keeper()?.public_key().as_bytes());
            let receipt = api
                .transfer(&transfer.request(&sender))
                .await
                .with_context(|| format!("transferring over {chain_name}"))?;
            print_json(&receipt)
        }
        Command::Status(_) => {
            let status = api.status().await.with_context(|| format!("querying {chain_name}"))?;
            print_json(&status)
        }
        Command::Init => bail!("init does not act on a chain"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
