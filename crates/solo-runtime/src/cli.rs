//! Command-line interface.

use clap::{Args as ClapArgs, Parser, Subcommand};
use sm_05_handshake::TransferRequest;
use std::path::PathBuf;

/// Solo-machine IBC agent.
#[derive(Parser, Debug)]
#[command(name = "solo-machine")]
#[command(about = "Single-key IBC solo machine: client, connection and ICS-20 channel management")]
pub struct Args {
    /// Home directory holding config.yaml and the protocol store
    #[arg(long, env = "SOLO_HOME", default_value = ".solo-machine", global = true)]
    pub home: PathBuf,

    /// Log at debug level (overridden by SOLO_LOG / RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create the machine identity and an example configuration
    Init,
    /// Create clients and open the connection and ICS-20 channel
    #[command(alias = "start")]
    Link(ChainArg),
    /// Send an ICS-20 transfer over the open channel
    Transfer(TransferArgs),
    /// Push a new header and pull the counterparty's latest one
    Update(ChainArg),
    /// Show local and counterparty state of a link
    Status(ChainArg),
}

/// Selects a configured chain.
#[derive(ClapArgs, Debug, PartialEq, Eq)]
pub struct ChainArg {
    /// Chain name as configured under `chains:`
    #[arg(long)]
    pub chain_name: String,
}

/// Arguments of `transfer`.
#[derive(ClapArgs, Debug, PartialEq, Eq)]
pub struct TransferArgs {
    /// Chain name as configured under `chains:`
    #[arg(long)]
    pub chain_name: String,
    /// Denomination to send
    #[arg(long)]
    pub denom: String,
    /// Amount to send
    #[arg(long)]
    pub amount: u128,
    /// Recipient on the counterparty
    #[arg(long)]
    pub receiver: String,
    /// Sender recorded in the packet; defaults to the machine's public key
    #[arg(long)]
    pub sender: Option<String>,
    /// Optional memo
    #[arg(long, default_value = "")]
    pub memo: String,
}

impl TransferArgs {
    /// Request with `default_sender` filled in when none was given.
    pub fn request(&self, default_sender: &str) -> TransferRequest {
        TransferRequest {
            denom: self.denom.clone(),
            amount: self.amount,
            sender: self
                .sender
                .clone()
                .unwrap_or_else(|| default_sender.to_string()),
            receiver: self.receiver.clone(),
            memo: self.memo.clone(),
        }
    }
}

impl Command {
    /// Chain the command acts on, if any.
    pub fn chain_name(&self) -> Option<&str> {
        match self {
            Command::Init => None,
            Command::Link(c) | Command::Update(c) | Command::Status(c) => Some(&c.chain_name),
            Command::Transfer(t) => Some(&t.chain_name),
        }
    }
}
