//! # Solo-Machine Runtime Library
//!
//! Exposes the pieces of the `solo-machine` binary for testing. The main
//! entry point is the `main.rs` binary.
//!
//! ## Module Structure
//!
//! ```text
//! solo-runtime/
//! ├── cli.rs        # clap arguments and subcommands
//! ├── config.rs     # SoloMachineConfig / ChainConfig (config.yaml)
//! ├── gateway/      # GatewayChainClient: ChainClient over JSON-RPC
//! └── runtime.rs    # SoloRuntime: home directory, store, identity, services
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod gateway;
pub mod runtime;

pub use cli::{Args, Command};
pub use config::{ChainConfig, SoloMachineConfig, CONFIG_FILE};
pub use gateway::{GatewayChainClient, GatewayError, GatewayTransport, HttpTransport};
pub use runtime::{InitReport, SoloRuntime};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
