//! Cross-subsystem integration flows.

#[cfg(test)]
pub mod harness;

#[cfg(test)]
mod handshake_flow;
#[cfg(test)]
mod proofs;
#[cfg(test)]
mod restart;
