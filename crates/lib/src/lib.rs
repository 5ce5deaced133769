//! Courier core library: conversation store, identity resolution, inbound
//! routing, Telegram transport, completion client and the HTTP control plane
//! used by the `courier` binary.

pub mod bridge;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod llm;
pub mod outreach;
pub mod prompt;
pub mod router;

#[cfg(test)]
mod testing;

pub use bridge::Bridge;
pub use error::{Error, Result};
