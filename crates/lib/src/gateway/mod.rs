//! Gateway: HTTP control plane.
//!
//! `POST /send` starts a conversation, `POST /update-prompt` rewrites its
//! instruction, `GET /` reports health. `run_gateway` also wires the Telegram
//! transport and the inbound router for the lifetime of the process.

mod protocol;
mod server;

pub use protocol::{SendRequest, SuccessResponse, UpdatePromptRequest};
pub use server::{app, run_gateway};
