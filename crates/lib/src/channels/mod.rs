//! Messaging transport (Telegram).
//!
//! The `Transport` trait is everything the conversation core needs from the
//! messaging side: contact import and direct sends. Inbound messages arrive on
//! an mpsc channel and are handled by the router.

mod inbound;
mod telegram;
mod transport;

pub use inbound::InboundMessage;
pub use telegram::{login_interactive, TelegramTransport};
pub use transport::{ContactImport, Transport};
