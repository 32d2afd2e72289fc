//! # launchpad-live
//!
//! The per-project live status channel.
//!
//! [`LiveChannel`] is the subscribe/unsubscribe seam the orchestrator uses.
//! [`WsChannel`] speaks the JSON frame protocol over a websocket; [`LocalHub`]
//! is an in-process channel for embedding and tests.

pub mod channel;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod ws;

pub use channel::LiveChannel;
pub use error::LiveError;
pub use hub::{HubCall, LocalHub};
pub use protocol::Frame;
pub use ws::WsChannel;
