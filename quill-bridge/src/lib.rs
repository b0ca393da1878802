//! # Quill Bridge
//!
//! Adapts one browser websocket into an ask/await contract for a caller
//! that asks a single question and waits for a single answer at a time.
//!
//! - `open_channel` serves the answer page on `/` and the websocket on `/ws`
//! - `BridgeHandle::send_question` pushes the latest question to the client
//! - `BridgeHandle::await_answer` waits for the next answer or a timeout
//! - `BlockingBridge` offers the same calls to plain threads

pub mod blocking;
pub mod bridge;
pub mod config;
pub mod server;

pub use blocking::BlockingBridge;
pub use bridge::{Answer, BridgeHandle};
pub use config::ListenConfig;
pub use server::{build_router, open_channel, ListenerHandle};
