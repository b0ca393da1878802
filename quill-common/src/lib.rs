pub mod error;
pub mod protocol;

pub use error::BridgeError;
pub use protocol::{ServerMessage, GREETING, NO_RESPONSE};
