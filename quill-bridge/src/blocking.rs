use crate::bridge::{Answer, BridgeHandle};
use std::time::Duration;
use tokio::runtime::Handle;

/// Synchronous face of a [`BridgeHandle`] for callers running on plain
/// threads. `await_answer` parks the calling thread, so it must never be
/// called from inside the runtime's async tasks.
#[derive(Clone)]
pub struct BlockingBridge {
    bridge: BridgeHandle,
    runtime: Handle,
}

impl BlockingBridge {
    pub fn new(bridge: BridgeHandle, runtime: Handle) -> Self {
        Self { bridge, runtime }
    }

    pub fn send_question(&self, text: impl Into<String>) -> bool {
        self.bridge.send_question(text)
    }

    pub fn await_answer(&self, timeout: Duration) -> Answer {
        self.runtime.block_on(self.bridge.await_answer(timeout))
    }
}
