use quill_common::NO_RESPONSE;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::{timeout_at, Instant};
use tracing::debug;
use uuid::Uuid;

/// Latest undelivered question for one socket task. A watch channel keeps
/// only the newest value, so a question that was never written is replaced.
pub type Tx = watch::Sender<Option<String>>;
pub type Rx = watch::Receiver<Option<String>>;

/// Outcome of waiting for the human.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Received(String),
    TimedOut,
}

impl Answer {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// String form handed to callers that cannot branch on the variant.
    pub fn into_text(self) -> String {
        match self {
            Self::Received(text) => text,
            Self::TimedOut => NO_RESPONSE.to_string(),
        }
    }
}

struct Connection {
    session_id: Uuid,
    tx: Tx,
}

#[derive(Default)]
struct BridgeState {
    pending_question: Option<String>,
    pending_answer: Option<String>,
    connection: Option<Connection>,
}

struct Shared {
    state: Mutex<BridgeState>,
    answer_ready: Notify,
    connected: Notify,
}

/// Shared handle to the bridge state
#[derive(Clone)]
pub struct BridgeHandle {
    inner: Arc<Shared>,
}

impl Default for BridgeHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(BridgeState::default()),
                answer_ready: Notify::new(),
                connected: Notify::new(),
            }),
        }
    }

    // Every critical section is a plain field swap, so a poisoned lock
    // still holds consistent data.
    fn lock(&self) -> MutexGuard<'_, BridgeState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `session_id` the active connection and return the receiver its
    /// socket task drains. Any previous connection is dropped, which closes
    /// its receiver.
    pub fn register_connection(&self, session_id: Uuid) -> Rx {
        let (tx, rx) = watch::channel(None);
        let stale = self.lock().connection.replace(Connection { session_id, tx });
        if let Some(stale) = stale {
            debug!("bridge: session {} replaces {}", session_id, stale.session_id);
        }
        self.inner.connected.notify_waiters();
        rx
    }

    /// Clear the active connection if it still belongs to `session_id`.
    pub fn unregister_connection(&self, session_id: Uuid) {
        let mut state = self.lock();
        if state
            .connection
            .as_ref()
            .is_some_and(|c| c.session_id == session_id)
        {
            state.connection = None;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connection.is_some()
    }

    pub fn pending_question(&self) -> Option<String> {
        self.lock().pending_question.clone()
    }

    /// Record `text` as the current question and hand it to the connected
    /// client, if any. Delivery is best effort and the call always succeeds.
    pub fn send_question(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        let mut state = self.lock();
        state.pending_question = Some(text.clone());
        match &state.connection {
            Some(conn) => {
                if conn.tx.send(Some(text)).is_err() {
                    debug!("bridge: session {} already closed", conn.session_id);
                }
            }
            None => debug!("bridge: no client connected, question not delivered"),
        }
        true
    }

    /// Overwrite the answer slot. An unconsumed earlier answer is lost.
    pub fn record_answer(&self, text: impl Into<String>) {
        self.lock().pending_answer = Some(text.into());
        self.inner.answer_ready.notify_one();
    }

    /// Take the pending answer, leaving the slot empty.
    pub fn take_answer(&self) -> Option<String> {
        self.lock().pending_answer.take()
    }

    /// Wait until an answer is recorded or `timeout` elapses.
    pub async fn await_answer(&self, timeout: Duration) -> Answer {
        if let Some(answer) = self.take_answer() {
            return Answer::Received(answer);
        }
        let deadline = Instant::now().checked_add(timeout);
        loop {
            // notify_one stores a permit, so an answer recorded after the
            // check above still wakes us.
            if !wait_until(deadline, self.inner.answer_ready.notified()).await {
                return Answer::TimedOut;
            }
            if let Some(answer) = self.take_answer() {
                return Answer::Received(answer);
            }
        }
    }

    /// Resolve once a client is connected, or return false after `timeout`.
    pub async fn wait_for_connection(&self, timeout: Duration) -> bool {
        if self.is_connected() {
            return true;
        }
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let notified = self.inner.connected.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_connected() {
                return true;
            }
            if !wait_until(deadline, notified).await {
                return self.is_connected();
            }
        }
    }

    /// Drop the active connection, closing its socket. Returns whether one
    /// was open.
    pub fn disconnect(&self) -> bool {
        self.lock().connection.take().is_some()
    }
}

/// Await `fut` until `deadline`; `None` means a timeout too large to
/// represent, which never fires. Returns false on timeout.
async fn wait_until<F: Future>(deadline: Option<Instant>, fut: F) -> bool {
    match deadline {
        Some(deadline) => timeout_at(deadline, fut).await.is_ok(),
        None => {
            fut.await;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_without_client_is_recorded() {
        let bridge = BridgeHandle::new();
        assert!(bridge.send_question("How many words?"));
        assert_eq!(bridge.pending_question().as_deref(), Some("How many words?"));
        assert!(!bridge.is_connected());
    }

    #[test]
    fn undelivered_question_is_replaced() {
        let bridge = BridgeHandle::new();
        let mut rx = bridge.register_connection(Uuid::new_v4());
        bridge.send_question("first");
        bridge.send_question("second");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_deref(), Some("second"));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn stale_disconnect_keeps_newer_connection() {
        let bridge = BridgeHandle::new();
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();
        let old_rx = bridge.register_connection(old);
        let _new_rx = bridge.register_connection(new);
        assert!(old_rx.has_changed().is_err());

        bridge.unregister_connection(old);
        assert!(bridge.is_connected());
        bridge.unregister_connection(new);
        assert!(!bridge.is_connected());
    }

    #[test]
    fn question_after_disconnect_is_not_delivered() {
        let bridge = BridgeHandle::new();
        let session = Uuid::new_v4();
        let rx = bridge.register_connection(session);
        bridge.unregister_connection(session);

        assert!(bridge.send_question("anyone?"));
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn second_answer_wins() {
        let bridge = BridgeHandle::new();
        bridge.record_answer("one");
        bridge.record_answer("two");
        let answer = bridge.await_answer(Duration::from_secs(1)).await;
        assert_eq!(answer, Answer::Received("two".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn consumed_answer_is_not_returned_twice() {
        let bridge = BridgeHandle::new();
        bridge.record_answer("3");
        assert_eq!(
            bridge.await_answer(Duration::from_secs(5)).await,
            Answer::Received("3".into())
        );
        assert_eq!(
            bridge.await_answer(Duration::from_secs(5)).await,
            Answer::TimedOut
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_respects_deadline() {
        let bridge = BridgeHandle::new();
        let timeout = Duration::from_secs(3);
        let start = Instant::now();
        let answer = bridge.await_answer(timeout).await;
        let elapsed = start.elapsed();

        assert!(answer.is_timed_out());
        assert!(elapsed >= timeout);
        assert!(elapsed <= timeout + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn waiter_wakes_on_answer() {
        let bridge = BridgeHandle::new();
        let waiter = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.await_answer(Duration::from_secs(10)).await })
        };
        tokio::task::yield_now().await;
        bridge.record_answer("moon");
        let answer = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(answer, Answer::Received("moon".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_connection_times_out_without_client() {
        let bridge = BridgeHandle::new();
        assert!(!bridge.wait_for_connection(Duration::from_secs(2)).await);

        let waiter = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.wait_for_connection(Duration::from_secs(60)).await })
        };
        tokio::task::yield_now().await;
        let _rx = bridge.register_connection(Uuid::new_v4());
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn huge_timeout_does_not_overflow() {
        let bridge = BridgeHandle::new();
        let forever = Duration::from_secs(u64::MAX);
        bridge.record_answer("3");
        assert_eq!(bridge.await_answer(forever).await, Answer::Received("3".into()));

        let waiter = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.await_answer(forever).await })
        };
        tokio::task::yield_now().await;
        bridge.record_answer("4");
        let answer = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(answer, Answer::Received("4".into()));

        let _rx = bridge.register_connection(Uuid::new_v4());
        assert!(bridge.wait_for_connection(forever).await);
    }

    #[test]
    fn disconnect_closes_active_session() {
        let bridge = BridgeHandle::new();
        let rx = bridge.register_connection(Uuid::new_v4());
        assert!(bridge.disconnect());
        assert!(!bridge.is_connected());
        assert!(rx.has_changed().is_err());
        assert!(!bridge.disconnect());
    }

    #[test]
    fn timed_out_answer_maps_to_sentinel() {
        assert_eq!(Answer::TimedOut.into_text(), NO_RESPONSE);
        assert_eq!(Answer::Received("rose".into()).into_text(), "rose");
    }
}
