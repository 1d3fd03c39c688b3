//! Stale-response guard: only the most recently issued request for a key
//! may publish its result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use tokio::sync::watch;

#[derive(Default)]
pub struct RequestGate {
    state: Mutex<GateState>,
}

/// Sequence numbers are drawn and published under one lock, so a newer
/// ticket can never be overwritten by an older one.
#[derive(Default)]
struct GateState {
    sequence: u64,
    latest: HashMap<String, watch::Sender<u64>>,
}

/// Handle for one issued request.
#[derive(Debug)]
pub struct Ticket {
    key: String,
    seq: u64,
    latest: watch::Receiver<u64>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket for `key`, superseding every earlier ticket for it.
    pub fn issue(&self, key: impl Into<String>) -> Ticket {
        let key = key.into();
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state.sequence += 1;
        let seq = state.sequence;
        let sender = state
            .latest
            .entry(key.clone())
            .or_insert_with(|| watch::channel(0).0);
        sender.send_replace(seq);
        Ticket {
            key,
            seq,
            latest: sender.subscribe(),
        }
    }
}

impl Ticket {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_current(&self) -> bool {
        *self.latest.borrow() == self.seq
    }

    /// Resolves once a newer ticket for the same key has been issued.
    pub async fn superseded(&mut self) {
        loop {
            if *self.latest.borrow_and_update() != self.seq {
                return;
            }
            if self.latest.changed().await.is_err() {
                // gate dropped: nothing can supersede us any more
                std::future::pending::<()>().await;
            }
        }
    }

    /// Drives `fut` unless superseded first. `None` means the result is
    /// stale and must not be applied.
    pub async fn run<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        let finished = tokio::select! {
            output = fut => Some(output),
            () = self.superseded() => None,
        };
        match finished {
            Some(output) if self.is_current() => Some(output),
            _ => {
                tracing::debug!(key = %self.key, seq = self.seq, "request superseded");
                None
            }
        }
    }
}
