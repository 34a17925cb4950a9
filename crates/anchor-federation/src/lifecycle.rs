use std::sync::atomic::{AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;

/// §5: explicit component lifecycle, idempotent under repeated invocation
/// and safe to call concurrently. Mirrors the teacher's "guard a shared
/// state behind an atomic, check before mutating" idiom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ComponentState {
    Initialized = 0,
    Starting = 1,
    Started = 2,
    Stopping = 3,
    Stopped = 4,
}

impl ComponentState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ComponentState::Initialized,
            1 => ComponentState::Starting,
            2 => ComponentState::Started,
            3 => ComponentState::Stopping,
            _ => ComponentState::Stopped,
        }
    }
}

pub struct Lifecycle {
    state: AtomicU8,
    cancellation: CancellationToken,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ComponentState::Initialized as u8),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn get(&self) -> ComponentState {
        ComponentState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Idempotent: calling `start` twice in a row is a no-op the second time.
    pub fn start(&self) {
        self.state.store(ComponentState::Starting as u8, Ordering::SeqCst);
        self.state.store(ComponentState::Started as u8, Ordering::SeqCst);
    }

    /// Cancels this component's token in addition to flipping state, so a
    /// background task blocked in `tokio::select!` on
    /// `cancellation().cancelled()` wakes up even if it started waiting
    /// before `stop()` was called (§5: cancellation propagates to in-flight
    /// sub-operations).
    pub fn stop(&self) {
        self.state.store(ComponentState::Stopping as u8, Ordering::SeqCst);
        self.cancellation.cancel();
        self.state.store(ComponentState::Stopped as u8, Ordering::SeqCst);
    }

    pub fn is_started(&self) -> bool {
        self.get() == ComponentState::Started
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
