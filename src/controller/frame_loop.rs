use super::Host;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag, cheap to clone across threads.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle for one requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// Keeps at most one frame request outstanding and refuses to run after cancel.
#[derive(Debug, Default)]
pub struct FrameLoop {
    pending: Option<FrameRequest>,
    token: CancellationToken,
    iterations: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Request the next frame unless one is already pending or the loop is stopped.
    pub fn schedule(&mut self, host: &mut dyn Host) -> bool {
        if self.token.is_cancelled() || self.pending.is_some() {
            return false;
        }
        self.pending = Some(host.request_frame());
        true
    }

    /// Claim `request` for this iteration. Stale or foreign handles are refused.
    pub fn begin(&mut self, request: FrameRequest) -> bool {
        if self.token.is_cancelled() || self.pending != Some(request) {
            return false;
        }
        self.pending = None;
        self.iterations += 1;
        true
    }

    pub fn cancel(&mut self, host: &mut dyn Host) {
        self.token.cancel();
        if let Some(request) = self.pending.take() {
            host.cancel_frame(request);
        }
    }
}
