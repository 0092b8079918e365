/// One-shot timer advanced by the frame loop.
///
/// Fires exactly once, on the tick its delay elapses. A cancelled task
/// never fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeferredTask {
    remaining: f32,
    state: DeferredState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredState {
    Pending,
    Fired,
    Cancelled,
}

impl DeferredTask {
    pub fn new(delay: f32) -> Self {
        Self {
            remaining: delay.max(0.0),
            state: DeferredState::Pending,
        }
    }

    /// Advance by `dt` seconds. Returns true on the tick the task fires.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.state != DeferredState::Pending {
            return false;
        }
        self.remaining -= dt.max(0.0);
        if self.remaining <= 0.0 {
            self.state = DeferredState::Fired;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        if self.state == DeferredState::Pending {
            self.state = DeferredState::Cancelled;
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == DeferredState::Pending
    }

    pub fn state(&self) -> DeferredState {
        self.state
    }
}
