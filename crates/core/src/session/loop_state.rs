use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Active flag and last face count of one detection session.
///
/// Clones share the same flag and count. Every `start` gets a fresh flag via
/// [`LoopState::next_session`], so a worker left over from an earlier session
/// only ever sees its own, cancelled, flag.
#[derive(Clone, Debug, Default)]
pub struct LoopState {
    active: Arc<AtomicBool>,
    last_count: Arc<AtomicUsize>,
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn last_count(&self) -> usize {
        self.last_count.load(Ordering::SeqCst)
    }

    /// Active state for a new session; the count is shared and reset to 0.
    pub fn next_session(&self) -> Self {
        self.last_count.store(0, Ordering::SeqCst);
        Self {
            active: Arc::new(AtomicBool::new(true)),
            last_count: self.last_count.clone(),
        }
    }

    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn set_last_count(&self, count: usize) {
        self.last_count.store(count, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_idle() {
        let state = LoopState::new();

        assert!(!state.is_active());
        assert_eq!(state.last_count(), 0);
    }

    #[test]
    fn test_next_session_is_active_and_resets_count() {
        let idle = LoopState::new();
        idle.set_last_count(4);

        let session = idle.next_session();

        assert!(session.is_active());
        assert_eq!(session.last_count(), 0);
    }

    #[test]
    fn test_cancelling_old_session_leaves_new_one_running() {
        let first = LoopState::new().next_session();
        let second = first.next_session();

        first.cancel();

        assert!(!first.is_active());
        assert!(second.is_active());
    }

    #[test]
    fn test_clones_share_count() {
        let state = LoopState::new().next_session();
        let worker_view = state.clone();

        worker_view.set_last_count(3);

        assert_eq!(state.last_count(), 3);
    }
}
