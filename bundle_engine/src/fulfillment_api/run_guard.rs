use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Ensures at most one run of a periodic job is active at a time.
///
/// Clones share the same flag. The permit returned by [`RunGuard::try_acquire`] clears the flag when dropped, so
/// every exit path from a run, including errors and panics, frees it. Querying the state never claims the guard.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

/// Proof that the holder owns the current run.
#[derive(Debug)]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` if a run is already in progress. Never waits.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit { running: Arc::clone(&self.running) })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// The result of triggering a guarded run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome<T> {
    Completed(T),
    /// Another run was already in progress, so this trigger did nothing.
    Skipped,
}

impl<T> RunOutcome<T> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, RunOutcome::Skipped)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            RunOutcome::Completed(t) => Some(t),
            RunOutcome::Skipped => None,
        }
    }
}
