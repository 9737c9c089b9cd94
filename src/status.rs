use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;

/// Collection run state. `Error` is terminal until the next accepted start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub state: RunState,
    pub message: String,
    pub pages_fetched: u32,
    pub items_fetched: u32,
    pub project_id: Option<i64>,
}

#[derive(Debug)]
struct Inner {
    state: RunState,
    message: String,
    pages_fetched: u32,
    items_fetched: u32,
    target_project: Option<i64>,
    cancel: Option<CancellationToken>,
    // Projects mid-deletion; a run cannot claim these as its target
    deleting: HashSet<i64>,
}

/// Process-wide tracker for the single active collection run. All clients
/// poll this; the runner is its only writer. The "at most one Running run"
/// invariant lives in [`StatusTracker::try_begin`].
#[derive(Clone)]
pub struct StatusTracker {
    inner: Arc<Mutex<Inner>>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: RunState::Idle,
                message: String::new(),
                pages_fetched: 0,
                items_fetched: 0,
                target_project: None,
                cancel: None,
                deleting: HashSet::new(),
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panicked writer must not take every later status poll down with
        // it; the tracker state stays consistent field-by-field.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Atomically reserve the run slot. Rejects with `AlreadyRunning` if a
    /// run is active; an `Error` state from a previous run is cleared.
    pub fn try_begin(&self, query: &str) -> Result<CancellationToken, AppError> {
        let mut inner = self.lock();
        if inner.state == RunState::Running {
            return Err(AppError::AlreadyRunning);
        }
        let token = CancellationToken::new();
        inner.state = RunState::Running;
        inner.message = format!("Collecting vacancies for \"{query}\"...");
        inner.pages_fetched = 0;
        inner.items_fetched = 0;
        inner.target_project = None;
        inner.cancel = Some(token.clone());
        Ok(token)
    }

    /// Release a reservation that never turned into a run (e.g. project
    /// creation failed after the slot was taken).
    pub fn release(&self) {
        let mut inner = self.lock();
        inner.state = RunState::Idle;
        inner.message.clear();
        inner.target_project = None;
        inner.cancel = None;
    }

    /// Bind the reserved run to its target project. Rejects when the
    /// project is mid-deletion; the caller releases the slot.
    pub fn claim_target(&self, project_id: i64) -> Result<(), AppError> {
        let mut inner = self.lock();
        if inner.deleting.contains(&project_id) {
            return Err(AppError::ProjectBusy(project_id));
        }
        inner.target_project = Some(project_id);
        Ok(())
    }

    /// Fence a project deletion against the collector. Rejects while a run
    /// targets the project; otherwise the returned guard keeps new runs off
    /// the project until the cascade is done. Taking the decision and the
    /// fence under one lock closes the check-then-delete window.
    pub fn begin_project_delete(&self, project_id: i64) -> Result<DeleteGuard, AppError> {
        let mut inner = self.lock();
        if inner.state == RunState::Running && inner.target_project == Some(project_id) {
            return Err(AppError::ProjectBusy(project_id));
        }
        inner.deleting.insert(project_id);
        Ok(DeleteGuard {
            inner: Arc::clone(&self.inner),
            project_id,
        })
    }

    pub fn progress(&self, pages_fetched: u32, items_fetched: u32, message: String) {
        let mut inner = self.lock();
        if inner.state != RunState::Running {
            return;
        }
        inner.pages_fetched = pages_fetched;
        inner.items_fetched = items_fetched;
        inner.message = message;
    }

    pub fn finish(&self, message: String) {
        let mut inner = self.lock();
        inner.state = RunState::Idle;
        inner.message = message;
        inner.target_project = None;
        inner.cancel = None;
    }

    pub fn fail(&self, message: String) {
        let mut inner = self.lock();
        inner.state = RunState::Error;
        inner.message = message;
        inner.target_project = None;
        inner.cancel = None;
    }

    /// Target project of the active run, if any.
    #[allow(dead_code)]
    pub fn active_target(&self) -> Option<i64> {
        let inner = self.lock();
        if inner.state == RunState::Running {
            inner.target_project
        } else {
            None
        }
    }

    /// Ask the active run, if any, to stop at the next page boundary.
    pub fn cancel_active(&self) {
        if let Some(token) = &self.lock().cancel {
            token.cancel();
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.lock();
        StatusSnapshot {
            running: inner.state == RunState::Running,
            state: inner.state,
            message: inner.message.clone(),
            pages_fetched: inner.pages_fetched,
            items_fetched: inner.items_fetched,
            project_id: inner.target_project,
        }
    }
}

/// Unfences the project when the deletion finishes, success or not.
#[derive(Debug)]
pub struct DeleteGuard {
    inner: Arc<Mutex<Inner>>,
    project_id: i64,
}

impl Drop for DeleteGuard {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.deleting.remove(&self.project_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_rejects_and_keeps_first_run_untouched() {
        let tracker = StatusTracker::new();
        tracker.try_begin("rust").unwrap();
        tracker.claim_target(1).unwrap();
        tracker.progress(2, 40, "Fetched page 2".to_string());

        let err = tracker.try_begin("python").unwrap_err();
        assert!(matches!(err, AppError::AlreadyRunning));

        let snap = tracker.snapshot();
        assert!(snap.running);
        assert_eq!(snap.pages_fetched, 2);
        assert_eq!(snap.items_fetched, 40);
        assert_eq!(snap.message, "Fetched page 2");
    }

    #[test]
    fn error_state_is_terminal_until_next_begin() {
        let tracker = StatusTracker::new();
        tracker.try_begin("rust").unwrap();
        tracker.fail("Fetch failed: boom".to_string());

        let snap = tracker.snapshot();
        assert_eq!(snap.state, RunState::Error);
        assert!(!snap.running);

        // A new start clears the error
        tracker.try_begin("rust").unwrap();
        assert_eq!(tracker.snapshot().state, RunState::Running);
    }

    #[test]
    fn active_target_only_reported_while_running() {
        let tracker = StatusTracker::new();
        assert_eq!(tracker.active_target(), None);

        tracker.try_begin("rust").unwrap();
        tracker.claim_target(3).unwrap();
        assert_eq!(tracker.active_target(), Some(3));

        tracker.finish("done".to_string());
        assert_eq!(tracker.active_target(), None);
    }

    #[test]
    fn cancel_reaches_the_run_token() {
        let tracker = StatusTracker::new();
        let token = tracker.try_begin("rust").unwrap();
        assert!(!token.is_cancelled());
        tracker.cancel_active();
        assert!(token.is_cancelled());
    }

    #[test]
    fn release_returns_slot_without_a_message() {
        let tracker = StatusTracker::new();
        tracker.try_begin("rust").unwrap();
        tracker.release();
        let snap = tracker.snapshot();
        assert_eq!(snap.state, RunState::Idle);
        assert!(snap.message.is_empty());
        // Slot is usable again
        tracker.try_begin("rust").unwrap();
    }

    #[test]
    fn delete_is_rejected_while_a_run_targets_the_project() {
        let tracker = StatusTracker::new();
        tracker.try_begin("rust").unwrap();
        tracker.claim_target(2).unwrap();

        let err = tracker.begin_project_delete(2).unwrap_err();
        assert!(matches!(err, AppError::ProjectBusy(2)));

        // Other projects are unaffected
        let _guard = tracker.begin_project_delete(3).unwrap();

        tracker.finish("done".to_string());
        let _guard = tracker.begin_project_delete(2).unwrap();
    }

    #[test]
    fn claim_is_rejected_while_the_project_is_being_deleted() {
        let tracker = StatusTracker::new();
        let guard = tracker.begin_project_delete(2).unwrap();

        tracker.try_begin("rust").unwrap();
        let err = tracker.claim_target(2).unwrap_err();
        assert!(matches!(err, AppError::ProjectBusy(2)));

        drop(guard);
        tracker.claim_target(2).unwrap();
    }

    #[test]
    fn tracker_survives_a_panic_while_locked() {
        let tracker = StatusTracker::new();
        tracker.try_begin("rust").unwrap();
        tracker.finish("done".to_string());

        let inner = Arc::clone(&tracker.inner);
        let _ = std::thread::spawn(move || {
            let _held = inner.lock().unwrap();
            panic!("poison the mutex");
        })
        .join();

        let snap = tracker.snapshot();
        assert_eq!(snap.state, RunState::Idle);
        assert_eq!(snap.message, "done");
    }
}
