use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// At most one run per process: a single-permit semaphore.
#[derive(Debug, Clone)]
pub struct RunSlot {
    permits: Arc<Semaphore>,
}

impl Default for RunSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSlot {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Returns `None` if a run already holds the slot.
    pub fn try_acquire(&self) -> Option<RunGuard> {
        self.permits
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| RunGuard { _permit: permit })
    }

    pub fn is_busy(&self) -> bool {
        self.permits.available_permits() == 0
    }
}

/// Holds the permit for the lifetime of a run task. Dropping it, including
/// during a panic unwind, frees the slot.
#[derive(Debug)]
pub struct RunGuard {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let slot = RunSlot::new();
        let guard = slot.try_acquire().unwrap();
        assert!(slot.is_busy());
        assert!(slot.try_acquire().is_none());

        drop(guard);
        assert!(!slot.is_busy());
        assert!(slot.try_acquire().is_some());
    }

    #[test]
    fn test_clones_share_the_slot() {
        let slot = RunSlot::new();
        let other = slot.clone();
        let _guard = slot.try_acquire().unwrap();
        assert!(other.is_busy());
        assert!(other.try_acquire().is_none());
    }

    #[tokio::test]
    async fn test_guard_moved_into_task_is_released_when_task_ends() {
        let slot = RunSlot::new();
        let guard = slot.try_acquire().unwrap();

        let task = tokio::spawn(async move {
            let _guard = guard;
            panic!("run blew up");
        });
        assert!(task.await.is_err());
        assert!(!slot.is_busy());
    }
}
