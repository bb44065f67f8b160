// PositionPoller: scoped handle on the position polling task
// Single Responsibility: tie the polling task's lifetime to one emitter

use tokio::task::JoinHandle;

use crate::engine::EmitterId;

/// Owns the polling task for one emitter
///
/// Dropping the poller aborts its task, so replacing or clearing the slot
/// that holds it is enough to stop polling.
pub struct PositionPoller {
    emitter: EmitterId,
    task: Option<JoinHandle<()>>,
}

impl PositionPoller {
    pub fn new(emitter: EmitterId, task: JoinHandle<()>) -> Self {
        Self {
            emitter,
            task: Some(task),
        }
    }

    /// Emitter whose position this poller publishes
    pub fn emitter(&self) -> EmitterId {
        self.emitter
    }

    /// Let go of the task without aborting it
    ///
    /// Used by the polling task itself when it observes the end of its
    /// emitter and is about to return.
    pub fn release(mut self) {
        self.task.take();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for PositionPoller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_drop_aborts_task() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let _ = tx.send(());
        });
        let poller = PositionPoller::new(EmitterId(1), task);
        assert!(!poller.is_finished());

        // Aborting drops the task's future and with it the sender
        drop(poller);
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_release_keeps_task_running() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let task = tokio::spawn(async move {
            tokio::task::yield_now().await;
            let _ = tx.send(());
        });
        PositionPoller::new(EmitterId(2), task).release();
        assert!(rx.await.is_ok());
    }
}
