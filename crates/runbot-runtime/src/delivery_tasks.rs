use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Detached webhook work that outlives the HTTP request that queued it.
///
/// Each queued task runs on its own tokio task, so a sender that disconnects
/// cannot cancel it. The tracker counts running tasks so shutdown (and tests)
/// can wait for them to drain.
#[derive(Debug, Clone)]
pub struct DeliveryTasks {
    active: Arc<watch::Sender<usize>>,
}

impl Default for DeliveryTasks {
    fn default() -> Self {
        Self::new()
    }
}

struct ActiveGuard {
    active: Arc<watch::Sender<usize>>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}

impl DeliveryTasks {
    pub fn new() -> Self {
        let (active, _) = watch::channel(0_usize);
        Self {
            active: Arc::new(active),
        }
    }

    /// Run `task` to completion in the background.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.active.send_modify(|count| *count += 1);
        let guard = ActiveGuard {
            active: Arc::clone(&self.active),
        };
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    pub fn active(&self) -> usize {
        *self.active.borrow()
    }

    /// Resolve once no queued task is running.
    pub async fn wait_idle(&self) {
        let mut active = self.active.subscribe();
        let _ = active.wait_for(|count| *count == 0).await;
    }
}
