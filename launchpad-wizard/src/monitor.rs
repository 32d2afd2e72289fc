//! Live status subscription for one project.
//!
//! A [`Subscription`] owns the listener task and the obligation to leave
//! the channel. [`release`](Subscription::release) leaves exactly once;
//! dropping an unreleased subscription spawns the leave on the current
//! runtime instead.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use launchpad_core::{ProjectId, StatusEvent};
use launchpad_live::{LiveChannel, LiveError};

pub struct Subscription {
    project: ProjectId,
    live: Arc<dyn LiveChannel>,
    listener: Option<JoinHandle<()>>,
    left: bool,
}

impl Subscription {
    /// Start listening for `project` and hand each of its events to `sink`
    /// until `sink` returns false. Does not join; see [`join`](Self::join).
    ///
    /// The receiver is taken before this returns, so nothing sent after the
    /// join is missed.
    pub fn start<F>(live: Arc<dyn LiveChannel>, project: ProjectId, sink: F) -> Self
    where
        F: FnMut(StatusEvent) -> bool + Send + 'static,
    {
        let rx = live.events();
        let listener = tokio::spawn(listen(rx, project.clone(), sink));
        Self {
            project,
            live,
            listener: Some(listener),
            left: false,
        }
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub async fn join(&self) -> Result<(), LiveError> {
        self.live.join(&self.project).await?;
        tracing::info!(project = %self.project, "joined live channel");
        Ok(())
    }

    /// Stop listening and leave the channel.
    pub async fn release(mut self) {
        self.left = true;
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        match self.live.leave(&self.project).await {
            Ok(()) => tracing::info!(project = %self.project, "left live channel"),
            Err(err) => {
                tracing::warn!(project = %self.project, error = %err, "failed to leave live channel")
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        if self.left {
            return;
        }
        self.left = true;
        let live = self.live.clone();
        let project = self.project.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = live.leave(&project).await {
                        tracing::warn!(project = %project, error = %err, "failed to leave live channel on drop");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(project = %project, "no runtime available; live channel not left");
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("project", &self.project)
            .field("left", &self.left)
            .finish_non_exhaustive()
    }
}

async fn listen<F>(mut rx: tokio::sync::broadcast::Receiver<StatusEvent>, project: ProjectId, mut sink: F)
where
    F: FnMut(StatusEvent) -> bool,
{
    loop {
        match rx.recv().await {
            Ok(event) if event.project_id == project => {
                if !sink(event) {
                    break;
                }
            }
            Ok(event) => {
                tracing::trace!(project = %event.project_id, "ignoring status for another project");
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(project = %project, skipped, "live listener lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launchpad_core::DeploymentStatus;
    use launchpad_live::{HubCall, LocalHub};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn forwards_own_project_and_leaves_once() {
        let hub = Arc::new(LocalHub::new());
        let p1 = ProjectId::from("p1");
        let p2 = ProjectId::from("p2");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sub = Subscription::start(hub.clone(), p1.clone(), move |event| {
            tx.send(event.status).is_ok()
        });
        sub.join().await.expect("join");
        hub.join(&p2).await.expect("join other");

        hub.publish(&p2, DeploymentStatus::Building);
        hub.publish(&p1, DeploymentStatus::Uploading);
        assert_eq!(rx.recv().await, Some(DeploymentStatus::Uploading));

        sub.release().await;
        assert_eq!(hub.leave_count(&p1), 1);
        assert!(!hub.is_joined(&p1));
    }

    #[tokio::test]
    async fn drop_leaves_on_runtime() {
        let hub = Arc::new(LocalHub::new());
        let p1 = ProjectId::from("p1");
        {
            let sub = Subscription::start(hub.clone(), p1.clone(), |_| true);
            sub.join().await.expect("join");
        }
        for _ in 0..100 {
            if hub.leave_count(&p1) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(hub.calls(), vec![HubCall::Join(p1.clone()), HubCall::Leave(p1)]);
    }
}
