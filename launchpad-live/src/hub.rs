//! In-process live channel.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use launchpad_core::{DeploymentStatus, ProjectId, StatusEvent};

use crate::channel::LiveChannel;
use crate::error::LiveError;

const EVENT_BUFFER: usize = 64;

/// A join or leave observed by the hub, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubCall {
    Join(ProjectId),
    Leave(ProjectId),
}

/// A [`LiveChannel`] that lives entirely in memory.
///
/// [`publish`](Self::publish) plays the server: it delivers a status to
/// subscribers if the project is currently joined. Every join and leave is
/// recorded so callers can assert on subscription lifetimes.
#[derive(Debug)]
pub struct LocalHub {
    events: broadcast::Sender<StatusEvent>,
    joined: Mutex<HashSet<ProjectId>>,
    calls: Mutex<Vec<HubCall>>,
    reject_joins: Mutex<Option<String>>,
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHub {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            events,
            joined: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            reject_joins: Mutex::new(None),
        }
    }

    /// Deliver `status` for `project`. Returns false if nobody joined it.
    pub fn publish(&self, project: &ProjectId, status: DeploymentStatus) -> bool {
        if !self.joined.lock().contains(project) {
            tracing::debug!(project = %project, %status, "dropping status for unjoined project");
            return false;
        }
        // No receivers is fine; the event is simply unobserved.
        let _ = self.events.send(StatusEvent::now(project.clone(), status));
        true
    }

    pub fn is_joined(&self, project: &ProjectId) -> bool {
        self.joined.lock().contains(project)
    }

    pub fn calls(&self) -> Vec<HubCall> {
        self.calls.lock().clone()
    }

    pub fn leave_count(&self, project: &ProjectId) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, HubCall::Leave(p) if p == project))
            .count()
    }

    /// Make subsequent joins fail with `reason` (`None` restores success).
    pub fn reject_joins(&self, reason: Option<&str>) {
        *self.reject_joins.lock() = reason.map(str::to_owned);
    }
}

#[async_trait]
impl LiveChannel for LocalHub {
    async fn join(&self, project: &ProjectId) -> Result<(), LiveError> {
        self.calls.lock().push(HubCall::Join(project.clone()));
        if let Some(reason) = self.reject_joins.lock().clone() {
            return Err(LiveError::Rejected(reason));
        }
        self.joined.lock().insert(project.clone());
        Ok(())
    }

    async fn leave(&self, project: &ProjectId) -> Result<(), LiveError> {
        self.calls.lock().push(HubCall::Leave(project.clone()));
        self.joined.lock().remove(project);
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }
}
