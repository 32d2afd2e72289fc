use async_trait::async_trait;
use tokio::sync::broadcast;

use launchpad_core::{ProjectId, StatusEvent};

use crate::error::LiveError;

/// A channel that pushes [`StatusEvent`]s for projects the caller has joined.
///
/// Events for every joined project share one broadcast stream; consumers
/// filter by `project_id`. Delivery is at-least-once, so the same status may
/// arrive more than once.
#[async_trait]
pub trait LiveChannel: Send + Sync {
    async fn join(&self, project: &ProjectId) -> Result<(), LiveError>;

    async fn leave(&self, project: &ProjectId) -> Result<(), LiveError>;

    /// A fresh receiver. Only events sent after this call are observed.
    fn events(&self) -> broadcast::Receiver<StatusEvent>;
}
