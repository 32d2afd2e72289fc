//! JSON text frames exchanged on the live channel.
//!
//! ```text
//! client → server   {"type":"join","projectId":"p1"}
//!                   {"type":"leave","projectId":"p1"}
//! server → client   {"type":"status","projectId":"p1","status":"building"}
//! ```

use serde::{Deserialize, Serialize};

use launchpad_core::{DeploymentStatus, ProjectId, StatusEvent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Join {
        #[serde(rename = "projectId")]
        project_id: ProjectId,
    },
    Leave {
        #[serde(rename = "projectId")]
        project_id: ProjectId,
    },
    Status {
        #[serde(rename = "projectId")]
        project_id: ProjectId,
        status: DeploymentStatus,
    },
    /// Any frame type this client does not know.
    #[serde(other)]
    Unknown,
}

impl Frame {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Stamp a status frame with the receive time.
    pub fn into_event(self) -> Option<StatusEvent> {
        match self {
            Frame::Status { project_id, status } => Some(StatusEvent::now(project_id, status)),
            _ => None,
        }
    }
}
