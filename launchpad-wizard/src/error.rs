//! Error types for launchpad-wizard.

use thiserror::Error;

use launchpad_backend::BackendError;
use launchpad_live::LiveError;

use crate::state::StepKind;

const GENERIC_TRANSPORT: &str = "The deployment service could not be reached. Please try again.";
const GENERIC_RESOLUTION: &str =
    "Could not determine a deployment for this project. Please check the configuration and try again.";

/// Everything an orchestrator operation can fail with.
///
/// Every variant is recoverable: the wizard stays in a step the user can
/// act on again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    /// Missing or malformed user input.
    #[error("{0}")]
    Validation(String),

    /// The domain is taken; carries the server's reason.
    #[error("{0}")]
    Availability(String),

    /// A backend or live-channel call failed. `message` is what the server
    /// said, if anything; `detail` is the full error for logs.
    #[error("{detail}")]
    Transport {
        message: Option<String>,
        detail: String,
    },

    /// No deployment id could be obtained after linking.
    #[error("no deployment id available after linking")]
    Resolution,

    /// The operation is not valid from the current step.
    #[error("cannot do that from step {actual} (expected {expected})")]
    InvalidStep { expected: StepKind, actual: StepKind },
}

impl WizardError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Transport failure with no server-supplied message.
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            message: None,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> NoticeKind {
        match self {
            Self::Validation(_) | Self::InvalidStep { .. } => NoticeKind::Validation,
            Self::Availability(_) => NoticeKind::Availability,
            Self::Transport { .. } => NoticeKind::Transport,
            Self::Resolution => NoticeKind::Resolution,
        }
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Availability(msg) => msg.clone(),
            Self::Transport { message, .. } => message
                .clone()
                .unwrap_or_else(|| GENERIC_TRANSPORT.to_string()),
            Self::Resolution => GENERIC_RESOLUTION.to_string(),
            Self::InvalidStep { expected, .. } => {
                format!("This action is only available on the {expected} step.")
            }
        }
    }

    pub fn notice(&self) -> Notice {
        Notice {
            kind: self.kind(),
            message: self.user_message(),
        }
    }
}

impl From<BackendError> for WizardError {
    fn from(err: BackendError) -> Self {
        Self::Transport {
            message: err.server_message().map(str::to_owned),
            detail: err.to_string(),
        }
    }
}

impl From<LiveError> for WizardError {
    fn from(err: LiveError) -> Self {
        let message = match &err {
            LiveError::Rejected(reason) => Some(reason.clone()),
            _ => None,
        };
        Self::Transport {
            message,
            detail: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Validation,
    Availability,
    Transport,
    Resolution,
}

/// The last error of the current step, kept for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_prefers_server_message() {
        let err = WizardError::from(BackendError::Status {
            endpoint: "PUT /projects/{id}/hosting".to_string(),
            status: 403,
            message: Some("You do not own this project".to_string()),
        });
        assert_eq!(err.user_message(), "You do not own this project");
        assert!(err.to_string().contains("HTTP 403"));
        assert_eq!(err.kind(), NoticeKind::Transport);
    }

    #[test]
    fn transport_falls_back_to_generic_text() {
        let err = WizardError::transport("connection refused");
        assert_eq!(err.user_message(), GENERIC_TRANSPORT);
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn invalid_step_is_a_validation_notice() {
        let err = WizardError::InvalidStep {
            expected: StepKind::Configure,
            actual: StepKind::SelectMethod,
        };
        let notice = err.notice();
        assert_eq!(notice.kind, NoticeKind::Validation);
        assert!(notice.message.contains("configure"));
    }
}
