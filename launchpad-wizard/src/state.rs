//! Wizard steps and the view handed to presentation.

use std::fmt;

use launchpad_core::{
    DeploymentConfig, DeploymentId, DeploymentStatus, HostingCredential, HostingId,
};

use crate::directory::Navigator;
use crate::error::Notice;

/// Outcome of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Dropped: another transition was in flight, or the wizard moved on
    /// (closed, reopened, navigated back) before the response arrived.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    SelectMethod,
    DomainEntry,
    SelectHosting,
    Configure,
    Monitoring,
}

impl StepKind {
    /// Depth in the flow; both branches share depths.
    pub fn depth(self) -> u8 {
        match self {
            Self::SelectMethod => 0,
            Self::DomainEntry | Self::SelectHosting => 1,
            Self::Configure => 2,
            Self::Monitoring => 3,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SelectMethod => "select method",
            Self::DomainEntry => "domain entry",
            Self::SelectHosting => "select hosting",
            Self::Configure => "configure",
            Self::Monitoring => "monitoring",
        })
    }
}

/// Where the project is going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Platform hosting. `linked` is a `managed` credential, the only kind a
    /// managed deployment is linked through. `display` is shown to the user
    /// and never linked against.
    Managed {
        linked: Option<HostingCredential>,
        display: Option<HostingCredential>,
    },
    /// A user credential. `navigator` exists only for browsable types.
    Own {
        credential: HostingCredential,
        navigator: Option<Navigator>,
    },
}

impl Target {
    /// The credential deployments are linked against.
    pub fn credential(&self) -> Option<&HostingCredential> {
        match self {
            Target::Managed { linked, .. } => linked.as_ref(),
            Target::Own { credential, .. } => Some(credential),
        }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, Target::Managed { .. })
    }

    pub fn navigator(&self) -> Option<&Navigator> {
        match self {
            Target::Own { navigator, .. } => navigator.as_ref(),
            Target::Managed { .. } => None,
        }
    }

    pub(crate) fn navigator_mut(&mut self) -> Option<&mut Navigator> {
        match self {
            Target::Own { navigator, .. } => navigator.as_mut(),
            Target::Managed { .. } => None,
        }
    }
}

/// Editable fields of the configure step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetForm {
    pub domain: String,
    pub root_path: String,
    pub deployment_id: Option<DeploymentId>,
}

impl TargetForm {
    pub(crate) fn from_config(config: &DeploymentConfig) -> Self {
        Self {
            domain: config.domain_name.to_string(),
            root_path: config.root_path.clone(),
            deployment_id: Some(config.deployment_id.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    SelectMethod,
    /// Managed branch; `domain` is the text as last typed.
    DomainEntry { domain: String },
    SelectHosting { credentials: Vec<HostingCredential> },
    Configure { target: Target, form: TargetForm },
    Monitoring {
        target: Target,
        form: TargetForm,
        status: DeploymentStatus,
    },
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::SelectMethod => StepKind::SelectMethod,
            Step::DomainEntry { .. } => StepKind::DomainEntry,
            Step::SelectHosting { .. } => StepKind::SelectHosting,
            Step::Configure { .. } => StepKind::Configure,
            Step::Monitoring { .. } => StepKind::Monitoring,
        }
    }

    pub fn target(&self) -> Option<&Target> {
        match self {
            Step::Configure { target, .. } | Step::Monitoring { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn form(&self) -> Option<&TargetForm> {
        match self {
            Step::Configure { form, .. } | Step::Monitoring { form, .. } => Some(form),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<DeploymentStatus> {
        match self {
            Step::Monitoring { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A prior deployment found when the wizard opened. Prefill only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeHint {
    pub hosting_id: HostingId,
    pub config: DeploymentConfig,
}

/// A point-in-time copy of the wizard for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub step: Step,
    /// A transition is in flight.
    pub busy: bool,
    /// A directory listing is in flight.
    pub browsing: bool,
    pub notice: Option<Notice>,
    pub resume: Option<ResumeHint>,
}

impl Snapshot {
    pub fn kind(&self) -> StepKind {
        self.step.kind()
    }

    pub fn form(&self) -> Option<&TargetForm> {
        self.step.form()
    }

    pub fn navigator(&self) -> Option<&Navigator> {
        self.step.target().and_then(Target::navigator)
    }

    pub fn status(&self) -> Option<DeploymentStatus> {
        self.step.status()
    }
}
