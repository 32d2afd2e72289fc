//! # launchpad-wizard
//!
//! The deployment orchestrator and the collaborators it drives.
//!
//! [`Wizard`] walks one project through method selection, hosting or domain
//! setup, configuration, and live monitoring of the build-and-upload
//! pipeline. It is the only component that remembers where the user is;
//! everything it talks to is reached through a [`WizardContext`].

pub mod context;
pub mod directory;
pub mod domain;
pub mod error;
pub mod monitor;
pub mod orchestrator;
pub mod resolver;
pub mod state;

pub use context::WizardContext;
pub use directory::{BrowseTicket, DirectoryBrowser, Navigator};
pub use domain::{Availability, DomainChecker};
pub use error::{Notice, NoticeKind, WizardError};
pub use monitor::Subscription;
pub use orchestrator::Wizard;
pub use resolver::{
    managed_credential, managed_display_credential, ConfigResolver, CredentialDirectory,
    ManagedHostingResolver,
};
pub use state::{ResumeHint, Snapshot, Step, StepKind, Target, TargetForm, Transition};
