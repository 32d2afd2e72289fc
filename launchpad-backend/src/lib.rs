//! # launchpad-backend
//!
//! The backend operations the deployment orchestrator consumes.
//!
//! [`Backend`] is the seam: the orchestrator only ever talks to a
//! `dyn Backend`, and every call carries an explicit [`AuthToken`]
//! rather than reading one from ambient session storage.
//! [`HttpBackend`] is the production implementation over JSON/HTTP.
//!
//! [`AuthToken`]: launchpad_core::AuthToken

pub mod api;
pub mod error;
pub mod http;
mod wire;

pub use api::{AvailabilityReply, Backend, LinkOutcome, Sitemap};
pub use error::BackendError;
pub use http::HttpBackend;
