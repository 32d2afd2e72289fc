//! Domain availability checks.

use std::sync::Arc;

use launchpad_backend::Backend;
use launchpad_core::{AuthToken, DomainName};

use crate::context::WizardContext;
use crate::error::WizardError;

const DEFAULT_UNAVAILABLE: &str = "domain is not available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// Taken; carries the server's reason.
    Unavailable(String),
}

pub struct DomainChecker {
    backend: Arc<dyn Backend>,
    token: AuthToken,
}

impl DomainChecker {
    pub fn new(ctx: &WizardContext) -> Self {
        Self {
            backend: ctx.backend.clone(),
            token: ctx.token.clone(),
        }
    }

    /// Normalise `raw` and ask the backend about the normalised form.
    pub async fn check(&self, raw: &str) -> Result<(DomainName, Availability), WizardError> {
        let domain = parse_domain(raw)?;
        let reply = self
            .backend
            .check_domain_availability(&self.token, &domain)
            .await?;
        let availability = match reply.available {
            Some(true) => Availability::Available,
            Some(false) => Availability::Unavailable(
                reply
                    .reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_UNAVAILABLE.to_string()),
            ),
            None => return Err(WizardError::transport("unexpected availability response")),
        };
        tracing::debug!(domain = %domain, ?availability, "checked domain availability");
        Ok((domain, availability))
    }

    /// Like [`check`](Self::check) but a taken domain is an error.
    pub async fn ensure_available(&self, raw: &str) -> Result<DomainName, WizardError> {
        match self.check(raw).await? {
            (domain, Availability::Available) => Ok(domain),
            (_, Availability::Unavailable(reason)) => Err(WizardError::Availability(reason)),
        }
    }
}

/// Normalised domain, or a validation error when nothing is left.
pub(crate) fn parse_domain(raw: &str) -> Result<DomainName, WizardError> {
    DomainName::parse(raw).map_err(|_| WizardError::validation("Please enter a domain name."))
}
