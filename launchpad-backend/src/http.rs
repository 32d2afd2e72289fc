//! [`Backend`] over JSON/HTTP.
//!
//! One pooled `reqwest::Client` per backend. Every request carries the
//! caller's bearer token; non-2xx replies become [`BackendError::Status`]
//! with whatever message the server put in the body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use launchpad_core::{
    AuthToken, DeploymentConfig, DeploymentId, DirectoryNode, DomainName, HostingCredential,
    HostingId, ManagedAssignment, ProjectId, Settings,
};

use crate::api::{AvailabilityReply, Backend, LinkOutcome, Sitemap};
use crate::error::BackendError;
use crate::wire::{
    error_message, AvailabilityDto, BuildBody, CredentialDto, CurrentHostingDto,
    DeploymentConfigDto, DomainBody, HostingBody, LinkBody, LinkReplyDto, Listing,
};

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base =
            Url::parse(api_url).map_err(|e| BackendError::InvalidUrl(format!("{api_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(api_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("launchpad/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        Self::new(
            &settings.api_url,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, token: &AuthToken) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(token.expose())
    }

    /// Send and map non-success statuses to [`BackendError::Status`].
    async fn send(&self, endpoint: &str, req: RequestBuilder) -> Result<Response, BackendError> {
        tracing::debug!(endpoint, "backend request");
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = error_message(&body);
        tracing::debug!(endpoint, status = status.as_u16(), ?message, "backend error reply");
        Err(BackendError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T, BackendError> {
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    /// Like [`decode`](Self::decode) but an empty body yields `T::default()`.
    async fn decode_or_default<T: DeserializeOwned + Default>(
        endpoint: &str,
        resp: Response,
    ) -> Result<T, BackendError> {
        let bytes = resp.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        url: Url,
        token: &AuthToken,
    ) -> Result<T, BackendError> {
        let resp = self.send(endpoint, self.request(Method::GET, url, token)).await?;
        Self::decode(endpoint, resp).await
    }

    /// GET where 404 means "no record".
    async fn get_optional<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        url: Url,
        token: &AuthToken,
    ) -> Result<Option<T>, BackendError> {
        match self.send(endpoint, self.request(Method::GET, url, token)).await {
            Ok(resp) => Ok(Some(Self::decode(endpoint, resp).await?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        url: Url,
        token: &AuthToken,
        body: &B,
    ) -> Result<Response, BackendError> {
        self.send(endpoint, self.request(method, url, token).json(body))
            .await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_hosting_credentials(
        &self,
        token: &AuthToken,
    ) -> Result<Vec<HostingCredential>, BackendError> {
        let endpoint = "GET /hosting";
        let listing: Listing<serde_json::Value> =
            self.get_json(endpoint, self.url(&["hosting"])?, token).await?;

        let mut credentials = Vec::new();
        for raw in listing.into_vec() {
            let parsed = serde_json::from_value::<CredentialDto>(raw)
                .map_err(|e| e.to_string())
                .and_then(|dto| dto.into_credential().map_err(|e| e.to_string()));
            match parsed {
                Ok(cred) => credentials.push(cred),
                Err(reason) => {
                    tracing::warn!(error = %reason, "skipping malformed hosting credential");
                }
            }
        }
        Ok(credentials)
    }

    async fn browse_directory(
        &self,
        token: &AuthToken,
        hosting: &HostingId,
        path: &str,
    ) -> Result<Vec<DirectoryNode>, BackendError> {
        let endpoint = "GET /hosting/{id}/directories";
        let mut url = self.url(&["hosting", &hosting.0, "directories"])?;
        url.query_pairs_mut().append_pair("path", path);
        let listing: Listing<DirectoryNode> = self.get_json(endpoint, url, token).await?;
        Ok(listing.into_vec())
    }

    async fn link_project_to_hosting(
        &self,
        token: &AuthToken,
        hosting: &HostingId,
        project: &ProjectId,
        domain: &DomainName,
        root_path: &str,
    ) -> Result<LinkOutcome, BackendError> {
        let endpoint = "POST /hosting/{id}/projects/{id}/link";
        let url = self.url(&["hosting", &hosting.0, "projects", &project.0, "link"])?;
        let body = LinkBody {
            domain: domain.as_str(),
            root_path,
        };
        let resp = self
            .send_json(Method::POST, endpoint, url, token, &body)
            .await?;
        let reply: LinkReplyDto = Self::decode_or_default(endpoint, resp).await?;
        Ok(LinkOutcome {
            deployment_id: reply.deployment_id.map(DeploymentId::from),
        })
    }

    async fn get_deployment_config(
        &self,
        token: &AuthToken,
        project: &ProjectId,
        hosting: Option<&HostingId>,
    ) -> Result<Option<DeploymentConfig>, BackendError> {
        let endpoint = "GET /projects/{id}/deployment-config";
        let mut url = self.url(&["projects", &project.0, "deployment-config"])?;
        if let Some(hosting) = hosting {
            url.query_pairs_mut().append_pair("hostingId", &hosting.0);
        }
        let Some(dto) = self
            .get_optional::<DeploymentConfigDto>(endpoint, url, token)
            .await?
        else {
            return Ok(None);
        };
        Ok(dto.into_config(project, hosting)?)
    }

    async fn get_current_hosting(
        &self,
        token: &AuthToken,
        project: &ProjectId,
    ) -> Result<Option<HostingId>, BackendError> {
        let endpoint = "GET /projects/{id}/hosting";
        let url = self.url(&["projects", &project.0, "hosting"])?;
        let reply = self
            .get_optional::<CurrentHostingDto>(endpoint, url, token)
            .await?;
        Ok(reply.and_then(|r| r.hosting_id).map(HostingId::from))
    }

    async fn set_current_hosting(
        &self,
        token: &AuthToken,
        project: &ProjectId,
        hosting: &HostingId,
    ) -> Result<(), BackendError> {
        let endpoint = "PUT /projects/{id}/hosting";
        let url = self.url(&["projects", &project.0, "hosting"])?;
        let body = HostingBody {
            hosting_id: &hosting.0,
        };
        self.send_json(Method::PUT, endpoint, url, token, &body)
            .await?;
        Ok(())
    }

    async fn check_domain_availability(
        &self,
        token: &AuthToken,
        domain: &DomainName,
    ) -> Result<AvailabilityReply, BackendError> {
        let endpoint = "GET /domains/availability";
        let mut url = self.url(&["domains", "availability"])?;
        url.query_pairs_mut().append_pair("domain", domain.as_str());

        let resp = self
            .request(Method::GET, url, token)
            .send()
            .await?;
        let status = resp.status();

        // Some deployments answer "taken" with 404/409 and a reason body.
        if status == StatusCode::NOT_FOUND || status == StatusCode::CONFLICT {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(domain = %domain, status = status.as_u16(), "domain reported taken");
            return Ok(AvailabilityReply {
                available: Some(false),
                reason: error_message(&body),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let dto: AvailabilityDto = Self::decode_or_default(endpoint, resp).await?;
        Ok(AvailabilityReply {
            available: dto.available,
            reason: dto.reason.or(dto.message),
        })
    }

    async fn connect_managed_domain(
        &self,
        token: &AuthToken,
        project: &ProjectId,
        domain: &DomainName,
    ) -> Result<ManagedAssignment, BackendError> {
        let endpoint = "POST /projects/{id}/managed/domain";
        let url = self.url(&["projects", &project.0, "managed", "domain"])?;
        let body = DomainBody {
            domain: domain.as_str(),
        };
        let resp = self
            .send_json(Method::POST, endpoint, url, token, &body)
            .await?;
        Self::decode(endpoint, resp).await
    }

    async fn get_managed_hosting_details(
        &self,
        token: &AuthToken,
        project: &ProjectId,
    ) -> Result<Option<ManagedAssignment>, BackendError> {
        let endpoint = "GET /projects/{id}/managed";
        let url = self.url(&["projects", &project.0, "managed"])?;
        self.get_optional(endpoint, url, token).await
    }

    async fn trigger_build_and_upload(
        &self,
        token: &AuthToken,
        deployment: &DeploymentId,
        project: &ProjectId,
    ) -> Result<(), BackendError> {
        let endpoint = "POST /deployments/{id}/build";
        let url = self.url(&["deployments", &deployment.0, "build"])?;
        let body = BuildBody {
            project_id: &project.0,
        };
        self.send_json(Method::POST, endpoint, url, token, &body)
            .await?;
        tracing::info!(deployment = %deployment, project = %project, "build triggered");
        Ok(())
    }

    async fn update_project_domain(
        &self,
        token: &AuthToken,
        domain: &DomainName,
        project: &ProjectId,
    ) -> Result<(), BackendError> {
        let endpoint = "PUT /projects/{id}/domain";
        let url = self.url(&["projects", &project.0, "domain"])?;
        let body = DomainBody {
            domain: domain.as_str(),
        };
        self.send_json(Method::PUT, endpoint, url, token, &body)
            .await?;
        Ok(())
    }

    async fn generate_sitemap(
        &self,
        token: &AuthToken,
        project: &ProjectId,
    ) -> Result<Sitemap, BackendError> {
        let endpoint = "POST /projects/{id}/sitemap";
        let url = self.url(&["projects", &project.0, "sitemap"])?;
        let resp = self
            .send(endpoint, self.request(Method::POST, url, token))
            .await?;
        Self::decode(endpoint, resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_segments_are_encoded() {
        let backend =
            HttpBackend::new("https://api.example.test/v1/", Duration::from_secs(5)).expect("new");
        let url = backend
            .url(&["projects", "a b/c", "hosting"])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.example.test/v1/projects/a%20b%2Fc/hosting"
        );
    }

    #[test]
    fn rejects_non_base_url() {
        let err = HttpBackend::new("mailto:ops@example.test", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, BackendError::InvalidUrl(_)));
    }

    #[test]
    fn rejects_garbage_url() {
        let err = HttpBackend::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, BackendError::InvalidUrl(_)));
    }
}
