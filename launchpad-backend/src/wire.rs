//! JSON shapes exchanged with the backend and their conversion into core types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use launchpad_core::{
    ConnectionConfig, ConnectionType, CoreError, DeploymentConfig, DeploymentId, DomainName,
    HealthStatus, HostingCredential, HostingId, ProjectId,
};

/// Backends serve ids as strings or integers; both become strings.
fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or integer id, got {other}"
        ))),
    }
}

fn flexible_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or integer id, got {other}"
        ))),
    }
}

/// Either a bare JSON array or `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Wrapped { data: items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CredentialDto {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(alias = "type")]
    pub connection_type: String,
    #[serde(default, alias = "config")]
    pub connection_config: Value,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "name")]
    pub label: Option<String>,
}

impl CredentialDto {
    pub(crate) fn into_credential(self) -> Result<HostingCredential, CoreError> {
        let id = HostingId::from(self.id);
        let kind: ConnectionType =
            self.connection_type
                .parse()
                .map_err(|reason| CoreError::InvalidConnectionConfig {
                    hosting: id.0.clone(),
                    connection_type: self.connection_type.clone(),
                    reason,
                })?;
        let connection = ConnectionConfig::parse(&id, kind, &self.connection_config)?;
        let health = match self.status.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("success") => HealthStatus::Success,
            _ => HealthStatus::Failed,
        };
        Ok(HostingCredential {
            id,
            label: self.label,
            connection,
            health,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeploymentConfigDto {
    #[serde(default, deserialize_with = "flexible_opt_id")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt_id")]
    pub hosting_id: Option<String>,
    #[serde(alias = "domain")]
    pub domain_name: String,
    pub root_path: String,
    #[serde(default, alias = "id", deserialize_with = "flexible_opt_id")]
    pub deployment_id: Option<String>,
}

impl DeploymentConfigDto {
    /// `None` when the record carries no deployment id (treated as absent).
    pub(crate) fn into_config(
        self,
        project: &ProjectId,
        hosting: Option<&HostingId>,
    ) -> Result<Option<DeploymentConfig>, CoreError> {
        let Some(deployment_id) = self.deployment_id else {
            return Ok(None);
        };
        Ok(Some(DeploymentConfig {
            project_id: self
                .project_id
                .map(ProjectId::from)
                .unwrap_or_else(|| project.clone()),
            hosting_id: self.hosting_id.map(HostingId::from).or_else(|| hosting.cloned()),
            domain_name: DomainName::parse(&self.domain_name)?,
            root_path: self.root_path,
            deployment_id: DeploymentId::from(deployment_id),
        }))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LinkReplyDto {
    #[serde(default, alias = "id", deserialize_with = "flexible_opt_id")]
    pub deployment_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CurrentHostingDto {
    #[serde(default, deserialize_with = "flexible_opt_id")]
    pub hosting_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AvailabilityDto {
    #[serde(default)]
    pub available: Option<bool>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LinkBody<'a> {
    pub domain: &'a str,
    pub root_path: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HostingBody<'a> {
    pub hosting_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct DomainBody<'a> {
    pub domain: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BuildBody<'a> {
    pub project_id: &'a str,
}

/// Pull a human-readable message out of an error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ["message", "error", "reason"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_owned),
        Ok(_) => None,
        Err(_) if trimmed.len() <= 200 => Some(trimmed.to_owned()),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credential_with_numeric_id_and_string_blob() {
        let dto: CredentialDto = serde_json::from_value(json!({
            "id": 7,
            "type": "ftp",
            "config": "{\"host\":\"ftp.example.test\",\"username\":\"deploy\"}",
            "status": "success",
            "name": "Shared host"
        }))
        .expect("decode");
        let cred = dto.into_credential().expect("valid");
        assert_eq!(cred.id.0, "7");
        assert_eq!(cred.connection_type(), ConnectionType::Ftp);
        assert_eq!(cred.health, HealthStatus::Success);
        assert_eq!(cred.display_name(), "Shared host");
    }

    #[test]
    fn credential_with_unknown_type_is_rejected() {
        let dto: CredentialDto = serde_json::from_value(json!({
            "id": "x",
            "connectionType": "gopher",
            "connectionConfig": {}
        }))
        .expect("decode");
        assert!(matches!(
            dto.into_credential(),
            Err(CoreError::InvalidConnectionConfig { .. })
        ));
    }

    #[test]
    fn config_without_deployment_id_is_absent() {
        let dto: DeploymentConfigDto = serde_json::from_value(json!({
            "domainName": "example.com",
            "rootPath": "/public_html"
        }))
        .expect("decode");
        let cfg = dto
            .into_config(&ProjectId::from("p"), Some(&HostingId::from("h")))
            .expect("valid");
        assert!(cfg.is_none());
    }

    #[test]
    fn config_fills_ids_from_request() {
        let dto: DeploymentConfigDto = serde_json::from_value(json!({
            "domain": "www.example.com",
            "rootPath": "/public_html",
            "id": 99
        }))
        .expect("decode");
        let cfg = dto
            .into_config(&ProjectId::from("p"), Some(&HostingId::from("h")))
            .expect("valid")
            .expect("present");
        assert_eq!(cfg.project_id.0, "p");
        assert_eq!(cfg.hosting_id, Some(HostingId::from("h")));
        assert_eq!(cfg.domain_name.as_str(), "example.com");
        assert_eq!(cfg.deployment_id.0, "99");
    }

    #[test]
    fn error_message_prefers_message_field() {
        assert_eq!(
            error_message(r#"{"error":"bad","message":"token expired"}"#).as_deref(),
            Some("token expired")
        );
        assert_eq!(error_message(r#"{"error":"bad"}"#).as_deref(), Some("bad"));
        assert_eq!(error_message("plain text").as_deref(), Some("plain text"));
        assert_eq!(error_message("  ").as_deref(), None);
    }
}
