//! Domain types for deployment orchestration.
//!
//! Identifiers are newtypes over the backend's opaque string ids. Connection
//! configs arrive from the backend as an untyped blob and are parsed into
//! [`ConnectionConfig`] here, at the boundary, so nothing downstream has to
//! guess at their shape.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a website project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed identifier for a saved hosting credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostingId(pub String);

impl fmt::Display for HostingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for HostingId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HostingId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed identifier for a deployment record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentId(pub String);

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DeploymentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeploymentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Bearer token passed explicitly to every backend call.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

// ---------------------------------------------------------------------------
// Domain names
// ---------------------------------------------------------------------------

/// Strip surrounding whitespace and one leading `www.` (any case).
pub fn normalize_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("www.") => &trimmed[4..],
        _ => trimmed,
    };
    stripped.trim().to_owned()
}

/// A normalised domain name: no surrounding whitespace, no leading `www.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Normalise `raw`; fails with [`CoreError::InvalidDomain`] if nothing is left.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let normalized = normalize_domain(raw);
        if normalized.is_empty() {
            return Err(CoreError::InvalidDomain(raw.trim().to_owned()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for DomainName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DomainName> for String {
    fn from(d: DomainName) -> Self {
        d.0
    }
}

// ---------------------------------------------------------------------------
// Hosting credentials
// ---------------------------------------------------------------------------

/// Declared connection type of a hosting credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Ftp,
    Cpanel,
    Ssh,
    Vps,
    /// The platform's own hosting.
    Managed,
}

impl ConnectionType {
    /// Whether the remote side can be browsed as a directory tree.
    pub fn exposes_filesystem(self) -> bool {
        matches!(self, Self::Ftp | Self::Ssh | Self::Vps)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ftp => "ftp",
            Self::Cpanel => "cpanel",
            Self::Ssh => "ssh",
            Self::Vps => "vps",
            Self::Managed => "managed",
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Self::Ftp => 21,
            Self::Cpanel => 2083,
            Self::Ssh | Self::Vps => 22,
            Self::Managed => 0,
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ftp" | "sftp" => Ok(Self::Ftp),
            "cpanel" => Ok(Self::Cpanel),
            "ssh" => Ok(Self::Ssh),
            "vps" => Ok(Self::Vps),
            "managed" => Ok(Self::Managed),
            other => Err(format!(
                "unknown connection type '{other}'; expected: ftp, cpanel, ssh, vps, managed"
            )),
        }
    }
}

/// Host/port/user triple shared by every remote connection type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtpConfig {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    /// FTPS / SFTP rather than plain FTP.
    pub secure: bool,
}

/// A validated connection config, one variant per connection type.
///
/// Secrets present in the backend blob are never retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionConfig {
    Ftp(FtpConfig),
    Cpanel(Endpoint),
    Ssh(Endpoint),
    Vps(Endpoint),
    Managed,
}

/// Loose shape of the backend blob before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConnection {
    #[serde(default)]
    host: Option<String>,
    #[serde(default, deserialize_with = "deserialize_port")]
    port: Option<u16>,
    #[serde(default, alias = "user")]
    username: Option<String>,
    #[serde(default)]
    secure: Option<bool>,
}

impl ConnectionConfig {
    /// Parse the backend's connection blob for a credential of type `kind`.
    ///
    /// `blob` may be a JSON object or a JSON-encoded string of one. Managed
    /// credentials carry no connection details, so their blob is ignored.
    pub fn parse(hosting: &HostingId, kind: ConnectionType, blob: &Value) -> Result<Self, CoreError> {
        if kind == ConnectionType::Managed {
            return Ok(Self::Managed);
        }

        let invalid = |reason: String| CoreError::InvalidConnectionConfig {
            hosting: hosting.0.clone(),
            connection_type: kind.to_string(),
            reason,
        };

        let decoded;
        let object = match blob {
            Value::String(text) if text.trim().is_empty() => {
                return Err(invalid("connection config is empty".to_string()))
            }
            Value::String(text) => {
                decoded = serde_json::from_str::<Value>(text)
                    .map_err(|e| invalid(format!("config string is not JSON: {e}")))?;
                &decoded
            }
            Value::Null => return Err(invalid("connection config is missing".to_string())),
            other => other,
        };
        if !object.is_object() {
            return Err(invalid("connection config must be a JSON object".to_string()));
        }

        let raw: RawConnection =
            serde_json::from_value(object.clone()).map_err(|e| invalid(e.to_string()))?;

        let host = raw
            .host
            .map(|h| h.trim().to_owned())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let username = raw
            .username
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| invalid("missing username".to_string()))?;
        let endpoint = Endpoint {
            host,
            port: raw.port.unwrap_or_else(|| kind.default_port()),
            username,
        };

        Ok(match kind {
            ConnectionType::Ftp => Self::Ftp(FtpConfig {
                endpoint,
                secure: raw.secure.unwrap_or(false),
            }),
            ConnectionType::Cpanel => Self::Cpanel(endpoint),
            ConnectionType::Ssh => Self::Ssh(endpoint),
            ConnectionType::Vps => Self::Vps(endpoint),
            ConnectionType::Managed => Self::Managed,
        })
    }

    pub fn connection_type(&self) -> ConnectionType {
        match self {
            Self::Ftp(_) => ConnectionType::Ftp,
            Self::Cpanel(_) => ConnectionType::Cpanel,
            Self::Ssh(_) => ConnectionType::Ssh,
            Self::Vps(_) => ConnectionType::Vps,
            Self::Managed => ConnectionType::Managed,
        }
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        match self {
            Self::Ftp(ftp) => Some(&ftp.endpoint),
            Self::Cpanel(e) | Self::Ssh(e) | Self::Vps(e) => Some(e),
            Self::Managed => None,
        }
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortRepr {
        Number(u16),
        Text(String),
    }

    match Option::<PortRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PortRepr::Number(port)) => Ok(Some(port)),
        Some(PortRepr::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(PortRepr::Text(text)) => text
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Result of the backend's last connection test for a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Success,
    #[default]
    Failed,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Success => write!(f, "success"),
            HealthStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A saved hosting credential. Read-only to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostingCredential {
    pub id: HostingId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub connection: ConnectionConfig,
    pub health: HealthStatus,
}

impl HostingCredential {
    pub fn connection_type(&self) -> ConnectionType {
        self.connection.connection_type()
    }

    pub fn exposes_filesystem(&self) -> bool {
        self.connection_type().exposes_filesystem()
    }

    /// Label if set, otherwise `user@host`, otherwise the id.
    pub fn display_name(&self) -> String {
        if let Some(label) = self.label.as_ref().filter(|l| !l.is_empty()) {
            return label.clone();
        }
        match self.connection.endpoint() {
            Some(e) => format!("{}@{}", e.username, e.host),
            None => self.id.0.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Directory listing
// ---------------------------------------------------------------------------

/// One remote directory entry, as listed by the directory browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryNode {
    pub name: String,
    pub full_path: String,
}

// ---------------------------------------------------------------------------
// Deployment records
// ---------------------------------------------------------------------------

/// The persisted association of a project, a hosting target, a domain and a
/// root path. `hosting_id` is `None` for managed hosting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosting_id: Option<HostingId>,
    pub domain_name: DomainName,
    pub root_path: String,
    pub deployment_id: DeploymentId,
}

/// Domain/root pair assigned to a project on managed hosting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedAssignment {
    pub domain: String,
    pub root_path: String,
}

/// Progress of the server-side build-and-upload pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Local sentinel before the first event arrives.
    #[default]
    Unknown,
    Pending,
    Building,
    Uploading,
    Success,
    BuildFailed,
    UploadFailed,
}

impl DeploymentStatus {
    /// Position in the pipeline. Terminal statuses share the highest rank.
    pub fn rank(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Pending => 1,
            Self::Building => 2,
            Self::Uploading => 3,
            Self::Success | Self::BuildFailed | Self::UploadFailed => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 4
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::BuildFailed | Self::UploadFailed)
    }

    /// Whether moving from `self` to `next` is a forward step.
    pub fn advances_to(self, next: DeploymentStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Pending => "pending",
            Self::Building => "building",
            Self::Uploading => "uploading",
            Self::Success => "success",
            Self::BuildFailed => "build_failed",
            Self::UploadFailed => "upload_failed",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "pending" => Ok(Self::Pending),
            "building" => Ok(Self::Building),
            "uploading" => Ok(Self::Uploading),
            "success" => Ok(Self::Success),
            "build_failed" => Ok(Self::BuildFailed),
            "upload_failed" => Ok(Self::UploadFailed),
            other => Err(format!("unknown deployment status '{other}'")),
        }
    }
}

/// A status push received on the live channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub project_id: ProjectId,
    pub status: DeploymentStatus,
    pub received_at: DateTime<Utc>,
}

impl StatusEvent {
    pub fn now(project_id: ProjectId, status: DeploymentStatus) -> Self {
        Self {
            project_id,
            status,
            received_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn newtype_display() {
        assert_eq!(ProjectId::from("p-1").to_string(), "p-1");
        assert_eq!(HostingId::from("h-1").to_string(), "h-1");
        assert_eq!(DeploymentId::from("d-1").to_string(), "d-1");
    }

    #[test]
    fn auth_token_debug_is_redacted() {
        let token = AuthToken::new("s3cret");
        assert_eq!(format!("{token:?}"), "AuthToken(***)");
        assert_eq!(token.expose(), "s3cret");
    }

    #[test]
    fn domain_parse_rejects_bare_www() {
        assert!(matches!(DomainName::parse("  www. "), Err(CoreError::InvalidDomain(_))));
    }

    #[test]
    fn domain_deserialize_normalizes() {
        let d: DomainName = serde_json::from_value(json!(" WWW.shop.io ")).expect("decode");
        assert_eq!(d.as_str(), "shop.io");
    }

    #[test]
    fn string_blob_is_decoded() {
        let blob = json!(r#"{"host":"ftp.example.com","user":"deploy","port":"2121","password":"x"}"#);
        let cfg = ConnectionConfig::parse(&HostingId::from("h"), ConnectionType::Ftp, &blob)
            .expect("parse");
        let ConnectionConfig::Ftp(ftp) = cfg else {
            panic!("expected ftp config");
        };
        assert_eq!(ftp.endpoint.host, "ftp.example.com");
        assert_eq!(ftp.endpoint.port, 2121);
        assert_eq!(ftp.endpoint.username, "deploy");
        assert!(!ftp.secure);
    }

    #[test]
    fn managed_ignores_blob() {
        let cfg = ConnectionConfig::parse(&HostingId::from("m"), ConnectionType::Managed, &Value::Null)
            .expect("parse");
        assert_eq!(cfg, ConnectionConfig::Managed);
        assert!(!cfg.connection_type().exposes_filesystem());
    }

    #[test]
    fn status_ordering() {
        assert!(DeploymentStatus::Unknown.advances_to(DeploymentStatus::Building));
        assert!(!DeploymentStatus::Uploading.advances_to(DeploymentStatus::Building));
        assert!(!DeploymentStatus::Building.advances_to(DeploymentStatus::Building));
        assert!(!DeploymentStatus::Success.advances_to(DeploymentStatus::UploadFailed));
        assert!(DeploymentStatus::BuildFailed.is_failure());
    }

    #[test]
    fn status_wire_names() {
        let encoded = serde_json::to_string(&DeploymentStatus::UploadFailed).expect("encode");
        assert_eq!(encoded, "\"upload_failed\"");
        assert_eq!("build_failed".parse::<DeploymentStatus>(), Ok(DeploymentStatus::BuildFailed));
    }
}
