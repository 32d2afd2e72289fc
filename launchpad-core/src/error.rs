//! Error types for launchpad-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from settings persistence and boundary parsing.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`, so `~/.launchpad/` cannot be located.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The settings file did not exist at the expected path.
    #[error("settings not found at {path}; run `launchpad config init` first")]
    SettingsNotFound { path: PathBuf },

    /// A hosting credential carried a connection config that does not match its type.
    #[error("invalid {connection_type} connection config for hosting {hosting}: {reason}")]
    InvalidConnectionConfig {
        hosting: String,
        connection_type: String,
        reason: String,
    },

    /// A domain was empty once `www.` and whitespace were stripped.
    #[error("invalid domain '{0}'")]
    InvalidDomain(String),
}
