//! Per-user settings file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.launchpad/
//!   config.yaml   (mode 0600, holds the API token)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::AuthToken;

/// Environment variable that overrides the stored token.
pub const TOKEN_ENV: &str = "LAUNCHPAD_TOKEN";

/// Web-root folder used when a hosting target cannot be browsed.
pub const DEFAULT_WEB_ROOT: &str = "public_html";

const SETTINGS_VERSION: u32 = 1;

/// Contents of `~/.launchpad/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub version: u32,
    /// Base URL of the backend REST API.
    pub api_url: String,
    /// Websocket URL of the live status channel.
    pub live_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_web_root")]
    pub default_web_root: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_web_root() -> String {
    DEFAULT_WEB_ROOT.to_string()
}

impl Settings {
    pub fn new(api_url: impl Into<String>, live_url: impl Into<String>) -> Self {
        Self {
            version: SETTINGS_VERSION,
            api_url: api_url.into(),
            live_url: live_url.into(),
            token: None,
            request_timeout_secs: default_timeout(),
            default_web_root: default_web_root(),
        }
    }

    /// `$LAUNCHPAD_TOKEN` if set and non-empty, otherwise the stored token.
    pub fn resolve_token(&self) -> Option<AuthToken> {
        let from_env = std::env::var(TOKEN_ENV).ok();
        self.resolve_token_with(from_env.as_deref())
    }

    fn resolve_token_with(&self, from_env: Option<&str>) -> Option<AuthToken> {
        from_env
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(AuthToken::new)
            .or_else(|| {
                self.token
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(AuthToken::new)
            })
    }

    /// Root path used for targets without a browsable filesystem.
    pub fn default_root_path(&self) -> String {
        format!("/{}", self.default_web_root.trim_matches('/'))
    }
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.launchpad/`. Pure, no I/O.
pub fn launchpad_dir_at(home: &Path) -> PathBuf {
    home.join(".launchpad")
}

/// `<home>/.launchpad/config.yaml`. Pure, no I/O.
pub fn settings_path_at(home: &Path) -> PathBuf {
    launchpad_dir_at(home).join("config.yaml")
}

/// `settings_path_at` convenience wrapper.
pub fn settings_path() -> Result<PathBuf, CoreError> {
    Ok(settings_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load `<home>/.launchpad/config.yaml`.
///
/// Returns `CoreError::SettingsNotFound` if absent,
/// `CoreError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Settings, CoreError> {
    let path = settings_path_at(home);
    if !path.exists() {
        return Err(CoreError::SettingsNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, CoreError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save settings to `<home>/.launchpad/config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, settings: &Settings) -> Result<(), CoreError> {
    let dir = launchpad_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = settings_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(settings)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(settings: &Settings) -> Result<(), CoreError> {
    save_at(&home()?, settings)
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Write a fresh settings file, replacing any existing one.
pub fn init_at(
    home: &Path,
    api_url: &str,
    live_url: &str,
    token: Option<String>,
) -> Result<Settings, CoreError> {
    let mut settings = Settings::new(api_url.trim_end_matches('/'), live_url);
    settings.token = token.filter(|t| !t.trim().is_empty());
    save_at(home, &settings)?;
    Ok(settings)
}

/// `init_at` convenience wrapper.
pub fn init(api_url: &str, live_url: &str, token: Option<String>) -> Result<Settings, CoreError> {
    init_at(&home()?, api_url, live_url, token)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
