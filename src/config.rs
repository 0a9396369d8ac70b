use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/";

const LOCAL_SETTINGS_FILE: &str = "gmail_tool.toml";

/// Runtime settings. Every key is optional in the TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub scopes: Vec<String>,
    pub api_base_url: String,
    pub user_id: String,
    pub redirect_uri: Option<String>,
    pub callback_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub open_browser: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            scopes: vec![GMAIL_READONLY_SCOPE.to_string()],
            api_base_url: DEFAULT_API_BASE.to_string(),
            user_id: "me".to_string(),
            redirect_uri: None,
            callback_timeout_secs: 300,
            request_timeout_secs: 30,
            open_browser: true,
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gmail_tool"))
}

/// Candidate settings files, checked in order.
fn default_locations() -> Vec<PathBuf> {
    let mut out = vec![PathBuf::from(LOCAL_SETTINGS_FILE)];
    if let Some(dir) = config_dir() {
        out.push(dir.join("config.toml"));
    }
    out
}

impl Settings {
    /// Load settings from `explicit`, or from the first default location that exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        for path in default_locations() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        log::debug!("no settings file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = toml::from_str(&s).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        log::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// OAuth client configuration as downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(rename = "auth_uri")]
    pub auth_url: String,
    #[serde(rename = "token_uri")]
    pub token_url: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Deserialize)]
struct CredentialsFile {
    installed: Option<Credentials>,
    web: Option<Credentials>,
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&s).map_err(|message| ConfigError::Malformed {
            path: path.to_path_buf(),
            message,
        })
    }

    fn parse(s: &str) -> Result<Self, String> {
        let file: CredentialsFile = serde_json::from_str(s).map_err(|e| e.to_string())?;
        file.installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" client section".to_string())
    }

    /// Redirect URI to use: the override, else the first registered URI.
    pub fn redirect_uri(&self, override_uri: Option<&str>) -> String {
        override_uri
            .map(str::to_string)
            .or_else(|| self.redirect_uris.first().cloned())
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string())
    }
}
