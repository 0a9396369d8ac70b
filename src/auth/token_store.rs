use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::TokenStoreError;

/// Seconds of slack when deciding whether a token is still usable.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Access/refresh token bundle persisted in token.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_epoch: Option<i64>, // epoch seconds
}

impl TokenRecord {
    /// True when the token carries an expiry and it is at (or near) `now_epoch`.
    pub fn is_expired(&self, now_epoch: i64) -> bool {
        match self.expires_at_epoch {
            Some(exp) => now_epoch + EXPIRY_SKEW_SECS >= exp,
            None => false,
        }
    }
}

pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored token. A missing or unparsable file is `NotFound`.
    pub fn load(&self) -> Result<TokenRecord, TokenStoreError> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TokenStoreError::NotFound(self.path.clone()));
            }
            Err(source) => {
                return Err(TokenStoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&s).map_err(|e| {
            log::warn!("ignoring malformed token file {}: {e}", self.path.display());
            TokenStoreError::NotFound(self.path.clone())
        })
    }

    /// Replace the stored token. The file is readable by the owner only.
    pub fn save(&self, token: &TokenRecord) -> Result<(), TokenStoreError> {
        let data = serde_json::to_string_pretty(token)?;
        let io_err = |source: std::io::Error| TokenStoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut f = open_private(&self.path).map_err(io_err)?;
        f.write_all(data.as_bytes()).map_err(io_err)?;
        f.flush().map_err(io_err)?;
        log::info!("saved token to {}", self.path.display());
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let f = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation
    f.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(f)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
