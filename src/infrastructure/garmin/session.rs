// Saved Garmin session and login credentials
use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = "session.json";

/// A password that never prints itself
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: Option<Password>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// Tokens within a minute of expiry are treated as expired
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + TimeDelta::minutes(1) < self.expires_at
    }
}

/// Session token persisted as JSON inside a directory
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Returns `None` when no session has been saved yet
    pub fn load(&self) -> Result<Option<SessionToken>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session file {}", path.display()))?;
        let token = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse session file {}", path.display()))?;
        Ok(Some(token))
    }

    pub fn save(&self, token: &SessionToken) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create session dir {}", self.dir.display()))?;
        let path = self.path();
        let raw = serde_json::to_string_pretty(token)?;
        std::fs::write(&path, raw)
            .with_context(|| format!("Failed to write session file {}", path.display()))?;
        restrict_to_owner(&path)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove session file {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> Result<()> {
    Ok(())
}
