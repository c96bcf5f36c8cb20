//! Session token storage.
//!
//! Stores the bearer credential in `<base>/session.json` under the `token` key,
//! with restricted permissions (0600). Tokens are never logged or displayed in full.
//!
//! There is at most one credential at a time. Every write replaces it wholesale;
//! expiry is not tracked here and is only discovered when the server answers 401.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::paths;

/// Session filename inside the cvopt home directory.
pub const SESSION_FILE: &str = "session.json";

/// Opaque bearer token proving an authenticated session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token for the `Authorization` header.
    pub fn bearer(&self) -> &str {
        &self.0
    }

    /// Returns a masked version of the token for display (first 12 chars + ...).
    pub fn masked(&self) -> String {
        mask_token(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

/// Returns a masked version of a token for display.
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 || !token.is_char_boundary(12) {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}

/// On-disk shape of the session file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<Credential>,
}

/// Holds the single active credential, optionally persisted to disk.
///
/// Shared via `Arc` between the API client (reads on every call, clears on
/// 401) and the auth gate (reads on every navigation).
#[derive(Debug)]
pub struct TokenStore {
    path: Option<PathBuf>,
    current: RwLock<Option<Credential>>,
}

impl TokenStore {
    /// Opens the store at the default session path.
    ///
    /// # Errors
    /// Returns an error if an existing session file cannot be read or parsed.
    pub fn open_default() -> Result<Self> {
        Self::open(paths::session_path())
    }

    /// Opens a file-backed store, loading any persisted credential.
    ///
    /// # Errors
    /// Returns an error if an existing session file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let current = load(&path)?;
        if current.is_some() {
            tracing::debug!(path = %path.display(), "restored session");
        }
        Ok(Self {
            path: Some(path),
            current: RwLock::new(current),
        })
    }

    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            current: RwLock::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the current credential, if any.
    pub fn get(&self) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replaces the current credential.
    ///
    /// The in-memory value is always updated; the error only reports a
    /// failure to persist it.
    ///
    /// # Errors
    /// Returns an error if the session file cannot be written.
    pub fn set(&self, credential: Credential) -> Result<()> {
        tracing::info!(token = %credential.masked(), "storing session credential");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        self.persist(Some(&credential))
    }

    /// Removes the current credential. Returns whether one was present.
    ///
    /// # Errors
    /// Returns an error if the session file cannot be written.
    pub fn clear(&self) -> Result<bool> {
        let had = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if had {
            tracing::info!("cleared session credential");
        }
        self.persist(None)?;
        Ok(had)
    }

    fn persist(&self, credential: Option<&Credential>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = SessionFile {
            token: credential.cloned(),
        };
        let contents =
            serde_json::to_string_pretty(&file).context("Failed to serialize session")?;
        write_private(path, &contents)
    }
}

fn load(path: &Path) -> Result<Option<Credential>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session from {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(None);
    }

    let file: SessionFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse session from {}", path.display()))?;

    Ok(file.token.filter(|c| !c.bearer().trim().is_empty()))
}

/// Writes `contents` atomically with restricted permissions (0600).
fn write_private(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("json.tmp");

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp_path)
            .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
    }

    #[cfg(not(unix))]
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
    }

    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            tmp_path.display(),
            path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_set_then_reopen_restores_credential() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SESSION_FILE);

        let store = TokenStore::open(&path).unwrap();
        assert!(store.get().is_none());
        store.set(Credential::new("tok-123")).unwrap();

        let reopened = TokenStore::open(&path).unwrap();
        assert_eq!(reopened.get(), Some(Credential::new("tok-123")));

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains(r#""token": "tok-123""#));
    }

    #[test]
    fn test_set_replaces_previous_credential() {
        let store = TokenStore::in_memory();
        store.set(Credential::new("first")).unwrap();
        store.set(Credential::new("second")).unwrap();
        assert_eq!(store.get(), Some(Credential::new("second")));
    }

    #[test]
    fn test_clear_removes_persisted_token() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SESSION_FILE);
        let store = TokenStore::open(&path).unwrap();
        store.set(Credential::new("tok-abc")).unwrap();

        assert!(store.clear().unwrap());
        assert!(!store.is_authenticated());
        assert!(!store.clear().unwrap());

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("tok-abc"));
        assert!(TokenStore::open(&path).unwrap().get().is_none());
    }

    #[test]
    fn test_blank_token_is_treated_as_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SESSION_FILE);
        fs::write(&path, r#"{"token": "  "}"#).unwrap();
        assert!(TokenStore::open(&path).unwrap().get().is_none());

        fs::write(&path, "").unwrap();
        assert!(TokenStore::open(&path).unwrap().get().is_none());
    }

    #[test]
    fn test_corrupt_session_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SESSION_FILE);
        fs::write(&path, "{not json").unwrap();
        assert!(TokenStore::open(&path).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join(SESSION_FILE);
        TokenStore::open(&path)
            .unwrap()
            .set(Credential::new("tok"))
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_debug_masks_token() {
        let credential = Credential::new("eyJhbGciOiJIUzI1NiJ9.payload.signature");
        let debug = format!("{credential:?}");
        assert!(debug.contains("eyJhbGciOiJI..."));
        assert!(!debug.contains("signature"));
        assert_eq!(mask_token("short"), "***");
    }
}
