//! Token persistence and validity.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Milliseconds since the Unix epoch, from the wall clock.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Lifetime assumed when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// A persisted OAuth token record.
///
/// This is both the wire shape of the provider's token responses and the
/// on-disk format; `expiry_date` is stamped locally after every grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Absolute expiry in milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

impl Token {
    /// A token is valid iff its expiry is known and strictly in the
    /// future. A token expiring exactly now is expired.
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry > now_ms)
    }

    /// Stamps `expiry_date` from `expires_in`, defaulting to one hour.
    pub fn stamp_expiry(&mut self, now_ms: i64) {
        let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        self.expiry_date = Some(now_ms + expires_in * 1000);
    }
}

/// The subset of a token presented on API requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken {
    pub access_token: String,
    pub token_type: String,
    pub scope: String,
}

/// File-backed token persistence.
///
/// Saving overwrites the whole record, pretty-printed for operability.
/// A write failure is logged and swallowed: the caller already holds the
/// token in memory and the flow must not die over a disk hiccup. Loading
/// soft-fails to `None` on a missing or unreadable file.
#[derive(Debug, Clone)]
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

    /// Reads the persisted token, if any.
    pub fn load(&self) -> Option<Token> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "no persisted token");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(token) => Some(token),
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "persisted token is unreadable");
                None
            }
        }
    }

    /// Persists the token, logging instead of failing on error.
    pub fn save(&self, token: &Token) {
        if let Err(err) = self.try_save(token) {
            error!(path = %self.path.display(), error = %err, "failed to save token");
        }
    }

    fn try_save(&self, token: &Token) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(token).map_err(std::io::Error::other)?;
        fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expiry_date: Option<i64>) -> Token {
        Token {
            access_token: "at".into(),
            refresh_token: None,
            token_type: "Bearer".into(),
            scope: None,
            expiry_date,
            expires_in: None,
        }
    }

    #[test]
    fn expiry_strictly_in_the_future_is_valid() {
        assert!(token(Some(1001)).is_valid_at(1000));
    }

    #[test]
    fn expiry_exactly_now_is_expired() {
        assert!(!token(Some(1000)).is_valid_at(1000));
    }

    #[test]
    fn missing_expiry_is_never_valid() {
        assert!(!token(None).is_valid_at(0));
        assert!(!token(None).is_valid_at(i64::MIN));
    }

    #[test]
    fn stamp_expiry_defaults_to_one_hour() {
        let mut t = token(None);
        t.stamp_expiry(10_000);
        assert_eq!(t.expiry_date, Some(10_000 + 3600 * 1000));
    }

    #[test]
    fn stamp_expiry_uses_expires_in() {
        let mut t = token(None);
        t.expires_in = Some(120);
        t.stamp_expiry(0);
        assert_eq!(t.expiry_date, Some(120_000));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));

        let mut t = token(Some(123));
        t.refresh_token = Some("rt".into());
        t.scope = Some("cal".into());
        store.save(&t);

        let loaded = store.load().unwrap();
        assert_eq!(loaded, t);

        // Pretty-printed on disk.
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains('\n'));
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("credentials").join("token.json"));
        store.save(&token(Some(1)));
        assert!(store.load().is_some());
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn load_garbage_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(TokenStore::new(path).load().is_none());
    }

    #[test]
    fn save_failure_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        // Parent "directory" is a regular file, so the write must fail.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let store = TokenStore::new(blocker.join("token.json"));
        store.save(&token(Some(1)));
        assert!(store.load().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&token(Some(1)));

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
