//! OAuth client credential loading.
//!
//! The credentials file is the JSON downloaded from the Google Cloud
//! Console for an installed application: a nested `installed` object
//! carrying `client_id`, `client_secret`, `auth_uri` and `token_uri`.
//! Loading fails closed: a missing file names the expected path, invalid
//! JSON surfaces the parse error, and absent fields are listed by name.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::CredentialsError;

/// OAuth 2.0 client credentials.
///
/// Immutable for the process lifetime; re-read from disk on every
/// authorization attempt. The endpoints come from the file rather than
/// constants, so the whole flow is driven by the operator's JSON.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    /// Authorization endpoint the browser is sent to.
    pub auth_uri: String,
    /// Token endpoint used for code exchange and refresh grants.
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<InstalledSection>,
}

#[derive(Debug, Default, Deserialize)]
struct InstalledSection {
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    auth_uri: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

/// Loads [`Credentials`] from a fixed path. A plain file read, no side
/// effects.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and validates the credentials file.
    pub fn load(&self) -> Result<Credentials, CredentialsError> {
        let text = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CredentialsError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                CredentialsError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let file: CredentialsFile =
            serde_json::from_str(&text).map_err(|source| CredentialsError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        let installed = file.installed.unwrap_or_default();

        let mut missing = Vec::new();
        let client_id = required_field("client_id", installed.client_id, &mut missing);
        let client_secret = required_field("client_secret", installed.client_secret, &mut missing);
        let auth_uri = required_field("auth_uri", installed.auth_uri, &mut missing);
        let token_uri = required_field("token_uri", installed.token_uri, &mut missing);

        if !missing.is_empty() {
            return Err(CredentialsError::MissingFields {
                path: self.path.clone(),
                fields: missing,
            });
        }

        Ok(Credentials {
            client_id,
            client_secret,
            auth_uri,
            token_uri,
        })
    }
}

/// Unwraps a required field, recording its name when absent or empty.
fn required_field(
    name: &'static str,
    value: Option<String>,
    missing: &mut Vec<String>,
) -> String {
    match value {
        Some(value) if !value.is_empty() => value,
        _ => {
            missing.push(name.to_string());
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(dir: &tempfile::TempDir, contents: &str) -> CredentialStore {
        let path = dir.path().join("oauth_credentials.json");
        fs::write(&path, contents).unwrap();
        CredentialStore::new(path)
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oauth_credentials.json");
        let store = CredentialStore::new(&path);

        let err = store.load().unwrap_err();
        assert!(matches!(err, CredentialsError::NotFound { .. }));
        assert!(err.to_string().contains(path.to_str().unwrap()));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, "not json");
        assert!(matches!(
            store.load().unwrap_err(),
            CredentialsError::Malformed { .. }
        ));
    }

    #[test]
    fn missing_fields_are_listed_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(
            &dir,
            r#"{ "installed": { "client_id": "id", "auth_uri": "https://a" } }"#,
        );

        let err = store.load().unwrap_err();
        match err {
            CredentialsError::MissingFields { fields, .. } => {
                assert_eq!(fields, vec!["client_secret", "token_uri"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_field_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(
            &dir,
            r#"{ "installed": {
                "client_id": "",
                "client_secret": "s",
                "auth_uri": "https://a",
                "token_uri": "https://t"
            } }"#,
        );

        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("client_id"));
    }

    #[test]
    fn missing_installed_section_lists_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, "{}");

        match store.load().unwrap_err() {
            CredentialsError::MissingFields { fields, .. } => {
                assert_eq!(
                    fields,
                    vec!["client_id", "client_secret", "auth_uri", "token_uri"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn well_formed_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(
            &dir,
            r#"{ "installed": {
                "client_id": "test-client.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/v2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "project_id": "ignored"
            } }"#,
        );

        let credentials = store.load().unwrap();
        assert_eq!(credentials.client_id, "test-client.apps.googleusercontent.com");
        assert_eq!(credentials.token_uri, "https://oauth2.googleapis.com/token");
    }
}
