//! API credential resolution.
//!
//! The key is looked up once at startup, in order:
//!
//! 1. `GOOGLE_API_KEY` environment variable
//! 2. `GEMINI_API_KEY` environment variable
//! 3. `GOOGLE_API_KEY` entry of a TOML secrets file (default `secrets.toml`)
//!
//! Finding none of them is fatal: the caller must stop before accepting any
//! input.

use crate::error::OcrError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variables checked, in priority order.
pub const KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Default location of the secrets file.
pub const DEFAULT_SECRETS_FILE: &str = "secrets.toml";

/// Variable read by the `edgequake-llm` Gemini provider.
const PROVIDER_ENV_VAR: &str = "GEMINI_API_KEY";

/// Where a key was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Env(&'static str),
    File(PathBuf),
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Env(var) => write!(f, "${var}"),
            KeySource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A resolved API key. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    value: String,
    source: KeySource,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> &KeySource {
        &self.source
    }

    /// Publish the key under the variable the provider factory reads.
    ///
    /// Must run before the async runtime (or any other thread) starts.
    pub fn export_for_provider(&self) {
        std::env::set_var(PROVIDER_ENV_VAR, &self.value);
    }
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(rename = "GOOGLE_API_KEY")]
    google_api_key: Option<String>,
}

/// Resolve the API key from the process environment and `secrets_path`.
pub fn resolve_api_key(secrets_path: &Path) -> Result<ApiKey, OcrError> {
    resolve_with(|var| std::env::var(var).ok(), secrets_path)
}

/// Resolution with an injectable environment lookup.
pub fn resolve_with<F>(env: F, secrets_path: &Path) -> Result<ApiKey, OcrError>
where
    F: Fn(&str) -> Option<String>,
{
    for var in KEY_ENV_VARS {
        if let Some(value) = env(var).filter(|v| !v.trim().is_empty()) {
            debug!("API key found in ${}", var);
            return Ok(ApiKey {
                value: value.trim().to_string(),
                source: KeySource::Env(var),
            });
        }
    }

    if let Some(value) = read_secrets_file(secrets_path)? {
        debug!("API key found in {}", secrets_path.display());
        return Ok(ApiKey {
            value,
            source: KeySource::File(secrets_path.to_path_buf()),
        });
    }

    Err(OcrError::MissingCredential {
        env_vars: KEY_ENV_VARS.join(" or "),
        secrets_path: secrets_path.to_path_buf(),
    })
}

/// A missing file is not an error; a malformed one is.
fn read_secrets_file(path: &Path) -> Result<Option<String>, OcrError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(OcrError::SecretsUnreadable {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
        }
    };

    let parsed: SecretsFile = toml::from_str(&raw).map_err(|e| OcrError::SecretsUnreadable {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    Ok(parsed
        .google_api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn google_key_wins_over_gemini_key() {
        let key = resolve_with(
            env_of(&[("GOOGLE_API_KEY", "g-1"), ("GEMINI_API_KEY", "g-2")]),
            Path::new("/nonexistent/secrets.toml"),
        )
        .unwrap();
        assert_eq!(key.expose(), "g-1");
        assert_eq!(key.source(), &KeySource::Env("GOOGLE_API_KEY"));
    }

    #[test]
    fn blank_env_value_is_ignored() {
        let key = resolve_with(
            env_of(&[("GOOGLE_API_KEY", "  "), ("GEMINI_API_KEY", "g-2")]),
            Path::new("/nonexistent/secrets.toml"),
        )
        .unwrap();
        assert_eq!(key.expose(), "g-2");
    }

    #[test]
    fn falls_back_to_secrets_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, "GOOGLE_API_KEY = \"from-file\"\n").unwrap();

        let key = resolve_with(env_of(&[]), &path).unwrap();
        assert_eq!(key.expose(), "from-file");
        assert_eq!(key.source(), &KeySource::File(path));
    }

    #[test]
    fn missing_everywhere_is_fatal() {
        let err = resolve_with(env_of(&[]), Path::new("/nonexistent/secrets.toml")).unwrap_err();
        assert!(matches!(err, OcrError::MissingCredential { .. }));
    }

    #[test]
    fn file_without_key_is_missing_credential() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, "OTHER = \"x\"\n").unwrap();

        let err = resolve_with(env_of(&[]), &path).unwrap_err();
        assert!(matches!(err, OcrError::MissingCredential { .. }));
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, "GOOGLE_API_KEY = ").unwrap();

        let err = resolve_with(env_of(&[]), &path).unwrap_err();
        assert!(matches!(err, OcrError::SecretsUnreadable { .. }));
    }

    #[test]
    fn debug_redacts_value() {
        let key = resolve_with(
            env_of(&[("GOOGLE_API_KEY", "super-secret")]),
            Path::new("/nonexistent/secrets.toml"),
        )
        .unwrap();
        let dbg = format!("{key:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("redacted"));
    }
}
