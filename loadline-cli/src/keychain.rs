// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Ambient registry credentials from the Docker client configuration.
//!
//! Looks in `$DOCKER_CONFIG/config.json`, then `~/.docker/config.json`.
//! Only inline `auths` entries are used; credential helpers are not run.
//! A registry without an entry is accessed anonymously.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use loadline_core::{LoadlineError, LoadlineResult};
use oci_client::secrets::RegistryAuth;
use serde::Deserialize;

/// Hostnames Docker Hub credentials may be stored under.
const DOCKER_HUB_ALIASES: &[&str] = &["index.docker.io", "docker.io", "registry-1.docker.io"];

#[derive(Debug, Default, Deserialize)]
struct DockerConfig {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
    #[serde(default, rename = "credsStore")]
    creds_store: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
struct AuthEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Username/password pair for one registry host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// Credentials keyed by normalized registry host.
#[derive(Debug, Default, Clone)]
pub struct Keychain {
    entries: HashMap<String, Credential>,
}

impl Keychain {
    /// Load from the default Docker config location. A missing file is an empty keychain.
    pub fn load_default() -> LoadlineResult<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_file(path: &Path) -> LoadlineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadlineError::Io {
            context: "reading docker config",
            source: e,
        })?;
        let keychain = Self::from_json(&content)?;
        tracing::debug!(
            path = %path.display(),
            registries = keychain.entries.len(),
            "Loaded registry credentials"
        );
        Ok(keychain)
    }

    pub fn from_json(content: &str) -> LoadlineResult<Self> {
        let config: DockerConfig =
            serde_json::from_str(content).map_err(|e| LoadlineError::ConfigParse {
                message: format!("docker config: {}", e),
            })?;

        if let Some(store) = &config.creds_store {
            tracing::debug!(store = %store, "Credential helpers are not consulted");
        }

        let mut entries = HashMap::new();
        for (key, entry) in config.auths {
            match decode_entry(&entry) {
                Some(credential) => {
                    entries.insert(normalize_host(&key), credential);
                }
                None => tracing::debug!(registry = %key, "Skipping auth entry without credentials"),
            }
        }
        Ok(Self { entries })
    }

    /// Credential for a registry host, following Docker Hub aliases.
    pub fn credential(&self, registry: &str) -> Option<&Credential> {
        let host = normalize_host(registry);
        if let Some(credential) = self.entries.get(&host) {
            return Some(credential);
        }
        if DOCKER_HUB_ALIASES.contains(&host.as_str()) {
            return DOCKER_HUB_ALIASES
                .iter()
                .find_map(|alias| self.entries.get(*alias));
        }
        None
    }

    /// Registry auth for a host; anonymous when nothing is stored.
    pub fn auth_for(&self, registry: &str) -> RegistryAuth {
        match self.credential(registry) {
            Some(c) => RegistryAuth::Basic(c.username.clone(), c.password.clone()),
            None => RegistryAuth::Anonymous,
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    match std::env::var_os("DOCKER_CONFIG") {
        Some(dir) => Some(PathBuf::from(dir).join("config.json")),
        None => dirs::home_dir().map(|home| home.join(".docker").join("config.json")),
    }
}

fn decode_entry(entry: &AuthEntry) -> Option<Credential> {
    if let Some(auth) = entry.auth.as_deref().filter(|a| !a.is_empty()) {
        let decoded = STANDARD.decode(auth).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        return Some(Credential {
            username: username.to_string(),
            password: password.to_string(),
        });
    }
    match (&entry.username, &entry.password) {
        (Some(username), Some(password)) => Some(Credential {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    }
}

/// `https://index.docker.io/v1/` -> `index.docker.io`.
fn normalize_host(key: &str) -> String {
    let key = key
        .strip_prefix("https://")
        .or_else(|| key.strip_prefix("http://"))
        .unwrap_or(key);
    key.split('/').next().unwrap_or(key).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // "user:s3cret"
    const CONFIG: &str = r#"{
        "auths": {
            "https://index.docker.io/v1/": { "auth": "dXNlcjpzM2NyZXQ=" },
            "registry.example.com:5000": { "username": "ci", "password": "token" },
            "helper-only.example.com": {}
        },
        "credsStore": "desktop"
    }"#;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("https://index.docker.io/v1/"), "index.docker.io");
        assert_eq!(normalize_host("Registry.Example.com:5000"), "registry.example.com:5000");
        assert_eq!(normalize_host("ghcr.io"), "ghcr.io");
    }

    #[test]
    fn test_decodes_inline_auth() {
        let keychain = Keychain::from_json(CONFIG).unwrap();
        let credential = keychain.credential("index.docker.io").unwrap();
        assert_eq!(credential.username, "user");
        assert_eq!(credential.password, "s3cret");
    }

    #[test]
    fn test_docker_hub_aliases() {
        let keychain = Keychain::from_json(CONFIG).unwrap();
        assert!(keychain.credential("docker.io").is_some());
        assert!(keychain.credential("registry-1.docker.io").is_some());
    }

    #[test]
    fn test_username_password_entry() {
        let keychain = Keychain::from_json(CONFIG).unwrap();
        let auth = keychain.auth_for("registry.example.com:5000");
        assert!(matches!(auth, RegistryAuth::Basic(ref u, ref p) if u == "ci" && p == "token"));
    }

    #[test]
    fn test_unknown_registry_is_anonymous() {
        let keychain = Keychain::from_json(CONFIG).unwrap();
        assert!(keychain.credential("helper-only.example.com").is_none());
        assert!(matches!(keychain.auth_for("localhost:5000"), RegistryAuth::Anonymous));
    }

    #[test]
    fn test_malformed_config_rejected() {
        let result = Keychain::from_json("{ not json");
        assert!(matches!(result, Err(LoadlineError::ConfigParse { .. })));
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, CONFIG).unwrap();
        let keychain = Keychain::load_file(&path).unwrap();
        assert!(keychain.credential("registry.example.com:5000").is_some());
    }
}
