//! Bugtrail repository configuration (`.bugtrail/config.toml`).
//!
//! ```toml
//! [user]
//! name = "Ada Lovelace"
//! email = "ada@example.com"
//!
//! [sync]
//! remote = "upstream"
//! ```
//!
//! Every section is optional. A missing file yields the defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use bugtrail_git::GitRepo;
use serde::Deserialize;

use crate::operation::Person;

/// Directory holding bugtrail's files inside a repository.
pub const CONFIG_DIR: &str = ".bugtrail";

/// Name of the configuration file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level bugtrail configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BugtrailConfig {
    /// Author identity for new operations.
    #[serde(default)]
    pub user: UserConfig,

    /// Remote synchronization settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Author identity. Unset fields fall back to git's `user.*` settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Remote merged by `bugtrail merge` when none is given (default: `"origin"`).
    #[serde(default = "default_remote")]
    pub remote: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
        }
    }
}

fn default_remote() -> String {
    "origin".to_owned()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error loading a bugtrail configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The file being loaded, when there is one.
    pub path: Option<PathBuf>,
    /// What went wrong, with the line number when known.
    pub detail: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(p) => write!(f, "{}: {}", p.display(), self.detail),
            None => write!(f, "config error: {}", self.detail),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl BugtrailConfig {
    /// Path of the configuration file for the repository at `root`.
    #[must_use]
    pub fn path(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load `<root>/.bugtrail/config.toml`, or the defaults if it is absent.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse
    /// errors.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(root);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path),
                    detail: format!("could not read file: {e}"),
                });
            }
        };
        Self::from_toml(&contents).map_err(|mut e| {
            e.path = Some(path);
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut detail = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                detail = format!("line {line}: {detail}");
            }
            ConfigError { path: None, detail }
        })
    }

    /// The identity to author new operations with.
    ///
    /// Configured values win; anything unset is read from git's
    /// `user.name`/`user.email`. Returns `None` if no name is available.
    #[must_use]
    pub fn author(&self, repo: &dyn GitRepo) -> Option<Person> {
        let from_git = |key: &str| match repo.read_config(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "could not read git config");
                None
            }
        };

        let name = self
            .user
            .name
            .clone()
            .or_else(|| from_git("user.name"))
            .filter(|n| !n.trim().is_empty())?;
        let email = self
            .user
            .email
            .clone()
            .or_else(|| from_git("user.email"))
            .unwrap_or_default();
        Some(Person { name, email })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
