//! Vault configuration.
//!
//! # Responsibility
//! - Load vault settings from TOML with a default for every key.
//! - Resolve the storage backend, including the runtime platform check.
//!
//! # Invariants
//! - `root_segment` is a single non-blank path segment.
//! - `log_dir`, when set, is absolute.

use crate::hierarchy::ReconstructMode;
use crate::logging::default_log_level;
use crate::store::BackendKind;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_ROOT_SEGMENT: &str = "nexusnote";
pub const DEFAULT_DB_FILE: &str = "nexusnote.sqlite3";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Requested backend; `Auto` defers to the platform check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendSelection {
    #[default]
    Auto,
    Flat,
    Hierarchical,
}

impl BackendSelection {
    pub fn resolve(self) -> BackendKind {
        match self {
            Self::Auto => platform_backend(std::env::consts::OS),
            Self::Flat => BackendKind::Flat,
            Self::Hierarchical => BackendKind::Hierarchical,
        }
    }
}

/// Mobile platforms get native files; everything else the record store.
pub fn platform_backend(os: &str) -> BackendKind {
    match os {
        "android" | "ios" => BackendKind::Hierarchical,
        _ => BackendKind::Flat,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    pub vault_name: String,
    pub root_segment: String,
    pub backend: BackendSelection,
    pub data_dir: PathBuf,
    pub db_file: String,
    pub nested_folders: bool,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            vault_name: DEFAULT_ROOT_SEGMENT.to_string(),
            root_segment: DEFAULT_ROOT_SEGMENT.to_string(),
            backend: BackendSelection::Auto,
            data_dir: PathBuf::from("."),
            db_file: DEFAULT_DB_FILE.to_string(),
            nested_folders: false,
            log_level: None,
            log_dir: None,
        }
    }
}

impl VaultConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let segment = self.root_segment.trim();
        if segment.is_empty() || segment != self.root_segment {
            return Err(ConfigError::Invalid(format!(
                "root_segment must be a non-blank trimmed name, got `{}`",
                self.root_segment
            )));
        }
        if segment.contains(['/', '\\']) || segment == "." || segment == ".." {
            return Err(ConfigError::Invalid(format!(
                "root_segment must be a single path segment, got `{segment}`"
            )));
        }
        if self.db_file.trim().is_empty() {
            return Err(ConfigError::Invalid("db_file must not be blank".to_string()));
        }
        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be absolute, got `{}`",
                    log_dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.resolve()
    }

    pub fn reconstruct_mode(&self) -> ReconstructMode {
        if self.nested_folders {
            ReconstructMode::Nested
        } else {
            ReconstructMode::SingleLevel
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    pub fn effective_log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .unwrap_or_else(|| default_log_level())
    }
}

#[cfg(test)]
mod tests {
    use super::{platform_backend, BackendSelection, ConfigError, VaultConfig};
    use crate::hierarchy::ReconstructMode;
    use crate::logging::default_log_level;
    use crate::store::BackendKind;
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let config = VaultConfig::from_toml_str("").unwrap();
        assert_eq!(config, VaultConfig::default());
        assert_eq!(config.reconstruct_mode(), ReconstructMode::SingleLevel);
        assert_eq!(config.db_path(), PathBuf::from("./nexusnote.sqlite3"));
        assert_eq!(config.effective_log_level(), default_log_level());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = VaultConfig::from_toml_str(
            r#"
            vault_name = "Personal"
            backend = "hierarchical"
            data_dir = "/tmp/vault"
            nested_folders = true
            log_level = "warn"
            "#,
        )
        .unwrap();
        assert_eq!(config.vault_name, "Personal");
        assert_eq!(config.backend_kind(), BackendKind::Hierarchical);
        assert_eq!(config.reconstruct_mode(), ReconstructMode::Nested);
        assert_eq!(config.effective_log_level(), "warn");
    }

    #[test]
    fn unknown_keys_and_bad_segments_are_rejected() {
        assert!(matches!(
            VaultConfig::from_toml_str("colour = \"blue\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            VaultConfig::from_toml_str("root_segment = \"a/b\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            VaultConfig::from_toml_str("log_dir = \"logs\""),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn platform_check_picks_files_on_mobile() {
        assert_eq!(platform_backend("android"), BackendKind::Hierarchical);
        assert_eq!(platform_backend("ios"), BackendKind::Hierarchical);
        assert_eq!(platform_backend("linux"), BackendKind::Flat);
        assert_eq!(BackendSelection::Flat.resolve(), BackendKind::Flat);
    }
}
