//! Configuration file support for portbuild.
//!
//! Settings live in a single TOML file, by default
//! `<config dir>/portbuild/config.toml`. Every key is optional; unset keys
//! fall back to platform cache/data directories.
//!
//! ```toml
//! download_path = "/var/cache/portbuild/downloads"
//! build_path = "/var/tmp/portbuild/work"
//! repository_path = "/var/lib/portbuild/ports"
//! repository_url = "https://github.com/haikuports/haikuports.git"
//! catalog_url = "http://ports.haiku-files.org/future/bep"
//! patch_options = "-p0"
//! installer = "installoptionalpackage"
//! download_attempts = 3
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::fs::strip_trailing_separator;

pub const DEFAULT_CATALOG_URL: &str = "http://ports.haiku-files.org/future/bep";
pub const DEFAULT_REPOSITORY_URL: &str = "https://github.com/haikuports/haikuports.git";
pub const DEFAULT_PATCH_OPTIONS: &str = "-p0";
pub const DEFAULT_INSTALLER: &str = "installoptionalpackage";
pub const DEFAULT_DOWNLOAD_ATTEMPTS: u32 = 3;

/// portbuild configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Shared cache of downloaded source archives
    pub download_path: Option<PathBuf>,

    /// Parent of the per-recipe build directories
    pub build_path: Option<PathBuf>,

    /// Checkout of the local ports tree
    pub repository_path: Option<PathBuf>,

    /// Git URL the local ports tree is cloned from
    pub repository_url: Option<String>,

    /// Base URL of the remote recipe catalog
    pub catalog_url: Option<String>,

    /// Options passed to `patch`, split on whitespace
    pub patch_options: Option<String>,

    /// Command used to install missing optional tools
    pub installer: Option<String>,

    /// Transfer attempts per source URL
    pub download_attempts: Option<u32>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration, falling back to defaults if the file doesn't exist.
    ///
    /// A file that exists but cannot be read or parsed is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("no config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn download_path(&self) -> PathBuf {
        resolve_path(self.download_path.as_deref(), || cache_dir().join("downloads"))
    }

    pub fn build_path(&self) -> PathBuf {
        resolve_path(self.build_path.as_deref(), || cache_dir().join("work"))
    }

    pub fn repository_path(&self) -> PathBuf {
        resolve_path(self.repository_path.as_deref(), || data_dir().join("ports"))
    }

    pub fn repository_url(&self) -> &str {
        self.repository_url
            .as_deref()
            .unwrap_or(DEFAULT_REPOSITORY_URL)
    }

    /// Catalog base URL without a trailing `/`.
    pub fn catalog_url(&self) -> &str {
        self.catalog_url
            .as_deref()
            .unwrap_or(DEFAULT_CATALOG_URL)
            .trim_end_matches('/')
    }

    pub fn patch_options(&self) -> Vec<String> {
        self.patch_options
            .as_deref()
            .unwrap_or(DEFAULT_PATCH_OPTIONS)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    pub fn installer(&self) -> &str {
        self.installer.as_deref().unwrap_or(DEFAULT_INSTALLER)
    }

    /// At least one attempt is always made.
    pub fn download_attempts(&self) -> u32 {
        self.download_attempts
            .unwrap_or(DEFAULT_DOWNLOAD_ATTEMPTS)
            .max(1)
    }
}

fn resolve_path(configured: Option<&Path>, default: impl FnOnce() -> PathBuf) -> PathBuf {
    match configured {
        Some(path) => strip_trailing_separator(path),
        None => default(),
    }
}

fn cache_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|b| b.cache_dir().join("portbuild"))
        .unwrap_or_else(|| std::env::temp_dir().join("portbuild"))
}

fn data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|b| b.data_dir().join("portbuild"))
        .unwrap_or_else(|| std::env::temp_dir().join("portbuild"))
}

/// Get the default config file path (`<config dir>/portbuild/config.toml`).
pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.config_dir().join("portbuild").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.catalog_url(), DEFAULT_CATALOG_URL);
        assert_eq!(config.patch_options(), vec!["-p0"]);
        assert_eq!(config.installer(), "installoptionalpackage");
        assert_eq!(config.download_attempts(), 3);
        assert!(config.download_path().ends_with("downloads"));
        assert!(config.build_path().ends_with("work"));
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
download_path = "/srv/downloads/"
build_path = "/srv/work//"
catalog_url = "http://localhost:8080/bep/"
patch_options = "-p1 --forward"
download_attempts = 5
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.download_path(), PathBuf::from("/srv/downloads"));
        assert_eq!(config.build_path(), PathBuf::from("/srv/work"));
        assert_eq!(config.catalog_url(), "http://localhost:8080/bep");
        assert_eq!(config.patch_options(), vec!["-p1", "--forward"]);
        assert_eq!(config.download_attempts(), 5);
        assert_eq!(config.installer(), DEFAULT_INSTALLER);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "download_attempts = \"many\"\n").unwrap();

        let err = Config::load_or_default(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("config.toml"));

        std::fs::write(&config_path, "colour = true\n").unwrap();
        assert!(Config::load_or_default(&config_path).is_err());
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let config = Config {
            download_attempts: Some(0),
            ..Config::default()
        };
        assert_eq!(config.download_attempts(), 1);
    }
}
