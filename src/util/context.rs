//! Global context for portbuild operations.
//!
//! Owns the loaded configuration and the shell, and builds the collaborators
//! an operation needs: the port source, the downloader and the installer.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::recipe::{CommandInstaller, RecipeOptions};
use crate::sources::{LocalTree, PortSource, RemoteCatalog};
use crate::util::config::{default_config_path, Config};
use crate::util::download::Downloader;
use crate::util::shell::Shell;

/// Which backend answers catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    /// The HTTP catalog.
    #[default]
    Remote,
    /// The checked-out ports tree.
    Local,
}

/// Shared state for one invocation.
#[derive(Debug)]
pub struct GlobalContext {
    config: Config,
    config_path: Option<PathBuf>,
    shell: Shell,
    source_kind: SourceKind,
}

impl GlobalContext {
    /// Load configuration from `config_path`, or from the default location.
    pub fn load(config_path: Option<&Path>, shell: Shell, source_kind: SourceKind) -> Result<Self> {
        let config_path = config_path.map(Path::to_path_buf).or_else(default_config_path);
        let config = match &config_path {
            Some(path) => Config::load_or_default(path)?,
            None => Config::default(),
        };

        Ok(GlobalContext {
            config,
            config_path,
            shell,
            source_kind,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The configuration file in effect, if any location could be determined.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// The local tree, whatever backend was selected.
    pub fn local_tree(&self) -> LocalTree {
        LocalTree::new(
            self.config.repository_path(),
            self.config.repository_url(),
            self.config.build_path(),
        )
    }

    /// The selected port source.
    pub fn source(&self) -> Result<Box<dyn PortSource>> {
        Ok(match self.source_kind {
            SourceKind::Remote => Box::new(RemoteCatalog::new(
                self.config.catalog_url(),
                self.config.build_path(),
            )?),
            SourceKind::Local => Box::new(self.local_tree()),
        })
    }

    pub fn downloader(&self) -> Result<Downloader> {
        Downloader::new(self.config.download_path(), self.config.download_attempts())
    }

    pub fn installer(&self) -> CommandInstaller {
        CommandInstaller::new(self.config.installer())
    }

    /// Stage options seeded from configuration.
    pub fn recipe_options(&self) -> RecipeOptions {
        RecipeOptions {
            patch_options: self.config.patch_options(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.toml");
        let ctx = GlobalContext::load(Some(&path), Shell::quiet(), SourceKind::Remote).unwrap();

        assert_eq!(ctx.config(), &Config::default());
        assert_eq!(ctx.config_path(), Some(path.as_path()));
        assert_eq!(ctx.source().unwrap().name(), "catalog");
    }

    #[test]
    fn test_local_source_uses_repository_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            format!(
                "repository_path = \"{}/ports/\"\npatch_options = \"-p1 -N\"\n",
                tmp.path().display()
            ),
        )
        .unwrap();

        let ctx = GlobalContext::load(Some(&path), Shell::quiet(), SourceKind::Local).unwrap();
        assert_eq!(ctx.source().unwrap().name(), "tree");
        assert_eq!(ctx.local_tree().root(), tmp.path().join("ports"));
        assert_eq!(ctx.recipe_options().patch_options, vec!["-p1", "-N"]);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "download_attempts = \"many\"\n").unwrap();

        let err = GlobalContext::load(Some(&path), Shell::quiet(), SourceKind::Remote).unwrap_err();
        assert!(format!("{:#}", err).contains("config.toml"));
    }
}
