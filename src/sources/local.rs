//! Local tree - a checked-out ports repository on disk.
//!
//! Layout: `<root>/<category>/<port>/<port>-<version>-<revision>.<ext>`
//! where `<ext>` is `bep` for the recipe document and `build`, `test`,
//! `install` or `patch` for the stage scripts. Hidden directories such as
//! `.git` are not categories or ports.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use git2::{Repository, ResetType};

use crate::core::{
    PortError, PortMetadata, PortSummary, RecipeDescriptor, RecipeId, ScriptOrigin,
};
use crate::recipe::{Recipe, TreeScripts};
use crate::sources::remote::RECIPE_EXTENSION;
use crate::sources::PortSource;
use crate::util::fs::{ensure_dir, files_with_extension, is_hidden};

/// A ports tree checked out at `root`.
#[derive(Debug, Clone)]
pub struct LocalTree {
    root: PathBuf,
    repository_url: String,
    build_root: PathBuf,
}

impl LocalTree {
    pub fn new(
        root: impl Into<PathBuf>,
        repository_url: impl Into<String>,
        build_root: impl Into<PathBuf>,
    ) -> Self {
        LocalTree {
            root: root.into(),
            repository_url: repository_url.into(),
            build_root: build_root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Visible subdirectory names, sorted.
    fn subdirectories(dir: &Path) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read ports tree at {}", dir.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_hidden(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Directory holding a port's recipes.
    fn port_dir(&self, name: &str) -> Result<Option<(String, PathBuf)>> {
        for category in self.categories()? {
            let dir = self.root.join(&category).join(name);
            if dir.is_dir() && !is_hidden(name) {
                return Ok(Some((category, dir)));
            }
        }
        Ok(None)
    }

    fn require_port_dir(&self, name: &str) -> Result<(String, PathBuf)> {
        self.port_dir(name)?
            .ok_or_else(|| PortError::not_found(format!("port '{}'", name)).into())
    }

    /// `(version, revision)` of every `.build` script of a port, in file
    /// name order.
    fn builds(&self, port: &str, dir: &Path) -> Result<Vec<(String, String)>> {
        let prefix = format!("{}-", port);
        let mut builds = Vec::new();

        for path in files_with_extension(dir, "build")? {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(rest) = stem.strip_prefix(&prefix) else {
                continue;
            };
            match rest.rsplit_once('-') {
                Some((version, revision)) if !version.is_empty() && !revision.is_empty() => {
                    builds.push((version.to_string(), revision.to_string()));
                }
                _ => tracing::debug!("ignoring oddly named script {}", path.display()),
            }
        }
        Ok(builds)
    }

    /// Descriptive fields from the port's last recipe document, if any parses.
    fn describe(&self, name: &str, dir: &Path, meta: &mut PortMetadata) -> Result<()> {
        let prefix = format!("{}-", name);
        let recipes = files_with_extension(dir, RECIPE_EXTENSION)?;
        let latest = recipes.iter().rev().find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        });

        let Some(path) = latest else {
            return Ok(());
        };
        match RecipeDescriptor::load(path, ScriptOrigin::External) {
            Ok(descriptor) => {
                meta.license = Some(descriptor.license_display());
                meta.description = Some(descriptor.description);
                meta.homepage = Some(descriptor.homepage);
            }
            Err(e) => tracing::debug!("no metadata from {}: {:#}", path.display(), e),
        }
        Ok(())
    }

    fn clone_tree(&self) -> Result<()> {
        tracing::info!("cloning {} into {}", self.repository_url, self.root.display());

        if let Some(parent) = self.root.parent() {
            ensure_dir(parent)?;
        }
        Repository::clone(&self.repository_url, &self.root)
            .with_context(|| format!("failed to clone {}", self.repository_url))?;
        Ok(())
    }

    fn update_tree(&self) -> Result<()> {
        tracing::info!("updating {} from origin", self.root.display());

        let repo = Repository::open(&self.root)
            .with_context(|| format!("{} is not a git checkout", self.root.display()))?;

        let head = repo.head().context("ports tree has no HEAD")?;
        let Some(branch) = head.shorthand().map(str::to_string) else {
            bail!("ports tree HEAD is not a named branch");
        };
        drop(head);

        let mut remote = repo
            .find_remote("origin")
            .context("ports tree has no `origin` remote")?;
        let refspec = format!("refs/heads/{0}:refs/remotes/origin/{0}", branch);
        remote
            .fetch(&[refspec.as_str()], None, None)
            .with_context(|| format!("failed to fetch {} from origin", branch))?;

        let commit = repo
            .find_reference(&format!("refs/remotes/origin/{}", branch))?
            .peel_to_commit()?;
        repo.reset(commit.as_object(), ResetType::Hard, None)
            .context("failed to move the ports tree to the fetched commit")?;

        tracing::debug!("ports tree now at {}", commit.id());
        Ok(())
    }
}

impl PortSource for LocalTree {
    fn name(&self) -> &str {
        "tree"
    }

    fn categories(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            bail!(
                "no ports tree at {}; run `portbuild get` first",
                self.root.display()
            );
        }
        Self::subdirectories(&self.root)
    }

    fn list_ports(&self, include_metadata: bool) -> Result<Vec<PortSummary>> {
        let mut ports = Vec::new();
        for category in self.categories()? {
            for name in Self::subdirectories(&self.root.join(&category))? {
                ports.push(if include_metadata {
                    PortSummary::in_category(name, category.as_str())
                } else {
                    PortSummary::named(name)
                });
            }
        }
        Ok(ports)
    }

    fn port(&self, name: &str) -> Result<PortMetadata> {
        let (category, dir) = self.require_port_dir(name)?;
        let mut meta = PortMetadata {
            name: name.to_string(),
            category,
            ..Default::default()
        };
        self.describe(name, &dir, &mut meta)?;
        Ok(meta)
    }

    fn versions(&self, port: &str) -> Result<Vec<String>> {
        let (_, dir) = self.require_port_dir(port)?;

        let mut versions: Vec<String> = Vec::new();
        for (version, _) in self.builds(port, &dir)? {
            if !versions.contains(&version) {
                versions.push(version);
            }
        }
        Ok(versions)
    }

    fn revisions(&self, port: &str, version: &str) -> Result<Vec<String>> {
        let (_, dir) = self.require_port_dir(port)?;

        let revisions: Vec<String> = self
            .builds(port, &dir)?
            .into_iter()
            .filter(|(v, _)| v == version)
            .map(|(_, revision)| revision)
            .collect();

        if revisions.is_empty() {
            return Err(PortError::not_found(format!("port {}-{}", port, version)).into());
        }
        Ok(revisions)
    }

    fn recipe(&self, id: &RecipeId) -> Result<Recipe> {
        let not_found = || PortError::not_found(format!("port {}", id));

        let Some((_, dir)) = self.port_dir(&id.port)? else {
            return Err(not_found().into());
        };

        let base = id.base_name();
        let scripts = TreeScripts::new(&dir, &base);
        let document = scripts.path(RECIPE_EXTENSION);
        if !document.is_file() || !scripts.path("build").is_file() {
            return Err(not_found().into());
        }

        let descriptor = RecipeDescriptor::load(&document, ScriptOrigin::External)?;
        Ok(Recipe::new(
            id.clone(),
            descriptor,
            Box::new(scripts),
            &self.build_root,
        ))
    }

    fn update(&self) -> Result<()> {
        if self.root.join(".git").exists() {
            return self.update_tree();
        }

        let occupied = self.root.is_dir()
            && std::fs::read_dir(&self.root)
                .with_context(|| format!("failed to read {}", self.root.display()))?
                .next()
                .is_some();
        if occupied {
            bail!(
                "{} exists but is not a git checkout; move it away or set `repository_path`",
                self.root.display()
            );
        }
        self.clone_tree()
    }
}
