//! Where a recipe's scripts and patch come from.
//!
//! Catalog recipes embed their BUILD/TEST/INSTALL blocks and PATCH text in
//! the recipe document. Tree recipes keep them in files beside it:
//! `<base>.build`, `<base>.test`, `<base>.install` and `<base>.patch`.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::{RecipeDescriptor, Script};
use crate::util::fs::read_to_string;

/// A patch to apply, either as text to materialize or a file to use in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchSource {
    Embedded(String),
    File(PathBuf),
}

/// Supplies the scripts a recipe runs.
pub trait ScriptSource: std::fmt::Debug {
    fn build_script(&self) -> Result<Option<Script>>;

    fn test_script(&self) -> Result<Option<Script>>;

    fn install_script(&self) -> Result<Option<Script>>;

    fn patch(&self) -> Result<Option<PatchSource>>;
}

/// Scripts taken from the recipe document itself.
#[derive(Debug, Clone)]
pub struct EmbeddedScripts {
    build: Option<Script>,
    test: Option<Script>,
    install: Option<Script>,
    patch: Option<String>,
}

impl EmbeddedScripts {
    pub fn from_descriptor(descriptor: &RecipeDescriptor) -> Self {
        EmbeddedScripts {
            build: descriptor.build.clone(),
            test: descriptor.test.clone(),
            install: descriptor.install.clone(),
            patch: descriptor.patch.clone(),
        }
    }
}

impl ScriptSource for EmbeddedScripts {
    fn build_script(&self) -> Result<Option<Script>> {
        Ok(self.build.clone())
    }

    fn test_script(&self) -> Result<Option<Script>> {
        Ok(self.test.clone())
    }

    fn install_script(&self) -> Result<Option<Script>> {
        Ok(self.install.clone())
    }

    fn patch(&self) -> Result<Option<PatchSource>> {
        Ok(self.patch.clone().map(PatchSource::Embedded))
    }
}

/// Scripts read from files next to a tree recipe, at the time they run.
#[derive(Debug, Clone)]
pub struct TreeScripts {
    dir: PathBuf,
    base: String,
}

impl TreeScripts {
    pub fn new(dir: impl Into<PathBuf>, base: impl Into<String>) -> Self {
        TreeScripts {
            dir: dir.into(),
            base: base.into(),
        }
    }

    pub fn path(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.base, extension))
    }

    fn read_script(&self, extension: &str) -> Result<Option<Script>> {
        let path = self.path(extension);
        if !path.is_file() {
            return Ok(None);
        }
        let script = Script::from_text(&read_to_string(&path)?);
        Ok(if script.is_empty() { None } else { Some(script) })
    }
}

impl ScriptSource for TreeScripts {
    fn build_script(&self) -> Result<Option<Script>> {
        self.read_script("build")
    }

    fn test_script(&self) -> Result<Option<Script>> {
        self.read_script("test")
    }

    fn install_script(&self) -> Result<Option<Script>> {
        self.read_script("install")
    }

    fn patch(&self) -> Result<Option<PatchSource>> {
        let path = self.path("patch");
        Ok(path.is_file().then_some(PatchSource::File(path)))
    }
}
