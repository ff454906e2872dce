//! Stage markers inside a build directory.
//!
//! A stage is complete when a zero-byte file named after it exists in the
//! build directory. Markers are only ever added; removing them takes a
//! clean of the whole directory.

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;

use crate::util::fs::{ensure_dir, touch};

/// A pipeline stage that leaves a marker behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Unpack,
    Patch,
    Build,
    Test,
    Install,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Unpack,
        Stage::Patch,
        Stage::Build,
        Stage::Test,
        Stage::Install,
    ];

    /// Marker file name.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Unpack => "unpack",
            Stage::Patch => "patch",
            Stage::Build => "build",
            Stage::Test => "test",
            Stage::Install => "install",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presence-based flag store rooted at one build directory.
#[derive(Debug, Clone)]
pub struct BuildFlags {
    dir: PathBuf,
}

impl BuildFlags {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        BuildFlags { dir: dir.into() }
    }

    fn marker(&self, stage: Stage) -> PathBuf {
        self.dir.join(stage.as_str())
    }

    pub fn is_set(&self, stage: Stage) -> bool {
        self.marker(stage).is_file()
    }

    /// Mark `stage` complete, creating the build directory if needed.
    pub fn set(&self, stage: Stage) -> Result<()> {
        ensure_dir(&self.dir)?;
        touch(&self.marker(stage))?;
        tracing::debug!("set {} flag in {}", stage, self.dir.display());
        Ok(())
    }

    /// Every stage currently marked complete, in pipeline order.
    pub fn completed(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|stage| self.is_set(*stage))
            .collect()
    }
}
