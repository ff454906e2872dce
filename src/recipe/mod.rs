//! The recipe build pipeline.
//!
//! A [`Recipe`] ties a validated descriptor to its build directory and to
//! the scripts that build it. Each stage method checks the precondition of
//! the stage before it, skips work already recorded by a flag (unless the
//! run is forced), and records its own flag on success:
//!
//! ```text
//! message -> download -> checksum -> unpack -> patch -> build -> test -> install
//! ```
//!
//! The build directory is created by the first stage that writes into it,
//! never by resolution.

pub mod flags;
pub mod prompt;
pub mod scripts;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::{PortError, RecipeDescriptor, RecipeId, Script};
use crate::util::archive;
use crate::util::download::Downloader;
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists, write_string};
use crate::util::hash;
use crate::util::process::{failure_code, is_interrupt, ProcessBuilder, ScriptRunner};
use crate::util::shell::{Shell, Status};

pub use flags::{BuildFlags, Stage};
pub use prompt::{CommandInstaller, Prompter, TerminalPrompter, ToolInstaller, ToolLocator};
pub use scripts::{EmbeddedScripts, PatchSource, ScriptSource, TreeScripts};

/// Per-run switches that change how stages behave.
#[derive(Debug, Clone, Default)]
pub struct RecipeOptions {
    /// Run stages even when their flag is already set.
    pub force: bool,
    /// Answer every prompt with yes.
    pub assume_yes: bool,
    /// Destination root exported as `DESTDIR` to the install script.
    pub destdir: Option<PathBuf>,
    /// Arguments passed to `patch` before `-i <file>`.
    pub patch_options: Vec<String>,
}

/// Collaborators a stage may need.
pub struct StageContext<'a> {
    pub shell: &'a Shell,
    pub downloader: &'a Downloader,
    pub prompter: &'a dyn Prompter,
    pub installer: &'a dyn ToolInstaller,
    pub options: &'a RecipeOptions,
}

impl StageContext<'_> {
    fn tools(&self) -> ToolLocator<'_> {
        ToolLocator {
            prompter: self.prompter,
            installer: self.installer,
            shell: self.shell,
            assume_yes: self.options.assume_yes,
        }
    }
}

/// A resolved recipe and its build state.
#[derive(Debug)]
pub struct Recipe {
    id: RecipeId,
    descriptor: RecipeDescriptor,
    scripts: Box<dyn ScriptSource>,
    build_dir: PathBuf,
    flags: BuildFlags,
    /// Archive downloaded during this run.
    archive: Option<PathBuf>,
    /// Whether the checksum step completed for `archive` during this run.
    verified: bool,
}

impl Recipe {
    pub fn new(
        id: RecipeId,
        descriptor: RecipeDescriptor,
        scripts: Box<dyn ScriptSource>,
        build_root: &Path,
    ) -> Self {
        let build_dir = build_root.join(id.base_name());
        Recipe {
            id,
            descriptor,
            scripts,
            flags: BuildFlags::new(&build_dir),
            build_dir,
            archive: None,
            verified: false,
        }
    }

    pub fn id(&self) -> &RecipeId {
        &self.id
    }

    pub fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn flags(&self) -> &BuildFlags {
        &self.flags
    }

    fn require_flag(&self, stage: Stage, needed: Stage, requires: &'static str) -> Result<()> {
        if !self.flags.is_set(needed) {
            return Err(PortError::StageOrder { stage, requires }.into());
        }
        Ok(())
    }

    /// True when the stage should be skipped because its flag is set.
    fn already_done(&self, stage: Stage, ctx: &StageContext<'_>) -> bool {
        if self.flags.is_set(stage) && !ctx.options.force {
            ctx.shell
                .status(Status::Skipped, format!("{} of {} (already done)", stage, self.id));
            return true;
        }
        false
    }

    /// Show the recipe's MESSAGE and ask whether to go on.
    pub fn message(&self, ctx: &StageContext<'_>) -> Result<()> {
        let Some(message) = &self.descriptor.message else {
            return Ok(());
        };

        ctx.shell.notice(message);
        if ctx.options.assume_yes {
            return Ok(());
        }
        if !ctx.prompter.confirm("Continue?", false)? {
            return Err(PortError::ConfirmationDeclined.into());
        }
        Ok(())
    }

    /// Fetch the source archive into the download cache.
    pub fn download(&mut self, ctx: &StageContext<'_>) -> Result<PathBuf> {
        let path = ctx
            .downloader
            .fetch_any(&self.descriptor.src_uri, ctx.shell)
            .with_context(|| format!("failed to download sources for {}", self.id))?;

        self.archive = Some(path.clone());
        self.verified = false;
        Ok(path)
    }

    /// Verify the downloaded archive against the declared digest.
    pub fn checksum(&mut self, ctx: &StageContext<'_>) -> Result<()> {
        let Some(archive) = &self.archive else {
            bail!("no archive has been downloaded for {}", self.id);
        };

        match &self.descriptor.checksum {
            Some(expected) => {
                ctx.shell
                    .status(Status::Verifying, format!("{} ({})", archive.display(), expected.algorithm));
                hash::verify(archive, expected)?;
            }
            None => {
                ctx.shell.warn(format!(
                    "{} declares no checksum, skipping verification",
                    self.id
                ));
            }
        }

        self.verified = true;
        Ok(())
    }

    /// Extract the verified archive into the build directory.
    pub fn unpack(&mut self, ctx: &StageContext<'_>) -> Result<()> {
        if self.already_done(Stage::Unpack, ctx) {
            return Ok(());
        }

        let archive = match (&self.archive, self.verified) {
            (Some(archive), true) => archive.clone(),
            _ => {
                return Err(PortError::StageOrder {
                    stage: Stage::Unpack,
                    requires: "download and checksum",
                }
                .into())
            }
        };

        ctx.shell.status(
            Status::Unpacking,
            format!("{} into {}", archive.display(), self.build_dir.display()),
        );
        let tools = ctx.tools();
        archive::unpack(&archive, &self.build_dir, |tool| tools.require(tool))?;

        self.flags.set(Stage::Unpack)
    }

    /// Apply the recipe's patch with the external `patch` tool.
    pub fn patch(&mut self, ctx: &StageContext<'_>) -> Result<()> {
        self.require_flag(Stage::Patch, Stage::Unpack, "unpack")?;

        let Some(patch) = self.scripts.patch()? else {
            ctx.shell.status(Status::Skipped, "no patching required");
            return Ok(());
        };

        if self.already_done(Stage::Patch, ctx) {
            return Ok(());
        }

        let patch_file = match patch {
            PatchSource::File(path) => path,
            PatchSource::Embedded(text) => {
                let path = self.build_dir.join(format!("{}.patch", self.id.base_name()));
                write_string(&path, &text)?;
                path
            }
        };

        ctx.shell.status(Status::Patching, format!("{}", self.id));
        let patch_tool = ctx.tools().require("patch")?;
        let cmd = ProcessBuilder::new(&patch_tool)
            .args(&ctx.options.patch_options)
            .arg("-i")
            .arg(&patch_file)
            .cwd(&self.build_dir);

        tracing::debug!("running {}", cmd.display_command());
        let status = cmd.status()?;
        if is_interrupt(&status) {
            return Err(PortError::UserAborted.into());
        }
        if !status.success() {
            return Err(PortError::ScriptFailed {
                stage: Stage::Patch,
                code: failure_code(&status),
            }
            .into());
        }

        self.flags.set(Stage::Patch)
    }

    fn run_script(&self, stage: Stage, script: &Script, ctx: &StageContext<'_>) -> Result<()> {
        ensure_dir(&self.build_dir)?;

        let mut runner = ScriptRunner::new(&self.build_dir);
        if stage == Stage::Install {
            runner = match &ctx.options.destdir {
                Some(destdir) => runner.env("DESTDIR", destdir.to_string_lossy()),
                None => runner.env_remove("DESTDIR"),
            };
        }

        runner.run(stage, script)?;
        self.flags.set(stage)
    }

    /// Run the build script.
    pub fn build(&mut self, ctx: &StageContext<'_>) -> Result<()> {
        self.require_flag(Stage::Build, Stage::Unpack, "unpack")?;
        if self.already_done(Stage::Build, ctx) {
            return Ok(());
        }

        let Some(script) = self.scripts.build_script()? else {
            bail!("{} has no build script", self.id);
        };

        ctx.shell.status(Status::Building, &self.id);
        self.run_script(Stage::Build, &script, ctx)
    }

    /// Run the test script, if the recipe has one.
    pub fn test(&mut self, ctx: &StageContext<'_>) -> Result<()> {
        self.require_flag(Stage::Test, Stage::Build, "build")?;

        let Some(script) = self.scripts.test_script()? else {
            ctx.shell.status(Status::Skipped, format!("{} has no test script", self.id));
            return Ok(());
        };
        if self.already_done(Stage::Test, ctx) {
            return Ok(());
        }

        ctx.shell.status(Status::Testing, &self.id);
        self.run_script(Stage::Test, &script, ctx)
    }

    /// Run the install script, exporting `DESTDIR` when a destination root is set.
    pub fn install(&mut self, ctx: &StageContext<'_>) -> Result<()> {
        self.require_flag(Stage::Install, Stage::Build, "build")?;
        if self.already_done(Stage::Install, ctx) {
            return Ok(());
        }

        let Some(script) = self.scripts.install_script()? else {
            bail!("{} has no install script", self.id);
        };

        match &ctx.options.destdir {
            Some(destdir) => ctx
                .shell
                .status(Status::Installing, format!("{} into {}", self.id, destdir.display())),
            None => ctx.shell.status(Status::Installing, &self.id),
        }
        self.run_script(Stage::Install, &script, ctx)
    }

    /// Remove the build directory and every flag in it.
    pub fn clean_build_directory(&self, shell: &Shell) -> Result<()> {
        shell.status(Status::Cleaning, self.build_dir.display());
        remove_dir_all_if_exists(&self.build_dir)
    }
}
