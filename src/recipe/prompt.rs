//! Operator confirmation and optional tool installation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::core::PortError;
use crate::util::process::{find_executable, ProcessBuilder};
use crate::util::shell::Shell;

/// Asks the operator a yes/no question.
pub trait Prompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;
}

/// Interactive prompt on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default)
            .interact()
            .context("failed to read confirmation from the terminal")
    }
}

/// Installs an optional system package.
pub trait ToolInstaller {
    /// Name shown in remediation messages.
    fn command(&self) -> &str;

    fn install(&self, package: &str) -> Result<()>;
}

/// Runs the configured installer command with the package name appended.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    command: String,
}

impl CommandInstaller {
    pub fn new(command: impl Into<String>) -> Self {
        CommandInstaller {
            command: command.into(),
        }
    }
}

impl ToolInstaller for CommandInstaller {
    fn command(&self) -> &str {
        &self.command
    }

    fn install(&self, package: &str) -> Result<()> {
        let mut words = self.command.split_whitespace();
        let Some(program) = words.next() else {
            bail!("no installer command configured");
        };

        let cmd = ProcessBuilder::new(program).args(words).arg(package);
        tracing::info!("installing optional package: {}", cmd.display_command());

        let status = cmd.status()?;
        if !status.success() {
            bail!(
                "`{}` failed with exit code {:?}",
                cmd.display_command(),
                status.code()
            );
        }
        Ok(())
    }
}

/// Package that provides a tool, for the tools a build may need.
pub fn optional_package(tool: &str) -> Option<&'static str> {
    match tool {
        "bzip2" => Some("bzip2"),
        "patch" => Some("patch"),
        "xz" => Some("XZ-Utils"),
        "git" => Some("Git"),
        "hg" => Some("mercurial"),
        "cvs" => Some("cvs"),
        "bzr" => Some("bazaar"),
        _ => None,
    }
}

/// Locates external tools, offering to install the missing ones.
pub struct ToolLocator<'a> {
    pub prompter: &'a dyn Prompter,
    pub installer: &'a dyn ToolInstaller,
    pub shell: &'a Shell,
    /// Install without asking.
    pub assume_yes: bool,
}

impl ToolLocator<'_> {
    /// Path of `tool`, installing its package first if it is missing and
    /// the operator agrees.
    pub fn require(&self, tool: &str) -> Result<PathBuf> {
        if let Some(path) = find_executable(tool) {
            return Ok(path);
        }

        let package = optional_package(tool).unwrap_or(tool);
        let declined = || PortError::OptionalToolDeclined {
            tool: tool.to_string(),
            package: package.to_string(),
            installer: self.installer.command().to_string(),
        };

        let accepted = self.assume_yes
            || self
                .prompter
                .confirm(&format!("`{}` is not installed. Install {}?", tool, package), true)?;
        if !accepted {
            return Err(declined().into());
        }

        self.shell.note(format!("installing {} to provide `{}`", package, tool));
        self.installer
            .install(package)
            .with_context(|| format!("failed to install {}", package))?;

        find_executable(tool)
            .with_context(|| format!("`{}` is still missing after installing {}", tool, package))
    }
}
