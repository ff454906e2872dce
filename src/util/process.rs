//! Subprocess execution utilities.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result};
use nix::sys::signal::{signal, SigHandler, Signal};

use crate::core::{PortError, Script, EXIT_USER_ABORTED};
use crate::recipe::Stage;

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    unset: BTreeSet<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            unset: BTreeSet::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable on top of the inherited environment.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Merge a set of variables on top of the inherited environment.
    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Remove variables from the inherited environment.
    pub fn env_removes<'a>(mut self, keys: impl IntoIterator<Item = &'a String>) -> Self {
        for key in keys {
            self.env.remove(key);
            self.unset.insert(key.clone());
        }
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for key in &self.unset {
            cmd.env_remove(key);
        }
        cmd.envs(&self.env);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute with stdout written to `path` and stderr inherited.
    pub fn exec_to_file(&self, path: &Path) -> Result<ExitStatus> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::from(file));
        restore_sigint_in_child(&mut cmd);

        let _guard = SigintGuard::ignore()?;
        cmd.status()
            .with_context(|| format!("failed to execute `{}`", self.display_command()))
    }

    /// Execute with inherited stdio and return the status.
    ///
    /// While the child runs this process ignores SIGINT; the child gets the
    /// default disposition back, so Ctrl-C stops the child and the caller
    /// sees it in the exit status.
    pub fn status(&self) -> Result<ExitStatus> {
        let mut cmd = self.build_command();
        restore_sigint_in_child(&mut cmd);

        let _guard = SigintGuard::ignore()?;
        cmd.status()
            .with_context(|| format!("failed to execute `{}`", self.display_command()))
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Ignores SIGINT for its lifetime, then restores the previous handler.
struct SigintGuard {
    previous: SigHandler,
}

impl SigintGuard {
    fn ignore() -> Result<Self> {
        // SAFETY: SigIgn installs no Rust code as a handler.
        let previous = unsafe { signal(Signal::SIGINT, SigHandler::SigIgn) }
            .context("failed to ignore SIGINT")?;
        Ok(SigintGuard { previous })
    }
}

impl Drop for SigintGuard {
    fn drop(&mut self) {
        // SAFETY: reinstalls whatever handler was active before.
        if let Err(e) = unsafe { signal(Signal::SIGINT, self.previous) } {
            tracing::warn!("failed to restore SIGINT handler: {}", e);
        }
    }
}

#[cfg(unix)]
fn restore_sigint_in_child(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    // SAFETY: signal(2) is async-signal-safe and touches no parent state.
    unsafe {
        cmd.pre_exec(|| {
            signal(Signal::SIGINT, SigHandler::SigDfl).map_err(std::io::Error::from)?;
            Ok(())
        });
    }
}

/// Whether an exit status means the operator interrupted the process.
pub fn is_interrupt(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    status.signal() == Some(Signal::SIGINT as i32) || status.code() == Some(EXIT_USER_ABORTED)
}

/// Exit code to report for a failed status; signals map to `128 + signo`.
pub fn failure_code(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

/// Runs recipe scripts through `sh` with `set -e` semantics.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    shell: PathBuf,
    cwd: PathBuf,
    env: BTreeMap<String, String>,
    unset: BTreeSet<String>,
}

impl ScriptRunner {
    /// A runner executing in `cwd` with the inherited environment.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        ScriptRunner {
            shell: PathBuf::from("sh"),
            cwd: cwd.as_ref().to_path_buf(),
            env: BTreeMap::new(),
            unset: BTreeSet::new(),
        }
    }

    /// Overlay a variable onto the inherited environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.unset.remove(&key);
        self.env.insert(key, value.into());
        self
    }

    /// Hide an inherited variable from the script.
    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.env.remove(&key);
        self.unset.insert(key);
        self
    }

    /// The text handed to `sh -c`.
    pub fn script_text(script: &Script) -> String {
        let mut text = String::from("set -e");
        for line in script.lines() {
            text.push('\n');
            text.push_str(line);
        }
        text
    }

    /// Run every line of `script` as one shell invocation.
    ///
    /// The first failing line stops the script. A non-zero exit becomes
    /// `ScriptFailed`; an interrupt becomes `UserAborted`.
    pub fn run(&self, stage: Stage, script: &Script) -> Result<()> {
        tracing::debug!("running {} script in {}", stage, self.cwd.display());

        let status = ProcessBuilder::new(&self.shell)
            .arg("-c")
            .arg(Self::script_text(script))
            .cwd(&self.cwd)
            .env_removes(&self.unset)
            .envs(&self.env)
            .status()
            .with_context(|| format!("failed to start the {} script", stage))?;

        if status.success() {
            return Ok(());
        }
        if is_interrupt(&status) {
            return Err(PortError::UserAborted.into());
        }
        Err(PortError::ScriptFailed {
            stage,
            code: failure_code(&status),
        }
        .into())
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
