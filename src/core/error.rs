//! Typed failures surfaced to the operator.
//!
//! Most plumbing errors travel as `anyhow::Error` with context attached.
//! The variants here are the ones callers need to tell apart: `main` maps
//! them to exit codes, and `about` keeps going after a `NotFound`.

use miette::Diagnostic;
use thiserror::Error;

use crate::recipe::Stage;

/// Exit status for a build interrupted by the operator.
pub const EXIT_USER_ABORTED: i32 = 130;

/// Exit status for every other fatal error.
pub const EXIT_FAILURE: i32 = 1;

/// Errors with operator-visible meaning.
#[derive(Debug, Error, Diagnostic)]
pub enum PortError {
    /// Unknown port, version or revision.
    #[error("{what} not found")]
    #[diagnostic(
        code(portbuild::not_found),
        help("Run `portbuild list` to see available ports")
    )]
    NotFound { what: String },

    /// The catalog could not be reached.
    #[error("could not reach the port catalog at {url}: {reason}")]
    #[diagnostic(
        code(portbuild::connection),
        help("Check your network connection, or use `--local` with a checked-out tree")
    )]
    Connection { url: String, reason: String },

    #[error("checksum mismatch for {archive}\n  expected: {expected}\n  found:    {found}")]
    #[diagnostic(
        code(portbuild::checksum),
        help("Remove the cached archive and try again; the upstream file may have changed")
    )]
    ChecksumMismatch {
        archive: String,
        expected: String,
        found: String,
    },

    #[error("unrecognized archive type: {archive}")]
    #[diagnostic(code(portbuild::archive_format))]
    UnrecognizedArchiveFormat { archive: String },

    /// A build, test or install script exited non-zero.
    #[error("{stage} script failed with exit code {code}")]
    #[diagnostic(code(portbuild::script))]
    ScriptFailed { stage: Stage, code: i32 },

    #[error("aborted by user")]
    #[diagnostic(code(portbuild::aborted))]
    UserAborted,

    #[error("required tool `{tool}` is not installed")]
    #[diagnostic(
        code(portbuild::tool_declined),
        help("Run `{installer} {package}` manually, or rerun and let portbuild install it for you")
    )]
    OptionalToolDeclined {
        tool: String,
        package: String,
        installer: String,
    },

    #[error("build cancelled at the recipe message prompt")]
    #[diagnostic(code(portbuild::declined))]
    ConfirmationDeclined,

    #[error("failed to download {url} after {attempts} attempt(s): {reason}")]
    #[diagnostic(
        code(portbuild::download),
        help("Check your network connection and try again")
    )]
    DownloadFailed {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// The recipe document failed validation.
    #[error("invalid recipe {recipe}: {reason}")]
    #[diagnostic(code(portbuild::invalid_recipe))]
    InvalidRecipe { recipe: String, reason: String },

    #[error("cannot run {stage} before {requires} has completed")]
    #[diagnostic(code(portbuild::stage_order))]
    StageOrder { stage: Stage, requires: &'static str },

    #[error("invalid port argument `{spec}`")]
    #[diagnostic(
        code(portbuild::port_spec),
        help("Expected `port`, `port-version` or `port-version-revision`")
    )]
    InvalidPortSpec { spec: String },
}

impl PortError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        PortError::NotFound { what: what.into() }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PortError::UserAborted => EXIT_USER_ABORTED,
            _ => EXIT_FAILURE,
        }
    }

    /// Whether this error is reported as a plain message rather than a
    /// fatal diagnostic.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Find a `PortError` anywhere in an `anyhow` chain.
pub fn port_error(err: &anyhow::Error) -> Option<&PortError> {
    err.chain().find_map(|cause| cause.downcast_ref::<PortError>())
}
