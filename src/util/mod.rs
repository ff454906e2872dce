//! Shared utilities

pub mod archive;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod download;
pub mod fs;
pub mod hash;
pub mod process;
pub mod shell;

pub use config::Config;
pub use context::{GlobalContext, SourceKind};
pub use diagnostic::Diagnostic;
pub use shell::Shell;
