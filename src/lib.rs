//! portbuild - build ports from recipes
//!
//! This crate resolves a port, version and revision into a recipe from
//! either a remote catalog or a checked-out ports tree, and drives the
//! recipe through download, checksum, unpack, patch, build, test and
//! install.

pub mod core;
pub mod ops;
pub mod recipe;
pub mod sources;
pub mod util;

/// Test utilities and doubles for portbuild unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides in-memory archive builders, recipe and ports-tree fixtures, and
/// prompt/installer doubles.
#[cfg(test)]
pub mod test_support;

pub use core::{PortError, PortSpec, RecipeDescriptor, RecipeId};
pub use recipe::{Recipe, RecipeOptions, Stage, StageContext};
pub use sources::{LocalTree, PortSource, RemoteCatalog};
pub use util::context::GlobalContext;
