//! Core data structures for portbuild.
//!
//! This module contains the foundational types used throughout portbuild:
//! - Port identifiers and the `port-version-revision` argument form
//! - Validated recipe descriptors
//! - The typed error taxonomy

pub mod descriptor;
pub mod error;
pub mod port;

pub use descriptor::{Checksum, ChecksumAlgorithm, RecipeDescriptor, Script, ScriptOrigin, Status};
pub use error::{port_error, PortError, EXIT_FAILURE, EXIT_USER_ABORTED};
pub use port::{PortId, PortMetadata, PortSpec, PortSummary, RecipeId};
