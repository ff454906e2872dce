//! High-level operations.
//!
//! This module contains the implementation of portbuild commands.

pub mod port_build;
pub mod port_get;
pub mod port_list;
pub mod port_options;

pub use port_build::{build, run_pipeline, BuildOptions, BuildOutcome};
pub use port_get::get_tree;
pub use port_list::{about, format_about, list_ports, search_ports, AboutEntry};
pub use port_options::list_options;
