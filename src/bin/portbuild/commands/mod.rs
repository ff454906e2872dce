//! Command implementations

pub mod about;
pub mod build;
pub mod completions;
pub mod get;
pub mod list;
pub mod search;
