//! PortSource trait - common interface for the catalog backends.

use anyhow::Result;

use crate::core::{PortMetadata, PortSummary, RecipeId};
use crate::recipe::Recipe;

/// Somewhere ports and their recipes can be looked up.
///
/// Lookups of unknown ports, versions or revisions fail with
/// [`PortError::NotFound`](crate::core::PortError::NotFound).
pub trait PortSource {
    /// Name shown in status output.
    fn name(&self) -> &str;

    /// Category names.
    fn categories(&self) -> Result<Vec<String>>;

    /// Every port, with its category when `include_metadata` is set.
    fn list_ports(&self, include_metadata: bool) -> Result<Vec<PortSummary>>;

    /// Metadata of one port.
    fn port(&self, name: &str) -> Result<PortMetadata>;

    /// Versions of a port.
    fn versions(&self, port: &str) -> Result<Vec<String>>;

    /// Revisions of one version of a port.
    fn revisions(&self, port: &str, version: &str) -> Result<Vec<String>>;

    /// Resolve a triple into a recipe. Never creates the build directory.
    fn recipe(&self, id: &RecipeId) -> Result<Recipe>;

    /// Check out or refresh the backing data.
    fn update(&self) -> Result<()>;
}
