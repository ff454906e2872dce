//! Port sources.
//!
//! A source answers catalog queries and turns a `(port, version, revision)`
//! triple into a [`Recipe`](crate::recipe::Recipe). Two backends exist: the
//! remote JSON catalog and a locally checked-out ports tree.

pub mod local;
pub mod remote;
pub mod source;

pub use local::LocalTree;
pub use remote::RemoteCatalog;
pub use source::PortSource;
