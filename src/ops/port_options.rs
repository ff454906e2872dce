//! Listing the choices left open by an incomplete port argument.

use anyhow::Result;

use crate::core::{PortError, PortSpec};
use crate::sources::PortSource;

/// What an incomplete `port[-version]` argument could be completed to.
///
/// A bare port lists `port-version` for each version; `port-version` lists
/// `port-version-revision` for each revision. A complete triple yields the
/// triple itself once its revision is confirmed to exist.
pub fn list_options(source: &dyn PortSource, spec: &PortSpec) -> Result<Vec<String>> {
    let port = &spec.port;

    let Some(version) = &spec.version else {
        let known = source.list_ports(false)?.iter().any(|p| &p.name == port);
        if !known {
            return Err(PortError::not_found(format!("port '{}'", port)).into());
        }
        return Ok(source
            .versions(port)?
            .into_iter()
            .map(|v| format!("{}-{}", port, v))
            .collect());
    };

    match &spec.revision {
        None => {
            if !source.versions(port)?.contains(version) {
                return Err(PortError::not_found(format!("version {} of '{}'", version, port)).into());
            }
            Ok(source
                .revisions(port, version)?
                .into_iter()
                .map(|r| format!("{}-{}-{}", port, version, r))
                .collect())
        }
        Some(revision) => {
            if !source.revisions(port, version)?.contains(revision) {
                return Err(PortError::not_found(format!(
                    "revision {} of '{}-{}'",
                    revision, port, version
                ))
                .into());
            }
            Ok(vec![format!("{}-{}-{}", port, version, revision)])
        }
    }
}
