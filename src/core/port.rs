//! Port identification - WHICH port, version and revision.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::PortError;

/// A port together with the category it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortId {
    pub category: String,
    pub name: String,
}

impl PortId {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        PortId {
            category: category.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// One entry of a port listing.
///
/// The category is only filled in when the listing was requested with
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSummary {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl PortSummary {
    pub fn named(name: impl Into<String>) -> Self {
        PortSummary {
            name: name.into(),
            category: None,
        }
    }

    pub fn in_category(name: impl Into<String>, category: impl Into<String>) -> Self {
        PortSummary {
            name: name.into(),
            category: Some(category.into()),
        }
    }
}

impl fmt::Display for PortSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.category {
            Some(category) => write!(f, "{}/{}", category, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Descriptive information about a port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMetadata {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
}

impl PortMetadata {
    pub fn id(&self) -> PortId {
        PortId::new(&self.category, &self.name)
    }
}

/// A fully qualified `(port, version, revision)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipeId {
    pub port: String,
    pub version: String,
    pub revision: String,
}

impl RecipeId {
    pub fn new(
        port: impl Into<String>,
        version: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        RecipeId {
            port: port.into(),
            version: version.into(),
            revision: revision.into(),
        }
    }

    /// `<port>-<version>-<revision>`, used for build directories and
    /// recipe file stems.
    pub fn base_name(&self) -> String {
        format!("{}-{}-{}", self.port, self.version, self.revision)
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_name())
    }
}

/// A `port[-version[-revision]]` argument as typed by the operator.
///
/// The port name ends at the first `-`; the revision starts after the last
/// `-` of what remains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub port: String,
    pub version: Option<String>,
    pub revision: Option<String>,
}

impl PortSpec {
    /// The full triple, if the argument named one.
    pub fn recipe_id(&self) -> Option<RecipeId> {
        match (&self.version, &self.revision) {
            (Some(version), Some(revision)) => {
                Some(RecipeId::new(&self.port, version, revision))
            }
            _ => None,
        }
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PortError::InvalidPortSpec { spec: s.to_string() };

        let Some((port, rest)) = s.split_once('-') else {
            if s.is_empty() {
                return Err(invalid());
            }
            return Ok(PortSpec {
                port: s.to_string(),
                version: None,
                revision: None,
            });
        };

        if port.is_empty() || rest.is_empty() {
            return Err(invalid());
        }

        match rest.rsplit_once('-') {
            Some((version, revision)) => {
                if version.is_empty() || revision.is_empty() {
                    return Err(invalid());
                }
                Ok(PortSpec {
                    port: port.to_string(),
                    version: Some(version.to_string()),
                    revision: Some(revision.to_string()),
                })
            }
            None => Ok(PortSpec {
                port: port.to_string(),
                version: Some(rest.to_string()),
                revision: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        let id = RecipeId::new("foo", "1.2", "1");
        assert_eq!(id.base_name(), "foo-1.2-1");
        assert_eq!(id.to_string(), "foo-1.2-1");
    }

    #[test]
    fn test_parse_port_only() {
        let spec: PortSpec = "foo".parse().unwrap();
        assert_eq!(spec.port, "foo");
        assert!(spec.version.is_none());
        assert!(spec.recipe_id().is_none());
    }

    #[test]
    fn test_parse_port_version() {
        let spec: PortSpec = "foo-1.2".parse().unwrap();
        assert_eq!(spec.version.as_deref(), Some("1.2"));
        assert!(spec.revision.is_none());
    }

    #[test]
    fn test_parse_full_triple() {
        let spec: PortSpec = "foo-1.2-rc1-3".parse().unwrap();
        assert_eq!(
            spec.recipe_id(),
            Some(RecipeId::new("foo", "1.2-rc1", "3"))
        );
    }

    #[test]
    fn test_parse_rejects_dangling_separators() {
        assert!("".parse::<PortSpec>().is_err());
        assert!("foo-".parse::<PortSpec>().is_err());
        assert!("-1.2".parse::<PortSpec>().is_err());
        assert!("foo-1.2-".parse::<PortSpec>().is_err());
    }

    #[test]
    fn test_summary_display() {
        assert_eq!(PortSummary::in_category("foo", "dev-libs").to_string(), "dev-libs/foo");
        assert_eq!(PortSummary::named("foo").to_string(), "foo");
    }
}
