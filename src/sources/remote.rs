//! Remote catalog - ports served as JSON over HTTP.
//!
//! Endpoints, relative to the catalog base URL:
//!
//! | Query                  | Request                                  |
//! |------------------------|------------------------------------------|
//! | categories             | `GET <base>/`                            |
//! | port list              | `GET <base>/all/` (`?meta` for objects)  |
//! | port metadata          | `GET <base>/all/<port>`                  |
//! | versions               | `GET <base>/all/<port>/`                 |
//! | revisions              | `GET <base>/all/<port>/<version>/`       |
//! | recipe document (text) | `GET <base>/all/<port>/<version>/<rev>`  |

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::core::{PortError, PortMetadata, PortSummary, RecipeDescriptor, RecipeId, ScriptOrigin};
use crate::recipe::{EmbeddedScripts, Recipe};
use crate::sources::PortSource;

/// Recipe document extension, used to name fetched documents.
pub const RECIPE_EXTENSION: &str = "bep";

/// The HTTP port catalog.
#[derive(Debug, Clone)]
pub struct RemoteCatalog {
    client: Client,
    base_url: String,
    build_root: PathBuf,
}

impl RemoteCatalog {
    pub fn new(base_url: impl Into<String>, build_root: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("portbuild/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to create HTTP client")?;

        Ok(RemoteCatalog {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            build_root: build_root.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Issue a GET. 404 becomes `NotFound(what)`; any other failure is a
    /// connection error.
    fn get(&self, url: &str, what: impl FnOnce() -> String) -> Result<Response> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().map_err(|e| PortError::Connection {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(PortError::not_found(what()).into()),
            status => Err(PortError::Connection {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            }
            .into()),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, what: impl FnOnce() -> String) -> Result<T> {
        let url = self.url(path);
        self.get(&url, what)?
            .json()
            .with_context(|| format!("invalid catalog response from {}", url))
    }
}

impl PortSource for RemoteCatalog {
    fn name(&self) -> &str {
        "catalog"
    }

    fn categories(&self) -> Result<Vec<String>> {
        self.get_json("", || "category list".to_string())
    }

    fn list_ports(&self, include_metadata: bool) -> Result<Vec<PortSummary>> {
        let mut ports: Vec<PortSummary> = if include_metadata {
            self.get_json("all/?meta", || "port list".to_string())?
        } else {
            let names: Vec<String> = self.get_json("all/", || "port list".to_string())?;
            names.into_iter().map(PortSummary::named).collect()
        };

        // Stable, so ports keep catalog order within a category.
        if include_metadata {
            ports.sort_by(|a, b| a.category.cmp(&b.category));
        } else {
            ports.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(ports)
    }

    fn port(&self, name: &str) -> Result<PortMetadata> {
        self.get_json(&format!("all/{}", name), || format!("port '{}'", name))
    }

    fn versions(&self, port: &str) -> Result<Vec<String>> {
        self.get_json(&format!("all/{}/", port), || format!("port '{}'", port))
    }

    fn revisions(&self, port: &str, version: &str) -> Result<Vec<String>> {
        self.get_json(&format!("all/{}/{}/", port, version), || {
            format!("port {}-{}", port, version)
        })
    }

    fn recipe(&self, id: &RecipeId) -> Result<Recipe> {
        let url = self.url(&format!("all/{}/{}/{}", id.port, id.version, id.revision));
        let text = self
            .get(&url, || format!("port {}", id))?
            .text()
            .with_context(|| format!("failed to read recipe from {}", url))?;

        let filename = format!("{}.{}", id.base_name(), RECIPE_EXTENSION);
        let descriptor = RecipeDescriptor::parse(&text, &filename, ScriptOrigin::Embedded)?;
        let scripts = EmbeddedScripts::from_descriptor(&descriptor);

        Ok(Recipe::new(
            id.clone(),
            descriptor,
            Box::new(scripts),
            &self.build_root,
        ))
    }

    fn update(&self) -> Result<()> {
        anyhow::bail!(
            "the remote catalog at {} has no local tree to update; use `--local`",
            self.base_url
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::port_error;
    use crate::test_support::RecipeText;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use tempfile::TempDir;

    fn catalog(server: &MockServer, tmp: &TempDir) -> RemoteCatalog {
        RemoteCatalog::new(server.url("/bep/"), tmp.path().join("work")).unwrap()
    }

    #[test]
    fn test_list_ports_sorted_by_name() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bep/all/");
            then.status(200).body(r#"["zlib", "bar", "foo"]"#);
        });

        let tmp = TempDir::new().unwrap();
        let names: Vec<String> = catalog(&server, &tmp)
            .list_ports(false)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["bar", "foo", "zlib"]);
    }

    #[test]
    fn test_list_ports_with_metadata_sorted_by_category() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bep/all/").query_param_exists("meta");
            then.status(200).body(
                r#"[{"name": "zlib", "category": "sys-libs"},
                    {"name": "foo", "category": "dev-libs"},
                    {"name": "bar", "category": "sys-libs"}]"#,
            );
        });

        let tmp = TempDir::new().unwrap();
        let listed: Vec<String> = catalog(&server, &tmp)
            .list_ports(true)
            .unwrap()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(listed, vec!["dev-libs/foo", "sys-libs/zlib", "sys-libs/bar"]);
    }

    #[test]
    fn test_port_metadata() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bep/all/foo");
            then.status(200).body(
                r#"{"name": "foo", "category": "dev-libs",
                    "description": "Foo library", "homepage": "http://foo.org"}"#,
            );
        });

        let tmp = TempDir::new().unwrap();
        let meta = catalog(&server, &tmp).port("foo").unwrap();
        assert_eq!(meta.id().to_string(), "dev-libs/foo");
        assert_eq!(meta.description.as_deref(), Some("Foo library"));
        assert!(meta.license.is_none());
    }

    #[test]
    fn test_missing_port_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bep/all/nope");
            then.status(404);
        });

        let tmp = TempDir::new().unwrap();
        let err = catalog(&server, &tmp).port("nope").unwrap_err();
        assert!(port_error(&err).is_some_and(PortError::is_not_found));
        assert_eq!(err.to_string(), "port 'nope' not found");
    }

    #[test]
    fn test_server_error_is_connection_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bep/");
            then.status(503);
        });

        let tmp = TempDir::new().unwrap();
        let err = catalog(&server, &tmp).categories().unwrap_err();
        assert!(matches!(port_error(&err), Some(PortError::Connection { .. })));
    }

    #[test]
    fn test_unreachable_host_is_connection_error() {
        let tmp = TempDir::new().unwrap();
        let catalog = RemoteCatalog::new("http://127.0.0.1:1/bep", tmp.path()).unwrap();
        let err = catalog.versions("foo").unwrap_err();
        assert!(matches!(port_error(&err), Some(PortError::Connection { .. })));
    }

    #[test]
    fn test_versions_and_revisions() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bep/all/foo/");
            then.status(200).body(r#"["1.2", "1.3"]"#);
        });
        server.mock(|when, then| {
            when.method(GET).path("/bep/all/foo/1.2/");
            then.status(200).body(r#"["1", "2"]"#);
        });

        let tmp = TempDir::new().unwrap();
        let catalog = catalog(&server, &tmp);
        assert_eq!(catalog.versions("foo").unwrap(), vec!["1.2", "1.3"]);
        assert_eq!(catalog.revisions("foo", "1.2").unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_recipe_is_parsed_without_creating_build_dir() {
        let server = MockServer::start();
        let text = RecipeText::new("http://example.org/foo-1.2.tar.gz").render();
        server.mock(|when, then| {
            when.method(GET).path("/bep/all/foo/1.2/1");
            then.status(200).body(text.as_str());
        });
        server.mock(|when, then| {
            when.method(GET).path("/bep/all/bar/9.9/1");
            then.status(404);
        });

        let tmp = TempDir::new().unwrap();
        let catalog = catalog(&server, &tmp);

        let recipe = catalog.recipe(&RecipeId::new("foo", "1.2", "1")).unwrap();
        assert_eq!(
            recipe.descriptor().src_uri,
            vec!["http://example.org/foo-1.2.tar.gz"]
        );
        assert!(!recipe.build_dir().exists());

        let err = catalog.recipe(&RecipeId::new("bar", "9.9", "1")).unwrap_err();
        assert!(port_error(&err).is_some_and(PortError::is_not_found));
        assert!(!tmp.path().join("work").join("bar-9.9-1").exists());
    }
}
