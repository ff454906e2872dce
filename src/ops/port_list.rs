//! Implementation of `portbuild list`, `search` and `about`.

use anyhow::{Context, Result};
use regex::Regex;

use crate::core::{port_error, PortMetadata, PortSummary};
use crate::sources::PortSource;

/// Every port with its category.
pub fn list_ports(source: &dyn PortSource) -> Result<Vec<PortSummary>> {
    source.list_ports(true)
}

/// Ports whose name matches `pattern` anywhere.
pub fn search_ports(source: &dyn PortSource, pattern: &str) -> Result<Vec<PortSummary>> {
    let regex =
        Regex::new(pattern).with_context(|| format!("invalid search pattern `{}`", pattern))?;

    Ok(source
        .list_ports(true)?
        .into_iter()
        .filter(|port| regex.is_match(&port.name))
        .collect())
}

/// Outcome of looking up one port for `about`.
#[derive(Debug)]
pub enum AboutEntry {
    Found(PortMetadata),
    /// The port does not exist; carries the message to show.
    Missing(String),
}

/// Look up each named port. Unknown ports do not stop the rest.
pub fn about(source: &dyn PortSource, names: &[String]) -> Result<Vec<AboutEntry>> {
    let mut entries = Vec::with_capacity(names.len());

    for name in names {
        match source.port(name) {
            Ok(meta) => entries.push(AboutEntry::Found(meta)),
            Err(e) if port_error(&e).is_some_and(|p| p.is_not_found()) => {
                entries.push(AboutEntry::Missing(e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(entries)
}

/// `name - description`, then homepage and license on indented lines.
pub fn format_about(meta: &PortMetadata) -> String {
    let mut out = meta.name.clone();
    if let Some(description) = meta.description.as_deref().filter(|d| !d.is_empty()) {
        out.push_str(&format!(" - {}", description));
    }
    if let Some(homepage) = meta.homepage.as_deref().filter(|h| !h.is_empty()) {
        out.push_str(&format!("\n  {}", homepage));
    }
    if let Some(license) = meta.license.as_deref().filter(|l| !l.is_empty()) {
        out.push_str(&format!("\n  license: {}", license));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::LocalTree;
    use crate::test_support::{RecipeText, TreeFixture};
    use tempfile::TempDir;

    fn tree() -> (TreeFixture, TempDir, LocalTree) {
        let fixture = TreeFixture::new();
        let recipe = RecipeText::new("http://example.org/src.tar.gz")
            .description("A library")
            .render();
        fixture.port("dev-libs", "libfoo", "1.0", "1", &recipe);
        fixture.port("dev-libs", "libbar", "2.0", "1", &recipe);
        fixture.port("app-misc", "foobar", "0.3", "1", &recipe);

        let work = TempDir::new().unwrap();
        let tree = LocalTree::new(fixture.path(), "unused", work.path());
        (fixture, work, tree)
    }

    #[test]
    fn test_search_matches_names() {
        let (_fixture, _work, tree) = tree();
        let found: Vec<String> = search_ports(&tree, "foo")
            .unwrap()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(found, vec!["app-misc/foobar", "dev-libs/libfoo"]);

        let anchored = search_ports(&tree, "^lib").unwrap();
        assert_eq!(anchored.len(), 2);
    }

    #[test]
    fn test_search_rejects_bad_pattern() {
        let (_fixture, _work, tree) = tree();
        let err = search_ports(&tree, "(").unwrap_err();
        assert!(err.to_string().contains("invalid search pattern"));
    }

    #[test]
    fn test_about_continues_past_missing_port() {
        let (_fixture, _work, tree) = tree();
        let names = vec!["nope".to_string(), "libfoo".to_string()];
        let entries = about(&tree, &names).unwrap();

        assert!(matches!(&entries[0], AboutEntry::Missing(msg) if msg == "port 'nope' not found"));
        match &entries[1] {
            AboutEntry::Found(meta) => assert_eq!(
                format_about(meta),
                "libfoo - A library\n  http://example.org\n  license: MIT"
            ),
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_format_about_skips_absent_fields() {
        let meta = PortMetadata {
            name: "bare".into(),
            category: "misc".into(),
            ..Default::default()
        };
        assert_eq!(format_about(&meta), "bare");
    }
}
