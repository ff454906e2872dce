//! Recipe documents and their validated descriptor.
//!
//! A recipe document is shell-like text:
//!
//! ```text
//! DESCRIPTION="A small library"
//! HOMEPAGE="http://example.org"
//! SRC_URI="http://example.org/foo-1.2.tar.gz"
//! CHECKSUM_MD5="d41d8cd98f00b204e9800998ecf8427e"
//! STATUS_HAIKU="stable"
//! LICENSE="MIT"
//! BUILD {
//!     cd foo-1.2
//!     make
//! }
//! INSTALL {
//!     cd foo-1.2
//!     make install
//! }
//! ```
//!
//! Parsing happens once; the resulting [`RecipeDescriptor`] is read-only
//! to the build pipeline.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::error::PortError;

/// Stability tier a recipe declares in `STATUS_HAIKU`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Untested,
    Broken,
    Unstable,
    Stable,
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "untested" => Ok(Status::Untested),
            "broken" => Ok(Status::Broken),
            "unstable" => Ok(Status::Unstable),
            "stable" => Ok(Status::Stable),
            other => Err(format!(
                "STATUS_HAIKU must be one of untested, broken, unstable, stable; got '{}'",
                other
            )),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Untested => "untested",
            Status::Broken => "broken",
            Status::Unstable => "unstable",
            Status::Stable => "stable",
        };
        f.write_str(s)
    }
}

/// Digest algorithm of a reference checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha256,
}

impl ChecksumAlgorithm {
    fn hex_len(self) -> usize {
        match self {
            ChecksumAlgorithm::Md5 => 32,
            ChecksumAlgorithm::Sha256 => 64,
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumAlgorithm::Md5 => f.write_str("md5"),
            ChecksumAlgorithm::Sha256 => f.write_str("sha256"),
        }
    }
}

/// A reference digest for the source archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    pub digest: String,
}

/// An ordered list of shell command lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    lines: Vec<String>,
}

impl Script {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Script {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Split text on newlines.
    pub fn from_text(text: &str) -> Self {
        Script::from_lines(text.lines())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// True when the script has no line with a command on it.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }
}

/// Where the build/test/install scripts of a recipe come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOrigin {
    /// Scripts are embedded in the document; BUILD and INSTALL are required.
    Embedded,
    /// Scripts live in files beside the document; BUILD and INSTALL are
    /// not required.
    External,
}

/// The validated contents of a recipe document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDescriptor {
    pub description: String,
    pub homepage: String,
    pub src_uri: Vec<String>,
    pub license: Vec<String>,
    pub status: Status,
    pub depend: Vec<String>,
    pub checksum: Option<Checksum>,
    pub build: Option<Script>,
    pub install: Option<Script>,
    pub test: Option<Script>,
    pub message: Option<String>,
    pub patch: Option<String>,
    pub revision: Option<String>,
    pub portrev_description: Option<String>,
    pub copyright: Vec<String>,
}

impl RecipeDescriptor {
    /// Load and validate a recipe document from disk.
    pub fn load(path: &Path, origin: ScriptOrigin) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recipe: {}", path.display()))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::parse(&content, &name, origin)?)
    }

    /// Parse and validate recipe text. `name` is used in error messages.
    pub fn parse(content: &str, name: &str, origin: ScriptOrigin) -> Result<Self, PortError> {
        let invalid = |reason: String| PortError::InvalidRecipe {
            recipe: name.to_string(),
            reason,
        };

        let entries = tokenize(content).map_err(invalid)?;
        let keys = KeyTable::new(entries).map_err(invalid)?;

        let description = keys.required_text("DESCRIPTION").map_err(invalid)?;
        let homepage = keys.required_text("HOMEPAGE").map_err(invalid)?;
        let src_uri = keys.required_list("SRC_URI").map_err(invalid)?;
        let license = keys.required_list("LICENSE").map_err(invalid)?;
        let status = keys
            .required_text("STATUS_HAIKU")
            .map_err(invalid)?
            .parse::<Status>()
            .map_err(invalid)?;

        let (build, install) = match origin {
            ScriptOrigin::Embedded => (
                Some(keys.required_script("BUILD").map_err(invalid)?),
                Some(keys.required_script("INSTALL").map_err(invalid)?),
            ),
            ScriptOrigin::External => (
                keys.optional_script("BUILD").map_err(invalid)?,
                keys.optional_script("INSTALL").map_err(invalid)?,
            ),
        };
        let test = keys.optional_script("TEST").map_err(invalid)?;

        let checksum = match keys.optional_text("CHECKSUM_SHA256").map_err(invalid)? {
            Some(digest) => Some(checksum(ChecksumAlgorithm::Sha256, digest).map_err(invalid)?),
            None => match keys.optional_text("CHECKSUM_MD5").map_err(invalid)? {
                Some(digest) => Some(checksum(ChecksumAlgorithm::Md5, digest).map_err(invalid)?),
                None => None,
            },
        };

        Ok(RecipeDescriptor {
            description,
            homepage,
            src_uri,
            license,
            status,
            depend: keys.optional_list("DEPEND").map_err(invalid)?,
            checksum,
            build,
            install,
            test,
            message: keys.optional_text("MESSAGE").map_err(invalid)?,
            patch: keys.optional_block_text("PATCH").map_err(invalid)?,
            revision: keys.optional_text("REVISION").map_err(invalid)?,
            portrev_description: keys.optional_text("PORTREV_DESCRIPTION").map_err(invalid)?,
            copyright: keys.optional_list("COPYRIGHT").map_err(invalid)?,
        })
    }

    /// The license list joined for display.
    pub fn license_display(&self) -> String {
        self.license.join(", ")
    }
}

fn checksum(algorithm: ChecksumAlgorithm, digest: String) -> Result<Checksum, String> {
    let digest = digest.trim().to_string();
    if digest.len() != algorithm.hex_len() || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!(
            "{} checksum must be {} hex characters, got '{}'",
            algorithm,
            algorithm.hex_len(),
            digest
        ));
    }
    Ok(Checksum { algorithm, digest })
}

/// A raw value before schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawValue {
    Text(String),
    Block(Vec<String>),
}

fn is_key(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Split a document into `(key, value, line)` entries.
fn tokenize(content: &str) -> Result<Vec<(String, RawValue, usize)>, String> {
    let lines: Vec<&str> = content.lines().collect();
    let mut entries = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line_no = i + 1;
        let trimmed = lines[i].trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            i += 1;
            continue;
        }

        if let Some(head) = trimmed.strip_suffix('{') {
            let key = head.trim();
            if !is_key(key) {
                return Err(format!("line {}: invalid block name '{}'", line_no, key));
            }

            let mut depth = 1usize;
            let mut body = Vec::new();
            i += 1;
            loop {
                let Some(line) = lines.get(i) else {
                    return Err(format!("line {}: block {} is never closed", line_no, key));
                };
                i += 1;
                if depth == 1 && line.trim() == "}" {
                    break;
                }
                for c in line.chars() {
                    match c {
                        '{' => depth += 1,
                        '}' => depth = depth.saturating_sub(1).max(1),
                        _ => {}
                    }
                }
                body.push(line.to_string());
            }
            entries.push((key.to_string(), RawValue::Block(body), line_no));
            continue;
        }

        let Some((key, rest)) = trimmed.split_once('=') else {
            return Err(format!(
                "line {}: expected KEY=\"value\" or KEY {{ ... }}",
                line_no
            ));
        };
        let key = key.trim();
        if !is_key(key) {
            return Err(format!("line {}: invalid key '{}'", line_no, key));
        }

        let rest = rest.trim_start();
        let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'');
        let Some(quote) = quote else {
            entries.push((key.to_string(), RawValue::Text(rest.trim().to_string()), line_no));
            i += 1;
            continue;
        };

        // Quoted value, possibly spanning lines.
        let mut value = String::new();
        let mut chars: Vec<char> = rest[1..].chars().collect();
        let mut closed = false;
        loop {
            let mut j = 0;
            while j < chars.len() {
                let c = chars[j];
                if quote == '"' && c == '\\' && j + 1 < chars.len() {
                    let next = chars[j + 1];
                    if next == '"' || next == '\\' {
                        value.push(next);
                        j += 2;
                        continue;
                    }
                }
                if c == quote {
                    closed = true;
                    let trailing: String = chars[j + 1..].iter().collect();
                    let trailing = trailing.trim();
                    if !trailing.is_empty() && !trailing.starts_with('#') {
                        return Err(format!(
                            "line {}: unexpected text after value of {}",
                            i + 1,
                            key
                        ));
                    }
                    break;
                }
                value.push(c);
                j += 1;
            }
            i += 1;
            if closed {
                break;
            }
            let Some(next) = lines.get(i) else {
                return Err(format!("line {}: unterminated value for {}", line_no, key));
            };
            value.push('\n');
            chars = next.chars().collect();
        }

        entries.push((key.to_string(), RawValue::Text(value), line_no));
    }

    Ok(entries)
}

const KNOWN_KEYS: &[&str] = &[
    "DESCRIPTION",
    "HOMEPAGE",
    "SRC_URI",
    "LICENSE",
    "STATUS_HAIKU",
    "BUILD",
    "INSTALL",
    "TEST",
    "CHECKSUM_MD5",
    "CHECKSUM_SHA256",
    "DEPEND",
    "MESSAGE",
    "PATCH",
    "REVISION",
    "PORTREV_DESCRIPTION",
    "COPYRIGHT",
];

/// Raw entries indexed by key, consumed as the schema is applied.
struct KeyTable {
    values: HashMap<String, RawValue>,
}

impl KeyTable {
    fn new(entries: Vec<(String, RawValue, usize)>) -> Result<Self, String> {
        let mut values = HashMap::new();
        for (key, value, line) in entries {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                return Err(format!("line {}: unknown key {}", line, key));
            }
            if values.insert(key.clone(), value).is_some() {
                return Err(format!("line {}: {} is declared more than once", line, key));
            }
        }
        Ok(KeyTable { values })
    }

    fn get(&self, key: &str) -> Option<&RawValue> {
        self.values.get(key)
    }

    fn optional_text(&self, key: &str) -> Result<Option<String>, String> {
        match self.get(key) {
            None => Ok(None),
            Some(RawValue::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(RawValue::Text(text)) => Ok(Some(text.trim().to_string())),
            Some(RawValue::Block(_)) => Err(format!("{} must be a quoted value, not a block", key)),
        }
    }

    fn required_text(&self, key: &str) -> Result<String, String> {
        self.optional_text(key)?
            .ok_or_else(|| format!("required key {} is missing or empty", key))
    }

    fn optional_list(&self, key: &str) -> Result<Vec<String>, String> {
        Ok(self
            .optional_text(key)?
            .map(|text| {
                text.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn required_list(&self, key: &str) -> Result<Vec<String>, String> {
        let list = self.optional_list(key)?;
        if list.is_empty() {
            return Err(format!("required key {} is missing or empty", key));
        }
        Ok(list)
    }

    fn optional_script(&self, key: &str) -> Result<Option<Script>, String> {
        let script = match self.get(key) {
            None => return Ok(None),
            Some(RawValue::Block(lines)) => Script::from_lines(lines.iter().cloned()),
            Some(RawValue::Text(text)) => Script::from_text(text),
        };
        Ok(if script.is_empty() { None } else { Some(script) })
    }

    fn required_script(&self, key: &str) -> Result<Script, String> {
        self.optional_script(key)?
            .ok_or_else(|| format!("required key {} is missing or empty", key))
    }

    /// A block or quoted value kept verbatim, with a trailing newline.
    fn optional_block_text(&self, key: &str) -> Result<Option<String>, String> {
        let text = match self.get(key) {
            None => return Ok(None),
            Some(RawValue::Block(lines)) => {
                let mut text = lines.join("\n");
                text.push('\n');
                text
            }
            Some(RawValue::Text(text)) => format!("{}\n", text),
        };
        Ok(if text.trim().is_empty() { None } else { Some(text) })
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE: &str = r#"
# A comment line
DESCRIPTION="A small library
spanning two lines"
HOMEPAGE="http://example.org"
SRC_URI="http://example.org/foo-1.2.tar.gz
http://mirror.example.org/foo-1.2.tar.gz"
CHECKSUM_MD5="D41D8CD98F00B204E9800998ECF8427E"
REVISION="1"
STATUS_HAIKU="stable"
DEPEND="bar >= 1.0
        baz"
BUILD {
	cd foo-1.2
	if [ -f Makefile ]; then
		make
	fi
}
INSTALL {
	cd foo-1.2
	make install
}
LICENSE="MIT"
COPYRIGHT="2001 Somebody"
"#;

    #[test]
    fn test_parse_full_recipe() {
        let d = RecipeDescriptor::parse(RECIPE, "foo-1.2-1.bep", ScriptOrigin::Embedded).unwrap();

        assert_eq!(d.description, "A small library\nspanning two lines");
        assert_eq!(d.homepage, "http://example.org");
        assert_eq!(d.src_uri.len(), 2);
        assert_eq!(d.status, Status::Stable);
        assert_eq!(d.depend, vec!["bar >= 1.0", "baz"]);
        assert_eq!(d.license, vec!["MIT"]);
        assert_eq!(d.revision.as_deref(), Some("1"));
        assert!(d.message.is_none());
        assert!(d.patch.is_none());
        assert!(d.test.is_none());

        let checksum = d.checksum.unwrap();
        assert_eq!(checksum.algorithm, ChecksumAlgorithm::Md5);
        assert_eq!(checksum.digest, "D41D8CD98F00B204E9800998ECF8427E");

        let build = d.build.unwrap();
        assert_eq!(build.lines().len(), 4);
        assert_eq!(build.lines()[0], "\tcd foo-1.2");
        assert_eq!(build.lines()[3], "\tfi");
    }

    #[test]
    fn test_missing_required_key_is_named() {
        let text = RECIPE.replace("HOMEPAGE=\"http://example.org\"\n", "");
        let err = RecipeDescriptor::parse(&text, "foo.bep", ScriptOrigin::Embedded).unwrap_err();
        assert!(err.to_string().contains("HOMEPAGE"));
    }

    #[test]
    fn test_empty_required_key_is_rejected() {
        let text = RECIPE.replace("LICENSE=\"MIT\"", "LICENSE=\"\"");
        let err = RecipeDescriptor::parse(&text, "foo.bep", ScriptOrigin::Embedded).unwrap_err();
        assert!(err.to_string().contains("LICENSE"));
    }

    #[test]
    fn test_invalid_status() {
        let text = RECIPE.replace("\"stable\"", "\"shiny\"");
        let err = RecipeDescriptor::parse(&text, "foo.bep", ScriptOrigin::Embedded).unwrap_err();
        assert!(err.to_string().contains("STATUS_HAIKU"));
    }

    #[test]
    fn test_external_scripts_not_required() {
        let text = RECIPE
            .split("BUILD {")
            .next()
            .unwrap()
            .to_string()
            + "LICENSE=\"MIT\"\n";
        let d = RecipeDescriptor::parse(&text, "foo.bep", ScriptOrigin::External).unwrap();
        assert!(d.build.is_none());

        let err = RecipeDescriptor::parse(&text, "foo.bep", ScriptOrigin::Embedded).unwrap_err();
        assert!(err.to_string().contains("BUILD"));
    }

    #[test]
    fn test_unknown_and_duplicate_keys() {
        let text = format!("{}FLAVOR=\"x\"\n", RECIPE);
        assert!(RecipeDescriptor::parse(&text, "foo.bep", ScriptOrigin::Embedded)
            .unwrap_err()
            .to_string()
            .contains("unknown key FLAVOR"));

        let text = format!("{}HOMEPAGE=\"http://other\"\n", RECIPE);
        assert!(RecipeDescriptor::parse(&text, "foo.bep", ScriptOrigin::Embedded)
            .unwrap_err()
            .to_string()
            .contains("more than once"));
    }

    #[test]
    fn test_escaped_quotes_and_unquoted_values() {
        let text = RECIPE.replace(
            "REVISION=\"1\"",
            "REVISION=1\nMESSAGE=\"Say \\\"yes\\\" to continue\"",
        );
        let d = RecipeDescriptor::parse(&text, "foo.bep", ScriptOrigin::Embedded).unwrap();
        assert_eq!(d.revision.as_deref(), Some("1"));
        assert_eq!(d.message.as_deref(), Some("Say \"yes\" to continue"));
    }

    #[test]
    fn test_patch_block_kept_verbatim() {
        let text = format!(
            "{}PATCH {{\n--- a.c\n+++ a.c\n@@ -1 +1 @@\n-old\n+new\n}}\n",
            RECIPE
        );
        let d = RecipeDescriptor::parse(&text, "foo.bep", ScriptOrigin::Embedded).unwrap();
        assert_eq!(
            d.patch.as_deref(),
            Some("--- a.c\n+++ a.c\n@@ -1 +1 @@\n-old\n+new\n")
        );
    }

    #[test]
    fn test_sha256_preferred_over_md5() {
        let sha = "a".repeat(64);
        let text = RECIPE.replace(
            "REVISION=\"1\"",
            &format!("REVISION=\"1\"\nCHECKSUM_SHA256=\"{}\"", sha),
        );
        let d = RecipeDescriptor::parse(&text, "foo.bep", ScriptOrigin::Embedded).unwrap();
        let checksum = d.checksum.unwrap();
        assert_eq!(checksum.algorithm, ChecksumAlgorithm::Sha256);
        assert_eq!(checksum.digest, sha);
    }

    #[test]
    fn test_malformed_checksum() {
        let text = RECIPE.replace("D41D8CD98F00B204E9800998ECF8427E", "not-a-digest");
        assert!(RecipeDescriptor::parse(&text, "foo.bep", ScriptOrigin::Embedded).is_err());
    }

    #[test]
    fn test_unclosed_block() {
        let text = "BUILD {\n\tmake\n";
        let err = RecipeDescriptor::parse(text, "foo.bep", ScriptOrigin::Embedded).unwrap_err();
        assert!(err.to_string().contains("never closed"));
    }
}
