//! Fixtures for recipe documents and local ports trees.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Builder for recipe document text.
#[derive(Debug, Clone)]
pub struct RecipeText {
    src_uri: String,
    md5: Option<String>,
    message: Option<String>,
    patch: Option<String>,
    build: Vec<String>,
    install: Vec<String>,
    test: Vec<String>,
    description: String,
}

impl RecipeText {
    /// A valid document whose scripts do nothing.
    pub fn new(src_uri: &str) -> Self {
        RecipeText {
            src_uri: src_uri.to_string(),
            md5: None,
            message: None,
            patch: None,
            build: vec!["true".to_string()],
            install: vec!["true".to_string()],
            test: Vec::new(),
            description: "A port used in tests".to_string(),
        }
    }

    pub fn md5(mut self, digest: &str) -> Self {
        self.md5 = Some(digest.to_string());
        self
    }

    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn patch(mut self, diff: &str) -> Self {
        self.patch = Some(diff.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn build(mut self, lines: &[&str]) -> Self {
        self.build = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn install(mut self, lines: &[&str]) -> Self {
        self.install = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn test(mut self, lines: &[&str]) -> Self {
        self.test = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    fn block(out: &mut String, key: &str, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        out.push_str(&format!("{} {{\n", key));
        for line in lines {
            out.push('\t');
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("}\n");
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "DESCRIPTION=\"{}\"\nHOMEPAGE=\"http://example.org\"\nSRC_URI=\"{}\"\n",
            self.description, self.src_uri
        );
        if let Some(md5) = &self.md5 {
            out.push_str(&format!("CHECKSUM_MD5=\"{}\"\n", md5));
        }
        if let Some(message) = &self.message {
            out.push_str(&format!("MESSAGE=\"{}\"\n", message));
        }
        out.push_str("REVISION=\"1\"\nSTATUS_HAIKU=\"stable\"\nLICENSE=\"MIT\"\n");

        Self::block(&mut out, "BUILD", &self.build);
        Self::block(&mut out, "TEST", &self.test);
        Self::block(&mut out, "INSTALL", &self.install);

        if let Some(patch) = &self.patch {
            out.push_str("PATCH {\n");
            out.push_str(patch);
            if !patch.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("}\n");
        }
        out
    }
}

/// A local ports tree in a temporary directory.
#[derive(Debug)]
pub struct TreeFixture {
    dir: TempDir,
}

impl TreeFixture {
    pub fn new() -> Self {
        TreeFixture {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add `<category>/<port>/<port>-<version>-<revision>.bep` and `.build`.
    pub fn port(
        &self,
        category: &str,
        port: &str,
        version: &str,
        revision: &str,
        recipe: &str,
    ) -> PathBuf {
        let dir = self.dir.path().join(category).join(port);
        std::fs::create_dir_all(&dir).unwrap();
        let base = format!("{}-{}-{}", port, version, revision);
        std::fs::write(dir.join(format!("{}.bep", base)), recipe).unwrap();
        std::fs::write(dir.join(format!("{}.build", base)), "true\n").unwrap();
        dir
    }

    /// Write an extra file beside a port's recipes.
    pub fn file(&self, category: &str, port: &str, name: &str, content: &str) {
        let path = self.dir.path().join(category).join(port).join(name);
        std::fs::write(path, content).unwrap();
    }
}

impl Default for TreeFixture {
    fn default() -> Self {
        Self::new()
    }
}
