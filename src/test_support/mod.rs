//! Test utilities and doubles for portbuild unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use portbuild::test_support::{archives, RecipeText, TreeFixture};
//!
//! #[test]
//! fn test_example() {
//!     let tree = TreeFixture::new();
//!     tree.port("dev-libs", "foo", "1.2", "1", &RecipeText::new("http://x/foo.tar").render());
//! }
//! ```

pub mod archives;
pub mod fixtures;

use std::cell::RefCell;

use anyhow::Result;
use md5::{Digest, Md5};

use crate::recipe::{Prompter, ToolInstaller};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Lowercase hex MD5 of a byte slice.
pub fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Answers every question the same way and remembers what was asked.
#[derive(Debug, Default)]
pub struct FixedPrompter {
    answer: bool,
    asked: RefCell<Vec<String>>,
}

impl FixedPrompter {
    pub fn new(answer: bool) -> Self {
        FixedPrompter {
            answer,
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Prompter for FixedPrompter {
    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool> {
        self.asked.borrow_mut().push(prompt.to_string());
        Ok(self.answer)
    }
}

/// Records install requests without running anything.
#[derive(Debug, Default)]
pub struct RecordingInstaller {
    installed: RefCell<Vec<String>>,
}

impl RecordingInstaller {
    pub fn installed(&self) -> Vec<String> {
        self.installed.borrow().clone()
    }
}

impl ToolInstaller for RecordingInstaller {
    fn command(&self) -> &str {
        "recording-installer"
    }

    fn install(&self, package: &str) -> Result<()> {
        self.installed.borrow_mut().push(package.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_hex() {
        assert_eq!(md5_hex(b"hello"), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_fixed_prompter_records() {
        let prompter = FixedPrompter::new(true);
        assert!(prompter.confirm("Continue?", false).unwrap());
        assert_eq!(prompter.asked(), vec!["Continue?"]);
    }
}
