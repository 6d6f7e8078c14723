use crate::error::{Error, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const BINARY_SNIFF_LEN: usize = 8192;
const HEADER_RULE_WIDTH: usize = 20;

/// A group member file that was found on disk and read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFile {
    /// Path as written in the group configuration
    pub requested: String,

    /// Path where the file was actually found
    pub found_at: PathBuf,

    /// UTF-8 file content
    pub content: String,
}

impl LocatedFile {
    /// Reads the file found at `found_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, looks binary, or is not
    /// valid UTF-8.
    pub fn load(requested: impl Into<String>, found_at: impl Into<PathBuf>) -> Result<Self> {
        let found_at = found_at.into();
        let content = read_text(&found_at)?;

        Ok(Self {
            requested: requested.into(),
            found_at,
            content,
        })
    }

    /// Appends the header and content of this file to `buf`.
    pub fn append_to(&self, buf: &mut String) {
        let _ = write!(
            buf,
            "Filename: {} (found at {})\n{}\n{}\n\n",
            self.requested,
            self.found_at.display(),
            "-".repeat(HEADER_RULE_WIDTH),
            self.content
        );
    }
}

/// Concatenates files into the combined content substituted into prompts.
#[must_use]
pub fn combine(files: &[LocatedFile]) -> String {
    let mut combined = String::new();
    for file in files {
        file.append_to(&mut combined);
    }
    combined
}

/// Reads a text file, rejecting binary content and invalid UTF-8.
pub(crate) fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;

    let sample = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if memchr::memchr(0, sample).is_some() {
        return Err(Error::Binary {
            path: path.to_path_buf(),
        });
    }

    String::from_utf8(bytes).map_err(|_| Error::invalid_utf8(path))
}
