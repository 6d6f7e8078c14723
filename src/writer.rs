use crate::error::{Error, Result};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

const DEBUG_DIR: &str = "debug";

/// Replaces spaces in a group key so it can be used in a filename.
#[must_use]
pub fn safe_group_name(key: &str) -> String {
    key.replace(' ', "_")
}

/// Places and persists per-group output and debug files.
#[derive(Debug, Clone)]
pub(crate) struct OutputWriter {
    output_dir: PathBuf,
    debug_dir: PathBuf,
}

impl OutputWriter {
    pub(crate) fn new(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        let debug_dir = output_dir.join(DEBUG_DIR);
        Self {
            output_dir,
            debug_dir,
        }
    }

    /// Creates the output directory.
    pub(crate) fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| Error::io(&self.output_dir, e))
    }

    /// `<output_dir>/group_<safe>.txt`
    pub(crate) fn output_path(&self, key: &str) -> PathBuf {
        self.output_dir
            .join(format!("group_{}.txt", safe_group_name(key)))
    }

    /// `<output_dir>/debug/debug_group_<safe>.txt`
    pub(crate) fn debug_path(&self, key: &str) -> PathBuf {
        self.debug_dir
            .join(format!("debug_group_{}.txt", safe_group_name(key)))
    }

    /// Writes the generated answer. The output file doubles as the group's
    /// completion marker, so it only appears once fully written.
    pub(crate) fn write_output(&self, path: &Path, content: &str) -> Result<()> {
        write_file_atomic(path, content)?;
        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    /// Writes the exact prompt sent for `key`, replacing any previous copy.
    pub(crate) fn write_debug(&self, key: &str, prompt: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.debug_dir).map_err(|e| Error::io(&self.debug_dir, e))?;

        let path = self.debug_path(key);
        fs::write(&path, prompt).map_err(|e| Error::io(&path, e))?;
        Ok(path)
    }
}

/// Writes to a sibling temporary file, syncs it, then renames it into place.
fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .sync_all()
        .map_err(|e| Error::io(&temp_path, e))?;

    drop(temp_file);

    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;

    Ok(())
}
