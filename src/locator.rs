use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Finds group member files under a base directory.
///
/// A configured path is first tried as-is relative to the base directory.
/// When that misses, the whole tree is searched for a file with the same
/// final component. If several files share that name, the shallowest one
/// wins, and among equally deep matches the lexicographically smallest path
/// wins, so the result does not depend on platform directory order.
/// Symlinks to files match like regular files, but symlinked directories are
/// not followed.
#[derive(Debug, Clone)]
pub struct FileLocator {
    base_dir: PathBuf,
}

impl FileLocator {
    /// Creates a locator rooted at `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the base directory searched by this locator.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Locates `relative`, returning the path where it was found.
    #[must_use]
    pub fn locate(&self, relative: &str) -> Option<PathBuf> {
        let direct = self.base_dir.join(relative);
        if direct.is_file() {
            trace!("Found {} at {}", relative, direct.display());
            return Some(direct);
        }

        let target = Path::new(relative).file_name()?;
        let found = self.search(target);
        if let Some(ref path) = found {
            debug!("Found {} by name at {}", relative, path.display());
        }
        found
    }

    fn search(&self, target: &OsStr) -> Option<PathBuf> {
        let root = if self.base_dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.base_dir.as_path()
        };

        let mut best: Option<(usize, PathBuf)> = None;
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Walk error: {}", e);
                    continue;
                }
            };

            if entry.file_name() != target || !is_file_entry(&entry) {
                continue;
            }

            let depth = entry.depth();
            if best.as_ref().is_none_or(|(best_depth, _)| depth < *best_depth) {
                best = Some((depth, entry.into_path()));
                // Direct children of the root cannot be beaten.
                if depth <= 1 {
                    break;
                }
            }
        }

        best.map(|(_, path)| path)
    }
}

/// Regular files, and symlinks that resolve to one. Symlinked directories
/// are listed but never descended into.
fn is_file_entry(entry: &walkdir::DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}
