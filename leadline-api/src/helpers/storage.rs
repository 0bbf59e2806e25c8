use std::io;
use std::path::{Component, Path, PathBuf};

/// True for a non-empty relative path with no `..`, root or prefix component.
pub fn is_store_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// File access for call recordings. Paths are relative to the store.
pub trait ArtifactStorage: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Moves a file, creating the destination directory when needed.
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// Recordings on the local filesystem under a root directory.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Only paths that stay under the root resolve.
    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        if !is_store_relative(path) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is outside the recording store", path.display()),
            ));
        }
        Ok(self.root.join(path))
    }
}

impl ArtifactStorage for LocalStorage {
    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(from, to)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let path = self.resolve(path)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }
}
