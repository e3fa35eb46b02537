//! Scratch directory acting as the engine's virtual filesystem.
//!
//! A [`Workspace`] owns a temporary directory. Files are addressed by flat
//! names only; anything that could escape the directory is refused. The
//! directory and everything in it is removed when the workspace is dropped.

use std::path::{Component, Path, PathBuf};

use rp_core::{Error, Result};
use tempfile::TempDir;

pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a new workspace inside `parent`, or the system temp directory.
    pub fn new(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("reelpress-");
        let temp_dir = match parent {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(|e| Error::tool("workspace", format!("failed to create temp dir: {e}")))?;

        tracing::debug!("Created workspace {}", temp_dir.path().display());
        Ok(Self { temp_dir })
    }

    /// Path to the workspace directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Map a flat name to a path inside the workspace.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() {
            return Err(Error::Validation("file name must not be empty".into()));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(Error::Validation(format!(
                "file name must not contain path separators: {name}"
            )));
        }
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.temp_dir.path().join(name)),
            _ => Err(Error::Validation(format!("invalid file name: {name}"))),
        }
    }

    pub async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::not_found("file", name)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn contains(&self, name: &str) -> Result<bool> {
        let path = self.resolve(name)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::not_found("file", name)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read() {
        let ws = Workspace::new(None).unwrap();
        ws.write("input", b"bytes").await.unwrap();
        assert!(ws.contains("input").await.unwrap());
        assert_eq!(ws.read("input").await.unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let ws = Workspace::new(None).unwrap();
        let err = ws.read("nope.mp4").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn remove_deletes_file() {
        let ws = Workspace::new(None).unwrap();
        ws.write("a", b"1").await.unwrap();
        ws.remove("a").await.unwrap();
        assert!(!ws.contains("a").await.unwrap());
        assert!(matches!(ws.remove("a").await, Err(Error::NotFound { .. })));
    }

    #[test]
    fn rejects_unsafe_names() {
        let ws = Workspace::new(None).unwrap();
        for name in ["", "..", ".", "../etc/passwd", "a/b", "/abs", "a\\b"] {
            assert!(
                matches!(ws.resolve(name), Err(Error::Validation(_))),
                "accepted {name:?}"
            );
        }
    }

    #[test]
    fn accepts_uuid_names() {
        let ws = Workspace::new(None).unwrap();
        let p = ws.resolve("3f1c2b9e-8a51-4c1e-9d0a-5b7c2e4f6a80.webm").unwrap();
        assert!(p.starts_with(ws.path()));
    }

    #[test]
    fn created_inside_parent_and_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let ws = Workspace::new(Some(parent.path())).unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.starts_with(parent.path()));
        assert!(path.exists());
        drop(ws);
        assert!(!path.exists());
    }
}
