//! Best-effort removal of uploaded product images.

use std::path::{Component, Path, PathBuf};

/// Removes an image file after its product is gone.
///
/// Fire-and-forget: callers are never told whether the removal worked.
pub trait ImageRemover: Send + Sync {
    fn schedule_removal(&self, image: &str);
}

/// Removes images from a local upload directory.
#[derive(Debug, Clone)]
pub struct FsImageRemover {
    root: PathBuf,
}

impl FsImageRemover {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a stored image path onto the upload directory.
    ///
    /// Stored paths are relative (`uploads/image-1.png`); a leading component
    /// equal to the upload directory's own name is dropped. Absolute paths and
    /// paths containing `..` resolve to `None`.
    pub fn resolve(&self, image: &str) -> Option<PathBuf> {
        let path = Path::new(image.trim());
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        if parts.len() > 1 && self.root.file_name() == Some(parts[0]) {
            parts.remove(0);
        }
        if parts.is_empty() {
            return None;
        }

        Some(parts.into_iter().fold(self.root.clone(), |acc, p| acc.join(p)))
    }
}

impl ImageRemover for FsImageRemover {
    fn schedule_removal(&self, image: &str) {
        let Some(path) = self.resolve(image) else {
            tracing::warn!(image, "refusing to remove image outside the upload directory");
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        tracing::warn!(path = %path.display(), error = %e, "failed to remove image");
                    }
                });
            }
            Err(_) => {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove image");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn resolves_relative_paths_under_the_root() {
        let remover = FsImageRemover::new("/srv/uploads");
        assert_eq!(
            remover.resolve("uploads/image-1.png"),
            Some(PathBuf::from("/srv/uploads/image-1.png"))
        );
        assert_eq!(
            remover.resolve("image-1.png"),
            Some(PathBuf::from("/srv/uploads/image-1.png"))
        );
        assert_eq!(
            remover.resolve("./2024/image-1.png"),
            Some(PathBuf::from("/srv/uploads/2024/image-1.png"))
        );
    }

    #[test]
    fn refuses_escaping_paths() {
        let remover = FsImageRemover::new("/srv/uploads");
        assert_eq!(remover.resolve("/etc/passwd"), None);
        assert_eq!(remover.resolve("uploads/../../etc/passwd"), None);
        assert_eq!(remover.resolve(""), None);
        assert_eq!(remover.resolve("uploads"), Some(PathBuf::from("/srv/uploads/uploads")));
    }

    #[test]
    fn removes_synchronously_without_a_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.png");
        std::fs::write(&file, b"png").unwrap();

        FsImageRemover::new(dir.path()).schedule_removal("a.png");
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn removes_in_the_background_on_a_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("b.png");
        std::fs::write(&file, b"png").unwrap();

        FsImageRemover::new(dir.path()).schedule_removal("b.png");
        for _ in 0..50 {
            if !file.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("image was not removed");
    }

    #[test]
    fn missing_files_are_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        FsImageRemover::new(dir.path()).schedule_removal("missing.png");
    }
}
