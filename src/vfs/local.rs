//! Local disk backend
//!
//! Maps the [`FileSystem`] capability onto `std::fs`/`tokio::fs`. Paths are
//! passed through as given (absolute or relative to the working directory).

use crate::vfs::{FileSystem, VfsError, VfsResult, WalkEntry, WalkErrorHandler};
use async_trait::async_trait;
use std::path::Path;

/// Storage backend over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn map_io(path: &str, error: std::io::Error) -> VfsError {
    match error.kind() {
        std::io::ErrorKind::NotFound => VfsError::NotFound(path.to_string()),
        std::io::ErrorKind::AlreadyExists => VfsError::AlreadyExists(path.to_string()),
        _ => VfsError::Io {
            path: path.to_string(),
            source: error,
        },
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read(&self, path: &str) -> VfsResult<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| map_io(path, e))
    }

    async fn write(&self, path: &str, data: &[u8]) -> VfsResult<()> {
        tokio::fs::write(path, data)
            .await
            .map_err(|e| map_io(path, e))
    }

    async fn exists(&self, path: &str) -> VfsResult<bool> {
        match tokio::fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_io(path, e)),
        }
    }

    async fn is_dir(&self, path: &str) -> VfsResult<bool> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_io(path, e)),
        }
    }

    async fn mkdirs(&self, path: &str, exist_ok: bool) -> VfsResult<()> {
        if !exist_ok && Path::new(path).exists() {
            return Err(VfsError::AlreadyExists(path.to_string()));
        }
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| map_io(path, e))
    }

    async fn delete(&self, path: &str, recursive: bool) -> VfsResult<()> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| map_io(path, e))?;
        if meta.is_dir() {
            if recursive {
                tokio::fs::remove_dir_all(path)
                    .await
                    .map_err(|e| map_io(path, e))
            } else {
                tokio::fs::remove_dir(path).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::DirectoryNotEmpty {
                        VfsError::DirectoryNotEmpty(path.to_string())
                    } else {
                        map_io(path, e)
                    }
                })
            }
        } else {
            tokio::fs::remove_file(path)
                .await
                .map_err(|e| map_io(path, e))
        }
    }

    async fn walk(&self, root: &str, on_error: WalkErrorHandler<'_>) -> Vec<WalkEntry> {
        let mut entries = Vec::new();
        let mut stack = vec![root.trim_end_matches('/').to_string()];

        while let Some(dir) = stack.pop() {
            let read_dir = match std::fs::read_dir(&dir) {
                Ok(rd) => rd,
                Err(e) => {
                    on_error(&map_io(&dir, e));
                    continue;
                }
            };

            let mut subdirs = Vec::new();
            let mut files = Vec::new();
            for entry in read_dir {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        on_error(&map_io(&dir, e));
                        continue;
                    }
                };
                let name = entry.file_name().to_string_lossy().to_string();
                match entry.file_type() {
                    Ok(ft) if ft.is_dir() => subdirs.push(name),
                    Ok(_) => files.push(name),
                    Err(e) => on_error(&map_io(&name, e)),
                }
            }
            subdirs.sort();
            files.sort();

            // Depth-first, first subdirectory visited next
            for subdir in subdirs.iter().rev() {
                stack.push(format!("{dir}/{subdir}"));
            }
            entries.push(WalkEntry {
                dir,
                subdirs,
                files,
            });
        }
        entries
    }
}
