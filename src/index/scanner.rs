//! Remote source scanner
//!
//! Enumerates candidate source files under a path prefix by walking the
//! remote namespace, filtering by filename suffix. Listing errors never
//! abort a scan: each failed directory is reported and the walk continues,
//! so partial enumeration is a valid outcome.

use crate::index::config::DEFAULT_SOURCE_SUFFIX;
use crate::vfs::{join_path, FileSystem, VfsError, WalkErrorHandler};
use std::sync::Arc;

/// Walks a source tree and yields the files worth indexing.
#[derive(Clone)]
pub struct SourceScanner {
    fs: Arc<dyn FileSystem>,
    root: String,
    suffix: String,
}

fn log_listing_error(error: &VfsError) {
    tracing::warn!(error = %error, "Error scanning source directory");
}

impl SourceScanner {
    /// Scanner over `root` with the default source suffix.
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<String>) -> Self {
        Self {
            fs,
            root: root.into(),
            suffix: DEFAULT_SOURCE_SUFFIX.to_string(),
        }
    }

    /// Builder method: match a different filename suffix
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// The scanned source root
    pub fn root(&self) -> &str {
        &self.root
    }

    /// List matching files under `root[/prefix]` in deterministic walk
    /// order. Each call re-scans; listing errors are logged and skipped.
    pub async fn scan(&self, prefix: Option<&str>) -> Vec<String> {
        self.scan_with(prefix, &log_listing_error).await
    }

    /// [`SourceScanner::scan`] with a caller-supplied listing error handler.
    pub async fn scan_with(
        &self,
        prefix: Option<&str>,
        on_error: WalkErrorHandler<'_>,
    ) -> Vec<String> {
        let root = match prefix {
            Some(prefix) => join_path(&self.root, prefix),
            None => self.root.clone(),
        };

        let mut files = Vec::new();
        for entry in self.fs.walk(&root, on_error).await {
            for file in &entry.files {
                if file.ends_with(&self.suffix) {
                    files.push(join_path(&entry.dir, file));
                }
            }
        }
        files
    }

    /// Group the flat listing into batches of `block_size` (the last batch
    /// may be smaller). Batch boundaries carry no meaning beyond grouping
    /// work for dispatch.
    pub async fn scan_blocks(&self, prefix: Option<&str>, block_size: usize) -> Vec<Vec<String>> {
        let block_size = block_size.max(1);
        self.scan(prefix)
            .await
            .chunks(block_size)
            .map(|chunk| chunk.to_vec())
            .collect()
    }
}

impl std::fmt::Debug for SourceScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceScanner")
            .field("root", &self.root)
            .field("suffix", &self.suffix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{MemoryFileSystem, VfsResult, WalkEntry};
    use async_trait::async_trait;
    use std::sync::Mutex;

    async fn seeded_fs() -> Arc<MemoryFileSystem> {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.write("src/SM/2023/04/a.nc", b"a").await.unwrap();
        fs.write("src/SM/2023/04/b.nc", b"b").await.unwrap();
        fs.write("src/SM/2023/04/skip.txt", b"s").await.unwrap();
        fs.write("src/OS/2023/05/c.nc", b"c").await.unwrap();
        fs.write("src/top.nc", b"t").await.unwrap();
        fs
    }

    #[tokio::test]
    async fn test_scan_filters_by_suffix() {
        let fs = seeded_fs().await;
        let scanner = SourceScanner::new(fs, "src");

        let files = scanner.scan(None).await;
        assert_eq!(
            files,
            vec![
                "src/top.nc",
                "src/OS/2023/05/c.nc",
                "src/SM/2023/04/a.nc",
                "src/SM/2023/04/b.nc",
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_scoped_to_prefix() {
        let fs = seeded_fs().await;
        let scanner = SourceScanner::new(fs, "src");

        let files = scanner.scan(Some("SM")).await;
        assert_eq!(files, vec!["src/SM/2023/04/a.nc", "src/SM/2023/04/b.nc"]);
    }

    #[tokio::test]
    async fn test_scan_with_other_suffix() {
        let fs = seeded_fs().await;
        let scanner = SourceScanner::new(fs, "src").suffix(".txt");

        let files = scanner.scan(None).await;
        assert_eq!(files, vec!["src/SM/2023/04/skip.txt"]);
    }

    #[tokio::test]
    async fn test_scan_is_restartable() {
        let fs = seeded_fs().await;
        let scanner = SourceScanner::new(fs.clone(), "src");

        let first = scanner.scan(Some("SM")).await;
        fs.write("src/SM/2023/04/d.nc", b"d").await.unwrap();
        let second = scanner.scan(Some("SM")).await;
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 3);
    }

    #[tokio::test]
    async fn test_scan_missing_prefix_is_empty_not_fatal() {
        let fs = seeded_fs().await;
        let scanner = SourceScanner::new(fs, "src");

        let errors = Mutex::new(Vec::new());
        let files = scanner
            .scan_with(Some("NOPE"), &|e| {
                errors.lock().unwrap().push(e.to_string());
            })
            .await;
        assert!(files.is_empty());
        assert_eq!(errors.lock().unwrap().len(), 1);
    }

    /// Backend whose walk loses one directory to a listing error.
    struct FlakyFileSystem {
        inner: Arc<MemoryFileSystem>,
        failing_dir: String,
    }

    #[async_trait]
    impl crate::vfs::FileSystem for FlakyFileSystem {
        async fn read(&self, path: &str) -> VfsResult<Vec<u8>> {
            self.inner.read(path).await
        }
        async fn write(&self, path: &str, data: &[u8]) -> VfsResult<()> {
            self.inner.write(path, data).await
        }
        async fn exists(&self, path: &str) -> VfsResult<bool> {
            self.inner.exists(path).await
        }
        async fn is_dir(&self, path: &str) -> VfsResult<bool> {
            self.inner.is_dir(path).await
        }
        async fn mkdirs(&self, path: &str, exist_ok: bool) -> VfsResult<()> {
            self.inner.mkdirs(path, exist_ok).await
        }
        async fn delete(&self, path: &str, recursive: bool) -> VfsResult<()> {
            self.inner.delete(path, recursive).await
        }
        async fn walk(&self, root: &str, on_error: WalkErrorHandler<'_>) -> Vec<WalkEntry> {
            let mut entries = Vec::new();
            for entry in self.inner.walk(root, on_error).await {
                if entry.dir == self.failing_dir {
                    on_error(&VfsError::Io {
                        path: entry.dir.clone(),
                        source: std::io::Error::other("simulated listing failure"),
                    });
                    continue;
                }
                entries.push(entry);
            }
            entries
        }
    }

    #[tokio::test]
    async fn test_listing_error_yields_partial_enumeration() {
        let inner = seeded_fs().await;
        let fs = Arc::new(FlakyFileSystem {
            inner,
            failing_dir: "src/SM/2023/04".to_string(),
        });
        let scanner = SourceScanner::new(fs, "src");

        let errors = Mutex::new(Vec::new());
        let files = scanner
            .scan_with(None, &|e| {
                errors.lock().unwrap().push(e.to_string());
            })
            .await;

        // The failing directory is lost, its siblings are not
        assert_eq!(files, vec!["src/top.nc", "src/OS/2023/05/c.nc"]);
        assert_eq!(errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scan_blocks_groups_listing() {
        let fs = seeded_fs().await;
        let scanner = SourceScanner::new(fs, "src");

        let blocks = scanner.scan_blocks(None, 3).await;
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 3);
        assert_eq!(blocks[1].len(), 1);

        // Flattening the blocks reproduces the flat scan
        let flat: Vec<String> = blocks.into_iter().flatten().collect();
        assert_eq!(flat, scanner.scan(None).await);

        // A zero block size behaves like one
        let blocks = scanner.scan_blocks(None, 0).await;
        assert_eq!(blocks.len(), 4);
    }
}
