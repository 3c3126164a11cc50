//! Storage backend abstraction
//!
//! The index builder and the index store never touch a concrete filesystem
//! directly; they work against the [`FileSystem`] capability so that local
//! disk, in-memory trees, and object stores are interchangeable:
//!
//! - **read/write**: whole-object byte access
//! - **walk**: recursive listing with an error-handler hook invoked per
//!   failed directory instead of aborting the walk
//! - **mkdirs/delete/exists**: namespace management
//!
//! Paths are `/`-separated strings interpreted by each backend. Listings
//! are sorted so that walk order, and everything derived from it, is
//! deterministic.

mod local;
mod memory;

pub use local::LocalFileSystem;
pub use memory::MemoryFileSystem;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced by storage backends
#[derive(Error, Debug)]
pub enum VfsError {
    /// Underlying I/O failure, with the path that triggered it
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Path does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Path already exists where it must not
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A directory operation hit a non-directory path
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// Non-recursive delete of a non-empty directory
    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// Path is empty or otherwise unusable for the backend
    #[error("Invalid path: {0:?}")]
    InvalidPath(String),
}

/// Result type alias for backend operations
pub type VfsResult<T> = Result<T, VfsError>;

/// One directory visited during a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path of the visited directory
    pub dir: String,
    /// Names of its immediate subdirectories, sorted
    pub subdirs: Vec<String>,
    /// Names of its immediate files, sorted
    pub files: Vec<String>,
}

/// Handler invoked with each per-directory listing error during a walk
pub type WalkErrorHandler<'a> = &'a (dyn Fn(&VfsError) + Send + Sync);

/// Capability set required from a storage backend
///
/// Any backend satisfying this trait (local disk, memory, object store)
/// can hold source files or index trees.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read the full contents of the object at `path`.
    async fn read(&self, path: &str) -> VfsResult<Vec<u8>>;

    /// Create or overwrite the object at `path`.
    async fn write(&self, path: &str, data: &[u8]) -> VfsResult<()>;

    /// Whether `path` exists as a file or directory.
    async fn exists(&self, path: &str) -> VfsResult<bool>;

    /// Whether `path` exists and is a directory.
    async fn is_dir(&self, path: &str) -> VfsResult<bool>;

    /// Create the directory at `path` and any missing parents.
    async fn mkdirs(&self, path: &str, exist_ok: bool) -> VfsResult<()>;

    /// Delete the file or directory at `path`.
    async fn delete(&self, path: &str, recursive: bool) -> VfsResult<()>;

    /// Recursively list the tree under `root`, depth-first.
    ///
    /// A directory that cannot be listed is reported to `on_error` and
    /// skipped; the walk continues with the remaining siblings and never
    /// fails wholesale. Partial enumeration is a valid outcome.
    async fn walk(&self, root: &str, on_error: WalkErrorHandler<'_>) -> Vec<WalkEntry>;
}

/// Look up a shipped backend by protocol name.
///
/// Returns `None` for protocols this crate has no backend for (e.g. `s3`);
/// callers decide whether that is fatal.
pub fn filesystem_for(protocol: &str) -> Option<Arc<dyn FileSystem>> {
    match protocol {
        "file" | "local" => Some(Arc::new(LocalFileSystem::new())),
        "memory" => Some(Arc::new(MemoryFileSystem::new())),
        _ => None,
    }
}

/// Join two `/`-separated path fragments without doubling separators.
pub fn join_path(base: &str, rel: &str) -> String {
    if base.is_empty() {
        rel.to_string()
    } else if rel.is_empty() {
        base.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            rel.trim_start_matches('/')
        )
    }
}

/// Split a path into its parent directory and final component.
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", path),
    }
}
