//! Index store
//!
//! Owns the index root on a pluggable storage backend: creates and opens
//! the configuration blob, derives manifest paths, and reads/writes the
//! per-file manifest blobs. Recently read manifests can be held in a
//! bounded LRU cache so repeated opens of the same source file skip the
//! backend round trip.

use crate::cache::LruCache;
use crate::index::config::{
    process_env, substitute_json, IndexConfig, INDEX_CONFIG_FILENAME, INDEX_CONFIG_VERSION,
};
use crate::index::error::{IndexError, IndexResult};
use crate::vfs::{join_path, split_parent, FileSystem, VfsError};
use std::sync::Arc;

/// Manifest filename suffix appended to the relative source path.
pub const MANIFEST_SUFFIX: &str = ".json";

/// How an index store was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Manifests may be read but not written
    Read,
    /// Manifests may be read and written
    Write,
}

/// Handle to an index root: configuration plus the manifest tree.
pub struct IndexStore {
    fs: Arc<dyn FileSystem>,
    root: String,
    mode: OpenMode,
    config: IndexConfig,
    /// Disabled (size 0) unless configured via [`IndexStore::with_cache_size`]
    manifest_cache: LruCache<String, Arc<Vec<u8>>>,
}

impl IndexStore {
    /// Create a new index at `root` and return a writable handle.
    ///
    /// Fails with [`IndexError::AlreadyExists`] when the root exists and
    /// `replace` is false; with `replace` the existing root is deleted
    /// first. The configuration blob is written exactly once here.
    pub async fn create(
        fs: Arc<dyn FileSystem>,
        root: &str,
        config: IndexConfig,
        replace: bool,
    ) -> IndexResult<IndexStore> {
        if fs.exists(root).await? {
            if !replace {
                return Err(IndexError::AlreadyExists(root.to_string()));
            }
            fs.delete(root, true).await?;
        }
        fs.mkdirs(root, true).await?;

        let blob = serde_json::to_vec_pretty(&config)?;
        fs.write(&join_path(root, INDEX_CONFIG_FILENAME), &blob)
            .await?;
        tracing::info!(root, source = %config.source_path, "Created index");

        Self::open(fs, root, OpenMode::Write).await
    }

    /// Open the index at `root`.
    ///
    /// Fails with [`IndexError::NotFound`] when the root or its
    /// configuration blob is absent. Placeholders in the configuration are
    /// resolved against the process environment.
    pub async fn open(
        fs: Arc<dyn FileSystem>,
        root: &str,
        mode: OpenMode,
    ) -> IndexResult<IndexStore> {
        if !fs.is_dir(root).await? {
            return Err(IndexError::NotFound(root.to_string()));
        }

        let config_path = join_path(root, INDEX_CONFIG_FILENAME);
        let blob = match fs.read(&config_path).await {
            Ok(blob) => blob,
            Err(VfsError::NotFound(_)) => {
                return Err(IndexError::NotFound(config_path));
            }
            Err(e) => return Err(e.into()),
        };

        let raw: serde_json::Value = serde_json::from_slice(&blob)?;
        let raw = substitute_json(raw, &process_env());
        let config: IndexConfig = serde_json::from_value(raw)?;
        if config.version > INDEX_CONFIG_VERSION {
            return Err(IndexError::Config(format!(
                "Unsupported index version {} (supported up to {})",
                config.version, INDEX_CONFIG_VERSION
            )));
        }

        tracing::debug!(root, ?mode, "Opened index");
        Ok(IndexStore {
            fs,
            root: root.to_string(),
            mode,
            config,
            manifest_cache: LruCache::new(0),
        })
    }

    /// Builder method: hold up to `max_size` recently read manifests in
    /// memory. Zero disables the cache (the default).
    pub fn with_cache_size(mut self, max_size: usize) -> Self {
        self.manifest_cache = LruCache::new(max_size);
        self
    }

    /// The loaded index configuration
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Path of the index root
    pub fn root(&self) -> &str {
        &self.root
    }

    /// How this store was opened
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Derive the manifest path for a source file, relative to the index
    /// root. Pure and deterministic: `<relative-source-path>.json`.
    pub fn manifest_path(&self, relative_source_path: &str) -> String {
        format!("{relative_source_path}{MANIFEST_SUFFIX}")
    }

    /// Strip the configured source root from a full source path. Paths
    /// outside the source root pass through unchanged.
    pub fn relative_source_path<'a>(&self, source_path: &'a str) -> &'a str {
        let root = self.config.source_path.trim_end_matches('/');
        source_path
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(source_path)
    }

    /// Whether a manifest exists for the given relative source path.
    /// Its presence is the sole signal of "already indexed".
    pub async fn has_manifest(&self, relative_source_path: &str) -> IndexResult<bool> {
        let path = join_path(&self.root, &self.manifest_path(relative_source_path));
        Ok(self.fs.exists(&path).await?)
    }

    /// Write (or overwrite) the manifest blob for a source file, creating
    /// parent directories as needed.
    pub async fn write_manifest(
        &self,
        relative_source_path: &str,
        manifest: &serde_json::Value,
    ) -> IndexResult<()> {
        if self.mode != OpenMode::Write {
            return Err(IndexError::Config(
                "index is opened read-only".to_string(),
            ));
        }
        let rel_path = self.manifest_path(relative_source_path);
        let path = join_path(&self.root, &rel_path);

        let (parent, _) = split_parent(&path);
        if !parent.is_empty() {
            self.fs.mkdirs(parent, true).await?;
        }

        let blob = serde_json::to_vec(manifest)?;
        self.fs.write(&path, &blob).await?;
        self.manifest_cache
            .put(rel_path, Arc::new(blob));
        Ok(())
    }

    /// Read the manifest blob for a source file, consulting the manifest
    /// cache first when one is configured.
    pub async fn read_manifest(&self, relative_source_path: &str) -> IndexResult<Arc<Vec<u8>>> {
        let rel_path = self.manifest_path(relative_source_path);
        if let Some(blob) = self.manifest_cache.get(&rel_path) {
            return Ok(blob);
        }

        let path = join_path(&self.root, &rel_path);
        let blob = match self.fs.read(&path).await {
            Ok(blob) => Arc::new(blob),
            Err(VfsError::NotFound(_)) => return Err(IndexError::NotFound(path)),
            Err(e) => return Err(e.into()),
        };
        self.manifest_cache.put(rel_path, Arc::clone(&blob));
        Ok(blob)
    }
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("root", &self.root)
            .field("mode", &self.mode)
            .field("source_path", &self.config.source_path)
            .finish()
    }
}
