//! # chunkindex
//!
//! Sidecar chunk indexing for remote NetCDF/HDF5 archives.
//!
//! chunkindex converts each remote source file's internal chunk layout
//! into a lightweight, queryable sidecar manifest and keeps opened
//! artifacts in a bounded cache, so repeated access avoids redundant
//! expensive work.
//!
//! ## Features
//!
//! - **Failure-tolerant crawling**: per-directory listing errors and
//!   per-file translation errors never abort a sync run
//! - **Skip-if-indexed**: a manifest's presence is the sole signal of
//!   "already indexed"; re-runs are cheap
//! - **Pluggable storage**: local disk, in-memory and object-store
//!   backends behind one capability trait
//! - **Bounded caching**: true-LRU cache with disposal hooks for opened
//!   artifacts
//!
//! ## Modules
//!
//! - [`index`]: index store, scanner, translator seam and sync builder
//! - [`cache`]: bounded LRU cache
//! - [`vfs`]: storage backend capability and shipped backends
//! - [`params`]: user-facing parameter surface
//! - [`timerange`]: time range normalization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chunkindex::index::{
//!     BlockManifestTranslator, IndexBuilder, IndexConfig, IndexStore, SyncOptions,
//! };
//! use chunkindex::vfs::LocalFileSystem;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fs = Arc::new(LocalFileSystem::new());
//!
//!     // Describe the source archive and create the index
//!     let config = IndexConfig::new("/data/smos").path_prefix("SM", "L2SM");
//!     let store = IndexStore::create(fs.clone(), "/data/smos-index", config, false).await?;
//!
//!     // Synchronize: build manifests for every file not yet indexed
//!     let builder = IndexBuilder::new(
//!         Arc::new(store),
//!         fs,
//!         Arc::new(BlockManifestTranslator::default()),
//!     );
//!     let report = builder.sync(&SyncOptions::default()).await?;
//!
//!     println!("{} file(s) indexed", report.files_indexed);
//!     for problem in &report.problems {
//!         eprintln!("  {problem}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod index;
pub mod params;
pub mod timerange;
pub mod vfs;

// Re-export top-level types for convenience
pub use cache::LruCache;

pub use index::{
    BlockManifestTranslator, ChunkTranslator, IndexBuilder, IndexConfig, IndexError,
    IndexResult, IndexStore, OpenMode, SourceScanner, SyncOptions, SyncReport,
    TranslateError,
};

pub use params::{OpenParams, ParamsError, StoreParams};

pub use timerange::{normalize_time_range, TimeRangeError};

pub use vfs::{
    FileSystem, LocalFileSystem, MemoryFileSystem, VfsError, VfsResult, WalkEntry,
};

pub use config::{Config, ConfigError, LoggingConfig};
