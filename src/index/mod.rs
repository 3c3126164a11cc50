//! Sidecar chunk index
//!
//! This module provides the core indexing machinery:
//!
//! - **config**: the persisted index descriptor and config templating
//! - **store**: index root management and manifest persistence
//! - **scanner**: remote source enumeration with failure tolerance
//! - **translate**: the chunk-manifest translation seam
//! - **builder**: the sync orchestrator tying it all together
//! - **error**: error types
//!
//! # Architecture
//!
//! ```text
//! Sync Path:
//!   SourceScanner → skip-if-indexed → ChunkTranslator → IndexStore
//!
//! Open Path:
//!   IndexStore::open → config (env substitution) → read_manifest (LRU)
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod scanner;
pub mod store;
pub mod translate;

// Re-export commonly used types
pub use builder::{IndexBuilder, SyncOptions, SyncReport};
pub use config::{
    split_protocol, substitute, substitute_json, IndexConfig, DEFAULT_SOURCE_SUFFIX,
    INDEX_CONFIG_FILENAME, INDEX_CONFIG_VERSION,
};
pub use error::{IndexError, IndexResult};
pub use scanner::SourceScanner;
pub use store::{IndexStore, OpenMode, MANIFEST_SUFFIX};
pub use translate::{
    BlockManifestTranslator, ChunkTranslator, TranslateError, DEFAULT_MANIFEST_BLOCK_SIZE,
};
