//! Chunk manifest translation
//!
//! The translation capability turns a source file's bytes into an opaque
//! chunk manifest: a JSON description of internally addressable ranges
//! that lets readers fetch slices of the file without re-parsing its
//! format. Format-specific translators (HDF5/NetCDF) plug in behind
//! [`ChunkTranslator`]; the crate ships a generic fixed-block translator
//! so the pipeline works end to end on any byte source.

use serde_json::json;
use thiserror::Error;

/// Errors raised while translating a source file into a manifest
#[derive(Error, Debug)]
pub enum TranslateError {
    /// Reading the source bytes failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The source bytes are not translatable
    #[error("Malformed source: {0}")]
    Format(String),
}

/// Turns a source file's bytes into an opaque chunk-manifest blob.
///
/// `source` is the identity recorded inside the manifest, normally the
/// full source path. Failures are per-file: the index builder converts
/// them into problem strings rather than propagating.
pub trait ChunkTranslator: Send + Sync {
    fn translate(&self, data: &[u8], source: &str) -> Result<serde_json::Value, TranslateError>;
}

/// Default block size of [`BlockManifestTranslator`]: 1 MiB.
pub const DEFAULT_MANIFEST_BLOCK_SIZE: usize = 1024 * 1024;

/// Generic translator that slices a source object into fixed-size blocks
/// and records offset, length and CRC32 per block.
#[derive(Debug, Clone)]
pub struct BlockManifestTranslator {
    block_size: usize,
}

impl BlockManifestTranslator {
    /// Translator with a specific block size; zero falls back to the
    /// default.
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: if block_size == 0 {
                DEFAULT_MANIFEST_BLOCK_SIZE
            } else {
                block_size
            },
        }
    }
}

impl Default for BlockManifestTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFEST_BLOCK_SIZE)
    }
}

impl ChunkTranslator for BlockManifestTranslator {
    fn translate(&self, data: &[u8], source: &str) -> Result<serde_json::Value, TranslateError> {
        if data.is_empty() {
            return Err(TranslateError::Format(format!(
                "empty source object: {source}"
            )));
        }

        let blocks: Vec<serde_json::Value> = data
            .chunks(self.block_size)
            .enumerate()
            .map(|(i, chunk)| {
                let mut hasher = crc32fast::Hasher::new();
                hasher.update(chunk);
                json!({
                    "offset": i * self.block_size,
                    "length": chunk.len(),
                    "crc32": hasher.finalize(),
                })
            })
            .collect();

        Ok(json!({
            "version": 1,
            "source": source,
            "size": data.len(),
            "block_size": self.block_size,
            "blocks": blocks,
        }))
    }
}
