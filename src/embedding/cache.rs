//! Persistent embedding cache.
//!
//! One `rkyv` file holds every cached vector, keyed by the BLAKE3 content hash of the
//! embedded text and tagged with the model that produced it. Entries from another model
//! are stale and dropped on load. Saves go through a temp file and a rename so a crash
//! never leaves a half-written cache behind.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use rkyv::rancor::Error as RkyvError;
use rkyv::{Archive, Deserialize, Serialize};
use tempfile::Builder;
use thiserror::Error;
use tracing::{debug, info};

use crate::hashing::content_key;

/// On-disk format version. Bump when [`CacheFile`] changes shape.
pub const CACHE_FORMAT_VERSION: u32 = 1;

const TEMP_PREFIX: &str = ".embeddings-";
const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Unreadable file. Callers treat this as an empty cache.
    #[error("corrupt embedding cache at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("unsupported cache format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// One cached vector.
#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
pub struct CachedEmbedding {
    /// [`content_key`] of the embedded text.
    pub key: String,
    pub model_id: String,
    pub vector: Vec<f32>,
}

#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
struct CacheFile {
    version: u32,
    entries: Vec<CachedEmbedding>,
}

/// Counts reported by [`EmbeddingCache::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLoadStats {
    pub loaded: usize,
    /// Entries produced by a different model.
    pub stale: usize,
}

/// In-memory view of the cache for a single embedding model.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    model_id: String,
    entries: HashMap<String, Vec<f32>>,
    dirty: bool,
}

impl EmbeddingCache {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            entries: HashMap::new(),
            dirty: false,
        }
    }

    /// Loads the cache at `path`, keeping only entries produced by `model_id`.
    ///
    /// A missing or empty file yields an empty cache.
    pub fn load(path: &Path, model_id: &str) -> Result<(Self, CacheLoadStats), CacheError> {
        let mut cache = Self::new(model_id);

        if !path.exists() {
            debug!(path = %path.display(), "No embedding cache on disk");
            return Ok((cache, CacheLoadStats::default()));
        }

        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            debug!(path = %path.display(), "Embedding cache file is empty");
            return Ok((cache, CacheLoadStats::default()));
        }

        // SAFETY: read-only mapping; the cache file is only replaced by rename, never
        // rewritten in place, so the mapped pages stay valid while `mmap` lives.
        let mmap = unsafe { Mmap::map(&file)? };
        let decoded = rkyv::from_bytes::<CacheFile, RkyvError>(&mmap).map_err(|e| {
            CacheError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        drop(mmap);

        if decoded.version != CACHE_FORMAT_VERSION {
            return Err(CacheError::UnsupportedVersion {
                found: decoded.version,
                expected: CACHE_FORMAT_VERSION,
            });
        }

        let mut stats = CacheLoadStats::default();
        for entry in decoded.entries {
            if entry.model_id == model_id && !entry.vector.is_empty() {
                cache.entries.insert(entry.key, entry.vector);
                stats.loaded += 1;
            } else {
                stats.stale += 1;
            }
        }

        info!(
            path = %path.display(),
            loaded = stats.loaded,
            stale = stats.stale,
            model = model_id,
            "Embedding cache loaded"
        );

        Ok((cache, stats))
    }

    /// Writes the cache atomically (uniquely named temp file, fsync, rename).
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };

        let mut entries: Vec<CachedEmbedding> = self
            .entries
            .iter()
            .map(|(key, vector)| CachedEmbedding {
                key: key.clone(),
                model_id: self.model_id.clone(),
                vector: vector.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        let file = CacheFile {
            version: CACHE_FORMAT_VERSION,
            entries,
        };
        let bytes = rkyv::to_bytes::<RkyvError>(&file)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        let mut temp = Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(parent)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| CacheError::Io(e.error))?;

        debug!(path = %path.display(), entries = self.entries.len(), "Embedding cache saved");
        Ok(())
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Cached vector for `text`, if any.
    pub fn get(&self, text: &str) -> Option<&[f32]> {
        self.entries.get(&content_key(text)).map(Vec::as_slice)
    }

    pub fn insert(&mut self, text: &str, vector: Vec<f32>) {
        self.entries.insert(content_key(text), vector);
        self.dirty = true;
    }

    /// `true` if entries were added since load.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
