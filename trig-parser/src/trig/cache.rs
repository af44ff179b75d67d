//! On-disk cache of the allocated program tree
//!
//! The cache for `dir/main.trig` lives next to it as `dir/main.trig.cache` (the extension
//! is configurable). It holds gzip-compressed JSON of the allocated program together with
//! the allocator state right after program allocation: the id counters and the label and
//! value rows. Restoring all of it lets catalog allocation continue from the same counters,
//! so a cached run produces exactly the output of a fresh one.
//!
//! A cache is used only when its modification time is strictly newer than the source's.
//! Any failure to read or decode it is logged and treated as a miss; failing to write it
//! is logged and otherwise ignored.

use crate::trig::allocation::{Allocator, IdAllocator, StringTable};
use crate::trig::ast::{Allocated, Program};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Bumped whenever the serialized tree changes shape.
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug)]
pub enum CacheError {
    Io(std::io::Error),
    Format(serde_json::Error),
    Version { found: u32 },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io(err) => write!(f, "cache I/O failed: {}", err),
            CacheError::Format(err) => write!(f, "cache is corrupt: {}", err),
            CacheError::Version { found } => write!(
                f,
                "cache format version {} does not match {}",
                found, CACHE_VERSION
            ),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Format(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedProgram {
    pub version: u32,
    pub program: Allocated<Program>,
    pub ids: IdAllocator,
    pub labels: StringTable,
    pub values: StringTable,
}

impl CachedProgram {
    /// Snapshot taken right after program allocation.
    pub fn new(program: Allocated<Program>, allocator: &Allocator) -> Self {
        CachedProgram {
            version: CACHE_VERSION,
            program,
            ids: allocator.ids().clone(),
            labels: allocator.labels().clone(),
            values: allocator.values().clone(),
        }
    }

    /// The program plus an allocator resumed from the saved state.
    pub fn into_parts(self) -> (Allocated<Program>, Allocator) {
        let allocator = Allocator::from_parts(self.ids, self.labels, self.values);
        (self.program, allocator)
    }

    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        serde_json::to_writer(&mut encoder, self)?;
        encoder.flush()?;
        Ok(encoder.finish()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CacheError> {
        let mut json = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut json)?;
        let cached: CachedProgram = serde_json::from_slice(&json)?;
        if cached.version != CACHE_VERSION {
            return Err(CacheError::Version {
                found: cached.version,
            });
        }
        Ok(cached)
    }
}

#[derive(Debug, Clone)]
pub struct ProgramCache {
    source: PathBuf,
    path: PathBuf,
}

impl ProgramCache {
    pub fn for_source(source: impl AsRef<Path>, extension: &str) -> Self {
        let source = source.as_ref().to_path_buf();
        let mut name = source.clone().into_os_string();
        name.push(".");
        name.push(extension);
        ProgramCache {
            source,
            path: PathBuf::from(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached program, if the cache exists, is newer than the source and decodes.
    pub async fn load_fresh(&self) -> Option<CachedProgram> {
        match self.is_fresh().await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(path = %self.path.display(), "cache miss");
                return None;
            }
            Err(err) => {
                tracing::info!(path = %self.path.display(), error = %err, "cache miss");
                return None;
            }
        }

        let loaded = match tokio::fs::read(&self.path).await {
            Ok(bytes) => CachedProgram::decode(&bytes),
            Err(err) => Err(CacheError::Io(err)),
        };
        match loaded {
            Ok(cached) => {
                tracing::info!(path = %self.path.display(), "cache hit");
                Some(cached)
            }
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "ignoring unreadable cache"
                );
                None
            }
        }
    }

    pub async fn store(&self, cached: &CachedProgram) {
        let written = match cached.encode() {
            Ok(bytes) => tokio::fs::write(&self.path, bytes)
                .await
                .map_err(CacheError::Io),
            Err(err) => Err(err),
        };
        match written {
            Ok(()) => tracing::debug!(path = %self.path.display(), "wrote cache"),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to write cache")
            }
        }
    }

    async fn is_fresh(&self) -> std::io::Result<bool> {
        let source = tokio::fs::metadata(&self.source).await?.modified()?;
        let cache = tokio::fs::metadata(&self.path).await?.modified()?;
        Ok(cache > source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trig::testing::{parse_program_source, samples};
    use std::time::{Duration, SystemTime};

    fn sample() -> CachedProgram {
        let mut allocator = Allocator::new();
        let program =
            allocator.allocate_program(parse_program_source(samples::FULL_PROGRAM).unwrap());
        CachedProgram::new(program, &allocator)
    }

    fn touch(path: &Path, offset: Duration) {
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() + offset)
            .unwrap();
    }

    #[test]
    fn test_cache_path_appends_extension() {
        let cache = ProgramCache::for_source("dir/main.trig", "cache");
        assert_eq!(cache.path(), Path::new("dir/main.trig.cache"));
    }

    #[test]
    fn test_encoded_cache_restores_allocator() {
        let cached = sample();
        let decoded = CachedProgram::decode(&cached.encode().unwrap()).unwrap();
        assert_eq!(decoded, cached);

        let (_, allocator) = decoded.into_parts();
        assert_eq!(allocator.ids(), &cached.ids);
        // text"Hello" and text"Ready"
        assert_eq!(allocator.values().len(), 2);
        assert!(!allocator.labels().is_empty());
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let mut cached = sample();
        cached.version = CACHE_VERSION + 1;
        let err = CachedProgram::decode(&cached.encode().unwrap()).unwrap_err();
        assert!(matches!(err, CacheError::Version { .. }));
    }

    #[tokio::test]
    async fn test_fresh_cache_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.trig");
        std::fs::write(&source, samples::FULL_PROGRAM).unwrap();
        touch(&source, Duration::ZERO);

        let cache = ProgramCache::for_source(&source, "cache");
        cache.store(&sample()).await;
        touch(cache.path(), Duration::from_secs(10));

        assert_eq!(cache.load_fresh().await, Some(sample()));
    }

    #[tokio::test]
    async fn test_stale_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.trig");
        std::fs::write(&source, samples::FULL_PROGRAM).unwrap();

        let cache = ProgramCache::for_source(&source, "cache");
        cache.store(&sample()).await;
        touch(&source, Duration::from_secs(10));

        assert_eq!(cache.load_fresh().await, None);
    }

    #[tokio::test]
    async fn test_corrupt_or_missing_cache_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.trig");
        std::fs::write(&source, samples::FULL_PROGRAM).unwrap();
        let cache = ProgramCache::for_source(&source, "cache");
        assert_eq!(cache.load_fresh().await, None);

        std::fs::write(cache.path(), b"not gzip").unwrap();
        touch(cache.path(), Duration::from_secs(10));
        assert_eq!(cache.load_fresh().await, None);
    }
}
