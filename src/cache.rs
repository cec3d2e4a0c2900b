//! On-disk results cache for expensive computations (sampler traces,
//! mixture fits, bootstrap distributions).
//!
//! Entries are content addressed: the file name carries the result name and
//! a hash of the parameters that produced it, so changing a parameter can
//! never return a stale value.
//!
//! File format:
//! ```text
//! ┌───────┬─────────┬────────────────┬──────────────┬──────────────┐
//! │ AFRC  │ version │ payload len u64│ JSON payload │ xxh64 (u64)  │
//! └───────┴─────────┴────────────────┴──────────────┴──────────────┘
//! ```
//! Writes go to a temporary file in the cache directory and are renamed
//! into place, so a reader only ever sees a complete entry.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;
use xxhash_rust::xxh64::xxh64;

const CACHE_MAGIC: [u8; 4] = *b"AFRC";
const CACHE_VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1 + 8;
const FOOTER_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("not a results cache file")]
    BadMagic,
    #[error("unsupported cache version {0}")]
    Version(u8),
    #[error("cache entry truncated: {0} bytes")]
    Truncated(usize),
    #[error("cache checksum mismatch: stored {stored:016x}, computed {computed:016x}")]
    Checksum { stored: u64, computed: u64 },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serialize `value` into the framed cache format.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CacheError> {
    let payload = serde_json::to_vec(value)?;
    let mut data = Vec::with_capacity(HEADER_LEN + payload.len() + FOOTER_LEN);
    data.extend_from_slice(&CACHE_MAGIC);
    data.push(CACHE_VERSION);
    data.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    data.extend_from_slice(&payload);
    let checksum = xxh64(&data, 0);
    data.extend_from_slice(&checksum.to_le_bytes());
    Ok(data)
}

/// Validate the framing and deserialize the payload.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, CacheError> {
    if data.len() < HEADER_LEN + FOOTER_LEN {
        return Err(CacheError::Truncated(data.len()));
    }
    if data[..4] != CACHE_MAGIC {
        return Err(CacheError::BadMagic);
    }
    if data[4] != CACHE_VERSION {
        return Err(CacheError::Version(data[4]));
    }
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&data[5..HEADER_LEN]);
    let payload_len = u64::from_le_bytes(len_bytes) as usize;
    if data.len() != HEADER_LEN + payload_len + FOOTER_LEN {
        return Err(CacheError::Truncated(data.len()));
    }

    let body_end = HEADER_LEN + payload_len;
    let mut sum_bytes = [0u8; 8];
    sum_bytes.copy_from_slice(&data[body_end..]);
    let stored = u64::from_le_bytes(sum_bytes);
    let computed = xxh64(&data[..body_end], 0);
    if stored != computed {
        return Err(CacheError::Checksum { stored, computed });
    }
    Ok(serde_json::from_slice(&data[HEADER_LEN..body_end])?)
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Identifies one cache entry: a fixed result name plus the parameter hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub name: String,
    pub hash: u64,
}

impl CacheKey {
    pub fn new<P: Serialize + ?Sized>(name: &str, params: &P) -> Result<Self, CacheError> {
        let encoded = serde_json::to_vec(params)?;
        Ok(Self {
            name: name.to_string(),
            hash: xxh3_64(&encoded),
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}-{:016x}.cache", self.name, self.hash)
    }
}

/// Directory-backed results cache.
#[derive(Debug, Clone)]
pub struct ResultsCache {
    dir: PathBuf,
    enabled: bool,
}

impl ResultsCache {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
        }
    }

    /// A cache that always recomputes and never touches the disk.
    pub fn disabled() -> Self {
        Self::new(PathBuf::new(), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Read an entry. A missing file is `Ok(None)`; so is a damaged one,
    /// which is logged and left for the next store to replace.
    pub fn load<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, CacheError> {
        let path = self.path_for(key);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };
        match decode(&data) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!("Discarding cache entry {}: {e}", path.display());
                Ok(None)
            }
        }
    }

    /// Write an entry atomically: temp file in the same directory, flush,
    /// fsync, rename over the final name.
    pub fn store<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<PathBuf, CacheError> {
        let data = encode(value)?;
        std::fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;

        let path = self.path_for(key);
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err(&self.dir))?;
        tmp.write_all(&data).map_err(io_err(tmp.path()))?;
        tmp.as_file().sync_all().map_err(io_err(&path))?;
        tmp.persist(&path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e.error,
        })?;
        Ok(path)
    }

    /// Return the cached value for `(name, params)` or run `compute`,
    /// store its result and return it. A failed store is logged and the
    /// computed value is still returned.
    pub fn get_or_compute<T, P, E, F>(&self, name: &str, params: &P, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        P: Serialize + ?Sized,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        if !self.enabled {
            return compute();
        }

        let key = CacheKey::new(name, params)?;
        if let Some(value) = self.load(&key)? {
            log::info!("Cache hit: {}", key.file_name());
            return Ok(value);
        }

        log::info!("Cache miss: {}, computing", key.file_name());
        let value = compute()?;
        match self.store(&key, &value) {
            Ok(path) => log::debug!("Cached result at {}", path.display()),
            Err(e) => log::warn!("Could not write cache entry {}: {e}", key.file_name()),
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
    struct Traces {
        chains: Vec<Vec<f64>>,
        fit: (f64, f64, f64, f64),
    }

    fn traces() -> Traces {
        Traces {
            chains: vec![vec![0.1, 1.0 / 3.0, 1e-300, -2.5e17], vec![std::f64::consts::PI]],
            fit: (10.0, 0.01, 5.0, 0.1),
        }
    }

    #[test]
    fn encode_decode_is_exact() {
        let t = traces();
        let back: Traces = decode(&encode(&t).unwrap()).unwrap();
        assert_eq!(back, t);
        for (a, b) in back.chains[0].iter().zip(&t.chains[0]) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn corrupted_frames_are_rejected() {
        let mut data = encode(&traces()).unwrap();
        let mid = data.len() / 2;
        data[mid] ^= 0xff;
        assert!(matches!(decode::<Traces>(&data), Err(CacheError::Checksum { .. })));

        let data = encode(&traces()).unwrap();
        assert!(matches!(decode::<Traces>(&data[..10]), Err(CacheError::Truncated(10))));

        let mut data = encode(&traces()).unwrap();
        data[0] = b'X';
        assert!(matches!(decode::<Traces>(&data), Err(CacheError::BadMagic)));
    }

    #[test]
    fn second_call_skips_computation() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultsCache::new(dir.path(), true);
        let calls = Cell::new(0);
        let compute = || -> Result<Traces, CacheError> {
            calls.set(calls.get() + 1);
            Ok(traces())
        };

        let first = cache.get_or_compute("chirp", &(20000, 2000), compute).unwrap();
        let second = cache.get_or_compute("chirp", &(20000, 2000), compute).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);

        // Different parameters address a different entry.
        cache.get_or_compute("chirp", &(100, 10), compute).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn damaged_entry_is_recomputed_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultsCache::new(dir.path(), true);
        let key = CacheKey::new("xd", &10).unwrap();
        std::fs::write(cache.path_for(&key), b"half-written").unwrap();

        let calls = Cell::new(0);
        let value: Traces = cache
            .get_or_compute("xd", &10, || -> Result<Traces, CacheError> {
                calls.set(calls.get() + 1);
                Ok(traces())
            })
            .unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.load::<Traces>(&key).unwrap(), Some(value));
    }

    #[test]
    fn disabled_cache_never_writes() {
        let cache = ResultsCache::disabled();
        let calls = Cell::new(0);
        for _ in 0..2 {
            let _: u32 = cache
                .get_or_compute("x", &(), || -> Result<u32, CacheError> {
                    calls.set(calls.get() + 1);
                    Ok(1)
                })
                .unwrap();
        }
        assert_eq!(calls.get(), 2);
    }
}
