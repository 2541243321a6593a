// 🗃️ Dataset Cache
// Caller-side memoization: reuse the last dataset while the source files are
// byte-for-byte unchanged.

use crate::dataset::{Dataset, Ingestor};
use crate::error::{IngestionError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// SHA-256 over the contents of every file, in order.
///
/// A missing file is a `MissingSource` error.
pub fn source_fingerprint(paths: &[PathBuf]) -> Result<String> {
    let mut hasher = Sha256::new();
    for path in paths {
        if !path.exists() {
            return Err(IngestionError::missing(path.display().to_string()));
        }
        let bytes = fs::read(path)?;
        // length prefix keeps file boundaries unambiguous
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Debug, Default)]
pub struct DatasetCache {
    current: Option<Arc<Dataset>>,
    /// Skip re-hashing the sources for this long after a check
    recheck_after: Option<Duration>,
    checked_at: Option<Instant>,
}

impl DatasetCache {
    pub fn new() -> Self {
        DatasetCache::default()
    }

    pub fn with_recheck_interval(mut self, interval: Duration) -> Self {
        self.recheck_after = Some(interval);
        self
    }

    /// Cached dataset when the fingerprint matches, otherwise a fresh load
    pub fn get_or_ingest(&mut self, ingestor: &Ingestor) -> Result<Arc<Dataset>> {
        if let (Some(dataset), Some(interval), Some(checked_at)) =
            (&self.current, self.recheck_after, self.checked_at)
        {
            if checked_at.elapsed() < interval {
                return Ok(Arc::clone(dataset));
            }
        }

        let fingerprint = source_fingerprint(&ingestor.config().sources.all_paths())?;

        if let Some(dataset) = &self.current {
            if dataset.provenance().fingerprint.as_deref() == Some(fingerprint.as_str()) {
                debug!(fingerprint = %fingerprint, "dataset cache hit");
                self.checked_at = Some(Instant::now());
                return Ok(Arc::clone(dataset));
            }
        }

        info!(fingerprint = %fingerprint, "sources changed, ingesting");
        let dataset = Arc::new(ingestor.ingest()?.with_fingerprint(fingerprint));
        self.current = Some(Arc::clone(&dataset));
        self.checked_at = Some(Instant::now());
        Ok(dataset)
    }

    pub fn current(&self) -> Option<Arc<Dataset>> {
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::dataset::tests::write_sources;
    use crate::error::ErrorCategory;

    #[test]
    fn test_fingerprint_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        fs::write(&a, "one").unwrap();
        fs::write(&b, "two").unwrap();

        let first = source_fingerprint(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, source_fingerprint(&[a.clone(), b.clone()]).unwrap());

        fs::write(&b, "three").unwrap();
        assert_ne!(first, source_fingerprint(&[a.clone(), b.clone()]).unwrap());
    }

    #[test]
    fn test_fingerprint_respects_file_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, "ab").unwrap();
        fs::write(&b, "c").unwrap();
        let split_one = source_fingerprint(&[a.clone(), b.clone()]).unwrap();

        fs::write(&a, "a").unwrap();
        fs::write(&b, "bc").unwrap();
        assert_ne!(split_one, source_fingerprint(&[a, b]).unwrap());
    }

    #[test]
    fn test_cache_hit_returns_same_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = Ingestor::new(write_sources(dir.path()));
        let mut cache = DatasetCache::new();

        let first = cache.get_or_ingest(&ingestor).unwrap();
        let second = cache.get_or_ingest(&ingestor).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.provenance().fingerprint.as_ref().map(|f| f.len()), Some(64));
    }

    #[test]
    fn test_changed_source_is_reingested() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = Ingestor::new(write_sources(dir.path()));
        let mut cache = DatasetCache::new();
        let first = cache.get_or_ingest(&ingestor).unwrap();

        let csv_path = ingestor.config().sources.municipal_csv_path();
        let edited = fs::read_to_string(&csv_path).unwrap().replace("0.721", "0.735");
        fs::write(&csv_path, edited).unwrap();

        let second = cache.get_or_ingest(&ingestor).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_ne!(first.provenance().fingerprint, second.provenance().fingerprint);
        assert_eq!(second.municipality("A").unwrap().hdi, 0.735);
        assert!(Arc::ptr_eq(&second, &cache.current().unwrap()));
    }

    #[test]
    fn test_recheck_interval_skips_hashing() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = Ingestor::new(write_sources(dir.path()));
        let mut cache = DatasetCache::new().with_recheck_interval(Duration::from_secs(3600));
        let first = cache.get_or_ingest(&ingestor).unwrap();

        // inside the interval even a removed source goes unnoticed
        fs::remove_file(ingestor.config().sources.geometry_path()).unwrap();
        let second = cache.get_or_ingest(&ingestor).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let mut eager = DatasetCache::new().with_recheck_interval(Duration::ZERO);
        let err = eager.get_or_ingest(&ingestor).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::MissingSource);
    }

    #[test]
    fn test_missing_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = DatasetCache::new();
        let ingestor = Ingestor::new(DashboardConfig::default().with_data_dir(dir.path()));

        let err = cache.get_or_ingest(&ingestor).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::MissingSource);
        assert!(cache.current().is_none());
    }
}
