//! Process-wide memoization of pipeline output.
//!
//! Each cache keeps one immutable dataset together with the fingerprint of
//! the inputs it was built from. A lookup with a different fingerprint
//! rebuilds the dataset and replaces the entry wholesale; cached values are
//! shared as `Arc`s and never mutated.

use crate::config::PortOptions;
use crate::discovery::discover_port_files;
use crate::error::Result;
use crate::loader::{concat_port_files, load_countries, CountryDataset, PortDataset};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Size and modification time of one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl FileStamp {
    pub fn of(path: &Path) -> Self {
        let meta = std::fs::metadata(path).ok();
        Self {
            path: path.to_path_buf(),
            len: meta.as_ref().map(|m| m.len()).unwrap_or(0),
            modified: meta
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from),
        }
    }
}

/// Everything a cached dataset depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub files: Vec<FileStamp>,
    pub options: String,
}

impl Fingerprint {
    pub fn new<'a>(paths: impl IntoIterator<Item = &'a Path>, options: String) -> Self {
        let mut files: Vec<FileStamp> = paths.into_iter().map(FileStamp::of).collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self { files, options }
    }
}

pub struct PipelineCache<T> {
    entry: Option<(Fingerprint, Arc<T>)>,
}

impl<T> Default for PipelineCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PipelineCache<T> {
    pub const fn new() -> Self {
        Self { entry: None }
    }

    /// Cached value for `key`, or the result of `load` stored under `key`.
    ///
    /// A failed load leaves the previous entry in place.
    pub fn get_or_load<F>(&mut self, key: Fingerprint, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some((cached_key, value)) = &self.entry {
            if *cached_key == key {
                debug!("Cache hit ({} files)", key.files.len());
                return Ok(Arc::clone(value));
            }
        }
        debug!("Cache miss ({} files), rebuilding", key.files.len());
        let value = Arc::new(load()?);
        self.entry = Some((key, Arc::clone(&value)));
        Ok(value)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

static COUNTRY_CACHE: Lazy<Mutex<PipelineCache<CountryDataset>>> =
    Lazy::new(|| Mutex::new(PipelineCache::new()));

static PORT_CACHE: Lazy<Mutex<PipelineCache<PortDataset>>> =
    Lazy::new(|| Mutex::new(PipelineCache::new()));

fn lock<T>(cache: &Mutex<PipelineCache<T>>) -> MutexGuard<'_, PipelineCache<T>> {
    // Entries are replaced wholesale, so a poisoned lock still holds a
    // consistent value.
    cache.lock().unwrap_or_else(|e| e.into_inner())
}

/// Country reference for `path`, reloaded only when the file changed.
pub fn countries(path: &Path) -> Result<Arc<CountryDataset>> {
    let key = Fingerprint::new([path], String::new());
    lock(&COUNTRY_CACHE).get_or_load(key, || load_countries(path))
}

/// Port statistics in `dir`, reloaded only when the set of matching files,
/// their sizes or timestamps, or the options change.
pub fn port_stats(dir: &Path, options: &PortOptions) -> Arc<PortDataset> {
    let mut cache = lock(&PORT_CACHE);
    port_stats_in(&mut cache, dir, options)
}

pub fn port_stats_in(
    cache: &mut PipelineCache<PortDataset>,
    dir: &Path,
    options: &PortOptions,
) -> Arc<PortDataset> {
    let files = discover_port_files(dir, &options.marker);
    if files.is_empty() {
        info!("No files matching '{}' in {}", options.marker, dir.display());
    }
    let key = Fingerprint::new(files.iter().map(|f| f.path.as_path()), format!("{:?}", options));
    let loaded = cache.get_or_load(key, || Ok(concat_port_files(&files, options)));
    // concat_port_files skips bad files instead of failing.
    loaded.unwrap_or_default()
}

/// Drop every cached dataset.
pub fn invalidate_all() {
    lock(&COUNTRY_CACHE).invalidate();
    lock(&PORT_CACHE).invalidate();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::fs;

    fn write_year(dir: &Path, year: u16) {
        fs::write(
            dir.join(format!("관세환급_{}.csv", year)),
            "title,,,\nunit,,,\ncode,name,count,amount\nP01,부산세관,1,\"2,000\"\n",
        )
        .unwrap();
    }

    #[test]
    fn test_same_inputs_reuse_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_year(dir.path(), 2021);
        let options = PortOptions::default();
        let mut cache = PipelineCache::new();

        let first = port_stats_in(&mut cache, dir.path(), &options);
        let second = port_stats_in(&mut cache, dir.path(), &options);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.records.len(), 1);
    }

    #[test]
    fn test_new_file_rebuilds_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_year(dir.path(), 2021);
        let options = PortOptions::default();
        let mut cache = PipelineCache::new();

        let first = port_stats_in(&mut cache, dir.path(), &options);
        write_year(dir.path(), 2022);
        let second = port_stats_in(&mut cache, dir.path(), &options);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.records.len(), 1);
        assert_eq!(second.records.len(), 2);
    }

    #[test]
    fn test_changed_options_rebuild_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_year(dir.path(), 2021);
        let mut cache = PipelineCache::new();

        let first = port_stats_in(&mut cache, dir.path(), &PortOptions::default());
        let zero = PortOptions {
            number_policy: crate::config::NumberPolicy::Zero,
            ..PortOptions::default()
        };
        let second = port_stats_in(&mut cache, dir.path(), &zero);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failed_load_keeps_previous_entry() {
        let mut cache: PipelineCache<u32> = PipelineCache::new();
        let key = Fingerprint::new(Vec::<&Path>::new(), "a".to_string());
        let value = cache.get_or_load(key.clone(), || Ok(7)).unwrap();
        assert_eq!(*value, 7);

        let other = Fingerprint::new(Vec::<&Path>::new(), "b".to_string());
        let failed = cache.get_or_load(other, || {
            Err(PipelineError::Workbook("boom".to_string()))
        });
        assert!(failed.is_err());
        let again = cache.get_or_load(key, || Ok(8)).unwrap();
        assert_eq!(*again, 7);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let mut cache: PipelineCache<u32> = PipelineCache::new();
        let key = Fingerprint::new(Vec::<&Path>::new(), String::new());
        cache.get_or_load(key.clone(), || Ok(1)).unwrap();
        cache.invalidate();
        assert_eq!(*cache.get_or_load(key, || Ok(2)).unwrap(), 2);
    }
}
