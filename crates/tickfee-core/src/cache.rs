//! Filesystem-backed archive cache.
//!
//! One directory per symbol, one immutable zip per (symbol, day). Presence of
//! the file is the sole validity signal: there is no checksum and no expiry,
//! so a corrupted file on disk is an out-of-band failure the caller must
//! clear manually.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use time::Date;

use crate::domain::{day_stamp, Symbol};

/// On-disk store for daily tick archives.
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    root: PathBuf,
}

impl ArchiveCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn symbol_dir(&self, symbol: &Symbol) -> PathBuf {
        self.root.join(symbol.as_str())
    }

    /// Cache path for one (symbol, day), whether or not the file exists.
    pub fn path_for(&self, symbol: &Symbol, day: Date) -> PathBuf {
        self.symbol_dir(symbol)
            .join(format!("{}-trades-{}.zip", symbol, day_stamp(day)))
    }

    /// Returns the archive path when the day is already cached.
    pub fn get(&self, symbol: &Symbol, day: Date) -> Option<PathBuf> {
        let path = self.path_for(symbol, day);
        path.is_file().then_some(path)
    }

    /// Persist archive bytes under the cache path.
    ///
    /// Writes to a temporary file in the target directory and renames it into
    /// place, so a concurrent writer of the same day can never leave partial
    /// or interleaved bytes behind: the last complete writer wins. Creates
    /// the per-symbol directory if absent.
    pub fn put(&self, symbol: &Symbol, day: Date, bytes: &[u8]) -> io::Result<PathBuf> {
        let dir = self.symbol_dir(symbol);
        fs::create_dir_all(&dir)?;

        let mut staged = NamedTempFile::new_in(&dir)?;
        staged.write_all(bytes)?;
        staged.flush()?;

        let path = self.path_for(symbol, day);
        staged.persist(&path).map_err(|error| error.error)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn symbol() -> Symbol {
        Symbol::parse("BNBUSDT").expect("valid symbol")
    }

    #[test]
    fn miss_then_put_then_hit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ArchiveCache::new(dir.path());
        let day = date!(2024 - 05 - 28);

        assert!(cache.get(&symbol(), day).is_none());

        let path = cache.put(&symbol(), day, b"zip-bytes").expect("put succeeds");
        assert_eq!(path, cache.path_for(&symbol(), day));
        assert_eq!(cache.get(&symbol(), day), Some(path.clone()));
        assert_eq!(fs::read(&path).expect("readable"), b"zip-bytes");
    }

    #[test]
    fn path_layout_matches_remote_naming() {
        let cache = ArchiveCache::new("/tmp/archives");
        let path = cache.path_for(&symbol(), date!(2024 - 01 - 02));
        assert_eq!(
            path,
            PathBuf::from("/tmp/archives/BNBUSDT/BNBUSDT-trades-2024-01-02.zip")
        );
    }

    #[test]
    fn put_overwrites_with_complete_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ArchiveCache::new(dir.path());
        let day = date!(2024 - 05 - 28);

        cache.put(&symbol(), day, b"first").expect("first put");
        let path = cache.put(&symbol(), day, b"second").expect("second put");
        assert_eq!(fs::read(&path).expect("readable"), b"second");
    }

    #[test]
    fn put_leaves_no_stray_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ArchiveCache::new(dir.path());
        let day = date!(2024 - 05 - 28);

        cache.put(&symbol(), day, b"bytes").expect("put succeeds");

        let entries: Vec<_> = fs::read_dir(dir.path().join("BNBUSDT"))
            .expect("symbol dir exists")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec!["BNBUSDT-trades-2024-05-28.zip"]);
    }
}
