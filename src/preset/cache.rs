//! Disk cache for fetched preset data.
//!
//! Entries are stored under the platform data directory, one file per
//! fetched URL, named by the sha256 of the URL itself. Cached bytes are
//! re-verified against the catalog checksum on read, so a corrupt or stale
//! file triggers a refetch instead of a decode failure.

use std::fs;
use std::io;
use std::path::PathBuf;

use directories::ProjectDirs;
use sha2::{Digest, Sha256};

/// Lowercase hex sha256 of a byte string.
pub fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Open the per-user cache. `None` when no home directory is available
    /// (headless CI, wasm); the manager then just fetches every time.
    pub fn open() -> Option<DiskCache> {
        let dirs = ProjectDirs::from("net", "SonAire", "sonaire-core")?;
        DiskCache::at(dirs.cache_dir().join("presets")).ok()
    }

    /// Open a cache rooted at an explicit directory.
    pub fn at(root: PathBuf) -> io::Result<DiskCache> {
        fs::create_dir_all(&root)?;
        Ok(DiskCache { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(digest_hex(key.as_bytes()))
    }

    pub fn read(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.path_for(key)).ok()
    }

    pub fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        fs::write(self.path_for(key), bytes)
    }
}
