use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

const READ_BUFFER_SIZE: usize = 16 * 1024;

/// SHA‑256 of a file's full byte content.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Computes the SHA‑256 digest of a file by reading it in chunks.
/// Uses a 16‑KB buffer for improved I/O performance.
pub fn hash_file(path: &Path) -> io::Result<ContentDigest> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(ContentDigest(hasher.finalize().into()))
}

/// Per-run memo of file digests.
///
/// A file that could not be read is remembered as `None` so it is not retried
/// for every comparison in the run.
#[derive(Debug, Default)]
pub struct DigestCache {
    entries: HashMap<PathBuf, Option<ContentDigest>>,
}

impl DigestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn digest(&mut self, path: &Path) -> Option<ContentDigest> {
        if let Some(cached) = self.entries.get(path) {
            return *cached;
        }
        let computed = match hash_file(path) {
            Ok(digest) => Some(digest),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                // Vanished between the existence check and the read; do not memoize.
                return None;
            }
            Err(err) => {
                log::warn!("Error hashing {}: {}", path.display(), err);
                None
            }
        };
        self.entries.insert(path.to_path_buf(), computed);
        computed
    }

    pub fn evict(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
