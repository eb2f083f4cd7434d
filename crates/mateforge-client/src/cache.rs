//! On-disk cache of raw API responses.
//!
//! One file per request, named `<method>__<sha256 of the key parts>`. Bodies
//! are stored verbatim so a cached response decodes exactly like a fresh
//! one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a request. Key parts are hashed with a separator
    /// between them, so distinct keys never share a file.
    pub fn file_name(method: &str, parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        format!("{method}__{}", hex::encode(hasher.finalize()))
    }

    fn path(&self, method: &str, parts: &[&str]) -> PathBuf {
        self.dir.join(Self::file_name(method, parts))
    }

    /// Cached body, `None` on a miss.
    pub fn read(&self, method: &str, parts: &[&str]) -> io::Result<Option<String>> {
        let path = self.path(method, parts);
        match fs::read_to_string(&path) {
            Ok(body) => {
                debug!(path = %path.display(), "cache hit");
                Ok(Some(body))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn write(&self, method: &str, parts: &[&str], body: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(method, parts);
        debug!(path = %path.display(), bytes = body.len(), "caching response");
        fs::write(path, body)
    }
}
