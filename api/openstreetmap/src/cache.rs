use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// On-disk cache of raw upstream responses, one file per request.
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

    /// File name for a request, derived from the CRC32 of its URL and body.
    pub fn key(url: &str, body: &str) -> String {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(url.as_bytes());
        hasher.update(b"\n");
        hasher.update(body.as_bytes());
        format!("{:08x}.json", hasher.finalize())
    }

    pub fn path_for(&self, url: &str, body: &str) -> PathBuf {
        self.dir.join(Self::key(url, body))
    }

    /// Look up a cached response. Read errors count as a miss.
    pub fn get(&self, url: &str, body: &str) -> Option<String> {
        let path = self.path_for(url, body);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(text) => {
                debug!("Cache hit: {:?}", path);
                Some(text)
            }
            Err(e) => {
                warn!("Failed to read cached response {:?}: {}", path, e);
                None
            }
        }
    }

    /// Store a response. Write errors are logged and otherwise ignored.
    ///
    /// The response is written next to its final path and renamed into place,
    /// so readers never see a partial file.
    pub fn put(&self, url: &str, body: &str, response: &str) {
        let path = self.path_for(url, body);
        let result = fs::create_dir_all(&self.dir).and_then(|_| {
            let mut file = NamedTempFile::new_in(&self.dir)?;
            file.write_all(response.as_bytes())?;
            file.persist(&path).map(|_| ()).map_err(|e| e.error)
        });
        match result {
            Ok(()) => debug!("Cached response to {:?}", path),
            Err(e) => warn!("Failed to cache response to {:?}: {}", path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_depends_on_url_and_body() {
        let a = ResponseCache::key("https://example.org", "q=1");
        let b = ResponseCache::key("https://example.org", "q=2");
        assert_ne!(a, b);
        assert_eq!(a, ResponseCache::key("https://example.org", "q=1"));
        assert!(a.ends_with(".json"));
        assert_eq!(a.len(), 13);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().join("nested"));
        assert!(cache.get("u", "b").is_none());
        cache.put("u", "b", "{\"ok\":true}");
        assert_eq!(cache.get("u", "b").as_deref(), Some("{\"ok\":true}"));
    }

    #[test]
    fn test_put_replaces_whole_file_and_leaves_no_temporaries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path());
        cache.put("u", "b", &"x".repeat(10_000));
        cache.put("u", "b", "short");
        assert_eq!(cache.get("u", "b").as_deref(), Some("short"));

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![ResponseCache::key("u", "b")]);
    }

    #[test]
    fn test_put_into_unwritable_dir_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        let cache = ResponseCache::new(&blocker);
        cache.put("u", "b", "{}");
        assert!(cache.get("u", "b").is_none());
    }
}
