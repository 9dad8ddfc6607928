//! Key-value persistence contract.
//!
//! The surrounding application decides where state lives (browser storage,
//! app data dir, memory). The engine only depends on this trait for the API
//! key and the saved-version blob.

use anyhow::anyhow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// String key-value storage. Implementations may fail arbitrarily; callers
/// treat failures as soft (log and fall back to defaults).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// In-memory store for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// File-backed store: one JSON object per file, values as strings.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the backing map. A corrupt file is moved aside and treated as
    /// empty so one bad write never bricks the store.
    fn load_map(&self) -> HashMap<String, String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(err) => {
                preserve_corrupt_file(&self.path, &content);
                tracing::warn!(
                    "store file {} was corrupted ({}); starting empty",
                    self.path.display(),
                    err
                );
                HashMap::new()
            }
        }
    }

    fn save_map(&self, map: &HashMap<String, String>) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| anyhow!("Failed to create store directory: {}", e))?;
        }
        let content = serde_json::to_string_pretty(map)
            .map_err(|e| anyhow!("Failed to serialize store: {}", e))?;

        #[cfg(unix)]
        {
            write_file_atomic(&self.path, &content)
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, content).map_err(|e| anyhow!("Failed to write store: {}", e))
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.load_map().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut map = self.load_map();
        map.insert(key.to_string(), value.to_string());
        self.save_map(&map)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut map = self.load_map();
        if map.remove(key).is_some() {
            self.save_map(&map)?;
        }
        Ok(())
    }
}

fn preserve_corrupt_file(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

#[cfg(unix)]
fn write_file_atomic(path: &Path, content: &str) -> anyhow::Result<()> {
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let tmp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)
        .map_err(|e| anyhow!("Failed to open temp store file: {}", e))?;

    // Stored values include the API key, so keep the file private.
    if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
        tracing::warn!("failed to set store file permissions: {}", e);
    }

    file.write_all(content.as_bytes())
        .map_err(|e| anyhow!("Failed to write store file: {}", e))?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(anyhow!("Failed to replace store file: {}", err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("missing").unwrap().is_none());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.json"));

        assert!(store.get("openai_api_key").unwrap().is_none());
        store.set("openai_api_key", "sk-test").unwrap();
        assert_eq!(
            store.get("openai_api_key").unwrap().as_deref(),
            Some("sk-test")
        );

        // A second store over the same file sees the value.
        let reopened = FileStore::new(dir.path().join("state.json"));
        assert_eq!(
            reopened.get("openai_api_key").unwrap().as_deref(),
            Some("sk-test")
        );
    }

    #[test]
    fn test_file_store_preserves_other_keys_on_set() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.json"));

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();

        assert!(store.get("a").unwrap().is_none());
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_file_store_corrupt_file_recovers_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStore::new(&path);
        assert!(store.get("k").unwrap().is_none());

        // Corrupt content was moved aside, and writes work again.
        assert!(dir.path().join("state.json.corrupt").exists());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_sets_private_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = FileStore::new(&path);
        store.set("openai_api_key", "sk-secret").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
