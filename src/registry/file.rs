//! Registry persistence.
//!
//! The registry is a JSON file. A load-modify-save runs while holding a
//! sibling `.lock` file created with `create_new`; saves go through a temp
//! file and a rename.

use super::OctetRegistry;
use crate::error::AllocError;
use std::error::Error;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Held while a transaction runs. Removes the lock file on drop.
#[derive(Debug)]
pub struct RegistryLock {
    path: PathBuf,
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("Could not remove lock file {}: {e}", self.path.display());
        }
    }
}

/// A registry stored at `path`.
#[derive(Debug, Clone)]
pub struct RegistryFile {
    path: PathBuf,
}

impl RegistryFile {
    pub fn new<P: AsRef<Path>>(path: P) -> RegistryFile {
        RegistryFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        with_suffix(&self.path, ".lock")
    }

    /// Read the registry. A missing file is an empty registry.
    pub fn load(&self) -> Result<OctetRegistry, Box<dyn Error>> {
        if !self.path.exists() {
            log::info!("Registry file not found, starting empty: {}", self.path.display());
            return Ok(OctetRegistry::new());
        }
        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("Error reading registry {}: {e}", self.path.display()))?;
        let mut deserializer = serde_json::Deserializer::from_str(&json);
        let registry: OctetRegistry = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|e| {
                format!(
                    "Error parsing registry {}: path={} error={}",
                    self.path.display(),
                    e.path(),
                    e
                )
            })?;
        log::debug!(
            "Loaded registry {} revision={} records={}",
            self.path.display(),
            registry.revision,
            registry.records.len()
        );
        Ok(registry)
    }

    /// Write the registry through a temp file and rename.
    pub fn save(&self, registry: &OctetRegistry) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(registry)
            .map_err(|e| format!("Error serializing registry: {e}"))?;
        let tmp = with_suffix(&self.path, ".tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| format!("Error writing registry {}: {e}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| format!("Error replacing registry {}: {e}", self.path.display()))?;
        log::info!(
            "Saved registry {} revision={}",
            self.path.display(),
            registry.revision
        );
        Ok(())
    }

    /// Take the cross-process lock. Fails if another process holds it.
    pub fn lock(&self) -> Result<RegistryLock, Box<dyn Error>> {
        let path = self.lock_path();
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    format!(
                        "Registry is locked by another process, remove {} if stale",
                        path.display()
                    )
                } else {
                    format!("Error creating lock {}: {e}", path.display())
                }
            })?;
        // informational only
        let _ = writeln!(file, "{}", std::process::id());
        Ok(RegistryLock { path })
    }

    /// Run `f` against the registry under the lock, saving when it changed.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, Box<dyn Error>>
    where
        F: FnOnce(&mut OctetRegistry) -> Result<T, AllocError>,
    {
        let _lock = self.lock()?;
        let mut registry = self.load()?;
        let revision = registry.revision;
        let result = f(&mut registry)?;
        if registry.revision != revision {
            self.save(&registry)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AllocationKey;
    use crate::registry::{AllocationRecord, Owner};

    fn record(octet: u8, project: &str) -> AllocationRecord {
        AllocationRecord::new(octet, Owner::Key(AllocationKey::new(project, "dev")))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = RegistryFile::new(dir.path().join("registry.json"));
        assert_eq!(file.load().unwrap(), OctetRegistry::new());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = RegistryFile::new(dir.path().join("registry.json"));
        let mut registry = OctetRegistry::new();
        registry.record(record(72, "cloudpi")).unwrap();
        registry.record(record(223, "myapp")).unwrap();
        file.save(&registry).unwrap();

        let loaded = file.load().unwrap();
        assert_eq!(loaded, registry);
        assert!(!dir.path().join("registry.json.tmp").exists());
    }

    #[test]
    fn test_parse_error_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, r#"{"revision": 1, "records": [{"octet": "x"}]}"#).unwrap();
        let err = RegistryFile::new(&path).load().unwrap_err().to_string();
        assert!(err.contains("records[0].octet"), "{err}");
    }

    #[test]
    fn test_lock_is_exclusive_and_released() {
        let dir = tempfile::tempdir().unwrap();
        let file = RegistryFile::new(dir.path().join("registry.json"));
        let lock = file.lock().unwrap();
        assert!(file.lock_path().exists());
        assert!(file.lock().is_err());
        drop(lock);
        assert!(!file.lock_path().exists());
        assert!(file.lock().is_ok());
    }

    #[test]
    fn test_transaction_saves_changes_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let file = RegistryFile::new(&path);

        file.transaction(|registry| Ok(registry.in_use().len())).unwrap();
        assert!(!path.exists());

        file.transaction(|registry| registry.record(record(90, "a"))).unwrap();
        assert_eq!(file.load().unwrap().revision, 1);
        assert!(!file.lock_path().exists());
    }

    #[test]
    fn test_transaction_error_keeps_file_and_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let file = RegistryFile::new(dir.path().join("registry.json"));
        file.transaction(|registry| registry.record(record(90, "a"))).unwrap();

        let err = file
            .transaction(|registry| registry.record(record(90, "b")))
            .unwrap_err();
        assert!(err.to_string().contains("already allocated"));
        assert_eq!(file.load().unwrap().records.len(), 1);
        assert!(!file.lock_path().exists());
    }
}
