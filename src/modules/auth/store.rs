use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Represents a single registered account
///
/// Serialized with the short keys used in `users.json` (`password`, `fname`, `lname`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    #[serde(rename = "password")]
    pub password_hash: String, // Hex digest, never plaintext
    #[serde(rename = "fname")]
    pub first_name: String,
    #[serde(rename = "lname")]
    pub last_name: String,
}

/// Errors raised by a persistence backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("credential file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("credential store lock poisoned")]
    Poisoned,

    #[error("deadline passed before the write started")]
    DeadlineExceeded,
}

/// Where the user collection lives. Loaded and saved wholesale.
pub trait CredentialBackend: Send {
    /// Return the persisted collection, initializing empty storage if none exists
    fn load(&self) -> Result<Vec<UserRecord>, StoreError>;

    /// Overwrite the persisted collection
    fn save(&self, users: &[UserRecord]) -> Result<(), StoreError>;
}

/// JSON array on disk, replaced atomically on every save
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl CredentialBackend for JsonFileBackend {
    fn load(&self) -> Result<Vec<UserRecord>, StoreError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // First use: converge to a valid, loadable file
                log::info!("Credential file {} not found, initializing", self.path.display());
                self.save(&[])?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        if data.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&data)?)
    }

    fn save(&self, users: &[UserRecord]) -> Result<(), StoreError> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir)?;

        // Write the full collection next to the target, then rename over it so
        // readers see either the old file or the new one, never a partial write
        let mut temp_file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp_file, users).map_err(io::Error::from)?;
        temp_file.as_file().sync_all()?;
        temp_file
            .persist(&self.path)
            .map_err(|e| StoreError::Io(e.error))?;

        Ok(())
    }
}

/// In-process backend, mostly for tests
#[derive(Default)]
pub struct MemoryBackend {
    users: Mutex<Vec<UserRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserRecord>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }
}

impl CredentialBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<UserRecord>, StoreError> {
        let users = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(users.clone())
    }

    fn save(&self, users: &[UserRecord]) -> Result<(), StoreError> {
        let mut stored = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        *stored = users.to_vec();
        Ok(())
    }
}

/// Single-writer front for a backend
///
/// Every access goes through one mutex, so a load-modify-save cycle can never
/// interleave with another one in this process.
pub struct CredentialStore {
    backend: Mutex<Box<dyn CredentialBackend>>,
}

impl CredentialStore {
    pub fn new(backend: impl CredentialBackend + 'static) -> Self {
        Self {
            backend: Mutex::new(Box::new(backend)),
        }
    }

    /// Store backed by a JSON file at `path`
    pub fn json_file(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonFileBackend::new(path))
    }

    /// Store held entirely in memory
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn CredentialBackend>>, StoreError> {
        self.backend.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Load the current collection
    pub fn load(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.lock()?.load()
    }

    /// Overwrite the persisted collection
    pub fn save(&self, users: &[UserRecord]) -> Result<(), StoreError> {
        self.lock()?.save(users)
    }

    /// Load, apply `change`, and persist, all under the store lock
    ///
    /// Nothing is written when `change` fails.
    pub fn update<T, E>(
        &self,
        change: impl FnOnce(&mut Vec<UserRecord>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        self.update_before(None, change)
    }

    /// Like `update`, but gives up without writing if `deadline` has passed
    /// by the time the save would start. A save that has started always
    /// runs to completion.
    pub fn update_before<T, E>(
        &self,
        deadline: Option<Instant>,
        change: impl FnOnce(&mut Vec<UserRecord>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let backend = self.lock()?;
        let mut users = backend.load()?;
        let result = change(&mut users)?;
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(StoreError::DeadlineExceeded.into());
        }
        backend.save(&users)?;
        Ok(result)
    }

    /// Remove an account. Administrative use only, not reachable over HTTP.
    pub fn remove_user(&self, username: &str) -> Result<bool, StoreError> {
        self.update(|users| {
            let before = users.len();
            users.retain(|u| u.username != username);
            Ok::<_, StoreError>(users.len() != before)
        })
    }
}

/// Function to look up a user by exact username
pub fn find_by_username<'a>(users: &'a [UserRecord], username: &str) -> Option<&'a UserRecord> {
    users.iter().find(|u| u.username == username)
}

/// Function to check whether a username is taken
pub fn exists(users: &[UserRecord], username: &str) -> bool {
    find_by_username(users, username).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn test_user(username: &str) -> UserRecord {
        UserRecord {
            username: username.to_string(),
            password_hash: "dummy_hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        }
    }

    #[test]
    fn test_missing_file_initializes_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        let backend = JsonFileBackend::new(&path);

        assert!(backend.load().unwrap().is_empty());

        // The empty state was persisted and is loadable on its own
        let on_disk = fs::read_to_string(&path).unwrap();
        let parsed: Vec<UserRecord> = serde_json::from_str(&on_disk).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_missing_parent_directory_is_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("users.json");
        let backend = JsonFileBackend::new(&path);

        assert!(backend.load().unwrap().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_file_save_and_load() {
        let dir = tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("users.json"));

        let users = vec![test_user("alice"), test_user("bobby")];
        backend.save(&users).unwrap();

        assert_eq!(backend.load().unwrap(), users);
    }

    #[test]
    fn test_on_disk_field_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        JsonFileBackend::new(&path).save(&[test_user("alice")]).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let record = &value[0];
        assert_eq!(record["username"], "alice");
        assert_eq!(record["password"], "dummy_hash");
        assert_eq!(record["fname"], "Test");
        assert_eq!(record["lname"], "User");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, "{not json").unwrap();

        let result = JsonFileBackend::new(&path).load();
        assert!(matches!(result, Err(StoreError::Corrupt(_))));

        // Left untouched for an operator to inspect
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn test_blank_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, "\n").unwrap();

        assert!(JsonFileBackend::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn test_find_and_exists() {
        let users = vec![test_user("alice"), test_user("bobby")];

        assert_eq!(find_by_username(&users, "bobby").unwrap().username, "bobby");
        assert!(find_by_username(&users, "carol").is_none());
        assert!(exists(&users, "alice"));
        assert!(!exists(&users, "Alice"));
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let store = CredentialStore::new(MemoryBackend::with_users(vec![test_user("alice")]));

        let result: Result<(), StoreError> = store.update(|users| {
            users.clear();
            Err(StoreError::Poisoned)
        });
        assert!(result.is_err());
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_update_past_deadline_writes_nothing() {
        let store = CredentialStore::in_memory();

        let result = store.update_before(Some(Instant::now()), |users| {
            users.push(test_user("alice"));
            Ok::<_, StoreError>(())
        });
        assert!(matches!(result, Err(StoreError::DeadlineExceeded)));
        assert!(store.load().unwrap().is_empty());

        let later = Instant::now() + std::time::Duration::from_secs(60);
        store
            .update_before(Some(later), |users| {
                users.push(test_user("alice"));
                Ok::<_, StoreError>(())
            })
            .unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_user() {
        let store = CredentialStore::new(MemoryBackend::with_users(vec![
            test_user("alice"),
            test_user("bobby"),
        ]));

        assert!(store.remove_user("alice").unwrap());
        assert!(!store.remove_user("alice").unwrap());

        let users = store.load().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "bobby");
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let dir = tempdir().unwrap();
        let store = Arc::new(CredentialStore::json_file(dir.path().join("users.json")));

        let names = ["aaaa", "bbbb", "cccc", "dddd", "eeee", "ffff", "gggg", "hhhh"];
        let handles: Vec<_> = names
            .iter()
            .map(|name| {
                let store = Arc::clone(&store);
                let name = name.to_string();
                thread::spawn(move || {
                    store
                        .update(|users| {
                            users.push(test_user(&name));
                            Ok::<_, StoreError>(())
                        })
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let users = store.load().unwrap();
        assert_eq!(users.len(), names.len());
        for name in names {
            assert!(exists(&users, name));
        }
    }
}
