//! File-backed session store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use crate::error::{Error, Result};
use crate::store::SessionStore;

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temporary sibling file that is then renamed over the
/// record, so a reader never sees a partial record.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

fn persistence(action: &str, path: &Path, err: std::io::Error) -> Error {
    Error::Persistence(format!("{action} {}: {err}", path.display()))
}

impl FileSessionStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory holding the record files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-'));
        if !valid {
            return Err(Error::Validation(format!("invalid session key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(persistence("reading", &path, err)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| persistence("creating", &self.dir, err))?;

        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)
            .await
            .map_err(|err| persistence("writing", &staging, err))?;
        if let Err(err) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(persistence("replacing", &path, err));
        }
        debug!(path = %path.display(), "session file written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(persistence("deleting", &path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        assert_eq!(store.get("user_data").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips_and_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session"));

        store.set("user_data", "{\"id\":\"u1\"}".to_string()).await.unwrap();

        assert_eq!(
            store.get("user_data").await.unwrap().as_deref(),
            Some("{\"id\":\"u1\"}")
        );
        assert!(!dir.path().join("session/user_data.json.tmp").exists());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        store.set("user_data", "{}".to_string()).await.unwrap();

        store.delete("user_data").await.unwrap();
        store.delete("user_data").await.unwrap();

        assert_eq!(store.get("user_data").await.unwrap(), None);
    }

    #[tokio::test]
    async fn path_like_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let result = store.set("../escape", "{}".to_string()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
