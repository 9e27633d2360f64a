use crate::error::Result;
use crate::types::Identity;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Storage key of the single session slot.
pub const DEFAULT_SESSION_KEY: &str = "user_data";

/// Durable key-value storage for the session record.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the stored value for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Removes `key`. Succeeds when the key is already absent.
    async fn delete(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<T> SessionStore for Arc<T>
where
    T: SessionStore + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }
}

/// Serializes an identity into its session record form.
pub fn encode_record(identity: &Identity) -> Result<String> {
    Ok(serde_json::to_string(identity)?)
}

/// Parses a session record. Any malformed record is an error.
pub fn decode_record(raw: &str) -> Result<Identity> {
    Ok(serde_json::from_str(raw)?)
}

/// The one session slot of a [`SessionStore`].
#[derive(Debug)]
pub(crate) struct SessionSlot<S> {
    store: S,
    key: String,
}

impl<S> SessionSlot<S>
where
    S: SessionStore,
{
    pub(crate) fn new(store: S, key: String) -> Self {
        Self { store, key }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    /// Reads and decodes the record. Absent slot yields `Ok(None)`.
    pub(crate) async fn load(&self) -> Result<Option<Identity>> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(None);
        };
        decode_record(&raw).map(Some)
    }

    /// Writes the record. Storage is untouched when encoding fails.
    pub(crate) async fn save(&self, identity: &Identity) -> Result<()> {
        let record = encode_record(identity)?;
        self.store.set(&self.key, record).await?;
        debug!(key = %self.key, identity = %identity.id, "session record written");
        Ok(())
    }

    pub(crate) async fn clear(&self) -> Result<()> {
        self.store.delete(&self.key).await?;
        debug!(key = %self.key, "session record deleted");
        Ok(())
    }
}
