//! Sled-backed detection-log store

use crate::store::DetectionStore;
use async_trait::async_trait;
use platewatch_core::{DetectionRecord, Error, Result, Scope};
use std::path::Path;
use tracing::{debug, info};

const ROOT: &str = "detection_logs";

/// Durable local store. Keys are `detection_logs/{user}/{camera}/{plate}`
/// with every segment URL-encoded, values are JSON.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)
            .map_err(|e| Error::Storage(format!("Sled error: {}", e)))?;
        info!("Opened detection store at {:?}", path);
        Ok(Self { db })
    }

    /// Temporary store that is removed when dropped
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| Error::Storage(format!("Sled error: {}", e)))?;
        Ok(Self { db })
    }

    pub async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| Error::Storage(format!("Sled flush error: {}", e)))?;
        Ok(())
    }

    fn user_prefix(user_id: &str) -> String {
        format!("{}/{}/", ROOT, urlencoding::encode(user_id))
    }

    fn record_key(scope: &Scope, key: &str) -> String {
        format!(
            "{}{}/{}",
            Self::user_prefix(&scope.user_id),
            urlencoding::encode(&scope.camera_source),
            urlencoding::encode(key)
        )
    }

    fn parse_scope(raw_key: &[u8]) -> Result<Scope> {
        let key = std::str::from_utf8(raw_key)
            .map_err(|e| Error::Storage(format!("Invalid key encoding: {}", e)))?;
        let parts: Vec<&str> = key.split('/').collect();
        if parts.len() != 4 || parts[0] != ROOT {
            return Err(Error::Storage(format!("Malformed record key: {}", key)));
        }
        let decode = |s: &str| {
            urlencoding::decode(s)
                .map(|c| c.into_owned())
                .map_err(|e| Error::Storage(format!("Invalid key segment {}: {}", s, e)))
        };
        Ok(Scope::new(decode(parts[1])?, decode(parts[2])?))
    }
}

#[async_trait]
impl DetectionStore for SledStore {
    async fn put(&self, scope: &Scope, key: &str, record: &DetectionRecord) -> Result<()> {
        let data = serde_json::to_vec(record)?;
        self.db
            .insert(Self::record_key(scope, key), data)
            .map_err(|e| Error::Storage(format!("Sled insert error: {}", e)))?;
        debug!("Stored record {} for {:?}", key, scope);
        Ok(())
    }

    async fn get(&self, scope: &Scope, key: &str) -> Result<Option<DetectionRecord>> {
        match self.db.get(Self::record_key(scope, key)) {
            Ok(Some(data)) => Ok(Some(serde_json::from_slice(&data)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(Error::Storage(format!("Sled get error: {}", e))),
        }
    }

    async fn delete(&self, scope: &Scope, key: &str) -> Result<()> {
        self.db
            .remove(Self::record_key(scope, key))
            .map_err(|e| Error::Storage(format!("Sled remove error: {}", e)))?;
        Ok(())
    }

    async fn list_user(&self, user_id: &str) -> Result<Vec<(Scope, DetectionRecord)>> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(Self::user_prefix(user_id)) {
            let (key, value) = item.map_err(|e| Error::Storage(format!("Sled scan error: {}", e)))?;
            let scope = Self::parse_scope(&key)?;
            let record: DetectionRecord = serde_json::from_slice(&value)?;
            out.push((scope, record));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_encoding_round_trips_scope() {
        let scope = Scope::new("user 1", "rtsp://10.0.0.2/stream");
        let key = SledStore::record_key(&scope, "WWA1234");
        assert!(key.starts_with("detection_logs/user%201/"));
        assert_eq!(key.matches('/').count(), 3);
        assert_eq!(SledStore::parse_scope(key.as_bytes()).unwrap(), scope);
    }

    #[test]
    fn test_malformed_key_is_rejected() {
        assert!(SledStore::parse_scope(b"other/a/b/c").is_err());
        assert!(SledStore::parse_scope(b"detection_logs/a/b").is_err());
    }
}
