//! Keyed detection-log store

use async_trait::async_trait;
use dashmap::DashMap;
use platewatch_core::{DetectionRecord, Result, Scope};
use std::collections::HashMap;
use tracing::debug;

/// Persistence collaborator for detection records.
///
/// Records are keyed by plate text inside a [`Scope`]. `put` is an upsert
/// (last write wins on the key); `delete` of a missing key is not an error.
#[async_trait]
pub trait DetectionStore: Send + Sync {
    async fn put(&self, scope: &Scope, key: &str, record: &DetectionRecord) -> Result<()>;

    async fn get(&self, scope: &Scope, key: &str) -> Result<Option<DetectionRecord>>;

    async fn delete(&self, scope: &Scope, key: &str) -> Result<()>;

    /// All records of one user, across every camera scope.
    async fn list_user(&self, user_id: &str) -> Result<Vec<(Scope, DetectionRecord)>>;
}

/// In-memory store, one map per scope
#[derive(Default)]
pub struct MemoryStore {
    scopes: DashMap<Scope, HashMap<String, DetectionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored under `scope`
    pub fn len(&self, scope: &Scope) -> usize {
        self.scopes.get(scope).map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, scope: &Scope) -> bool {
        self.len(scope) == 0
    }

    pub fn keys(&self, scope: &Scope) -> Vec<String> {
        let mut keys: Vec<String> = self
            .scopes
            .get(scope)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl DetectionStore for MemoryStore {
    async fn put(&self, scope: &Scope, key: &str, record: &DetectionRecord) -> Result<()> {
        self.scopes
            .entry(scope.clone())
            .or_default()
            .insert(key.to_string(), record.clone());
        debug!("Stored record {} for {:?}", key, scope);
        Ok(())
    }

    async fn get(&self, scope: &Scope, key: &str) -> Result<Option<DetectionRecord>> {
        Ok(self.scopes.get(scope).and_then(|m| m.get(key).cloned()))
    }

    async fn delete(&self, scope: &Scope, key: &str) -> Result<()> {
        if let Some(mut records) = self.scopes.get_mut(scope) {
            records.remove(key);
        }
        Ok(())
    }

    async fn list_user(&self, user_id: &str) -> Result<Vec<(Scope, DetectionRecord)>> {
        let mut out = Vec::new();
        for entry in self.scopes.iter() {
            if entry.key().user_id != user_id {
                continue;
            }
            for record in entry.value().values() {
                out.push((entry.key().clone(), record.clone()));
            }
        }
        Ok(out)
    }
}
