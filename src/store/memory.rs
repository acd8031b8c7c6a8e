//! In-memory stores used by the web binary and the tests.

use super::{PlayerStore, StoreError, TournamentStore, Versioned};
use crate::models::{Player, PlayerId, TournamentId};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

fn lock_error() -> StoreError {
    StoreError::Unavailable("lock error".to_string())
}

/// Player records held as JSON, like a document store would.
#[derive(Debug, Default)]
pub struct MemoryPlayerStore {
    players: RwLock<HashMap<PlayerId, Versioned<Value>>>,
}

impl MemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw record as-is (e.g. imported data that has not been validated).
    pub fn put_raw(&self, player_id: impl Into<PlayerId>, record: Value) -> Result<u64, StoreError> {
        let mut g = self.players.write().map_err(|_| lock_error())?;
        let entry = g.entry(player_id.into()).or_insert(Versioned {
            version: 0,
            value: Value::Null,
        });
        entry.version += 1;
        entry.value = record;
        Ok(entry.version)
    }
}

fn encode(player: &Player) -> Result<Value, StoreError> {
    serde_json::to_value(player).map_err(|e| StoreError::Unavailable(e.to_string()))
}

#[async_trait]
impl PlayerStore for MemoryPlayerStore {
    async fn get(&self, player_id: &str) -> Result<Versioned<Value>, StoreError> {
        let g = self.players.read().map_err(|_| lock_error())?;
        g.get(player_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(player_id.to_string()))
    }

    async fn insert(&self, player: &Player) -> Result<u64, StoreError> {
        let record = encode(player)?;
        let mut g = self.players.write().map_err(|_| lock_error())?;
        if g.contains_key(&player.id) {
            return Err(StoreError::AlreadyExists(player.id.clone()));
        }
        g.insert(player.id.clone(), Versioned { version: 1, value: record });
        Ok(1)
    }

    async fn save(&self, player: &Player, expected_version: u64) -> Result<u64, StoreError> {
        let record = encode(player)?;
        let mut g = self.players.write().map_err(|_| lock_error())?;
        let entry = g
            .get_mut(&player.id)
            .ok_or_else(|| StoreError::NotFound(player.id.clone()))?;
        if entry.version != expected_version {
            return Err(StoreError::Conflict {
                expected: expected_version,
                actual: entry.version,
            });
        }
        entry.version += 1;
        entry.value = record;
        Ok(entry.version)
    }
}

/// Tournament documents with a version counter per document.
#[derive(Debug, Default)]
pub struct MemoryTournamentStore {
    docs: RwLock<HashMap<TournamentId, Versioned<Value>>>,
}

impl MemoryTournamentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentStore for MemoryTournamentStore {
    async fn insert(&self, id: TournamentId, doc: Value) -> Result<u64, StoreError> {
        let mut g = self.docs.write().map_err(|_| lock_error())?;
        if g.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        g.insert(id, Versioned { version: 1, value: doc });
        Ok(1)
    }

    async fn load(&self, id: TournamentId) -> Result<Versioned<Value>, StoreError> {
        let g = self.docs.read().map_err(|_| lock_error())?;
        g.get(&id).cloned().ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save(&self, id: TournamentId, doc: Value, expected_version: u64) -> Result<u64, StoreError> {
        let mut g = self.docs.write().map_err(|_| lock_error())?;
        let entry = g.get_mut(&id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if entry.version != expected_version {
            return Err(StoreError::Conflict {
                expected: expected_version,
                actual: entry.version,
            });
        }
        entry.version += 1;
        entry.value = doc;
        Ok(entry.version)
    }

    async fn list(&self) -> Result<Vec<Versioned<Value>>, StoreError> {
        let g = self.docs.read().map_err(|_| lock_error())?;
        Ok(g.values().cloned().collect())
    }
}
