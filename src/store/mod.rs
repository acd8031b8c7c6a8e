//! Narrow interfaces to the external player store and tournament document store.
//!
//! Both stores hand out raw JSON records; decoding and validation happen in the engine so a
//! broken record surfaces as `TournamentError::MalformedRecord` instead of disappearing.

mod memory;

pub use memory::{MemoryPlayerStore, MemoryTournamentStore};

use crate::models::{Player, TournamentId};
use async_trait::async_trait;
use serde_json::Value;

/// Failure reported by a backing store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoreError {
    NotFound(String),
    AlreadyExists(String),
    /// Compare-and-swap failed: the record moved on since it was read.
    Conflict { expected: u64, actual: u64 },
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(key) => write!(f, "record {} not found", key),
            StoreError::AlreadyExists(key) => write!(f, "record {} already exists", key),
            StoreError::Conflict { expected, actual } => {
                write!(f, "version conflict (expected {}, found {})", expected, actual)
            }
            StoreError::Unavailable(detail) => write!(f, "store unavailable: {}", detail),
        }
    }
}

impl std::error::Error for StoreError {}

/// A stored value together with the version it was read at.
#[derive(Clone, Debug, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// Player records keyed by player id, versioned like tournament documents.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn get(&self, player_id: &str) -> Result<Versioned<Value>, StoreError>;

    /// Store a new record at version 1.
    async fn insert(&self, player: &Player) -> Result<u64, StoreError>;

    /// Replace the record only if it is still at `expected_version`. Returns the new version.
    async fn save(&self, player: &Player, expected_version: u64) -> Result<u64, StoreError>;
}

/// Tournament documents keyed by id, with optimistic concurrency.
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Store a new document at version 1.
    async fn insert(&self, id: TournamentId, doc: Value) -> Result<u64, StoreError>;

    async fn load(&self, id: TournamentId) -> Result<Versioned<Value>, StoreError>;

    /// Replace the document only if it is still at `expected_version`. Returns the new version.
    async fn save(&self, id: TournamentId, doc: Value, expected_version: u64) -> Result<u64, StoreError>;

    async fn list(&self) -> Result<Vec<Versioned<Value>>, StoreError>;
}
