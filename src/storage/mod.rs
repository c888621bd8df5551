//! Storage Engine Module
//!
//! This module provides the keyspace of EmberKV: a thread-safe, sharded
//! key-value store holding strings and lists with TTL support, and a
//! background expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ purge_expired(shard, batch)
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **Typed values**: strings and lists, with WRONGTYPE on mismatch
//! - **Lazy Expiry**: Expired keys are cleaned on access
//! - **Active Expiry**: Background sweeper cleans orphaned expired keys
//!
//! ## Example
//!
//! ```
//! use emberkv::storage::{KeyTtl, SetExpiry, SetOptions, StorageEngine};
//! use bytes::Bytes;
//! use std::time::{Duration, Instant};
//!
//! let engine = StorageEngine::new();
//!
//! // Basic operations
//! engine.set(Bytes::from("name"), Bytes::from("Ariz"), SetOptions::default()).unwrap();
//! assert_eq!(engine.get(&Bytes::from("name")).unwrap(), Some(Bytes::from("Ariz")));
//!
//! // Set with TTL
//! let options = SetOptions {
//!     expiry: SetExpiry::At(Instant::now() + Duration::from_secs(3600)),
//!     ..Default::default()
//! };
//! engine.set(Bytes::from("session"), Bytes::from("token123"), options).unwrap();
//! assert!(matches!(engine.ttl(&Bytes::from("session")), KeyTtl::Expires(_)));
//! ```

pub mod engine;
pub mod entry;
pub mod expiry;
pub mod glob;

// Re-export commonly used types
pub use engine::{
    KeyTtl, ListEnd, SetCondition, SetExpiry, SetOptions, SetOutcome, StorageEngine, StorageStats,
    StoreError, StoreResult,
};
pub use entry::{Entry, Value};
pub use expiry::{sweep_once, ExpiryConfig, ExpirySweeper, SweepReport};
pub use glob::glob_match;
