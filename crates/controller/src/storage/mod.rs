// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Key-value store adapter
//!
//! The RSVP logic only talks to the store through the [`Store`] trait. Keys hold either a
//! field map (a redis hash) or a set of members.
//!
//! Guarantees the callers rely on:
//!
//! - A multi-field write to a single key is atomic
//! - Nothing is atomic across keys
//! - [`Store::scan_keys_by_prefix`] has no ordering and no snapshot isolation, keys written
//!   during a scan may or may not be yielded
//! - Every call is bounded in time and fails with [`StoreError::Timeout`] instead of blocking
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::time::Duration;

mod memory;
mod redis_store;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// A field map as stored under a single key
pub type Fields = HashMap<String, String>;

/// Lazy, one-shot sequence of keys returned by a scan
pub type KeyStream = BoxStream<'static, Result<String, StoreError>>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request did not complete within {0:?}")]
    Timeout(Duration),
    #[error("redis request failed: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("store is unavailable: {0}")]
    Unavailable(String),
    #[error("invalid record stored under `{key}`: {reason}")]
    InvalidRecord { key: String, reason: String },
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Upsert the given fields under `key`, creating the key if absent.
    ///
    /// Conflicting fields are replaced, other fields of the key are left untouched.
    async fn write_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError>;

    /// Atomically replace everything stored under `key` with `fields`
    async fn replace_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError>;

    /// Read all fields stored under `key`, the map is empty if the key does not exist
    async fn read_fields(&self, key: &str) -> Result<Fields, StoreError>;

    /// Atomically write `fields` under `key` if the field `guard_field` currently holds `guard_value`.
    ///
    /// Returns `false` without writing anything when the guard does not hold, including when the key is absent.
    async fn update_fields_if(
        &self,
        key: &str,
        guard_field: &str,
        guard_value: &str,
        fields: &[(&str, String)],
    ) -> Result<bool, StoreError>;

    /// Add `member` to the set stored under `set_key`. Adding an existing member is a no-op.
    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<(), StoreError>;

    /// Number of members in the set stored under `set_key`, 0 if absent
    async fn set_cardinality(&self, set_key: &str) -> Result<u64, StoreError>;

    /// Traverse all keys starting with `prefix` that exist while the scan runs
    async fn scan_keys_by_prefix(&self, prefix: &str) -> Result<KeyStream, StoreError>;

    /// Current time of the store server as unix timestamp in seconds
    async fn server_time(&self) -> Result<i64, StoreError>;

    /// Write a probe value and read it back, returns the value read
    async fn check_connection(&self) -> Result<String, StoreError>;
}
