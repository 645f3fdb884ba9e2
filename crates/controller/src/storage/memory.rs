// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use super::{Fields, KeyStream, Store, StoreError};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
struct Inner {
    hashes: BTreeMap<String, Fields>,
    sets: HashMap<String, HashSet<String>>,
    probe: Option<String>,
}

/// In-process [`Store`] used by tests and local experiments
///
/// Mirrors the redis semantics the controller relies on. Can be switched into an
/// unavailable state to simulate connection failures.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    server_time: Mutex<Option<i64>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let every following request fail (or succeed again) with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Pin the value returned by [`Store::server_time`], the local clock is used otherwise
    pub fn set_server_time(&self, unix_seconds: i64) {
        *self.server_time.lock() = Some(unix_seconds);
    }

    /// Number of successful mutating requests served so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of the fields under `key`, bypassing availability checks
    pub fn raw_fields(&self, key: &str) -> Option<Fields> {
        self.inner.lock().hashes.get(key).cloned()
    }

    /// Put fields under `key` directly, e.g. to seed records in an older layout
    pub fn insert_raw(&self, key: &str, fields: &[(&str, &str)]) {
        let mut inner = self.inner.lock();
        let hash = inner.hashes.entry(key.to_owned()).or_default();

        for (field, value) in fields {
            hash.insert((*field).to_owned(), (*value).to_owned());
        }
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store switched off".into()))
        } else {
            Ok(())
        }
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn apply(hash: &mut Fields, fields: &[(&str, String)]) {
    for (field, value) in fields {
        hash.insert((*field).to_owned(), value.clone());
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn write_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        self.ensure_available()?;

        apply(
            self.inner.lock().hashes.entry(key.to_owned()).or_default(),
            fields,
        );
        self.record_write();

        Ok(())
    }

    async fn replace_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        self.ensure_available()?;

        let mut hash = Fields::new();
        apply(&mut hash, fields);
        self.inner.lock().hashes.insert(key.to_owned(), hash);
        self.record_write();

        Ok(())
    }

    async fn read_fields(&self, key: &str) -> Result<Fields, StoreError> {
        self.ensure_available()?;

        Ok(self
            .inner
            .lock()
            .hashes
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_fields_if(
        &self,
        key: &str,
        guard_field: &str,
        guard_value: &str,
        fields: &[(&str, String)],
    ) -> Result<bool, StoreError> {
        self.ensure_available()?;

        let mut inner = self.inner.lock();

        match inner.hashes.get_mut(key) {
            Some(hash) if hash.get(guard_field).map(String::as_str) == Some(guard_value) => {
                apply(hash, fields);
                self.record_write();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<(), StoreError> {
        self.ensure_available()?;

        self.inner
            .lock()
            .sets
            .entry(set_key.to_owned())
            .or_default()
            .insert(member.to_owned());
        self.record_write();

        Ok(())
    }

    async fn set_cardinality(&self, set_key: &str) -> Result<u64, StoreError> {
        self.ensure_available()?;

        Ok(self
            .inner
            .lock()
            .sets
            .get(set_key)
            .map_or(0, |set| set.len() as u64))
    }

    async fn scan_keys_by_prefix(&self, prefix: &str) -> Result<KeyStream, StoreError> {
        self.ensure_available()?;

        let keys: Vec<Result<String, StoreError>> = self
            .inner
            .lock()
            .hashes
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .map(Ok)
            .collect();

        Ok(stream::iter(keys).boxed())
    }

    async fn server_time(&self) -> Result<i64, StoreError> {
        self.ensure_available()?;

        Ok(self
            .server_time
            .lock()
            .unwrap_or_else(|| chrono::Utc::now().timestamp()))
    }

    async fn check_connection(&self) -> Result<String, StoreError> {
        self.ensure_available()?;

        let mut inner = self.inner.lock();
        let probe = inner.probe.insert("ok".to_owned());

        Ok(probe.clone())
    }
}
