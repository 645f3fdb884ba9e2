// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use super::{Fields, KeyStream, Store, StoreError};
use async_trait::async_trait;
use futures::{stream, Future, StreamExt};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use std::collections::VecDeque;
use std::time::Duration;

/// Number of keys redis is asked to inspect per SCAN round trip
const SCAN_BATCH_SIZE: usize = 100;

const CONNECTION_PROBE_KEY: &str = "rsvp-controller:connection-test";
const CONNECTION_PROBE_VALUE: &str = "ok";

/// Write fields of a hash only if a guard field holds the expected value
///
/// The following parameters have to be provided:
/// ```text
/// KEYS[1] = hash key
///
/// ARGV[1] = guard field
/// ARGV[2] = expected guard value
/// ARGV[3..] = field/value pairs to write
/// ```
///
/// Returns 1 when the fields were written, 0 otherwise.
const UPDATE_IF_SCRIPT: &str = r#"
if redis.call("hget", KEYS[1], ARGV[1]) ~= ARGV[2] then
  return 0
end

for i = 3, #ARGV, 2 do
  redis.call("hset", KEYS[1], ARGV[i], ARGV[i + 1])
end

return 1
"#;

/// [`Store`] backed by a redis server
///
/// Cheap to clone, all clones share the underlying multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    timeout: Duration,
    update_if_script: redis::Script,
}

impl RedisStore {
    /// Wraps the connection manager, every request is bounded by `timeout`
    pub fn new(connection: ConnectionManager, timeout: Duration) -> Self {
        Self {
            connection,
            timeout,
            update_if_script: redis::Script::new(UPDATE_IF_SCRIPT),
        }
    }

    /// Build a store from a redis url
    ///
    /// Establishing the connection is bounded by `timeout` as well.
    pub async fn connect(url: &url::Url, timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url.as_str())?;
        let connection = bounded(timeout, ConnectionManager::new(client)).await?;

        Ok(Self::new(connection, timeout))
    }
}

async fn bounded<T, F>(timeout: Duration, request: F) -> Result<T, StoreError>
where
    F: Future<Output = RedisResult<T>>,
{
    tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| StoreError::Timeout(timeout))?
        .map_err(StoreError::from)
}

/// Build a MATCH pattern that only matches keys starting with `prefix`
fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);

    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }

    pattern.push('*');
    pattern
}

struct ScanState {
    connection: ConnectionManager,
    pattern: String,
    timeout: Duration,
    // None once redis returned the final cursor
    cursor: Option<u64>,
    batch: VecDeque<String>,
}

#[async_trait]
impl Store for RedisStore {
    #[tracing::instrument(level = "debug", skip(self, fields))]
    async fn write_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();

        bounded(self.timeout, connection.hset_multiple(key, fields)).await
    }

    #[tracing::instrument(level = "debug", skip(self, fields))]
    async fn replace_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(key)
            .ignore()
            .hset_multiple(key, fields)
            .ignore();

        bounded(self.timeout, pipe.query_async(&mut connection)).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn read_fields(&self, key: &str) -> Result<Fields, StoreError> {
        let mut connection = self.connection.clone();

        bounded(self.timeout, connection.hgetall(key)).await
    }

    #[tracing::instrument(level = "debug", skip(self, guard_value, fields))]
    async fn update_fields_if(
        &self,
        key: &str,
        guard_field: &str,
        guard_value: &str,
        fields: &[(&str, String)],
    ) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();

        let mut invocation = self.update_if_script.key(key);
        invocation.arg(guard_field).arg(guard_value);

        for (field, value) in fields {
            invocation.arg(*field).arg(value);
        }

        let written: i64 = bounded(self.timeout, invocation.invoke_async(&mut connection)).await?;

        Ok(written == 1)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();

        bounded(self.timeout, connection.sadd(set_key, member)).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn set_cardinality(&self, set_key: &str) -> Result<u64, StoreError> {
        let mut connection = self.connection.clone();

        bounded(self.timeout, connection.scard(set_key)).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn scan_keys_by_prefix(&self, prefix: &str) -> Result<KeyStream, StoreError> {
        let state = ScanState {
            connection: self.connection.clone(),
            pattern: prefix_pattern(prefix),
            timeout: self.timeout,
            cursor: Some(0),
            batch: VecDeque::new(),
        };

        let keys = stream::try_unfold(state, |mut state| async move {
            loop {
                if let Some(key) = state.batch.pop_front() {
                    return Ok::<_, StoreError>(Some((key, state)));
                }

                let cursor = match state.cursor {
                    Some(cursor) => cursor,
                    None => return Ok(None),
                };

                let mut cmd = redis::cmd("SCAN");
                cmd.arg(cursor)
                    .arg("MATCH")
                    .arg(&state.pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH_SIZE);

                let (next_cursor, keys): (u64, Vec<String>) =
                    bounded(state.timeout, cmd.query_async(&mut state.connection)).await?;

                state.cursor = (next_cursor != 0).then_some(next_cursor);
                state.batch.extend(keys);
            }
        });

        Ok(keys.boxed())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn server_time(&self) -> Result<i64, StoreError> {
        let mut connection = self.connection.clone();

        // TIME replies with seconds and microseconds
        let (seconds, _micros): (i64, i64) =
            bounded(self.timeout, redis::cmd("TIME").query_async(&mut connection)).await?;

        Ok(seconds)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn check_connection(&self) -> Result<String, StoreError> {
        let mut connection = self.connection.clone();

        bounded(
            self.timeout,
            connection.set::<_, _, ()>(CONNECTION_PROBE_KEY, CONNECTION_PROBE_VALUE),
        )
        .await?;

        bounded(self.timeout, connection.get(CONNECTION_PROBE_KEY)).await
    }
}
