//! Block store clients
//!
//! A [`BlockStore`] keeps serialized block matrices under their
//! [`BlockKey`] inside one namespace. It moves bytes only; decoding and the
//! soft-failure policy belong to the caller.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;
use mandel_common::protocol::error::{MandelError, Result};
use mandel_common::BlockKey;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::{Mutex, RwLock};

/// Redis hash holding every cached block.
pub const CACHE_NAMESPACE: &str = "mandel";

/// Keyed byte storage for block matrices.
pub trait BlockStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a BlockKey) -> BoxFuture<'a, Result<Option<Vec<u8>>>>;

    fn set<'a>(&'a self, key: &'a BlockKey, value: Vec<u8>) -> BoxFuture<'a, Result<()>>;

    /// Round trip to the server proving the connection still works.
    fn ping(&self) -> BoxFuture<'_, Result<()>>;
}

fn cache_error(err: redis::RedisError) -> MandelError {
    MandelError::CacheUnavailable(err.to_string())
}

/// Redis-backed store using one hash per namespace.
///
/// All traffic goes through a single connection guarded by one mutex, so
/// commands from concurrent render tasks are serialized.
pub struct RedisStore {
    addr: String,
    namespace: String,
    conn: Mutex<MultiplexedConnection>,
}

impl RedisStore {
    /// Opens a connection to the Redis server at `addr` (`host:port`).
    pub async fn connect(addr: &str, namespace: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(format!("redis://{}/", addr)).map_err(|e| {
            MandelError::InvalidConfig(format!("bad cache address {}: {}", addr, e))
        })?;

        let conn = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| MandelError::Timeout(timeout.as_millis() as u64))?
            .map_err(cache_error)?;

        Ok(Self {
            addr: addr.to_string(),
            namespace: namespace.into(),
            conn: Mutex::new(conn),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl BlockStore for RedisStore {
    fn get<'a>(&'a self, key: &'a BlockKey) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move {
            let mut conn = self.conn.lock().await;
            let raw: Option<Vec<u8>> = conn
                .hget(&self.namespace, key.as_str())
                .await
                .map_err(cache_error)?;
            Ok(raw)
        })
    }

    fn set<'a>(&'a self, key: &'a BlockKey, value: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut conn = self.conn.lock().await;
            let _: () = conn
                .hset(&self.namespace, key.as_str(), value)
                .await
                .map_err(cache_error)?;
            Ok(())
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut conn = self.conn.lock().await;
            let pong: String = redis::cmd("PING")
                .query_async(&mut *conn)
                .await
                .map_err(cache_error)?;
            if pong != "PONG" {
                return Err(MandelError::CacheUnavailable(format!(
                    "unexpected PING reply: {}",
                    pong
                )));
            }
            Ok(())
        })
    }
}

/// In-process store standing in for Redis in tests and embedded setups.
/// The `mandel` binary always uses [`RedisStore`].
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn contains(&self, key: &BlockKey) -> bool {
        self.entries.read().await.contains_key(key.as_str())
    }

    /// Stores raw bytes as-is, e.g. to plant a corrupt entry.
    pub async fn insert_raw(&self, key: &BlockKey, value: Vec<u8>) {
        self.entries.write().await.insert(key.as_str().to_string(), value);
    }
}

impl BlockStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a BlockKey) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move { Ok(self.entries.read().await.get(key.as_str()).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a BlockKey, value: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.entries.write().await.insert(key.as_str().to_string(), value);
            Ok(())
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
