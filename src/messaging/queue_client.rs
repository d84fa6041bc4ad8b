//! # Redis Queue Client
//!
//! Connection lifecycle for the Redis-backed list queue. A client moves through
//! `Disconnected -> Connecting -> Ready | Error -> Closed`, logging each
//! transition. `connect()` is idempotent and retries with exponential backoff
//! plus jitter. When a command fails with a connection-class error the client
//! drops its connection and schedules a single background rebuild; callers see
//! a connectivity error for that call and an unready client until the rebuild
//! completes.

use super::errors::{QueueError, QueueResult};
use super::ListQueue;
use crate::config::loader::redact_url;
use crate::config::{QueueConfig, QueueMode};
use crate::logging::log_queue_operation;
use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::cluster_async::ClusterConnection;
use redis::{FromRedisValue, RedisError, RedisResult};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Lifecycle state of a [`RedisQueueClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Error,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// An established connection for one of the supported topologies
#[derive(Clone)]
pub enum QueueConnection {
    Single(ConnectionManager),
    Cluster(ClusterConnection),
    Sentinel(MultiplexedConnection),
}

impl fmt::Debug for QueueConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Single(_) => "Single",
            Self::Cluster(_) => "Cluster",
            Self::Sentinel(_) => "Sentinel",
        };
        f.debug_tuple("QueueConnection").field(&kind).finish()
    }
}

impl QueueConnection {
    /// Run a command on a clone of the underlying multiplexed handle
    pub async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> RedisResult<T> {
        match self {
            Self::Single(conn) => cmd.query_async(&mut conn.clone()).await,
            Self::Cluster(conn) => cmd.query_async(&mut conn.clone()).await,
            Self::Sentinel(conn) => cmd.query_async(&mut conn.clone()).await,
        }
    }
}

struct ClientInner {
    config: QueueConfig,
    connection: RwLock<Option<QueueConnection>>,
    state: RwLock<ConnectionState>,
    connect_lock: Mutex<()>,
    rebuild_scheduled: AtomicBool,
}

/// Redis-backed [`ListQueue`] with reconnect and backoff
///
/// Cloning is cheap and clones share the same connection.
#[derive(Clone)]
pub struct RedisQueueClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for RedisQueueClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisQueueClient")
            .field("mode", &self.inner.config.mode)
            .field("url", &redact_url(&self.inner.config.url))
            .field("state", &self.state())
            .finish()
    }
}

impl RedisQueueClient {
    /// Create an unconnected client; call [`connect`](Self::connect) before use
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                connection: RwLock::new(None),
                state: RwLock::new(ConnectionState::Disconnected),
                connect_lock: Mutex::new(()),
                rebuild_scheduled: AtomicBool::new(false),
            }),
        }
    }

    /// Create a client and connect it
    pub async fn connect_with(config: QueueConfig) -> QueueResult<Self> {
        let client = Self::new(config);
        client.connect().await?;
        Ok(client)
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Establish the connection, retrying with backoff
    ///
    /// Returns immediately when already connected. Concurrent callers wait for
    /// the first attempt instead of opening parallel connections.
    pub async fn connect(&self) -> QueueResult<()> {
        self.inner.connect().await
    }

    /// Current connection handle, or `NotInitialized` before `connect()`
    pub fn get_client(&self) -> QueueResult<QueueConnection> {
        self.inner
            .connection
            .read()
            .clone()
            .ok_or(QueueError::NotInitialized)
    }

    /// Drop the connection and stop any further rebuilds
    pub async fn disconnect(&self) {
        let _guard = self.inner.connect_lock.lock().await;
        self.inner.connection.write().take();
        self.inner.transition(ConnectionState::Closed);
    }

    async fn run<T: FromRedisValue>(
        &self,
        list: &str,
        operation: &str,
        cmd: redis::Cmd,
    ) -> QueueResult<T> {
        let conn = self.get_client()?;
        match conn.query::<T>(&cmd).await {
            Ok(value) => Ok(value),
            Err(err) => {
                let classified = classify(list, operation, err);
                log_queue_operation(operation, list, "failed", Some(&classified.to_string()));
                if classified.is_connectivity() {
                    self.handle_connection_loss(&classified);
                }
                Err(classified)
            }
        }
    }

    fn handle_connection_loss(&self, err: &QueueError) {
        if self.state() == ConnectionState::Closed {
            return;
        }

        warn!(error = %err, "Queue connection lost, tearing down");
        self.inner.connection.write().take();
        self.inner.transition(ConnectionState::Error);

        if self
            .inner
            .rebuild_scheduled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Queue reconnect already scheduled");
            return;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(e) = inner.connect().await {
                error!(error = %e, "Queue reconnect failed");
            }
            inner.rebuild_scheduled.store(false, Ordering::Release);
        });
    }
}

impl ClientInner {
    fn transition(&self, next: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.write(), next);
        if previous != next {
            info!(from = %previous, to = %next, mode = ?self.config.mode, "Queue connection state changed");
        }
    }

    fn is_ready(&self) -> bool {
        *self.state.read() == ConnectionState::Ready && self.connection.read().is_some()
    }

    async fn connect(&self) -> QueueResult<()> {
        if self.is_ready() {
            return Ok(());
        }

        let _guard = self.connect_lock.lock().await;
        if self.is_ready() {
            return Ok(());
        }

        self.transition(ConnectionState::Connecting);

        let max_backoff = self.config.max_backoff();
        let mut backoff = self.config.initial_backoff();
        let mut last_error = QueueError::connectivity("no connection attempts configured");

        for attempt in 1..=self.config.max_connect_attempts {
            match self.establish().await {
                Ok(conn) => {
                    *self.connection.write() = Some(conn);
                    self.transition(ConnectionState::Ready);
                    return Ok(());
                }
                Err(e @ QueueError::Configuration { .. }) => {
                    self.transition(ConnectionState::Error);
                    return Err(e);
                }
                Err(e) => {
                    self.transition(ConnectionState::Error);
                    warn!(
                        attempt = attempt,
                        max_attempts = self.config.max_connect_attempts,
                        error = %e,
                        "Queue connection attempt failed"
                    );
                    last_error = e;

                    if attempt < self.config.max_connect_attempts {
                        tokio::time::sleep(with_jitter(backoff)).await;
                        backoff = (backoff * 2).min(max_backoff);
                        self.transition(ConnectionState::Connecting);
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn establish(&self) -> QueueResult<QueueConnection> {
        match self.config.mode {
            QueueMode::Single => {
                let client = redis::Client::open(self.config.url.as_str()).map_err(|e| {
                    QueueError::configuration(format!(
                        "invalid queue url {}: {e}",
                        redact_url(&self.config.url)
                    ))
                })?;
                let manager = ConnectionManager::new(client)
                    .await
                    .map_err(|e| classify("*", "connect", e))?;
                debug!(url = %redact_url(&self.config.url), "Queue single-node connection established");
                Ok(QueueConnection::Single(manager))
            }
            QueueMode::Cluster => {
                let client = redis::cluster::ClusterClient::new(self.config.nodes.clone())
                    .map_err(|e| QueueError::configuration(format!("invalid cluster nodes: {e}")))?;
                let conn = client
                    .get_async_connection()
                    .await
                    .map_err(|e| classify("*", "connect", e))?;
                debug!(nodes = self.config.nodes.len(), "Queue cluster connection established");
                Ok(QueueConnection::Cluster(conn))
            }
            QueueMode::Sentinel => {
                let master = self.config.sentinel_master.clone().ok_or_else(|| {
                    QueueError::configuration("sentinel mode requires sentinel_master")
                })?;
                let mut client = redis::sentinel::SentinelClient::build(
                    self.config.nodes.clone(),
                    master.clone(),
                    None,
                    redis::sentinel::SentinelServerType::Master,
                )
                .map_err(|e| QueueError::configuration(format!("invalid sentinel nodes: {e}")))?;
                let conn = client
                    .get_async_connection()
                    .await
                    .map_err(|e| classify("*", "connect", e))?;
                debug!(master = %master, "Queue sentinel-resolved connection established");
                Ok(QueueConnection::Sentinel(conn))
            }
        }
    }
}

fn classify(list: &str, operation: &str, err: RedisError) -> QueueError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
        QueueError::connectivity(format!("{operation} {list}: {err}"))
    } else {
        QueueError::command(list, operation, err.to_string())
    }
}

fn with_jitter(base: Duration) -> Duration {
    let spread = (base.as_millis() as u64 / 2).max(1);
    base + Duration::from_millis(fastrand::u64(0..spread))
}

#[async_trait]
impl ListQueue for RedisQueueClient {
    async fn ensure_connected(&self) -> QueueResult<()> {
        if self.inner.is_ready() {
            return Ok(());
        }
        match self.state() {
            ConnectionState::Closed => Err(QueueError::NotInitialized),
            _ if self.inner.rebuild_scheduled.load(Ordering::Acquire) => {
                Err(QueueError::connectivity("queue reconnect in progress"))
            }
            _ => self.connect().await,
        }
    }

    async fn push(&self, list: &str, payload: &str) -> QueueResult<u64> {
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(list).arg(payload);
        self.run(list, "RPUSH", cmd).await
    }

    async fn peek(&self, list: &str) -> QueueResult<Option<String>> {
        let mut cmd = redis::cmd("LINDEX");
        cmd.arg(list).arg(0);
        self.run(list, "LINDEX", cmd).await
    }

    async fn pop(&self, list: &str, wait: Option<Duration>) -> QueueResult<Option<String>> {
        match wait.filter(|w| !w.is_zero()) {
            Some(timeout) => {
                let mut cmd = redis::cmd("BLPOP");
                cmd.arg(list).arg(timeout.as_secs_f64());
                let popped: Option<(String, String)> = self.run(list, "BLPOP", cmd).await?;
                Ok(popped.map(|(_, value)| value))
            }
            None => {
                let mut cmd = redis::cmd("LPOP");
                cmd.arg(list);
                self.run(list, "LPOP", cmd).await
            }
        }
    }

    async fn remove(&self, list: &str, payload: &str) -> QueueResult<u64> {
        let mut cmd = redis::cmd("LREM");
        cmd.arg(list).arg(1).arg(payload);
        self.run(list, "LREM", cmd).await
    }

    async fn contains(&self, list: &str, payload: &str) -> QueueResult<bool> {
        let mut cmd = redis::cmd("LPOS");
        cmd.arg(list).arg(payload);
        let position: Option<i64> = self.run(list, "LPOS", cmd).await?;
        Ok(position.is_some())
    }

    async fn len(&self, list: &str) -> QueueResult<u64> {
        let mut cmd = redis::cmd("LLEN");
        cmd.arg(list);
        self.run(list, "LLEN", cmd).await
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }
}
