//! TCP listener and connection registry

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info_span, Instrument};

use fedb_common::prelude::*;

use crate::connection::{ConnContext, ConnHandle, Connection};
use crate::constants::DEFAULT_CAPABILITY;
use crate::driver::SessionDriver;

/// How long to wait for connection tasks after force-closing them.
const FORCE_CLOSE_WAIT: Duration = Duration::from_secs(5);

/// Live connections keyed by id. Only connections that completed the
/// handshake are registered.
#[derive(Debug, Default)]
pub struct ConnRegistry {
    clients: RwLock<HashMap<u32, Arc<ConnHandle>>>,
    /// Only read or written while holding the `clients` write lock.
    closed: AtomicBool,
}

impl ConnRegistry {
    /// Add `handle` unless the registry was closed. Returns whether it was
    /// added.
    pub fn register(&self, handle: Arc<ConnHandle>) -> bool {
        let mut clients = self.clients.write();
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        clients.insert(handle.id(), handle);
        true
    }

    /// Refuse all further registrations. Returns `false` if the registry was
    /// already closed.
    pub fn close(&self) -> bool {
        let _clients = self.clients.write();
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn unregister(&self, id: u32) -> Option<Arc<ConnHandle>> {
        self.clients.write().remove(&id)
    }

    pub fn get(&self, id: u32) -> Option<Arc<ConnHandle>> {
        self.clients.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.clients.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of the registered handles. Acting on them must happen
    /// outside the lock, since closing a handle unregisters it.
    pub fn handles(&self) -> Vec<Arc<ConnHandle>> {
        self.clients.read().values().cloned().collect()
    }
}

/// MySQL protocol server.
pub struct Server {
    config: ServerConfig,
    local_addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
    registry: Arc<ConnRegistry>,
    driver: Arc<dyn SessionDriver>,
    capability: u32,
    next_conn_id: AtomicU32,
    stop: CancellationToken,
    tasks: TaskTracker,
}

impl Server {
    /// Bind the listener at `config.listen_addr()`.
    pub async fn new(config: ServerConfig, driver: Arc<dyn SessionDriver>) -> Result<Self> {
        let listener = TcpListener::bind(config.listen_addr()).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "server listening");

        Ok(Self {
            config,
            local_addr,
            listener: Mutex::new(Some(listener)),
            registry: Arc::new(ConnRegistry::default()),
            driver,
            capability: DEFAULT_CAPABILITY,
            next_conn_id: AtomicU32::new(1),
            stop: CancellationToken::new(),
            tasks: TaskTracker::new(),
        })
    }

    /// Address actually bound, useful when the configured port is 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ConnRegistry> {
        &self.registry
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn connection_ids(&self) -> Vec<u32> {
        self.registry.ids()
    }

    /// Accept connections until the server is closed. Returns `Ok` when the
    /// listener was stopped on purpose; accept failures are returned as is.
    pub async fn run(&self) -> Result<()> {
        let listener = match self.listener.lock().take() {
            Some(listener) => listener,
            None if self.stop.is_cancelled() => return Ok(()),
            None => return Err(Error::internal("server is already running")),
        };

        loop {
            let (stream, peer) = tokio::select! {
                _ = self.stop.cancelled() => {
                    self.close();
                    info!(addr = %self.local_addr, "listener stopped");
                    return Ok(());
                }
                accepted = listener.accept() => accepted?,
            };

            let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
            let span = info_span!("conn", conn_id, %peer);
            self.tasks.spawn(
                Self::serve_conn(
                    stream,
                    conn_id,
                    self.conn_context(),
                    self.config.tcp_keepalive,
                )
                .instrument(span),
            );
        }
    }

    fn conn_context(&self) -> ConnContext {
        ConnContext {
            capability: self.capability,
            driver: self.driver.clone(),
            registry: self.registry.clone(),
            stop_listener: self.stop.clone(),
        }
    }

    async fn serve_conn(stream: TcpStream, conn_id: u32, ctx: ConnContext, keepalive: bool) {
        if keepalive {
            if let Err(e) = crate::set_tcp_keepalive(&stream) {
                warn!(conn_id, error = %e, "failed to set TCP keepalive");
            }
        }

        let mut conn = Connection::new(stream, conn_id, ctx);
        if let Err(e) = conn.handshake().await {
            if e.is_disconnect() {
                debug!(conn_id, error = %e, "handshake aborted");
            } else {
                warn!(conn_id, error = %e, "handshake failed");
            }
            conn.close().await;
            return;
        }
        if !conn.register() {
            debug!(conn_id, "server is closing, dropping new connection");
            conn.close().await;
            return;
        }

        info!(conn_id, user = conn.user(), db = conn.db_name(), "new connection");
        conn.run().await;
    }

    /// Stop accepting new connections. Established connections are left
    /// alone; a handshake finishing after this point is refused.
    pub fn close(&self) {
        if !self.registry.close() {
            return;
        }
        self.stop.cancel();
        self.listener.lock().take();
        info!(addr = %self.local_addr, "server closed");
    }

    /// Close every registered connection immediately.
    pub fn close_connections(&self) {
        for handle in self.registry.handles() {
            handle.close();
        }
    }

    /// Stop accepting, let busy connections finish their current command and
    /// wait for all connection tasks up to the configured timeout. Whatever
    /// is still running afterwards is closed.
    pub async fn graceful_down(&self) {
        self.close();

        let handles = self.registry.handles();
        info!(connections = handles.len(), "graceful shutdown started");
        for handle in &handles {
            handle.request_shutdown();
        }

        self.tasks.close();
        let timeout = self.config.graceful_shutdown_timeout;
        if tokio::time::timeout(timeout, self.tasks.wait()).await.is_err() {
            warn!(
                remaining = self.registry.len(),
                timeout = ?timeout,
                "graceful shutdown timed out, closing remaining connections"
            );
            self.close_connections();
            if tokio::time::timeout(FORCE_CLOSE_WAIT, self.tasks.wait())
                .await
                .is_err()
            {
                warn!(tasks = self.tasks.len(), "connection tasks still running");
            }
        }
        info!("graceful shutdown complete");
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .field("connections", &self.registry.len())
            .field("closed", &self.stop.is_cancelled())
            .finish()
    }
}
