//! Client connection state machine
//!
//! A connection moves between two working states while it serves commands:
//!
//! ```text
//!             read complete
//!   Reading ----------------> Dispatching
//!      ^                          |
//!      +--------------------------+
//!            command answered
//! ```
//!
//! Both transitions are compare-and-swap operations on an atomic status so
//! that [`ConnHandle::close`], which may run on any task, wins or loses
//! cleanly against the connection's own loop. A closed connection is in
//! `Shutdown`; a connection asked to leave after its current command is in
//! `WaitShutdown`.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Once, Weak};

use bytes::BytesMut;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use fedb_common::prelude::*;
use fedb_common::utils::query_for_log;

use crate::codec::{ErrPacket, OkPacket};
use crate::constants::*;
use crate::driver::{QueryCtx, SessionDriver};
use crate::handshake::{HandshakeResponse, InitialHandshake};
use crate::packet::PacketIo;
use crate::server::ConnRegistry;

/// Initial capacity of the per-connection scratch buffer.
const SCRATCH_CAPACITY: usize = 32 * 1024;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnStatus {
    Dispatching = 0,
    Reading = 1,
    Shutdown = 2,
    WaitShutdown = 3,
}

impl ConnStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ConnStatus::Dispatching,
            1 => ConnStatus::Reading,
            2 => ConnStatus::Shutdown,
            _ => ConnStatus::WaitShutdown,
        }
    }
}

// ============================================================================
// Shared handle
// ============================================================================

/// The part of a connection other tasks may touch: its status, the cancel
/// handle of the statement in flight, and the close path.
pub struct ConnHandle {
    id: u32,
    status: AtomicU8,
    closed: AtomicBool,
    shutdown: CancellationToken,
    exec_cancel: Mutex<Option<CancellationToken>>,
    ctx: Mutex<Option<Arc<dyn QueryCtx>>>,
    registry: Weak<ConnRegistry>,
}

impl ConnHandle {
    pub(crate) fn new(id: u32, registry: Weak<ConnRegistry>) -> Self {
        Self {
            id,
            status: AtomicU8::new(ConnStatus::Dispatching as u8),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            exec_cancel: Mutex::new(None),
            ctx: Mutex::new(None),
            registry,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn status(&self) -> ConnStatus {
        ConnStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn transition(&self, from: ConnStatus, to: ConnStatus) -> bool {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn set_exec_cancel(&self, token: Option<CancellationToken>) {
        *self.exec_cancel.lock() = token;
    }

    /// Close the connection. Only the first call does anything; returns
    /// whether this call was it.
    ///
    /// The statement in flight is cancelled before the transport is released.
    pub fn close(&self) -> bool {
        self.status.store(ConnStatus::Shutdown as u8, Ordering::SeqCst);
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
        if let Some(token) = self.exec_cancel.lock().take() {
            token.cancel();
        }
        self.shutdown.cancel();
        if let Some(ctx) = self.ctx.lock().take() {
            ctx.close();
        }
        debug!(conn_id = self.id, "connection closed");
        true
    }

    /// Ask the connection to leave: idle connections close at once, busy
    /// ones finish their current command first.
    pub fn request_shutdown(&self) {
        loop {
            match self.status() {
                ConnStatus::Reading => {
                    if self.transition(ConnStatus::Reading, ConnStatus::Shutdown) {
                        self.close();
                        return;
                    }
                }
                ConnStatus::Dispatching => {
                    if self.transition(ConnStatus::Dispatching, ConnStatus::WaitShutdown) {
                        return;
                    }
                }
                ConnStatus::Shutdown | ConnStatus::WaitShutdown => return,
            }
        }
    }
}

impl fmt::Debug for ConnHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Connection
// ============================================================================

/// What a connection needs from the server that accepted it.
#[derive(Clone)]
pub struct ConnContext {
    pub capability: u32,
    pub driver: Arc<dyn SessionDriver>,
    pub registry: Arc<ConnRegistry>,
    /// Cancelled to make the listener stop accepting.
    pub stop_listener: CancellationToken,
}

/// One client connection, owned by its task.
pub struct Connection<S> {
    pkt: PacketIo<S>,
    handle: Arc<ConnHandle>,
    server: ConnContext,
    capability: u32,
    collation: u8,
    user: String,
    db_name: String,
    attrs: HashMap<String, String>,
    salt: [u8; SALT_LEN],
    scratch: BytesMut,
    last_cmd: String,
    ctx: Option<Arc<dyn QueryCtx>>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, connection_id: u32, server: ConnContext) -> Self {
        let handle = Arc::new(ConnHandle::new(
            connection_id,
            Arc::downgrade(&server.registry),
        ));
        Self {
            pkt: PacketIo::new(stream),
            handle,
            server,
            capability: 0,
            collation: DEFAULT_COLLATION_ID,
            user: String::new(),
            db_name: String::new(),
            attrs: HashMap::new(),
            salt: random_salt(),
            scratch: BytesMut::with_capacity(SCRATCH_CAPACITY),
            last_cmd: String::new(),
            ctx: None,
        }
    }

    pub fn id(&self) -> u32 {
        self.handle.id
    }

    pub fn handle(&self) -> Arc<ConnHandle> {
        self.handle.clone()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn capability(&self) -> u32 {
        self.capability
    }

    pub fn collation(&self) -> u8 {
        self.collation
    }

    pub fn attrs(&self) -> &HashMap<String, String> {
        &self.attrs
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    // ========================================================================
    // Handshake
    // ========================================================================

    /// Run the connection phase: greet, read the client's response, open a
    /// session and acknowledge.
    pub async fn handshake(&mut self) -> Result<()> {
        self.write_initial_handshake().await?;

        if let Err(e) = self.read_handshake_response().await {
            self.write_error_best_effort(&e).await;
            return Err(e);
        }

        let driver = self.server.driver.clone();
        let opened = driver
            .open_ctx(
                self.handle.id as u64,
                self.capability,
                self.collation,
                &self.db_name,
            )
            .await;
        let ctx = match opened {
            Ok(ctx) => ctx,
            Err(e) => {
                self.write_error_best_effort(&e).await;
                return Err(e);
            }
        };
        *self.handle.ctx.lock() = Some(ctx.clone());
        self.ctx = Some(ctx);

        self.write_ok(OkPacket::default()).await?;
        self.pkt.reset_sequence();
        debug!(
            conn_id = self.handle.id,
            user = %self.user,
            db = %self.db_name,
            capability = format_args!("{:#x}", self.capability),
            "handshake complete"
        );
        Ok(())
    }

    async fn write_initial_handshake(&mut self) -> Result<()> {
        let buf = &mut self.scratch;
        buf.clear();
        InitialHandshake {
            connection_id: self.handle.id,
            salt: &self.salt,
            capability: self.server.capability,
            collation: self.collation,
            status: SERVER_STATUS_AUTOCOMMIT,
        }
        .encode(buf);
        self.pkt.write_message(buf).await?;
        self.pkt.flush().await
    }

    async fn read_handshake_response(&mut self) -> Result<()> {
        let data = self.pkt.read_message().await?;
        if HandshakeResponse::is_ssl_request(&data) {
            return Err(ProtocolError::SslUnsupported.into());
        }

        let resp = HandshakeResponse::parse(&data)?;
        self.capability = resp.capability & self.server.capability;
        if resp.collation != 0 {
            self.collation = resp.collation;
        }
        self.user = resp.user;
        self.db_name = resp.db_name;
        self.attrs = resp.attrs;
        Ok(())
    }

    /// Make the connection visible to the server. Returns `false` once the
    /// server stopped accepting connections.
    pub fn register(&self) -> bool {
        self.server.registry.register(self.handle.clone())
    }

    // ========================================================================
    // Command loop
    // ========================================================================

    /// Serve commands until the client leaves, an unrecoverable error occurs
    /// or the connection is closed from outside. Always leaves the connection
    /// closed.
    pub async fn run(&mut self) {
        install_panic_hook();
        let closed_outside = match AssertUnwindSafe(self.run_loop()).catch_unwind().await {
            Ok(closed_outside) => closed_outside,
            Err(panic) => {
                let backtrace = take_panic_backtrace()
                    .map(|bt| bt.to_string())
                    .unwrap_or_default();
                error!(
                    conn_id = self.handle.id,
                    last_cmd = %query_for_log(&self.last_cmd),
                    panic = %panic_message(panic.as_ref()),
                    "connection panicked\n{}",
                    backtrace
                );
                false
            }
        };

        if !closed_outside {
            self.close().await;
        }
    }

    /// Returns true when the connection was closed by someone else.
    async fn run_loop(&mut self) -> bool {
        let shutdown = self.handle.shutdown.clone();
        loop {
            if !self
                .handle
                .transition(ConnStatus::Dispatching, ConnStatus::Reading)
            {
                return self.handle.status() == ConnStatus::Shutdown;
            }

            self.scratch.clear();
            let read = tokio::select! {
                biased;
                _ = shutdown.cancelled() => Err(closed_error()),
                read = self.pkt.read_message() => read,
            };
            let data = match read {
                Ok(data) => data,
                Err(e) => {
                    if self.handle.status() == ConnStatus::Shutdown {
                        return true;
                    }
                    if e.is_disconnect() {
                        debug!(conn_id = self.handle.id, error = %e, "read packet failed");
                    } else {
                        warn!(conn_id = self.handle.id, error = %e, "read packet failed");
                    }
                    return false;
                }
            };

            if !self
                .handle
                .transition(ConnStatus::Reading, ConnStatus::Dispatching)
            {
                return self.handle.status() == ConnStatus::Shutdown;
            }

            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return true,
                result = self.dispatch(&data) => result,
            };

            if let Err(e) = result {
                match e {
                    Error::Eof => {
                        debug!(conn_id = self.handle.id, "client quit");
                        return false;
                    }
                    Error::Io(ref io_err) => {
                        debug!(conn_id = self.handle.id, error = %io_err, "connection lost");
                        return false;
                    }
                    Error::ResultUndetermined(_) => {
                        error!(
                            conn_id = self.handle.id,
                            error = %e,
                            last_cmd = %query_for_log(&self.last_cmd),
                            "result undetermined, closing connection"
                        );
                        return false;
                    }
                    Error::Critical(_) => {
                        error!(
                            conn_id = self.handle.id,
                            error = %e,
                            last_cmd = %query_for_log(&self.last_cmd),
                            "critical error, stop the server listener"
                        );
                        self.server.stop_listener.cancel();
                        return false;
                    }
                    _ => {
                        warn!(
                            conn_id = self.handle.id,
                            error = %e,
                            last_cmd = %query_for_log(&self.last_cmd),
                            "dispatch error"
                        );
                        if let Err(write_err) = self.write_error(&e).await {
                            debug!(conn_id = self.handle.id, error = %write_err, "write error packet failed");
                            return self.handle.is_closed();
                        }
                    }
                }
            }
            self.pkt.reset_sequence();
        }
    }

    /// Handle one command. The statement it runs can be cancelled through
    /// the connection's handle.
    pub async fn dispatch(&mut self, data: &[u8]) -> Result<()> {
        let token = self.handle.shutdown.child_token();
        self.handle.set_exec_cancel(Some(token.clone()));
        let result = self.dispatch_command(data, token).await;
        self.handle.set_exec_cancel(None);
        result
    }

    async fn dispatch_command(&mut self, data: &[u8], cancel: CancellationToken) -> Result<()> {
        let (&cmd, payload) = data.split_first().ok_or(ProtocolError::EmptyCommand)?;
        self.last_cmd = String::from_utf8_lossy(payload).into_owned();
        trace!(conn_id = self.handle.id, cmd = command_name(cmd), "dispatch");

        match cmd {
            COM_QUIT => Err(Error::Eof),
            COM_QUERY => {
                let sql = payload.strip_suffix(&[0]).unwrap_or(payload);
                self.handle_query(&String::from_utf8_lossy(sql), cancel).await
            }
            COM_PING => self.write_ok(OkPacket::default()).await,
            COM_INIT_DB => {
                let db = payload.strip_suffix(&[0]).unwrap_or(payload);
                self.use_db(&String::from_utf8_lossy(db));
                self.write_ok(OkPacket::default()).await
            }
            other => Err(ProtocolError::CommandNotSupported(other).into()),
        }
    }

    async fn handle_query(&mut self, sql: &str, cancel: CancellationToken) -> Result<()> {
        let ctx = self
            .ctx
            .clone()
            .ok_or_else(|| Error::internal("query before session was opened"))?;
        let results = ctx.execute(sql, cancel).await?;

        let last = results.last().copied().unwrap_or_default();
        self.write_ok(OkPacket {
            affected_rows: last.affected_rows,
            last_insert_id: last.last_insert_id,
            warnings: last.warnings,
            ..OkPacket::default()
        })
        .await
    }

    fn use_db(&mut self, db: &str) {
        debug!(conn_id = self.handle.id, db, "use database");
        self.db_name = db.to_string();
        if let Some(ctx) = &self.ctx {
            ctx.set_current_db(db);
        }
    }

    // ========================================================================
    // Responses
    // ========================================================================

    async fn write_ok(&mut self, mut ok: OkPacket) -> Result<()> {
        ok.status |= SERVER_STATUS_AUTOCOMMIT;
        let buf = &mut self.scratch;
        buf.clear();
        ok.encode(buf, self.capability);
        self.pkt.write_message(buf).await?;
        self.pkt.flush().await
    }

    async fn write_error(&mut self, err: &Error) -> Result<()> {
        let message = err.to_string();
        let buf = &mut self.scratch;
        buf.clear();
        ErrPacket {
            code: err.mysql_code(),
            state: err.sql_state(),
            message: &message,
        }
        .encode(buf, self.capability);
        self.pkt.write_message(buf).await?;
        self.pkt.flush().await
    }

    async fn write_error_best_effort(&mut self, err: &Error) {
        if err.is_disconnect() {
            return;
        }
        if let Err(e) = self.write_error(err).await {
            debug!(conn_id = self.handle.id, error = %e, "write error packet failed");
        }
    }

    /// Close from the connection's own task. The transport is shut down only
    /// if nobody closed the connection first.
    pub async fn close(&mut self) {
        if self.handle.close() {
            if let Err(e) = self.pkt.shutdown().await {
                debug!(conn_id = self.handle.id, error = %e, "shutdown transport failed");
            }
        }
    }
}

/// Scramble bytes. The tail is sent NUL-terminated, so zero never appears.
fn random_salt() -> [u8; SALT_LEN] {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_LEN];
    for b in salt.iter_mut() {
        *b = rng.gen_range(1..=127);
    }
    salt
}

fn closed_error() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::ConnectionAborted,
        "connection closed",
    ))
}

thread_local! {
    static PANIC_BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

/// Chain a panic hook recording a backtrace of the panic site. A future
/// panics and unwinds on the thread polling it, so the backtrace is still in
/// that thread's slot when `catch_unwind` returns.
fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = PANIC_BACKTRACE
                .try_with(|slot| *slot.borrow_mut() = Some(Backtrace::force_capture()));
            previous(info);
        }));
    });
}

fn take_panic_backtrace() -> Option<Backtrace> {
    PANIC_BACKTRACE.with(|slot| slot.borrow_mut().take())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
