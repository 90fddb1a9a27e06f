//! Timestamp oracle
//!
//! Timestamps pack a physical wall-clock reading in milliseconds into the
//! high bits and a logical counter into the low 18 bits:
//!
//! ```text
//! ts = (physical_ms << 18) | logical
//! ```
//!
//! The local oracle hands out strictly increasing values to every caller in
//! the process, both synchronously and through a lazily evaluated future.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use fedb_common::prelude::*;
use fedb_common::utils::timestamp_ms;

/// Bits reserved for the logical counter.
pub const PHYSICAL_SHIFT_BITS: u32 = 18;

/// Largest logical value within one millisecond.
pub const LOGICAL_MASK: u64 = (1 << PHYSICAL_SHIFT_BITS) - 1;

/// Compose a timestamp from its physical and logical parts.
pub fn compose_ts(physical: u64, logical: u64) -> u64 {
    (physical << PHYSICAL_SHIFT_BITS) | (logical & LOGICAL_MASK)
}

/// Physical milliseconds of a timestamp.
pub fn extract_physical(ts: u64) -> u64 {
    ts >> PHYSICAL_SHIFT_BITS
}

/// Logical counter of a timestamp.
pub fn extract_logical(ts: u64) -> u64 {
    ts & LOGICAL_MASK
}

/// Source of timestamps ordering transactions.
pub trait Oracle: Send + Sync {
    /// Get a fresh timestamp, blocking the caller for as long as it takes.
    fn get_timestamp(&self) -> Result<u64>;

    /// Get a future resolving to a fresh timestamp. Nothing is computed until
    /// the future is waited on.
    fn get_timestamp_async(&self) -> TimestampFuture;

    /// Release any held resources.
    fn close(&self);
}

/// Pending timestamp returned by [`Oracle::get_timestamp_async`].
pub struct TimestampFuture {
    inner: BoxFuture<'static, Result<u64>>,
}

impl TimestampFuture {
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = Result<u64>> + Send + 'static,
    {
        Self { inner: Box::pin(fut) }
    }

    /// A future that is already resolved.
    pub fn ready(ts: u64) -> Self {
        Self::new(futures::future::ready(Ok(ts)))
    }

    /// Wait for the timestamp.
    pub async fn wait(self) -> Result<u64> {
        self.inner.await
    }
}

impl fmt::Debug for TimestampFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampFuture").finish_non_exhaustive()
    }
}

// ============================================================================
// Local Oracle
// ============================================================================

/// Physical clock reading in milliseconds since the epoch.
pub trait PhysicalClock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl PhysicalClock for SystemClock {
    fn now_ms(&self) -> u64 {
        timestamp_ms()
    }
}

#[derive(Debug, Default)]
struct OracleState {
    last_physical: u64,
    logical: u64,
}

struct LocalOracleInner {
    clock: Arc<dyn PhysicalClock>,
    state: Mutex<OracleState>,
}

impl LocalOracleInner {
    fn next_timestamp(&self) -> u64 {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        if now > state.last_physical {
            state.last_physical = now;
            state.logical = 0;
        } else if state.logical < LOGICAL_MASK {
            // Same millisecond, or the clock stepped backwards.
            state.logical += 1;
        } else {
            // Logical space exhausted: borrow the next millisecond.
            state.last_physical += 1;
            state.logical = 0;
        }
        compose_ts(state.last_physical, state.logical)
    }
}

/// Clock-based oracle for a single process.
#[derive(Clone)]
pub struct LocalOracle {
    inner: Arc<LocalOracleInner>,
}

impl LocalOracle {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn PhysicalClock>) -> Self {
        Self {
            inner: Arc::new(LocalOracleInner {
                clock,
                state: Mutex::new(OracleState::default()),
            }),
        }
    }
}

impl Default for LocalOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LocalOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("LocalOracle")
            .field("last_physical", &state.last_physical)
            .field("logical", &state.logical)
            .finish()
    }
}

impl Oracle for LocalOracle {
    fn get_timestamp(&self) -> Result<u64> {
        Ok(self.inner.next_timestamp())
    }

    fn get_timestamp_async(&self) -> TimestampFuture {
        let inner = Arc::clone(&self.inner);
        TimestampFuture::new(async move { Ok(inner.next_timestamp()) })
    }

    fn close(&self) {
        debug!("local oracle closed");
    }
}
