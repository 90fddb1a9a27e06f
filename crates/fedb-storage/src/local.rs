//! The `local` storage backend
//!
//! A single-process store addressed as `local:///some/path`. It owns a
//! clock-based [`LocalOracle`] and hands out transactions stamped with the
//! start timestamp they were resolved with.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use url::Url;

use fedb_common::prelude::*;

use crate::oracle::{LocalOracle, Oracle};
use crate::{Driver, Storage, Transaction};

/// Scheme served by [`LocalDriver`].
pub const LOCAL_SCHEME: &str = "local";

/// Driver for `local://` URIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalDriver;

#[async_trait]
impl Driver for LocalDriver {
    async fn open(&self, uri: &str) -> Result<Arc<dyn Storage>> {
        let url = Url::parse(uri)
            .map_err(|e| StorageError::InvalidUri(format!("{}: {}", uri, e)))?;
        if !url.scheme().eq_ignore_ascii_case(LOCAL_SCHEME) {
            return Err(StorageError::SchemeMismatch {
                expected: LOCAL_SCHEME.to_string(),
                found: url.scheme().to_string(),
            }
            .into());
        }

        let store = LocalStore::new(url.path());
        info!(path = %store.path().display(), "opened local store");
        Ok(Arc::new(store))
    }
}

/// Store backing the `local` scheme.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    oracle: Arc<LocalOracle>,
    closed: AtomicBool,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_oracle(path, LocalOracle::new())
    }

    pub fn with_oracle(path: impl Into<PathBuf>, oracle: LocalOracle) -> Self {
        Self {
            path: path.into(),
            oracle: Arc::new(oracle),
            closed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Storage for LocalStore {
    fn oracle(&self) -> Arc<dyn Oracle> {
        self.oracle.clone()
    }

    async fn begin_with_start_ts(&self, start_ts: u64) -> Result<Box<dyn Transaction>> {
        if self.is_closed() {
            return Err(StorageError::Closed.into());
        }
        debug!(start_ts, "begin local transaction");
        Ok(Box::new(LocalTxn { start_ts }))
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.oracle.close();
            info!(path = %self.path.display(), "closed local store");
        }
        Ok(())
    }
}

/// Transaction handle of the local store.
#[derive(Debug, Clone, Copy)]
pub struct LocalTxn {
    start_ts: u64,
}

impl Transaction for LocalTxn {
    fn start_ts(&self) -> u64 {
        self.start_ts
    }

    fn valid(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_local() {
        let store = LocalDriver.open("local:///tmp/fedb").await.unwrap();
        let ts = store.oracle().get_timestamp().unwrap();
        let txn = store.begin_with_start_ts(ts).await.unwrap();
        assert_eq!(txn.start_ts(), ts);
        assert!(txn.valid());
    }

    #[tokio::test]
    async fn test_open_scheme_is_case_insensitive() {
        assert!(LocalDriver.open("LOCAL:///tmp/fedb").await.is_ok());
    }

    #[tokio::test]
    async fn test_open_rejects_other_scheme() {
        let err = LocalDriver.open("tikv://pd:2379").await.err().unwrap();
        assert!(matches!(
            err,
            Error::Storage(StorageError::SchemeMismatch { ref found, .. }) if found == "tikv"
        ));
    }

    #[tokio::test]
    async fn test_open_rejects_garbage() {
        let err = LocalDriver.open("not a uri").await.err().unwrap();
        assert!(matches!(err, Error::Storage(StorageError::InvalidUri(_))));
    }

    #[tokio::test]
    async fn test_closed_store_refuses_transactions() {
        let store = LocalStore::new("/tmp/fedb");
        assert_eq!(store.path(), Path::new("/tmp/fedb"));
        store.close().await.unwrap();
        store.close().await.unwrap();
        assert!(store.is_closed());
        let err = store.begin_with_start_ts(1).await.err().unwrap();
        assert!(matches!(err, Error::Storage(StorageError::Closed)));
    }
}
