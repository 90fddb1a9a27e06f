//! Storage driver registry
//!
//! Maps a case-insensitive scheme name to a [`Driver`] and opens backends
//! from `scheme://path` URIs. The registry is built once at startup and then
//! shared read-only.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use fedb_common::prelude::*;

use crate::local::{LocalDriver, LOCAL_SCHEME};
use crate::{Driver, Storage};

/// Upper bound on open attempts for transient failures.
pub const MAX_OPEN_RETRIES: usize = 30;

/// How [`StorageRegistry::open`] retries transient driver failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_OPEN_RETRIES,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
        }
    }
}

/// Registered storage drivers keyed by lower-cased scheme.
#[derive(Default)]
pub struct StorageRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
    retry: RetryPolicy,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in backend registered.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        registry.drivers.insert(LOCAL_SCHEME.to_string(), Arc::new(LocalDriver));
        registry
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bind `driver` to `name`. Names are case-insensitive.
    pub fn register(&mut self, name: &str, driver: Arc<dyn Driver>) -> Result<()> {
        let name = name.to_lowercase();
        if self.drivers.contains_key(&name) {
            return Err(StorageError::AlreadyRegistered(name).into());
        }
        debug!(scheme = %name, "registered storage driver");
        self.drivers.insert(name, driver);
        Ok(())
    }

    pub fn driver(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(&name.to_lowercase()).cloned()
    }

    /// Registered scheme names, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Open the backend addressed by `uri`.
    pub async fn open(&self, uri: &str) -> Result<Arc<dyn Storage>> {
        let scheme = uri_scheme(uri);
        let driver = self
            .driver(&scheme)
            .ok_or_else(|| StorageError::UnknownScheme(scheme.clone()))?;

        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 1;
        loop {
            match driver.open(uri).await {
                Ok(storage) => return Ok(storage),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    warn!(
                        scheme = %scheme,
                        attempt,
                        error = %e,
                        "opening storage failed, retrying in {:?}",
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.retry.max_backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Lower-cased scheme of `uri`. Falls back to the text before `://` when
/// the URI does not parse, and to the empty scheme when there is none.
fn uri_scheme(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(url) => url.scheme().to_lowercase(),
        Err(_) => uri
            .split_once("://")
            .map(|(scheme, _)| scheme.to_lowercase())
            .unwrap_or_default(),
    }
}

impl fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("schemes", &self.schemes())
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::LocalStore;

    /// Fails with a transient error until `failures` attempts were made.
    struct FlakyDriver {
        failures: usize,
        attempts: AtomicUsize,
    }

    impl FlakyDriver {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                failures,
                attempts: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Driver for FlakyDriver {
        async fn open(&self, _uri: &str) -> Result<Arc<dyn Storage>> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                return Err(StorageError::Unavailable(format!("attempt {}", attempt)).into());
            }
            Ok(Arc::new(LocalStore::new("/flaky")))
        }
    }

    fn no_backoff() -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_register_is_case_insensitive() {
        let mut registry = StorageRegistry::new();
        registry.register("Local", Arc::new(LocalDriver)).unwrap();
        let err = registry.register("LOCAL", Arc::new(LocalDriver)).unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::AlreadyRegistered(ref name)) if name == "local"
        ));
        assert!(registry.driver("lOcAl").is_some());
        assert_eq!(registry.schemes(), vec!["local".to_string()]);
    }

    #[test]
    fn test_builtin_drivers() {
        let mut registry = StorageRegistry::with_builtin_drivers();
        assert!(registry.driver("local").is_some());
        assert!(registry.register("local", Arc::new(LocalDriver)).is_err());
    }

    #[tokio::test]
    async fn test_open_unknown_scheme() {
        let registry = StorageRegistry::with_builtin_drivers();
        let err = registry.open("unknownscheme://x").await.err().unwrap();
        assert!(matches!(
            err,
            Error::Storage(StorageError::UnknownScheme(ref s)) if s == "unknownscheme"
        ));
    }

    #[tokio::test]
    async fn test_open_unparsable_uri_reports_scheme() {
        let registry = StorageRegistry::with_builtin_drivers();

        let err = registry.open("/tmp/fedb").await.err().unwrap();
        assert!(matches!(
            err,
            Error::Storage(StorageError::UnknownScheme(ref s)) if s.is_empty()
        ));

        let err = registry.open("my_db://x").await.err().unwrap();
        assert!(matches!(
            err,
            Error::Storage(StorageError::UnknownScheme(ref s)) if s == "my_db"
        ));
        assert!(err.to_string().contains("[my_db] scheme not registered"));
    }

    #[test]
    fn test_uri_scheme() {
        assert_eq!(uri_scheme("LOCAL:///tmp/fedb"), "local");
        assert_eq!(uri_scheme("My_Db://x"), "my_db");
        assert_eq!(uri_scheme("/tmp/fedb"), "");
    }

    #[tokio::test]
    async fn test_open_local_uppercase_scheme() {
        let registry = StorageRegistry::with_builtin_drivers();
        let store = registry.open("LOCAL:///tmp/fedb").await.unwrap();
        assert!(store.oracle().get_timestamp().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_open_retries_transient_failures() {
        let flaky = FlakyDriver::new(3);
        let mut registry = StorageRegistry::new().with_retry_policy(no_backoff());
        registry.register("flaky", flaky.clone()).unwrap();

        assert!(registry.open("flaky://somewhere").await.is_ok());
        assert_eq!(flaky.attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_open_gives_up_after_bound() {
        let flaky = FlakyDriver::new(usize::MAX);
        let mut registry = StorageRegistry::new().with_retry_policy(no_backoff());
        registry.register("flaky", flaky.clone()).unwrap();

        let err = registry.open("flaky://somewhere").await.err().unwrap();
        assert!(matches!(err, Error::Storage(StorageError::Unavailable(_))));
        assert_eq!(flaky.attempts.load(Ordering::SeqCst), MAX_OPEN_RETRIES);
    }

    #[tokio::test]
    async fn test_open_does_not_retry_permanent_failures() {
        struct Broken(AtomicUsize);

        #[async_trait]
        impl Driver for Broken {
            async fn open(&self, _uri: &str) -> Result<Arc<dyn Storage>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(Error::Config("bad path".into()))
            }
        }

        let broken = Arc::new(Broken(AtomicUsize::new(0)));
        let mut registry = StorageRegistry::new().with_retry_policy(no_backoff());
        registry.register("broken", broken.clone()).unwrap();

        assert!(registry.open("broken://x").await.is_err());
        assert_eq!(broken.0.load(Ordering::SeqCst), 1);
    }
}
