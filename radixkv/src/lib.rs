//! # radixkv
//!
//! A concurrent key-value store over a copy-on-write adaptive radix trie.
//!
//! Readers never wait on writers for longer than it takes to clone an `Arc`:
//! every read works against an immutable [`Tree`] version. Writers are
//! serialized, build the next version in a transaction, and publish it
//! atomically once the update closure succeeds.
//!
//! ## Example
//!
//! ```rust
//! use radixkv::Store;
//!
//! let store: Store<u64> = Store::new();
//! store.insert(b"user:1001", 1001).unwrap();
//! store.insert(b"user:1002", 1002).unwrap();
//!
//! let before = store.snapshot();
//! store
//!     .update(|w| {
//!         w.remove(b"user:1001");
//!         w.insert(b"user:1003", 1003)?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(before.get(b"user:1001"), Some(&1001));
//! assert_eq!(store.get(b"user:1001"), None);
//! assert_eq!(store.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;

pub use adaptive_radix::Tree;
pub use config::Config;
pub use error::{Error, Result};

use std::sync::atomic::{AtomicU64, Ordering};

use adaptive_radix::Txn;
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};

/// A concurrent store publishing immutable tree versions.
pub struct Store<V> {
    /// The latest published version
    current: RwLock<Tree<V>>,
    /// Serializes updates
    writer: Mutex<()>,
    /// Number of versions published so far
    generation: AtomicU64,
    config: Config,
}

/// Write access to the next version, handed to [`Store::update`].
pub struct Writer<V> {
    txn: Txn<V>,
    max_key_len: Option<usize>,
}

impl<V: Clone> Writer<V> {
    /// Insert a key-value pair, returning the previous value.
    pub fn insert(&mut self, key: impl AsRef<[u8]>, value: V) -> Result<Option<V>> {
        let key = key.as_ref();
        if let Some(max) = self.max_key_len {
            if key.len() > max {
                return Err(Error::KeyTooLong { len: key.len(), max });
            }
        }
        Ok(self.txn.insert(key, value))
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> Option<V> {
        self.txn.delete(key)
    }

    /// Remove every key starting with `prefix`.
    pub fn remove_prefix(&mut self, prefix: impl AsRef<[u8]>) -> usize {
        self.txn.delete_prefix(prefix)
    }

    /// Look up a key, including this update's own writes.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&V> {
        self.txn.get(key)
    }

    /// Number of keys in the version being built.
    pub fn len(&self) -> usize {
        self.txn.len()
    }

    /// Check if the version being built is empty.
    pub fn is_empty(&self) -> bool {
        self.txn.is_empty()
    }
}

impl<V: Clone> Store<V> {
    /// Create a new empty store with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new store with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            current: RwLock::new(Tree::new()),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
            config,
        }
    }

    /// The store's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The latest published version. It never changes after this returns.
    pub fn snapshot(&self) -> Tree<V> {
        self.current.read().clone()
    }

    /// Get the value for a key.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<V> {
        self.current.read().get(key).cloned()
    }

    /// Check if a key exists in the store.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.current.read().contains_key(key)
    }

    /// Get the number of keys in the store.
    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of versions published since the store was created.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// All entries whose key starts with `prefix`, in key order.
    pub fn prefix(&self, prefix: impl AsRef<[u8]>) -> Vec<(Vec<u8>, V)> {
        let tree = self.snapshot();
        tree.path_iter(prefix).map(|(k, v)| (k, v.clone())).collect()
    }

    /// All entries in `[start, end)`, in key order.
    pub fn range(&self, start: impl AsRef<[u8]>, end: impl AsRef<[u8]>) -> Vec<(Vec<u8>, V)> {
        let tree = self.snapshot();
        tree.range(start.as_ref()..end.as_ref())
            .map(|(k, v)| (k, v.clone()))
            .collect()
    }

    /// Run `f` against the next version and publish it if `f` succeeds.
    ///
    /// Updates are serialized. When `f` returns an error the work is
    /// discarded and readers keep seeing the previous version.
    pub fn update<R>(&self, f: impl FnOnce(&mut Writer<V>) -> Result<R>) -> Result<R> {
        let _guard = self.lock_writer()?;
        let mut writer = Writer {
            txn: self.snapshot().txn(),
            max_key_len: self.config.max_key_len,
        };
        let out = f(&mut writer)?;
        self.publish(writer.txn.commit());
        Ok(out)
    }

    /// Insert a key-value pair into the store.
    ///
    /// Returns the previous value if the key already existed.
    pub fn insert(&self, key: impl AsRef<[u8]>, value: V) -> Result<Option<V>> {
        self.update(|w| w.insert(key, value))
    }

    /// Remove a key from the store.
    ///
    /// Returns the value if the key existed.
    pub fn remove(&self, key: impl AsRef<[u8]>) -> Result<Option<V>> {
        self.update(|w| Ok(w.remove(key)))
    }

    /// Remove every key starting with `prefix`, returning how many went.
    pub fn remove_prefix(&self, prefix: impl AsRef<[u8]>) -> Result<usize> {
        self.update(|w| Ok(w.remove_prefix(prefix)))
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, ()>> {
        let Some(timeout) = self.config.writer_timeout else {
            return Ok(self.writer.lock());
        };
        self.writer.try_lock_for(timeout).ok_or_else(|| {
            warn!(store = %self.config.name, ?timeout, "timed out waiting for writer lock");
            Error::WriterBusy { waited: timeout }
        })
    }

    fn publish(&self, tree: Tree<V>) {
        let len = tree.len();
        *self.current.write() = tree;
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(store = %self.config.name, generation, len, "published version");
    }
}

impl<V: Clone> Default for Store<V> {
    fn default() -> Self {
        Self::new()
    }
}
