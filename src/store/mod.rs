//! Storage collaborator: single-key reads and writes plus kind-scoped scans.
//!
//! The engine never talks to a concrete database. It acquires a [`Store`]
//! handle from a [`StoreProvider`] at the start of each operation and drops it
//! on every exit path. Scan resume positions are opaque bytes produced and
//! consumed by the store; the engine only carries them inside page cursors.

mod in_memory;

use std::fmt;

use crate::context::{CallContext, Interrupted};

pub use in_memory::{InMemoryHandle, InMemoryStore};

/// Canonical storage key: the entity kind plus the full resource name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    pub kind: String,
    pub name: String,
}

impl StoreKey {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// A kind-scoped scan request.
#[derive(Debug, Clone, Default)]
pub struct ScanQuery {
    /// Entity kind to scan.
    pub kind: String,
    /// Only names starting with this prefix are returned.
    pub prefix: String,
    /// Resume position from a previous scan item; empty starts at the beginning.
    pub resume: Vec<u8>,
    /// Ask the store to return each record at most once.
    pub distinct: bool,
}

impl ScanQuery {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn resume_at(mut self, resume: Vec<u8>) -> Self {
        self.resume = resume;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// One record yielded by a scan, with the position that resumes after it.
#[derive(Debug, Clone)]
pub struct ScanItem {
    pub key: StoreKey,
    pub value: Vec<u8>,
    pub resume: Vec<u8>,
}

/// Iterator over scan results. Each step may block on the store.
pub type Scan<'a> = Box<dyn Iterator<Item = Result<ScanItem, StoreError>> + 'a>;

/// Errors reported by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key does not exist.
    NoSuchKey,
    /// A resume position the store did not produce, or produced for another query.
    InvalidResume(String),
    /// The store could not be reached.
    Unavailable(String),
    /// Any other storage fault.
    Fault(String),
    /// The call was cancelled or its deadline passed.
    Interrupted(Interrupted),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NoSuchKey => write!(f, "no such key"),
            StoreError::InvalidResume(msg) => write!(f, "invalid resume position: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
            StoreError::Fault(msg) => write!(f, "store fault: {}", msg),
            StoreError::Interrupted(reason) => write!(f, "store call interrupted: {}", reason),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<Interrupted> for StoreError {
    fn from(reason: Interrupted) -> Self {
        StoreError::Interrupted(reason)
    }
}

/// Single-key get/put/delete and kind-scoped scans.
///
/// Every method takes the caller's [`CallContext`] and must fail with
/// [`StoreError::Interrupted`] instead of starting work once it has fired.
pub trait Store {
    /// Read one record. Absent keys fail with [`StoreError::NoSuchKey`].
    fn get(&self, ctx: &CallContext, key: &StoreKey) -> Result<Vec<u8>, StoreError>;

    /// Write one record, replacing any previous value.
    fn put(&self, ctx: &CallContext, key: &StoreKey, value: Vec<u8>)
        -> Result<StoreKey, StoreError>;

    /// Remove one record. Removing an absent key is not an error.
    fn delete(&self, ctx: &CallContext, key: &StoreKey) -> Result<(), StoreError>;

    /// Scan records of one kind in the store's native order.
    fn scan<'a>(&'a self, ctx: &'a CallContext, query: ScanQuery)
        -> Result<Scan<'a>, StoreError>;
}

/// Hands out short-lived store handles, one per logical operation.
///
/// The handle is released when dropped, which covers success, error and
/// cancellation paths alike.
pub trait StoreProvider: Send + Sync {
    type Handle: Store;

    fn connect(&self, ctx: &CallContext) -> Result<Self::Handle, StoreError>;
}
