//! Key scanning
//!
//! Pages through the source keyspace with `SCAN cursor MATCH pattern COUNT n`
//! and regroups the keys into fixed-size batches. SCAN only guarantees that
//! keys present for the whole iteration are returned at least once; keys
//! written or deleted while scanning may be missed or repeated.

use std::collections::VecDeque;

use bytes::Bytes;
use tracing::debug;

use crate::endpoint::Endpoint;
use redis_cp_core::Result;

/// A non-empty, ordered group of keys handed to the engine in one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBatch {
    keys: Vec<Bytes>,
}

impl KeyBatch {
    /// Wrap `keys`; `None` if there are none
    pub fn new(keys: Vec<Bytes>) -> Option<Self> {
        if keys.is_empty() {
            None
        } else {
            Some(Self { keys })
        }
    }

    /// Keys in scan order
    pub fn keys(&self) -> &[Bytes] {
        &self.keys
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Lazy batch producer over one SCAN iteration
///
/// Nothing is fetched until [`next_batch`](Self::next_batch) is called, and
/// then only as many pages as needed to fill one batch.
#[derive(Debug)]
pub struct Scanner {
    pattern: String,
    scan_count: usize,
    batch_size: usize,
    cursor: u64,
    exhausted: bool,
    pending: VecDeque<Bytes>,
    pages: u64,
}

impl Scanner {
    /// Scan keys matching `pattern`, `scan_count` per page, `batch_size` per batch
    pub fn new(pattern: impl Into<String>, scan_count: usize, batch_size: usize) -> Self {
        Self {
            pattern: pattern.into(),
            scan_count: scan_count.max(1),
            batch_size: batch_size.max(1),
            cursor: 0,
            exhausted: false,
            pending: VecDeque::new(),
            pages: 0,
        }
    }

    /// Pull the next batch, or `None` once the iteration is complete
    pub async fn next_batch<E>(&mut self, endpoint: &mut E) -> Result<Option<KeyBatch>>
    where
        E: Endpoint + ?Sized,
    {
        while self.pending.len() < self.batch_size && !self.exhausted {
            let page = endpoint
                .scan(self.cursor, &self.pattern, self.scan_count)
                .await?;
            self.pages += 1;
            debug!(
                cursor = self.cursor,
                next = page.cursor,
                keys = page.keys.len(),
                "scan page"
            );
            self.pending.extend(page.keys);
            self.cursor = page.cursor;
            self.exhausted = page.cursor == 0;
        }

        let take = self.batch_size.min(self.pending.len());
        Ok(KeyBatch::new(self.pending.drain(..take).collect()))
    }

    /// SCAN round trips issued so far
    pub fn pages_fetched(&self) -> u64 {
        self.pages
    }

    /// Whether the cursor has wrapped back to zero
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
