//! Session store trait defining the interface for refresh-session persistence.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::errors::DomainError;

/// Keys requested per scan round trip unless the store says otherwise
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 100;

/// One page of an incremental key scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Keys matching the pattern in this page (possibly empty)
    pub keys: Vec<String>,

    /// Cursor for the next page; `0` means the scan is complete
    pub next_cursor: u64,
}

/// Repository trait over a key-value store with TTLs and incremental scans
///
/// A session record is a key whose existence proves that a refresh token has
/// not been rotated or revoked. Values are never read.
///
/// # Consistency
/// - `put` and `delete` must be atomic per key: when two callers delete the
///   same key concurrently, exactly one observes a count of 1
/// - `scan_page` must be cursor based and must not block the store for the
///   whole keyspace
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `key` with the given time to live
    ///
    /// # Returns
    /// * `Ok(())` - Record stored
    /// * `Err(DomainError)` - Store unavailable
    async fn put(&self, key: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Delete `key`
    ///
    /// # Returns
    /// * `Ok(1)` - Record existed and was removed
    /// * `Ok(0)` - No such record
    /// * `Err(DomainError)` - Store unavailable
    async fn delete(&self, key: &str) -> Result<u64, DomainError>;

    /// Fetch one page of keys matching a glob `pattern`, starting at `cursor`
    ///
    /// A scan starts at cursor `0` and is complete when the returned
    /// `next_cursor` is `0`. Keys may be reported more than once.
    async fn scan_page(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage, DomainError>;

    /// Release the underlying connection
    async fn close(&self) -> Result<(), DomainError> {
        Ok(())
    }

    /// Page size used by `scan_prefix`
    fn scan_batch_size(&self) -> usize {
        DEFAULT_SCAN_BATCH_SIZE
    }

    /// Lazily stream every key starting with `prefix`
    ///
    /// Pages are fetched only as the stream is polled. The stream ends after the
    /// first error it yields.
    ///
    /// # Example
    /// ```no_run
    /// # use futures_util::StreamExt;
    /// # use gp_core::repositories::SessionStore;
    /// # async fn example(store: &impl SessionStore) {
    /// let mut keys = store.scan_prefix("5f0c3a9e-1d2b-4c7e-9a61-0b8f2d4e6a13:");
    /// while let Some(key) = keys.next().await {
    ///     println!("session: {:?}", key);
    /// }
    /// # }
    /// ```
    fn scan_prefix<'a>(&'a self, prefix: &str) -> BoxStream<'a, Result<String, DomainError>> {
        let pattern = format!("{}*", escape_glob(prefix));
        let count = self.scan_batch_size().max(1);
        let state = ScanState {
            cursor: 0,
            buffer: VecDeque::new(),
            finished: false,
        };

        stream::unfold(state, move |mut state| {
            let pattern = pattern.clone();
            async move {
                loop {
                    if let Some(key) = state.buffer.pop_front() {
                        return Some((Ok(key), state));
                    }
                    if state.finished {
                        return None;
                    }
                    match self.scan_page(state.cursor, &pattern, count).await {
                        Ok(page) => {
                            state.buffer.extend(page.keys);
                            state.cursor = page.next_cursor;
                            state.finished = page.next_cursor == 0;
                        }
                        Err(err) => {
                            state.finished = true;
                            return Some((Err(err), state));
                        }
                    }
                }
            }
        })
        .boxed()
    }
}

struct ScanState {
    cursor: u64,
    buffer: VecDeque<String>,
    finished: bool,
}

/// Escape glob metacharacters so `prefix` matches literally
pub fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
