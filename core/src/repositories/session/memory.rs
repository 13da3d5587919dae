//! In-process implementation of SessionStore
//!
//! Suitable for tests and single-instance development setups. Records expire
//! lazily against `tokio::time::Instant`, so paused-clock tests can advance
//! past a TTL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::errors::DomainError;

use super::r#trait::{ScanPage, SessionStore, DEFAULT_SCAN_BATCH_SIZE};

struct Record {
    /// Insertion sequence, doubles as the scan cursor
    seq: u64,
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, Record>,
    next_seq: u64,
}

impl Inner {
    fn purge_expired(&mut self, now: Instant) {
        self.records.retain(|_, record| record.expires_at > now);
    }
}

/// Session store backed by a mutex-guarded map
pub struct InMemorySessionStore {
    inner: Mutex<Inner>,
    scan_batch_size: usize,
    closed: AtomicBool,
}

impl InMemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_scan_batch_size(DEFAULT_SCAN_BATCH_SIZE)
    }

    /// Create an empty store that scans `scan_batch_size` records per page
    pub fn with_scan_batch_size(scan_batch_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            scan_batch_size: scan_batch_size.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether a live record exists for `key`
    pub async fn contains(&self, key: &str) -> bool {
        let inner = self.inner.lock().await;
        inner
            .records
            .get(key)
            .map(|record| record.expires_at > Instant::now())
            .unwrap_or(false)
    }

    /// Number of live records
    pub async fn len(&self) -> usize {
        let mut inner = self.inner.lock().await;
        inner.purge_expired(Instant::now());
        inner.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DomainError::internal("session store is closed"));
        }
        Ok(())
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, key: &str, ttl: Duration) -> Result<(), DomainError> {
        self.ensure_open()?;
        if ttl.is_zero() {
            return Err(DomainError::internal(format!("invalid ttl for key '{}'", key)));
        }

        let mut inner = self.inner.lock().await;
        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.records.insert(
            key.to_string(),
            Record {
                seq,
                expires_at: Instant::now() + ttl,
            },
        );
        debug!("Stored session key '{}' with ttl {:?}", key, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<u64, DomainError> {
        self.ensure_open()?;

        let mut inner = self.inner.lock().await;
        match inner.records.remove(key) {
            Some(record) if record.expires_at > Instant::now() => Ok(1),
            _ => Ok(0),
        }
    }

    async fn scan_page(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage, DomainError> {
        self.ensure_open()?;

        let mut inner = self.inner.lock().await;
        inner.purge_expired(Instant::now());

        let mut candidates: Vec<(&String, u64)> = inner
            .records
            .iter()
            .filter(|(_, record)| record.seq > cursor)
            .map(|(key, record)| (key, record.seq))
            .collect();
        candidates.sort_unstable_by_key(|(_, seq)| *seq);

        let count = count.max(1);
        let examined = &candidates[..candidates.len().min(count)];
        let keys = examined
            .iter()
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, _)| (*key).clone())
            .collect();
        let next_cursor = if candidates.len() > count {
            examined.last().map(|(_, seq)| *seq).unwrap_or(0)
        } else {
            0
        };

        Ok(ScanPage { keys, next_cursor })
    }

    async fn close(&self) -> Result<(), DomainError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn scan_batch_size(&self) -> usize {
        self.scan_batch_size
    }
}

/// Match `text` against a glob supporting `*`, `?` and backslash escapes
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
                continue;
            }
            Some('?') => {
                p += 1;
                t += 1;
                continue;
            }
            Some('\\') if p + 1 < pattern.len() && pattern[p + 1] == text[t] => {
                p += 2;
                t += 1;
                continue;
            }
            Some(ch) if *ch != '\\' && *ch == text[t] => {
                p += 1;
                t += 1;
                continue;
            }
            _ => {}
        }

        match backtrack {
            Some((star, matched)) => {
                p = star + 1;
                t = matched + 1;
                backtrack = Some((star, matched + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|ch| *ch == '*')
}
