//! Concurrent cache of per-server player counts.
//!
//! The store is written by the inbound message handler, iterated by the
//! polling loop, and read by synchronous placeholder lookups, all at the
//! same time. A [`DashMap`] gives key-level-atomic access for that mix
//! without a global lock; no multi-key invariant exists, so none is needed.
//!
//! # Reads that write
//!
//! Looking up a name that is not in the store inserts it at zero. This is a
//! deliberate, load-bearing side effect, not an accident: the polling loop
//! asks the proxy about every name present in the store, so the first
//! lookup of `"lobby"` is what causes `"lobby"` to start being polled. The
//! insert happens through a single `entry(..).or_insert(0)` so concurrent
//! first lookups cannot race a read-then-write.

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

/// Concurrent mapping from server name to player count, plus the
/// network-wide total.
///
/// Entries are only ever overwritten or cleared wholesale; nothing evicts
/// individual servers during normal operation.
#[derive(Debug, Default)]
pub struct CountStore {
    counts: DashMap<String, i32>,
    total: AtomicI64,
}

impl CountStore {
    /// Creates an empty store with a zero total.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `identifier` to a count.
    ///
    /// - `"all"` / `"total"` (case-insensitive) return the network total.
    /// - A comma-separated identifier returns the sum of each listed name's
    ///   count. Entries are intentionally not trimmed: `"a, b"` looks up
    ///   `" b"`, matching how the request side has always split.
    /// - Any other identifier returns that single name's count.
    ///
    /// Every name that is looked up and absent is registered at zero (see
    /// the module docs); lookups therefore never fail.
    pub fn get(&self, identifier: &str) -> i64 {
        if identifier.eq_ignore_ascii_case("all") || identifier.eq_ignore_ascii_case("total") {
            return self.total();
        }
        if identifier.contains(',') {
            identifier
                .split(',')
                .map(|name| i64::from(self.count_or_register(name)))
                .sum()
        } else {
            i64::from(self.count_or_register(identifier))
        }
    }

    /// Overwrites the network-wide total.
    pub fn set_total(&self, count: i32) {
        self.total.store(i64::from(count), Ordering::Relaxed);
    }

    /// Returns the most recently set network-wide total.
    pub fn total(&self) -> i64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Overwrites `server`'s count. Last write wins; there is no ordering
    /// guarantee across different servers.
    pub fn set_count(&self, server: &str, count: i32) {
        self.counts.insert(server.to_string(), count);
    }

    /// Registers `server` at zero only if it is not already present.
    ///
    /// Discovery must not clobber a count that an update already delivered,
    /// so unlike [`set_count`](Self::set_count) this never overwrites.
    pub fn ensure_known(&self, server: &str) {
        self.counts.entry(server.to_string()).or_insert(0);
    }

    /// Returns a snapshot of every known server name.
    ///
    /// Iteration order is unspecified. The snapshot lets the polling loop
    /// walk the keys without holding shard locks across channel sends.
    pub fn server_names(&self) -> Vec<String> {
        self.counts.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of known servers.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no server is known yet.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Removes every entry and resets the total to zero.
    pub fn clear(&self) {
        self.counts.clear();
        self.total.store(0, Ordering::Relaxed);
    }

    fn count_or_register(&self, name: &str) -> i32 {
        // Fast path: avoid allocating the key for names already present.
        if let Some(existing) = self.counts.get(name) {
            return *existing;
        }
        *self.counts.entry(name.to_string()).or_insert(0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
