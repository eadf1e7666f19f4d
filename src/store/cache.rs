//! Concurrent get-or-compute cache with time based and size based eviction.

use std::{
    hash::Hash,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, OnceLock,
    },
    time::{Duration, Instant},
};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::config::CachePolicy;

struct Slot<V> {
    value: OnceLock<V>,
    inserted: Duration,
    last_access: AtomicU64,
}

impl<V> Slot<V> {
    fn new(now: Duration) -> Self {
        Slot {
            value: OnceLock::new(),
            inserted: now,
            last_access: AtomicU64::new(as_nanos(now)),
        }
    }

    fn touch(&self, now: Duration) {
        self.last_access.store(as_nanos(now), Ordering::Relaxed);
    }

    fn last_access(&self) -> Duration {
        Duration::from_nanos(self.last_access.load(Ordering::Relaxed))
    }
}

fn as_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// A cache of lazily computed values.
///
/// Each key maps to a shared slot holding a [`OnceLock`]: the first caller of
/// [`ExpiringCache::get_or_init`] for a missing key runs the initializer, concurrent callers for
/// the same key block on the slot and receive the same value. The map shard lock is released
/// before the initializer runs, so initializers may use the cache recursively.
///
/// Expiry follows the [`CachePolicy`]: expired slots are treated as missing on access and
/// dropped when the cache is purged. Purging happens whenever a new slot pushes the cache over
/// its entry limit, least recently read slots go first.
pub struct ExpiringCache<K, V> {
    policy: CachePolicy,
    epoch: Instant,
    entries: DashMap<K, Arc<Slot<V>>>,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache governed by `policy`.
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        ExpiringCache {
            policy,
            epoch: Instant::now(),
            entries: DashMap::new(),
        }
    }

    /// The eviction policy.
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn is_expired(&self, slot: &Slot<V>, now: Duration) -> bool {
        if slot.value.get().is_none() {
            return false;
        }
        let too_old = self
            .policy
            .time_to_live
            .is_some_and(|ttl| now.saturating_sub(slot.inserted) > ttl);
        let too_idle = self
            .policy
            .time_to_idle
            .is_some_and(|tti| now.saturating_sub(slot.last_access()) > tti);
        too_old || too_idle
    }

    /// The cached value for `key`, if present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.now();
        let slot = self.entries.get(key).map(|slot| Arc::clone(slot.value()))?;
        if self.is_expired(&slot, now) {
            return None;
        }
        let value = slot.value.get()?.clone();
        slot.touch(now);
        Some(value)
    }

    /// The cached value for `key`, computing it with `init` if it is missing or expired.
    pub fn get_or_init<F>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> V,
    {
        let now = self.now();
        let existing = self.entries.get(&key).map(|slot| Arc::clone(slot.value()));

        let (slot, created) = match existing {
            Some(slot) if !self.is_expired(&slot, now) => (slot, false),
            _ => match self.entries.entry(key) {
                Entry::Occupied(mut occupied) => {
                    if self.is_expired(occupied.get(), now) {
                        occupied.insert(Arc::new(Slot::new(now)));
                        (Arc::clone(occupied.get()), true)
                    } else {
                        (Arc::clone(occupied.get()), false)
                    }
                }
                Entry::Vacant(vacant) => {
                    let slot = Arc::new(Slot::new(now));
                    vacant.insert(Arc::clone(&slot));
                    (slot, true)
                }
            },
        };

        let value = slot.value.get_or_init(init).clone();
        slot.touch(self.now());

        if created && self.over_capacity() {
            self.purge();
        }
        value
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn insert(&self, key: K, value: V) {
        let now = self.now();
        let slot = Slot::new(now);
        let _ = slot.value.set(value);
        self.entries.insert(key, Arc::new(slot));

        if self.over_capacity() {
            self.purge();
        }
    }

    /// Drop the value for `key`.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries
            .remove(key)
            .and_then(|(_, slot)| slot.value.get().cloned())
    }

    /// Returns `true` if a live value is cached for `key`. Does not count as a read.
    pub fn contains_key(&self, key: &K) -> bool {
        let now = self.now();
        self.entries
            .get(key)
            .is_some_and(|slot| slot.value.get().is_some() && !self.is_expired(&slot, now))
    }

    /// Number of stored slots, expired ones included until the next purge.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of all live values.
    pub fn values(&self) -> Vec<V> {
        let now = self.now();
        self.entries
            .iter()
            .filter(|slot| !self.is_expired(slot.value(), now))
            .filter_map(|slot| slot.value().value.get().cloned())
            .collect()
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.clear();
    }

    fn over_capacity(&self) -> bool {
        self.policy
            .max_entries
            .is_some_and(|max| self.entries.len() > max)
    }

    /// Drop expired slots, then the least recently read ones while over the entry limit.
    pub fn purge(&self) {
        let now = self.now();
        self.entries.retain(|_, slot| !self.is_expired(slot, now));

        let Some(max) = self.policy.max_entries else {
            return;
        };
        let excess = self.entries.len().saturating_sub(max);
        if excess == 0 {
            return;
        }

        let mut by_access: Vec<(K, Duration)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_access()))
            .collect();
        by_access.sort_by_key(|(_, last_access)| *last_access);

        for (key, _) in by_access.into_iter().take(excess) {
            self.entries.remove(&key);
        }
    }
}
