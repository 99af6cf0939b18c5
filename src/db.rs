use std::{
    collections::HashMap,
    sync::Arc,
    time::SystemTime,
};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug)]
/// A single database entry.
struct Entry {
    /// Stored data
    data: Bytes,
    /// Wall clock time at which the data expires
    expires_at: Option<SystemTime>,
}

impl Entry {
    fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|when| when <= now)
    }
}

/// Precondition checked against the key's presence before a `set`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SetCondition {
    #[default]
    Always,
    /// `NX`: only write when the key does not exist.
    IfAbsent,
    /// `XX`: only write when the key already exists.
    IfPresent,
}

/// What happens to the key's time to live on a `set`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Expiry {
    /// Drop any previous TTL, the key does not expire.
    #[default]
    Persist,
    /// `KEEPTTL`: retain whatever expiry the key had.
    Keep,
    /// Expire at the given wall clock time.
    At(SystemTime),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub condition: SetCondition,
    pub expiry: Expiry,
}

/// Result of a conditional `set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    /// `false` when the `NX`/`XX` condition did not hold.
    pub written: bool,
    /// Value held by the key before the call, if it was live.
    pub previous: Option<Bytes>,
}

#[derive(Debug, Clone, Default)]
/// Key/value store shared across all connections.
///
/// Expired keys are evicted lazily, by whichever operation next touches them.
/// Every operation runs under a single lock, so each one is atomic with
/// respect to the others.
///
/// A `Db` instance is a handle to shared state. Cloning `Db` is shallow and
/// only incurs an atomic ref count increment.
pub(crate) struct Db {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Db {
    /// Create a new empty `Db` instance.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Get the value associated with a key.
    ///
    /// Returns `None` if there is no value associated with the key. An entry
    /// whose expiry has passed is removed as part of this call.
    pub(crate) fn get(&self, key: &str) -> Option<Bytes> {
        let mut entries = self.entries.lock();
        live_entry(&mut entries, key, SystemTime::now()).map(|e| e.data.clone())
    }

    /// Set the value associated with a key, subject to `options`.
    pub(crate) fn set(&self, key: String, value: Bytes, options: SetOptions) -> SetOutcome {
        let mut entries = self.entries.lock();
        let now = SystemTime::now();

        let (previous, previous_expiry) = match live_entry(&mut entries, &key, now) {
            Some(entry) => (Some(entry.data.clone()), entry.expires_at),
            None => (None, None),
        };

        let allowed = match options.condition {
            SetCondition::Always => true,
            SetCondition::IfAbsent => previous.is_none(),
            SetCondition::IfPresent => previous.is_some(),
        };
        if !allowed {
            debug!(key, condition = ?options.condition, "set condition not met");
            return SetOutcome {
                written: false,
                previous,
            };
        }

        let expires_at = match options.expiry {
            Expiry::Persist => None,
            Expiry::Keep => previous_expiry,
            Expiry::At(when) => Some(when),
        };
        entries.insert(
            key,
            Entry {
                data: value,
                expires_at,
            },
        );

        SetOutcome {
            written: true,
            previous,
        }
    }

    /// Remove `keys`, returning how many live keys were removed.
    pub(crate) fn delete<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> usize {
        let mut entries = self.entries.lock();
        let now = SystemTime::now();
        keys.into_iter()
            .filter(|key| {
                entries
                    .remove(*key)
                    .is_some_and(|entry| !entry.is_expired(now))
            })
            .count()
    }

    /// Number of stored entries, expired ones included until they are touched.
    #[cfg(test)]
    pub(crate) fn stored_len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Look up `key`, evicting it first if its expiry has passed.
fn live_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: SystemTime,
) -> Option<&'a Entry> {
    if entries.get(key)?.is_expired(now) {
        debug!(key, "evicting expired key");
        entries.remove(key);
        return None;
    }
    entries.get(key)
}
