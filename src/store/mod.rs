//! The in-memory keyspace: numbered databases holding typed items.

mod item;

pub use item::{now_millis, Item, LIST_TAG, STRING_TAG};

use std::collections::{HashMap, HashSet};

/// One numbered database: a map of keys to items, plus the subset of keys
/// that carry an expiry deadline. The subset lets the active expiration
/// sampler draw only from candidates instead of scanning everything.
#[derive(Debug, Default)]
pub struct Database {
    keys: HashMap<String, Item>,
    expiring: HashSet<String>,
}

impl Database {
    pub fn new() -> Self {
        Database::default()
    }

    /// Look up a key without touching expiry state. Expired-but-unreaped
    /// items are still visible here; command paths use `get_or_expire`.
    pub fn get(&self, key: &str) -> Option<&Item> {
        self.keys.get(key)
    }

    /// Look up a key, lazily reaping it first if its deadline has passed.
    /// This is the read path every command uses: an expired item is deleted
    /// and reported as absent, so no caller ever observes a stale value.
    pub fn get_or_expire(&mut self, key: &str, now_ms: u64) -> Option<&Item> {
        if self
            .keys
            .get(key)
            .is_some_and(|item| item.is_expired(now_ms))
        {
            self.remove(key);
            return None;
        }
        self.keys.get(key)
    }

    /// Insert or overwrite. The displaced item's cleanup hook runs, and the
    /// expiring-key subset is kept consistent with the new item.
    pub fn set(&mut self, key: &str, item: Item) {
        let expires = item.expires();
        if let Some(mut old) = self.keys.insert(key.to_string(), item) {
            old.on_delete(key);
        }
        if expires {
            self.expiring.insert(key.to_string());
        } else {
            self.expiring.remove(key);
        }
    }

    /// Delete a key, running its cleanup hook. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.expiring.remove(key);
        match self.keys.remove(key) {
            Some(mut item) => {
                item.on_delete(key);
                true
            }
            None => false,
        }
    }

    /// Mutable access for in-place edits (list pushes and removals). The
    /// expiry check still applies; callers never see an expired item.
    pub fn get_mut_or_expire(&mut self, key: &str, now_ms: u64) -> Option<&mut Item> {
        if self
            .keys
            .get(key)
            .is_some_and(|item| item.is_expired(now_ms))
        {
            self.remove(key);
            return None;
        }
        self.keys.get_mut(key)
    }

    /// Existence probe with the same lazy-expiry semantics as the reads.
    pub fn exists(&mut self, key: &str, now_ms: u64) -> bool {
        self.get_or_expire(key, now_ms).is_some()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys that carry a deadline, for the expiration sampler.
    pub fn expiring_keys(&self) -> impl Iterator<Item = &String> {
        self.expiring.iter()
    }

    pub fn expiring_len(&self) -> usize {
        self.expiring.len()
    }
}

/// All numbered databases. Databases are created on first touch and never
/// destroyed; an index that has not been touched simply reads as empty.
#[derive(Debug, Default)]
pub struct Keyspace {
    dbs: HashMap<u64, Database>,
}

impl Keyspace {
    pub fn new() -> Self {
        Keyspace::default()
    }

    pub fn db(&self, index: u64) -> Option<&Database> {
        self.dbs.get(&index)
    }

    /// Fetch a database, creating it if this is the first touch.
    pub fn db_mut(&mut self, index: u64) -> &mut Database {
        self.dbs.entry(index).or_default()
    }

    /// Indexes of every database created so far.
    pub fn db_indexes(&self) -> impl Iterator<Item = u64> + '_ {
        self.dbs.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut db = Database::new();
        db.set("k", Item::str(b"v".to_vec(), None));
        assert_eq!(db.get_or_expire("k", 0).and_then(Item::as_str), Some(&b"v"[..]));
    }

    #[test]
    fn test_get_or_expire_reaps_expired() {
        let mut db = Database::new();
        db.set("k", Item::str(b"v".to_vec(), Some(100)));
        assert!(db.get_or_expire("k", 99).is_some());
        assert!(db.get_or_expire("k", 100).is_none());
        // Lazily deleted, not just hidden.
        assert!(db.get("k").is_none());
        assert_eq!(db.expiring_len(), 0);
    }

    #[test]
    fn test_overwrite_clears_expiring_membership() {
        let mut db = Database::new();
        db.set("k", Item::str(b"v".to_vec(), Some(100)));
        assert_eq!(db.expiring_len(), 1);
        db.set("k", Item::str(b"v2".to_vec(), None));
        assert_eq!(db.expiring_len(), 0);
        // The persistent overwrite survives past the old deadline.
        assert!(db.get_or_expire("k", 1_000).is_some());
    }

    #[test]
    fn test_remove_reports_existence() {
        let mut db = Database::new();
        db.set("k", Item::str(b"v".to_vec(), Some(100)));
        assert!(db.remove("k"));
        assert!(!db.remove("k"));
        assert_eq!(db.expiring_len(), 0);
    }

    #[test]
    fn test_databases_are_isolated() {
        let mut ks = Keyspace::new();
        ks.db_mut(0).set("k", Item::str(b"zero".to_vec(), None));
        ks.db_mut(3).set("k", Item::str(b"three".to_vec(), None));
        assert_eq!(
            ks.db_mut(0).get_or_expire("k", 0).and_then(Item::as_str),
            Some(&b"zero"[..])
        );
        assert_eq!(
            ks.db_mut(3).get_or_expire("k", 0).and_then(Item::as_str),
            Some(&b"three"[..])
        );
        assert!(ks.db(1).is_none());
    }
}
