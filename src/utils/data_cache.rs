use std::{
    collections::{HashMap, hash_map::Entry},
    hash::Hash,
};

/// Keyed storage for lazily created payloads.
///
/// An entry is created at most once per key until it is removed.
#[derive(Debug)]
pub struct DataCache<K, T> {
    data: HashMap<K, T>,
}

impl<K, T> Default for DataCache<K, T> {
    fn default() -> Self {
        Self {
            data: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Copy, T> DataCache<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&T> {
        self.data.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the payload for `key`, running `create` only when absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, create: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        match self.data.entry(key) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => vacant.insert(create()),
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<T> {
        self.data.remove(key)
    }

    /// Removes every entry, handing ownership of the payloads to the caller.
    pub fn drain(&mut self) -> Vec<(K, T)> {
        self.data.drain().collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
