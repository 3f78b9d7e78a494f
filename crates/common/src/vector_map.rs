use std::collections::HashMap;
use std::hash::Hash;

/// Result of [`VectorMap::remove`].
///
/// When the removed entry was not the last one, the last entry is moved into
/// the freed position; `moved` names it together with the position it left.
#[derive(Debug, Clone, PartialEq)]
pub struct Removed<K, V> {
    pub value: V,
    /// Position the removed entry occupied.
    pub index: usize,
    /// `(key, previous_index)` of the entry that now lives at `index`.
    pub moved: Option<(K, usize)>,
}

/// Ordered key/value map backed by a dense vector plus a key index.
///
/// Insert, lookup and removal are O(1) amortized. Iteration follows storage
/// order, which is insertion order until a removal swaps the last entry into
/// the removed entry's position.
#[derive(Debug, Clone)]
pub struct VectorMap<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize>,
}

impl<K, V> Default for VectorMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> VectorMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Storage position of `key`.
    pub fn position(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Insert or replace. Replacing keeps the entry's position and returns the old value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&i) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[i].1, value));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        self.entries.get(index).map(|(k, v)| (k, v))
    }

    /// Swap-remove `key`. The caller learns which entry (if any) moved.
    pub fn remove(&mut self, key: &K) -> Option<Removed<K, V>> {
        let index = self.index.remove(key)?;
        let last = self.entries.len() - 1;
        let (_, value) = self.entries.swap_remove(index);
        let moved = if index != last {
            let moved_key = self.entries[index].0.clone();
            self.index.insert(moved_key.clone(), index);
            Some((moved_key, last))
        } else {
            None
        };
        Some(Removed {
            value,
            index,
            moved,
        })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, v)| v)
    }
}
