use std::{
    borrow::Borrow,
    collections::{hash_map::RandomState, HashMap},
    hash::{BuildHasher, Hash},
    slice,
};

/// Guarantees iteration in insertion order, which [`HashMap`] does not.
///
/// Entries cannot be removed, so the insertion order is also a stable index of every key.
#[derive(Debug, Clone)]
pub struct OrderedHashMap<K, V, S = RandomState> {
    inner: HashMap<K, V, S>,
    insertion_order: Vec<K>,
}
impl<K: Eq + Hash + Clone, V, S: BuildHasher> OrderedHashMap<K, V, S> {
    pub fn iter(&self) -> OrderedHashMapIter<K, V, S> {
        OrderedHashMapIter {
            inner: &self.inner,
            key_iter: self.insertion_order.iter(),
        }
    }

    /// Insert a value for a key that is not yet present. If the key is already present,
    /// the map is left untouched and the rejected value is handed back.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<&mut V, V> {
        if self.inner.contains_key(&key) {
            return Err(value);
        }
        self.insertion_order.push(key.clone());
        Ok(self.inner.entry(key).or_insert(value))
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.insertion_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertion_order.is_empty()
    }
}
impl<K, V, S: BuildHasher + Default> Default for OrderedHashMap<K, V, S> {
    fn default() -> Self {
        Self {
            inner: Default::default(),
            insertion_order: Default::default(),
        }
    }
}
impl<K: Eq + Hash, V: PartialEq, S: BuildHasher> PartialEq for OrderedHashMap<K, V, S> {
    fn eq(&self, other: &Self) -> bool {
        self.insertion_order == other.insertion_order && self.inner == other.inner
    }
}

pub struct OrderedHashMapIter<'k, K, V, S> {
    inner: &'k HashMap<K, V, S>,
    key_iter: slice::Iter<'k, K>,
}

impl<'k, K: Eq + Hash, V, S: BuildHasher> Iterator for OrderedHashMapIter<'k, K, V, S> {
    type Item = (&'k K, &'k V);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.key_iter.next()?;
        self.inner.get_key_value(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_in_insertion_order() {
        let mut map: OrderedHashMap<String, usize> = OrderedHashMap::default();
        for (i, key) in ["zeta", "alpha", "mu"].iter().enumerate() {
            assert!(map.try_insert(key.to_string(), i).is_ok());
        }
        let keys: Vec<_> = map.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(vec!["zeta", "alpha", "mu"], keys);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut map: OrderedHashMap<String, usize> = OrderedHashMap::default();
        assert!(map.try_insert("a".to_string(), 1).is_ok());
        assert_eq!(Err(2), map.try_insert("a".to_string(), 2).map(|v| *v));
        assert_eq!(Some(&1), map.get("a"));
        assert_eq!(1, map.len());
    }

    #[test]
    fn clones_do_not_share_state() {
        let mut map: OrderedHashMap<String, usize> = OrderedHashMap::default();
        map.try_insert("a".to_string(), 1).ok();
        let mut copy = map.clone();
        *copy.get_mut("a").unwrap() = 5;
        assert_eq!(Some(&1), map.get("a"));
        assert_eq!(Some(&5), copy.get("a"));
    }
}
