//! catalog::entry
//!
//! Sibling container shared by every level of the snapshot tree.
//!
//! # Architecture
//!
//! An [`EntryMap`] stores its elements behind `Arc`, indexed twice: by
//! identifier and by sibling key (the name, or whatever plays that role for
//! the element kind). Cloning a map clones the two ordered maps but shares
//! every element, so a new snapshot version only pays for the levels on the
//! path to what changed.
//!
//! Mutable access goes through `Arc::make_mut`: an element still shared with
//! an older snapshot is copied before it is modified, which leaves published
//! versions untouched.
//!
//! # Invariants
//!
//! - `by_key` and `by_id` always describe the same set of elements
//! - Keys and identifiers are unique within one map

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeBounds;
use std::sync::Arc;

/// An element stored in an [`EntryMap`].
pub trait CatalogEntry: Clone {
    /// Sibling-unique key (name, table ref, type, ...).
    type Key: Ord + Clone + fmt::Debug;

    /// The sibling-unique key.
    fn key(&self) -> &Self::Key;

    /// The stable identifier.
    fn identifier(&self) -> &str;
}

/// Why an insertion was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryClash {
    /// Another element already has the key.
    Key,
    /// Another element already has the identifier.
    Identifier,
}

/// Ordered, doubly indexed set of sibling elements.
pub struct EntryMap<T: CatalogEntry> {
    by_id: BTreeMap<String, Arc<T>>,
    by_key: BTreeMap<T::Key, String>,
}

impl<T: CatalogEntry> EntryMap<T> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            by_id: BTreeMap::new(),
            by_key: BTreeMap::new(),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Look up an element by identifier.
    pub fn get(&self, identifier: &str) -> Option<&T> {
        self.by_id.get(identifier).map(Arc::as_ref)
    }

    /// Look up an element by sibling key.
    pub fn get_by_key<Q>(&self, key: &Q) -> Option<&T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.by_key.get(key).and_then(|id| self.get(id))
    }

    /// Whether an element has the identifier.
    pub fn contains_id(&self, identifier: &str) -> bool {
        self.by_id.contains_key(identifier)
    }

    /// Elements whose key falls in `range`, in key order.
    pub fn range_by_key<R>(&self, range: R) -> impl Iterator<Item = &T>
    where
        R: RangeBounds<T::Key>,
    {
        self.by_key.range(range).filter_map(|(_, id)| self.get(id))
    }

    /// Elements in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.by_id.values().map(Arc::as_ref)
    }

    /// Elements in key order.
    pub fn iter_by_key(&self) -> impl Iterator<Item = &T> {
        self.by_key.values().filter_map(|id| self.get(id))
    }

    /// Insert a new element.
    ///
    /// Refuses elements whose key or identifier is already taken.
    pub fn insert(&mut self, entry: T) -> Result<&mut T, EntryClash> {
        if self.by_id.contains_key(entry.identifier()) {
            return Err(EntryClash::Identifier);
        }
        if self.by_key.contains_key(entry.key()) {
            return Err(EntryClash::Key);
        }
        let id = entry.identifier().to_string();
        self.by_key.insert(entry.key().clone(), id.clone());
        let slot = self.by_id.entry(id).or_insert_with(|| Arc::new(entry));
        Ok(Arc::make_mut(slot))
    }

    /// Insert an element, replacing the one with the same identifier.
    ///
    /// Refuses the element if its key belongs to a different identifier.
    pub fn replace(&mut self, entry: T) -> Result<(), EntryClash> {
        if let Some(owner) = self.by_key.get(entry.key()) {
            if owner != entry.identifier() {
                return Err(EntryClash::Key);
            }
        }
        if let Some(previous) = self.by_id.get(entry.identifier()) {
            let old_key = previous.key().clone();
            self.by_key.remove(&old_key);
        }
        let id = entry.identifier().to_string();
        self.by_key.insert(entry.key().clone(), id.clone());
        self.by_id.insert(id, Arc::new(entry));
        Ok(())
    }

    /// Mutable access to an element, copying it first if it is shared.
    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut T> {
        self.by_id.get_mut(identifier).map(Arc::make_mut)
    }

    /// Remove an element by identifier.
    pub fn remove(&mut self, identifier: &str) -> Option<Arc<T>> {
        let removed = self.by_id.remove(identifier)?;
        self.by_key.remove(removed.key());
        Some(removed)
    }

    /// Whether both maps share every element by pointer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.by_id.len() == other.by_id.len()
            && self
                .by_id
                .iter()
                .zip(other.by_id.iter())
                .all(|((a_id, a), (b_id, b))| a_id == b_id && Arc::ptr_eq(a, b))
    }
}

impl<T: CatalogEntry> Default for EntryMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CatalogEntry> Clone for EntryMap<T> {
    fn clone(&self) -> Self {
        Self {
            by_id: self.by_id.clone(),
            by_key: self.by_key.clone(),
        }
    }
}

impl<T: CatalogEntry + PartialEq> PartialEq for EntryMap<T> {
    fn eq(&self, other: &Self) -> bool {
        self.by_id == other.by_id
    }
}

impl<T: CatalogEntry + Eq> Eq for EntryMap<T> {}

impl<T: CatalogEntry + fmt::Debug> fmt::Debug for EntryMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Named {
        name: String,
        id: String,
        payload: u32,
    }

    impl CatalogEntry for Named {
        type Key = String;

        fn key(&self) -> &String {
            &self.name
        }

        fn identifier(&self) -> &str {
            &self.id
        }
    }

    fn named(name: &str, id: &str) -> Named {
        Named {
            name: name.into(),
            id: id.into(),
            payload: 0,
        }
    }

    #[test]
    fn lookup_by_key_and_identifier() {
        let mut map = EntryMap::new();
        map.insert(named("a", "id_a")).unwrap();
        map.insert(named("b", "id_b")).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("id_a").unwrap().name, "a");
        assert_eq!(map.get_by_key("b").unwrap().id, "id_b");
        assert!(map.get_by_key("c").is_none());
    }

    #[test]
    fn insert_refuses_duplicates() {
        let mut map = EntryMap::new();
        map.insert(named("a", "id_a")).unwrap();

        assert_eq!(map.insert(named("a", "other")), Err(EntryClash::Key));
        assert_eq!(map.insert(named("z", "id_a")), Err(EntryClash::Identifier));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn remove_drops_both_indexes() {
        let mut map = EntryMap::new();
        map.insert(named("a", "id_a")).unwrap();
        let removed = map.remove("id_a").unwrap();

        assert_eq!(removed.name, "a");
        assert!(map.get_by_key("a").is_none());
        map.insert(named("a", "id_a2")).unwrap();
    }

    #[test]
    fn get_mut_copies_shared_elements() {
        let mut original = EntryMap::new();
        original.insert(named("a", "id_a")).unwrap();

        let mut copy = original.clone();
        assert!(copy.ptr_eq(&original));

        copy.get_mut("id_a").unwrap().payload = 7;

        assert_eq!(original.get("id_a").unwrap().payload, 0);
        assert_eq!(copy.get("id_a").unwrap().payload, 7);
        assert!(!copy.ptr_eq(&original));
    }

    #[test]
    fn replace_keeps_key_index_consistent() {
        let mut map = EntryMap::new();
        map.insert(named("a", "id_a")).unwrap();
        map.insert(named("b", "id_b")).unwrap();

        map.replace(Named {
            payload: 3,
            ..named("a", "id_a")
        })
        .unwrap();
        assert_eq!(map.get_by_key("a").unwrap().payload, 3);

        assert_eq!(map.replace(named("b", "id_a")), Err(EntryClash::Key));
    }

    #[test]
    fn equality_compares_content() {
        let mut a = EntryMap::new();
        a.insert(named("x", "1")).unwrap();
        let mut b = EntryMap::new();
        b.insert(named("x", "1")).unwrap();
        assert_eq!(a, b);

        b.get_mut("1").unwrap().payload = 1;
        assert_ne!(a, b);
    }
}
