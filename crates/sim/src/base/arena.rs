use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Stable handle to an object stored in an [`Arena`].
///
/// Handles are resolved once at build time from configuration labels and are
/// never re-resolved. The type parameter stops a selectivity handle from being
/// used to index the process arena.
pub struct Id<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index: index as u32,
            _marker: PhantomData,
        }
    }

    /// Position of the object inside its arena.
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index)
    }
}

/// Label-addressed storage for one family of model objects.
///
/// Objects are appended during build and never removed, so every [`Id`]
/// handed out stays valid for the lifetime of the arena. Lookup by label is
/// only needed while building; execution works purely with handles.
#[derive(Debug, Clone, PartialEq)]
pub struct Arena<T> {
    items: Vec<T>,
    labels: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            labels: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Store `item` under `label`.
    ///
    /// Returns `None` when the label is already taken; the arena is left
    /// unchanged in that case.
    pub fn insert(&mut self, label: impl Into<String>, item: T) -> Option<Id<T>> {
        let label = label.into();
        if self.lookup.contains_key(&label) {
            return None;
        }
        let index = self.items.len();
        self.lookup.insert(label.clone(), index);
        self.labels.push(label);
        self.items.push(item);
        Some(Id::new(index))
    }

    /// Resolve a label to its handle.
    pub fn find(&self, label: &str) -> Option<Id<T>> {
        self.lookup.get(label).map(|&index| Id::new(index))
    }

    /// Access the object behind a handle.
    ///
    /// # Panics
    /// Panics if the handle was produced by a different arena.
    #[inline]
    pub fn get(&self, id: Id<T>) -> &T {
        &self.items[id.index()]
    }

    /// Mutably access the object behind a handle.
    ///
    /// # Panics
    /// Panics if the handle was produced by a different arena.
    #[inline]
    pub fn get_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.items[id.index()]
    }

    /// Look an object up by label.
    pub fn by_label(&self, label: &str) -> Option<&T> {
        self.find(label).map(|id| self.get(id))
    }

    /// Mutably look an object up by label.
    pub fn by_label_mut(&mut self, label: &str) -> Option<&mut T> {
        self.find(label).map(move |id| self.get_mut(id))
    }

    /// Borrow two distinct objects mutably at once.
    ///
    /// Returns `None` when both handles point at the same object.
    pub fn pair_mut(&mut self, first: Id<T>, second: Id<T>) -> Option<(&mut T, &mut T)> {
        let (a, b) = (first.index(), second.index());
        if a == b {
            return None;
        }
        if a < b {
            let (head, tail) = self.items.split_at_mut(b);
            Some((&mut head[a], &mut tail[0]))
        } else {
            let (head, tail) = self.items.split_at_mut(a);
            Some((&mut tail[0], &mut head[b]))
        }
    }

    /// The label an object was registered under.
    pub fn label(&self, id: Id<T>) -> &str {
        &self.labels[id.index()]
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = Id<T>> + '_ {
        (0..self.items.len()).map(Id::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| (Id::new(index), item))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Id<T>, &mut T)> {
        self.items
            .iter_mut()
            .enumerate()
            .map(|(index, item)| (Id::new(index), item))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_find() {
        let mut arena: Arena<f64> = Arena::new();
        let a = arena.insert("a", 1.0).unwrap();
        let b = arena.insert("b", 2.0).unwrap();

        assert_eq!(arena.find("a"), Some(a));
        assert_eq!(arena.find("b"), Some(b));
        assert_eq!(arena.find("c"), None);
        assert_eq!(*arena.get(b), 2.0);
        assert_eq!(arena.label(a), "a");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let mut arena: Arena<u32> = Arena::new();
        arena.insert("x", 1).unwrap();

        assert!(arena.insert("x", 2).is_none());
        assert_eq!(arena.len(), 1);
        assert_eq!(*arena.by_label("x").unwrap(), 1);
    }

    #[test]
    fn test_pair_mut_both_orders() {
        let mut arena: Arena<Vec<f64>> = Arena::new();
        let a = arena.insert("a", vec![1.0]).unwrap();
        let b = arena.insert("b", vec![2.0]).unwrap();

        {
            let (x, y) = arena.pair_mut(b, a).unwrap();
            x[0] += 10.0;
            y[0] += 20.0;
        }
        assert_eq!(arena.get(a)[0], 21.0);
        assert_eq!(arena.get(b)[0], 12.0);
        assert!(arena.pair_mut(a, a).is_none());
    }
}
