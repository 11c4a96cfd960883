//! A [newtype](https://rust-unofficial.github.io/patterns/patterns/behavioural/newtype.html)
//! wrapper around unsigned integers used as IDs for interned names.
//! This prevents us from confusing, say, a predicate ID with an object ID,
//! even though they're both represented by a `usize`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A dense, zero-based index with type-level information about its object.
pub struct Id<T>(usize, PhantomData<fn() -> T>);

impl<T> Id<T> {
    pub fn new(index: usize) -> Self {
        Self(index, PhantomData)
    }

    pub fn index(self) -> usize {
        self.0
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
        self.0 == other.0
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An append-only vector indexed by typed ID.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IdVec<T>(Vec<T>);

impl<T> IdVec<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, value: T) -> Id<T> {
        self.0.push(value);
        Id::new(self.0.len() - 1)
    }

    pub fn get(&self, id: Id<T>) -> Option<&T> {
        self.0.get(id.0)
    }

    pub fn contains(&self, id: Id<T>) -> bool {
        id.0 < self.0.len()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
        self.0.iter().enumerate().map(|(i, t)| (Id::new(i), t))
    }

    pub fn ids(&self) -> impl Iterator<Item = Id<T>> {
        (0..self.0.len()).map(Id::new)
    }
}

impl<T> Default for IdVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<Id<T>> for IdVec<T> {
    type Output = T;

    fn index(&self, index: Id<T>) -> &Self::Output {
        self.0.index(index.0)
    }
}

impl<T> IndexMut<Id<T>> for IdVec<T> {
    fn index_mut(&mut self, index: Id<T>) -> &mut Self::Output {
        self.0.index_mut(index.0)
    }
}
