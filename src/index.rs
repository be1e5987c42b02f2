//! Free-space indexes.
//!
//! An index holds the current set of free chunks and answers one question:
//! "which is the smallest free chunk of at least `n`?". Ties between chunks of
//! equal size go to the lowest address, so identical operation sequences
//! always place allocations identically.
//!
//! Two implementations are provided:
//! - [`TreeIndex`] keeps the chunks in an ordered tree, giving `O(log n)`
//!   insertion, removal, and lookup. This is what [`Bfc`](crate::Bfc) uses.
//! - [`ListIndex`] keeps the chunks in an unordered list and scans it on
//!   every lookup. It is `O(n)`, but simple enough to serve as an oracle when
//!   testing [`TreeIndex`] against it.

use std::collections::{btree_set, BTreeSet};
use std::{iter::Copied, slice};

use crate::chunk::FreeChunk;

/// An ordered collection of free chunks.
///
/// Every chunk held by an index is unique: an arena never inserts a chunk
/// that overlaps one already present.
pub trait FreeIndex: Default {
    /// The iterator returned by [`iter`](FreeIndex::iter).
    type Iter<'a>: Iterator<Item = FreeChunk>
    where
        Self: 'a;

    /// Adds a chunk to the index.
    fn insert(&mut self, chunk: FreeChunk);

    /// Removes the chunk with exactly this start and size. Returns whether it
    /// was present.
    fn remove(&mut self, chunk: FreeChunk) -> bool;

    /// Finds the smallest chunk with a size of at least `min_size`, breaking
    /// ties by lowest start address.
    fn smallest_fit(&self, min_size: usize) -> Option<FreeChunk>;

    /// The number of chunks in the index.
    fn len(&self) -> usize;

    /// Whether the index holds no chunks at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over every chunk in the index, in no particular order.
    fn iter(&self) -> Self::Iter<'_>;
}

/// A free-space index backed by a [`BTreeSet`] keyed on `(size, start)`.
#[derive(Default, Debug)]
pub struct TreeIndex {
    chunks: BTreeSet<FreeChunk>,
}
impl FreeIndex for TreeIndex {
    type Iter<'a> = Copied<btree_set::Iter<'a, FreeChunk>>;

    fn insert(&mut self, chunk: FreeChunk) {
        let inserted = self.chunks.insert(chunk);
        debug_assert!(inserted, "{chunk:?} is already in the index");
    }

    fn remove(&mut self, chunk: FreeChunk) -> bool {
        self.chunks.remove(&chunk)
    }

    fn smallest_fit(&self, min_size: usize) -> Option<FreeChunk> {
        // Lower bound on (min_size, 0): the first key at or above it is the
        // smallest sufficient size, and the lowest start within that size.
        self.chunks
            .range(FreeChunk::new(0, min_size)..)
            .next()
            .copied()
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn iter(&self) -> Self::Iter<'_> {
        self.chunks.iter().copied()
    }
}

/// A free-space index backed by an unordered [`Vec`], scanned linearly.
#[derive(Default, Debug)]
pub struct ListIndex {
    chunks: Vec<FreeChunk>,
}
impl FreeIndex for ListIndex {
    type Iter<'a> = Copied<slice::Iter<'a, FreeChunk>>;

    fn insert(&mut self, chunk: FreeChunk) {
        debug_assert!(
            !self.chunks.contains(&chunk),
            "{chunk:?} is already in the index"
        );
        self.chunks.push(chunk);
    }

    fn remove(&mut self, chunk: FreeChunk) -> bool {
        match self.chunks.iter().position(|c| *c == chunk) {
            Some(i) => {
                self.chunks.swap_remove(i);
                true
            }
            None => false,
        }
    }

    fn smallest_fit(&self, min_size: usize) -> Option<FreeChunk> {
        self.chunks
            .iter()
            .filter(|c| c.size >= min_size)
            .min()
            .copied()
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn iter(&self) -> Self::Iter<'_> {
        self.chunks.iter().copied()
    }
}
