#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

use core::fmt::Debug;

use allocation_table::AllocationTable;
use boundary::BoundaryMaps;
use log::{debug, trace, warn};

pub use crate::chunk::FreeChunk;
pub use crate::index::{FreeIndex, ListIndex, TreeIndex};

#[doc(inline)]
pub use alloc::*;
#[doc(inline)]
pub use error::*;
#[doc(inline)]
pub use lock::*;

pub mod alloc;
pub mod error;
pub mod index;
pub mod lock;

mod allocation_table;
mod boundary;
mod chunk;

/// A best-fit arena whose free chunks are indexed by a tree. Allocation and
/// freeing are both `O(log n)` in the number of free chunks.
pub type Bfc<'label> = Arena<'label, TreeIndex>;

/// A best-fit arena whose free chunks are kept in a linearly-scanned list.
/// It behaves identically to [`Bfc`], but allocation is `O(n)`.
pub type LinearBfc<'label> = Arena<'label, ListIndex>;

/// A best-fit with coalescing arena.
///
/// The arena manages the range `[0, size)`. Every allocation is rounded up to
/// a multiple of the arena's alignment, and is carved from the front of the
/// smallest free chunk that can hold it (the lowest-addressed one, if several
/// are equally small). Freed blocks are merged with the free chunks directly
/// before and after them, so no two free chunks are ever adjacent.
///
/// # Usage
/// ```rust
/// # use bfcarena::Bfc;
/// let mut arena = Bfc::create("test", 512, 16).unwrap();
/// assert_eq!(arena.alloc(5).unwrap(), 0);
/// assert_eq!(arena.alloc(17).unwrap(), 16);
/// arena.free(0).unwrap();
/// ```
///
/// ## Choosing an index
/// The `I` parameter selects how free chunks are searched. [`TreeIndex`] is
/// the right choice nearly always; [`ListIndex`] exists mainly as a simple
/// reference to test against.
///
/// ## Sharing
/// The arena has no internal locking. Wrap it in a [`Locked`] to use it from
/// several threads.
pub struct Arena<'label, I: FreeIndex = TreeIndex> {
    label: &'label str,
    size: usize,
    align: usize,
    free: I,
    bounds: BoundaryMaps,
    used: AllocationTable,
}
impl<'label, I: FreeIndex> Arena<'label, I> {
    /// Create a new arena, entirely free.
    ///
    /// # Parameters
    /// - `label` - a label for the arena. This is used for debugging purposes.
    /// - `size` - the size of the arena. It is rounded down to a multiple of
    ///   `align`.
    /// - `align` - the alignment of the arena. Every allocation's start and
    ///   size is a multiple of it. It need not be a power of two.
    ///
    /// # Returns
    /// If the alignment is zero, [`Error::InvalidAlignment`] will be returned.
    /// Otherwise, the function will return an arena.
    pub fn create(label: &'label str, size: usize, align: usize) -> error::Result<Self> {
        if align == 0 {
            return Err(Error::InvalidAlignment);
        }
        let size = size - size % align;

        let mut arena = Self {
            label,
            size,
            align,
            free: I::default(),
            bounds: BoundaryMaps::default(),
            used: AllocationTable::default(),
        };
        if size > 0 {
            arena.insert_free(FreeChunk::new(0, size));
        }
        debug!("created arena {label:?} of {size:#x} aligned to {align:#x}");

        Ok(arena)
    }

    /// Allocate a block.
    ///
    /// # Parameters
    /// - `size` - the size of the block to allocate. It is rounded up to a
    ///   multiple of the alignment. A size of zero is treated as one, so it
    ///   still reserves a distinct block.
    ///
    /// # Returns
    /// The start of the block. If no free chunk is large enough,
    /// [`Error::OutOfMemory`] is returned and the arena is left unchanged.
    pub fn alloc(&mut self, size: usize) -> error::Result<usize> {
        let size = size
            .max(1)
            .checked_next_multiple_of(self.align)
            .ok_or(Error::OutOfMemory)?;
        let fit = self.free.smallest_fit(size).ok_or(Error::OutOfMemory)?;

        self.remove_free(fit);
        if let Some(rest) = fit.split_off(size) {
            self.insert_free(rest);
        }
        self.used.insert(fit.start, size);

        trace!("{}: alloc {size:#x} at {:#x}", self.label, fit.start);
        Ok(fit.start)
    }

    /// Free a block.
    ///
    /// # Parameters
    /// - `base` - the start of the block, as returned from
    ///   [`alloc`](Arena::alloc).
    ///
    /// # Returns
    /// If `base` is not the start of a live block, [`Error::NoSuchAllocation`]
    /// is returned and the arena is left unchanged. This covers double frees.
    pub fn free(&mut self, base: usize) -> error::Result<()> {
        let Some(size) = self.used.remove(base) else {
            warn!("{}: free of unallocated address {base:#x}", self.label);
            return Err(Error::NoSuchAllocation);
        };

        let mut merged = FreeChunk::new(base, size);
        if let Some(mut prev) = self.bounds.ending_at(base) {
            self.remove_free(prev);
            prev.absorb(merged);
            merged = prev;
        }
        if let Some(next) = self.bounds.starting_at(merged.end()) {
            self.remove_free(next);
            merged.absorb(next);
        }
        self.insert_free(merged);

        trace!("{}: free {size:#x} at {base:#x} into {merged}", self.label);
        Ok(())
    }

    fn insert_free(&mut self, chunk: FreeChunk) {
        self.free.insert(chunk);
        self.bounds.insert(chunk);
    }

    fn remove_free(&mut self, chunk: FreeChunk) {
        let removed = self.free.remove(chunk);
        debug_assert!(removed, "{chunk:?} is missing from the index");
        self.bounds.remove(chunk);
    }

    /// Get the total space managed by this arena, after rounding down to the
    /// alignment.
    pub fn total_space(&self) -> usize {
        self.size
    }

    /// Get the allocated space in this arena, including the padding added by
    /// rounding allocations up to the alignment.
    pub fn allocated_space(&self) -> usize {
        self.used.allocated()
    }

    /// Get the free space in this arena. Note that this may be spread across
    /// several chunks.
    pub fn free_space(&self) -> usize {
        self.size - self.used.allocated()
    }

    /// Get the number of blocks currently allocated.
    pub fn live_allocations(&self) -> usize {
        self.used.len()
    }

    /// Get the size reserved for the block starting at `base`, if there is a
    /// live one.
    pub fn allocation_size(&self, base: usize) -> Option<usize> {
        self.used.get(base)
    }

    /// Iterate over the free chunks of this arena, in the index's order.
    pub fn free_chunks(&self) -> I::Iter<'_> {
        self.free.iter()
    }

    /// Get the alignment of this arena.
    pub fn align(&self) -> usize {
        self.align
    }

    /// Get the label for this arena.
    pub fn label(&self) -> &'label str {
        self.label
    }
}
impl<'label, I: FreeIndex> Allocator for Arena<'label, I> {
    fn alloc(&mut self, size: usize) -> error::Result<usize> {
        Arena::alloc(self, size)
    }

    fn free(&mut self, base: usize) -> error::Result<()> {
        Arena::free(self, base)
    }
}
impl<'label, I: FreeIndex> Debug for Arena<'label, I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(
            f,
            "Arena {} of {:#x} (align: {:#x}) with:",
            self.label, self.size, self.align
        )?;

        let mut chunks: Vec<_> = self.free.iter().collect();
        chunks.sort_by_key(|chunk| chunk.start);
        for chunk in chunks {
            writeln!(f, "  {chunk:?}")?;
        }

        writeln!(
            f,
            "  Allocated: {:#x} in {} blocks",
            self.used.allocated(),
            self.used.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    /// Checks that the free chunks and the live allocations tile `[0, size)`
    /// exactly, that every boundary is aligned, that no two free chunks touch,
    /// and that the boundary maps agree with the index.
    fn check<I: FreeIndex>(arena: &Arena<'_, I>) {
        let mut ranges: Vec<(usize, usize, bool)> = arena
            .free_chunks()
            .map(|c| (c.start, c.size, true))
            .chain(arena.used.iter().map(|(base, size)| (base, size, false)))
            .collect();
        ranges.sort();

        let mut cursor = 0;
        let mut prev_free = false;
        for &(start, size, free) in &ranges {
            assert_eq!(start, cursor, "gap or overlap at {start:#x}\n{arena:?}");
            assert!(size > 0);
            assert_eq!(start % arena.align, 0);
            assert_eq!(size % arena.align, 0);
            assert!(!(free && prev_free), "uncoalesced chunks at {start:#x}\n{arena:?}");
            if free {
                let chunk = FreeChunk::new(start, size);
                assert_eq!(arena.bounds.starting_at(start), Some(chunk));
                assert_eq!(arena.bounds.ending_at(chunk.end()), Some(chunk));
            }
            cursor = start + size;
            prev_free = free;
        }
        assert_eq!(cursor, arena.size);
        assert_eq!(arena.bounds.len(), arena.free.len());
        assert_eq!(
            arena.free_space(),
            arena.free_chunks().map(|c| c.size).sum::<usize>()
        );
    }

    fn sorted_free<I: FreeIndex>(arena: &Arena<'_, I>) -> Vec<FreeChunk> {
        let mut chunks: Vec<_> = arena.free_chunks().collect();
        chunks.sort_by_key(|c| c.start);
        chunks
    }

    #[test]
    fn invalid_alignment() {
        assert!(matches!(
            Bfc::create("test", 512, 0),
            Err(Error::InvalidAlignment)
        ));
    }

    #[test]
    fn size_rounds_down() {
        let mut arena = Bfc::create("test", 0x107, 0x10).unwrap();
        assert_eq!(arena.total_space(), 0x100);
        assert_eq!(arena.alloc(0x100), Ok(0));
        check(&arena);
    }

    #[test]
    fn smaller_than_alignment() {
        let mut arena = LinearBfc::create("tiny", 7, 16).unwrap();
        assert_eq!(arena.total_space(), 0);
        assert_eq!(arena.free_chunks().count(), 0);
        assert_eq!(arena.alloc(0), Err(Error::OutOfMemory));
        check(&arena);
    }

    fn manual<I: FreeIndex>() {
        let mut arena = Arena::<I>::create("manual", 512, 16).unwrap();
        assert_eq!(arena.alloc(5), Ok(0));
        assert_eq!(arena.alloc(17), Ok(16));
        assert_eq!(arena.alloc(0), Ok(48));
        assert_eq!(arena.alloc(15), Ok(64));
        check(&arena);

        arena.free(48).unwrap();
        assert_eq!(arena.alloc(15), Ok(48));

        arena.free(64).unwrap();
        arena.free(16).unwrap();
        arena.free(48).unwrap();
        check(&arena);
        assert_eq!(arena.alloc(48), Ok(16));
        check(&arena);
    }

    #[test]
    fn manual_tree() {
        manual::<TreeIndex>();
    }

    #[test]
    fn manual_list() {
        manual::<ListIndex>();
    }

    /// Carves the arena into free holes of 0x30 at 0x000, 0x20 at 0x100,
    /// 0x20 at 0x200 and 0x40 at 0x300, separated by live blocks.
    fn best_fit<I: FreeIndex>() {
        let mut arena = Arena::<I>::create("best", 0x400, 0x10).unwrap();
        let bases: Vec<_> = [0x30, 0xd0, 0x20, 0xe0, 0x20, 0xe0, 0x40, 0xc0]
            .into_iter()
            .map(|size| arena.alloc(size).unwrap())
            .collect();
        assert_eq!(
            bases,
            [0x000, 0x030, 0x100, 0x120, 0x200, 0x220, 0x300, 0x340]
        );
        for base in [0x300, 0x200, 0x100, 0x000] {
            arena.free(base).unwrap();
        }
        check(&arena);

        assert_eq!(arena.alloc(0x20), Ok(0x100));
        assert_eq!(arena.alloc(0x11), Ok(0x200));
        assert_eq!(arena.alloc(0x21), Ok(0x000));
        assert_eq!(arena.alloc(0x10), Ok(0x300));
        assert_eq!(arena.alloc(0x40), Err(Error::OutOfMemory));
        check(&arena);
    }

    #[test]
    fn best_fit_tree() {
        best_fit::<TreeIndex>();
    }

    #[test]
    fn best_fit_list() {
        best_fit::<ListIndex>();
    }

    fn out_of_memory<I: FreeIndex>() {
        let mut arena = Arena::<I>::create("oom", 0x100, 0x10).unwrap();
        arena.alloc(0x80).unwrap();
        let before = sorted_free(&arena);

        assert_eq!(arena.alloc(0x81), Err(Error::OutOfMemory));
        assert_eq!(arena.alloc(usize::MAX), Err(Error::OutOfMemory));
        assert_eq!(sorted_free(&arena), before);
        assert_eq!(arena.live_allocations(), 1);
        check(&arena);
    }

    #[test]
    fn out_of_memory_tree() {
        out_of_memory::<TreeIndex>();
    }

    #[test]
    fn out_of_memory_list() {
        out_of_memory::<ListIndex>();
    }

    #[test]
    fn free_unallocated() {
        let mut arena = Bfc::create("test", 0x100, 0x10).unwrap();
        let a = arena.alloc(0x10).unwrap();
        let b = arena.alloc(0x10).unwrap();
        assert_eq!(arena.free(0x80), Err(Error::NoSuchAllocation));
        // Inside a live block, but not its start.
        assert_eq!(arena.free(b + 0x8), Err(Error::NoSuchAllocation));

        arena.free(a).unwrap();
        let before = sorted_free(&arena);
        assert_eq!(arena.free(a), Err(Error::NoSuchAllocation));
        assert_eq!(sorted_free(&arena), before);
        assert_eq!(arena.allocation_size(b), Some(0x10));
        check(&arena);
    }

    #[test]
    fn non_power_of_two_alignment() {
        let mut arena = LinearBfc::create("odd", 100, 12).unwrap();
        assert_eq!(arena.total_space(), 96);
        assert_eq!(arena.alloc(1), Ok(0));
        assert_eq!(arena.alloc(13), Ok(12));
        assert_eq!(arena.allocation_size(12), Some(24));
        check(&arena);
    }

    #[test]
    fn metrics() {
        let mut arena = Bfc::create("metrics", 0x1000, 0x10).unwrap();
        arena.alloc(0x10).unwrap();
        arena.alloc(0x11).unwrap();
        println!("{arena:?}");
        assert_eq!(arena.total_space(), 0x1000);
        assert_eq!(arena.allocated_space(), 0x30);
        assert_eq!(arena.free_space(), 0xfd0);
        assert_eq!(arena.live_allocations(), 2);
        assert_eq!(arena.label(), "metrics");
        assert_eq!(arena.align(), 0x10);
    }

    fn random<I: FreeIndex>(seed: u64) {
        const SIZE: usize = 1 << 20;
        let mut arena = Arena::<I>::create("random", SIZE, 16).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut used: Vec<(usize, usize)> = Vec::new();

        for i in 0..10000 {
            if !used.is_empty() && rng.random_bool(0.6) {
                let (base, _) = used.swap_remove(rng.random_range(0..used.len()));
                arena.free(base).unwrap();
            } else {
                let size = rng.random_range(0..1000);
                let base = arena.alloc(size).unwrap();
                assert!(base + size <= SIZE, "address out of bounds: {base:#x}");
                assert_eq!(base % 16, 0);
                for &(start, len) in &used {
                    assert!(
                        base + size.max(1) <= start || start + len.max(1) <= base,
                        "{base:#x}+{size:#x} overlaps {start:#x}+{len:#x}"
                    );
                }
                used.push((base, size));
            }
            if i % 500 == 0 {
                check(&arena);
            }
        }

        for (base, _) in used {
            arena.free(base).unwrap();
        }
        check(&arena);
        assert_eq!(arena.alloc(SIZE), Ok(0));
    }

    #[test]
    fn random_tree() {
        random::<TreeIndex>(0x42);
    }

    #[test]
    fn random_list() {
        random::<ListIndex>(0x1337);
    }

    mod differential {
        use proptest::prelude::*;

        use super::{check, sorted_free};
        use crate::{Bfc, LinearBfc};

        #[derive(Debug, Clone)]
        enum Op {
            Alloc(usize),
            Free(usize),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                3 => (0usize..0x120).prop_map(Op::Alloc),
                2 => any::<usize>().prop_map(Op::Free),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn tree_matches_list(
                align in 1usize..=32,
                ops in prop::collection::vec(op_strategy(), 1..200),
            ) {
                let mut tree = Bfc::create("tree", 0x1000, align).unwrap();
                let mut list = LinearBfc::create("list", 0x1000, align).unwrap();
                let mut live = Vec::new();

                for op in ops {
                    match op {
                        Op::Alloc(size) => {
                            let got = tree.alloc(size);
                            prop_assert_eq!(got, list.alloc(size));
                            if let Ok(base) = got {
                                prop_assert_eq!(base % align, 0);
                                live.push(base);
                            }
                        }
                        Op::Free(pick) => {
                            // Sometimes aim at a live block, sometimes at garbage.
                            let base = if live.is_empty() || pick % 5 == 0 {
                                pick % 0x1000
                            } else {
                                live.swap_remove(pick % live.len())
                            };
                            let got = tree.free(base);
                            prop_assert_eq!(got, list.free(base));
                            if got.is_ok() {
                                live.retain(|&b| b != base);
                            }
                        }
                    }
                    check(&tree);
                    check(&list);
                    prop_assert_eq!(sorted_free(&tree), sorted_free(&list));
                }

                for base in live {
                    tree.free(base).unwrap();
                }
                prop_assert_eq!(tree.alloc(tree.total_space()), Ok(0));
            }
        }
    }
}
