use core::{
    cmp::Ordering,
    fmt::{Debug, Display},
};

/// A free range `[start, start + size)` of the arena.
///
/// Chunks order by size first and start second, which is the order the
/// free-space index hands them out in: the smallest chunk wins, and among
/// chunks of equal size the lowest address wins.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FreeChunk {
    /// The first address of the chunk.
    pub start: usize,
    /// The length of the chunk. Never zero for a chunk held by an arena.
    pub size: usize,
}
impl FreeChunk {
    /// Creates a chunk covering `[start, start + size)`.
    pub const fn new(start: usize, size: usize) -> Self {
        Self { start, size }
    }

    /// The first address past the end of the chunk.
    pub const fn end(&self) -> usize {
        self.start + self.size
    }

    /// Takes `size` from the front of the chunk, returning whatever is left
    /// behind, if anything.
    pub(crate) fn split_off(&self, size: usize) -> Option<Self> {
        debug_assert!(size <= self.size);
        (self.size > size).then(|| Self::new(self.start + size, self.size - size))
    }

    /// Joins `next`, which must begin exactly where `self` ends.
    pub(crate) fn absorb(&mut self, next: FreeChunk) {
        debug_assert_eq!(self.end(), next.start);
        self.size += next.size;
    }
}
impl Ord for FreeChunk {
    fn cmp(&self, other: &Self) -> Ordering {
        self.size
            .cmp(&other.size)
            .then_with(|| self.start.cmp(&other.start))
    }
}
impl PartialOrd for FreeChunk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Debug for FreeChunk {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Free from {:#x} to {:#x} (len: {:#x})",
            self.start,
            self.end(),
            self.size
        )
    }
}
impl Display for FreeChunk {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#x}..{:#x}", self.start, self.end())
    }
}
