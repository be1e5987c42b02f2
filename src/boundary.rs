use rustc_hash::FxHashMap;

use crate::chunk::FreeChunk;

/// Lookup tables from the start and end addresses of every free chunk to its
/// size. These answer "is there a free chunk right before/after this address?"
/// in constant time when freeing.
///
/// Must hold exactly the same chunk set as the arena's free-space index.
#[derive(Default)]
pub struct BoundaryMaps {
    by_start: FxHashMap<usize, usize>,
    by_end: FxHashMap<usize, usize>,
}
impl BoundaryMaps {
    pub fn insert(&mut self, chunk: FreeChunk) {
        let prev = self.by_start.insert(chunk.start, chunk.size);
        debug_assert!(prev.is_none(), "two free chunks start at {:#x}", chunk.start);
        let prev = self.by_end.insert(chunk.end(), chunk.size);
        debug_assert!(prev.is_none(), "two free chunks end at {:#x}", chunk.end());
    }

    pub fn remove(&mut self, chunk: FreeChunk) {
        let size = self.by_start.remove(&chunk.start);
        debug_assert_eq!(size, Some(chunk.size));
        let size = self.by_end.remove(&chunk.end());
        debug_assert_eq!(size, Some(chunk.size));
    }

    /// The free chunk ending exactly at `addr`, if any.
    pub fn ending_at(&self, addr: usize) -> Option<FreeChunk> {
        self.by_end
            .get(&addr)
            .map(|&size| FreeChunk::new(addr - size, size))
    }

    /// The free chunk starting exactly at `addr`, if any.
    pub fn starting_at(&self, addr: usize) -> Option<FreeChunk> {
        self.by_start
            .get(&addr)
            .map(|&size| FreeChunk::new(addr, size))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.by_start.len(), self.by_end.len());
        self.by_start.len()
    }
}
