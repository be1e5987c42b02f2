use rustc_hash::FxHashMap;

/// Maps the start of every live allocation to its (aligned) size, since
/// [`free`](crate::Arena::free) only receives the start.
#[derive(Default)]
pub struct AllocationTable {
    sizes: FxHashMap<usize, usize>,
    allocated: usize,
}
impl AllocationTable {
    pub fn insert(&mut self, base: usize, size: usize) {
        let prev = self.sizes.insert(base, size);
        debug_assert!(prev.is_none(), "{base:#x} is already allocated");
        self.allocated += size;
    }

    pub fn remove(&mut self, base: usize) -> Option<usize> {
        let size = self.sizes.remove(&base)?;
        self.allocated -= size;
        Some(size)
    }

    pub fn get(&self, base: usize) -> Option<usize> {
        self.sizes.get(&base).copied()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// The sum of the sizes of all live allocations.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.sizes.iter().map(|(&base, &size)| (base, size))
    }
}
