//! The allocation contract.
//!
//! [`Allocator`] is the interface every allocator in this crate exposes, and
//! the one that consumers layered on top of an allocator should program
//! against. For example, a wrapper that maps offsets onto a real memory buffer
//! would hold a base pointer and an `impl Allocator`, add the base to every
//! offset returned from [`alloc`](Allocator::alloc), and bounds-check pointers
//! before turning them back into offsets for [`free`](Allocator::free).

use crate::error::Result;

/// An allocator of integer ranges within an implicit buffer that starts at
/// address 0 and has a fixed size.
///
/// Allocation reserves a sub-range of the buffer; freeing allows the sub-range
/// to be allocated again.
pub trait Allocator {
    /// Reserve at least `size` units, returning the start of the range.
    ///
    /// A `size` of zero still reserves a distinct, non-empty range.
    fn alloc(&mut self, size: usize) -> Result<usize>;

    /// Release a range previously returned from [`alloc`](Allocator::alloc).
    fn free(&mut self, base: usize) -> Result<()>;
}
impl<A: Allocator + ?Sized> Allocator for &mut A {
    fn alloc(&mut self, size: usize) -> Result<usize> {
        (**self).alloc(size)
    }

    fn free(&mut self, base: usize) -> Result<()> {
        (**self).free(base)
    }
}
