//! Locking traits and implementations.
//!
//! An [`Arena`] is a plain single-owner data structure: it holds no lock and
//! needs `&mut self` for every operation. When several threads need to share
//! one, wrap it in a [`Locked`], which takes a lock around each whole
//! allocation or free.
//!
//! # Default implementations
//! This crate provides an implementation for [`std::sync::Mutex`], and with
//! the `spin` feature, an implementation for [`spin::Mutex`]. The spin
//! implementation is [not
//! recommended](https://matklad.github.io/2020/01/02/spinlocks-considered-harmful.html),
//! however. If possible, use the std one or implement your own.

use core::{cell::UnsafeCell, fmt::Debug};

#[cfg(feature = "spin")]
use spin::Mutex;

use crate::{alloc::Allocator, error::Result, index::FreeIndex, Arena};

/// A trait for types that can be used as locks.
///
/// In order to avoid exposing private types, this lock is typeless and does not
/// actually store the value directly. It should usually be implemented with a
/// mutex with an empty data field.
///
/// # Safety
/// The type must provide unique access to the underlying data, like a mutex
/// would.
pub unsafe trait Lock: Default {
    /// The guard type returned by this lock.
    ///
    /// This type will be held for as long as the lock is held, and will be
    /// dropped when the arena should be unlocked.
    type Guard<'a>
    where
        Self: 'a;

    /// Locks the type.
    ///
    /// This function should block until the lock is acquired. It should return
    /// a guard that will be held for as long as the lock is held. It should not
    /// allow any other access until the guard is dropped.
    fn lock(&self) -> Self::Guard<'_>;
}

#[cfg(feature = "spin")]
unsafe impl Lock for Mutex<()> {
    type Guard<'a> = spin::MutexGuard<'a, ()>;

    fn lock(&self) -> Self::Guard<'_> {
        self.lock()
    }
}

unsafe impl Lock for std::sync::Mutex<()> {
    type Guard<'a> = std::sync::MutexGuard<'a, ()>;

    fn lock(&self) -> Self::Guard<'_> {
        // The guarded data is `()`; poisoning carries no state.
        self.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// An [`Arena`] behind a lock, usable through a shared reference.
///
/// ```rust
/// # use bfcarena::{Bfc, Locked};
/// # use std::sync::Mutex;
/// let arena = Locked::<_, Mutex<()>>::new(Bfc::create("shared", 0x1000, 0x10).unwrap());
/// let base = arena.alloc(0x20).unwrap();
/// arena.free(base).unwrap();
/// ```
pub struct Locked<'label, I: FreeIndex, L: Lock> {
    lock: L,
    arena: UnsafeCell<Arena<'label, I>>,
}
impl<'label, I: FreeIndex, L: Lock> Locked<'label, I, L> {
    /// Wrap an arena in a lock.
    pub fn new(arena: Arena<'label, I>) -> Self {
        Self {
            lock: L::default(),
            arena: UnsafeCell::new(arena),
        }
    }

    /// Allocate from the arena. See [`Arena::alloc`].
    pub fn alloc(&self, size: usize) -> Result<usize> {
        let guard = self.lock.lock();
        let result = unsafe { (*self.arena.get()).alloc(size) };
        drop(guard);
        result
    }

    /// Free a block of the arena. See [`Arena::free`].
    pub fn free(&self, base: usize) -> Result<()> {
        let guard = self.lock.lock();
        let result = unsafe { (*self.arena.get()).free(base) };
        drop(guard);
        result
    }

    /// Run `f` with the arena locked, for reading its metrics.
    pub fn with<R>(&self, f: impl FnOnce(&Arena<'label, I>) -> R) -> R {
        let guard = self.lock.lock();
        let result = f(unsafe { &*self.arena.get() });
        drop(guard);
        result
    }

    /// Unwrap the arena. No lock is needed, since `self` is owned.
    pub fn into_inner(self) -> Arena<'label, I> {
        self.arena.into_inner()
    }
}
impl<'label, I: FreeIndex, L: Lock> Allocator for Locked<'label, I, L> {
    fn alloc(&mut self, size: usize) -> Result<usize> {
        self.arena.get_mut().alloc(size)
    }

    fn free(&mut self, base: usize) -> Result<()> {
        self.arena.get_mut().free(base)
    }
}
impl<'label, I: FreeIndex, L: Lock> Debug for Locked<'label, I, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.with(|arena| Debug::fmt(arena, f))
    }
}
unsafe impl<'label, I: FreeIndex + Send, L: Lock + Sync> Sync for Locked<'label, I, L> {}
