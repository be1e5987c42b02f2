//! Error types used across the crate.

use core::fmt::Display;

/// [`core::result::Result`] with [`Error`] as the error type.
pub type Result<T> = core::result::Result<T, Error>;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
/// An error returned from a function in this crate.
pub enum Error {
    /// The specified alignment was zero.
    InvalidAlignment,
    /// No free chunk is large enough to hold the requested size, or the
    /// requested size cannot be rounded up to the alignment without
    /// overflowing.
    OutOfMemory,
    /// The block could not be freed because it was never allocated, or it was
    /// already freed.
    NoSuchAllocation,
}
impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidAlignment => write!(f, "the specified alignment was zero"),
            Self::OutOfMemory => write!(f, "alloc: out of memory"),
            Self::NoSuchAllocation => write!(f, "no such allocation"),
        }
    }
}
impl std::error::Error for Error {}
