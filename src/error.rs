//! Error taxonomy (spec.md §7).
//!
//! Only `Exhausted` is an actual return value: `InvalidArgument` is not an
//! error at all (`allocate(0)` returns `NIL` as success, `resize(NIL, 0)`
//! returns `NIL`), `InvariantViolation` surfaces only through
//! [`crate::Allocator::check`]'s diagnostic log stream, and
//! `UndefinedBehavior` (releasing a pointer the allocator never handed out,
//! double release, out-of-bounds resize) is not detected at all — it is
//! caller responsibility, documented on the `unsafe fn`s that carry the
//! precondition.

/// The one detectable failure mode of this allocator: the region provider
/// refused to grow the heap far enough to satisfy a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The region provider's `extend` returned failure, or the request
    /// could not be represented in the allocator's 32-bit size field.
    Exhausted,
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AllocError::Exhausted => {
                write!(f, "region provider exhausted: heap could not be extended")
            }
        }
    }
}

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
impl std::error::Error for AllocError {}
