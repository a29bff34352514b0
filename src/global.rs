//! Optional `#[global_allocator]` adapter (feature `global`), kept in the
//! same spirit as the teacher crate this one grew out of: a const-generic,
//! statically-sized allocator wrapped in a `spin::Mutex` so it can
//! implement [`GlobalAlloc`]'s `&self` methods.
//!
//! This is a convenience surface, not a concurrency story — spec.md's
//! "single-threaded, synchronous" model (§5) describes the allocation
//! algorithm itself. The lock here exists only to satisfy `GlobalAlloc`'s
//! signature; nothing about the segregated-list design is safe to call
//! concurrently from two real threads racing on the same heap.

use core::alloc::{GlobalAlloc, Layout};
use core::mem::size_of;
use core::ptr;

use crate::region::InlineRegion;
use crate::{Allocator, Config};

/// A ready-to-use `#[global_allocator]` over an inline `N`-byte buffer.
///
/// ```no_run
/// #[global_allocator]
/// static ALLOCATOR: segalloc::global::GlobalAllocator<4096> =
///     segalloc::global::GlobalAllocator::new();
///
/// extern crate alloc;
/// ```
pub struct GlobalAllocator<const N: usize> {
    inner: spin::Mutex<State<N>>,
}

/// Heap setup is deferred past construction: `Allocator::initialize` calls
/// `RegionProvider::extend`, which isn't `const`-evaluable, so a freshly
/// built [`GlobalAllocator`] holds an allocator that hasn't run it yet.
struct State<const N: usize> {
    allocator: Allocator<InlineRegion<N>>,
    ready: bool,
}

impl<const N: usize> GlobalAllocator<N> {
    /// Build the allocator.
    #[must_use = "assign this to a static and apply #[global_allocator]"]
    pub const fn new() -> Self {
        let allocator = Allocator::new(InlineRegion::new(), Config::const_default());
        Self {
            inner: spin::Mutex::new(State { allocator, ready: false }),
        }
    }

    fn ensure_initialized(state: &mut State<N>) {
        if !state.ready {
            // A buffer too small to hold the skeleton is a setup bug, not
            // a runtime condition callers can recover from.
            state.allocator.initialize().expect("GlobalAllocator buffer too small for the heap skeleton");
            state.ready = true;
        }
    }

    /// Align `ptr` up to `align`, reserving at least `size_of::<usize>()`
    /// bytes ahead of it to stash the block's true payload address when
    /// `align` exceeds the allocator's native 8-byte alignment.
    unsafe fn align_to(ptr: *mut u8, align: usize) -> *mut u8 {
        if align <= 8 {
            // Every payload address this allocator hands out is already
            // 8-byte aligned, so smaller alignments are free.
            return ptr;
        }
        let shifted = {
            let addr = ptr as usize + size_of::<usize>();
            let mismatch = addr & (align - 1);
            let offset = if mismatch != 0 { align - mismatch } else { 0 };
            addr + offset
        };
        // SAFETY: `alloc` over-allocated by `align` bytes for this path, so
        // the backpointer slot and the aligned pointer both land inside the
        // same block.
        unsafe {
            (shifted as *mut usize).sub(1).write(ptr as usize);
        }
        shifted as *mut u8
    }

    /// Recover the pointer `allocate` actually returned from one `align_to`
    /// shifted, by reading back the backpointer it stashed ahead of it.
    unsafe fn unshift(ptr: *mut u8, align: usize) -> *mut u8 {
        if align <= 8 {
            return ptr;
        }
        // SAFETY: `align_to` always wrote a backpointer exactly one `usize`
        // behind any pointer it returned for `align > 8`.
        unsafe { (*(ptr as *mut usize).sub(1)) as *mut u8 }
    }
}

impl<const N: usize> Default for GlobalAllocator<N> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: `alloc`/`dealloc` never unwind (the allocator's own API never
// panics on the error path, only on the documented setup-bug case above),
// and every returned pointer satisfies the requested size and alignment —
// alignments above the allocator's native 8 bytes are handled by
// over-allocating and shifting, exactly like the teacher crate this
// adapter is modeled on.
unsafe impl<const N: usize> GlobalAlloc for GlobalAllocator<N> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let align = layout.align();
        let size = if align > 8 {
            layout.size() + align + size_of::<usize>()
        } else {
            layout.size()
        };

        let mut guard = self.inner.lock();
        Self::ensure_initialized(&mut guard);
        match guard.allocator.allocate(size) {
            Ok(p) if !p.is_null() => unsafe { Self::align_to(p, align) },
            Ok(_) => ptr::null_mut(), // a zero-sized layout allocated to NIL
            Err(_) => ptr::null_mut(),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let align = layout.align();
        let mut guard = self.inner.lock();
        let base = unsafe { Self::unshift(ptr, align) };
        unsafe { guard.allocator.release(base) };
    }
}
