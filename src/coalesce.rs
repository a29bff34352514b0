//! Coalescer (spec.md §4.6): the four boundary-tag merge cases, classified
//! by `(prev_allocated(bp), allocated(succ(bp)))`. Called right after a
//! block is marked free, whether that happened on `release` or on heap
//! extension.

use crate::region::RegionProvider;
use crate::Allocator;

impl<R: RegionProvider> Allocator<R> {
    /// Release a block back to the allocator. A `NIL` (null) pointer is a
    /// no-op.
    ///
    /// # Safety
    /// `ptr` must be `NIL` or a pointer this allocator previously returned
    /// from `allocate`/`resize`/`zeroed`, and must not have been released
    /// since. Violating this is undefined behavior the allocator cannot
    /// detect (spec.md §7).
    pub unsafe fn release(&mut self, ptr: *mut u8) {
        debug_assert!(self.initialized, "Allocator::initialize was never called");

        if ptr.is_null() {
            return;
        }
        let bp = ptr as usize;
        let size = self.size_of(bp);
        let prev_allocated = self.is_prev_allocated(bp);
        self.write_header(bp, size, prev_allocated, false);
        self.write_footer(bp, size, false);
        self.coalesce(bp);
        self.maybe_check(line!());
    }

    /// `bp` must already be marked free (header + footer written with
    /// `allocated = false`) but not yet present in any bin. Merges with a
    /// free predecessor and/or successor, reinserts the resulting block,
    /// and returns its `bp`.
    pub(crate) fn coalesce(&mut self, bp: usize) -> usize {
        let size = self.size_of(bp);
        let prev_allocated = self.is_prev_allocated(bp);
        let succ_bp = self.succ_bp(bp, size);
        let succ_allocated = self.is_allocated(succ_bp);

        let (result_bp, result_size) = match (prev_allocated, succ_allocated) {
            (true, true) => (bp, size),
            (true, false) => {
                let succ_size = self.size_of(succ_bp);
                self.freelist_remove(succ_bp, succ_size);
                (bp, size + succ_size)
            }
            (false, true) => {
                let pred_bp = self.pred_bp(bp);
                let pred_size = self.size_of(pred_bp);
                self.freelist_remove(pred_bp, pred_size);
                (pred_bp, pred_size + size)
            }
            (false, false) => {
                let pred_bp = self.pred_bp(bp);
                let pred_size = self.size_of(pred_bp);
                let succ_size = self.size_of(succ_bp);
                self.freelist_remove(pred_bp, pred_size);
                self.freelist_remove(succ_bp, succ_size);
                (pred_bp, pred_size + size + succ_size)
            }
        };

        let result_prev_allocated = self.is_prev_allocated(result_bp);
        self.write_header(result_bp, result_size, result_prev_allocated, false);
        self.write_footer(result_bp, result_size, false);

        let new_succ = self.succ_bp(result_bp, result_size);
        self.set_prev_allocated(new_succ, false);

        self.freelist_insert(result_bp, result_size);
        result_bp
    }
}

#[cfg(test)]
mod tests {
    use crate::region::VecRegion;
    use crate::{Allocator, Config};

    fn fresh() -> Allocator<VecRegion> {
        let mut alloc = Allocator::new(VecRegion::new(1 << 20), Config::default());
        alloc.initialize().unwrap();
        alloc
    }

    #[test]
    fn releasing_neighbors_merges_into_one_block() {
        let mut alloc = fresh();
        let a = alloc.allocate(24).unwrap();
        let b = alloc.allocate(24).unwrap();
        let c = alloc.allocate(24).unwrap();
        unsafe {
            alloc.release(a);
            alloc.release(c);
            // b still allocated in between: a and c stay as two separate
            // free blocks, not merged with each other.
        }
        assert_eq!(alloc.check(line!()), 0);
        unsafe {
            alloc.release(b);
        }
        // Now a, b, c merge into a single free run.
        assert_eq!(alloc.check(line!()), 0);
    }

    #[test]
    fn no_adjacent_free_blocks_survive_release() {
        let mut alloc = fresh();
        let ptrs: Vec<_> = (0..8).map(|_| alloc.allocate(32).unwrap()).collect();
        for p in ptrs {
            unsafe { alloc.release(p) };
        }
        assert_eq!(alloc.check(line!()), 0);
    }
}
