//! Heap extender (spec.md §4.8): grow the region, rewrite the epilogue,
//! and hand the new block to the coalescer so it can absorb a free block
//! that was already trailing the old epilogue.

use crate::config::align_up;
use crate::region::RegionProvider;
use crate::{AllocError, Allocator};

impl<R: RegionProvider> Allocator<R> {
    /// Grow the heap by at least `min_bytes` (rounded up to 8), splicing
    /// the new free block in where the old epilogue used to sit. Returns
    /// the `bp` of the (possibly further-coalesced) resulting free block.
    pub(crate) fn extend_heap(&mut self, min_bytes: usize) -> Result<usize, AllocError> {
        let size = align_up(min_bytes, 8);
        let old_epilogue_word = self.read_word_at_current_epilogue();
        let base = self.region.extend(size)?;

        let prev_allocated = crate::header::unpack_prev_allocated(old_epilogue_word);
        let size_u32 = u32::try_from(size).map_err(|_| AllocError::Exhausted)?;
        let bp = base;

        self.write_header(bp, size_u32, prev_allocated, false);
        self.write_footer(bp, size_u32, false);

        let new_epilogue_bp = self.succ_bp(bp, size_u32);
        self.write_header(new_epilogue_bp, 0, false, true);

        self.extensions += 1;
        Ok(self.coalesce(bp))
    }

    /// Peek at whatever currently sits at the heap's tail word (the
    /// epilogue header, always `(size=0, prev_allocated, allocated=true)`)
    /// before `region.extend` overwrites it.
    fn read_word_at_current_epilogue(&self) -> u32 {
        let addr = self.region.heap_high() - 4;
        unsafe { self.read_word(addr) }
    }
}
