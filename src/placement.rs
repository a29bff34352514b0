//! Placement engine (spec.md §4.5): `allocate` searches the seglist for a
//! fit, extending the heap on a total miss; `place` splits or consumes the
//! chosen block.

use crate::config::{required_block_size, FitPolicy, MIN_BLOCK_SIZE, N_BINS};
use crate::region::RegionProvider;
use crate::{AllocError, Allocator};

const NIL: u32 = 0;

impl<R: RegionProvider> Allocator<R> {
    /// Allocate at least `n` bytes, returning an 8-byte-aligned pointer, or
    /// `NIL` (a null pointer) for `n == 0` — which is success, not an
    /// error. Fails only when the region provider cannot grow the heap far
    /// enough.
    pub fn allocate(&mut self, n: usize) -> Result<*mut u8, AllocError> {
        debug_assert!(self.initialized, "Allocator::initialize was never called");

        if n == 0 {
            return Ok(core::ptr::null_mut());
        }
        let asize = required_block_size(n).ok_or(AllocError::Exhausted)?;

        let bp = match self.find_fit(asize) {
            Some(bp) => bp,
            None => {
                let grow_by = asize.max(self.config.initial_chunk as u32) as usize;
                self.extend_heap(grow_by)?
            }
        };

        self.place(bp, asize);
        self.maybe_check(line!());
        Ok(bp as *mut u8)
    }

    /// Search bins starting at `bin_of(asize)` for a block that fits,
    /// per the configured [`FitPolicy`]. Returns the chosen block's `bp`.
    ///
    /// Only the start bin can hold a block that's merely "big enough, but
    /// with more slack than others in the same bin" — every block in a
    /// later bin is `≥ asize` by construction of the bin bounds (spec.md
    /// §4.5), so the first block found there is unconditionally acceptable
    /// regardless of [`FitPolicy`].
    fn find_fit(&self, asize: u32) -> Option<usize> {
        let start_bin = self.bin_of(asize);

        match self.config.fit_policy {
            FitPolicy::Best => {
                if let Some(bp) = self.best_fit_in_bin(start_bin, asize) {
                    return Some(bp);
                }
            }
            FitPolicy::First => {
                if let Some(bp) = self.first_fit_in_bin(start_bin, asize) {
                    return Some(bp);
                }
            }
        }

        for bin in start_bin + 1..N_BINS {
            if let Some(bp) = self.first_fit_in_bin(bin, asize) {
                return Some(bp);
            }
        }
        None
    }

    fn first_fit_in_bin(&self, bin: usize, asize: u32) -> Option<usize> {
        let mut cursor = self.read_bin_head(bin);
        while cursor != NIL {
            let bp = self.decode_offset(cursor);
            if self.size_of(bp) >= asize {
                return Some(bp);
            }
            cursor = self.read_next(bp);
        }
        None
    }

    fn best_fit_in_bin(&self, bin: usize, asize: u32) -> Option<usize> {
        let mut cursor = self.read_bin_head(bin);
        let mut best: Option<(usize, u32)> = None;
        while cursor != NIL {
            let bp = self.decode_offset(cursor);
            let size = self.size_of(bp);
            if size >= asize {
                let slack = size - asize;
                if slack < MIN_BLOCK_SIZE {
                    // Can't do better than this within the bin: commit.
                    return Some(bp);
                }
                let is_better = match best {
                    None => true,
                    Some((_, best_size)) => size < best_size,
                };
                if is_better {
                    best = Some((bp, size));
                }
            }
            cursor = self.read_next(bp);
        }
        best.map(|(bp, _)| bp)
    }

    /// Place a request of `asize` bytes into the free block at `bp`,
    /// splitting off a free tail when there is at least `MIN_BLOCK_SIZE`
    /// bytes of slack.
    pub(crate) fn place(&mut self, bp: usize, asize: u32) {
        let size = self.size_of(bp);
        // The block is removed from its free list before its header is
        // rewritten: the free-list decoder reads `next`/`prev` out of the
        // payload words, and once the header is overwritten for the
        // allocated case those words are about to become user data. Doing
        // the removal first means it never reads a stale (or soon to be
        // overwritten) sibling offset.
        self.freelist_remove(bp, size);

        if size - asize >= MIN_BLOCK_SIZE {
            let prev_allocated = self.is_prev_allocated(bp);
            self.write_header(bp, asize, prev_allocated, true);

            let tail_bp = self.succ_bp(bp, asize);
            let tail_size = size - asize;
            self.write_header(tail_bp, tail_size, true, false);
            self.write_footer(tail_bp, tail_size, false);
            self.freelist_insert(tail_bp, tail_size);

            let after_tail = self.succ_bp(tail_bp, tail_size);
            self.set_prev_allocated(after_tail, false);
        } else {
            self.write_header_preserving_prev_alloc(bp, size, true);
            let succ = self.succ_bp(bp, size);
            self.set_prev_allocated(succ, true);
        }
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
    fn first_allocation_is_aligned_and_prologue_marked_prev_allocated() {
        let mut alloc = fresh();
        let p = alloc.allocate(1).unwrap();
        assert!(!p.is_null());
        assert_eq!(p as usize % 8, 0);
        assert_eq!(alloc.size_of(p as usize), 16);
        assert!(alloc.is_prev_allocated(p as usize));
    }

    #[test]
    fn zero_size_allocation_returns_nil_success() {
        let mut alloc = fresh();
        let p = alloc.allocate(0).unwrap();
        assert!(p.is_null());
    }

    #[test]
    fn scenario_two_merges_on_double_release() {
        let mut alloc = fresh();
        let a = alloc.allocate(24).unwrap();
        let b = alloc.allocate(24).unwrap();
        unsafe {
            alloc.release(a);
            alloc.release(b);
        }
        assert_eq!(alloc.check(line!()), 0);
    }
}
