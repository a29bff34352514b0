//! Heap skeleton (spec.md §4.2): the fixed layout at the base of the region
//! (seglist head/tail/bound arrays, then the prologue/epilogue sentinels)
//! plus the initial chunk that gives the allocator its first free block.

use crate::config::{N_BINS, WORD};
use crate::header;
use crate::region::RegionProvider;
use crate::{AllocError, Allocator};

pub(crate) const HEAD_ARRAY_OFFSET: usize = 0;
pub(crate) const TAIL_ARRAY_OFFSET: usize = N_BINS * WORD;
pub(crate) const BIN_BOUND_ARRAY_OFFSET: usize = 2 * N_BINS * WORD;
pub(crate) const PADDING_OFFSET: usize = 3 * N_BINS * WORD;
pub(crate) const PROLOGUE_HEADER_OFFSET: usize = PADDING_OFFSET + WORD;
pub(crate) const PROLOGUE_FOOTER_OFFSET: usize = PROLOGUE_HEADER_OFFSET + WORD;
pub(crate) const EPILOGUE_HEADER_OFFSET: usize = PROLOGUE_FOOTER_OFFSET + WORD;
/// Total bytes the skeleton occupies ahead of the first real block.
pub(crate) const SKELETON_SIZE: usize = EPILOGUE_HEADER_OFFSET + WORD;

impl<R: RegionProvider> Allocator<R> {
    /// Build an allocator over `region`, uninitialized: call
    /// [`Allocator::initialize`] before issuing any other request.
    pub const fn new(region: R, config: crate::Config) -> Self {
        Self {
            region,
            anchor: 0,
            skeleton_base: 0,
            config,
            initialized: false,
            extensions: 0,
        }
    }

    /// Install the skeleton (seglist arrays + prologue/epilogue) and an
    /// initial chunk of free memory, per spec.md §4.2.
    pub fn initialize(&mut self) -> Result<(), AllocError> {
        debug_assert!(!self.initialized, "Allocator::initialize called twice");

        let base = self.region.extend(SKELETON_SIZE)?;
        self.skeleton_base = base;

        for bin in 0..N_BINS {
            self.write_bin_head(bin, 0);
            self.write_bin_tail(bin, 0);
            let bound = if bin == N_BINS - 1 {
                u32::MAX
            } else {
                1u32 << (bin + 4)
            };
            self.write_bin_bound(bin, bound);
        }

        let prologue_header_addr = base + PROLOGUE_HEADER_OFFSET;
        let prologue_footer_addr = base + PROLOGUE_FOOTER_OFFSET;
        let epilogue_header_addr = base + EPILOGUE_HEADER_OFFSET;
        unsafe {
            self.write_word(prologue_header_addr, header::pack(8, true, true));
            self.write_word(prologue_footer_addr, header::pack(8, false, true));
            self.write_word(epilogue_header_addr, header::pack(0, true, true));
        }

        // The anchor is the byte immediately after the prologue footer —
        // exactly where the epilogue header (and later the first real
        // block's header) sits.
        self.anchor = epilogue_header_addr;
        self.initialized = true;

        let initial_chunk = self.config.initial_chunk;
        self.extend_heap(initial_chunk)?;
        self.maybe_check(line!());
        Ok(())
    }

    /// The prologue's `bp` (payload-pointer convention; it has no real
    /// payload, only header+footer).
    pub(crate) fn prologue_bp(&self) -> usize {
        self.skeleton_base + PROLOGUE_HEADER_OFFSET + WORD
    }
}
