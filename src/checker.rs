//! Checker (spec.md §4.9): walks the heap and the bins after every mutating
//! call, reporting every invariant violation it finds through `log`. It
//! never panics or asserts by itself — callers decide whether to escalate
//! (see [`Allocator::maybe_check`]), which is what lets a trace driver
//! batch up multiple violations from one heap walk instead of stopping at
//! the first.

use crate::config::{MIN_BLOCK_SIZE, N_BINS};
use crate::region::RegionProvider;
use crate::Allocator;

const NIL: u32 = 0;

impl<R: RegionProvider> Allocator<R> {
    pub(crate) fn maybe_check(&self, line_hint: u32) {
        if self.config.debug_checks {
            let violations = self.check(line_hint);
            debug_assert_eq!(violations, 0, "heap invariant violated near line {line_hint}, see log");
        }
    }

    /// Audit every invariant in spec.md §3 and §8, logging each violation
    /// found (tagged with `line_hint`, typically the caller's `line!()`)
    /// and returning the total violation count.
    pub fn check(&self, line_hint: u32) -> usize {
        let mut violations = 0;
        let mut free_via_walk = 0usize;

        if self.config.view_heap {
            log::debug!("[check:{line_hint}] heap walk from {:#x}", self.prologue_bp());
        }

        let mut bp = self.prologue_bp();
        let mut prev_was_free = false;
        loop {
            let header = self.read_header(bp);
            let size = crate::header::unpack_size(header);
            let allocated = crate::header::unpack_allocated(header);
            let prev_allocated = crate::header::unpack_prev_allocated(header);

            if size == 0 {
                // Epilogue reached; must be allocated.
                if !allocated {
                    violations += 1;
                    log::error!("[check:{line_hint}] epilogue at {bp:#x} is not allocated");
                }
                break;
            }

            if bp % 8 != 0 {
                violations += 1;
                log::error!("[check:{line_hint}] block at {bp:#x} is not 8-byte aligned");
            }
            if size < MIN_BLOCK_SIZE {
                violations += 1;
                log::error!("[check:{line_hint}] block at {bp:#x} has size {size} < {MIN_BLOCK_SIZE}");
            }

            let expected_prev_allocated = if bp == self.prologue_bp() { true } else { !prev_was_free };
            if prev_allocated != expected_prev_allocated {
                violations += 1;
                log::error!(
                    "[check:{line_hint}] block at {bp:#x} prev_allocated={prev_allocated} but predecessor allocated={expected_prev_allocated}"
                );
            }

            if !allocated {
                free_via_walk += 1;
                if prev_was_free {
                    violations += 1;
                    log::error!("[check:{line_hint}] block at {bp:#x} is free and adjacent to a free predecessor");
                }

                let footer = self.read_footer(bp, size);
                let footer_size = crate::header::unpack_size(footer);
                let footer_allocated = crate::header::unpack_allocated(footer);
                if footer_size != size || footer_allocated {
                    violations += 1;
                    log::error!(
                        "[check:{line_hint}] block at {bp:#x} header/footer disagree: header size={size} footer size={footer_size} footer_allocated={footer_allocated}"
                    );
                }

                if self.config.view_free_list {
                    log::debug!("[check:{line_hint}]   free block at {bp:#x} size={size}");
                }
            }

            prev_was_free = !allocated;
            bp = self.succ_bp(bp, size);
        }

        violations += self.check_bins(line_hint, free_via_walk);
        violations
    }

    fn check_bins(&self, line_hint: u32, free_via_walk: usize) -> usize {
        let mut violations = 0;
        let mut free_via_bins = 0usize;

        for bin in 0..N_BINS {
            let bound = self.read_bin_bound(bin);
            let lower_bound = if bin == 0 {
                0
            } else {
                self.read_bin_bound(bin - 1)
            };

            let mut cursor = self.read_bin_head(bin);
            let mut prev_offset = NIL;
            while cursor != NIL {
                let bp = self.decode_offset(cursor);
                if bp < self.region.heap_low() || bp >= self.region.heap_high() {
                    violations += 1;
                    log::error!("[check:{line_hint}] bin {bin} entry {bp:#x} is outside the walkable heap");
                    break;
                }

                free_via_bins += 1;

                let size = self.size_of(bp);
                if !(size > lower_bound && (bin == N_BINS - 1 || size <= bound)) {
                    violations += 1;
                    log::error!(
                        "[check:{line_hint}] block at {bp:#x} size={size} does not belong in bin {bin} ({lower_bound}, {bound}]"
                    );
                }

                let actual_prev = self.read_prev(bp);
                if actual_prev != prev_offset {
                    violations += 1;
                    log::error!("[check:{line_hint}] bin {bin} entry {bp:#x} prev link broken");
                }

                prev_offset = cursor;
                cursor = self.read_next(bp);
            }

            if prev_offset != self.read_bin_tail(bin) {
                violations += 1;
                log::error!("[check:{line_hint}] bin {bin} tail does not match list end");
            }
        }

        if free_via_bins != free_via_walk {
            violations += 1;
            log::error!(
                "[check:{line_hint}] free block count mismatch: {free_via_walk} via heap walk, {free_via_bins} via bins"
            );
        }

        violations
    }
}
