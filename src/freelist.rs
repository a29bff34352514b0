//! Free-list store (spec.md §4.4): insert/remove a block from the doubly
//! linked list of its bin, encoded as compressed offsets inside the free
//! block's own payload words.

use crate::config::InsertPolicy;
use crate::region::RegionProvider;
use crate::Allocator;

const NIL: u32 = 0;

impl<R: RegionProvider> Allocator<R> {
    /// Insert `bp` (a block of `size` bytes, not currently in any list)
    /// into the bin matching `size`.
    pub(crate) fn freelist_insert(&mut self, bp: usize, size: u32) {
        let bin = self.bin_of(size);
        match self.config.insert_policy {
            InsertPolicy::Lifo => self.freelist_insert_at_head(bin, bp),
            InsertPolicy::AddressOrdered => self.freelist_insert_address_ordered(bin, bp),
        }
    }

    fn freelist_insert_at_head(&mut self, bin: usize, bp: usize) {
        let old_head = self.read_bin_head(bin);
        self.write_next(bp, old_head);
        self.write_prev(bp, NIL);
        if old_head == NIL {
            self.write_bin_tail(bin, self.encode_offset(bp));
        } else {
            let old_head_bp = self.decode_offset(old_head);
            self.write_prev(old_head_bp, self.encode_offset(bp));
        }
        self.write_bin_head(bin, self.encode_offset(bp));
    }

    fn freelist_insert_address_ordered(&mut self, bin: usize, bp: usize) {
        let mut cursor = self.read_bin_head(bin);
        let mut prev_of_cursor = NIL;
        while cursor != NIL {
            let cursor_bp = self.decode_offset(cursor);
            if cursor_bp > bp {
                break;
            }
            prev_of_cursor = cursor;
            cursor = self.read_next(cursor_bp);
        }

        self.write_next(bp, cursor);
        self.write_prev(bp, prev_of_cursor);

        if cursor == NIL {
            self.write_bin_tail(bin, self.encode_offset(bp));
        } else {
            let cursor_bp = self.decode_offset(cursor);
            self.write_prev(cursor_bp, self.encode_offset(bp));
        }

        if prev_of_cursor == NIL {
            self.write_bin_head(bin, self.encode_offset(bp));
        } else {
            let prev_bp = self.decode_offset(prev_of_cursor);
            self.write_next(prev_bp, self.encode_offset(bp));
        }
    }

    /// Splice `bp` (a block of `size` bytes currently free) out of its bin.
    pub(crate) fn freelist_remove(&mut self, bp: usize, size: u32) {
        let bin = self.bin_of(size);
        let prev = self.read_prev(bp);
        let next = self.read_next(bp);

        if prev == NIL {
            self.write_bin_head(bin, next);
        } else {
            let prev_bp = self.decode_offset(prev);
            self.write_next(prev_bp, next);
        }

        if next == NIL {
            self.write_bin_tail(bin, prev);
        } else {
            let next_bp = self.decode_offset(next);
            self.write_prev(next_bp, prev);
        }
    }
}
