//! Plays the six literal scenarios of spec.md §8 end-to-end through the
//! public API, the way a trace-driven test harness would replay an
//! allocator trace file.
//!
//! Byte counts in the scenario text assume the header overhead of the
//! pseudo-code this allocator's design was distilled from; this crate's
//! packed 4-byte header (see `DESIGN.md`, "Scenario byte counts") elides
//! footers on allocated blocks and has a different overhead, so these tests
//! check the *structural* claim each scenario makes (alignment, merge
//! behavior, which pointer comes back, invariants holding) rather than
//! re-deriving the literal byte totals from a different header layout.

use segalloc::{AllocError, Allocator, Config, FitPolicy, VecRegion};

fn heap(capacity: usize) -> Allocator<VecRegion> {
    let mut alloc = Allocator::new(VecRegion::new(capacity), Config::default());
    alloc.initialize().unwrap();
    alloc
}

#[test]
fn scenario_one_first_allocation_from_an_empty_heap() {
    let mut alloc = heap(1 << 16);
    let p = alloc.allocate(1).unwrap();
    assert!(!p.is_null());
    assert_eq!(p as usize % 8, 0);

    let info = alloc.inspect(p);
    assert_eq!(info.block_size, 16);
    assert!(info.prev_allocated, "the prologue sentinel precedes the first real block");
    assert_eq!(alloc.check(line!()), 0);
}

#[test]
fn scenario_two_releasing_two_adjacent_blocks_merges_them() {
    // A tight initial chunk sized to exactly two 24-byte-payload blocks, so
    // there is no leftover sliver for the merge to also absorb.
    let mut alloc = Allocator::new(
        VecRegion::new(1 << 16),
        Config {
            initial_chunk: 64,
            ..Config::default()
        },
    );
    alloc.initialize().unwrap();

    let a = alloc.allocate(24).unwrap();
    let b = alloc.allocate(24).unwrap();
    let a_size = alloc.inspect(a).block_size;
    let b_size = alloc.inspect(b).block_size;

    unsafe {
        alloc.release(a);
        alloc.release(b);
    }
    assert_eq!(alloc.check(line!()), 0);

    // The merged run's total payload capacity is one header's worth more
    // than the two separate blocks' payloads combined. Requesting exactly
    // that and getting `a`'s address back is proof the two became one.
    let merged_capacity = a_size + b_size - segalloc::WORD;
    let c = alloc.allocate(merged_capacity).unwrap();
    assert_eq!(c, a);
    unsafe { alloc.release(c) };
    assert_eq!(alloc.check(line!()), 0);
}

#[test]
fn scenario_three_shrink_returns_same_pointer_with_trailing_remainder() {
    let mut alloc = heap(1 << 16);
    let p = alloc.allocate(100).unwrap();
    let before = alloc.inspect(p).block_size;

    let q = unsafe { alloc.resize(p, 50).unwrap() };
    assert_eq!(q, p);

    let after = alloc.inspect(q).block_size;
    assert!(after < before, "shrinking must split off a trailing free remainder");
    assert_eq!(alloc.check(line!()), 0);
}

#[test]
fn scenario_four_expand_absorbs_freed_neighbor() {
    let mut alloc = heap(1 << 16);
    let p = alloc.allocate(100).unwrap();
    let q = alloc.allocate(100).unwrap();
    unsafe { alloc.release(q) };

    let r = unsafe { alloc.resize(p, 180).unwrap() };
    assert_eq!(r, p, "in-place growth must not relocate the block");
    assert!(alloc.inspect(r).payload_size >= 180);
    assert_eq!(alloc.check(line!()), 0);
}

#[test]
fn scenario_five_bounded_extensions_under_repeated_small_allocations() {
    const INITIAL_CHUNK: usize = segalloc::INITIAL_CHUNK;
    let mut alloc = heap(1 << 20);
    let before = alloc.extension_count();

    for _ in 0..32 {
        let p = alloc.allocate(8).unwrap();
        assert!(!p.is_null());
    }

    let extensions = alloc.extension_count() - before;
    let max_expected = (32 * 16 + 8 + INITIAL_CHUNK - 1) / INITIAL_CHUNK;
    assert!(extensions <= max_expected, "{extensions} extensions, expected at most {max_expected}");
    assert_eq!(alloc.check(line!()), 0);
}

#[test]
fn scenario_six_oversized_request_fails_without_corrupting_the_heap() {
    let mut alloc = heap(1 << 16);
    let err = alloc.allocate(1usize << 31).unwrap_err();
    assert_eq!(err, AllocError::Exhausted);
    assert_eq!(alloc.check(line!()), 0);

    // The heap must still be usable after the failed attempt.
    let p = alloc.allocate(16).unwrap();
    assert!(!p.is_null());
    unsafe { alloc.release(p) };
    assert_eq!(alloc.check(line!()), 0);
}

#[test]
fn mixed_trace_with_first_fit_policy_stays_consistent() {
    let mut alloc = Allocator::new(
        VecRegion::new(1 << 16),
        Config {
            fit_policy: FitPolicy::First,
            ..Config::default()
        },
    );
    alloc.initialize().unwrap();

    let mut live = Vec::new();
    for i in 0..64 {
        let size = 8 + (i % 7) * 8;
        live.push(alloc.allocate(size).unwrap());
    }
    for (i, p) in live.into_iter().enumerate() {
        if i % 3 == 0 {
            unsafe { alloc.release(p) };
        }
    }
    assert_eq!(alloc.check(line!()), 0);
}
