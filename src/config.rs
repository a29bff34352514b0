//! Configuration knobs (spec.md §6) and the handful of layout constants that
//! the bit-packed header format is built around.
//!
//! `alignment` and `word` are architectural constants rather than runtime
//! toggles: the header codec in [`crate::header`] hard-codes 8-byte blocks
//! and 4-byte words, so changing them would mean changing the bit layout,
//! not flipping a flag. They are exposed as `pub const`s for documentation
//! and for callers sizing their own region buffers.

/// Block/payload alignment in bytes.
pub const ALIGNMENT: usize = 8;
/// Machine word size used for headers, footers and free-list links.
pub const WORD: usize = 4;
/// Minimum block size: header + next + prev + footer.
pub const MIN_BLOCK_SIZE: u32 = 16;
/// Number of segregated-list bins.
pub const N_BINS: usize = 12;
/// Bytes requested from the region provider for the very first chunk.
pub const INITIAL_CHUNK: usize = 256;
/// Upper bound on total region size: block sizes are packed into 32 bits
/// with the low 3 bits reserved for flags, so no block (and hence no
/// region) may reach `1 << 32` bytes.
pub const MAX_REGION_BYTES: u64 = 1 << 32;

/// Round `n` up to the next multiple of `align` (`align` must be a power of two).
pub(crate) const fn align_up(n: usize, align: usize) -> usize {
    (n + align - 1) & !(align - 1)
}

/// Placement strategy used when scanning a bin for a fit (spec.md §4.5, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitPolicy {
    /// Scan the bin, remembering the smallest block that still fits, with
    /// an early exit once a candidate's slack drops below the split
    /// threshold. This is the spec's default.
    #[default]
    Best,
    /// Take the first block in the bin that fits, without scanning further.
    First,
}

/// Where a freed block is spliced back into its bin's list (spec.md §4.4, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPolicy {
    /// Push at the head of the bin's list. This is the spec's default.
    #[default]
    Lifo,
    /// Keep the bin's list sorted by ascending block address.
    AddressOrdered,
}

/// Runtime-tunable allocator behavior (spec.md §6 "Configuration knobs").
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Bytes requested on the first call to [`crate::Allocator::initialize`]
    /// and on every subsequent extension miss. Defaults to
    /// [`INITIAL_CHUNK`].
    pub initial_chunk: usize,
    /// Bin search / split strategy. Defaults to [`FitPolicy::Best`].
    pub fit_policy: FitPolicy,
    /// Free-list splice strategy. Defaults to [`InsertPolicy::Lifo`].
    pub insert_policy: InsertPolicy,
    /// Run [`crate::Allocator::check`] after every mutating call and
    /// `debug_assert!` that it found no violations. Only the `debug_assert!`
    /// is gated on this flag; `check` itself always just reports.
    pub debug_checks: bool,
    /// Log a line-by-line dump of the heap walk on every [`crate::Allocator::check`].
    pub view_heap: bool,
    /// Log a dump of every bin's free list on every [`crate::Allocator::check`].
    pub view_free_list: bool,
}

impl Config {
    /// Same values as [`Config::default`], usable from a `const fn` context
    /// (the `Default` trait itself can't be). [`crate::global::GlobalAllocator::new`]
    /// needs this to build its inner `Allocator` at `static` initialization time.
    pub const fn const_default() -> Self {
        Self {
            initial_chunk: INITIAL_CHUNK,
            fit_policy: FitPolicy::Best,
            insert_policy: InsertPolicy::Lifo,
            debug_checks: true,
            view_heap: false,
            view_free_list: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::const_default()
    }
}

/// Compute the block size (header included) needed to satisfy a payload
/// request of `n` bytes, or `None` if the request cannot be represented in
/// the 32-bit size field at all (treated by callers as [`crate::AllocError::Exhausted`]).
pub(crate) fn required_block_size(n: usize) -> Option<u32> {
    let with_header = n.checked_add(WORD)?;
    let aligned = align_up(with_header, ALIGNMENT);
    let size = aligned.max(MIN_BLOCK_SIZE as usize);
    u32::try_from(size).ok()
}
