/// The bucket count of a new map when no initial capacity is given. Tables never
/// shrink below this.
pub(crate) const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// The occupancy ratio at which the table doubles.
pub(crate) const DEFAULT_LOAD_FACTOR: f32 = 0.75;

// Non-negative fold applied to a hash before reducing it to a bucket index.
pub(crate) const HASH_INDEX_MASK: u64 = 0x7FFF_FFFF_FFFF_FFFF;
