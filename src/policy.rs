#[derive(Clone, Debug)]
/// The configuration a map was built with.
pub struct Policy {
    initial_capacity: usize,
    load_factor: f32,
}

impl Policy {
    pub(crate) fn new(initial_capacity: usize, load_factor: f32) -> Self {
        Self {
            initial_capacity,
            load_factor,
        }
    }

    /// Returns the number of buckets of the map's first table. This is the
    /// requested `initial_capacity` after rounding up to a power of two.
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Returns the `load_factor` of the map.
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }
}
