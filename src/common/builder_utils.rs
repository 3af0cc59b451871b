use super::{concurrent::constants::DEFAULT_INITIAL_CAPACITY, error::BuildError};

pub(crate) fn ensure_load_factor(load_factor: f32) -> Result<f32, BuildError> {
    if load_factor.is_finite() && load_factor > 0.0 {
        Ok(load_factor)
    } else {
        Err(BuildError::InvalidLoadFactor(load_factor))
    }
}

/// Rounds the requested capacity up to the bucket count of the first table: a
/// power of two, never below the default.
pub(crate) fn initial_table_length(capacity: Option<usize>) -> Result<usize, BuildError> {
    let capacity = capacity.unwrap_or(DEFAULT_INITIAL_CAPACITY);
    capacity
        .max(DEFAULT_INITIAL_CAPACITY)
        .checked_next_power_of_two()
        .ok_or(BuildError::CapacityOverflow(capacity))
}

#[cfg(test)]
mod tests {
    use super::{ensure_load_factor, initial_table_length};
    use crate::BuildError;

    #[test]
    fn load_factors() {
        assert_eq!(ensure_load_factor(0.75), Ok(0.75));
        assert_eq!(ensure_load_factor(3.0), Ok(3.0));
        assert_eq!(
            ensure_load_factor(0.0),
            Err(BuildError::InvalidLoadFactor(0.0))
        );
        assert_eq!(
            ensure_load_factor(-0.5),
            Err(BuildError::InvalidLoadFactor(-0.5))
        );
        assert_eq!(
            ensure_load_factor(f32::INFINITY),
            Err(BuildError::InvalidLoadFactor(f32::INFINITY))
        );
        assert!(matches!(
            ensure_load_factor(f32::NAN),
            Err(BuildError::InvalidLoadFactor(f)) if f.is_nan()
        ));
    }

    #[test]
    fn table_lengths() {
        assert_eq!(initial_table_length(None), Ok(16));
        assert_eq!(initial_table_length(Some(0)), Ok(16));
        assert_eq!(initial_table_length(Some(1)), Ok(16));
        assert_eq!(initial_table_length(Some(16)), Ok(16));
        assert_eq!(initial_table_length(Some(17)), Ok(32));
        assert_eq!(initial_table_length(Some(1000)), Ok(1024));
        assert_eq!(
            initial_table_length(Some(usize::MAX)),
            Err(BuildError::CapacityOverflow(usize::MAX))
        );
    }
}
