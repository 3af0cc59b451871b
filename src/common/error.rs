/// The error type for building a [`StripedHashMap`][map-struct] with an invalid
/// configuration.
///
/// Returned by [`MapBuilder::try_build`][try-build] and
/// [`MapBuilder::try_build_with_hasher`][try-build-with-hasher]. The
/// non-`try` variants of these methods panic with the same message.
///
/// [map-struct]: ./sync/struct.StripedHashMap.html
/// [try-build]: ./sync/struct.MapBuilder.html#method.try_build
/// [try-build-with-hasher]: ./sync/struct.MapBuilder.html#method.try_build_with_hasher
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// The load factor was zero, negative, NaN or infinite.
    ///
    /// The load factor decides how full the bucket table may get before it is
    /// doubled, so it must be a finite number greater than zero.
    #[error("Invalid load factor {0}. It must be a finite number greater than zero")]
    InvalidLoadFactor(f32),

    /// The initial capacity could not be rounded up to a power of two without
    /// overflowing `usize`.
    #[error("Initial capacity {0} is too large to be rounded up to a power of two")]
    CapacityOverflow(usize),
}

#[cfg(test)]
mod tests {
    use super::BuildError;

    #[test]
    fn error_messages() {
        assert_eq!(
            BuildError::InvalidLoadFactor(-1.0).to_string(),
            "Invalid load factor -1. It must be a finite number greater than zero"
        );
        assert_eq!(
            BuildError::CapacityOverflow(usize::MAX).to_string(),
            format!(
                "Initial capacity {} is too large to be rounded up to a power of two",
                usize::MAX
            )
        );
    }
}
