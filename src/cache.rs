//! Cache management types

/// Cache strategy for resolved setting values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStrategy {
    /// Memoize every resolved value (default)
    #[default]
    Full,
    /// LRU cache with maximum entries
    Lru(usize),
    /// No caching - every `get` resolves from the value store
    None,
}

impl CacheStrategy {
    /// Validate cache strategy configuration
    ///
    /// # Errors
    ///
    /// Returns error if LRU size is 0 (would panic on NonZeroUsize)
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            CacheStrategy::Lru(0) => Err(crate::Error::Config(
                "LRU cache size must be greater than 0".into(),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(CacheStrategy::Full.validate().is_ok());
        assert!(CacheStrategy::None.validate().is_ok());
        assert!(CacheStrategy::Lru(16).validate().is_ok());
        assert!(CacheStrategy::Lru(0).validate().is_err());
    }
}
