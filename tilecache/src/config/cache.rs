//! Runtime options for the cache-fill engine.

use std::time::Duration;

use super::defaults::{DEFAULT_CACHE_FORMAT, DEFAULT_CACHE_MAX_AGE};

/// Options controlling how the engine uses its store.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tilecache::config::CacheConfig;
///
/// let config = CacheConfig::builder()
///     .use_only_cache(true)
///     .cache_max_age(Duration::from_secs(3600))
///     .build();
///
/// assert!(config.use_cache);
/// assert!(config.use_only_cache);
/// assert_eq!(config.cache_format, "image/png");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Master switch. When off the engine is a pure passthrough to the transport.
    pub use_cache: bool,
    /// Persist fetched and refreshed tiles.
    pub save_to_cache: bool,
    /// Never contact the transport; serve cached data or nothing.
    pub use_only_cache: bool,
    /// Target format for the codec: an image MIME type or `passthrough`.
    pub cache_format: String,
    /// Records older than this are refreshed on access.
    pub cache_max_age: Duration,
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            save_to_cache: true,
            use_only_cache: false,
            cache_format: DEFAULT_CACHE_FORMAT.to_string(),
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
        }
    }
}

/// Fluent builder for [`CacheConfig`].
#[derive(Debug, Clone, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn use_cache(mut self, enabled: bool) -> Self {
        self.config.use_cache = enabled;
        self
    }

    pub fn save_to_cache(mut self, enabled: bool) -> Self {
        self.config.save_to_cache = enabled;
        self
    }

    pub fn use_only_cache(mut self, enabled: bool) -> Self {
        self.config.use_only_cache = enabled;
        self
    }

    pub fn cache_format(mut self, format: impl Into<String>) -> Self {
        self.config.cache_format = format.into();
        self
    }

    pub fn cache_max_age(mut self, max_age: Duration) -> Self {
        self.config.cache_max_age = max_age;
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert!(config.use_cache);
        assert!(config.save_to_cache);
        assert!(!config.use_only_cache);
        assert_eq!(config.cache_format, "image/png");
        assert_eq!(config.cache_max_age, Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_builder_overrides() {
        let config = CacheConfig::builder()
            .use_cache(false)
            .save_to_cache(false)
            .cache_format("image/jpeg")
            .cache_max_age(Duration::from_millis(1000))
            .build();

        assert!(!config.use_cache);
        assert!(!config.save_to_cache);
        assert_eq!(config.cache_format, "image/jpeg");
        assert_eq!(config.cache_max_age, Duration::from_millis(1000));
    }
}
