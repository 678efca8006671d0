//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;

use ini::{Ini, Properties};

use super::duration::parse_duration;
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;
use crate::address::UrlTemplateSource;
use crate::codec::codec_for_format;
use crate::coord::MAX_ZOOM;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        let s = Section::new("cache", section);

        if let Some(v) = s.get_bool("enabled")? {
            config.cache.enabled = v;
        }
        if let Some(v) = s.get_bool("save")? {
            config.cache.save = v;
        }
        if let Some(v) = s.get_bool("only_cache")? {
            config.cache.only_cache = v;
        }
        if let Some(v) = s.get("format") {
            codec_for_format(v).map_err(|e| s.invalid("format", v, e.to_string()))?;
            config.cache.format = v.to_string();
        }
        if let Some(v) = s.get("max_age") {
            config.cache.max_age = parse_duration(v)
                .map_err(|_| s.invalid("max_age", v, "expected format like '24h', '30m' or '90s'"))?;
        }
        if let Some(v) = s.get("backend") {
            config.cache.backend = v
                .parse()
                .map_err(|_| s.invalid("backend", v, "must be 'disk' or 'memory'"))?;
        }
        if let Some(v) = s.get("directory") {
            config.cache.directory = expand_tilde(v);
        }
        if let Some(v) = s.get("memory_size") {
            config.cache.memory_size = parse_size(v).map_err(|_| {
                s.invalid("memory_size", v, "expected format like '256MB', '1GB' or '0'")
            })?;
        }
    }

    // [source] section
    if let Some(section) = ini.section(Some("source")) {
        let s = Section::new("source", section);

        if let Some(v) = s.get("url") {
            UrlTemplateSource::new(v).map_err(|e| s.invalid("url", v, e.to_string()))?;
            config.source.url = v.to_string();
        }
        if let Some(v) = s.get("subdomains") {
            let subdomains: Vec<String> = v
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from)
                .collect();
            if subdomains.is_empty() {
                return Err(s.invalid("subdomains", v, "must list at least one subdomain"));
            }
            config.source.subdomains = subdomains;
        }
        if let Some(v) = s.get("timeout") {
            config.source.timeout = v
                .parse()
                .ok()
                .filter(|t| *t > 0)
                .ok_or_else(|| s.invalid("timeout", v, "must be a positive integer (seconds)"))?;
        }
        if let Some(v) = s.get("min_zoom") {
            config.source.min_zoom = s.get_zoom("min_zoom", v)?;
        }
        if let Some(v) = s.get("max_zoom") {
            config.source.max_zoom = s.get_zoom("max_zoom", v)?;
        }
        if config.source.min_zoom > config.source.max_zoom {
            return Err(s.invalid(
                "min_zoom",
                &config.source.min_zoom.to_string(),
                format!("must not exceed max_zoom ({})", config.source.max_zoom),
            ));
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        let s = Section::new("logging", section);

        if let Some(v) = s.get("directory") {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = s.get("file") {
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

/// One INI section with error context attached.
struct Section<'a> {
    name: &'static str,
    props: &'a Properties,
}

impl<'a> Section<'a> {
    fn new(name: &'static str, props: &'a Properties) -> Self {
        Self { name, props }
    }

    /// Trimmed, non-empty value of `key`.
    fn get(&self, key: &str) -> Option<&'a str> {
        self.props
            .get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigFileError> {
        self.get(key)
            .map(|v| parse_bool(v).ok_or_else(|| self.invalid(key, v, "must be true or false")))
            .transpose()
    }

    fn get_zoom(&self, key: &str, v: &str) -> Result<u8, ConfigFileError> {
        v.parse::<u8>()
            .ok()
            .filter(|z| *z <= MAX_ZOOM)
            .ok_or_else(|| self.invalid(key, v, format!("must be between 0 and {}", MAX_ZOOM)))
    }

    fn invalid(&self, key: &str, value: &str, reason: impl Into<String>) -> ConfigFileError {
        ConfigFileError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a boolean config value.
pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
