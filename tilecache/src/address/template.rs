//! URL template addressing (`{z}/{x}/{y}` slippy-map servers).
//!
//! Supported placeholders:
//!
//! - `{z}` zoom level
//! - `{x}` column
//! - `{y}` row counted from the north edge
//! - `{-y}` row counted from the south edge (TMS servers)
//! - `{s}` subdomain, picked as `(x + y) % subdomains.len()` so adjacent
//!   tiles spread across servers

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::TileAddressSource;
use crate::coord::{TileCoord, MAX_ZOOM, MIN_ZOOM};

/// Errors in a URL template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Template is missing required placeholder {{{0}}}")]
    MissingPlaceholder(&'static str),

    #[error("Template contains unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    #[error("Template uses {{s}} but no subdomains are configured")]
    NoSubdomains,

    #[error("Invalid zoom range {min}..={max}")]
    InvalidZoomRange { min: u8, max: u8 },
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(-?[a-z]+)\}").expect("placeholder regex is valid"))
}

/// Addresses tiles by substituting coordinates into a URL template.
#[derive(Debug, Clone)]
pub struct UrlTemplateSource {
    template: String,
    subdomains: Vec<String>,
    min_zoom: u8,
    max_zoom: u8,
}

impl UrlTemplateSource {
    /// Creates a source from a template, validating its placeholders.
    ///
    /// Subdomains default to `a`, `b`, `c`.
    pub fn new(template: impl Into<String>) -> Result<Self, TemplateError> {
        let template = template.into();

        let mut has_x = false;
        let mut has_y = false;
        let mut has_z = false;
        for capture in placeholder_regex().captures_iter(&template) {
            match &capture[1] {
                "x" => has_x = true,
                "y" | "-y" => has_y = true,
                "z" => has_z = true,
                "s" => {}
                other => return Err(TemplateError::UnknownPlaceholder(other.to_string())),
            }
        }
        if !has_z {
            return Err(TemplateError::MissingPlaceholder("z"));
        }
        if !has_x {
            return Err(TemplateError::MissingPlaceholder("x"));
        }
        if !has_y {
            return Err(TemplateError::MissingPlaceholder("y"));
        }

        Ok(Self {
            template,
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            min_zoom: MIN_ZOOM,
            max_zoom: 19,
        })
    }

    /// Replaces the subdomain list.
    pub fn with_subdomains<I, S>(mut self, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = subdomains.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts the zoom levels this source serves.
    pub fn with_zoom_range(mut self, min: u8, max: u8) -> Result<Self, TemplateError> {
        if min > max || max > MAX_ZOOM {
            return Err(TemplateError::InvalidZoomRange { min, max });
        }
        self.min_zoom = min;
        self.max_zoom = max;
        Ok(self)
    }

    /// Checks that `{s}` has something to substitute.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.template.contains("{s}") && self.subdomains.is_empty() {
            return Err(TemplateError::NoSubdomains);
        }
        Ok(())
    }

    /// The raw template string.
    pub fn template(&self) -> &str {
        &self.template
    }

    fn subdomain(&self, tile: &TileCoord) -> &str {
        if self.subdomains.is_empty() {
            return "";
        }
        let index = (tile.col as u64 + tile.row as u64) % self.subdomains.len() as u64;
        &self.subdomains[index as usize]
    }
}

impl TileAddressSource for UrlTemplateSource {
    fn address(&self, tile: &TileCoord) -> String {
        placeholder_regex()
            .replace_all(&self.template, |caps: &regex::Captures<'_>| {
                match &caps[1] {
                    "z" => tile.zoom.to_string(),
                    "x" => tile.col.to_string(),
                    "y" => tile.row.to_string(),
                    "-y" => tile.tms_row().to_string(),
                    "s" => self.subdomain(tile).to_string(),
                    // Rejected in new()
                    _ => String::new(),
                }
            })
            .into_owned()
    }

    fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }
}
