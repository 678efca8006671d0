//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::duration::format_duration;
use super::settings::ConfigFile;
use super::size::format_size;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[cache]
; Master switch. When false every request goes straight to the tile server.
enabled = {enabled}
; Store fetched and refreshed tiles.
save = {save}
; Offline mode: never contact the tile server, serve cached tiles or nothing.
only_cache = {only_cache}
; Format tiles are stored in: an image MIME type (image/png, image/jpeg,
; image/webp, ...) or "passthrough" to keep the server's bytes unchanged.
format = {format}
; Tiles older than this are refreshed on access (stale copies are still served
; if the refresh fails). Supports ms, s, m, h, d suffixes (e.g., 30m, 24h, 7d).
max_age = {max_age}
; Storage backend: disk (persistent) or memory (lost on exit)
backend = {backend}
; Directory for the disk backend.
directory = {directory}
; In-memory front cache for the disk backend (0 disables it).
; Supports: KB, MB, GB suffixes (e.g., 64MB, 1GB)
memory_size = {memory_size}

[source]
; Tile URL template. Placeholders: {{z}} {{x}} {{y}} {{-y}} (TMS row) {{s}} (subdomain)
url = {url}
; Comma-separated values substituted for {{s}}
subdomains = {subdomains}
; HTTP timeout in seconds
timeout = {timeout}
; Zoom levels the server provides; seeding skips levels outside this range
min_zoom = {min_zoom}
max_zoom = {max_zoom}

[logging]
; Directory for log files
directory = {log_directory}
; Log file name (truncated at startup)
file = {log_file}
"#,
        enabled = config.cache.enabled,
        save = config.cache.save,
        only_cache = config.cache.only_cache,
        format = config.cache.format,
        max_age = format_duration(config.cache.max_age),
        backend = config.cache.backend,
        directory = path_to_string(&config.cache.directory),
        memory_size = format_size(config.cache.memory_size),
        url = config.source.url,
        subdomains = config.source.subdomains.join(","),
        timeout = config.source.timeout,
        min_zoom = config.source.min_zoom,
        max_zoom = config.source.max_zoom,
        log_directory = path_to_string(&config.logging.directory),
        log_file = config.logging.file,
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
