//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::{ConfigFile, MountSettings};

/// Prefix of mount section names, e.g. `[mount.imagery]`.
const MOUNT_SECTION_PREFIX: &str = "mount.";

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [catalog] section
    if let Some(section) = ini.section(Some("catalog")) {
        if let Some(v) = section.get("api_url") {
            let v = v.trim().trim_end_matches('/');
            if !v.is_empty() {
                if !(v.starts_with("http://") || v.starts_with("https://")) {
                    return Err(invalid("catalog", "api_url", v, "must be an http(s) URL"));
                }
                config.catalog.api_url = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("publish") {
            config.catalog.publish = parse_bool(v);
            if config.catalog.publish && config.catalog.api_url.is_none() {
                return Err(invalid("catalog", "publish", v, "requires api_url to be set"));
            }
        }
        if let Some(v) = section.get("max_retries") {
            let parsed: u32 = parse_number("catalog", "max_retries", v, "must be a positive integer")?;
            if parsed == 0 {
                return Err(invalid("catalog", "max_retries", v, "must be at least 1"));
            }
            config.catalog.max_retries = parsed;
        }
        if let Some(v) = section.get("retry_delay_secs") {
            config.catalog.retry_delay_secs = parse_number(
                "catalog",
                "retry_delay_secs",
                v,
                "must be a non-negative integer (seconds)",
            )?;
        }
        if let Some(v) = section.get("default_license") {
            let v = v.trim();
            if !v.is_empty() {
                config.catalog.default_license = v.to_string();
            }
        }
    }

    // [raster] section
    if let Some(section) = ini.section(Some("raster")) {
        if let Some(v) = section.get("check_cog") {
            config.raster.check_cog = parse_bool(v);
        }
        if let Some(v) = section.get("log_cog_info") {
            config.raster.log_cog_info = parse_bool(v);
        }
        if let Some(v) = section.get("strict_cog") {
            config.raster.strict_cog = parse_bool(v);
        }
    }

    // [queue] section
    if let Some(section) = ini.section(Some("queue")) {
        if let Some(v) = section.get("url") {
            let v = v.trim();
            let schemes = ["redis://", "rediss://", "redis+unix://", "unix://"];
            if !schemes.iter().any(|s| v.starts_with(s)) {
                return Err(invalid(
                    "queue",
                    "url",
                    v,
                    "must start with redis://, rediss://, redis+unix:// or unix://",
                ));
            }
            config.queue.url = v.to_string();
        }
        if let Some(v) = section.get("input_list") {
            config.queue.input_list = non_empty("queue", "input_list", v)?;
        }
        if let Some(v) = section.get("output_list") {
            config.queue.output_list = non_empty("queue", "output_list", v)?;
        }
        if let Some(v) = section.get("publish") {
            config.queue.publish = parse_bool(v);
        }
        if let Some(v) = section.get("pop_timeout_secs") {
            let parsed: u64 = parse_number(
                "queue",
                "pop_timeout_secs",
                v,
                "must be a positive integer (seconds)",
            )?;
            // 0 would block forever and hide shutdown requests
            if parsed == 0 {
                return Err(invalid("queue", "pop_timeout_secs", v, "must be at least 1"));
            }
            config.queue.pop_timeout_secs = parsed;
        }
    }

    // [assets] section
    if let Some(section) = ini.section(Some("assets")) {
        if let Some(v) = section.get("download") {
            config.assets.download = parse_bool(v);
        }
        if let Some(v) = section.get("cleanup") {
            config.assets.cleanup = parse_bool(v);
        }
        if let Some(v) = section.get("http_timeout_secs") {
            config.assets.http_timeout_secs = parse_number(
                "assets",
                "http_timeout_secs",
                v,
                "must be a positive integer (seconds)",
            )?;
        }
    }

    // [mount.<name>] sections
    for (name, section) in ini.iter() {
        let Some(mount_name) = name.and_then(|n| n.strip_prefix(MOUNT_SECTION_PREFIX)) else {
            continue;
        };
        config.mounts.push(parse_mount(mount_name, section)?);
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn parse_mount(name: &str, section: &Properties) -> Result<MountSettings, ConfigFileError> {
    let section_name = format!("{}{}", MOUNT_SECTION_PREFIX, name);

    let url = section.get("url").map(str::trim).unwrap_or_default();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(invalid(&section_name, "url", url, "must be an http(s) URL prefix"));
    }

    let path = section.get("path").map(str::trim).unwrap_or_default();
    if path.is_empty() {
        return Err(invalid(&section_name, "path", path, "must name a local directory"));
    }

    Ok(MountSettings {
        name: name.to_string(),
        url: url.trim_end_matches('/').to_string(),
        path: expand_tilde(path),
    })
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn non_empty(section: &str, key: &str, value: &str) -> Result<String, ConfigFileError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(invalid(section, key, value, "must not be empty"));
    }
    Ok(v.to_string())
}

/// Parse a boolean value from config.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
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
