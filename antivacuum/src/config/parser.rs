//! INI parsing: maps section keys onto `ConfigFile` fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::{ConfigError, ConfigFile};
use crate::coord::{CoordError, WorldExtent, MAX_WORLD_HEIGHT};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigError> {
    let mut config = ConfigFile::default();

    // [world] section
    if let Some(section) = ini.section(Some("world")) {
        let min_y = parse_number(section, "world", "min_y", "must be an integer")?
            .unwrap_or(config.world.min_y());
        let max_y = parse_number(section, "world", "max_y", "must be an integer")?
            .unwrap_or(config.world.max_y());
        config.world = WorldExtent::new(min_y, max_y).map_err(|e| {
            let reason = match e {
                CoordError::ExtentTooTall { .. } => {
                    format!("must be at most {} above min_y", MAX_WORLD_HEIGHT)
                }
                _ => "must be greater than min_y".to_string(),
            };
            ConfigError::invalid("world", "max_y", &max_y.to_string(), &reason)
        })?;
    }

    // [scheduler] section
    if let Some(section) = ini.section(Some("scheduler")) {
        let s = &mut config.scheduler;
        let millis = "must be a non-negative integer (milliseconds)";
        if let Some(v) = parse_number(section, "scheduler", "settle_delay_ms", millis)? {
            s.settle_delay_ms = v;
        }
        if let Some(v) = parse_positive(section, "scheduler", "probe_concurrency")? {
            s.probe_concurrency = v;
        }
        if let Some(v) = parse_number::<u64>(section, "scheduler", "probe_timeout_ms", millis)? {
            if v == 0 {
                return Err(ConfigError::invalid(
                    "scheduler",
                    "probe_timeout_ms",
                    "0",
                    "must be greater than zero",
                ));
            }
            s.probe_timeout_ms = v;
        }
        if let Some(v) = parse_number(
            section,
            "scheduler",
            "resolve_retries",
            "must be a non-negative integer",
        )? {
            s.resolve_retries = v;
        }
        if let Some(v) = parse_number(section, "scheduler", "resolve_backoff_ms", millis)? {
            s.resolve_backoff_ms = v;
        }
    }

    // [gate] section
    if let Some(section) = ini.section(Some("gate")) {
        if let Some(v) = parse_positive(section, "gate", "max_concurrent_warms")? {
            config.gate.max_concurrent_warms = v;
        }
    }

    // [bindings] section
    if let Some(section) = ini.section(Some("bindings")) {
        if let Some(v) = parse_key(section, "standard_key")? {
            config.bindings.standard_key = v;
        }
        if let Some(v) = parse_key(section, "aggressive_key")? {
            config.bindings.aggressive_key = v;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("level") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.level = v.to_string();
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            config.logging.file = (!v.is_empty()).then(|| expand_tilde(v));
        }
    }

    Ok(config)
}

fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
    reason: &str,
) -> Result<Option<T>, ConfigError> {
    match section.get(key) {
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid(section_name, key, v, reason)),
        None => Ok(None),
    }
}

fn parse_positive(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<usize>, ConfigError> {
    let reason = "must be a positive integer";
    match parse_number::<usize>(section, section_name, key, reason)? {
        Some(0) => Err(ConfigError::invalid(section_name, key, "0", reason)),
        other => Ok(other),
    }
}

fn parse_key(section: &Properties, key: &str) -> Result<Option<String>, ConfigError> {
    match section.get(key) {
        Some(v) if v.trim().is_empty() => {
            Err(ConfigError::invalid("bindings", key, v, "must name a key"))
        }
        Some(v) => Ok(Some(v.trim().to_string())),
        None => Ok(None),
    }
}

/// Expand ~ to home directory in paths.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigError> {
        ConfigFile::parse(content)
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_world_extent() {
        let config = parse("[world]\nmin_y = 0\nmax_y = 128\n").unwrap();
        assert_eq!(config.world.min_y(), 0);
        assert_eq!(config.world.height(), 128);
    }

    #[test]
    fn test_partial_world_keeps_other_bound() {
        let config = parse("[world]\nmax_y = 256\n").unwrap();
        assert_eq!(config.world.min_y(), -64);
        assert_eq!(config.world.max_y(), 256);
    }

    #[test]
    fn test_inverted_world_rejected() {
        let err = parse("[world]\nmin_y = 10\nmax_y = 10\n").unwrap_err();
        assert!(err.to_string().contains("world.max_y"));
    }

    #[test]
    fn test_oversized_world_rejected() {
        let err = parse("[world]\nmin_y = -2147483648\nmax_y = 2147483647\n").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("world.max_y"));
        assert!(message.contains("at most 4096"));

        let config = parse("[world]\nmin_y = 0\nmax_y = 4096\n").unwrap();
        assert_eq!(config.world.height(), 4096);
    }

    #[test]
    fn test_invalid_number_names_key() {
        let err = parse("[scheduler]\nsettle_delay_ms = soon\n").unwrap_err();
        match err {
            ConfigError::InvalidValue {
                section,
                key,
                value,
                ..
            } => {
                assert_eq!(section, "scheduler");
                assert_eq!(key, "settle_delay_ms");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(parse("[gate]\nmax_concurrent_warms = 0\n").is_err());
        assert!(parse("[scheduler]\nprobe_concurrency = 0\n").is_err());
        assert!(parse("[scheduler]\nprobe_timeout_ms = 0\n").is_err());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = parse("[scheduler]\nwarp_factor = 9\n[mystery]\nkey = value\n").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_bindings() {
        let config = parse("[bindings]\nstandard_key = F5\n").unwrap();
        assert_eq!(config.bindings.standard_key, "F5");
        assert_eq!(config.bindings.aggressive_key, "F9");
        assert!(parse("[bindings]\naggressive_key =\n").is_err());
    }

    #[test]
    fn test_logging_section() {
        let config = parse("[logging]\nlevel = antivacuum=debug\nfile = /var/log/av.log\n").unwrap();
        assert_eq!(config.logging.level, "antivacuum=debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/var/log/av.log")));

        let config = parse("[logging]\nfile =\n").unwrap();
        assert!(config.logging.file.is_none());
    }
}
