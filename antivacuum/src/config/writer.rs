//! Serializes `ConfigFile` to the commented INI written to `config.ini`.

use super::file::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let log_file = config
        .logging
        .file
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    format!(
        r#"[world]
; Vertical extent of every region: cells with min_y <= y < max_y
min_y = {}
max_y = {}

[scheduler]
; Pause between aggressive passes on the target region (milliseconds)
settle_delay_ms = {}
; Probes in flight within one pass (1 keeps strict pattern order)
probe_concurrency = {}
; Upper bound on a single cell read (milliseconds)
probe_timeout_ms = {}
; Re-polls of a region that is still loading, and the initial backoff between them
resolve_retries = {}
resolve_backoff_ms = {}

[gate]
; Warms allowed to run at once; further triggers queue
max_concurrent_warms = {}

[bindings]
standard_key = {}
aggressive_key = {}

[logging]
; Filter directive (RUST_LOG overrides this)
level = {}
; Daily-rolling log file; leave empty to log to stderr only
file = {}
"#,
        config.world.min_y(),
        config.world.max_y(),
        config.scheduler.settle_delay_ms,
        config.scheduler.probe_concurrency,
        config.scheduler.probe_timeout_ms,
        config.scheduler.resolve_retries,
        config.scheduler.resolve_backoff_ms,
        config.gate.max_concurrent_warms,
        config.bindings.standard_key,
        config.bindings.aggressive_key,
        config.logging.level,
        log_file,
    )
}
