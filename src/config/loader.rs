//! Configuration loading and environment parsing.

use super::validation::validate_config;
use super::Config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "CADENCE__";
const CONFIG_JSON_VAR: &str = "CADENCE_CONFIG_JSON";
const CONFIG_STDIN_VAR: &str = "CADENCE_CONFIG_STDIN";
const CONFIG_PATH_VAR: &str = "CADENCE_CONFIG_PATH";

/// Load configuration, merging sources from lowest to highest precedence:
/// compiled defaults, `config.json` in the working directory, the file named
/// by `CADENCE_CONFIG_PATH`, stdin when `CADENCE_CONFIG_STDIN` is truthy, and
/// inline JSON from `CADENCE_CONFIG_JSON`.
///
/// Individual fields are then overridden by `CADENCE__SECTION__KEY=value`
/// variables. Read and parse errors are reported on stderr and the offending
/// source is skipped. Validation problems are reported but not propagated;
/// callers that must fail hard call [`validate_config`] themselves.
#[must_use]
pub fn load() -> Config {
    let defaults = Config::default();
    let mut merged = serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(Map::new()));

    for layer in file_and_inline_layers() {
        merge_values(&mut merged, layer);
    }
    apply_env_overrides(&mut merged, std::env::vars());

    let config = match serde_json::from_value::<Config>(merged) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to deserialize config; using defaults: {e}");
            defaults
        }
    };

    if let Err(e) = validate_config(&config) {
        eprintln!("Configuration validation error: {e}");
    }

    config
}

/// Sources ordered lowest precedence first.
fn file_and_inline_layers() -> Vec<Value> {
    use std::env;
    use std::io::Read;

    let mut layers = Vec::new();

    layers.extend(read_file_source(Path::new("config.json")));

    if let Ok(path) = env::var(CONFIG_PATH_VAR) {
        layers.extend(read_file_source(&PathBuf::from(path)));
    }

    if env::var(CONFIG_STDIN_VAR).is_ok_and(|val| env_var_truthy(&val)) {
        let mut buf = String::new();
        match std::io::stdin().read_to_string(&mut buf) {
            Ok(_) => layers.extend(parse_json_document(&buf, "stdin")),
            Err(e) => eprintln!("Failed to read config from stdin: {e}"),
        }
    }

    if let Ok(json) = env::var(CONFIG_JSON_VAR) {
        layers.extend(parse_json_document(&json, CONFIG_JSON_VAR));
    }

    layers
}

fn parse_json_document(raw: &str, label: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }

    serde_json::from_str(raw)
        .map_err(|err| eprintln!("Failed to parse config from {label}: {err}"))
        .ok()
}

fn read_file_source(path: &Path) -> Option<Value> {
    if path.as_os_str().is_empty() || !path.exists() {
        return None;
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => parse_json_document(&contents, &format!("file {}", path.display())),
        Err(err) => {
            eprintln!("Failed to read config from {}: {}", path.display(), err);
            None
        }
    }
}

/// Deep-merge `source` into `target`; objects merge key by key, anything
/// else replaces.
pub(crate) fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target_slot, source_value) => *target_slot = source_value,
    }
}

pub(crate) fn apply_env_overrides<I>(root: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, raw_value) in vars {
        let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };

        let segments: Vec<String> = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        if segments.is_empty() {
            continue;
        }
        set_nested_value(root, &segments, parse_env_value(&raw_value));
    }
}

fn set_nested_value(target: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        let entry = map.entry(head.clone()).or_insert(Value::Null);
        set_nested_value(entry, rest, value);
    }
}

fn env_var_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn parse_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.contains(',') && !trimmed.starts_with('[') && !trimmed.starts_with('{') {
        return Value::Array(
            trimmed
                .split(',')
                .map(|segment| parse_scalar(segment.trim()))
                .collect(),
        );
    }

    parse_scalar(trimmed)
}

fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }

    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
