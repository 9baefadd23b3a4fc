//! Pipeline settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`PipelineConfig::default()`]
//! 2. If a `--config` file is given, deep-merge its values over the defaults
//! 3. Apply `CREACUBE_*` environment variable overrides (highest priority)
//! 4. Validate the result with [`PipelineConfig::validate`]

use anyhow::{Context, Result};
use creacube::{DebouncePolicy, PipelineConfig};
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

const ENV_PREFIX: &str = "CREACUBE_";

pub fn load_pipeline_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let defaults = serde_json::to_value(PipelineConfig::default())?;

    let merged = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading pipeline settings");
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading settings {}", path.display()))?;
            let user: Value = serde_json::from_str(&content)
                .with_context(|| format!("parsing settings {}", path.display()))?;
            deep_merge(defaults, user)
        }
        None => defaults,
    };

    let mut config: PipelineConfig =
        serde_json::from_value(merged).context("invalid pipeline settings")?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate().context("invalid pipeline settings")?;
    Ok(config)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Applies `CREACUBE_*` overrides read through `lookup`.
pub fn apply_env_overrides(config: &mut PipelineConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = read_positive(&lookup, "X_TOLERANCE") {
        config.x_tolerance = v;
    }
    if let Some(v) = read_positive(&lookup, "Y_TOLERANCE") {
        config.y_tolerance = v;
    }
    if let Some(v) = read_positive(&lookup, "Z_TOLERANCE") {
        config.z_tolerance = v;
    }
    if let Some(v) = read::<u32>(&lookup, "MISSING_FRAME_THRESHOLD") {
        config.missing_frame_threshold = v;
    }
    if let Some(v) = read_positive(&lookup, "EVENT_TIME_DIVISOR") {
        config.event_time_divisor = v;
    }
    if let Some(v) = read_policy(&lookup, "DEBOUNCE_POLICY") {
        config.debounce_policy = v;
    }
}

fn env_value(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<(String, String)> {
    let key = format!("{ENV_PREFIX}{name}");
    let raw = lookup(&key)?;
    Some((key, raw.trim().to_string()))
}

fn read<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let (key, raw) = env_value(lookup, name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = %key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

fn read_positive(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<f64> {
    let value = read::<f64>(lookup, name)?;
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        warn!(name, value, "ignoring non-positive environment override");
        None
    }
}

fn read_policy(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<DebouncePolicy> {
    let (key, raw) = env_value(lookup, name)?;
    match serde_json::from_value(Value::String(raw.to_ascii_lowercase())) {
        Ok(policy) => Some(policy),
        Err(_) => {
            warn!(key = %key, value = %raw, "ignoring unknown debounce policy");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_simple_override() {
        let merged = deep_merge(
            serde_json::json!({"a": 1, "b": 2}),
            serde_json::json!({"a": 10}),
        );
        assert_eq!(merged["a"], 10);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_skips_nulls() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_replaces_non_objects() {
        let merged = deep_merge(serde_json::json!({"a": [1, 2]}), serde_json::json!({"a": [3]}));
        assert_eq!(merged["a"], serde_json::json!([3]));
    }

    // ── settings file ───────────────────────────────────────────────

    #[test]
    fn defaults_without_file() {
        let config = load_pipeline_config(None).unwrap();
        assert_eq!(config.x_tolerance, PipelineConfig::default().x_tolerance);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"z_tolerance": 35.0, "debounce_policy": "drop_to_absent", "x_tolerance": null}}"#)
            .unwrap();
        let config = load_pipeline_config(Some(file.path())).unwrap();
        assert_eq!(config.z_tolerance, 35.0);
        assert_eq!(config.debounce_policy, DebouncePolicy::DropToAbsent);
        assert_eq!(config.x_tolerance, 10.0);
    }

    #[test]
    fn unknown_setting_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"w_tolerance": 1.0}}"#).unwrap();
        assert!(load_pipeline_config(Some(file.path())).is_err());
    }

    #[test]
    fn out_of_range_file_values_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"event_time_divisor": 0.0, "z_tolerance": -5.0}}"#).unwrap();
        let err = load_pipeline_config(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("invalid setting"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_pipeline_config(Some(&dir.path().join("none.json"))).is_err());
    }

    // ── environment ─────────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut config = PipelineConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("CREACUBE_Y_TOLERANCE", "12.5"),
                ("CREACUBE_MISSING_FRAME_THRESHOLD", " 4 "),
                ("CREACUBE_DEBOUNCE_POLICY", "DROP_TO_ABSENT"),
            ]),
        );
        assert_eq!(config.y_tolerance, 12.5);
        assert_eq!(config.missing_frame_threshold, 4);
        assert_eq!(config.debounce_policy, DebouncePolicy::DropToAbsent);
    }

    #[test]
    fn bad_env_values_are_ignored() {
        let mut config = PipelineConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("CREACUBE_X_TOLERANCE", "wide"),
                ("CREACUBE_Z_TOLERANCE", "-5"),
                ("CREACUBE_EVENT_TIME_DIVISOR", "0"),
                ("CREACUBE_DEBOUNCE_POLICY", "sometimes"),
            ]),
        );
        assert_eq!(config, PipelineConfig::default());
    }
}
