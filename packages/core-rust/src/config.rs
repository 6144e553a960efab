//! Simulator settings as stored by the flow editor, and their parsed form.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::interval::{
    coerce_ms, IntervalPolicy, DEFAULT_FIXED_MS, DEFAULT_MAX_MS, DEFAULT_MIN_MS, MODE_FIXED,
};
use crate::types::{FieldRule, Template};

/// Errors that prevent a simulator from starting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid template JSON: {0}")]
    InvalidTemplate(#[source] serde_json::Error),
    #[error("template must be a JSON object, got {kind}")]
    TemplateNotObject { kind: &'static str },
    #[error("invalid fields configuration: {0}")]
    InvalidFields(#[source] serde_json::Error),
    #[error("intervalMin ({min_ms}ms) exceeds intervalMax ({max_ms}ms)")]
    IntervalRange { min_ms: u64, max_ms: u64 },
    #[error("{option} must not be negative, got {value}")]
    NegativeDuration { option: &'static str, value: i64 },
}

/// Raw node settings, exactly as a flow editor persists them.
///
/// `template` and `fields` are JSON documents embedded as strings; numeric
/// options may arrive as numbers or strings. Every option is optional, and
/// an option present as `null` behaves as if it were missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulatorSettings {
    #[serde(deserialize_with = "de_text")]
    pub name: String,
    #[serde(deserialize_with = "de_text")]
    pub topic: String,
    #[serde(deserialize_with = "de_template")]
    pub template: String,
    #[serde(deserialize_with = "de_fields")]
    pub fields: String,
    #[serde(deserialize_with = "de_mode")]
    pub interval_mode: String,
    pub interval_fixed: Value,
    pub interval_min: Value,
    pub interval_max: Value,
    pub startup_delay: Value,
    pub debug_active: Value,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            topic: String::new(),
            template: "{}".to_string(),
            fields: "[]".to_string(),
            interval_mode: MODE_FIXED.to_string(),
            interval_fixed: Value::from(DEFAULT_FIXED_MS),
            interval_min: Value::from(DEFAULT_MIN_MS),
            interval_max: Value::from(DEFAULT_MAX_MS),
            startup_delay: Value::from(0),
            debug_active: Value::Bool(false),
        }
    }
}

/// Reads a string option, mapping `null` to `default` and rendering other
/// scalars (numbers, booleans) as their JSON text.
fn string_or<'de, D: Deserializer<'de>>(
    deserializer: D,
    default: &str,
) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => default.to_string(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    string_or(deserializer, "")
}

fn de_template<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    string_or(deserializer, "{}")
}

fn de_fields<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    string_or(deserializer, "[]")
}

fn de_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    string_or(deserializer, MODE_FIXED)
}

/// Validated, immutable simulator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Display name, used when mirroring to the debug channel.
    pub name: String,
    /// Topic attached to every emitted message.
    pub topic: String,
    /// Base payload shape.
    pub template: Template,
    /// Field variation rules, applied in order.
    pub rules: Vec<FieldRule>,
    /// Delay policy between scheduled emissions.
    pub interval: IntervalPolicy,
    /// One-shot delay before the first scheduled tick.
    pub startup_delay: Duration,
    /// Initial state of debug mirroring.
    pub debug_active: bool,
}

impl SimulatorConfig {
    /// Configuration with the given template and rules and default scheduling.
    #[must_use]
    pub fn new(template: Template, rules: Vec<FieldRule>) -> Self {
        Self {
            name: String::new(),
            topic: String::new(),
            template,
            rules,
            interval: IntervalPolicy::default(),
            startup_delay: Duration::ZERO,
            debug_active: false,
        }
    }

    /// Parses and validates raw settings.
    ///
    /// Empty `template` / `fields` strings are treated as `{}` / `[]`.
    /// `debugActive` is enabled only by a literal `true`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the template or field rules are not
    /// valid JSON, the template is not an object, or the scheduling options
    /// fail validation.
    pub fn from_settings(settings: &SimulatorSettings) -> Result<Self, ConfigError> {
        let template = parse_template(&settings.template)?;
        let rules = parse_rules(&settings.fields)?;
        let interval = IntervalPolicy::resolve(
            &settings.interval_mode,
            &settings.interval_fixed,
            &settings.interval_min,
            &settings.interval_max,
        )?;
        let startup_delay = coerce_ms("startupDelay", &settings.startup_delay, 0)?;

        Ok(Self {
            name: settings.name.clone(),
            topic: settings.topic.clone(),
            template,
            rules,
            interval,
            startup_delay: Duration::from_millis(startup_delay),
            debug_active: settings.debug_active == Value::Bool(true),
        })
    }
}

/// Parses the template document; it must be a JSON object.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidTemplate`] or [`ConfigError::TemplateNotObject`].
pub fn parse_template(raw: &str) -> Result<Template, ConfigError> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    match serde_json::from_str::<Value>(raw).map_err(ConfigError::InvalidTemplate)? {
        Value::Object(fields) => Ok(Template::new(fields)),
        other => Err(ConfigError::TemplateNotObject {
            kind: json_kind(&other),
        }),
    }
}

/// Parses the field rules document; it must be a JSON array.
///
/// Entries that are not rule objects are dropped; the remaining rules keep
/// their order.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidFields`] when the document is not valid JSON
/// or not an array.
pub fn parse_rules(raw: &str) -> Result<Vec<FieldRule>, ConfigError> {
    let raw = if raw.trim().is_empty() { "[]" } else { raw };
    let entries: Vec<Value> = serde_json::from_str(raw).map_err(ConfigError::InvalidFields)?;

    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match FieldRule::deserialize(&entry) {
            Ok(rule) => Some(rule),
            Err(err) => {
                trace!(index, %entry, error = %err, "skipping malformed field rule");
                None
            }
        })
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
