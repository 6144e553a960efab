use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::numeric::{parse_float, truthy};

/// Static base object every payload is derived from.
///
/// Parsed once from configuration and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(Map<String, Value>);

impl Template {
    /// Wraps an already parsed JSON object.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Read-only view of the template fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns the template value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Deep copy of the template as a payload with no variations applied.
    #[must_use]
    pub fn to_payload(&self) -> Payload {
        Payload(self.0.clone())
    }
}

/// Declarative instruction to randomize one template field.
///
/// Bounds are kept as the raw JSON the editor produced and coerced on each
/// build, so a rule with unparsable bounds is skipped rather than rejected.
/// `enabled` and `triggerOnChange` accept any JSON value and use truthiness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    /// Payload key the sampled value is written to.
    #[serde(default, deserialize_with = "de_key")]
    pub key: String,
    /// Disabled rules are ignored entirely.
    #[serde(default, deserialize_with = "de_truthy")]
    pub enabled: bool,
    /// Lower bound, number or numeric string.
    #[serde(default)]
    pub min: Value,
    /// Upper bound, number or numeric string.
    #[serde(default)]
    pub max: Value,
    /// Whether a change of this field is required for emission.
    #[serde(default, deserialize_with = "de_truthy")]
    pub trigger_on_change: bool,
}

impl FieldRule {
    /// Enabled, non-triggering rule sampling `key` from `[min, max]`.
    #[must_use]
    pub fn ranged(key: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            key: key.into(),
            enabled: true,
            min: Value::from(min),
            max: Value::from(max),
            trigger_on_change: false,
        }
    }

    /// Marks the rule as a trigger field.
    #[must_use]
    pub fn triggering(mut self) -> Self {
        self.trigger_on_change = true;
        self
    }

    /// Marks the rule as disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Coerced `(min, max)`, or `None` when either bound is not a finite number.
    #[must_use]
    pub fn bounds(&self) -> Option<(f64, f64)> {
        Some((parse_float(&self.min)?, parse_float(&self.max)?))
    }

    /// True when this rule gates emission.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        self.enabled && self.trigger_on_change
    }
}

fn de_truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(truthy(&value))
}

fn de_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// One generated payload: the template with zero or more fields overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub(crate) fn insert(&mut self, key: String, value: Value) {
        self.0.insert(key, value);
    }

    /// Returns the value stored under `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Read-only view of the payload fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts the payload into a plain JSON object value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Message handed to the downstream consumer on every emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Configured topic, empty when unset.
    pub topic: String,
    /// The emitted payload.
    pub payload: Payload,
}

/// Copy of an emission published to the debug side channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugMessage {
    /// Identifier of the emitting node.
    pub id: String,
    /// Display name of the emitting node.
    pub name: String,
    /// Topic of the mirrored message.
    pub topic: String,
    /// The mirrored message itself.
    pub msg: OutboundMessage,
}
