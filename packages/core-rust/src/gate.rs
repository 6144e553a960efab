//! Change gating: decide whether a freshly built payload is worth emitting.

use serde_json::Value;

use crate::numeric::values_equal;
use crate::types::{FieldRule, Payload};

/// Returns true when `next` should be emitted given the last emitted payload.
///
/// With no enabled trigger rules every payload is emitted. Otherwise at
/// least one trigger field must differ from `last`. Numbers compare by
/// value, nested values structurally; a key absent from both payloads counts
/// as unchanged.
#[must_use]
pub fn should_emit(next: &Payload, last: &Payload, rules: &[FieldRule]) -> bool {
    let mut triggers = rules.iter().filter(|r| r.is_trigger()).peekable();
    if triggers.peek().is_none() {
        return true;
    }
    triggers.any(|rule| field_changed(next.get(&rule.key), last.get(&rule.key)))
}

fn field_changed(next: Option<&Value>, last: Option<&Value>) -> bool {
    match (next, last) {
        (Some(a), Some(b)) => !values_equal(a, b),
        (None, None) => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::Template;

    fn payload(value: serde_json::Value) -> Payload {
        let template: Template = serde_json::from_value(value).unwrap();
        template.to_payload()
    }

    #[test]
    fn no_trigger_rules_always_emits() {
        let same = payload(json!({ "temp": 20 }));
        assert!(should_emit(&same, &same, &[]));

        let rules = [FieldRule::ranged("temp", 0.0, 1.0)];
        assert!(should_emit(&same, &same, &rules));
    }

    #[test]
    fn disabled_trigger_rules_do_not_gate() {
        let same = payload(json!({ "temp": 20 }));
        let rules = [FieldRule::ranged("temp", 0.0, 1.0).triggering().disabled()];
        assert!(should_emit(&same, &same, &rules));
    }

    #[test]
    fn unchanged_trigger_fields_suppress() {
        let last = payload(json!({ "temp": 10, "hum": 40 }));
        let next = payload(json!({ "temp": 10.0, "hum": 55 }));
        let rules = [
            FieldRule::ranged("temp", 10.0, 10.0).triggering(),
            FieldRule::ranged("hum", 0.0, 100.0),
        ];
        assert!(!should_emit(&next, &last, &rules));
    }

    #[test]
    fn any_changed_trigger_field_emits() {
        let last = payload(json!({ "temp": 10, "hum": 40 }));
        let next = payload(json!({ "temp": 10, "hum": 41 }));
        let rules = [
            FieldRule::ranged("temp", 10.0, 10.0).triggering(),
            FieldRule::ranged("hum", 0.0, 100.0).triggering(),
        ];
        assert!(should_emit(&next, &last, &rules));
    }

    #[test]
    fn missing_on_one_side_counts_as_change() {
        let last = payload(json!({}));
        let next = payload(json!({ "temp": 10 }));
        let rules = [FieldRule::ranged("temp", 10.0, 10.0).triggering()];
        assert!(should_emit(&next, &last, &rules));
        assert!(should_emit(&last, &next, &rules));
    }

    #[test]
    fn missing_on_both_sides_is_unchanged() {
        let empty = payload(json!({}));
        let rules = [FieldRule::ranged("temp", 10.0, 10.0).triggering()];
        assert!(!should_emit(&empty, &empty, &rules));
    }

    #[test]
    fn non_numeric_values_compare_by_value() {
        let last = payload(json!({ "state": "on", "cfg": { "a": 1 } }));
        let same = payload(json!({ "state": "on", "cfg": { "a": 1 } }));
        let changed = payload(json!({ "state": "off", "cfg": { "a": 1 } }));
        let rules = [
            FieldRule::ranged("state", 0.0, 0.0).triggering(),
            FieldRule::ranged("cfg", 0.0, 0.0).triggering(),
        ];
        assert!(!should_emit(&same, &last, &rules));
        assert!(should_emit(&changed, &last, &rules));
    }
}
