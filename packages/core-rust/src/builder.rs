//! Payload construction: template copy plus sampled field variations.

use tracing::trace;

use crate::numeric::json_number;
use crate::random::{sample, RandomSource};
use crate::types::{FieldRule, Payload, Template};

/// Builds a fresh payload from `template`, applying `rules` in order.
///
/// Disabled rules and rules whose bounds do not coerce to finite numbers are
/// skipped, leaving the template value in place. Rules naming a key absent
/// from the template add that key. The returned payload shares nothing with
/// the template or with any previously built payload.
pub fn build(template: &Template, rules: &[FieldRule], rng: &mut dyn RandomSource) -> Payload {
    let mut payload = template.to_payload();

    for rule in rules.iter().filter(|r| r.enabled) {
        let Some((min, max)) = rule.bounds() else {
            trace!(key = %rule.key, min = %rule.min, max = %rule.max, "skipping rule with non-numeric bounds");
            continue;
        };
        let Some(value) = json_number(sample(rng, min, max)) else {
            trace!(key = %rule.key, min, max, "skipping rule whose sample is not finite");
            continue;
        };
        payload.insert(rule.key.clone(), value);
    }

    payload
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::random::{ConstantRandom, SeededRandom};

    fn template(value: Value) -> Template {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn no_rules_yields_equal_independent_copy() {
        let base = template(json!({ "temp": 20, "meta": { "unit": "C" }, "tags": ["a"] }));
        let mut rng = SeededRandom::new(1);
        let payload = build(&base, &[], &mut rng);

        assert_eq!(payload.fields(), base.fields());
        // Independent storage: the payload's nested object is not the template's.
        let payload_meta = payload.get("meta").unwrap() as *const Value;
        let template_meta = base.get("meta").unwrap() as *const Value;
        assert_ne!(payload_meta, template_meta);
    }

    #[test]
    fn enabled_rule_overwrites_field() {
        let base = template(json!({ "temp": 20 }));
        let rules = [FieldRule::ranged("temp", 10.0, 10.0)];
        let payload = build(&base, &rules, &mut SeededRandom::new(3));
        assert_eq!(payload.into_value(), json!({ "temp": 10 }));
    }

    #[test]
    fn disabled_rule_leaves_template_value() {
        let base = template(json!({ "temp": 20 }));
        let rules = [FieldRule::ranged("temp", 0.0, 5.0).disabled()];
        let payload = build(&base, &rules, &mut SeededRandom::new(3));
        assert_eq!(payload.get("temp"), Some(&json!(20)));
    }

    #[test]
    fn non_numeric_bounds_leave_template_value() {
        let base = template(json!({ "temp": 20, "hum": 50 }));
        let mut bad = FieldRule::ranged("temp", 0.0, 5.0);
        bad.min = json!("cold");
        let rules = [bad, FieldRule::ranged("hum", 60.0, 60.0)];
        let payload = build(&base, &rules, &mut SeededRandom::new(3));
        assert_eq!(payload.get("temp"), Some(&json!(20)));
        assert_eq!(payload.get("hum"), Some(&json!(60)));
    }

    #[test]
    fn unknown_key_is_added() {
        let base = template(json!({}));
        let rules = [FieldRule::ranged("pressure", 1.5, 1.5)];
        let payload = build(&base, &rules, &mut SeededRandom::new(3));
        assert_eq!(payload.into_value(), json!({ "pressure": 1.5 }));
    }

    #[test]
    fn later_rules_win_for_the_same_key() {
        let base = template(json!({ "temp": 20 }));
        let rules = [
            FieldRule::ranged("temp", 1.0, 1.0),
            FieldRule::ranged("temp", 2.0, 2.0),
        ];
        let payload = build(&base, &rules, &mut SeededRandom::new(3));
        assert_eq!(payload.get("temp"), Some(&json!(2)));
    }

    #[test]
    fn sampled_values_stay_in_range() {
        let base = template(json!({ "temp": 20 }));
        let rules = [FieldRule::ranged("temp", 15.0, 25.0)];
        let mut rng = SeededRandom::new(99);
        for _ in 0..200 {
            let payload = build(&base, &rules, &mut rng);
            let temp = payload.get("temp").and_then(Value::as_f64).unwrap();
            assert!((15.0..=25.0).contains(&temp));
        }
    }

    #[test]
    fn overflowing_range_is_skipped() {
        let base = template(json!({ "big": 1 }));
        let rules = [FieldRule::ranged("big", -f64::MAX, f64::MAX)];
        let payload = build(&base, &rules, &mut ConstantRandom(0.5));
        assert_eq!(payload.get("big"), Some(&json!(1)));
    }

    #[test]
    fn template_is_not_mutated() {
        let base = template(json!({ "temp": 20 }));
        let rules = [FieldRule::ranged("temp", 10.0, 10.0)];
        let _ = build(&base, &rules, &mut SeededRandom::new(3));
        assert_eq!(base.get("temp"), Some(&json!(20)));
    }
}
