use super::values::{is_blank, is_empty_value, to_number, trim_float, ValueMap};
use crate::model::{FieldNode, Required};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Custom rule: receives the field value and every current value.
pub type CustomValidator = dyn Fn(Option<&JsonValue>, &ValueMap) -> Result<(), String> + Send + Sync;

/// Named custom validators referenced by `rules.validate` in a schema.
#[derive(Clone, Default)]
pub struct Validators {
    map: HashMap<String, Arc<CustomValidator>>,
}

impl Validators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Option<&JsonValue>, &ValueMap) -> Result<(), String> + Send + Sync + 'static,
    {
        self.map.insert(name.into(), Arc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&CustomValidator> {
        self.map.get(name).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }
}

impl fmt::Debug for Validators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.map.keys().collect();
        names.sort();
        f.debug_struct("Validators").field("names", &names).finish()
    }
}

/// First failing rule's message, checked in order: required, minLength,
/// maxLength, pattern, min, max, minItems, custom validator.
#[allow(clippy::neg_cmp_op_on_partial_ord)]
pub fn validate(
    field: &FieldNode,
    value: Option<&JsonValue>,
    values: &ValueMap,
    validators: &Validators,
) -> Option<String> {
    let rules = field.rules.as_ref()?;

    if let Some(msg) = rules.required.as_ref().and_then(Required::message) {
        if is_empty_value(value) {
            return Some(msg.to_string());
        }
    }

    if let Some(JsonValue::String(s)) = value {
        let len = s.chars().count();
        if let Some(lim) = &rules.min_length {
            if len < lim.value {
                return Some(lim.message_or(|| {
                    format!("Must be at least {} characters", lim.value)
                }));
            }
        }
        if let Some(lim) = &rules.max_length {
            if len > lim.value {
                return Some(lim.message_or(|| format!("Must be at most {} characters", lim.value)));
            }
        }
        if let Some(p) = &rules.pattern {
            if !p.value.is_match(s) {
                return Some(
                    p.message
                        .clone()
                        .unwrap_or_else(|| "Does not match required pattern".into()),
                );
            }
        }
    }

    // Empty values are the required rule's business; NaN fails both bounds.
    if !is_blank(value) {
        let n = to_number(value);
        if let Some(lim) = &rules.min {
            if !(n >= lim.value) {
                return Some(lim.message_or(|| format!("Must be >= {}", trim_float(lim.value))));
            }
        }
        if let Some(lim) = &rules.max {
            if !(n <= lim.value) {
                return Some(lim.message_or(|| format!("Must be <= {}", trim_float(lim.value))));
            }
        }
    }

    if let (Some(lim), Some(JsonValue::Array(items))) = (&rules.min_items, value) {
        if items.len() < lim.value {
            return Some(lim.message_or(|| format!("At least {} item(s) required", lim.value)));
        }
    }

    if let Some(name) = &rules.validate {
        if let Some(custom) = validators.get(name) {
            if let Err(msg) = custom(value, values) {
                return Some(msg);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FormSchema, Limit, Renderer, RuleSet};
    use serde_json::json;

    fn field_with(rules: RuleSet) -> FieldNode {
        FieldNode::new("f", "F", Renderer::Text).with_rules(rules)
    }

    fn check(field: &FieldNode, value: JsonValue) -> Option<String> {
        validate(field, Some(&value), &ValueMap::new(), &Validators::new())
    }

    #[test]
    fn no_rules_means_valid() {
        let f = FieldNode::new("f", "F", Renderer::Text);
        assert_eq!(check(&f, json!("")), None);
    }

    #[test]
    fn required_treats_false_as_empty_but_not_zero_or_empty_array() {
        let f = field_with(RuleSet {
            required: Some(Required::Message("needed".into())),
            ..Default::default()
        });
        assert_eq!(check(&f, json!("")), Some("needed".into()));
        assert_eq!(check(&f, json!(null)), Some("needed".into()));
        assert_eq!(check(&f, json!(false)), Some("needed".into()));
        assert_eq!(
            validate(&f, None, &ValueMap::new(), &Validators::new()),
            Some("needed".into())
        );
        assert_eq!(check(&f, json!(0)), None);
        assert_eq!(check(&f, json!([])), None);
    }

    #[test]
    fn required_runs_before_pattern() {
        let schema = FormSchema::from_yaml_str(
            r#"
fields:
  - id: email
    rules:
      required: Email is required
      pattern: { value: "^[^@]+@[^@]+$", message: Invalid email }
"#,
        )
        .unwrap();
        let f = schema.field("email").unwrap();
        assert_eq!(check(f, json!("")), Some("Email is required".into()));
        assert_eq!(check(f, json!("nope")), Some("Invalid email".into()));
        assert_eq!(check(f, json!("a@b")), None);
    }

    #[test]
    fn string_rules_ignore_non_strings() {
        let schema = FormSchema::from_yaml_str(
            r#"
fields:
  - id: f
    rules:
      minLength: { value: 3 }
      maxLength: { value: 4 }
      pattern: { value: "^x+$" }
"#,
        )
        .unwrap();
        let f = schema.field("f").unwrap();
        assert_eq!(check(f, json!(12)), None);
        assert_eq!(check(f, json!(["a"])), None);
        assert_eq!(check(f, json!("ab")), Some("Must be at least 3 characters".into()));
        assert_eq!(check(f, json!("xxxxx")), Some("Must be at most 4 characters".into()));
        assert_eq!(check(f, json!("xxy")), Some("Does not match required pattern".into()));
        assert_eq!(check(f, json!("xxx")), None);
    }

    #[test]
    fn length_counts_characters() {
        let f = field_with(RuleSet {
            max_length: Some(Limit::new(3, "long")),
            ..Default::default()
        });
        assert_eq!(check(&f, json!("äöü")), None);
    }

    #[test]
    fn numeric_bounds_coerce_and_fail_closed_on_nan() {
        let f = field_with(RuleSet {
            min: Some(Limit::new(1.0, "too small")),
            max: Some(Limit::new(10.0, "too big")),
            ..Default::default()
        });
        assert_eq!(check(&f, json!(0)), Some("too small".into()));
        assert_eq!(check(&f, json!("11")), Some("too big".into()));
        assert_eq!(check(&f, json!(5)), None);
        assert_eq!(check(&f, json!("5")), None);
        assert_eq!(check(&f, json!("five")), Some("too small".into()));
        // blank values are left to the required rule
        assert_eq!(check(&f, json!("")), None);
    }

    #[test]
    fn min_items_applies_to_arrays() {
        let f = field_with(RuleSet {
            min_items: Some(Limit {
                value: 1,
                message: None,
            }),
            ..Default::default()
        });
        assert_eq!(check(&f, json!([])), Some("At least 1 item(s) required".into()));
        assert_eq!(check(&f, json!(["a"])), None);
    }

    #[test]
    fn custom_validator_sees_all_values() {
        let validators = Validators::new().register("matches_password", |v, all| {
            if v == all.get("password") {
                Ok(())
            } else {
                Err("Passwords do not match".into())
            }
        });
        let f = field_with(RuleSet {
            validate: Some("matches_password".into()),
            ..Default::default()
        });
        let mut all = ValueMap::new();
        all.insert("password".into(), json!("s3cret"));
        assert_eq!(
            validate(&f, Some(&json!("other")), &all, &validators),
            Some("Passwords do not match".into())
        );
        assert_eq!(validate(&f, Some(&json!("s3cret")), &all, &validators), None);
    }

    #[test]
    fn unregistered_custom_validator_is_ignored() {
        let f = field_with(RuleSet {
            validate: Some("missing".into()),
            ..Default::default()
        });
        assert_eq!(check(&f, json!("x")), None);
    }
}
