use super::values::ValueMap;
use crate::model::{FieldNode, VisibilityOp, VisibilityRule};
use serde_json::Value as JsonValue;

/// A field is visible when every rule in its `visibleWhen` holds.
pub fn is_visible(field: &FieldNode, values: &ValueMap) -> bool {
    match &field.visible_when {
        None => true,
        Some(cond) => cond.rules().iter().all(|rule| rule_holds(rule, values)),
    }
}

pub fn rule_holds(rule: &VisibilityRule, values: &ValueMap) -> bool {
    let current = values.get(&rule.field);
    match rule.op {
        VisibilityOp::Equals => equals(current, &rule.value),
        VisibilityOp::NotEquals => !equals(current, &rule.value),
        VisibilityOp::In => contains(&rule.value, current),
        VisibilityOp::NotIn => !contains(&rule.value, current),
        // Unknown operators keep the field visible.
        VisibilityOp::Unknown => true,
    }
}

fn equals(current: Option<&JsonValue>, expected: &JsonValue) -> bool {
    current == Some(expected)
}

fn contains(candidates: &JsonValue, current: Option<&JsonValue>) -> bool {
    match (candidates, current) {
        (JsonValue::Array(items), Some(v)) => items.contains(v),
        _ => false,
    }
}

/// Whether the visibility of `field` reads the value of `field_id` directly.
pub fn depends_on(field: &FieldNode, field_id: &str) -> bool {
    field
        .visible_when
        .as_ref()
        .map(|cond| cond.rules().iter().any(|r| r.field == field_id))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Renderer, VisibleWhen};
    use serde_json::json;

    fn values(pairs: &[(&str, JsonValue)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn no_condition_is_always_visible() {
        let f = FieldNode::new("a", "A", Renderer::Text);
        assert!(is_visible(&f, &ValueMap::new()));
    }

    #[test]
    fn equals_is_strict() {
        let f = FieldNode::new("b", "B", Renderer::Text).visible_when(VisibilityRule::equals("a", 1));
        assert!(is_visible(&f, &values(&[("a", json!(1))])));
        assert!(!is_visible(&f, &values(&[("a", json!("1"))])));
        assert!(!is_visible(&f, &values(&[("a", json!(true))])));
        assert!(!is_visible(&f, &ValueMap::new()));
    }

    #[test]
    fn in_requires_array_membership() {
        let f = FieldNode::new("b", "B", Renderer::Text)
            .visible_when(VisibilityRule::one_of("a", ["x", "y"]));
        assert!(is_visible(&f, &values(&[("a", json!("y"))])));
        assert!(!is_visible(&f, &values(&[("a", json!("z"))])));

        let scalar = VisibilityRule {
            field: "a".into(),
            op: VisibilityOp::In,
            value: json!("x"),
        };
        assert!(!rule_holds(&scalar, &values(&[("a", json!("x"))])));
    }

    #[test]
    fn negated_operators() {
        let vals = values(&[("a", json!("x"))]);
        let ne = VisibilityRule {
            field: "a".into(),
            op: VisibilityOp::NotEquals,
            value: json!("x"),
        };
        let nin = VisibilityRule {
            field: "a".into(),
            op: VisibilityOp::NotIn,
            value: json!(["y"]),
        };
        assert!(!rule_holds(&ne, &vals));
        assert!(rule_holds(&nin, &vals));
    }

    #[test]
    fn rule_lists_are_conjunctive() {
        let mut f = FieldNode::new("c", "C", Renderer::Text);
        f.visible_when = Some(VisibleWhen::All(vec![
            VisibilityRule::equals("a", "x"),
            VisibilityRule::equals("b", true),
        ]));
        assert!(is_visible(&f, &values(&[("a", json!("x")), ("b", json!(true))])));
        assert!(!is_visible(&f, &values(&[("a", json!("x")), ("b", json!(false))])));
    }

    #[test]
    fn unknown_operator_fails_open() {
        let rule = VisibilityRule {
            field: "a".into(),
            op: VisibilityOp::Unknown,
            value: json!("anything"),
        };
        assert!(rule_holds(&rule, &ValueMap::new()));
    }

    #[test]
    fn dependency_lookup() {
        let f = FieldNode::new("b", "B", Renderer::Text).visible_when(VisibilityRule::equals("a", 1));
        assert!(depends_on(&f, "a"));
        assert!(!depends_on(&f, "c"));
    }
}
