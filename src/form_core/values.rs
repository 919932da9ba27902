use crate::model::{FieldNode, Renderer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Current form values keyed by field id. A missing key is an unset value.
pub type ValueMap = BTreeMap<String, JsonValue>;
/// Per-field error messages keyed by field id.
pub type ErrorMap = BTreeMap<String, String>;

/// Unset, null, empty string and `false` count as empty. `0` and `[]` do not.
pub fn is_empty_value(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) | Some(JsonValue::Bool(false)) => true,
        Some(JsonValue::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

pub fn is_blank(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

pub fn truthy(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::Number(n)) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Some(JsonValue::String(s)) => !s.is_empty(),
        Some(JsonValue::Array(_)) | Some(JsonValue::Object(_)) => true,
    }
}

/// Numeric cast of a scalar value; anything without a numeric reading is NaN.
pub fn to_number(value: Option<&JsonValue>) -> f64 {
    match value {
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(JsonValue::String(s)) => {
            let t = s.trim();
            if t.is_empty() {
                0.0
            } else {
                t.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Some(JsonValue::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(JsonValue::Null) => 0.0,
        None | Some(JsonValue::Array(_)) | Some(JsonValue::Object(_)) => f64::NAN,
    }
}

/// JSON number for `v`; integral values become integers so they compare equal
/// to integer literals from a schema.
pub fn number_value(v: f64) -> JsonValue {
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        JsonValue::from(v as i64)
    } else {
        serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(String::new()))
    }
}

pub fn parse_number(text: &str) -> JsonValue {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => number_value(v),
        _ => JsonValue::String(String::new()),
    }
}

pub fn trim_float(v: f64) -> String {
    let mut s = format!("{v:.6}");
    while s.contains('.') && s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s.is_empty() || s == "-0" {
        s = "0".into();
    }
    s
}

/// Text shown for a scalar value in a free-text style control.
pub fn display_text(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .map(trim_float)
            .unwrap_or_else(|| n.to_string()),
        Some(other) => other.to_string(),
    }
}

/// Initial value for a field: explicit data first, then the schema default,
/// coerced to the shape its renderer works with.
pub fn initial_value(field: &FieldNode, explicit: Option<&JsonValue>) -> JsonValue {
    let source = explicit
        .filter(|v| !v.is_null())
        .or_else(|| field.default_value.as_ref().filter(|v| !v.is_null()));
    match field.renderer {
        Renderer::Checkbox | Renderer::Switch => JsonValue::Bool(truthy(source)),
        Renderer::Multiselect | Renderer::File => match source {
            Some(JsonValue::Array(items)) => JsonValue::Array(items.clone()),
            _ => JsonValue::Array(Vec::new()),
        },
        Renderer::Number => match source {
            Some(JsonValue::Number(n)) => n
                .as_f64()
                .map(number_value)
                .unwrap_or_else(|| JsonValue::String(String::new())),
            Some(JsonValue::String(s)) => parse_number(s),
            _ => JsonValue::String(String::new()),
        },
        _ => source
            .cloned()
            .unwrap_or_else(|| JsonValue::String(String::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emptiness_follows_required_semantics() {
        assert!(is_empty_value(None));
        assert!(is_empty_value(Some(&json!(null))));
        assert!(is_empty_value(Some(&json!(""))));
        assert!(is_empty_value(Some(&json!(false))));
        assert!(!is_empty_value(Some(&json!(0))));
        assert!(!is_empty_value(Some(&json!([]))));
        assert!(!is_empty_value(Some(&json!(" "))));
    }

    #[test]
    fn numeric_cast_mirrors_loose_number_coercion() {
        assert_eq!(to_number(Some(&json!("12.5"))), 12.5);
        assert_eq!(to_number(Some(&json!(""))), 0.0);
        assert_eq!(to_number(Some(&json!(true))), 1.0);
        assert!(to_number(Some(&json!("abc"))).is_nan());
        assert!(to_number(None).is_nan());
        assert!(to_number(Some(&json!([1]))).is_nan());
    }

    #[test]
    fn integral_numbers_normalize_to_integers() {
        assert_eq!(number_value(5.0), json!(5));
        assert_eq!(number_value(2.5), json!(2.5));
        assert_eq!(parse_number("7"), json!(7));
        assert_eq!(parse_number("-"), json!(""));
        assert_eq!(trim_float(0.30000000000000004), "0.3");
    }

    #[test]
    fn initial_values_are_coerced_per_renderer() {
        let cb = FieldNode::new("c", "C", Renderer::Checkbox);
        assert_eq!(initial_value(&cb, Some(&json!("yes"))), json!(true));
        assert_eq!(initial_value(&cb, None), json!(false));

        let ms = FieldNode::new("m", "M", Renderer::Multiselect).with_default("a");
        assert_eq!(initial_value(&ms, None), json!([]));
        assert_eq!(initial_value(&ms, Some(&json!(["x"]))), json!(["x"]));

        let num = FieldNode::new("n", "N", Renderer::Number).with_default("42");
        assert_eq!(initial_value(&num, None), json!(42));
        assert_eq!(initial_value(&num, Some(&json!("oops"))), json!(""));

        let txt = FieldNode::new("t", "T", Renderer::Text).with_default("hi");
        assert_eq!(initial_value(&txt, None), json!("hi"));
        assert_eq!(initial_value(&txt, Some(&json!(null))), json!("hi"));
        assert_eq!(initial_value(&txt, Some(&json!("there"))), json!("there"));
    }
}
