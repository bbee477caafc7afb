use serde_json::Value;

/// JavaScript-style truthiness, except that arrays are truthy only when
/// non-empty.
pub fn cast_boolean(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cast_boolean() {
        assert!(!cast_boolean(&json!(null)));
        assert!(!cast_boolean(&json!(false)));
        assert!(!cast_boolean(&json!(0)));
        assert!(!cast_boolean(&json!("")));
        assert!(!cast_boolean(&json!([])));

        assert!(cast_boolean(&json!(true)));
        assert!(cast_boolean(&json!(-1)));
        assert!(cast_boolean(&json!("0")));
        assert!(cast_boolean(&json!([0])));
        assert!(cast_boolean(&json!({})));
    }
}
