use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{ApiError, ApiResult};

/// Pulls the payload stored under `field` out of a response envelope.
///
/// A missing key is a contract violation and surfaces as
/// `ApiError::Decoding`; it never turns into a default value.
pub fn unwrap_field<T: DeserializeOwned>(envelope: Value, field: &str) -> ApiResult<T> {
    let mut object = match envelope {
        Value::Object(map) => map,
        other => {
            return Err(ApiError::Decoding(format!(
                "expected an object envelope around `{}`, got {}",
                field,
                kind(&other)
            )))
        }
    };

    let payload = object
        .remove(field)
        .ok_or_else(|| ApiError::Decoding(format!("response envelope is missing `{}`", field)))?;

    serde_json::from_value(payload)
        .map_err(|e| ApiError::Decoding(format!("invalid `{}` payload: {}", field, e)))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_is_unwrapped() {
        let count: u64 = unwrap_field(json!({ "count": 42 }), "count").unwrap();
        assert_eq!(count, 42);
    }

    #[test]
    fn test_missing_field_is_decoding_error() {
        let err = unwrap_field::<u64>(json!({ "total": 42 }), "count").unwrap_err();
        assert_eq!(
            err,
            ApiError::Decoding("response envelope is missing `count`".to_string())
        );
    }

    #[test]
    fn test_null_payload_is_decoding_error_for_required_types() {
        let err = unwrap_field::<u64>(json!({ "count": null }), "count").unwrap_err();
        assert!(matches!(err, ApiError::Decoding(_)));
    }

    #[test]
    fn test_non_object_envelope() {
        let err = unwrap_field::<Vec<u64>>(json!([1, 2, 3]), "users").unwrap_err();
        assert!(matches!(err, ApiError::Decoding(msg) if msg.contains("an array")));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let success: String = unwrap_field(
            json!({ "success": "associated", "subscription": { "ID": 1 } }),
            "success",
        )
        .unwrap();
        assert_eq!(success, "associated");
    }
}
