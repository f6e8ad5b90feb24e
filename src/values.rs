use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::validate::Violation;

pub const STRING_MAX_LEN: usize = 255;

/// Declared type of a stored property. The type travels with the value and
/// may change freely on re-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Int,
    Double,
    String,
    Json,
    Boolean,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Int => "int",
            PropertyType::Double => "double",
            PropertyType::String => "string",
            PropertyType::Json => "json",
            PropertyType::Boolean => "boolean",
        }
    }

    pub fn parse(s: &str) -> Option<PropertyType> {
        match s {
            "int" => Some(PropertyType::Int),
            "double" => Some(PropertyType::Double),
            "string" => Some(PropertyType::String),
            "json" => Some(PropertyType::Json),
            "boolean" => Some(PropertyType::Boolean),
            _ => None,
        }
    }
}

/// A property value tagged with its declared type. Each variant is nullable:
/// a key can be cleared while keeping its type.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(Option<i64>),
    Double(Option<f64>),
    String(Option<String>),
    Json(Option<Value>),
    Boolean(Option<bool>),
}

/// JSON type name used in violation reports. Whole numbers report as
/// "integer", everything else with a fraction as "number".
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.as_i64().is_some() || n.as_u64().is_some() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Int(_) => PropertyType::Int,
            PropertyValue::Double(_) => PropertyType::Double,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Json(_) => PropertyType::Json,
            PropertyValue::Boolean(_) => PropertyType::Boolean,
        }
    }

    /// Validates a raw JSON value against the declared type. `null` is
    /// accepted for every type. Array payloads for the numeric types report
    /// the full checked union rather than the narrowed scalar type.
    pub fn from_parts(ptype: PropertyType, value: &Value) -> Result<PropertyValue, Vec<Violation>> {
        if value.is_null() {
            return Ok(match ptype {
                PropertyType::Int => PropertyValue::Int(None),
                PropertyType::Double => PropertyValue::Double(None),
                PropertyType::String => PropertyValue::String(None),
                PropertyType::Json => PropertyValue::Json(None),
                PropertyType::Boolean => PropertyValue::Boolean(None),
            });
        }

        match ptype {
            PropertyType::Int => match value.as_i64() {
                Some(i) => Ok(PropertyValue::Int(Some(i))),
                None if value.is_array() => Err(vec![Violation::type_mismatch(
                    "#/value",
                    &["integer", "number", "string", "object", "boolean", "null"],
                    "array",
                )]),
                None => Err(vec![Violation::type_mismatch(
                    "#/value",
                    &["integer", "null"],
                    json_type_name(value),
                )]),
            },
            PropertyType::Double => match value.as_f64() {
                Some(f) => Ok(PropertyValue::Double(Some(f))),
                None if value.is_array() => Err(vec![Violation::type_mismatch(
                    "#/value",
                    &["integer", "number", "string", "object", "boolean", "null"],
                    "array",
                )]),
                None => Err(vec![Violation::type_mismatch(
                    "#/value",
                    &["number", "null"],
                    json_type_name(value),
                )]),
            },
            PropertyType::String => match value.as_str() {
                Some(s) if s.len() > STRING_MAX_LEN => Err(vec![Violation::string(
                    "#/value",
                    "maxLength",
                    json!(STRING_MAX_LEN),
                    s,
                )]),
                Some(s) => Ok(PropertyValue::String(Some(s.to_string()))),
                None => Err(vec![Violation::type_mismatch(
                    "#/value",
                    &["string", "null"],
                    json_type_name(value),
                )]),
            },
            PropertyType::Json => {
                if value.is_object() {
                    Ok(PropertyValue::Json(Some(value.clone())))
                } else {
                    Err(vec![Violation::type_mismatch(
                        "#/value",
                        &["object", "null"],
                        json_type_name(value),
                    )])
                }
            }
            PropertyType::Boolean => match value.as_bool() {
                Some(b) => Ok(PropertyValue::Boolean(Some(b))),
                None => Err(vec![Violation::type_mismatch(
                    "#/value",
                    &["boolean", "null"],
                    json_type_name(value),
                )]),
            },
        }
    }

    /// The value as plain JSON for response bodies. Cleared values render as
    /// JSON null.
    pub fn as_json(&self) -> Value {
        match self {
            PropertyValue::Int(v) => v.map(Value::from).unwrap_or(Value::Null),
            PropertyValue::Double(v) => v.map(Value::from).unwrap_or(Value::Null),
            PropertyValue::String(v) => v.clone().map(Value::from).unwrap_or(Value::Null),
            PropertyValue::Json(v) => v.clone().unwrap_or(Value::Null),
            PropertyValue::Boolean(v) => v.map(Value::from).unwrap_or(Value::Null),
        }
    }

    /// Serialized form for the store. Cleared values map to SQL NULL rather
    /// than the JSON text "null".
    pub fn to_payload(&self) -> Result<Option<String>, serde_json::Error> {
        match self.as_json() {
            Value::Null => Ok(None),
            v => Ok(Some(serde_json::to_string(&v)?)),
        }
    }

    /// Reconstructs a value from its stored type tag and payload.
    pub fn from_payload(
        ptype: PropertyType,
        payload: Option<&str>,
    ) -> Result<PropertyValue, serde_json::Error> {
        let raw = match payload {
            None => {
                return Ok(match ptype {
                    PropertyType::Int => PropertyValue::Int(None),
                    PropertyType::Double => PropertyValue::Double(None),
                    PropertyType::String => PropertyValue::String(None),
                    PropertyType::Json => PropertyValue::Json(None),
                    PropertyType::Boolean => PropertyValue::Boolean(None),
                })
            }
            Some(s) => serde_json::from_str::<Value>(s)?,
        };
        Ok(match ptype {
            PropertyType::Int => PropertyValue::Int(raw.as_i64()),
            PropertyType::Double => PropertyValue::Double(raw.as_f64()),
            PropertyType::String => PropertyValue::String(raw.as_str().map(str::to_string)),
            PropertyType::Json => {
                if raw.is_null() {
                    PropertyValue::Json(None)
                } else {
                    PropertyValue::Json(Some(raw))
                }
            }
            PropertyType::Boolean => PropertyValue::Boolean(raw.as_bool()),
        })
    }
}

/// Parses a `{type, value}` request body into a typed value, collecting every
/// violated constraint in check order.
pub fn parse_payload(body: &Value) -> Result<PropertyValue, Vec<Violation>> {
    let obj = match body.as_object() {
        Some(o) => o,
        None => {
            return Err(vec![Violation::type_mismatch(
                "#",
                &["object"],
                json_type_name(body),
            )])
        }
    };

    let mut violations = Vec::new();

    let ptype = match obj.get("type") {
        None => {
            violations.push(Violation::required("#", "type"));
            None
        }
        Some(Value::String(s)) => match PropertyType::parse(s) {
            Some(t) => Some(t),
            None => {
                violations.push(Violation::string(
                    "#/type",
                    "enum",
                    json!(["int", "double", "string", "json", "boolean"]),
                    s,
                ));
                None
            }
        },
        Some(other) => {
            violations.push(Violation::type_mismatch(
                "#/type",
                &["string"],
                json_type_name(other),
            ));
            None
        }
    };

    let value = match obj.get("value") {
        None => {
            violations.push(Violation::required("#", "value"));
            None
        }
        Some(v) => Some(v),
    };

    match (ptype, value) {
        (Some(t), Some(v)) => match PropertyValue::from_parts(t, v) {
            Ok(parsed) => Ok(parsed),
            Err(mut more) => {
                violations.append(&mut more);
                Err(violations)
            }
        },
        _ => Err(violations),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_accepts_integer() {
        let v = PropertyValue::from_parts(PropertyType::Int, &json!(42)).unwrap();
        assert_eq!(v, PropertyValue::Int(Some(42)));
        assert_eq!(v.as_json(), json!(42));
    }

    #[test]
    fn test_int_accepts_null() {
        let v = PropertyValue::from_parts(PropertyType::Int, &Value::Null).unwrap();
        assert_eq!(v, PropertyValue::Int(None));
        assert_eq!(v.as_json(), Value::Null);
    }

    #[test]
    fn test_int_rejects_float() {
        let err = PropertyValue::from_parts(PropertyType::Int, &json!(4.5)).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].instance_context, "#/value");
        assert_eq!(err[0].constraint_name, "type");
        assert_eq!(err[0].constraint_value, json!(["integer", "null"]));
        assert_eq!(err[0].tested_value, Some(json!("number")));
    }

    #[test]
    fn test_int_rejects_string() {
        let err = PropertyValue::from_parts(PropertyType::Int, &json!("42")).unwrap_err();
        assert_eq!(err[0].tested_value, Some(json!("string")));
    }

    #[test]
    fn test_int_rejects_array_with_union_type_list() {
        let err = PropertyValue::from_parts(PropertyType::Int, &json!([1, 2])).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(
            err[0].constraint_value,
            json!(["integer", "number", "string", "object", "boolean", "null"])
        );
        assert_eq!(err[0].tested_value, Some(json!("array")));
    }

    #[test]
    fn test_double_accepts_int_and_float() {
        let v = PropertyValue::from_parts(PropertyType::Double, &json!(42)).unwrap();
        assert_eq!(v, PropertyValue::Double(Some(42.0)));
        let v = PropertyValue::from_parts(PropertyType::Double, &json!(3.25)).unwrap();
        assert_eq!(v, PropertyValue::Double(Some(3.25)));
    }

    #[test]
    fn test_double_rejects_boolean() {
        let err = PropertyValue::from_parts(PropertyType::Double, &json!(true)).unwrap_err();
        assert_eq!(err[0].constraint_value, json!(["number", "null"]));
        assert_eq!(err[0].tested_value, Some(json!("boolean")));
    }

    #[test]
    fn test_double_rejects_array_with_union_type_list() {
        let err = PropertyValue::from_parts(PropertyType::Double, &json!([])).unwrap_err();
        assert_eq!(
            err[0].constraint_value,
            json!(["integer", "number", "string", "object", "boolean", "null"])
        );
    }

    #[test]
    fn test_string_accepts_string() {
        let v = PropertyValue::from_parts(PropertyType::String, &json!("hello")).unwrap();
        assert_eq!(v, PropertyValue::String(Some("hello".to_string())));
    }

    #[test]
    fn test_string_rejects_overlong() {
        let s = "x".repeat(256);
        let err = PropertyValue::from_parts(PropertyType::String, &json!(s)).unwrap_err();
        assert_eq!(err[0].constraint_name, "maxLength");
        assert_eq!(err[0].constraint_value, json!(255));
    }

    #[test]
    fn test_string_accepts_max_length() {
        let s = "x".repeat(255);
        assert!(PropertyValue::from_parts(PropertyType::String, &json!(s)).is_ok());
    }

    #[test]
    fn test_string_rejects_number() {
        let err = PropertyValue::from_parts(PropertyType::String, &json!(7)).unwrap_err();
        assert_eq!(err[0].constraint_value, json!(["string", "null"]));
        assert_eq!(err[0].tested_value, Some(json!("integer")));
    }

    #[test]
    fn test_json_accepts_object() {
        let v =
            PropertyValue::from_parts(PropertyType::Json, &json!({"a": 1, "b": [2]})).unwrap();
        assert_eq!(v.as_json(), json!({"a": 1, "b": [2]}));
    }

    #[test]
    fn test_json_accepts_empty_object() {
        let v = PropertyValue::from_parts(PropertyType::Json, &json!({})).unwrap();
        assert_eq!(v.as_json(), json!({}));
    }

    #[test]
    fn test_json_rejects_array() {
        let err = PropertyValue::from_parts(PropertyType::Json, &json!([1])).unwrap_err();
        assert_eq!(err[0].constraint_value, json!(["object", "null"]));
        assert_eq!(err[0].tested_value, Some(json!("array")));
    }

    #[test]
    fn test_json_rejects_scalar() {
        let err = PropertyValue::from_parts(PropertyType::Json, &json!("nope")).unwrap_err();
        assert_eq!(err[0].constraint_value, json!(["object", "null"]));
    }

    #[test]
    fn test_boolean_accepts_bool() {
        let v = PropertyValue::from_parts(PropertyType::Boolean, &json!(false)).unwrap();
        assert_eq!(v, PropertyValue::Boolean(Some(false)));
    }

    #[test]
    fn test_boolean_rejects_int() {
        let err = PropertyValue::from_parts(PropertyType::Boolean, &json!(1)).unwrap_err();
        assert_eq!(err[0].constraint_value, json!(["boolean", "null"]));
    }

    #[test]
    fn test_payload_null_maps_to_sql_null() {
        let v = PropertyValue::Int(None);
        assert_eq!(v.to_payload().unwrap(), None);
        let back = PropertyValue::from_payload(PropertyType::Int, None).unwrap();
        assert_eq!(back, PropertyValue::Int(None));
    }

    #[test]
    fn test_payload_preserves_json_document() {
        let v = PropertyValue::Json(Some(json!({"nested": {"deep": true}})));
        let payload = v.to_payload().unwrap().unwrap();
        let back = PropertyValue::from_payload(PropertyType::Json, Some(&payload)).unwrap();
        assert_eq!(back.as_json(), json!({"nested": {"deep": true}}));
    }

    #[test]
    fn test_property_type_parse() {
        assert_eq!(PropertyType::parse("int"), Some(PropertyType::Int));
        assert_eq!(PropertyType::parse("json"), Some(PropertyType::Json));
        assert_eq!(PropertyType::parse("float"), None);
        assert_eq!(PropertyType::parse(""), None);
    }

    #[test]
    fn test_parse_payload_valid() {
        let v = parse_payload(&json!({"type": "int", "value": 42})).unwrap();
        assert_eq!(v, PropertyValue::Int(Some(42)));
    }

    #[test]
    fn test_parse_payload_missing_type() {
        let err = parse_payload(&json!({"value": 42})).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].constraint_name, "required");
        assert_eq!(err[0].constraint_value, json!(["type"]));
    }

    #[test]
    fn test_parse_payload_missing_value() {
        let err = parse_payload(&json!({"type": "int"})).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].constraint_name, "required");
        assert_eq!(err[0].constraint_value, json!(["value"]));
    }

    #[test]
    fn test_parse_payload_missing_both_reports_both() {
        let err = parse_payload(&json!({})).unwrap_err();
        assert_eq!(err.len(), 2);
        assert_eq!(err[0].constraint_value, json!(["type"]));
        assert_eq!(err[1].constraint_value, json!(["value"]));
    }

    #[test]
    fn test_parse_payload_unknown_type() {
        let err = parse_payload(&json!({"type": "float", "value": 1.5})).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].instance_context, "#/type");
        assert_eq!(err[0].constraint_name, "enum");
    }

    #[test]
    fn test_parse_payload_non_object_body() {
        let err = parse_payload(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].instance_context, "#");
        assert_eq!(err[0].tested_value, Some(json!("array")));
    }

    #[test]
    fn test_parse_payload_explicit_null_value() {
        let v = parse_payload(&json!({"type": "string", "value": null})).unwrap();
        assert_eq!(v, PropertyValue::String(None));
    }
}
