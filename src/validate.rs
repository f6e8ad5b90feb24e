use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

pub const KEY_MAX_LEN: usize = 255;
pub const REALM_MIN_LEN: usize = 2;
pub const REALM_MAX_LEN: usize = 64;

pub const KEY_PATTERN: &str = "^[A-Za-z][A-Za-z0-9_]*$";
pub const REALM_PATTERN: &str = "^[A-Za-z0-9][A-Za-z0-9._-]*$";
pub const MIRROR_TOKEN_PATTERN: &str = "^[a-fA-F0-9]{64}$";

static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(KEY_PATTERN).expect("valid key pattern"));
static REALM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(REALM_PATTERN).expect("valid realm pattern"));
static MIRROR_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(MIRROR_TOKEN_PATTERN).expect("valid token pattern"));

/// One violated constraint, reported in the order constraints were checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub instance_context: String,
    pub constraint_name: String,
    pub constraint_value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tested_value: Option<Value>,
    pub kind: String,
}

impl Violation {
    pub fn string(context: &str, name: &str, constraint: Value, tested: &str) -> Self {
        Violation {
            instance_context: context.to_string(),
            constraint_name: name.to_string(),
            constraint_value: constraint,
            tested_value: Some(json!(tested)),
            kind: "StringValidationError".to_string(),
        }
    }

    pub fn type_mismatch(context: &str, allowed: &[&str], tested_type: &str) -> Self {
        Violation {
            instance_context: context.to_string(),
            constraint_name: "type".to_string(),
            constraint_value: json!(allowed),
            tested_value: Some(json!(tested_type)),
            kind: "TypeValidationError".to_string(),
        }
    }

    pub fn required(context: &str, field: &str) -> Self {
        Violation {
            instance_context: context.to_string(),
            constraint_name: "required".to_string(),
            constraint_value: json!([field]),
            tested_value: None,
            kind: "ObjectValidationError".to_string(),
        }
    }
}

/// Property keys must start with a letter and stay within 255 chars.
pub fn check_key(key: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    if !KEY_RE.is_match(key) {
        violations.push(Violation::string(
            "#/key",
            "pattern",
            json!(KEY_PATTERN),
            key,
        ));
    }
    if key.len() > KEY_MAX_LEN {
        violations.push(Violation::string(
            "#/key",
            "maxLength",
            json!(KEY_MAX_LEN),
            key,
        ));
    }
    violations
}

pub fn check_realm(realm: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    if realm.len() < REALM_MIN_LEN {
        violations.push(Violation::string(
            "#/realm",
            "minLength",
            json!(REALM_MIN_LEN),
            realm,
        ));
    }
    if realm.len() > REALM_MAX_LEN {
        violations.push(Violation::string(
            "#/realm",
            "maxLength",
            json!(REALM_MAX_LEN),
            realm,
        ));
    }
    if !REALM_RE.is_match(realm) {
        violations.push(Violation::string(
            "#/realm",
            "pattern",
            json!(REALM_PATTERN),
            realm,
        ));
    }
    violations
}

pub fn check_mirror_token(token: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    if !MIRROR_TOKEN_RE.is_match(token) {
        violations.push(Violation::string(
            "#/mirrorToken",
            "pattern",
            json!(MIRROR_TOKEN_PATTERN),
            token,
        ));
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_key_passes() {
        assert!(check_key("int_1").is_empty());
        assert!(check_key("A").is_empty());
        assert!(check_key("camelCase_99").is_empty());
    }

    #[test]
    fn test_key_with_space_fails_pattern() {
        let violations = check_key("bad key");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].instance_context, "#/key");
        assert_eq!(violations[0].constraint_name, "pattern");
        assert_eq!(violations[0].kind, "StringValidationError");
        assert_eq!(violations[0].tested_value, Some(json!("bad key")));
    }

    #[test]
    fn test_key_leading_digit_fails_pattern() {
        let violations = check_key("1key");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint_name, "pattern");
    }

    #[test]
    fn test_empty_key_fails_pattern() {
        let violations = check_key("");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint_name, "pattern");
    }

    #[test]
    fn test_overlong_key_fails_max_length() {
        let key = "k".repeat(256);
        let violations = check_key(&key);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint_name, "maxLength");
        assert_eq!(violations[0].constraint_value, json!(255));
    }

    #[test]
    fn test_key_at_max_length_passes() {
        let key = "k".repeat(255);
        assert!(check_key(&key).is_empty());
    }

    #[test]
    fn test_valid_realm_passes() {
        assert!(check_realm("realm1").is_empty());
        assert!(check_realm("my.realm-2_x").is_empty());
        assert!(check_realm("ab").is_empty());
    }

    #[test]
    fn test_short_realm_fails_min_length() {
        let violations = check_realm("a");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].instance_context, "#/realm");
        assert_eq!(violations[0].constraint_name, "minLength");
    }

    #[test]
    fn test_long_realm_fails_max_length() {
        let realm = "r".repeat(65);
        let violations = check_realm(&realm);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint_name, "maxLength");
    }

    #[test]
    fn test_realm_leading_dot_fails_pattern() {
        let violations = check_realm(".realm");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint_name, "pattern");
    }

    #[test]
    fn test_realm_with_space_fails_pattern() {
        let violations = check_realm("bad realm");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint_name, "pattern");
    }

    #[test]
    fn test_valid_mirror_token_passes() {
        let token = "a".repeat(64);
        assert!(check_mirror_token(&token).is_empty());
        let token = "0123456789abcdefABCDEF0123456789abcdef0123456789abcdef0123456789";
        assert_eq!(token.len(), 64);
        assert!(check_mirror_token(token).is_empty());
    }

    #[test]
    fn test_short_mirror_token_fails_pattern() {
        let violations = check_mirror_token("abc123");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].instance_context, "#/mirrorToken");
        assert_eq!(violations[0].constraint_name, "pattern");
    }

    #[test]
    fn test_non_hex_mirror_token_fails_pattern() {
        let token = "z".repeat(64);
        let violations = check_mirror_token(&token);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint_name, "pattern");
    }

    #[test]
    fn test_violation_serializes_camel_case() {
        let v = Violation::string("#/key", "pattern", json!(KEY_PATTERN), "bad key");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["instanceContext"], "#/key");
        assert_eq!(json["constraintName"], "pattern");
        assert_eq!(json["constraintValue"], KEY_PATTERN);
        assert_eq!(json["testedValue"], "bad key");
        assert_eq!(json["kind"], "StringValidationError");
    }

    #[test]
    fn test_required_violation_omits_tested_value() {
        let v = Violation::required("#", "value");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["constraintName"], "required");
        assert_eq!(json["constraintValue"], json!(["value"]));
        assert_eq!(json["kind"], "ObjectValidationError");
        assert!(json.get("testedValue").is_none());
    }
}
