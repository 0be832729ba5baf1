//! Tests for values references.

use super::*;

fn assert_invalid_field(reference: &ValuesReference, expected_field: &str) {
    match reference.validate() {
        Err(ValuesError::InvalidReference { field, .. }) => assert_eq!(field, expected_field),
        other => panic!(
            "Expected invalid '{}' for {:?}, got {:?}",
            expected_field, reference, other
        ),
    }
}

// ============================================================================
// Source kinds
// ============================================================================

/// Verify supported kinds parse and unsupported ones do not.
#[test]
fn test_source_kind_from_kind() {
    assert_eq!(SourceKind::from_kind("ConfigMap"), Some(SourceKind::ConfigMap));
    assert_eq!(SourceKind::from_kind("Secret"), Some(SourceKind::Secret));
    assert_eq!(SourceKind::from_kind("secret"), None);
    assert_eq!(SourceKind::from_kind("Unsupported"), None);
    assert_eq!(SourceKind::from_kind(""), None);
}

// ============================================================================
// Defaults and serialization
// ============================================================================

/// Verify the values key defaults to values.yaml.
#[test]
fn test_values_key_default() {
    assert_eq!(ValuesReference::secret("values").values_key(), DEFAULT_VALUES_KEY);
    assert_eq!(
        ValuesReference::secret("values")
            .with_values_key("custom-values.yaml")
            .values_key(),
        "custom-values.yaml"
    );
}

/// Verify references deserialize from the camelCase release schema.
#[test]
fn test_deserialize_camel_case() {
    let reference: ValuesReference = serde_json::from_str(
        r#"{
            "kind": "Secret",
            "name": "values",
            "valuesKey": "single",
            "targetPath": "a.b",
            "optional": true
        }"#,
    )
    .unwrap();

    assert_eq!(
        reference,
        ValuesReference::secret("values")
            .with_values_key("single")
            .with_target_path("a.b")
            .with_optional(true)
    );
}

/// Verify omitted fields take their defaults.
#[test]
fn test_deserialize_defaults() {
    let reference: ValuesReference =
        serde_json::from_str(r#"{"kind": "ConfigMap", "name": "values"}"#).unwrap();

    assert_eq!(reference.values_key, "");
    assert_eq!(reference.target_path, "");
    assert!(!reference.optional);
}

/// Verify default fields are omitted when serializing.
#[test]
fn test_serialize_omits_defaults() {
    let json = serde_json::to_value(ValuesReference::config_map("values")).unwrap();

    assert_eq!(json, serde_json::json!({"kind": "ConfigMap", "name": "values"}));
}

/// Verify the values spec deserializes with inline values.
#[test]
fn test_values_spec_deserialize() {
    let spec: ValuesSpec = serde_json::from_str(
        r#"{
            "valuesFrom": [{"kind": "ConfigMap", "name": "values"}],
            "values": {"other": "values"}
        }"#,
    )
    .unwrap();

    assert_eq!(spec.values_from, vec![ValuesReference::config_map("values")]);
    assert_eq!(spec.values, Some(serde_json::json!({"other": "values"})));
}

// ============================================================================
// Validation
// ============================================================================

/// Verify valid values keys are accepted.
#[test]
fn test_validate_accepts_values_keys() {
    let base = ValuesReference::secret("values");

    assert!(base.clone().with_values_key("any-key_na.me").validate().is_ok());
    assert!(base.clone().with_values_key("").validate().is_ok());
    assert!(base.with_values_key("a".repeat(253)).validate().is_ok());
}

/// Verify invalid values keys are rejected.
#[test]
fn test_validate_rejects_values_keys() {
    let base = ValuesReference::secret("values");

    assert_invalid_field(&base.clone().with_values_key("a($&^%b"), "valuesKey");
    assert_invalid_field(&base.clone().with_values_key("a/b"), "valuesKey");
    assert_invalid_field(&base.with_values_key("a".repeat(254)), "valuesKey");
}

/// Verify valid target paths are accepted.
#[test]
fn test_validate_accepts_target_paths() {
    let base = ValuesReference::secret("values");

    assert!(base.clone().with_target_path("").validate().is_ok());
    assert!(base
        .clone()
        .with_target_path("list_with.nested-values.and.index[0]")
        .validate()
        .is_ok());
    assert!(base.with_target_path("a".repeat(250)).validate().is_ok());
}

/// Verify invalid target paths are rejected.
#[test]
fn test_validate_rejects_target_paths() {
    let base = ValuesReference::secret("values").with_values_key("single");

    assert_invalid_field(&base.clone().with_target_path("a".repeat(251)), "targetPath");
    assert_invalid_field(&base.clone().with_target_path("a["), "targetPath");
    assert_invalid_field(&base.with_target_path("a]0["), "targetPath");
}

/// Verify kind and name are checked.
#[test]
fn test_validate_rejects_kind_and_name() {
    assert_invalid_field(&ValuesReference::new("Unsupported", "values"), "kind");
    assert_invalid_field(&ValuesReference::config_map(""), "name");
    assert_invalid_field(&ValuesReference::config_map("a".repeat(254)), "name");
}

/// Verify spec validation stops at the first invalid reference.
#[test]
fn test_values_spec_validate() {
    let spec = ValuesSpec {
        values_from: vec![
            ValuesReference::config_map("values"),
            ValuesReference::secret("values").with_target_path("a["),
        ],
        values: None,
    };

    assert!(matches!(
        spec.validate(),
        Err(ValuesError::InvalidReference { ref field, .. }) if field == "targetPath"
    ));
}

/// Verify values key validation gives the same answer across threads.
#[test]
fn test_validate_values_key_shared_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let valid = ValuesReference::config_map("values")
                    .with_values_key(format!("values-{}.yaml", i))
                    .validate();
                let invalid = ValuesReference::config_map("values")
                    .with_values_key(format!("values {}.yaml", i))
                    .validate();
                (valid.is_ok(), invalid.is_err())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), (true, true));
    }
}
