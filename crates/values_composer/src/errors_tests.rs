//! Tests for values composition error types.

use super::*;

/// Verify reference origins render kind, namespace, name and key.
#[test]
fn test_reference_origin_display() {
    let origin = ValuesOrigin::reference(SourceKind::Secret, "default", "values", "values.yaml");

    assert_eq!(
        origin.to_string(),
        "key 'values.yaml' of Secret 'default/values'"
    );
    assert_eq!(ValuesOrigin::Inline.to_string(), "inline values");
}

/// Verify not-found errors identify the missing object.
#[test]
fn test_source_not_found_message() {
    let error = ValuesError::SourceNotFound {
        kind: SourceKind::ConfigMap,
        namespace: "flux-system".to_string(),
        name: "podinfo-values".to_string(),
        key: "values.yaml".to_string(),
    };

    assert!(error.is_not_found());
    assert_eq!(
        error.to_string(),
        "could not find ConfigMap 'flux-system/podinfo-values' holding key 'values.yaml'"
    );
}

/// Verify unsupported kind errors name the reference and its key.
#[test]
fn test_unsupported_reference_kind_message() {
    let error = ValuesError::UnsupportedReferenceKind {
        kind: "Unsupported".to_string(),
        name: "values".to_string(),
        key: "values.yaml".to_string(),
    };

    assert!(!error.is_not_found());
    assert_eq!(
        error.to_string(),
        "unsupported values reference kind 'Unsupported' for key 'values.yaml' of 'values' \
         (expected ConfigMap or Secret)"
    );
}

/// Verify key errors are not classified as not-found.
#[test]
fn test_source_key_not_found_is_not_not_found() {
    let error = ValuesError::SourceKeyNotFound {
        kind: SourceKind::Secret,
        namespace: "default".to_string(),
        name: "values".to_string(),
        key: "nonexisting".to_string(),
    };

    assert!(!error.is_not_found());
    assert!(error.to_string().contains("missing key 'nonexisting'"));
    assert!(error.origin().is_none());
}

/// Verify path errors keep their kind when the origin is attached.
#[test]
fn test_from_path_error_preserves_kind() {
    let origin = ValuesOrigin::reference(SourceKind::Secret, "default", "values", "single");

    let syntax = ValuesError::from_path_error(
        PathError::Syntax {
            path: "a[".to_string(),
            reason: "unclosed '['".to_string(),
        },
        origin.clone(),
    );
    match &syntax {
        ValuesError::PathSyntaxError { path, reason, .. } => {
            assert_eq!(path, "a[");
            assert_eq!(reason, "unclosed '['");
        }
        other => panic!("Expected PathSyntaxError, got {:?}", other),
    }
    assert_eq!(syntax.origin(), Some(&origin));

    let conflict = ValuesError::from_path_error(
        PathError::Conflict {
            path: "a.b".to_string(),
            segment: "a".to_string(),
            found: "string".to_string(),
        },
        origin,
    );
    assert!(matches!(conflict, ValuesError::PathConflict { .. }));
    assert!(conflict.to_string().contains("'a' holds a string"));
}
