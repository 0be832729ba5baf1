//! Tests for target path parsing and injection.

use super::*;
use crate::value::Number;

fn inject(values: &mut Values, path: &str, value: impl Into<Value>) -> Result<(), PathError> {
    TargetPath::parse(path)?.inject(values, value.into())
}

fn assert_syntax_error(path: &str) {
    match TargetPath::parse(path) {
        Err(PathError::Syntax { .. }) => {}
        other => panic!("Expected syntax error for '{}', got {:?}", path, other),
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Verify dotted paths split into segments.
#[test]
fn test_parse_dotted_path() {
    let path = TargetPath::parse("merge.at.specific.path").unwrap();

    let keys: Vec<&str> = path.segments().iter().map(PathSegment::key).collect();
    assert_eq!(keys, vec!["merge", "at", "specific", "path"]);
    assert!(path.segments().iter().all(|s| s.indexes().is_empty()));
    assert_eq!(path.as_str(), "merge.at.specific.path");
}

/// Verify identifiers accept letters, digits, underscores and hyphens.
#[test]
fn test_parse_identifier_characters() {
    let path = TargetPath::parse("list_with.nested-values.and.index[0]").unwrap();

    assert_eq!(path.segments().len(), 4);
    assert_eq!(path.segments()[3].key(), "index");
    assert_eq!(path.segments()[3].indexes(), &[0]);
}

/// Verify chained indexes are parsed in order.
#[test]
fn test_parse_chained_indexes() {
    let path = TargetPath::parse("matrix[1][2].cell").unwrap();

    assert_eq!(path.segments()[0].indexes(), &[1, 2]);
    assert_eq!(path.segments()[1].key(), "cell");
}

/// Verify quoted identifiers keep dots and brackets literally.
#[test]
fn test_parse_quoted_identifier() {
    let path = TargetPath::parse("ingress.annotations.'kubernetes.io/ingress.class'").unwrap();

    assert_eq!(path.segments().len(), 3);
    assert_eq!(path.segments()[2].key(), "kubernetes.io/ingress.class");

    let path = TargetPath::parse("'flat'").unwrap();
    assert_eq!(path.segments()[0].key(), "flat");

    let path = TargetPath::parse("'a[0]'[1]").unwrap();
    assert_eq!(path.segments()[0].key(), "a[0]");
    assert_eq!(path.segments()[0].indexes(), &[1]);
}

/// Verify a long path within the admission limit parses.
#[test]
fn test_parse_long_path() {
    assert!(TargetPath::parse(&"a".repeat(250)).is_ok());
}

/// Verify paths over the length limit are rejected before parsing.
#[test]
fn test_parse_rejects_overlong_path() {
    let deep = vec!["a"; 126].join(".");
    assert_eq!(deep.len(), MAX_TARGET_PATH_LENGTH + 1);

    match TargetPath::parse(&deep) {
        Err(PathError::Syntax { path, reason }) => {
            assert_eq!(path, deep);
            assert!(reason.contains("path too long"), "{}", reason);
        }
        other => panic!("Expected Syntax error, got {:?}", other),
    }
    assert!(TargetPath::parse(&"a[65536]".repeat(40)).is_err());
}

/// Verify malformed bracket usage is rejected.
#[test]
fn test_parse_rejects_bracket_errors() {
    assert_syntax_error("a[");
    assert_syntax_error("a]0[");
    assert_syntax_error("a]");
    assert_syntax_error("a[]");
    assert_syntax_error("a[x]");
    assert_syntax_error("a[-1]");
    assert_syntax_error("a[0");
    assert_syntax_error("[0]");
    assert_syntax_error("a[0]b");
}

/// Verify empty paths and segments are rejected.
#[test]
fn test_parse_rejects_empty_segments() {
    assert_syntax_error("");
    assert_syntax_error(".a");
    assert_syntax_error("a.");
    assert_syntax_error("a..b");
    assert_syntax_error("''");
}

/// Verify characters outside the identifier set are rejected.
#[test]
fn test_parse_rejects_invalid_characters() {
    assert_syntax_error("a b");
    assert_syntax_error("a/b");
    assert_syntax_error("a=b");
    assert_syntax_error("ключ");
    assert_syntax_error("'unterminated");
    assert_syntax_error("'a'b");
}

/// Verify indexes above the maximum are rejected.
#[test]
fn test_parse_rejects_large_indexes() {
    assert!(TargetPath::parse(&format!("a[{}]", MAX_INDEX)).is_ok());
    assert_syntax_error(&format!("a[{}]", MAX_INDEX + 1));
    assert_syntax_error("a[99999999999999999999999999]");
}

/// Verify segment display quotes keys outside the identifier set.
#[test]
fn test_segment_display() {
    let path = TargetPath::parse("a.'b.c'[2]").unwrap();

    let rendered: Vec<String> = path.segments().iter().map(|s| s.to_string()).collect();
    assert_eq!(rendered, vec!["a".to_string(), "'b.c'[2]".to_string()]);
}

// ============================================================================
// Injection
// ============================================================================

/// Verify intermediate mappings are created.
#[test]
fn test_inject_creates_nested_mappings() {
    let mut values = Values::new();
    inject(&mut values, "merge.at.specific.path", "value").unwrap();

    let mut path = Values::new();
    path.insert("path", "value");
    let mut specific = Values::new();
    specific.insert("specific", path);
    let mut at = Values::new();
    at.insert("at", specific);
    let mut expected = Values::new();
    expected.insert("merge", at);

    assert_eq!(values, expected);
}

/// Verify existing siblings are preserved.
#[test]
fn test_inject_preserves_siblings() {
    let mut values = Values::from_yaml_slice(b"image:\n  repository: nginx\n  tag: old\n").unwrap();
    inject(&mut values, "image.tag", "new").unwrap();

    assert_eq!(values.lookup(&["image", "repository"]), Some(&Value::from("nginx")));
    assert_eq!(values.lookup(&["image", "tag"]), Some(&Value::from("new")));
}

/// Verify the terminal slot is overwritten whatever it holds.
#[test]
fn test_inject_overwrites_terminal_slot() {
    let mut values = Values::from_yaml_slice(b"flat:\n  nested: value\n").unwrap();
    inject(&mut values, "flat", true).unwrap();

    assert_eq!(values.get("flat"), Some(&Value::Bool(true)));
}

/// Verify sequences are created and padded with nulls.
#[test]
fn test_inject_creates_padded_sequence() {
    let mut values = Values::new();
    inject(&mut values, "list[2]", "c").unwrap();

    assert_eq!(
        values.get("list"),
        Some(&Value::Sequence(vec![Value::Null, Value::Null, Value::from("c")]))
    );
}

/// Verify existing sequence elements are kept and replaced in place.
#[test]
fn test_inject_into_existing_sequence() {
    let mut values = Values::from_yaml_slice(b"list: [a, b, c]\n").unwrap();
    inject(&mut values, "list[1]", "x").unwrap();

    assert_eq!(
        values.get("list"),
        Some(&Value::Sequence(vec![
            Value::from("a"),
            Value::from("x"),
            Value::from("c")
        ]))
    );
}

/// Verify descent through a sequence element creates a mapping.
#[test]
fn test_inject_through_sequence_element() {
    let mut values = Values::new();
    inject(&mut values, "servers[1].port", 8080_i64).unwrap();

    let servers = values.get("servers").and_then(Value::as_sequence).unwrap();
    assert_eq!(servers.len(), 2);
    assert_eq!(servers[0], Value::Null);
    assert_eq!(
        servers[1].as_mapping().and_then(|m| m.get("port")),
        Some(&Value::Number(Number::Int(8080)))
    );
}

/// Verify nested sequences are created for chained indexes.
#[test]
fn test_inject_chained_indexes() {
    let mut values = Values::new();
    inject(&mut values, "matrix[0][1]", "x").unwrap();

    assert_eq!(
        values.get("matrix"),
        Some(&Value::Sequence(vec![Value::Sequence(vec![
            Value::Null,
            Value::from("x")
        ])]))
    );
}

/// Verify quoted keys are injected literally.
#[test]
fn test_inject_quoted_key() {
    let mut values = Values::new();
    inject(&mut values, "annotations.'kubernetes.io/ingress.class'", "nginx").unwrap();

    let annotations = values.get("annotations").and_then(Value::as_mapping).unwrap();
    assert_eq!(
        annotations.get("kubernetes.io/ingress.class"),
        Some(&Value::from("nginx"))
    );
}

/// Verify null intermediate values are replaced by mappings.
#[test]
fn test_inject_through_null() {
    let mut values = Values::from_yaml_slice(b"a: null\n").unwrap();
    inject(&mut values, "a.b", "c").unwrap();

    assert_eq!(values.lookup(&["a", "b"]), Some(&Value::from("c")));
}

/// Verify descending through a scalar is a conflict.
#[test]
fn test_inject_conflict_on_scalar() {
    let mut values = Values::from_yaml_slice(b"a:\n  b: text\n").unwrap();
    let err = inject(&mut values, "a.b.c", "value").unwrap_err();

    match err {
        PathError::Conflict { path, segment, found } => {
            assert_eq!(path, "a.b.c");
            assert_eq!(segment, "a.b");
            assert_eq!(found, "string");
        }
        other => panic!("Expected conflict, got {:?}", other),
    }
}

/// Verify indexing into a non-sequence is a conflict.
#[test]
fn test_inject_conflict_on_index_into_mapping() {
    let mut values = Values::from_yaml_slice(b"a:\n  b: c\n").unwrap();
    let err = inject(&mut values, "a[0]", "value").unwrap_err();

    assert!(matches!(err, PathError::Conflict { ref found, .. } if found == "mapping"));
}

/// Verify descending through a sequence without an index is a conflict.
#[test]
fn test_inject_conflict_on_sequence_without_index() {
    let mut values = Values::from_yaml_slice(b"a: [1, 2]\n").unwrap();
    let err = inject(&mut values, "a.b", "value").unwrap_err();

    assert!(matches!(err, PathError::Conflict { ref found, .. } if found == "sequence"));
}
