//! Target path parsing and value injection.
//!
//! A target path names the location inside a values tree where a single
//! scalar is placed. The grammar is:
//!
//! ```text
//! path       = segment *( "." segment )
//! segment    = identifier *( "[" index "]" )
//! identifier = 1*( ALPHA / DIGIT / "_" / "-" ) / "'" 1*( any but "'" ) "'"
//! index      = 1*DIGIT
//! ```
//!
//! Single-quoted identifiers allow keys that contain dots or brackets, e.g.
//! `ingress.annotations.'kubernetes.io/ingress.class'`.

use crate::errors::PathError;
use crate::value::{Value, Values};
use std::fmt;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

#[cfg(test)]
#[path = "target_path_tests.rs"]
mod tests;

/// Largest sequence index a path may address.
///
/// Bounds the number of null placeholders an injection can allocate.
pub const MAX_INDEX: usize = 65536;

/// Maximum length of a target path in bytes.
///
/// Bounds the depth of the tree an injection can build.
pub const MAX_TARGET_PATH_LENGTH: usize = 250;

/// One dot-separated part of a target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    key: String,
    indexes: Vec<usize>,
}

impl PathSegment {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Sequence indexes applied after the key, outermost first.
    pub fn indexes(&self) -> &[usize] {
        &self.indexes
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.key.is_empty() && self.key.chars().all(is_identifier_char) {
            write!(f, "{}", self.key)?;
        } else {
            write!(f, "'{}'", self.key)?;
        }
        for index in &self.indexes {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

/// A parsed target path.
///
/// # Examples
///
/// ```
/// use values_composer::{TargetPath, Value, Values};
///
/// let path: TargetPath = "merge.at.specific.path".parse()?;
/// let mut values = Values::new();
/// path.inject(&mut values, Value::from("value"))?;
///
/// assert_eq!(
///     values.lookup(&["merge", "at", "specific", "path"]),
///     Some(&Value::from("value"))
/// );
/// # Ok::<(), values_composer::PathError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl TargetPath {
    /// Parses a target path.
    ///
    /// # Errors
    ///
    /// Returns `PathError::Syntax` for empty paths or segments, paths longer
    /// than [`MAX_TARGET_PATH_LENGTH`], unmatched or out-of-order brackets,
    /// indexes with non-digit contents or above [`MAX_INDEX`], unterminated
    /// quotes and characters outside the identifier set.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let syntax = |reason: String| PathError::Syntax {
            path: raw.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(syntax("path is empty".to_string()));
        }
        if raw.len() > MAX_TARGET_PATH_LENGTH {
            return Err(syntax(format!(
                "path too long ({} characters, maximum {})",
                raw.len(),
                MAX_TARGET_PATH_LENGTH
            )));
        }

        let mut chars = raw.chars().peekable();
        let mut segments = Vec::new();
        loop {
            let key = parse_identifier(&mut chars).map_err(&syntax)?;
            let indexes = parse_indexes(&mut chars).map_err(&syntax)?;
            segments.push(PathSegment { key, indexes });

            match chars.next() {
                None => break,
                Some('.') => continue,
                Some(']') => return Err(syntax("unmatched ']'".to_string())),
                Some(c) => {
                    return Err(syntax(format!(
                        "unexpected character '{}' after segment",
                        c
                    )))
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Places `value` at this path, creating intermediate mappings and
    /// sequences as needed. Whatever occupied the final slot is replaced.
    ///
    /// Null slots are treated like absent ones. Sequences shorter than an
    /// index are padded with nulls.
    ///
    /// # Errors
    ///
    /// Returns `PathError::Conflict` when the path has to descend through a
    /// value of the wrong type (for example a string where a mapping is
    /// needed). The tree may have been partially extended when this happens.
    pub fn inject(&self, values: &mut Values, value: Value) -> Result<(), PathError> {
        let Some((last, parents)) = self.segments.split_last() else {
            return Err(PathError::Syntax {
                path: self.raw.clone(),
                reason: "path is empty".to_string(),
            });
        };

        let mut current = values;
        for (position, segment) in parents.iter().enumerate() {
            let slot = self.descend_indexes(current.slot(&segment.key), segment, position)?;
            if slot.is_null() {
                *slot = Value::Mapping(Values::new());
            }
            current = match slot {
                Value::Mapping(inner) => inner,
                other => return Err(self.conflict(position, other)),
            };
        }

        let slot = self.descend_indexes(current.slot(&last.key), last, parents.len())?;
        *slot = value;
        Ok(())
    }

    fn descend_indexes<'a>(
        &self,
        mut slot: &'a mut Value,
        segment: &PathSegment,
        position: usize,
    ) -> Result<&'a mut Value, PathError> {
        for &index in &segment.indexes {
            if slot.is_null() {
                *slot = Value::Sequence(Vec::new());
            }
            slot = match slot {
                Value::Sequence(items) => {
                    if items.len() <= index {
                        items.resize(index + 1, Value::Null);
                    }
                    &mut items[index]
                }
                other => return Err(self.conflict(position, other)),
            };
        }
        Ok(slot)
    }

    fn conflict(&self, position: usize, found: &Value) -> PathError {
        let segment = self
            .segments
            .iter()
            .take(position + 1)
            .map(PathSegment::to_string)
            .collect::<Vec<_>>()
            .join(".");
        PathError::Conflict {
            path: self.raw.clone(),
            segment,
            found: found.type_name().to_string(),
        }
    }
}

impl FromStr for TargetPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn parse_identifier(chars: &mut Peekable<Chars<'_>>) -> Result<String, String> {
    let mut key = String::new();

    if chars.peek() == Some(&'\'') {
        chars.next();
        loop {
            match chars.next() {
                Some('\'') => break,
                Some(c) => key.push(c),
                None => return Err("unterminated quoted key".to_string()),
            }
        }
        if key.is_empty() {
            return Err("quoted key is empty".to_string());
        }
        return Ok(key);
    }

    while let Some(&c) = chars.peek() {
        if !is_identifier_char(c) {
            break;
        }
        key.push(c);
        chars.next();
    }

    if key.is_empty() {
        return Err(match chars.peek() {
            None | Some('.') => "empty path segment".to_string(),
            Some('[') => "index without a key".to_string(),
            Some(c) => format!("unexpected character '{}'", c),
        });
    }
    Ok(key)
}

fn parse_indexes(chars: &mut Peekable<Chars<'_>>) -> Result<Vec<usize>, String> {
    let mut indexes = Vec::new();

    while chars.peek() == Some(&'[') {
        chars.next();
        let mut digits = String::new();
        loop {
            match chars.next() {
                Some(']') => break,
                Some(c) if c.is_ascii_digit() => digits.push(c),
                Some(c) => return Err(format!("index contains non-digit character '{}'", c)),
                None => return Err("unclosed '['".to_string()),
            }
        }

        if digits.is_empty() {
            return Err("index is empty".to_string());
        }
        let index = digits
            .parse::<usize>()
            .ok()
            .filter(|index| *index <= MAX_INDEX)
            .ok_or_else(|| format!("index {} exceeds the maximum of {}", digits, MAX_INDEX))?;
        indexes.push(index);
    }

    Ok(indexes)
}
