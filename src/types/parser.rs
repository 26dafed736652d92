//! Type string parsing
//!
//! Parsing tries a registered list of `(predicate, parser)` pairs in a fixed
//! priority order: primitive, `Map`, `Pair`, `Array`, compound. The first
//! predicate that accepts the input picks the parser; there is no fallback
//! once a parser has been chosen.

use thiserror::Error;

use super::{Primitive, Type, TypeKind};

/// Failure to parse a type string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type '{source_text}': {reason}")]
pub struct TypeParseError {
    pub source_text: String,
    pub reason: String,
}

impl TypeParseError {
    fn new(source: &str, reason: impl Into<String>) -> Self {
        Self {
            source_text: source.to_string(),
            reason: reason.into(),
        }
    }
}

type Predicate = fn(&str) -> bool;
type ParseFn = fn(&str) -> Result<Type, TypeParseError>;

/// Registered parsers, in priority order
const PARSERS: &[(Predicate, ParseFn)] = &[
    (is_primitive, parse_primitive),
    (is_map, parse_map),
    (is_pair, parse_pair),
    (is_array, parse_array),
    (is_compound, parse_compound),
];

pub(crate) fn parse_type(source: &str) -> Result<Type, TypeParseError> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Err(TypeParseError::new(source, "empty type"));
    }

    PARSERS
        .iter()
        .find(|(accepts, _)| accepts(trimmed))
        .map(|(_, parse)| parse(trimmed))
        .unwrap_or_else(|| Err(TypeParseError::new(source, "unrecognized type")))
}

/* ===================== Predicates ===================== */

fn strip_optional(source: &str) -> (&str, bool) {
    match source.strip_suffix('?') {
        Some(rest) => (rest.trim_end(), true),
        None => (source, false),
    }
}

fn is_primitive(source: &str) -> bool {
    Primitive::from_name(strip_optional(source).0).is_some()
}

fn is_map(source: &str) -> bool {
    source.starts_with("Map") && source["Map".len()..].trim_start().starts_with('[')
}

fn is_pair(source: &str) -> bool {
    source.starts_with("Pair") && source["Pair".len()..].trim_start().starts_with('[')
}

fn is_array(source: &str) -> bool {
    source.starts_with("Array") && source["Array".len()..].trim_start().starts_with('[')
}

fn is_compound(source: &str) -> bool {
    is_identifier(strip_optional(source).0)
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/* ===================== Parsers ===================== */

fn parse_primitive(source: &str) -> Result<Type, TypeParseError> {
    let (base, optional) = strip_optional(source);
    let primitive = Primitive::from_name(base)
        .ok_or_else(|| TypeParseError::new(source, "unknown primitive"))?;
    Ok(Type::new(TypeKind::Primitive(primitive), optional))
}

fn parse_map(source: &str) -> Result<Type, TypeParseError> {
    let (inner, suffix) = bracketed(source, "Map")?;
    let (optional, non_empty) = parse_suffix(source, suffix)?;
    if non_empty {
        return Err(TypeParseError::new(source, "'+' is only allowed on arrays"));
    }

    let [key, value] = two_arguments(source, inner)?;
    let key = parse_type(key)?;
    if !matches!(key.kind(), TypeKind::Primitive(_)) || key.is_optional() {
        return Err(TypeParseError::new(
            source,
            "map key must be a required primitive type",
        ));
    }
    let value = parse_type(value)?;
    Ok(Type::new(
        TypeKind::Map(Box::new(key), Box::new(value)),
        optional,
    ))
}

fn parse_pair(source: &str) -> Result<Type, TypeParseError> {
    let (inner, suffix) = bracketed(source, "Pair")?;
    let (optional, non_empty) = parse_suffix(source, suffix)?;
    if non_empty {
        return Err(TypeParseError::new(source, "'+' is only allowed on arrays"));
    }

    let [left, right] = two_arguments(source, inner)?;
    Ok(Type::new(
        TypeKind::Pair(Box::new(parse_type(left)?), Box::new(parse_type(right)?)),
        optional,
    ))
}

fn parse_array(source: &str) -> Result<Type, TypeParseError> {
    let (inner, suffix) = bracketed(source, "Array")?;
    let (optional, non_empty) = parse_suffix(source, suffix)?;

    if split_top_level(inner).len() != 1 {
        return Err(TypeParseError::new(source, "Array takes one type argument"));
    }
    let item = parse_type(inner)?;
    Ok(Type::new(
        TypeKind::Array {
            item: Box::new(item),
            non_empty,
        },
        optional,
    ))
}

fn parse_compound(source: &str) -> Result<Type, TypeParseError> {
    let (base, optional) = strip_optional(source);
    let kind = match base {
        "Object" => TypeKind::Object,
        "Array" | "Pair" | "Map" => {
            return Err(TypeParseError::new(source, "missing type arguments"))
        }
        name => TypeKind::Struct(name.to_string()),
    };
    Ok(Type::new(kind, optional))
}

/* ===================== Helpers ===================== */

/// Split `Name[inner]suffix` into `(inner, suffix)`
fn bracketed<'a>(source: &'a str, name: &str) -> Result<(&'a str, &'a str), TypeParseError> {
    let rest = source[name.len()..].trim_start();
    let open = source.len() - rest.len();

    let mut depth = 0usize;
    for (offset, ch) in source[open..].char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    let close = open + offset;
                    return Ok((&source[open + 1..close], &source[close + 1..]));
                }
            }
            _ => {}
        }
    }
    Err(TypeParseError::new(source, "unbalanced brackets"))
}

/// Parse the `+`/`?` suffix after a closing bracket
fn parse_suffix(source: &str, suffix: &str) -> Result<(bool, bool), TypeParseError> {
    match suffix.trim() {
        "" => Ok((false, false)),
        "?" => Ok((true, false)),
        "+" => Ok((false, true)),
        "+?" => Ok((true, true)),
        other => Err(TypeParseError::new(
            source,
            format!("unexpected trailing '{}'", other),
        )),
    }
}

fn two_arguments<'a>(source: &str, inner: &'a str) -> Result<[&'a str; 2], TypeParseError> {
    match split_top_level(inner).as_slice() {
        [first, second] => Ok([first, second]),
        _ => Err(TypeParseError::new(source, "expected two type arguments")),
    }
}

/// Split on commas that are not nested inside brackets
fn split_top_level(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in inner.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(inner[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(inner[start..].trim());
    parts
}
