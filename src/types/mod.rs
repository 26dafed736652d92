//! WDL type algebra
//!
//! Types are immutable values built from a small closed set of variants:
//! primitives, `Array`, `Pair`, `Map` and compound (named struct or untyped
//! `Object`). Every variant may be optional (`?`).
//!
//! ```ignore
//! let ty: Type = "Array[Pair[Int,File]]+?".parse()?;
//! assert_eq!(ty.to_string(), "Array[Pair[Int,File]]+?");
//! ```
//!
//! Subtyping is structural: compound kinds compare element-wise (covariant),
//! and a required type is a subtype of its optional counterpart but not the
//! other way around.

mod parser;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use parser::TypeParseError;
pub(crate) use parser::is_identifier;


/* ===================== Primitive ===================== */

/// Primitive WDL types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    Float,
    Boolean,
    String,
    File,
}

impl Primitive {
    pub const ALL: [Primitive; 5] = [
        Primitive::Int,
        Primitive::Float,
        Primitive::Boolean,
        Primitive::String,
        Primitive::File,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::Int => "Int",
            Primitive::Float => "Float",
            Primitive::Boolean => "Boolean",
            Primitive::String => "String",
            Primitive::File => "File",
        }
    }

    pub fn from_name(name: &str) -> Option<Primitive> {
        Primitive::ALL.iter().copied().find(|p| p.as_str() == name)
    }
}

/* ===================== Type ===================== */

/// The shape of a type, without its optionality
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Primitive(Primitive),
    Array { item: Box<Type>, non_empty: bool },
    Pair(Box<Type>, Box<Type>),
    /// Key is always a primitive type
    Map(Box<Type>, Box<Type>),
    /// A struct referenced by name
    Struct(String),
    /// Untyped `Object`
    Object,
}

/// An immutable WDL type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    kind: TypeKind,
    optional: bool,
}

impl Type {
    pub fn new(kind: TypeKind, optional: bool) -> Self {
        Self { kind, optional }
    }

    pub fn primitive(primitive: Primitive) -> Self {
        Self::new(TypeKind::Primitive(primitive), false)
    }

    pub fn int() -> Self {
        Self::primitive(Primitive::Int)
    }

    pub fn float() -> Self {
        Self::primitive(Primitive::Float)
    }

    pub fn boolean() -> Self {
        Self::primitive(Primitive::Boolean)
    }

    pub fn string() -> Self {
        Self::primitive(Primitive::String)
    }

    pub fn file() -> Self {
        Self::primitive(Primitive::File)
    }

    pub fn array(item: Type) -> Self {
        Self::new(
            TypeKind::Array {
                item: Box::new(item),
                non_empty: false,
            },
            false,
        )
    }

    pub fn pair(left: Type, right: Type) -> Self {
        Self::new(TypeKind::Pair(Box::new(left), Box::new(right)), false)
    }

    pub fn map(key: Primitive, value: Type) -> Self {
        Self::new(
            TypeKind::Map(Box::new(Type::primitive(key)), Box::new(value)),
            false,
        )
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Struct(name.into()), false)
    }

    pub fn object() -> Self {
        Self::new(TypeKind::Object, false)
    }

    /// Parse a type string
    pub fn parse(source: &str) -> Result<Type, TypeParseError> {
        parser::parse_type(source)
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    pub fn is_non_empty(&self) -> bool {
        matches!(self.kind, TypeKind::Array { non_empty: true, .. })
    }

    /// Name of the struct this type refers to, if any
    pub fn struct_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Struct(name) => Some(name),
            _ => None,
        }
    }

    /* ===================== Derivations ===================== */

    /// `T` -> `Array[T]`
    pub fn make_array(&self) -> Type {
        Type::array(self.clone())
    }

    /// `Array[T]` -> `T`; `None` for non-array types
    pub fn make_array_item(&self) -> Option<Type> {
        match &self.kind {
            TypeKind::Array { item, .. } => Some((**item).clone()),
            _ => None,
        }
    }

    /// `T` -> `T?`
    pub fn make_optional(&self) -> Type {
        Type::new(self.kind.clone(), true)
    }

    /// `T?` -> `T`
    pub fn make_required(&self) -> Type {
        Type::new(self.kind.clone(), false)
    }

    /// `Array[T]` -> `Array[T]+`; `None` for non-array types
    pub fn make_not_empty(&self) -> Option<Type> {
        match &self.kind {
            TypeKind::Array { item, .. } => Some(Type::new(
                TypeKind::Array {
                    item: item.clone(),
                    non_empty: true,
                },
                self.optional,
            )),
            _ => None,
        }
    }

    /* ===================== Subtyping ===================== */

    /// Structural subtyping
    ///
    /// Compound kinds are covariant in their element types. `Array[T]+` is a
    /// subtype of `Array[T]`. A struct is a subtype of `Object`.
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        if self.optional && !other.optional {
            return false;
        }

        match (&self.kind, &other.kind) {
            (TypeKind::Primitive(a), TypeKind::Primitive(b)) => a == b,
            (
                TypeKind::Array {
                    item: a,
                    non_empty: a_non_empty,
                },
                TypeKind::Array {
                    item: b,
                    non_empty: b_non_empty,
                },
            ) => (*a_non_empty || !*b_non_empty) && a.is_subtype_of(b),
            (TypeKind::Pair(al, ar), TypeKind::Pair(bl, br)) => {
                al.is_subtype_of(bl) && ar.is_subtype_of(br)
            }
            (TypeKind::Map(ak, av), TypeKind::Map(bk, bv)) => {
                ak.is_subtype_of(bk) && av.is_subtype_of(bv)
            }
            (TypeKind::Struct(a), TypeKind::Struct(b)) => a == b,
            (TypeKind::Struct(_), TypeKind::Object) => true,
            (TypeKind::Object, TypeKind::Object) => true,
            _ => false,
        }
    }

    /// Type of a member access (`pair.left`, `pair.right`) on this type
    ///
    /// Struct members need a struct table and are resolved by the model.
    pub fn pair_member(&self, member: &str) -> Option<Type> {
        match (&self.kind, member) {
            (TypeKind::Pair(left, _), "left") => Some((**left).clone()),
            (TypeKind::Pair(_, right), "right") => Some((**right).clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Primitive(p) => write!(f, "{}", p.as_str())?,
            TypeKind::Array { item, non_empty } => {
                write!(f, "Array[{}]", item)?;
                if *non_empty {
                    write!(f, "+")?;
                }
            }
            TypeKind::Pair(left, right) => write!(f, "Pair[{},{}]", left, right)?,
            TypeKind::Map(key, value) => write!(f, "Map[{},{}]", key, value)?,
            TypeKind::Struct(name) => write!(f, "{}", name)?,
            TypeKind::Object => write!(f, "Object")?,
        }
        if self.optional {
            write!(f, "?")?;
        }
        Ok(())
    }
}

impl FromStr for Type {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Type::parse(s)
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Type::parse(&source).map_err(serde::de::Error::custom)
    }
}
