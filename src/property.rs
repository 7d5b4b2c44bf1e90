//! Property types and their lookup tables.
//!
//! A [`PropertyType`] tags every branch. The text format names types with
//! reserved keywords, the binary format with a single signed byte, and the
//! text parser restricts which token kinds may spell a value of each type.
//! All three mappings live in static tables here so the lexer, parser and
//! both serializers agree.
//!
//! | Keyword            | Type      | Wire | Value tokens          |
//! |--------------------|-----------|------|-----------------------|
//! | `object`           | Object    | 0    | –                     |
//! | `array`            | Array     | 1    | –                     |
//! | `string`           | String    | 2    | String, Identifier    |
//! | `bool`             | Bool      | 3    | String, Identifier    |
//! | `float`            | Float32   | 4    | Integer, Decimal      |
//! | `float64`          | Float64   | 5    | Integer, Decimal      |
//! | `int8`             | Int8      | 6    | Integer               |
//! | `int16`            | Int16     | 7    | Integer               |
//! | `int32`, `int`     | Int32     | 8    | Integer               |
//! | `int64`            | Int64     | 9    | Integer               |
//! | `uint8`            | UInt8     | 10   | Integer               |
//! | `uint16`           | UInt16    | 11   | Integer               |
//! | `uint32`, `uint`   | UInt32    | 12   | Integer               |
//! | `uint64`           | UInt64    | 13   | Integer               |
//! | `float16`          | Float16   | 14   | Integer, Decimal      |

use crate::lexer::TokenKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The type tag of a branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Object,
    Array,
    String,
    Bool,
    Float16,
    #[serde(rename = "float", alias = "float32")]
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

/// Reserved typename keywords, aliases included. Order matters only for
/// readability; lookups are exact-match.
const KEYWORDS: &[(&str, PropertyType)] = &[
    ("string", PropertyType::String),
    ("bool", PropertyType::Bool),
    ("object", PropertyType::Object),
    ("array", PropertyType::Array),
    ("uint8", PropertyType::UInt8),
    ("uint16", PropertyType::UInt16),
    ("uint32", PropertyType::UInt32),
    ("uint", PropertyType::UInt32),
    ("uint64", PropertyType::UInt64),
    ("int8", PropertyType::Int8),
    ("int16", PropertyType::Int16),
    ("int32", PropertyType::Int32),
    ("int", PropertyType::Int32),
    ("int64", PropertyType::Int64),
    ("float16", PropertyType::Float16),
    ("float", PropertyType::Float32),
    ("float64", PropertyType::Float64),
];

const WIRE_CODES: &[(i8, PropertyType)] = &[
    (0, PropertyType::Object),
    (1, PropertyType::Array),
    (2, PropertyType::String),
    (3, PropertyType::Bool),
    (4, PropertyType::Float32),
    (5, PropertyType::Float64),
    (6, PropertyType::Int8),
    (7, PropertyType::Int16),
    (8, PropertyType::Int32),
    (9, PropertyType::Int64),
    (10, PropertyType::UInt8),
    (11, PropertyType::UInt16),
    (12, PropertyType::UInt32),
    (13, PropertyType::UInt64),
    (14, PropertyType::Float16),
];

const TEXTUAL: &[TokenKind] = &[TokenKind::String, TokenKind::Identifier];
const INTEGRAL: &[TokenKind] = &[TokenKind::Integer];
const DECIMAL: &[TokenKind] = &[TokenKind::Integer, TokenKind::Decimal];

impl PropertyType {
    /// Every property type, in wire-code order.
    pub const ALL: [PropertyType; 15] = [
        PropertyType::Object,
        PropertyType::Array,
        PropertyType::String,
        PropertyType::Bool,
        PropertyType::Float32,
        PropertyType::Float64,
        PropertyType::Int8,
        PropertyType::Int16,
        PropertyType::Int32,
        PropertyType::Int64,
        PropertyType::UInt8,
        PropertyType::UInt16,
        PropertyType::UInt32,
        PropertyType::UInt64,
        PropertyType::Float16,
    ];

    /// Looks up a typename keyword, including the `int`/`uint` shorthands.
    ///
    /// ```rust
    /// use acm::PropertyType;
    ///
    /// assert_eq!(PropertyType::from_keyword("uint"), Some(PropertyType::UInt32));
    /// assert_eq!(PropertyType::from_keyword("float"), Some(PropertyType::Float32));
    /// assert_eq!(PropertyType::from_keyword("Int32"), None);
    /// ```
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<PropertyType> {
        KEYWORDS
            .iter()
            .find(|(word, _)| *word == keyword)
            .map(|(_, ty)| *ty)
    }

    /// Returns `true` if `word` is a reserved typename.
    #[must_use]
    pub fn is_keyword(word: &str) -> bool {
        Self::from_keyword(word).is_some()
    }

    /// Canonical keyword written by the text serializer.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            PropertyType::Object => "object",
            PropertyType::Array => "array",
            PropertyType::String => "string",
            PropertyType::Bool => "bool",
            PropertyType::Float16 => "float16",
            PropertyType::Float32 => "float",
            PropertyType::Float64 => "float64",
            PropertyType::Int8 => "int8",
            PropertyType::Int16 => "int16",
            PropertyType::Int32 => "int32",
            PropertyType::Int64 => "int64",
            PropertyType::UInt8 => "uint8",
            PropertyType::UInt16 => "uint16",
            PropertyType::UInt32 => "uint32",
            PropertyType::UInt64 => "uint64",
        }
    }

    #[must_use]
    pub fn wire_code(&self) -> i8 {
        WIRE_CODES
            .iter()
            .find(|(_, ty)| ty == self)
            .map(|(code, _)| *code)
            .unwrap_or(-1)
    }

    #[must_use]
    pub fn from_wire_code(code: i8) -> Option<PropertyType> {
        WIRE_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, ty)| *ty)
    }

    /// Token kinds the text parser accepts as a value of this type.
    /// Containers accept none.
    #[must_use]
    pub const fn accepted_tokens(&self) -> &'static [TokenKind] {
        match self {
            PropertyType::Object | PropertyType::Array => &[],
            PropertyType::String | PropertyType::Bool => TEXTUAL,
            PropertyType::Float16 | PropertyType::Float32 | PropertyType::Float64 => DECIMAL,
            _ => INTEGRAL,
        }
    }

    #[must_use]
    pub fn accepts(&self, kind: TokenKind) -> bool {
        self.accepted_tokens().contains(&kind)
    }

    #[inline]
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, PropertyType::Object | PropertyType::Array)
    }

    /// Fixed payload width in the binary format. `None` for strings and
    /// containers.
    #[must_use]
    pub const fn payload_width(&self) -> Option<usize> {
        match self {
            PropertyType::Bool | PropertyType::Int8 | PropertyType::UInt8 => Some(1),
            PropertyType::Float16 | PropertyType::Int16 | PropertyType::UInt16 => Some(2),
            PropertyType::Float32 | PropertyType::Int32 | PropertyType::UInt32 => Some(4),
            PropertyType::Float64 | PropertyType::Int64 | PropertyType::UInt64 => Some(8),
            PropertyType::String | PropertyType::Object | PropertyType::Array => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
