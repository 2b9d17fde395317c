use std::fmt::Display;

use serde::Serialize;

use crate::lexer::token::{Token, TokenKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum FundamentalType {
    #[default]
    Void,
    Integer32,
    Integer64,
    Boolean,
    Character,
    String,
    UserDefined,
}

/// A CM type. `length` is the element count for arrays (0 for scalars),
/// `size` is the bit width of one element, `fields` is reserved for
/// user-defined types.
#[derive(Clone, Debug, Eq, Serialize)]
pub struct Type {
    pub name: String,
    pub ftype: FundamentalType,
    pub fields: Vec<Type>,
    pub length: usize,
    pub size: u8,
}

impl Default for Type {
    fn default() -> Self {
        Self {
            name: "Void".to_string(),
            ftype: FundamentalType::Void,
            fields: vec![],
            length: 0,
            size: 0,
        }
    }
}

// Equality is structural over {ftype, name, length}; fields and bit
// width do not participate.
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.ftype == other.ftype && self.name == other.name && self.length == other.length
    }
}

impl Type {
    pub fn integer32() -> Self {
        Self {
            name: "Integer32".to_string(),
            ftype: FundamentalType::Integer32,
            size: 32,
            ..Default::default()
        }
    }

    pub fn integer64() -> Self {
        Self {
            name: "Integer64".to_string(),
            ftype: FundamentalType::Integer64,
            size: 64,
            ..Default::default()
        }
    }

    pub fn string() -> Self {
        Self {
            name: "CString".to_string(),
            ftype: FundamentalType::String,
            size: 8,
            ..Default::default()
        }
    }

    pub fn character() -> Self {
        Self {
            name: "Character8".to_string(),
            ftype: FundamentalType::Character,
            size: 8,
            ..Default::default()
        }
    }

    pub fn boolean() -> Self {
        Self {
            name: "Boolean".to_string(),
            ftype: FundamentalType::Boolean,
            size: 8,
            ..Default::default()
        }
    }

    /// Maps a type-specifier token to its type. Identifiers become
    /// user-defined markers; anything else is not a type.
    pub fn from_token(token: &Token) -> Option<Type> {
        match token.kind {
            TokenKind::I32 => Some(Self::integer32()),
            TokenKind::I64 => Some(Self::integer64()),
            TokenKind::String => Some(Self::string()),
            TokenKind::Bool => Some(Self::boolean()),
            TokenKind::Char => Some(Self::character()),
            TokenKind::Identifier => Some(Self {
                name: token.span.text.clone(),
                ftype: FundamentalType::UserDefined,
                ..Default::default()
            }),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.length > 0
    }

    pub fn is_void(&self) -> bool {
        self.ftype == FundamentalType::Void
    }

    /// The scalar type of one element of an array type.
    pub fn element(&self) -> Type {
        Type {
            length: 0,
            fields: vec![],
            ..self.clone()
        }
    }

    /// Storage span in bytes: element width times element count.
    pub fn byte_size(&self) -> usize {
        (usize::from(self.size) / 8) * std::cmp::max(1, self.length)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_array() {
            write!(f, "{}[{}]", self.name, self.length)
        } else {
            write!(f, "{}", self.name)
        }
    }
}
