#![forbid(unsafe_code)]

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::{Literal, Span};

/// Stable index of a token in its program's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TokenId(u32);

impl TokenId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Zero-based line and column. The column counts lexemes, not characters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// One source lexeme.
///
/// Equality and hashing only look at the literal, so a token compares equal
/// to the bare value it parses to.
#[derive(Clone, Debug)]
pub struct Token {
    pub id: TokenId,
    pub source: String,
    pub literal: Literal,
    pub position: Position,
    pub span: Span,
}

impl Token {
    pub fn new(id: TokenId, source: impl Into<String>, position: Position, span: Span) -> Self {
        let source = source.into();
        let literal = Literal::infer(&source);
        Self {
            id,
            source,
            literal,
            position,
            span,
        }
    }

    /// Replaces the literal payload and regenerates the source text from it.
    pub fn rebind(&mut self, literal: Literal) {
        self.source = literal.to_string();
        self.literal = literal;
    }

    pub fn symbol(&self) -> Option<&str> {
        self.literal.as_symbol()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.literal == other.literal
    }
}

impl PartialEq<Literal> for Token {
    fn eq(&self, other: &Literal) -> bool {
        &self.literal == other
    }
}

impl PartialEq<f64> for Token {
    fn eq(&self, other: &f64) -> bool {
        self.literal == *other
    }
}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        self.literal == *other
    }
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        self.literal == **other
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.literal.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
