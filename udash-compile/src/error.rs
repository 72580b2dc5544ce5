#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;
use udash_ast::{Position, Span};

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CompileError {
    #[error("mismatched `{bracket}` at {position}")]
    #[diagnostic(code(udash::compile::mismatched_bracket))]
    MismatchedBracket {
        bracket: char,
        #[label("no matching bracket")]
        span: Span,
        position: Position,
    },

    #[error("redefinition of label `{name}` at {position}")]
    #[diagnostic(code(udash::compile::redefinition))]
    Redefinition {
        name: String,
        #[label("already defined")]
        span: Span,
        position: Position,
    },

    #[error("label `{name}` opened inside a list literal at {position}")]
    #[diagnostic(code(udash::compile::label_in_list), help("close the list with `]` first"))]
    LabelInList {
        name: String,
        #[label]
        span: Span,
        position: Position,
    },

    #[error("unexpected input `{text}` at {position}")]
    #[diagnostic(code(udash::compile::lex))]
    Unexpected {
        text: String,
        #[label]
        span: Span,
        position: Position,
    },
}

impl CompileError {
    pub fn position(&self) -> Position {
        match self {
            CompileError::MismatchedBracket { position, .. }
            | CompileError::Redefinition { position, .. }
            | CompileError::LabelInList { position, .. }
            | CompileError::Unexpected { position, .. } => *position,
        }
    }
}
