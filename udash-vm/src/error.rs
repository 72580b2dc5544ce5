#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;
use udash_ast::{Span, Token};

#[derive(Clone, Debug, PartialEq, Error, Diagnostic)]
pub enum ErrorKind {
    #[error("stack underflow")]
    #[diagnostic(code(udash::vm::stack_underflow))]
    StackUnderflow,

    #[error("expected {expected}, found {found}")]
    #[diagnostic(code(udash::vm::type_mismatch))]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("redefinition of `{name}`")]
    #[diagnostic(code(udash::vm::redefinition))]
    Redefinition { name: String },

    #[error("unknown label `{name}`")]
    #[diagnostic(code(udash::vm::unknown_label))]
    UnknownLabel { name: String },

    #[error("invalid operand: {0}")]
    #[diagnostic(code(udash::vm::invalid_operand))]
    InvalidOperand(String),

    #[error("layout stack underflow")]
    #[diagnostic(code(udash::vm::layout_underflow))]
    LayoutUnderflow,

    #[error("nesting deeper than {limit}")]
    #[diagnostic(code(udash::vm::depth_limit))]
    DepthLimit { limit: usize },
}

/// A runtime failure, pinned to the innermost token that was executing.
#[derive(Clone, Debug, PartialEq, Error, Diagnostic)]
#[error("{kind}{}", location(.token))]
#[diagnostic(forward(kind))]
pub struct VmError {
    pub kind: ErrorKind,
    pub token: Option<Token>,
    #[label("here")]
    span: Option<Span>,
}

fn location(token: &Option<Token>) -> String {
    token
        .as_ref()
        .map(|t| format!(" at {} (`{}`)", t.position, t.source))
        .unwrap_or_default()
}

impl VmError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            token: None,
            span: None,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Attaches `token` unless a more specific one is already set.
    pub(crate) fn at(mut self, token: &Token) -> Self {
        if self.token.is_none() {
            self.span = Some(token.span);
            self.token = Some(token.clone());
        }
        self
    }

    pub(crate) fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, found })
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOperand(message.into()))
    }
}

impl From<ErrorKind> for VmError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

pub type Result<T, E = VmError> = std::result::Result<T, E>;
