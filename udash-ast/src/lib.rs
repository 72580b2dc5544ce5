#![forbid(unsafe_code)]

mod literal;
mod program;
mod token;

use miette::SourceSpan;

pub use literal::Literal;
pub use program::{Instruction, Program};
pub use token::{Position, Token, TokenId};

pub type Span = SourceSpan;

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}
