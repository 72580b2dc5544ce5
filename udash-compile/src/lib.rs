#![forbid(unsafe_code)]

mod compiler;
mod error;
mod lexer;

pub use compiler::{Compiler, ENTRY_LABEL};
pub use error::CompileError;
pub use lexer::{Lexeme, LexemeKind, Lexer};

use udash_ast::Program;

/// Compiles source text into a [`Program`].
pub fn compile(src: &str) -> Result<Program, CompileError> {
    let lexemes = Lexer::new(src).lex()?;
    Compiler::new().compile(&lexemes)
}

/// Convenience for hosts that report errors through `miette`.
pub fn compile_source(src: &str) -> miette::Result<Program> {
    Ok(compile(src)?)
}
