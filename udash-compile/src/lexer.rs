#![forbid(unsafe_code)]

use logos::Logos;
use udash_ast::{span_between, Position, Span};

use crate::CompileError;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\f\r\n\v]+")]
enum RawToken {
    #[token("[", priority = 3)]
    Open,
    #[token("]", priority = 3)]
    Close,
    #[regex(r"[^ \t\f\r\n\v]+")]
    Word,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LexemeKind {
    Open,
    Close,
    /// Label header such as `main:`; the text keeps the trailing colon.
    Label,
    Word,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lexeme<'a> {
    pub kind: LexemeKind,
    pub text: &'a str,
    pub position: Position,
    pub span: Span,
}

impl Lexeme<'_> {
    /// Label name without the trailing colon.
    pub fn label_name(&self) -> Option<&str> {
        match self.kind {
            LexemeKind::Label => self.text.strip_suffix(':'),
            _ => None,
        }
    }
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    /// Splits the source into lexemes, dropping blank lines and lines whose
    /// first lexeme starts with `#`.
    pub fn lex(&self) -> Result<Vec<Lexeme<'a>>, CompileError> {
        let mut out = Vec::new();
        let mut line_start = 0usize;

        for (line_no, line) in self.src.split_inclusive('\n').enumerate() {
            let line_end = line_start + line.len();

            let mut lex = RawToken::lexer(line);
            let mut column = 0u32;
            while let Some(raw) = lex.next() {
                let range = lex.span();
                let span = span_between(line_start + range.start, line_start + range.end);
                let position = Position::new(line_no as u32, column);
                let text = lex.slice();

                let kind = match raw {
                    Ok(RawToken::Open) => LexemeKind::Open,
                    Ok(RawToken::Close) => LexemeKind::Close,
                    Ok(RawToken::Word) if text.len() > 1 && text.ends_with(':') => {
                        LexemeKind::Label
                    }
                    Ok(RawToken::Word) => LexemeKind::Word,
                    Err(()) => {
                        return Err(CompileError::Unexpected {
                            text: text.to_string(),
                            span,
                            position,
                        });
                    }
                };

                // Comment line.
                if column == 0 && text.starts_with('#') {
                    break;
                }

                out.push(Lexeme {
                    kind,
                    text,
                    position,
                    span,
                });
                column += 1;
            }

            line_start = line_end;
        }

        Ok(out)
    }
}
