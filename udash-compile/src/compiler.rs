#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::mem;

use tracing::debug;
use udash_ast::{Instruction, Program, Token, TokenId};

use crate::lexer::{Lexeme, LexemeKind};
use crate::CompileError;

/// Label that receives tokens appearing before any explicit label.
pub const ENTRY_LABEL: &str = "main";

struct OpenList {
    opened_by: TokenId,
    items: Vec<Instruction>,
}

/// Groups lexemes into labels and nested list literals.
pub struct Compiler {
    tokens: Vec<Token>,
    labels: BTreeMap<String, Vec<Instruction>>,
    current: String,
    body: Vec<Instruction>,
    // True while `current` is the implicit entry label nobody declared.
    implicit: bool,
    lists: Vec<OpenList>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            labels: BTreeMap::new(),
            current: ENTRY_LABEL.to_string(),
            body: Vec::new(),
            implicit: true,
            lists: Vec::new(),
        }
    }

    pub fn compile(mut self, lexemes: &[Lexeme<'_>]) -> Result<Program, CompileError> {
        for lexeme in lexemes {
            let id = TokenId::new(self.tokens.len());
            self.tokens
                .push(Token::new(id, lexeme.text, lexeme.position, lexeme.span));

            match lexeme.kind {
                LexemeKind::Label => {
                    let name = lexeme.label_name().unwrap_or_default().to_string();
                    self.open_label(name, id)?;
                }
                LexemeKind::Open => self.lists.push(OpenList {
                    opened_by: id,
                    items: Vec::new(),
                }),
                LexemeKind::Close => {
                    let Some(list) = self.lists.pop() else {
                        return Err(self.mismatched(']', id));
                    };
                    self.append(Instruction::List {
                        open: list.opened_by,
                        items: list.items,
                    });
                }
                LexemeKind::Word => self.append(Instruction::Token(id)),
            }
        }

        if let Some(open) = self.lists.last() {
            return Err(self.mismatched('[', open.opened_by));
        }

        self.close_label();
        self.labels.entry(ENTRY_LABEL.to_string()).or_default();

        debug!(
            labels = self.labels.len(),
            tokens = self.tokens.len(),
            "program compiled"
        );
        Ok(Program::from_parts(self.tokens, self.labels))
    }

    fn open_label(&mut self, name: String, id: TokenId) -> Result<(), CompileError> {
        let token = &self.tokens[id.index()];
        if !self.lists.is_empty() {
            return Err(CompileError::LabelInList {
                name,
                span: token.span,
                position: token.position,
            });
        }

        self.close_label();
        if self.labels.contains_key(&name) {
            let token = &self.tokens[id.index()];
            return Err(CompileError::Redefinition {
                name,
                span: token.span,
                position: token.position,
            });
        }

        self.current = name;
        self.implicit = false;
        Ok(())
    }

    fn close_label(&mut self) {
        let body = mem::take(&mut self.body);
        let name = mem::take(&mut self.current);
        if self.implicit && body.is_empty() {
            return;
        }
        self.labels.insert(name, body);
    }

    fn append(&mut self, instruction: Instruction) {
        match self.lists.last_mut() {
            Some(list) => list.items.push(instruction),
            None => self.body.push(instruction),
        }
    }

    fn mismatched(&self, bracket: char, id: TokenId) -> CompileError {
        let token = &self.tokens[id.index()];
        CompileError::MismatchedBracket {
            bracket,
            span: token.span,
            position: token.position,
        }
    }
}
