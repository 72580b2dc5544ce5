#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashMap};

use crate::{Literal, Position, Token, TokenId};

/// A single executable step of a label body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Token(TokenId),
    /// A bracketed list literal, possibly nested. `open` is the `[` token.
    List { open: TokenId, items: Vec<Instruction> },
}

impl Instruction {
    /// The token this instruction is attributed to.
    pub fn token_id(&self) -> TokenId {
        match self {
            Instruction::Token(id) => *id,
            Instruction::List { open, .. } => *open,
        }
    }
}

/// Compiled program: label name -> instruction sequence, plus the token arena
/// every `TokenId` in the bodies points into.
#[derive(Clone, Debug, Default)]
pub struct Program {
    tokens: Vec<Token>,
    labels: BTreeMap<String, Vec<Instruction>>,
    by_position: HashMap<Position, TokenId>,
}

impl Program {
    /// Assembles a program. `tokens[i].id` must equal `TokenId::new(i)`.
    pub fn from_parts(tokens: Vec<Token>, labels: BTreeMap<String, Vec<Instruction>>) -> Self {
        debug_assert!(tokens.iter().enumerate().all(|(i, t)| t.id.index() == i));
        let by_position = tokens.iter().map(|t| (t.position, t.id)).collect();
        Self {
            tokens,
            labels,
            by_position,
        }
    }

    pub fn label(&self, name: &str) -> Option<&[Instruction]> {
        self.labels.get(name).map(Vec::as_slice)
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, &[Instruction])> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    /// Panics if `id` was not minted for this program.
    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id.index()]
    }

    pub fn get_token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id.index())
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token_at(&self, position: Position) -> Option<&Token> {
        self.by_position.get(&position).map(|id| self.token(*id))
    }

    /// Rebinds a token's literal (e.g. after the user drags a point in the
    /// editor). Returns `false` for an unknown id.
    pub fn rebind(&mut self, id: TokenId, literal: Literal) -> bool {
        match self.tokens.get_mut(id.index()) {
            Some(token) => {
                token.rebind(literal);
                true
            }
            None => false,
        }
    }
}
