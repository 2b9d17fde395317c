use std::collections::HashMap;
use std::mem;

use crate::error::{CompileError, CompileResult};
use crate::lexer::lexer::Lexer;
use crate::lexer::token::{Token, TokenKind};
use crate::types::types::Type;

/// Implemented by every AST node that can be parsed from the token
/// stream. Parsing consumes all of the node's tokens, leaving the
/// parser positioned on the first token after the construct.
pub trait Parse: Sized {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self>;
}

/// A name bound in some lexical scope: its declared type and the
/// identifier token of the declaration (for diagnostics).
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub token: Token,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn contains_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn get_symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }
}

#[derive(Debug)]
pub struct Parser<'a> {
    lexer: &'a mut Lexer,
    pub current_token: Token,
    pub next_token: Token,
    scopes: Vec<SymbolTable>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: &'a mut Lexer) -> CompileResult<Self> {
        let current_token = Self::fetch(lexer)?;
        let next_token = Self::fetch(lexer)?;

        Ok(Self {
            lexer,
            current_token,
            next_token,
            scopes: vec![],
        })
    }

    /// Pulls one token from the lexer. Unrecognised bytes are fatal here;
    /// past the terminal Eof the window is padded with Eof tokens.
    fn fetch(lexer: &mut Lexer) -> CompileResult<Token> {
        match lexer.next_token()? {
            Some(tok) if tok.kind == TokenKind::None => {
                Err(CompileError::at(&tok, "unrecognised byte"))
            }
            Some(tok) => Ok(tok),
            None => Ok(Token {
                kind: TokenKind::Eof,
                ..Default::default()
            }),
        }
    }

    /// Consumes and returns the current token, shifting the window.
    pub(crate) fn bump(&mut self) -> CompileResult<Token> {
        let fetched = Self::fetch(self.lexer)?;
        let old_next = mem::replace(&mut self.next_token, fetched);
        Ok(mem::replace(&mut self.current_token, old_next))
    }

    pub(crate) fn current_is(&self, kind: TokenKind) -> bool {
        self.current_token.kind == kind
    }

    pub(crate) fn next_is(&self, kind: TokenKind) -> bool {
        self.next_token.kind == kind
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::at(&self.current_token, message)
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(SymbolTable::default());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declares a name in the innermost scope. Redeclaring a name that the
    /// same scope already holds is fatal.
    pub(crate) fn declare(&mut self, symbol: Symbol) -> CompileResult<()> {
        let Some(table) = self.scopes.last_mut() else {
            return Err(CompileError::at(&symbol.token, "Invalid statement."));
        };

        if let Some(existing) = table.get_symbol(&symbol.name) {
            let message = format!(
                "Redeclaration of an already existing name '{}' in the same context previously defined @ line ({}, {}).",
                symbol.name, existing.token.span.line, existing.token.span.cur
            );
            return Err(CompileError::at(&symbol.token, message));
        }

        table.add_symbol(symbol);
        Ok(())
    }

    /// Resolves a name against the scope stack, innermost first.
    pub(crate) fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|table| table.get_symbol(name))
    }
}
