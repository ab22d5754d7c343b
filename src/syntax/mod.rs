//! Expression strings: the textual form a tree formats itself into.
//!
//! `add(x, protectedDiv(3, neg(x)))` parses back into the prefix-order node
//! sequence it was printed from, which is what lets a formatted tree be
//! compiled again.

mod lexeme;
mod lexer;
mod parser;


use crate::diagnostic::Diagnostic;
use crate::error::{Result, TreeError};
use crate::pset::{Node, PrimitiveSet};

pub use lexeme::Lexeme;

use lexer::Lexer;
use parser::Parser;

/// Parse an expression into its prefix-order node sequence, returning the
/// raw diagnostics on failure.
pub fn parse_expression(source: &str, pset: &PrimitiveSet) -> Result<Vec<Node>, Vec<Diagnostic>> {
    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }
    Parser::new(tokens, pset).parse_expression()
}

impl PrimitiveSet {
    /// Parse an expression string into a prefix-order node sequence.
    pub fn parse(&self, source: &str) -> Result<Vec<Node>> {
        parse_expression(source, self).map_err(TreeError::Parse)
    }
}
