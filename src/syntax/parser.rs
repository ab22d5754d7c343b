use super::lexeme::Lexeme;
use crate::diagnostic::Diagnostic;
use crate::pset::{Node, PrimitiveSet};
use crate::span::{Span, Spanned};
use crate::tree::MAX_DEPTH;
use crate::value::Value;

/// Parses call-form expressions (`add(x, neg(3))`) into a prefix-order
/// node sequence against a primitive set.
pub(crate) struct Parser<'p> {
    tokens: Vec<Spanned<Lexeme>>,
    pos: usize,
    pset: &'p PrimitiveSet,
    nodes: Vec<Node>,
    diagnostics: Vec<Diagnostic>,
    depth: usize,
}

impl<'p> Parser<'p> {
    pub(crate) fn new(tokens: Vec<Spanned<Lexeme>>, pset: &'p PrimitiveSet) -> Self {
        Self {
            tokens,
            pos: 0,
            pset,
            nodes: Vec::new(),
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    pub(crate) fn parse_expression(mut self) -> Result<Vec<Node>, Vec<Diagnostic>> {
        self.parse_expr();
        if !self.at(&Lexeme::Eof) && self.diagnostics.is_empty() {
            self.error_with_help(
                &format!(
                    "unexpected {} after the end of the expression",
                    self.peek().description()
                ),
                "an individual is a single expression rooted at one primitive or terminal",
            );
        }
        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok(self.nodes)
    }

    fn parse_expr(&mut self) {
        if !self.enter_nesting() {
            return;
        }
        let span = self.current_span();
        match self.peek().clone() {
            Lexeme::Ident(name) => {
                self.advance();
                if self.at(&Lexeme::LParen) {
                    self.parse_call(name, span);
                } else {
                    self.parse_terminal(&name, span);
                }
            }
            Lexeme::Integer(n) => {
                self.advance();
                self.nodes.push(PrimitiveSet::literal(n));
            }
            Lexeme::Float(x) => {
                self.advance();
                self.nodes.push(PrimitiveSet::literal(x));
            }
            Lexeme::Str(s) => {
                self.advance();
                self.nodes.push(PrimitiveSet::literal(Value::Text(s)));
            }
            other => {
                self.error_at_current(&format!("expected expression, found {}", other.description()));
                // Skip the offending token so the caller's arity checks still line up.
                if !self.at(&Lexeme::Eof) {
                    self.advance();
                }
            }
        }
        self.exit_nesting();
    }

    fn parse_call(&mut self, name: String, name_span: Span) {
        let node = self.pset.primitive(&name);
        match &node {
            Some(n) => self.nodes.push(n.clone()),
            None => {
                let mut diag = Diagnostic::error(
                    format!("unknown primitive '{}' in set '{}'", name, self.pset.name()),
                    name_span,
                );
                if self.pset.terminal(&name).is_some() {
                    diag = diag.with_help(format!("'{}' is a terminal; drop the parentheses", name));
                }
                self.diagnostics.push(diag);
            }
        }

        self.expect(&Lexeme::LParen);
        let mut args = 0usize;
        if !self.at(&Lexeme::RParen) {
            loop {
                self.parse_expr();
                args += 1;
                if !self.eat(&Lexeme::Comma) || self.at(&Lexeme::Eof) {
                    break;
                }
            }
        }
        let close = self.expect(&Lexeme::RParen);

        if let Some(node) = node {
            if node.arity() != args {
                self.diagnostics.push(
                    Diagnostic::error(
                        format!(
                            "primitive '{}' takes {} argument(s), found {}",
                            name,
                            node.arity(),
                            args
                        ),
                        name_span.merge(close),
                    )
                    .with_note("prefix-order reconstruction relies on exact arities".to_string()),
                );
            }
        }
    }

    fn parse_terminal(&mut self, name: &str, span: Span) {
        if let Some(node) = self.pset.terminal(name) {
            self.nodes.push(node);
            return;
        }
        let literal = match name {
            "True" => Some(Value::Bool(true)),
            "False" => Some(Value::Bool(false)),
            "inf" => Some(Value::Float(f64::INFINITY)),
            "nan" => Some(Value::Float(f64::NAN)),
            _ => None,
        };
        if let Some(v) = literal {
            self.nodes.push(PrimitiveSet::literal(v));
            return;
        }
        let mut diag = Diagnostic::error(
            format!("unknown terminal '{}' in set '{}'", name, self.pset.name()),
            span,
        );
        if let Some(prim) = self.pset.primitive(name) {
            diag = diag.with_help(format!(
                "'{}' is a primitive of arity {}; call it as `{}(...)`",
                name,
                prim.arity(),
                name
            ));
        } else if !self.pset.arguments().is_empty() {
            diag = diag.with_note(format!(
                "arguments of this set: {}",
                self.pset.arguments().join(", ")
            ));
        }
        self.diagnostics.push(diag);
    }

    // --- token helpers ---

    fn enter_nesting(&mut self) -> bool {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            self.error_with_help(
                &format!("nesting depth exceeded (maximum {} levels)", MAX_DEPTH),
                "expression trees this deep cannot be rendered meaningfully",
            );
            self.depth -= 1;
            return false;
        }
        true
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    fn peek(&self) -> &Lexeme {
        &self.tokens[self.pos].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn advance(&mut self) -> &Spanned<Lexeme> {
        let tok = &self.tokens[self.pos];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, token: &Lexeme) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Lexeme) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Lexeme) -> Span {
        let span = self.current_span();
        if self.at(token) {
            self.advance();
        } else {
            self.error_at_current(&format!(
                "expected {}, found {}",
                token.description(),
                self.peek().description()
            ));
        }
        span
    }

    fn error_at_current(&mut self, msg: &str) {
        self.diagnostics
            .push(Diagnostic::error(msg.to_string(), self.current_span()));
    }

    fn error_with_help(&mut self, msg: &str, help: &str) {
        self.diagnostics.push(
            Diagnostic::error(msg.to_string(), self.current_span()).with_help(help.to_string()),
        );
    }
}
