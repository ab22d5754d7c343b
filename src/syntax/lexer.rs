use super::lexeme::Lexeme;
use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};

pub(crate) struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub(crate) fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn tokenize(mut self) -> (Vec<Spanned<Lexeme>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.node == Lexeme::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Spanned<Lexeme> {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            if self.pos >= self.source.len() {
                return self.make_token(Lexeme::Eof, self.pos, self.pos);
            }

            let start = self.pos;
            let ch = self.source[self.pos];

            if is_ident_start(ch) {
                return self.scan_ident();
            }

            // Negative literals are produced by ephemeral constants: `add(-1, x)`
            let signed = (ch == b'-' || ch == b'+')
                && self.peek_at(1).is_some_and(|c| c.is_ascii_digit() || c == b'.');
            let leading_dot = ch == b'.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
            if ch.is_ascii_digit() || signed || leading_dot {
                return self.scan_number();
            }
            if (ch == b'-' || ch == b'+') && self.at_word(1, b"inf") {
                self.pos += 4;
                let x = if ch == b'-' { f64::NEG_INFINITY } else { f64::INFINITY };
                return self.make_token(Lexeme::Float(x), start, self.pos);
            }

            if ch == b'"' || ch == b'\'' {
                return self.scan_string(ch);
            }

            self.pos += 1;
            let token = match ch {
                b'(' => Lexeme::LParen,
                b')' => Lexeme::RParen,
                b',' => Lexeme::Comma,
                _ => {
                    self.diagnostics.push(
                        Diagnostic::error(
                            format!("unexpected character '{}'", ch as char),
                            Span::new(start as u32, self.pos as u32),
                        )
                        .with_help(
                            "expressions are written in call form, e.g. `add(x, 3)`".to_string(),
                        ),
                    );
                    continue;
                }
            };
            return self.make_token(token, start, self.pos);
        }
    }

    fn scan_ident(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        self.make_token(Lexeme::Ident(text), start, self.pos)
    }

    fn scan_number(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        if matches!(self.source[self.pos], b'-' | b'+') {
            self.pos += 1;
        }
        let mut is_float = false;
        while self.pos < self.source.len() {
            let c = self.source[self.pos];
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == b'.' && !is_float {
                is_float = true;
                self.pos += 1;
            } else if (c == b'e' || c == b'E')
                && self
                    .peek_at(1)
                    .is_some_and(|n| n.is_ascii_digit() || n == b'-' || n == b'+')
            {
                is_float = true;
                self.pos += 2;
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        let span = Span::new(start as u32, self.pos as u32);
        let token = if is_float {
            match text.parse::<f64>() {
                Ok(x) => Lexeme::Float(x),
                Err(_) => {
                    self.diagnostics.push(Diagnostic::error(
                        format!("malformed float literal '{}'", text),
                        span,
                    ));
                    Lexeme::Float(0.0)
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => Lexeme::Integer(n),
                Err(_) => {
                    self.diagnostics.push(
                        Diagnostic::error(format!("integer literal '{}' is too large", text), span)
                            .with_help(format!("integer literals must fit in {} bits", i64::BITS)),
                    );
                    Lexeme::Integer(0)
                }
            }
        };
        self.make_token(token, start, self.pos)
    }

    fn scan_string(&mut self, quote: u8) -> Spanned<Lexeme> {
        let start = self.pos;
        self.pos += 1;
        let mut text = Vec::new();
        while self.pos < self.source.len() && self.source[self.pos] != quote {
            let mut c = self.source[self.pos];
            if c == b'\\' && self.pos + 1 < self.source.len() {
                self.pos += 1;
                c = match self.source[self.pos] {
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    b'0' => 0,
                    other => other,
                };
            }
            text.push(c);
            self.pos += 1;
        }
        if self.pos < self.source.len() {
            self.pos += 1;
        } else {
            self.diagnostics.push(Diagnostic::error(
                "unterminated string literal".to_string(),
                Span::new(start as u32, self.pos as u32),
            ));
        }
        let text = String::from_utf8_lossy(&text).into_owned();
        self.make_token(Lexeme::Str(text), start, self.pos)
    }

    /// True if `word` starts at `offset` and is not the prefix of a longer identifier.
    fn at_word(&self, offset: usize, word: &[u8]) -> bool {
        let from = self.pos + offset;
        self.source.get(from..from + word.len()) == Some(word)
            && !self
                .peek_at(offset + word.len())
                .is_some_and(is_ident_continue)
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn make_token(&self, token: Lexeme, start: usize, end: usize) -> Spanned<Lexeme> {
        Spanned::new(token, Span::new(start as u32, end as u32))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}
