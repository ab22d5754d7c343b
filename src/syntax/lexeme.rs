/// All lexemes of the expression syntax.
#[derive(Clone, Debug, PartialEq)]
pub enum Lexeme {
    // Symbols
    LParen, // (
    RParen, // )
    Comma,  // ,

    // Literals
    Integer(i64),
    Float(f64),
    Str(String),
    Ident(String),

    // End of input
    Eof,
}

impl Lexeme {
    pub fn description(&self) -> &'static str {
        match self {
            Lexeme::LParen => "'('",
            Lexeme::RParen => "')'",
            Lexeme::Comma => "','",
            Lexeme::Integer(_) => "integer literal",
            Lexeme::Float(_) => "float literal",
            Lexeme::Str(_) => "string literal",
            Lexeme::Ident(_) => "identifier",
            Lexeme::Eof => "end of input",
        }
    }
}
