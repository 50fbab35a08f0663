use super::position::Position;

use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    Newline,
    Number,
    String,
    Bool,
    AddEq,
    Add,
    SubEq,
    Sub,
    MulEq,
    Mul,
    DivEq,
    Div,
    PowEq,
    Pow,
    ModEq,
    Mod,
    LSquare,
    RSquare,
    LBracket,
    RBracket,
    Eq,
    Neq,
    Not,
    And,
    Or,
    Gte,
    Lte,
    Gt,
    Lt,
    LPar,
    RPar,
    Dot,
    Comma,
    Colon,
    Assign,
    Type,
    Keyword,
    Identifier,
    Eof,
    NoToken,
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Newline => "NEWLINE",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Bool => "BOOL",
            TokenKind::AddEq => "ADD_EQ",
            TokenKind::Add => "ADD",
            TokenKind::SubEq => "SUB_EQ",
            TokenKind::Sub => "SUB",
            TokenKind::MulEq => "MUL_EQ",
            TokenKind::Mul => "MUL",
            TokenKind::DivEq => "DIV_EQ",
            TokenKind::Div => "DIV",
            TokenKind::PowEq => "POW_EQ",
            TokenKind::Pow => "POW",
            TokenKind::ModEq => "MOD_EQ",
            TokenKind::Mod => "MOD",
            TokenKind::LSquare => "LSQUARE",
            TokenKind::RSquare => "RSQUARE",
            TokenKind::LBracket => "LBRACKET",
            TokenKind::RBracket => "RBRACKET",
            TokenKind::Eq => "EQ",
            TokenKind::Neq => "NEQ",
            TokenKind::Not => "NOT",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Gte => "GTE",
            TokenKind::Lte => "LTE",
            TokenKind::Gt => "GT",
            TokenKind::Lt => "LT",
            TokenKind::LPar => "LPAR",
            TokenKind::RPar => "RPAR",
            TokenKind::Dot => "DOT",
            TokenKind::Comma => "COMMA",
            TokenKind::Colon => "COLON",
            TokenKind::Assign => "ASSIGN",
            TokenKind::Type => "TYPE",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Eof => "EOF",
            TokenKind::NoToken => "NO_TOKEN",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token. String literals keep their quotes.
    pub lexeme: String,
    pub position: Position,
}

impl Token {
    pub fn new<S: Into<String>>(kind: TokenKind, lexeme: S, position: Position) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            position,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Checks kind and text together, e.g. `KEYWORD` + `"while"`.
    pub fn matches(&self, kind: TokenKind, lexeme: &str) -> bool {
        self.kind == kind && self.lexeme == lexeme
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.matches(TokenKind::Keyword, keyword)
    }

    /// True for both the real end of input and the sentinel returned past it.
    pub fn is_end(&self) -> bool {
        matches!(self.kind, TokenKind::Eof | TokenKind::NoToken)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TokenKind::Newline | TokenKind::Eof | TokenKind::NoToken => write!(f, "{}", self.kind),
            _ => write!(f, "{}:{}", self.kind, self.lexeme),
        }
    }
}
