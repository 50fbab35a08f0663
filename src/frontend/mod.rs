pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod parser_utils;
pub mod position;
pub mod token;
pub mod token_stream;

pub use lexer::{tokenize, Lexer};
pub use parser::Parser;
pub use position::Position;
pub use token::{Token, TokenKind};
pub use token_stream::TokenStream;
