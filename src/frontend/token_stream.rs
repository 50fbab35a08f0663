use super::position::Position;
use super::token::{Token, TokenKind};

/// Saved cursor location. Restoring consumes it, so a speculative parse can rewind
/// at most once per anchor.
#[derive(Debug)]
pub struct Anchor {
    index: usize,
}

/// Cursor over lexed tokens. `NEWLINE` tokens are skipped transparently.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    index: usize,
    no_token: Token,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        let past_end = match tokens.last() {
            Some(last) => last.position.next_after(0),
            None => Position::default(),
        };

        let mut stream = TokenStream {
            tokens,
            index: 0,
            no_token: Token::new(TokenKind::NoToken, "", past_end),
        };
        stream.skip_newlines();
        stream
    }

    /// Token under the cursor, or the sentinel once past the end.
    pub fn current(&self) -> &Token {
        self.tokens.get(self.index).unwrap_or(&self.no_token)
    }

    /// First significant token after the current one.
    pub fn peek(&self) -> &Token {
        self.tokens
            .iter()
            .skip(self.index + 1)
            .find(|token| !token.is(TokenKind::Newline))
            .unwrap_or(&self.no_token)
    }

    pub fn advance(&mut self) {
        if self.index < self.tokens.len() {
            self.index += 1;
            self.skip_newlines();
        }
    }

    pub fn anchor(&self) -> Anchor {
        Anchor { index: self.index }
    }

    pub fn restore(&mut self, anchor: Anchor) {
        self.index = anchor.index;
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn skip_newlines(&mut self) {
        while self
            .tokens
            .get(self.index)
            .map_or(false, |token| token.is(TokenKind::Newline))
        {
            self.index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokenize;

    #[test]
    fn test_newlines_are_skipped() {
        let mut stream = TokenStream::new(tokenize("a\n\nb").unwrap());
        assert_eq!(stream.current().lexeme, "a");
        assert_eq!(stream.peek().lexeme, "b");
        stream.advance();
        assert_eq!(stream.current().lexeme, "b");
        stream.advance();
        assert!(stream.current().is(TokenKind::Eof));
    }

    #[test]
    fn test_reading_past_end_yields_sentinel() {
        let mut stream = TokenStream::new(tokenize("x").unwrap());
        for _ in 0..5 {
            stream.advance();
        }
        assert!(stream.current().is(TokenKind::NoToken));
        assert!(stream.current().is_end());
    }

    #[test]
    fn test_anchor_rewinds() {
        let mut stream = TokenStream::new(tokenize("Point p = q").unwrap());
        let anchor = stream.anchor();
        stream.advance();
        stream.advance();
        assert!(stream.current().is(TokenKind::Assign));
        stream.restore(anchor);
        assert_eq!(stream.current().lexeme, "Point");
    }
}
