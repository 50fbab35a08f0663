use super::position::Position;
use super::token::{Token, TokenKind};
use crate::errors::{LangError, LangResult};

use regex::{Match, Regex};

/// Breaks a line into candidate lexemes. Whitespace is never matched, so it falls out
/// as a separator.
const FRAGMENT_PATTERN: &str =
    r#"//|\+=|-=|\*=|/=|\^=|%=|==|!=|<=|>=|[()\[\]{}+\-*/^%<>&~!,".:=]|[^\s()\[\]{}+\-*/^%<>&~!,".:=]+"#;

/// Ordered rule table. The first rule whose pattern matches a whole fragment wins,
/// with `IDENTIFIER` as the fallback.
const TOKEN_RULES: &[(TokenKind, &str)] = &[
    (TokenKind::Number, r"^\d+$"),
    (TokenKind::Bool, r"^(True|False)$"),
    (TokenKind::AddEq, r"^\+=$"),
    (TokenKind::Add, r"^\+$"),
    (TokenKind::SubEq, r"^-=$"),
    (TokenKind::Sub, r"^-$"),
    (TokenKind::MulEq, r"^\*=$"),
    (TokenKind::Mul, r"^\*$"),
    (TokenKind::DivEq, r"^/=$"),
    (TokenKind::Div, r"^/$"),
    (TokenKind::PowEq, r"^\^=$"),
    (TokenKind::Pow, r"^\^$"),
    (TokenKind::ModEq, r"^%=$"),
    (TokenKind::Mod, r"^%$"),
    (TokenKind::LSquare, r"^\[$"),
    (TokenKind::RSquare, r"^\]$"),
    (TokenKind::LBracket, r"^\{$"),
    (TokenKind::RBracket, r"^\}$"),
    (TokenKind::Eq, r"^==$"),
    (TokenKind::Neq, r"^!=$"),
    (TokenKind::Not, r"^!$"),
    (TokenKind::And, r"^&$"),
    (TokenKind::Or, r"^~$"),
    (TokenKind::Gte, r"^>=$"),
    (TokenKind::Lte, r"^<=$"),
    (TokenKind::Gt, r"^>$"),
    (TokenKind::Lt, r"^<$"),
    (TokenKind::LPar, r"^\($"),
    (TokenKind::RPar, r"^\)$"),
    (TokenKind::Dot, r"^\.$"),
    (TokenKind::Comma, r"^,$"),
    (TokenKind::Colon, r"^:$"),
    (TokenKind::Assign, r"^=$"),
    (TokenKind::Type, r"^(string|int|bool|array|enum|struct)$"),
    (
        TokenKind::Keyword,
        r"^(return|break|continue|fn|if|else|elif|for|in|while|new|import|as|from)$",
    ),
];

pub struct Lexer {
    splitter: Regex,
    rules: Vec<(TokenKind, Regex)>,
}

impl Lexer {
    /// Compiles the fragment splitter and the rule table.
    pub fn new() -> Self {
        let splitter = Regex::new(FRAGMENT_PATTERN).expect("Fragment pattern is a valid regex.");
        let rules = TOKEN_RULES
            .iter()
            .map(|(kind, pattern)| {
                let regex = Regex::new(pattern).expect("Token rules are valid regexes.");
                (*kind, regex)
            })
            .collect();

        Lexer { splitter, rules }
    }

    /// Turns source text into tokens. Every line with content starts with a `NEWLINE`
    /// token and the result always ends with `EOF`.
    pub fn tokenize(&self, source: &str) -> LangResult<Vec<Token>> {
        let mut tokens: Vec<Token> = vec![];

        for (line_no, raw_line) in source.split('\n').enumerate() {
            let line = raw_line.trim_end_matches('\r');
            let fragments: Vec<Match> = self.splitter.find_iter(line).collect();

            // Blank lines and whole-line comments leave no trace, not even a newline.
            if fragments.first().map_or(true, |m| m.as_str() == "//") {
                continue;
            }

            tokens.push(Token::new(
                TokenKind::Newline,
                "\n",
                Position::new(tokens.len(), line_no, 0),
            ));

            let mut resume_at = 0;
            for fragment in fragments {
                if fragment.start() < resume_at {
                    continue;
                }

                let column_no = line[..fragment.start()].chars().count();
                let position = Position::new(tokens.len(), line_no, column_no);

                match fragment.as_str() {
                    "//" => break,
                    "\"" => {
                        let rest = &line[fragment.end()..];
                        let closing = rest.find('"').ok_or_else(|| {
                            LangError::syntax("Unterminated string literal", position)
                        })?;
                        let end = fragment.end() + closing + 1;
                        tokens.push(Token::new(
                            TokenKind::String,
                            &line[fragment.start()..end],
                            position,
                        ));
                        resume_at = end;
                    }
                    text => tokens.push(Token::new(self.classify(text), text, position)),
                }
            }
        }

        let eof_position = match tokens.last() {
            Some(last) if last.is(TokenKind::Newline) => last.position.next_after(0),
            Some(last) => last.position.next_after(last.lexeme.chars().count()),
            None => Position::default(),
        };
        tokens.push(Token::new(TokenKind::Eof, "", eof_position));

        tracing::debug!(count = tokens.len(), "tokenized source");
        Ok(tokens)
    }

    fn classify(&self, fragment: &str) -> TokenKind {
        self.rules
            .iter()
            .find(|(_, regex)| regex.is_match(fragment))
            .map(|(kind, _)| *kind)
            .unwrap_or(TokenKind::Identifier)
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper compiling a fresh rule table.
pub fn tokenize(source: &str) -> LangResult<Vec<Token>> {
    Lexer::new().tokenize(source)
}

/// Renders a token sequence one token per line, e.g. for golden comparisons.
pub fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| format!("{} @ {}", token, token.position))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Newline)
            .collect()
    }

    #[test]
    fn test_typed_declaration() {
        assert_eq!(
            kinds("int x = 2 + 3 * 4"),
            vec![
                TokenKind::Type,
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Add,
                TokenKind::Number,
                TokenKind::Mul,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_compound_operators_are_single_tokens() {
        assert_eq!(
            kinds("x += 1 == y != z >= w %= 2"),
            vec![
                TokenKind::Identifier,
                TokenKind::AddEq,
                TokenKind::Number,
                TokenKind::Eq,
                TokenKind::Identifier,
                TokenKind::Neq,
                TokenKind::Identifier,
                TokenKind::Gte,
                TokenKind::Identifier,
                TokenKind::ModEq,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_keeps_quotes_and_spaces() {
        let tokens = tokenize(r#"Print("hello, world // not a comment")"#).unwrap();
        let string = tokens.iter().find(|t| t.is(TokenKind::String)).unwrap();
        assert_eq!(string.lexeme, r#""hello, world // not a comment""#);
        assert_eq!(tokens[tokens.len() - 2].kind, TokenKind::RPar);
    }

    #[test]
    fn test_unterminated_string() {
        let error = tokenize("string s = \"oops").unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidSyntax);
        assert_eq!(error.position, Some(Position::new(4, 0, 11)));
    }

    #[test]
    fn test_comments() {
        assert_eq!(kinds("// nothing here\n"), vec![TokenKind::Eof]);
        assert_eq!(
            kinds("x // trailing"),
            vec![TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn test_keywords_types_and_bools() {
        assert_eq!(
            kinds("fn elif True bool whilex"),
            vec![
                TokenKind::Keyword,
                TokenKind::Keyword,
                TokenKind::Bool,
                TokenKind::Type,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions_and_eof() {
        let tokens = tokenize("a\n  bc").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Newline);
        assert_eq!(tokens[1].position, Position::new(1, 0, 0));
        assert_eq!(tokens[3].lexeme, "bc");
        assert_eq!(tokens[3].position, Position::new(3, 1, 2));
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.position, Position::new(4, 1, 4));
    }

    #[test]
    fn test_empty_source_is_only_eof() {
        let tokens = tokenize("").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert_eq!(tokens[0].position, Position::default());
    }

    #[test]
    fn test_render_is_deterministic() {
        let source = "fn add(a: int, b: int): int { return a + b }\nPrint(add(2, 3))";
        let first = render(&tokenize(source).unwrap());
        let second = render(&tokenize(source).unwrap());
        assert_eq!(first, second);
        assert!(first.ends_with("EOF @ Token 31 [2:17]"));
    }
}
