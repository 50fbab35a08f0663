use super::grammar::{AssignOperator, InfixOperator, PrefixOperator};
use super::token::{Token, TokenKind};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParserOperator {
    Infix(InfixOperator),
    Assignment(AssignOperator),
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Precedence {
    // Lowest precedence
    Lowest,
    Logical,
    Comparison,
    Assignment,
    Addition,
    Multiplication,
    Unary,
    Power, // Highest precedence
}

#[derive(Debug, Clone, Copy)]
pub enum Associativity {
    Left,
    Right,
}

impl ParserOperator {
    pub fn from_token(token: &Token) -> Option<ParserOperator> {
        if let Some(op) = Self::try_assignment(token) {
            return Some(ParserOperator::Assignment(op));
        }

        let op = match token.kind {
            TokenKind::Add => InfixOperator::Add,
            TokenKind::Sub => InfixOperator::Subtract,
            TokenKind::Mul => InfixOperator::Multiply,
            TokenKind::Div => InfixOperator::Divide,
            TokenKind::Mod => InfixOperator::Modulo,
            TokenKind::Pow => InfixOperator::Power,
            TokenKind::Eq => InfixOperator::EqualTo,
            TokenKind::Neq => InfixOperator::NotEqualTo,
            TokenKind::Gt => InfixOperator::GreaterThan,
            TokenKind::Gte => InfixOperator::GreaterEq,
            TokenKind::Lt => InfixOperator::LessThan,
            TokenKind::Lte => InfixOperator::LessEq,
            TokenKind::And => InfixOperator::And,
            TokenKind::Or => InfixOperator::Or,
            _ => return None,
        };
        Some(ParserOperator::Infix(op))
    }

    fn try_assignment(token: &Token) -> Option<AssignOperator> {
        let op = match token.kind {
            TokenKind::Assign => AssignOperator::Assign,
            TokenKind::AddEq => AssignOperator::Compound(InfixOperator::Add),
            TokenKind::SubEq => AssignOperator::Compound(InfixOperator::Subtract),
            TokenKind::MulEq => AssignOperator::Compound(InfixOperator::Multiply),
            TokenKind::DivEq => AssignOperator::Compound(InfixOperator::Divide),
            TokenKind::ModEq => AssignOperator::Compound(InfixOperator::Modulo),
            TokenKind::PowEq => AssignOperator::Compound(InfixOperator::Power),
            _ => return None,
        };
        Some(op)
    }

    pub fn is_higher_precedence(&self, min_precedence: Precedence) -> bool {
        use std::cmp::Ordering;
        match self.precedence().cmp(&min_precedence) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match self.associativity() {
                Associativity::Left => false,
                Associativity::Right => true,
            },
        }
    }

    pub fn precedence(&self) -> Precedence {
        match self {
            ParserOperator::Infix(op) => match op {
                InfixOperator::And | InfixOperator::Or => Precedence::Logical,
                InfixOperator::EqualTo
                | InfixOperator::NotEqualTo
                | InfixOperator::GreaterThan
                | InfixOperator::GreaterEq
                | InfixOperator::LessThan
                | InfixOperator::LessEq => Precedence::Comparison,
                InfixOperator::Add | InfixOperator::Subtract => Precedence::Addition,
                InfixOperator::Multiply | InfixOperator::Divide | InfixOperator::Modulo => {
                    Precedence::Multiplication
                }
                InfixOperator::Power => Precedence::Power,
            },
            ParserOperator::Assignment(_) => Precedence::Assignment,
        }
    }

    pub fn associativity(&self) -> Associativity {
        self.precedence().associativity()
    }
}

impl Precedence {
    fn associativity(&self) -> Associativity {
        match self {
            Precedence::Power => Associativity::Right,
            _ => Associativity::Left,
        }
    }
}

/// Prefix operator at the cursor, if any.
pub fn prefix_operator(token: &Token) -> Option<PrefixOperator> {
    match token.kind {
        TokenKind::Sub => Some(PrefixOperator::Negate),
        TokenKind::Add => Some(PrefixOperator::Plus),
        TokenKind::Not => Some(PrefixOperator::LogicalNot),
        _ => None,
    }
}

/// Binding power of a prefix operator's operand. A `!` that opens a comparison-level
/// operand negates the whole comparison; elsewhere it binds like `-`.
pub fn prefix_operand_precedence(op: PrefixOperator, min_precedence: Precedence) -> Precedence {
    match op {
        PrefixOperator::LogicalNot if min_precedence < Precedence::Comparison => {
            Precedence::Logical
        }
        _ => Precedence::Unary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::position::Position;
    use ::more_asserts::*;

    fn token(kind: TokenKind) -> Token {
        Token::new(kind, "", Position::default())
    }

    #[test]
    fn test_precedence() {
        assert_lt!(Precedence::Lowest, Precedence::Logical);
        assert_lt!(Precedence::Comparison, Precedence::Assignment);
        assert_gt!(Precedence::Multiplication, Precedence::Addition);
        assert_gt!(Precedence::Power, Precedence::Unary);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            ParserOperator::from_token(&token(TokenKind::Add)),
            Some(ParserOperator::Infix(InfixOperator::Add))
        );
        assert_eq!(
            ParserOperator::from_token(&token(TokenKind::ModEq)),
            Some(ParserOperator::Assignment(AssignOperator::Compound(
                InfixOperator::Modulo
            )))
        );
        assert_eq!(
            ParserOperator::from_token(&token(TokenKind::Or)),
            Some(ParserOperator::Infix(InfixOperator::Or))
        );
        assert_eq!(ParserOperator::from_token(&token(TokenKind::Not)), None);
    }

    #[test]
    fn test_power_is_right_associative() {
        let power = ParserOperator::Infix(InfixOperator::Power);
        assert!(power.is_higher_precedence(Precedence::Power));
        let add = ParserOperator::Infix(InfixOperator::Add);
        assert!(!add.is_higher_precedence(Precedence::Addition));
    }

    #[test]
    fn test_not_binds_comparisons_at_statement_level() {
        assert_eq!(
            prefix_operand_precedence(PrefixOperator::LogicalNot, Precedence::Lowest),
            Precedence::Logical
        );
        assert_eq!(
            prefix_operand_precedence(PrefixOperator::LogicalNot, Precedence::Comparison),
            Precedence::Unary
        );
        assert_eq!(
            prefix_operand_precedence(PrefixOperator::Negate, Precedence::Lowest),
            Precedence::Unary
        );
    }
}
