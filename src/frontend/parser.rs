use super::grammar::{
    DataType, FieldDecl, ForControls, FuncInfo, Identifier, ImportInfo, Member, Node, NodeKind,
    Param, StructDecl, Tree, TypeAnnotation,
};
use super::lexer::tokenize;
use super::parser_utils::{prefix_operand_precedence, prefix_operator, ParserOperator, Precedence};
use super::position::Position;
use super::token::{Token, TokenKind};
use super::token_stream::TokenStream;
use crate::errors::{LangError, LangResult};

use std::collections::HashSet;
use std::rc::Rc;

pub struct Parser {
    tokens: TokenStream,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: TokenStream::new(tokens),
        }
    }

    /// Lexes the source and prepares a parser over it. Lex errors surface here.
    pub fn from_source(source: &str) -> LangResult<Self> {
        Ok(Parser::new(tokenize(source)?))
    }

    fn current(&self) -> &Token {
        self.tokens.current()
    }

    /// Checks whether or not the current token is of the given kind.
    fn check(&self, kind: TokenKind) -> bool {
        self.current().is(kind)
    }

    /// If the current token is of the given kind, consume it and return true.
    fn check_consume(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.tokens.advance();
            return true;
        }
        false
    }

    /// Consumes a token of the given kind or fails with `message` at the current token.
    fn expect(&mut self, kind: TokenKind, message: &str) -> LangResult<Position> {
        let position = self.current().position;
        if self.check_consume(kind) {
            Ok(position)
        } else {
            Err(LangError::syntax(message, position))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> LangResult<Position> {
        let position = self.current().position;
        if self.current().is_keyword(keyword) {
            self.tokens.advance();
            Ok(position)
        } else {
            Err(LangError::syntax(format!("Expected '{}'", keyword), position))
        }
    }

    /// Parses the whole program. A statement that fails to parse is kept as an error
    /// node and ends the program; statements before it stay in the tree.
    pub fn parse(mut self) -> Tree {
        let position = self.current().position;
        let mut stmts = vec![];

        while !self.current().is_end() {
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(error) => {
                    let error_position = error.position.unwrap_or(position);
                    stmts.push(Node::new(NodeKind::Error(error), error_position));
                    break;
                }
            }
        }

        tracing::debug!(statements = stmts.len(), "parsed program");
        Tree {
            root: Node::new(NodeKind::Statements(stmts), position),
        }
    }

    fn parse_statement(&mut self) -> LangResult<Node> {
        let token = self.current().clone();

        if token.is_keyword("return") {
            self.tokens.advance();
            let value = if self.check(TokenKind::RBracket) || self.current().is_end() {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            return Ok(Node::new(NodeKind::Return(value), token.position));
        }

        if token.is_keyword("break") {
            self.tokens.advance();
            return Ok(Node::new(NodeKind::Break, token.position));
        }

        if token.is_keyword("continue") {
            self.tokens.advance();
            return Ok(Node::new(NodeKind::Continue, token.position));
        }

        self.parse_expression()
    }

    /// Brace-delimited statement list.
    fn parse_block(&mut self) -> LangResult<Node> {
        let position = self.expect(TokenKind::LBracket, "Expected '{'")?;
        let mut stmts = vec![];

        while !self.check_consume(TokenKind::RBracket) {
            if self.current().is_end() {
                return Err(LangError::syntax("Expected '}'", self.current().position));
            }
            stmts.push(self.parse_statement()?);
        }

        Ok(Node::new(NodeKind::Statements(stmts), position))
    }

    /// Expression, including the declaration forms only allowed at its start.
    pub fn parse_expression(&mut self) -> LangResult<Node> {
        if self.check(TokenKind::Type) {
            return self.parse_typed_declaration();
        }

        if self.check(TokenKind::Identifier) {
            if let Some(decl) = self.try_parse_struct_typed_declaration()? {
                return Ok(decl);
            }
        }

        self.run_pratt_parse_algo(Precedence::Lowest)
    }

    /// `int x = expr`, `struct Name { ... }`.
    fn parse_typed_declaration(&mut self) -> LangResult<Node> {
        let type_token = self.current().clone();
        self.tokens.advance();

        let data_type = DataType::from_keyword(&type_token.lexeme).ok_or_else(|| {
            LangError::internal(
                format!("Unknown type keyword: {}", type_token.lexeme),
                type_token.position,
            )
        })?;
        let name = self.parse_identifier("Expected identifier after type declaration")?;

        let value = if data_type == DataType::Struct && self.check(TokenKind::LBracket) {
            let decl = self.parse_struct_body(name.clone())?;
            Node::new(NodeKind::StructDef(Rc::new(decl)), name.position)
        } else {
            self.expect(
                TokenKind::Assign,
                "Expected assignment after identifier declaration",
            )?;
            self.parse_expression()?
        };

        Ok(Node::new(
            NodeKind::VariableDecl(TypeAnnotation::Builtin(data_type), name, Box::new(value)),
            type_token.position,
        ))
    }

    /// `Point p = expr`. Rewinds and yields `None` when the second token is not an identifier.
    fn try_parse_struct_typed_declaration(&mut self) -> LangResult<Option<Node>> {
        let anchor = self.tokens.anchor();
        let type_token = self.current().clone();
        self.tokens.advance();

        if !self.check(TokenKind::Identifier) {
            self.tokens.restore(anchor);
            return Ok(None);
        }

        let struct_name = Identifier::new(type_token.lexeme, type_token.position);
        let name = self.parse_identifier("Expected identifier")?;
        self.expect(
            TokenKind::Assign,
            "Expected assignment after identifier declaration",
        )?;
        let value = self.parse_expression()?;

        Ok(Some(Node::new(
            NodeKind::VariableDecl(TypeAnnotation::Named(struct_name), name, Box::new(value)),
            type_token.position,
        )))
    }

    fn parse_struct_body(&mut self, name: Identifier) -> LangResult<StructDecl> {
        self.expect(TokenKind::LBracket, "Expected '{'")?;
        let mut fields: Vec<FieldDecl> = vec![];

        while !self.check_consume(TokenKind::RBracket) {
            if self.current().is_end() {
                return Err(LangError::syntax("Expected '}'", self.current().position));
            }

            let writable = self.check_consume(TokenKind::Not);
            let field_name = self.parse_identifier("Expected field name")?;
            if fields.iter().any(|f| f.name.name == field_name.name) {
                return Err(LangError::syntax(
                    format!("Duplicate field: \"{}\"", field_name.name),
                    field_name.position,
                ));
            }
            self.expect(TokenKind::Colon, "Expected ':' after field name")?;
            let ty = self.parse_type_annotation()?;

            fields.push(FieldDecl {
                name: field_name,
                ty,
                writable,
            });

            if !self.check(TokenKind::RBracket) {
                self.expect(TokenKind::Comma, "Expected ',' between struct fields")?;
            }
        }

        Ok(StructDecl { name, fields })
    }

    fn parse_type_annotation(&mut self) -> LangResult<TypeAnnotation> {
        let token = self.current().clone();
        let annotation = match token.kind {
            TokenKind::Identifier => {
                TypeAnnotation::Named(Identifier::new(token.lexeme.clone(), token.position))
            }
            _ => TypeAnnotation::Builtin(self.data_type_of(&token)?),
        };
        self.tokens.advance();
        Ok(annotation)
    }

    fn data_type_of(&self, token: &Token) -> LangResult<DataType> {
        let keyword = match token.kind {
            TokenKind::Type => Some(token.lexeme.as_str()),
            TokenKind::Keyword if token.lexeme == "fn" => Some("fn"),
            _ => None,
        };
        keyword
            .and_then(DataType::from_keyword)
            .ok_or_else(|| LangError::syntax("Expected type", token.position))
    }

    /// Pratt parsing algo over the binary operator levels. Operands are dot chains.
    pub fn run_pratt_parse_algo(&mut self, min_precedence: Precedence) -> LangResult<Node> {
        crate::stack::ensure_sufficient_stack(|| self.pratt_step(min_precedence))
    }

    fn pratt_step(&mut self, min_precedence: Precedence) -> LangResult<Node> {
        let token = self.current().clone();

        let mut lhs = match prefix_operator(&token) {
            Some(op) => {
                self.tokens.advance();
                let operand =
                    self.run_pratt_parse_algo(prefix_operand_precedence(op, min_precedence))?;
                Node::new(NodeKind::Prefix(op, Box::new(operand)), token.position)
            }
            None => self.parse_dot()?,
        };

        while let Some(op) = ParserOperator::from_token(self.current()) {
            if !op.is_higher_precedence(min_precedence) {
                break;
            }

            let op_position = self.current().position;
            self.tokens.advance();
            let rhs = self.run_pratt_parse_algo(op.precedence())?;

            let kind = match op {
                ParserOperator::Infix(op) => NodeKind::Infix(op, Box::new(lhs), Box::new(rhs)),
                ParserOperator::Assignment(op) => {
                    if !lhs.is_assignable() {
                        return Err(LangError::syntax("Invalid assignment target", op_position));
                    }
                    NodeKind::Assignment(op, Box::new(lhs), Box::new(rhs))
                }
            };
            lhs = Node::new(kind, op_position);
        }

        Ok(lhs)
    }

    /// Member chain. Two integer literals around a dot form a decimal number instead.
    fn parse_dot(&mut self) -> LangResult<Node> {
        let first = self.current().clone();
        let object = self.parse_call()?;

        if !self.check(TokenKind::Dot) {
            return Ok(object);
        }

        if first.is(TokenKind::Number)
            && matches!(object.kind, NodeKind::Number(_))
            && self.tokens.peek().is(TokenKind::Number)
        {
            self.tokens.advance();
            let fraction = self.current().clone();
            self.tokens.advance();

            let value = format!("{}.{}", first.lexeme, fraction.lexeme)
                .parse::<f64>()
                .map_err(|_| LangError::syntax("Invalid number literal", first.position))?;
            return Ok(Node::new(NodeKind::Number(value), first.position));
        }

        let mut members = vec![];
        while self.check_consume(TokenKind::Dot) {
            let name = self.parse_identifier("Expected property or method name after '.'")?;
            if self.check(TokenKind::LPar) {
                let args = self.parse_call_args()?;
                members.push(Member::Method(name, args));
            } else {
                let indexes = self.parse_indexes()?;
                members.push(Member::Property(name, indexes));
            }
        }

        let position = object.position;
        Ok(Node::new(NodeKind::Dot(Box::new(object), members), position))
    }

    fn parse_call(&mut self) -> LangResult<Node> {
        let atom = self.parse_atom()?;

        if self.check(TokenKind::LPar) && matches!(atom.kind, NodeKind::Variable(..)) {
            let position = atom.position;
            let args = self.parse_call_args()?;
            return Ok(Node::new(NodeKind::Call(Box::new(atom), args), position));
        }

        Ok(atom)
    }

    fn parse_atom(&mut self) -> LangResult<Node> {
        let token = self.current().clone();
        let position = token.position;

        let kind = match token.kind {
            TokenKind::Number => {
                self.tokens.advance();
                let value = token
                    .lexeme
                    .parse::<f64>()
                    .map_err(|_| LangError::syntax("Invalid number literal", position))?;
                NodeKind::Number(value)
            }
            TokenKind::String => {
                self.tokens.advance();
                let content = token.lexeme.get(1..token.lexeme.len() - 1).unwrap_or("");
                NodeKind::Str(content.to_owned())
            }
            TokenKind::Bool => {
                self.tokens.advance();
                NodeKind::Boolean(token.lexeme == "True")
            }
            TokenKind::Identifier => {
                self.tokens.advance();
                let indexes = self.parse_indexes()?;
                NodeKind::Variable(Identifier::new(token.lexeme, position), indexes)
            }
            TokenKind::LPar => {
                self.tokens.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RPar, "Expected ')'")?;
                let indexes = self.parse_indexes()?;
                if indexes.is_empty() {
                    return Ok(inner);
                }
                NodeKind::Index(Box::new(inner), indexes)
            }
            TokenKind::LSquare => {
                self.tokens.advance();
                let elements = self.parse_comma_sep(TokenKind::RSquare, Self::parse_expression)?;
                let indexes = self.parse_indexes()?;
                let array = Node::new(NodeKind::Array(elements), position);
                return Ok(resolve_literal_indexes(array, indexes));
            }
            TokenKind::LBracket => {
                self.tokens.advance();
                let members = self.parse_enum_members()?;
                check_unique(&members, "Duplicate enum member")?;
                NodeKind::Enum(members)
            }
            TokenKind::Keyword => match token.lexeme.as_str() {
                "fn" => return self.parse_function(),
                "if" => return self.parse_if(),
                "for" => return self.parse_for(),
                "while" => return self.parse_while(),
                "new" => return self.parse_struct_init(),
                "import" => return self.parse_import(),
                _ => return Err(unexpected(&token)),
            },
            _ => return Err(unexpected(&token)),
        };

        Ok(Node::new(kind, position))
    }

    fn parse_identifier(&mut self, message: &str) -> LangResult<Identifier> {
        let token = self.current().clone();
        if token.is(TokenKind::Identifier) {
            self.tokens.advance();
            Ok(Identifier::new(token.lexeme, token.position))
        } else {
            Err(LangError::syntax(message, token.position))
        }
    }

    /// Items separated by commas up to and including `closing`. The opener is
    /// already consumed.
    fn parse_comma_sep<T, F>(&mut self, closing: TokenKind, parser: F) -> LangResult<Vec<T>>
    where
        F: Fn(&mut Parser) -> LangResult<T>,
    {
        let mut items = vec![];
        if self.check_consume(closing) {
            return Ok(items);
        }

        items.push(parser(self)?);

        while !self.check_consume(closing) {
            let message = format!("Expected ',' or '{}'", delimiter(closing));
            self.expect(TokenKind::Comma, &message)?;
            items.push(parser(self)?);
        }

        Ok(items)
    }

    /// Enum members up to and including `}`. Commas between them are optional.
    fn parse_enum_members(&mut self) -> LangResult<Vec<Identifier>> {
        let mut members = vec![];
        while !self.check_consume(TokenKind::RBracket) {
            if self.current().is_end() {
                return Err(LangError::syntax("Expected '}'", self.current().position));
            }
            members.push(self.parse_identifier("Expected '}' or ','")?);
            self.check_consume(TokenKind::Comma);
        }
        Ok(members)
    }

    fn parse_call_args(&mut self) -> LangResult<Vec<Node>> {
        self.expect(TokenKind::LPar, "Expected '('")?;
        self.parse_comma_sep(TokenKind::RPar, Self::parse_expression)
    }

    /// Zero or more `[expr]` suffixes.
    fn parse_indexes(&mut self) -> LangResult<Vec<Node>> {
        let mut indexes = vec![];
        while self.check_consume(TokenKind::LSquare) {
            indexes.push(self.parse_expression()?);
            self.expect(TokenKind::RSquare, "Expected ']'")?;
        }
        Ok(indexes)
    }

    /// `(expr)`, kept as a parenthesized atom so `(a) & (b)` also works.
    fn parse_condition(&mut self) -> LangResult<Node> {
        if !self.check(TokenKind::LPar) {
            return Err(LangError::syntax("Expected '('", self.current().position));
        }
        self.parse_expression()
    }

    /// `fn name(a: int, b): int { ... }`
    fn parse_function(&mut self) -> LangResult<Node> {
        let position = self.expect_keyword("fn")?;
        let name = self.parse_identifier("Expected function name after function initialization")?;

        self.expect(TokenKind::LPar, "Expected '('")?;
        let params = self.parse_comma_sep(TokenKind::RPar, Self::parse_param)?;
        let param_names: Vec<Identifier> = params.iter().map(|p| p.name.clone()).collect();
        check_unique(&param_names, "Argument name is already taken")?;

        self.expect(TokenKind::Colon, "Expected colon (:) after arguments")?;
        let return_token = self.current().clone();
        let return_type = if return_token.matches(TokenKind::Identifier, "null") {
            DataType::Null
        } else if return_token.is(TokenKind::Type) {
            self.data_type_of(&return_token)?
        } else {
            return Err(LangError::syntax("Expected function type", return_token.position));
        };
        self.tokens.advance();

        let body = self.parse_block()?;
        let info = FuncInfo {
            name,
            params,
            return_type,
            body,
        };

        Ok(Node::new(NodeKind::Function(Rc::new(info)), position))
    }

    fn parse_param(&mut self) -> LangResult<Param> {
        let name = self.parse_identifier("Expected parameter name")?;
        let ty = if self.check_consume(TokenKind::Colon) {
            let token = self.current().clone();
            let ty = self.data_type_of(&token)?;
            self.tokens.advance();
            ty
        } else {
            DataType::Any
        };
        Ok(Param { name, ty })
    }

    /// `if (c) { } elif (c) { } else { }`
    fn parse_if(&mut self) -> LangResult<Node> {
        let position = self.expect_keyword("if")?;
        let mut cases = vec![];

        let condition = self.parse_condition()?;
        let body = self.parse_block()?;
        cases.push((condition, body));

        while self.current().is_keyword("elif") {
            self.tokens.advance();
            let condition = self.parse_condition()?;
            let body = self.parse_block()?;
            cases.push((condition, body));
        }

        let else_body = if self.current().is_keyword("else") {
            self.tokens.advance();
            Some(Box::new(self.parse_block()?))
        } else {
            None
        };

        Ok(Node::new(NodeKind::If(cases, else_body), position))
    }

    fn parse_while(&mut self) -> LangResult<Node> {
        let position = self.expect_keyword("while")?;
        let condition = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(Node::new(
            NodeKind::While(Box::new(condition), Box::new(body)),
            position,
        ))
    }

    /// `for (i in (start, end, step)) { }` or `for (x in expr) { }`
    fn parse_for(&mut self) -> LangResult<Node> {
        let position = self.expect_keyword("for")?;
        self.expect(TokenKind::LPar, "Expected '('")?;
        let variable = self.parse_identifier("Expected identifier")?;
        self.expect_keyword("in")?;

        let controls = if self.check(TokenKind::LPar) {
            let list_position = self.current().position;
            self.tokens.advance();
            let mut items = self.parse_comma_sep(TokenKind::RPar, Self::parse_expression)?;
            match items.len() {
                1 => ForControls::Iterable(Box::new(items.remove(0))),
                3 => {
                    let step = items.remove(2);
                    let end = items.remove(1);
                    let start = items.remove(0);
                    ForControls::Range(Box::new(start), Box::new(end), Box::new(step))
                }
                n => {
                    return Err(LangError::syntax(
                        format!("Expected 3 arguments. Received {} arguments", n),
                        list_position,
                    ))
                }
            }
        } else {
            ForControls::Iterable(Box::new(self.parse_expression()?))
        };

        self.expect(TokenKind::RPar, "Expected ')'")?;
        let body = self.parse_block()?;

        Ok(Node::new(
            NodeKind::For(variable, controls, Box::new(body)),
            position,
        ))
    }

    /// `new Name(args)`
    fn parse_struct_init(&mut self) -> LangResult<Node> {
        let position = self.expect_keyword("new")?;
        let name = self.parse_identifier("Expected identifier")?;
        let args = self.parse_call_args()?;
        Ok(Node::new(NodeKind::StructInit(name, args), position))
    }

    /// `import a, b from "file.basp" as alias`
    fn parse_import(&mut self) -> LangResult<Node> {
        let position = self.expect_keyword("import")?;
        let mut names = vec![];

        loop {
            let message = format!("Expected IDENTIFIER, but received: {}", self.current().kind);
            names.push(self.parse_identifier(&message)?);
            self.check_consume(TokenKind::Comma);
            if !self.check(TokenKind::Identifier) {
                break;
            }
        }
        check_unique(&names, "Duplicate import name")?;

        self.expect_keyword("from")?;
        let source = self.run_pratt_parse_algo(Precedence::Lowest)?;

        let alias = if self.current().is_keyword("as") {
            self.tokens.advance();
            Some(self.parse_identifier("Expected alias after 'as'")?)
        } else {
            None
        };

        Ok(Node::new(
            NodeKind::Import(ImportInfo {
                names,
                source: Box::new(source),
                alias,
            }),
            position,
        ))
    }
}

/// Replaces `[a, b, c][1]` by `b` while the indexes are in-range integer literals.
/// Whatever cannot be resolved is left for the interpreter.
fn resolve_literal_indexes(mut node: Node, indexes: Vec<Node>) -> Node {
    let mut remaining = indexes.into_iter().peekable();

    while let Some(index) = remaining.peek() {
        let element = match (&mut node.kind, &index.kind) {
            (NodeKind::Array(elements), NodeKind::Number(i))
                if i.fract() == 0.0 && *i >= 0.0 && (*i as usize) < elements.len() =>
            {
                elements.swap_remove(*i as usize)
            }
            _ => break,
        };
        node = element;
        remaining.next();
    }

    let rest: Vec<Node> = remaining.collect();
    if rest.is_empty() {
        node
    } else {
        let position = node.position;
        Node::new(NodeKind::Index(Box::new(node), rest), position)
    }
}

fn check_unique(idents: &[Identifier], message: &str) -> LangResult<()> {
    let mut seen = HashSet::new();
    for ident in idents.iter() {
        if !seen.insert(ident.name.as_str()) {
            return Err(LangError::syntax(
                format!("{}: \"{}\"", message, ident.name),
                ident.position,
            ));
        }
    }
    Ok(())
}

fn unexpected(token: &Token) -> LangError {
    LangError::syntax(format!("Unexpected token: {}", token), token.position)
}

fn delimiter(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::RPar => ")",
        TokenKind::RSquare => "]",
        TokenKind::RBracket => "}",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::frontend::grammar::{AssignOperator, InfixOperator, PrefixOperator};

    fn parse(source: &str) -> Vec<Node> {
        let tree = Parser::from_source(source).unwrap().parse();
        tree.check().unwrap();
        tree.statements().to_vec()
    }

    fn parse_one(source: &str) -> NodeKind {
        parse(source).remove(0).kind
    }

    fn parse_error(source: &str) -> LangError {
        Parser::from_source(source)
            .unwrap()
            .parse()
            .check()
            .unwrap_err()
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let kind = parse_one("int x = 2 + 3 * 4");
        let value = match kind {
            NodeKind::VariableDecl(TypeAnnotation::Builtin(DataType::Number), name, value) => {
                assert_eq!(name.name, "x");
                value.kind
            }
            other => panic!("unexpected node {:?}", other),
        };

        match value {
            NodeKind::Infix(InfixOperator::Add, lhs, rhs) => {
                assert_eq!(lhs.kind, NodeKind::Number(2.0));
                assert!(matches!(
                    rhs.kind,
                    NodeKind::Infix(InfixOperator::Multiply, _, _)
                ));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_decimal_merge() {
        assert_eq!(parse_one("3.14"), NodeKind::Number(3.14));
        assert_eq!(parse_one("3.05"), NodeKind::Number(3.05));
    }

    #[test]
    fn test_dot_on_non_literals_is_member_access() {
        match parse_one("point.x") {
            NodeKind::Dot(object, members) => {
                assert!(matches!(object.kind, NodeKind::Variable(..)));
                assert!(matches!(&members[0], Member::Property(name, _) if name.name == "x"));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_method_chain() {
        match parse_one("Math.Floor(2.5).x[0]") {
            NodeKind::Dot(_, members) => {
                assert_eq!(members.len(), 2);
                assert!(matches!(&members[0], Member::Method(name, args) if name.name == "Floor" && args.len() == 1));
                assert!(matches!(&members[1], Member::Property(_, indexes) if indexes.len() == 1));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_power_is_right_associative() {
        match parse_one("2 ^ 3 ^ 2") {
            NodeKind::Infix(InfixOperator::Power, lhs, rhs) => {
                assert_eq!(lhs.kind, NodeKind::Number(2.0));
                assert!(matches!(rhs.kind, NodeKind::Infix(InfixOperator::Power, _, _)));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_negation_wraps_power() {
        match parse_one("-2 ^ 2") {
            NodeKind::Prefix(PrefixOperator::Negate, operand) => {
                assert!(matches!(operand.kind, NodeKind::Infix(InfixOperator::Power, _, _)));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_not_negates_whole_comparison() {
        match parse_one("!a == b & c") {
            NodeKind::Infix(InfixOperator::And, lhs, _) => match lhs.kind {
                NodeKind::Prefix(PrefixOperator::LogicalNot, operand) => {
                    assert!(matches!(operand.kind, NodeKind::Infix(InfixOperator::EqualTo, _, _)));
                }
                other => panic!("unexpected node {:?}", other),
            },
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_compound_assignment() {
        assert!(matches!(
            parse_one("x += 1"),
            NodeKind::Assignment(AssignOperator::Compound(InfixOperator::Add), _, _)
        ));
        assert!(matches!(
            parse_one("p.inner.v = 5"),
            NodeKind::Assignment(AssignOperator::Assign, _, _)
        ));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let error = parse_error("1 = 2");
        assert_eq!(error.kind, ErrorKind::InvalidSyntax);
        assert_eq!(error.message, "Invalid assignment target");
    }

    #[test]
    fn test_struct_definition() {
        match parse_one("struct Point { !x: int, y: int, inner: Inner }") {
            NodeKind::VariableDecl(TypeAnnotation::Builtin(DataType::Struct), name, value) => {
                assert_eq!(name.name, "Point");
                match value.kind {
                    NodeKind::StructDef(decl) => {
                        assert_eq!(decl.fields.len(), 3);
                        assert!(decl.fields[0].writable);
                        assert!(!decl.fields[1].writable);
                        assert!(matches!(decl.fields[2].ty, TypeAnnotation::Named(_)));
                    }
                    other => panic!("unexpected node {:?}", other),
                }
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_struct_typed_declaration_and_rewind() {
        assert!(matches!(
            parse_one("Point p = new Point(1, 2)"),
            NodeKind::VariableDecl(TypeAnnotation::Named(_), _, _)
        ));
        assert!(matches!(parse_one("Print(1)"), NodeKind::Call(..)));

        let error = parse_error("Point p");
        assert_eq!(error.message, "Expected assignment after identifier declaration");
    }

    #[test]
    fn test_function() {
        match parse_one("fn add(a: int, b): int { return a + b }") {
            NodeKind::Function(info) => {
                assert_eq!(info.name.name, "add");
                assert_eq!(info.params[0].ty, DataType::Number);
                assert_eq!(info.params[1].ty, DataType::Any);
                assert_eq!(info.return_type, DataType::Number);
            }
            other => panic!("unexpected node {:?}", other),
        }

        let error = parse_error("fn f(a, a): null { }");
        assert!(error.message.starts_with("Argument name is already taken"));
    }

    #[test]
    fn test_bare_return_before_brace() {
        match parse_one("fn f(): null { return }") {
            NodeKind::Function(info) => match &info.body.kind {
                NodeKind::Statements(stmts) => assert_eq!(stmts[0].kind, NodeKind::Return(None)),
                other => panic!("unexpected node {:?}", other),
            },
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_if_elif_else() {
        match parse_one("if (x > 1) { 1 } elif (x > 0) { 2 } else { 3 }") {
            NodeKind::If(cases, else_body) => {
                assert_eq!(cases.len(), 2);
                assert!(else_body.is_some());
            }
            other => panic!("unexpected node {:?}", other),
        }

        assert_eq!(parse_error("if x { }").message, "Expected '('");
    }

    #[test]
    fn test_for_forms() {
        assert!(matches!(
            parse_one("for (i in (0, 10, 2)) { }"),
            NodeKind::For(_, ForControls::Range(..), _)
        ));
        assert!(matches!(
            parse_one("for (i in [10, 20, 30]) { Print(i) }"),
            NodeKind::For(_, ForControls::Iterable(..), _)
        ));
        assert_eq!(
            parse_error("for (i in (1, 2)) { }").message,
            "Expected 3 arguments. Received 2 arguments"
        );
    }

    #[test]
    fn test_literal_indexes_resolve_eagerly() {
        assert_eq!(parse_one("[1, [2, 3]][1][0]"), NodeKind::Number(2.0));
        assert!(matches!(parse_one("[1, 2][5]"), NodeKind::Index(..)));
        assert!(matches!(parse_one("[1, 2][i]"), NodeKind::Index(..)));
    }

    #[test]
    fn test_enum_and_import() {
        assert!(matches!(parse_one("{ Red, Green }"), NodeKind::Enum(members) if members.len() == 2));

        match parse_one("import add, sub from \"math.basp\" as m") {
            NodeKind::Import(info) => {
                assert_eq!(info.names.len(), 2);
                assert_eq!(info.source.kind, NodeKind::Str("math.basp".to_owned()));
                assert_eq!(info.alias.unwrap().name, "m");
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_enum_commas_are_optional() {
        match parse_one("{ Red Green, Blue }") {
            NodeKind::Enum(members) => {
                let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
                assert_eq!(names, vec!["Red", "Green", "Blue"]);
            }
            other => panic!("unexpected node {:?}", other),
        }
        assert!(matches!(parse_one("{ Red, }"), NodeKind::Enum(members) if members.len() == 1));
        assert_eq!(parse_error("{ Red, 1 }").message, "Expected '}' or ','");
        match parse_one("import add sub from \"math.basp\"") {
            NodeKind::Import(info) => assert_eq!(info.names.len(), 2),
            other => panic!("unexpected node {:?}", other),
        }
        assert_eq!(
            parse_error("struct Point { x: int y: int }").message,
            "Expected ',' between struct fields"
        );
    }

    #[test]
    fn test_first_error_stops_parsing() {
        let tree = Parser::from_source("int x = 1\n)\nPrint(x)").unwrap().parse();
        let stmts = tree.statements();
        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[1].kind, NodeKind::Error(_)));
        assert_eq!(tree.check().unwrap_err().message, "Unexpected token: RPAR:)");
    }

    #[test]
    fn test_unclosed_block() {
        assert_eq!(parse_error("while (True) { x").message, "Expected '}'");
    }
}
