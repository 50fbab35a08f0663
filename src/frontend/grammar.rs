use super::position::Position;
use crate::errors::{LangError, LangResult};

use std::fmt;
use std::rc::Rc;

/// Semantic type tag shared by annotations and runtime values.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum DataType {
    Number,
    String,
    Boolean,
    Array,
    Enum,
    EnumValue,
    Struct,
    Function,
    Null,
    Any,
}

impl DataType {
    /// Maps a type keyword (`int`, `string`, ...) to its tag.
    pub fn from_keyword(keyword: &str) -> Option<DataType> {
        let data_type = match keyword {
            "int" => DataType::Number,
            "string" => DataType::String,
            "bool" => DataType::Boolean,
            "array" => DataType::Array,
            "enum" => DataType::Enum,
            "struct" => DataType::Struct,
            "fn" => DataType::Function,
            "null" => DataType::Null,
            _ => return None,
        };
        Some(data_type)
    }

    /// Source spelling used when displaying struct definitions.
    pub fn keyword(&self) -> &'static str {
        match self {
            DataType::Number => "int",
            DataType::String => "string",
            DataType::Boolean => "bool",
            DataType::Array => "array",
            DataType::Enum | DataType::EnumValue => "enum",
            DataType::Struct => "struct",
            DataType::Function => "fn",
            DataType::Null => "null",
            DataType::Any => "any",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Number => "NUMBER",
            DataType::String => "STRING",
            DataType::Boolean => "BOOL",
            DataType::Array => "ARRAY",
            DataType::Enum => "ENUM",
            DataType::EnumValue => "ENUM_VALUE",
            DataType::Struct => "STRUCT",
            DataType::Function => "FUNCTION",
            DataType::Null => "NULL",
            DataType::Any => "ANY",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PrefixOperator {
    Negate,
    Plus,
    LogicalNot,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InfixOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Modulo,
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterEq,
    LessThan,
    LessEq,
    And,
    Or,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AssignOperator {
    Assign,
    Compound(InfixOperator),
}

impl PrefixOperator {
    pub fn symbol(&self) -> &str {
        match self {
            PrefixOperator::Negate => "-",
            PrefixOperator::Plus => "+",
            PrefixOperator::LogicalNot => "!",
        }
    }
}

impl InfixOperator {
    pub fn symbol(&self) -> &str {
        match self {
            InfixOperator::Add => "+",
            InfixOperator::Subtract => "-",
            InfixOperator::Multiply => "*",
            InfixOperator::Divide => "/",
            InfixOperator::Power => "^",
            InfixOperator::Modulo => "%",
            InfixOperator::EqualTo => "==",
            InfixOperator::NotEqualTo => "!=",
            InfixOperator::GreaterThan => ">",
            InfixOperator::GreaterEq => ">=",
            InfixOperator::LessThan => "<",
            InfixOperator::LessEq => "<=",
            InfixOperator::And => "&",
            InfixOperator::Or => "~",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            InfixOperator::EqualTo
                | InfixOperator::NotEqualTo
                | InfixOperator::GreaterThan
                | InfixOperator::GreaterEq
                | InfixOperator::LessThan
                | InfixOperator::LessEq
                | InfixOperator::And
                | InfixOperator::Or
        )
    }
}

/// A parsed program: a single `Statements` node.
#[derive(Debug, PartialEq, Clone)]
pub struct Tree {
    pub root: Node,
}

impl Tree {
    pub fn statements(&self) -> &[Node] {
        match &self.root.kind {
            NodeKind::Statements(stmts) => stmts,
            _ => std::slice::from_ref(&self.root),
        }
    }

    /// Surfaces the first parse error embedded among the top-level statements.
    pub fn check(&self) -> LangResult<()> {
        match self.statements().iter().find_map(|node| match &node.kind {
            NodeKind::Error(error) => Some(error),
            _ => None,
        }) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub position: Position,
}

#[derive(Debug, PartialEq, Clone)]
pub enum NodeKind {
    Statements(Vec<Node>),
    Number(f64),
    Str(String),
    Boolean(bool),
    Prefix(PrefixOperator, Box<Node>),
    Infix(InfixOperator, Box<Node>, Box<Node>),
    Assignment(AssignOperator, Box<Node>, Box<Node>),
    Variable(Identifier, Vec<Node>),
    Index(Box<Node>, Vec<Node>),
    Dot(Box<Node>, Vec<Member>),
    Array(Vec<Node>),
    Enum(Vec<Identifier>),
    StructDef(Rc<StructDecl>),
    StructInit(Identifier, Vec<Node>),
    VariableDecl(TypeAnnotation, Identifier, Box<Node>),
    If(Vec<(Node, Node)>, Option<Box<Node>>),
    For(Identifier, ForControls, Box<Node>),
    While(Box<Node>, Box<Node>),
    Call(Box<Node>, Vec<Node>),
    Function(Rc<FuncInfo>),
    Return(Option<Box<Node>>),
    Break,
    Continue,
    Import(ImportInfo),
    /// Parse error kept in place of the statement that failed.
    Error(LangError),
}

/// One step of a dotted chain such as `a.b[0].c(1)`.
#[derive(Debug, PartialEq, Clone)]
pub enum Member {
    Property(Identifier, Vec<Node>),
    Method(Identifier, Vec<Node>),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Identifier {
    pub name: String,
    pub position: Position,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TypeAnnotation {
    Builtin(DataType),
    /// A struct definition referred to by name.
    Named(Identifier),
}

#[derive(Debug, PartialEq, Clone)]
pub struct StructDecl {
    pub name: Identifier,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FieldDecl {
    pub name: Identifier,
    pub ty: TypeAnnotation,
    pub writable: bool,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ForControls {
    /// `(start, end, step)`
    Range(Box<Node>, Box<Node>, Box<Node>),
    Iterable(Box<Node>),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Param {
    pub name: Identifier,
    pub ty: DataType,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FuncInfo {
    pub name: Identifier,
    pub params: Vec<Param>,
    pub return_type: DataType,
    pub body: Node,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ImportInfo {
    pub names: Vec<Identifier>,
    pub source: Box<Node>,
    pub alias: Option<Identifier>,
}

impl Node {
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Node { kind, position }
    }

    /// Whether the node may appear on the left of an assignment operator.
    pub fn is_assignable(&self) -> bool {
        match &self.kind {
            NodeKind::Variable(..) => true,
            NodeKind::Dot(_, members) => matches!(members.last(), Some(Member::Property(..))),
            _ => false,
        }
    }
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Statements(_) => "Statements",
            NodeKind::Number(_) => "Number",
            NodeKind::Str(_) => "String",
            NodeKind::Boolean(_) => "Boolean",
            NodeKind::Prefix(..) => "UnaryOp",
            NodeKind::Infix(..) => "BinOp",
            NodeKind::Assignment(..) => "Assignment",
            NodeKind::Variable(..) => "VariableAccess",
            NodeKind::Index(..) => "Index",
            NodeKind::Dot(..) => "Dot",
            NodeKind::Array(_) => "Array",
            NodeKind::Enum(_) => "Enum",
            NodeKind::StructDef(_) => "BaseStruct",
            NodeKind::StructInit(..) => "Struct",
            NodeKind::VariableDecl(..) => "VariableAssign",
            NodeKind::If(..) => "If",
            NodeKind::For(..) => "For",
            NodeKind::While(..) => "While",
            NodeKind::Call(..) => "Call",
            NodeKind::Function(_) => "Function",
            NodeKind::Return(_) => "Return",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Import(_) => "Import",
            NodeKind::Error(_) => "Error",
        }
    }
}

impl Identifier {
    pub fn new<S: Into<String>>(name: S, position: Position) -> Self {
        Identifier {
            name: name.into(),
            position,
        }
    }
}

impl Member {
    pub fn name(&self) -> &Identifier {
        match self {
            Member::Property(name, _) | Member::Method(name, _) => name,
        }
    }
}

impl fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeAnnotation::Builtin(data_type) => write!(f, "{}", data_type),
            TypeAnnotation::Named(ident) => write!(f, "{}", ident.name),
        }
    }
}
