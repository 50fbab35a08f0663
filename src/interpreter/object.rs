use super::array::{ArrayRef, EnumRef};
use super::compare;
use super::function::{ParamSpec, UserFn};
use super::native_function::NativeFn;
use super::stdlib;
use super::structs::{Owner, StructDefRef, StructRef};
use crate::errors::{ErrorKind, LangError, LangResult};
use crate::frontend::grammar::{DataType, InfixOperator, PrefixOperator};

use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub enum Object {
    Number(f64),
    Str(String),
    Boolean(bool),
    Array(ArrayRef),
    Enum(EnumRef),
    EnumValue(String),
    StructDef(StructDefRef),
    Struct(StructRef),
    Function(UserFn),
    NativeFunc(NativeFn),
}

/// Anything that can be invoked with `name(args)` or `value.name(args)`.
#[derive(Debug, PartialEq, Clone)]
pub enum Callable {
    User(UserFn),
    Native(NativeFn),
}

/// A callable found through member access, with the value it was looked up on when
/// the callable is a built-in member of that value.
#[derive(Debug, Clone)]
pub struct Method {
    pub callable: Callable,
    pub receiver: Option<Object>,
}

impl Object {
    pub fn data_type(&self) -> DataType {
        match self {
            Object::Number(_) => DataType::Number,
            Object::Str(_) => DataType::String,
            Object::Boolean(_) => DataType::Boolean,
            Object::Array(_) => DataType::Array,
            Object::Enum(_) => DataType::Enum,
            Object::EnumValue(_) => DataType::EnumValue,
            Object::StructDef(_) | Object::Struct(_) => DataType::Struct,
            Object::Function(_) | Object::NativeFunc(_) => DataType::Function,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Object::Boolean(b) => *b,
            Object::Number(n) => *n != 0.0,
            _ => true,
        }
    }

    /// Whether `other` may replace `self` through a plain `=`.
    pub fn same_type(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Struct(a), Object::Struct(b)) => a.name() == b.name(),
            (Object::Function(_) | Object::NativeFunc(_), Object::Function(_) | Object::NativeFunc(_)) => true,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }

    /// Whether the value satisfies a declared parameter, return or field type.
    pub fn conforms_to(&self, data_type: DataType) -> bool {
        data_type == DataType::Any || self.data_type() == data_type
    }

    /// An enum member used where a whole enum is expected becomes a one-member enum.
    pub fn wrap_enum_value(self) -> Object {
        match self {
            Object::EnumValue(name) => Object::Enum(EnumRef::new(vec![name])),
            other => other,
        }
    }

    pub fn as_callable(&self) -> Option<Callable> {
        match self {
            Object::Function(f) => Some(Callable::User(f.clone())),
            Object::NativeFunc(f) => Some(Callable::Native(f.clone())),
            _ => None,
        }
    }

    /// Registers `owner` as a container of this value, so mutations of the value
    /// refresh the owner's display.
    pub fn set_owner(&self, owner: Owner) {
        match self {
            Object::Array(array) => array.add_owner(owner),
            Object::Struct(instance) => instance.add_owner(owner),
            _ => {}
        }
    }

    pub fn property(&self, name: &str) -> LangResult<Object> {
        let found = match self {
            Object::Struct(instance) => instance.field(name),
            Object::Enum(members) if members.contains(name) => {
                Some(Object::EnumValue(name.to_owned()))
            }
            _ => stdlib::builtin_property(self, name),
        };
        found.ok_or_else(|| {
            runtime(format!(
                "{} doesn't contain property: \"{}\"",
                self.display_nested(),
                name
            ))
        })
    }

    pub fn method(&self, name: &str) -> LangResult<Method> {
        let found = match self {
            Object::Struct(instance) => instance
                .field(name)
                .and_then(|value| value.as_callable())
                .map(|callable| Method {
                    callable,
                    receiver: None,
                }),
            _ => stdlib::builtin_method(self, name).map(|native| Method {
                callable: Callable::Native(native),
                receiver: Some(self.clone()),
            }),
        };
        found.ok_or_else(|| {
            runtime(format!(
                "{} doesn't contain method: \"{}()\"",
                self.display_nested(),
                name
            ))
        })
    }

    /// `value[i]` on arrays, enums and strings.
    pub fn index(&self, index: &Object) -> LangResult<Object> {
        let position = match index {
            Object::Number(n) => *n,
            other => {
                return Err(runtime(format!(
                    "Unexpected type received for index: {}",
                    other.data_type()
                )))
            }
        };

        let out_of_bounds = || {
            LangError::unpositioned(
                ErrorKind::IndexOutOfBounds,
                format!("Index out of bounds: {}", format_number(position)),
            )
        };
        let slot = checked_index(position).ok_or_else(out_of_bounds)?;

        match self {
            Object::Array(array) => array.get(slot).ok_or_else(out_of_bounds),
            Object::Enum(members) => members
                .get(slot)
                .map(Object::EnumValue)
                .ok_or_else(out_of_bounds),
            Object::Str(s) => s
                .chars()
                .nth(slot)
                .map(|c| Object::Str(c.to_string()))
                .ok_or_else(out_of_bounds),
            other => Err(runtime(format!(
                "Data type: {} is not indexable",
                other.data_type()
            ))),
        }
    }

    pub fn apply_infix_op(op: InfixOperator, lhs: Object, rhs: Object) -> LangResult<Object> {
        if op.is_comparison() {
            return compare::compare(op, &lhs, &rhs);
        }

        match (op, lhs, rhs) {
            (InfixOperator::Add, Object::Str(a), Object::Str(b)) => Ok(Object::Str(a + &b)),
            (_, Object::Number(a), Object::Number(b)) => numerical_binop(op, a, b),
            (_, a, b) => Err(runtime(format!(
                "Can't do operations on type {} to {}",
                b.data_type(),
                a.data_type()
            ))),
        }
    }

    pub fn apply_prefix_op(op: PrefixOperator, value: Object) -> LangResult<Object> {
        match (op, value) {
            (PrefixOperator::Negate, Object::Number(n)) => Ok(Object::Number(-n)),
            (PrefixOperator::Plus, Object::Number(n)) => Ok(Object::Number(n)),
            (PrefixOperator::LogicalNot, value) => Ok(Object::Boolean(!value.is_truthy())),
            (op, value) => Err(runtime(format!(
                "Can't apply '{}' to type {}",
                op.symbol(),
                value.data_type()
            ))),
        }
    }

    /// Display used inside composites: strings keep their quotes.
    pub fn display_nested(&self) -> String {
        match self {
            Object::Str(s) => format!("\"{}\"", s),
            other => other.to_string(),
        }
    }
}

fn numerical_binop(op: InfixOperator, a: f64, b: f64) -> LangResult<Object> {
    let value = match op {
        InfixOperator::Add => a + b,
        InfixOperator::Subtract => a - b,
        InfixOperator::Multiply => a * b,
        InfixOperator::Power => a.powf(b),
        InfixOperator::Divide | InfixOperator::Modulo if b == 0.0 => {
            return Err(runtime("Can't divide by 0"))
        }
        InfixOperator::Divide => a / b,
        InfixOperator::Modulo => a % b,
        _ => {
            return Err(LangError::unpositioned(
                ErrorKind::Internal,
                format!("Operator '{}' is not arithmetic", op.symbol()),
            ))
        }
    };
    Ok(Object::Number(value))
}

fn checked_index(index: f64) -> Option<usize> {
    if index.fract() == 0.0 && index >= 0.0 && index <= usize::MAX as f64 {
        Some(index as usize)
    } else {
        None
    }
}

pub(crate) fn runtime<S: Into<String>>(message: S) -> LangError {
    LangError::unpositioned(ErrorKind::Runtime, message)
}

/// Numbers print the way the playground shows them: integral values without a
/// fraction, infinities spelled out, and exponent notation below 1e-6 or from 1e21 on.
pub fn format_number(n: f64) -> String {
    if n == f64::INFINITY {
        "Infinity".to_owned()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else if n == 0.0 {
        "0".to_owned()
    } else if n.is_finite() && (n.abs() >= 1e21 || n.abs() < 1e-6) {
        let formatted = format!("{:e}", n);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        }
    } else {
        n.to_string()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Object::Number(n) => write!(f, "{}", format_number(*n)),
            Object::Str(s) => write!(f, "{}", s),
            Object::Boolean(true) => write!(f, "True"),
            Object::Boolean(false) => write!(f, "False"),
            Object::Array(array) => write!(f, "{}", array.display()),
            Object::Enum(members) => write!(f, "{}", members),
            Object::EnumValue(name) => write!(f, "{}", name),
            Object::StructDef(def) => write!(f, "{}", def),
            Object::Struct(instance) => write!(f, "{}", instance.display()),
            Object::Function(func) => write!(f, "fn {}", func.name()),
            Object::NativeFunc(func) => write!(f, "built-in {}", func.name()),
        }
    }
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::User(f) => f.name(),
            Callable::Native(f) => f.name(),
        }
    }

    pub fn params(&self) -> Vec<ParamSpec> {
        match self {
            Callable::User(f) => f.params(),
            Callable::Native(f) => f.params().to_vec(),
        }
    }

    pub fn return_type(&self) -> DataType {
        match self {
            Callable::User(f) => f.return_type(),
            Callable::Native(f) => f.return_type(),
        }
    }

    /// Name of the frame a call to this callable runs in.
    pub fn context_name(&self) -> String {
        match self {
            Callable::User(f) => format!("<fn {}>", f.name()),
            Callable::Native(f) => format!("<built-in {}>", f.name()),
        }
    }
}
