use super::context::Context;
use super::function::ParamSpec;
use super::interpreter::Interpreter;
use super::object::{runtime, Object};
use crate::errors::LangResult;
use crate::frontend::grammar::DataType;

use std::fmt;
use std::rc::Rc;

type FnType = fn(&NativeArgs, &mut Interpreter, &Rc<Context>) -> LangResult<Option<Object>>;

/// Arguments of a built-in call, tagged with their parameter names. Built-in members
/// also receive the value they were called on as `"value"`.
#[derive(Debug, Default)]
pub struct NativeArgs {
    values: Vec<(String, Object)>,
}

impl NativeArgs {
    pub fn new(values: Vec<(String, Object)>) -> Self {
        NativeArgs { values }
    }

    pub fn push(&mut self, name: &str, value: Object) {
        self.values.push((name.to_owned(), value));
    }

    pub fn get(&self, name: &str) -> LangResult<&Object> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
            .ok_or_else(|| runtime(format!("Missing argument: \"{}\"", name)))
    }

    pub fn number(&self, name: &str) -> LangResult<f64> {
        match self.get(name)? {
            Object::Number(n) => Ok(*n),
            other => Err(runtime(format!(
                "Expected type: NUMBER. Received: {}",
                other.data_type()
            ))),
        }
    }

    pub fn string(&self, name: &str) -> LangResult<&str> {
        match self.get(name)? {
            Object::Str(s) => Ok(s),
            other => Err(runtime(format!(
                "Expected type: STRING. Received: {}",
                other.data_type()
            ))),
        }
    }
}

pub struct NativeFnData {
    pub func: FnType,
    pub params: Vec<ParamSpec>,
    pub return_type: DataType,
    pub name: String,
}

#[derive(Clone)]
pub struct NativeFn(Rc<NativeFnData>);

impl NativeFn {
    pub fn new(name: &str, params: Vec<ParamSpec>, return_type: DataType, func: FnType) -> Self {
        let data = NativeFnData {
            func,
            params,
            return_type,
            name: name.to_owned(),
        };
        NativeFn(Rc::new(data))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.0.params
    }

    pub fn return_type(&self) -> DataType {
        self.0.return_type
    }

    pub fn execute(
        &self,
        args: &NativeArgs,
        interpreter: &mut Interpreter,
        ctx: &Rc<Context>,
    ) -> LangResult<Option<Object>> {
        (self.0.func)(args, interpreter, ctx)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<built-in {}>", self.0.name)
    }
}

impl PartialEq<NativeFn> for NativeFn {
    // Function pointers can't be compared reliably; compare the shared data instead.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for NativeFn {}
