use super::context::{Context, ContextKind};
use super::interpreter::{Evaluation, Interpreter};
use super::object::Object;
use super::symbol_table::SymbolTable;
use crate::errors::LangResult;
use crate::frontend::grammar::{DataType, FuncInfo};

use std::fmt;
use std::rc::Rc;

/// Declared parameter of a user or built-in function.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub ty: DataType,
}

impl ParamSpec {
    pub fn new(name: &str, ty: DataType) -> Self {
        ParamSpec {
            name: name.to_owned(),
            ty,
        }
    }
}

pub struct UserFnData {
    info: Rc<FuncInfo>,
    closure: SymbolTable,
    file_name: String,
}

#[derive(Clone)]
pub struct UserFn(Rc<UserFnData>);

impl UserFn {
    pub fn new(info: Rc<FuncInfo>, closure: SymbolTable, file_name: &str) -> Self {
        let data = UserFnData {
            info,
            closure,
            file_name: file_name.to_owned(),
        };
        UserFn(Rc::new(data))
    }

    pub fn name(&self) -> &str {
        &self.0.info.name.name
    }

    pub fn params(&self) -> Vec<ParamSpec> {
        self.0
            .info
            .params
            .iter()
            .map(|p| ParamSpec::new(&p.name.name, p.ty))
            .collect()
    }

    pub fn return_type(&self) -> DataType {
        self.0.info.return_type
    }

    /// Runs the body in a fresh frame whose scope is nested in the closure. Arguments
    /// arrive already checked against the parameter list.
    pub fn execute(
        &self,
        args: Vec<(String, Object)>,
        interpreter: &mut Interpreter,
        caller: &Rc<Context>,
    ) -> LangResult<Option<Object>> {
        let ctx = Context::new(
            format!("<fn {}>", self.name()),
            self.0.file_name.clone(),
            ContextKind::Function,
            SymbolTable::with_enclosing(&self.0.closure),
            Some(caller.clone()),
        );

        for (name, value) in args {
            ctx.symbols.define(&name, value)?;
        }

        match interpreter.evaluate(&self.0.info.body, &ctx)? {
            Evaluation::Return(value) => Ok(value.map(Object::wrap_enum_value)),
            _ => Ok(None),
        }
    }
}

impl fmt::Debug for UserFn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

impl PartialEq<UserFn> for UserFn {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for UserFn {}
