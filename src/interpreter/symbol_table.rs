use super::object::Object;
use crate::errors::{ErrorKind, LangError};

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum SymbolError {
    #[error("Variable \"{0}\" is already defined")]
    AlreadyDefined(String),
    #[error("Variable \"{0}\" is not defined")]
    Undefined(String),
}

impl From<SymbolError> for LangError {
    fn from(error: SymbolError) -> Self {
        LangError::unpositioned(ErrorKind::Runtime, error.to_string())
    }
}

/// Lexical scope: a name table plus the enclosing scope it falls back to.
#[derive(Clone)]
pub struct SymbolTable {
    table_ptr: Rc<RefCell<SymbolTableData>>,
}

struct SymbolTableData {
    values: HashMap<String, Object>,
    enclosing: Option<SymbolTable>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let data = SymbolTableData {
            values: HashMap::new(),
            enclosing: None,
        };
        SymbolTable {
            table_ptr: Rc::new(RefCell::new(data)),
        }
    }

    pub fn with_enclosing(table: &SymbolTable) -> Self {
        let data = SymbolTableData {
            values: HashMap::new(),
            enclosing: Some(table.clone()),
        };
        SymbolTable {
            table_ptr: Rc::new(RefCell::new(data)),
        }
    }

    /// Binds a new name in this scope. Names are define-once per scope; shadowing an
    /// outer binding is fine.
    pub fn define(&self, name: &str, value: Object) -> Result<(), SymbolError> {
        let mut data = self.table_ptr.borrow_mut();
        if data.values.contains_key(name) {
            return Err(SymbolError::AlreadyDefined(name.to_owned()));
        }
        data.values.insert(name.to_owned(), value);
        Ok(())
    }

    /// Innermost binding of `name`, searching outwards.
    pub fn lookup(&self, name: &str) -> Result<Object, SymbolError> {
        let data = self.table_ptr.borrow();
        match data.values.get(name) {
            Some(value) => Ok(value.clone()),
            None => match &data.enclosing {
                Some(enclosing) => enclosing.lookup(name),
                None => Err(SymbolError::Undefined(name.to_owned())),
            },
        }
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.table_ptr.borrow().values.contains_key(name)
    }

    /// Overwrites the nearest binding of `name`. When no scope binds it, the name is
    /// defined in this scope instead.
    pub fn update(&self, name: &str, value: Object) {
        if let Some(owner) = self.owner_of(name) {
            owner
                .table_ptr
                .borrow_mut()
                .values
                .insert(name.to_owned(), value);
        } else {
            self.table_ptr
                .borrow_mut()
                .values
                .insert(name.to_owned(), value);
        }
    }

    fn owner_of(&self, name: &str) -> Option<SymbolTable> {
        let mut current = Some(self.clone());
        while let Some(table) = current {
            if table.contains_local(name) {
                return Some(table);
            }
            current = table.table_ptr.borrow().enclosing.clone();
        }
        None
    }

    /// Drops every binding of this scope, leaving enclosing scopes alone.
    pub fn clear(&self) {
        self.table_ptr.borrow_mut().values.clear();
    }

    /// Snapshot of this scope's own bindings.
    pub fn bindings(&self) -> HashMap<String, Object> {
        self.table_ptr.borrow().values.clone()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let data = self.table_ptr.borrow();
        let mut names: Vec<&String> = data.values.keys().collect();
        names.sort();
        write!(f, "<scope {:?}>", names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_once() {
        let table = SymbolTable::new();
        table.define("x", Object::Number(1.0)).unwrap();
        assert_eq!(
            table.define("x", Object::Number(2.0)),
            Err(SymbolError::AlreadyDefined("x".to_owned()))
        );
    }

    #[test]
    fn test_shadowing_and_lookup() {
        let outer = SymbolTable::new();
        outer.define("x", Object::Number(1.0)).unwrap();
        let inner = SymbolTable::with_enclosing(&outer);
        inner.define("x", Object::Number(2.0)).unwrap();

        assert_eq!(inner.lookup("x"), Ok(Object::Number(2.0)));
        assert_eq!(outer.lookup("x"), Ok(Object::Number(1.0)));
        assert_eq!(
            inner.lookup("y"),
            Err(SymbolError::Undefined("y".to_owned()))
        );
    }

    #[test]
    fn test_update_writes_to_owner() {
        let outer = SymbolTable::new();
        outer.define("count", Object::Number(0.0)).unwrap();
        let inner = SymbolTable::with_enclosing(&outer);

        inner.update("count", Object::Number(5.0));
        assert_eq!(outer.lookup("count"), Ok(Object::Number(5.0)));
        assert!(!inner.contains_local("count"));

        inner.update("fresh", Object::Boolean(true));
        assert!(inner.contains_local("fresh"));
        assert!(outer.lookup("fresh").is_err());
    }

    #[test]
    fn test_clear_keeps_enclosing() {
        let outer = SymbolTable::new();
        outer.define("a", Object::Number(1.0)).unwrap();
        let inner = SymbolTable::with_enclosing(&outer);
        inner.define("b", Object::Number(2.0)).unwrap();
        inner.clear();

        assert!(inner.lookup("b").is_err());
        assert_eq!(inner.lookup("a"), Ok(Object::Number(1.0)));
    }
}
