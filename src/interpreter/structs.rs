use super::array::ArrayCell;
use super::object::Object;
use crate::errors::{ErrorKind, LangError};
use crate::frontend::grammar::DataType;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum FieldError {
    #[error("Property: \"{0}\" doesn't exist")]
    Missing(String),
    #[error("Can't assign to immutable property: \"{0}\"")]
    Immutable(String),
}

impl From<FieldError> for LangError {
    fn from(error: FieldError) -> Self {
        LangError::unpositioned(ErrorKind::Runtime, error.to_string())
    }
}

/// Back-reference from a composite value to a container holding it.
#[derive(Clone)]
pub enum Owner {
    Struct(Weak<StructCell>),
    Array(Weak<ArrayCell>),
}

impl Owner {
    fn address(&self) -> *const () {
        match self {
            Owner::Struct(weak) => weak.as_ptr() as *const (),
            Owner::Array(weak) => weak.as_ptr() as *const (),
        }
    }
}

/// Containers a value currently lives in. Dead entries are dropped as they are met.
#[derive(Default)]
pub struct Owners(RefCell<Vec<Owner>>);

impl Owners {
    pub fn add(&self, owner: Owner) {
        let mut owners = self.0.borrow_mut();
        if !owners.iter().any(|o| o.address() == owner.address()) {
            owners.push(owner);
        }
    }

    /// Walks up the ownership graph, recomputing every struct display on the way.
    pub fn notify(&self, visited: &mut Vec<*const ()>) {
        let owners: Vec<Owner> = {
            let mut owners = self.0.borrow_mut();
            owners.retain(|owner| match owner {
                Owner::Struct(weak) => weak.strong_count() > 0,
                Owner::Array(weak) => weak.strong_count() > 0,
            });
            owners.clone()
        };

        for owner in owners {
            match owner {
                Owner::Struct(weak) => {
                    if let Some(cell) = weak.upgrade() {
                        StructRef(cell).refresh_from(visited);
                    }
                }
                Owner::Array(weak) => {
                    if let Some(cell) = weak.upgrade() {
                        let address = Rc::as_ptr(&cell) as *const ();
                        if !visited.contains(&address) {
                            visited.push(address);
                            cell.owners.notify(visited);
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum FieldType {
    Builtin(DataType),
    /// Instance of the struct with this name.
    Named(String),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
    pub writable: bool,
}

impl FieldSpec {
    pub fn new<S: Into<String>>(name: S, ty: FieldType, writable: bool) -> Self {
        FieldSpec {
            name: name.into(),
            ty,
            writable,
        }
    }

    pub fn accepts(&self, value: &Object) -> bool {
        match (&self.ty, value) {
            (FieldType::Builtin(data_type), value) => value.conforms_to(*data_type),
            (FieldType::Named(name), Object::Struct(instance)) => instance.name() == name,
            _ => false,
        }
    }

    pub fn type_name(&self) -> String {
        match &self.ty {
            FieldType::Builtin(data_type) => data_type.to_string(),
            FieldType::Named(name) => name.clone(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct StructDefinition {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl StructDefinition {
    pub fn new<S: Into<String>>(name: S, fields: Vec<FieldSpec>) -> StructDefRef {
        StructDefRef(Rc::new(StructDefinition {
            name: name.into(),
            fields,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct StructDefRef(pub Rc<StructDefinition>);

impl std::ops::Deref for StructDefRef {
    type Target = StructDefinition;

    fn deref(&self) -> &StructDefinition {
        &self.0
    }
}

impl PartialEq for StructDefRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for StructDefRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|field| {
                let ty = match &field.ty {
                    FieldType::Builtin(data_type) => data_type.keyword().to_owned(),
                    FieldType::Named(name) => name.clone(),
                };
                let marker = if field.writable { "!" } else { "" };
                format!("{}{}: {}", marker, field.name, ty)
            })
            .collect();
        write!(f, "{} {{ {} }}", self.name, fields.join(", "))
    }
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    value: Object,
    writable: bool,
}

pub struct StructCell {
    name: String,
    fields: RefCell<Vec<Field>>,
    display: RefCell<String>,
    owners: Owners,
}

/// Shared struct instance. Every alias sees field writes.
#[derive(Clone)]
pub struct StructRef(Rc<StructCell>);

impl StructRef {
    /// Builds an instance from values already checked against `definition`.
    pub fn instantiate(definition: &StructDefRef, values: Vec<Object>) -> StructRef {
        let fields = definition
            .fields
            .iter()
            .zip(values)
            .map(|(spec, value)| (spec.name.clone(), value, spec.writable))
            .collect();
        StructRef::new(&definition.name, fields)
    }

    /// Instance from `(name, value, writable)` triples.
    pub fn new(name: &str, fields: Vec<(String, Object, bool)>) -> StructRef {
        let fields = fields
            .into_iter()
            .map(|(name, value, writable)| Field {
                name,
                value,
                writable,
            })
            .collect();
        let cell = Rc::new(StructCell {
            name: name.to_owned(),
            fields: RefCell::new(fields),
            display: RefCell::new(String::new()),
            owners: Owners::default(),
        });

        let instance = StructRef(cell);
        for field in instance.0.fields.borrow().iter() {
            field.value.set_owner(instance.as_owner());
        }
        instance.recompute_display();
        instance
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn field(&self, name: &str) -> Option<Object> {
        self.0
            .fields
            .borrow()
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.clone())
    }

    pub fn field_names(&self) -> Vec<String> {
        self.0.fields.borrow().iter().map(|f| f.name.clone()).collect()
    }

    /// Writes a writable field and refreshes this instance and every container above it.
    pub fn set_field(&self, name: &str, value: Object) -> Result<(), FieldError> {
        {
            let mut fields = self.0.fields.borrow_mut();
            let field = fields
                .iter_mut()
                .find(|field| field.name == name)
                .ok_or_else(|| FieldError::Missing(name.to_owned()))?;
            if !field.writable {
                return Err(FieldError::Immutable(name.to_owned()));
            }
            field.value = value.clone();
        }

        value.set_owner(self.as_owner());
        self.refresh();
        Ok(())
    }

    pub fn add_owner(&self, owner: Owner) {
        self.0.owners.add(owner);
    }

    pub fn as_owner(&self) -> Owner {
        Owner::Struct(Rc::downgrade(&self.0))
    }

    pub fn refresh(&self) {
        self.refresh_from(&mut vec![]);
    }

    fn refresh_from(&self, visited: &mut Vec<*const ()>) {
        let address = Rc::as_ptr(&self.0) as *const ();
        if visited.contains(&address) {
            return;
        }
        visited.push(address);
        self.recompute_display();
        self.0.owners.notify(visited);
    }

    fn recompute_display(&self) {
        let fields: Vec<String> = self
            .0
            .fields
            .borrow()
            .iter()
            .map(|field| format!("{}: {}", field.name, field.value.display_nested()))
            .collect();
        let display = if fields.is_empty() {
            format!("{} {{}}", self.0.name)
        } else {
            format!("{} {{ {} }}", self.0.name, fields.join(", "))
        };
        *self.0.display.borrow_mut() = display;
    }

    pub fn display(&self) -> String {
        self.0.display.borrow().clone()
    }
}

impl PartialEq for StructRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for StructRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<struct {}>", self.0.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::array::ArrayRef;

    fn inner_def() -> StructDefRef {
        StructDefinition::new(
            "Inner",
            vec![FieldSpec::new("v", FieldType::Builtin(DataType::Number), true)],
        )
    }

    #[test]
    fn test_definition_display() {
        let def = StructDefinition::new(
            "Point",
            vec![
                FieldSpec::new("x", FieldType::Builtin(DataType::Number), true),
                FieldSpec::new("label", FieldType::Builtin(DataType::String), false),
            ],
        );
        assert_eq!(def.to_string(), "Point { !x: int, label: string }");
    }

    #[test]
    fn test_mutation_propagates_to_outer_struct() {
        let inner = StructRef::instantiate(&inner_def(), vec![Object::Number(1.0)]);
        let outer_def = StructDefinition::new(
            "Outer",
            vec![FieldSpec::new("inner", FieldType::Named("Inner".to_owned()), true)],
        );
        let outer = StructRef::instantiate(&outer_def, vec![Object::Struct(inner.clone())]);
        assert_eq!(outer.display(), "Outer { inner: Inner { v: 1 } }");

        inner.set_field("v", Object::Number(5.0)).unwrap();
        assert_eq!(outer.display(), "Outer { inner: Inner { v: 5 } }");
    }

    #[test]
    fn test_mutation_propagates_through_arrays() {
        let inner = StructRef::instantiate(&inner_def(), vec![Object::Number(1.0)]);
        let list = ArrayRef::new(vec![Object::Struct(inner.clone())]);
        let holder = StructRef::new(
            "Holder",
            vec![("items".to_owned(), Object::Array(list), true)],
        );

        inner.set_field("v", Object::Number(2.0)).unwrap();
        assert_eq!(holder.display(), "Holder { items: [ Inner { v: 2 } ] }");
    }

    #[test]
    fn test_immutable_field() {
        let def = StructDefinition::new(
            "Fixed",
            vec![FieldSpec::new("x", FieldType::Builtin(DataType::Number), false)],
        );
        let fixed = StructRef::instantiate(&def, vec![Object::Number(1.0)]);
        assert_eq!(
            fixed.set_field("x", Object::Number(2.0)),
            Err(FieldError::Immutable("x".to_owned()))
        );
        assert_eq!(fixed.field("x"), Some(Object::Number(1.0)));
        assert_eq!(
            fixed.set_field("y", Object::Number(2.0)),
            Err(FieldError::Missing("y".to_owned()))
        );
    }

    #[test]
    fn test_self_reference_terminates() {
        let node = StructRef::new(
            "Node",
            vec![("next".to_owned(), Object::Number(0.0), true)],
        );
        node.set_field("next", Object::Struct(node.clone())).unwrap();
        assert!(node.display().starts_with("Node { next: "));
    }

    #[test]
    fn test_field_type_acceptance() {
        let spec = FieldSpec::new("inner", FieldType::Named("Inner".to_owned()), false);
        let inner = StructRef::instantiate(&inner_def(), vec![Object::Number(1.0)]);
        assert!(spec.accepts(&Object::Struct(inner)));
        assert!(!spec.accepts(&Object::Number(1.0)));
    }
}
