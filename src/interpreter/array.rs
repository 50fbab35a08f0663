use super::object::Object;
use super::structs::{Owner, Owners};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

pub struct ArrayCell {
    elements: RefCell<Vec<Object>>,
    pub(super) owners: Owners,
    displaying: Cell<bool>,
}

/// Shared, growable list of values.
#[derive(Clone)]
pub struct ArrayRef(Rc<ArrayCell>);

impl ArrayRef {
    pub fn new(elements: Vec<Object>) -> Self {
        let array = ArrayRef(Rc::new(ArrayCell {
            elements: RefCell::new(elements),
            owners: Owners::default(),
            displaying: Cell::new(false),
        }));
        for element in array.0.elements.borrow().iter() {
            element.set_owner(array.as_owner());
        }
        array
    }

    pub fn len(&self) -> usize {
        self.0.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Object> {
        self.0.elements.borrow().get(index).cloned()
    }

    pub fn elements(&self) -> Vec<Object> {
        self.0.elements.borrow().clone()
    }

    pub fn push(&self, value: Object) {
        value.set_owner(self.as_owner());
        self.0.elements.borrow_mut().push(value);
        self.notify_owners();
    }

    pub fn pop(&self) -> Option<Object> {
        let popped = self.0.elements.borrow_mut().pop();
        self.notify_owners();
        popped
    }

    /// Replaces an existing slot. Returns false when `index` is past the end.
    pub fn set(&self, index: usize, value: Object) -> bool {
        {
            let mut elements = self.0.elements.borrow_mut();
            match elements.get_mut(index) {
                Some(slot) => *slot = value.clone(),
                None => return false,
            }
        }
        value.set_owner(self.as_owner());
        self.notify_owners();
        true
    }

    pub fn add_owner(&self, owner: Owner) {
        self.0.owners.add(owner);
    }

    fn as_owner(&self) -> Owner {
        Owner::Array(Rc::downgrade(&self.0))
    }

    fn notify_owners(&self) {
        let mut visited = vec![Rc::as_ptr(&self.0) as *const ()];
        self.0.owners.notify(&mut visited);
    }

    pub fn display(&self) -> String {
        if self.0.displaying.replace(true) {
            return "[...]".to_owned();
        }
        let items: Vec<String> = self
            .0
            .elements
            .borrow()
            .iter()
            .map(Object::display_nested)
            .collect();
        self.0.displaying.set(false);

        if items.is_empty() {
            "[]".to_owned()
        } else {
            format!("[ {} ]", items.join(", "))
        }
    }
}

impl PartialEq for ArrayRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<array {}>", self.len())
    }
}

/// Ordered set of member names. Immutable once created.
#[derive(Debug, PartialEq, Clone)]
pub struct EnumRef(Rc<Vec<String>>);

impl EnumRef {
    pub fn new(members: Vec<String>) -> Self {
        EnumRef(Rc::new(members))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, index: usize) -> Option<String> {
        self.0.get(index).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|member| member == name)
    }

    pub fn members(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for EnumRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "{{}}")
        } else {
            write!(f, "{{ {} }}", self.0.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_share_elements() {
        let array = ArrayRef::new(vec![Object::Number(1.0)]);
        let alias = array.clone();
        alias.push(Object::Number(2.0));

        assert_eq!(array.len(), 2);
        assert_eq!(array.display(), "[ 1, 2 ]");
        assert_eq!(array.pop(), Some(Object::Number(2.0)));
        assert_eq!(alias.len(), 1);
    }

    #[test]
    fn test_set_in_bounds_only() {
        let array = ArrayRef::new(vec![Object::Number(1.0)]);
        assert!(array.set(0, Object::Number(9.0)));
        assert!(!array.set(3, Object::Number(9.0)));
        assert_eq!(array.get(0), Some(Object::Number(9.0)));
    }

    #[test]
    fn test_self_containing_array_display() {
        let array = ArrayRef::new(vec![]);
        array.push(Object::Array(array.clone()));
        assert_eq!(array.display(), "[ [...] ]");
    }

    #[test]
    fn test_empty_displays() {
        assert_eq!(ArrayRef::new(vec![]).display(), "[]");
        assert_eq!(EnumRef::new(vec![]).to_string(), "{}");
    }
}
