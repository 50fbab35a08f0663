use super::object::{runtime, Object};
use crate::errors::LangResult;
use crate::frontend::grammar::InfixOperator;

/// What a value compares as once both sides are known to share a variant.
#[derive(Debug, PartialEq, PartialOrd)]
enum CompareKey {
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl CompareKey {
    fn of(value: &Object) -> CompareKey {
        match value {
            Object::Number(n) => CompareKey::Number(*n),
            Object::Str(s) => CompareKey::Text(s.clone()),
            Object::Boolean(b) => CompareKey::Boolean(*b),
            Object::EnumValue(name) => CompareKey::Text(name.clone()),
            composite => CompareKey::Text(composite.to_string()),
        }
    }
}

/// Comparison and logical operators. Both operands must be of the same variant.
pub fn compare(op: InfixOperator, lhs: &Object, rhs: &Object) -> LangResult<Object> {
    if std::mem::discriminant(lhs) != std::mem::discriminant(rhs) {
        return Err(runtime(format!(
            "Can't compare type {} to {}",
            lhs.data_type(),
            rhs.data_type()
        )));
    }

    let (a, b) = (CompareKey::of(lhs), CompareKey::of(rhs));
    let result = match op {
        InfixOperator::EqualTo => a == b,
        InfixOperator::NotEqualTo => a != b,
        InfixOperator::GreaterThan => a > b,
        InfixOperator::GreaterEq => a >= b,
        InfixOperator::LessThan => a < b,
        InfixOperator::LessEq => a <= b,
        InfixOperator::And => lhs.is_truthy() && rhs.is_truthy(),
        InfixOperator::Or => lhs.is_truthy() || rhs.is_truthy(),
        _ => {
            return Err(runtime(format!(
                "Operator '{}' is not a comparison",
                op.symbol()
            )))
        }
    };

    Ok(Object::Boolean(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::interpreter::array::ArrayRef;

    fn num(n: f64) -> Object {
        Object::Number(n)
    }

    fn text(s: &str) -> Object {
        Object::Str(s.to_owned())
    }

    #[test]
    fn test_numbers() {
        assert_eq!(compare(InfixOperator::LessThan, &num(1.0), &num(2.0)), Ok(Object::Boolean(true)));
        assert_eq!(compare(InfixOperator::GreaterEq, &num(2.0), &num(2.0)), Ok(Object::Boolean(true)));
        assert_eq!(compare(InfixOperator::NotEqualTo, &num(2.0), &num(2.0)), Ok(Object::Boolean(false)));
    }

    #[test]
    fn test_strings_compare_lexically() {
        assert_eq!(compare(InfixOperator::LessThan, &text("apple"), &text("banana")), Ok(Object::Boolean(true)));
        assert_eq!(compare(InfixOperator::EqualTo, &text("a"), &text("a")), Ok(Object::Boolean(true)));
    }

    #[test]
    fn test_logical_operators_use_truthiness() {
        let yes = Object::Boolean(true);
        let no = Object::Boolean(false);
        assert_eq!(compare(InfixOperator::And, &yes, &no), Ok(Object::Boolean(false)));
        assert_eq!(compare(InfixOperator::Or, &yes, &no), Ok(Object::Boolean(true)));
        assert_eq!(compare(InfixOperator::And, &num(1.0), &num(3.0)), Ok(Object::Boolean(true)));
    }

    #[test]
    fn test_composites_compare_by_display() {
        let a = Object::Array(ArrayRef::new(vec![num(1.0), num(2.0)]));
        let b = Object::Array(ArrayRef::new(vec![num(1.0), num(2.0)]));
        assert_eq!(compare(InfixOperator::EqualTo, &a, &b), Ok(Object::Boolean(true)));
    }

    #[test]
    fn test_mismatched_variants() {
        let error = compare(InfixOperator::EqualTo, &num(1.0), &text("1")).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Runtime);
        assert_eq!(error.message, "Can't compare type NUMBER to STRING");
    }
}
