use super::array::ArrayRef;
use super::context::Context;
use super::function::ParamSpec;
use super::interpreter::Interpreter;
use super::native_function::{NativeArgs, NativeFn};
use super::object::{runtime, Object};
use super::structs::StructRef;
use super::symbol_table::{SymbolError, SymbolTable};
use crate::errors::LangResult;
use crate::frontend::grammar::DataType;

use rand::Rng;
use std::rc::Rc;

type NativeResult = LangResult<Option<Object>>;

/// Binds the global built-ins into a program's top-level table.
pub fn install(symbols: &SymbolTable) -> Result<(), SymbolError> {
    for func in get_native_funcs() {
        symbols.define(&func.name().to_owned(), Object::NativeFunc(func))?;
    }
    symbols.define("Math", math_struct())
}

/// Whether `name` is one of the bindings `install` creates.
pub fn is_builtin(name: &str) -> bool {
    name == "Math" || get_native_funcs().iter().any(|func| func.name() == name)
}

pub fn get_native_funcs() -> Vec<NativeFn> {
    let any = |name: &str| vec![ParamSpec::new(name, DataType::Any)];
    vec![
        NativeFn::new(
            "Number",
            vec![ParamSpec::new("string", DataType::String)],
            DataType::Number,
            to_number,
        ),
        NativeFn::new("String", any("value"), DataType::String, to_string),
        NativeFn::new("Print", any("input"), DataType::Null, print),
        NativeFn::new("Clear", vec![], DataType::Null, clear),
        NativeFn::new("IsArray", any("array"), DataType::Boolean, is_array),
        NativeFn::new("IsNumber", any("number"), DataType::Boolean, is_number),
        NativeFn::new("IsString", any("string"), DataType::Boolean, is_string),
        NativeFn::new("IsEnum", any("enum"), DataType::Boolean, is_enum),
        NativeFn::new("IsBoolean", any("boolean"), DataType::Boolean, is_boolean),
        NativeFn::new("IsFunction", any("function"), DataType::Boolean, is_function),
        NativeFn::new("Typeof", any("input"), DataType::String, type_of),
    ]
}

/// `Math`: a read-only struct of numeric helpers.
fn math_struct() -> Object {
    let v = || vec![ParamSpec::new("v", DataType::Any)];
    let methods = vec![
        NativeFn::new("Floor", v(), DataType::Number, floor),
        NativeFn::new("Ceil", v(), DataType::Number, ceil),
        NativeFn::new("Round", v(), DataType::Number, round),
        NativeFn::new("Abs", v(), DataType::Number, abs),
        NativeFn::new("Sqrt", v(), DataType::Number, sqrt),
        NativeFn::new("Random", vec![], DataType::Number, random),
    ];

    let mut fields: Vec<(String, Object, bool)> = methods
        .into_iter()
        .map(|func| (func.name().to_owned(), Object::NativeFunc(func), false))
        .collect();
    fields.push(("PI".to_owned(), Object::Number(std::f64::consts::PI), false));

    Object::Struct(StructRef::new("Math", fields))
}

/// Zero-argument members every value of a given type exposes.
pub fn builtin_property(value: &Object, name: &str) -> Option<Object> {
    let property = match (value, name) {
        (Object::Str(s), "length") => Object::Number(s.chars().count() as f64),
        (Object::Array(array), "length") => Object::Number(array.len() as f64),
        (Object::Enum(members), "length") => Object::Number(members.len() as f64),
        (Object::Function(f), "name") => Object::Str(f.name().to_owned()),
        (Object::NativeFunc(f), "name") => Object::Str(f.name().to_owned()),
        _ => return None,
    };
    Some(property)
}

/// Built-in methods of strings and arrays. The receiver arrives as `"value"`.
pub fn builtin_method(value: &Object, name: &str) -> Option<NativeFn> {
    let method = match (value, name) {
        (Object::Str(_), "toUpperCase") => {
            NativeFn::new("toUpperCase", vec![], DataType::String, to_upper_case)
        }
        (Object::Str(_), "toLowerCase") => {
            NativeFn::new("toLowerCase", vec![], DataType::String, to_lower_case)
        }
        (Object::Str(_), "split") => NativeFn::new(
            "split",
            vec![ParamSpec::new("delimiter", DataType::String)],
            DataType::Array,
            split,
        ),
        (Object::Array(_), "push") => NativeFn::new(
            "push",
            vec![ParamSpec::new("newElement", DataType::Any)],
            DataType::Null,
            push,
        ),
        (Object::Array(_), "pop") => NativeFn::new("pop", vec![], DataType::Null, pop),
        _ => return None,
    };
    Some(method)
}

fn to_number(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    let text = args.string("string")?;
    Ok(Some(Object::Number(parse_number(text))))
}

/// Decimal, signed infinity or `0x`/`0o`/`0b` text; blank text is 0 and anything else NaN.
fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }

    let radix = match text.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&text[2..], radix)
            .map(|value| value as f64)
            .unwrap_or(f64::NAN);
    }

    let unsigned = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    match unsigned {
        "Infinity" if text.starts_with('-') => f64::NEG_INFINITY,
        "Infinity" => f64::INFINITY,
        digits if digits.chars().all(|c| c.is_ascii_digit() || "+-.eE".contains(c)) => {
            text.parse().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

fn to_string(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    Ok(Some(Object::Str(args.get("value")?.to_string())))
}

fn print(args: &NativeArgs, interpreter: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    interpreter.output().print(args.get("input")?.to_string());
    Ok(None)
}

fn clear(_: &NativeArgs, interpreter: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    interpreter.output().clear();
    Ok(None)
}

fn check_type(args: &NativeArgs, name: &str, data_type: DataType) -> NativeResult {
    let value = args.get(name)?;
    Ok(Some(Object::Boolean(value.data_type() == data_type)))
}

fn is_array(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    check_type(args, "array", DataType::Array)
}

fn is_number(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    check_type(args, "number", DataType::Number)
}

fn is_string(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    check_type(args, "string", DataType::String)
}

fn is_enum(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    check_type(args, "enum", DataType::Enum)
}

fn is_boolean(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    check_type(args, "boolean", DataType::Boolean)
}

fn is_function(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    check_type(args, "function", DataType::Function)
}

fn type_of(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    let value = args.get("input")?;
    Ok(Some(Object::Str(value.data_type().name().to_owned())))
}

fn math_op(args: &NativeArgs, op: fn(f64) -> f64) -> NativeResult {
    Ok(Some(Object::Number(op(args.number("v")?))))
}

fn floor(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    math_op(args, f64::floor)
}

fn ceil(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    math_op(args, f64::ceil)
}

// Halves round towards positive infinity: Round(-2.5) is -2.
fn round(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    math_op(args, |v| (v + 0.5).floor())
}

fn abs(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    math_op(args, f64::abs)
}

fn sqrt(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    math_op(args, f64::sqrt)
}

fn random(_: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    let mut rng = rand::thread_rng();
    Ok(Some(Object::Number(rng.gen::<f64>())))
}

fn to_upper_case(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    Ok(Some(Object::Str(args.string("value")?.to_uppercase())))
}

fn to_lower_case(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    Ok(Some(Object::Str(args.string("value")?.to_lowercase())))
}

fn split(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    let text = args.string("value")?;
    let delimiter = args.string("delimiter")?;
    let parts: Vec<Object> = if delimiter.is_empty() {
        text.chars().map(|c| Object::Str(c.to_string())).collect()
    } else {
        text.split(delimiter)
            .map(|part| Object::Str(part.to_owned()))
            .collect()
    };
    Ok(Some(Object::Array(ArrayRef::new(parts))))
}

fn receiver_array(args: &NativeArgs) -> LangResult<ArrayRef> {
    match args.get("value")? {
        Object::Array(array) => Ok(array.clone()),
        other => Err(runtime(format!(
            "Expected type: ARRAY. Received: {}",
            other.data_type()
        ))),
    }
}

fn push(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    let array = receiver_array(args)?;
    array.push(args.get("newElement")?.clone());
    Ok(None)
}

fn pop(args: &NativeArgs, _: &mut Interpreter, _: &Rc<Context>) -> NativeResult {
    receiver_array(args)?.pop();
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::loader::MemoryLoader;
    use ::more_asserts::*;

    fn call(func: &NativeFn, values: Vec<(&str, Object)>) -> LangResult<Option<Object>> {
        let mut interpreter = Interpreter::with_loader("test.basp", Rc::new(MemoryLoader::default()));
        let ctx = interpreter.globals();
        let args = NativeArgs::new(
            values
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect(),
        );
        func.execute(&args, &mut interpreter, &ctx)
    }

    fn lookup(name: &str) -> NativeFn {
        let symbols = SymbolTable::new();
        install(&symbols).unwrap();
        match symbols.lookup(name).unwrap() {
            Object::NativeFunc(func) => func,
            other => panic!("{} is not a built-in: {:?}", name, other),
        }
    }

    fn math(name: &str) -> NativeFn {
        match math_struct() {
            Object::Struct(math) => match math.field(name) {
                Some(Object::NativeFunc(func)) => func,
                other => panic!("Math.{} is not a built-in: {:?}", name, other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_number_conversion() {
        let number = lookup("Number");
        assert_eq!(
            call(&number, vec![("string", Object::Str("42".to_owned()))]),
            Ok(Some(Object::Number(42.0)))
        );
        assert_eq!(
            call(&number, vec![("string", Object::Str("-Infinity".to_owned()))]),
            Ok(Some(Object::Number(f64::NEG_INFINITY)))
        );
    }

    #[test]
    fn test_number_conversion_of_unparsable_text() {
        assert!(parse_number("4x").is_nan());
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("1e").is_nan());
        assert!(parse_number("0xZZ").is_nan());
        assert_eq!(parse_number("  "), 0.0);
        assert_eq!(parse_number(" 12.5 "), 12.5);
        assert_eq!(parse_number("0x1F"), 31.0);
        assert_eq!(parse_number("1e3"), 1000.0);
    }

    #[test]
    fn test_typeof() {
        let type_of = lookup("Typeof");
        assert_eq!(
            call(&type_of, vec![("input", Object::Boolean(true))]),
            Ok(Some(Object::Str("BOOL".to_owned())))
        );
    }

    #[test]
    fn test_rounding() {
        let round = math("Round");
        assert_eq!(call(&round, vec![("v", Object::Number(2.5))]), Ok(Some(Object::Number(3.0))));
        assert_eq!(call(&round, vec![("v", Object::Number(-2.5))]), Ok(Some(Object::Number(-2.0))));
        assert_eq!(call(&math("Floor"), vec![("v", Object::Number(2.7))]), Ok(Some(Object::Number(2.0))));
    }

    #[test]
    fn test_random_in_unit_interval() {
        for _ in 0..20 {
            match call(&math("Random"), vec![]) {
                Ok(Some(Object::Number(n))) => {
                    assert_ge!(n, 0.0);
                    assert_lt!(n, 1.0);
                }
                other => panic!("unexpected result {:?}", other),
            }
        }
    }

    #[test]
    fn test_math_is_read_only() {
        match math_struct() {
            Object::Struct(math) => assert!(math.set_field("PI", Object::Number(3.0)).is_err()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_string_members() {
        let text = Object::Str("a,b,c".to_owned());
        assert_eq!(builtin_property(&text, "length"), Some(Object::Number(5.0)));

        let split = builtin_method(&text, "split").unwrap();
        let parts = call(
            &split,
            vec![("delimiter", Object::Str(",".to_owned())), ("value", text)],
        )
        .unwrap()
        .unwrap();
        assert_eq!(parts.to_string(), "[ \"a\", \"b\", \"c\" ]");
    }

    #[test]
    fn test_array_members_mutate_in_place() {
        let array = ArrayRef::new(vec![Object::Number(1.0)]);
        let value = Object::Array(array.clone());

        let push = builtin_method(&value, "push").unwrap();
        call(&push, vec![("newElement", Object::Number(2.0)), ("value", value.clone())]).unwrap();
        assert_eq!(array.len(), 2);

        let pop = builtin_method(&value, "pop").unwrap();
        call(&pop, vec![("value", value)]).unwrap();
        assert_eq!(array.elements(), vec![Object::Number(1.0)]);
        assert!(builtin_method(&Object::Number(1.0), "push").is_none());
    }
}
