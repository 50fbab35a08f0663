use super::context::{Context, ContextKind};
use super::interpreter::{Evaluation, Interpreter, MAX_CALL_DEPTH};
use super::native_function::NativeArgs;
use super::object::{runtime, Callable, Object};
use super::structs::StructRef;
use super::symbol_table::SymbolTable;
use crate::errors::{ErrorKind, LangError, LangResult};
use crate::frontend::grammar::{DataType, Identifier, Member, Node};
use crate::frontend::Position;

use std::rc::Rc;

impl Interpreter {
    /// `callee(args)`: the callee must evaluate to a function.
    pub(super) fn eval_call(
        &mut self,
        callee: &Node,
        args: &[Node],
        ctx: &Rc<Context>,
    ) -> LangResult<Evaluation> {
        let value = self.eval_value(callee, ctx)?;
        let callable = value.as_callable().ok_or_else(|| {
            LangError::runtime(format!("{} is not a function", value), callee.position)
        })?;

        let result = self.invoke(&callable, None, args, callee.position, ctx)?;
        Ok(into_evaluation(result))
    }

    /// Checks arity, evaluates and binds the arguments, then runs the callable and
    /// validates what it returned.
    fn invoke(
        &mut self,
        callable: &Callable,
        receiver: Option<Object>,
        args: &[Node],
        position: Position,
        ctx: &Rc<Context>,
    ) -> LangResult<Option<Object>> {
        let params = callable.params();
        if params.len() != args.len() {
            return Err(LangError::runtime(
                format!(
                    "Expected {} arguments. Received {} arguments",
                    params.len(),
                    args.len()
                ),
                position,
            ));
        }
        let bound = self.bind_args(callable, args, ctx)?;

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(LangError::runtime("Maximum call depth exceeded", position));
        }
        tracing::trace!(function = callable.name(), depth = self.call_depth, "call");

        self.call_depth += 1;
        let result = match callable {
            Callable::User(f) => f.execute(bound, self, ctx),
            Callable::Native(f) => {
                let mut native_args = NativeArgs::new(bound);
                if let Some(receiver) = receiver {
                    native_args.push("value", receiver);
                }
                let native_ctx = Context::new(
                    callable.context_name(),
                    ctx.file_name.clone(),
                    ContextKind::Function,
                    SymbolTable::with_enclosing(&ctx.symbols),
                    Some(ctx.clone()),
                );
                f.execute(&native_args, self, &native_ctx)
                    .map_err(|e| e.with_trace(native_ctx.trace()))
            }
        };
        self.call_depth -= 1;

        check_return(callable, result?).map_err(|e| e.or_at(position))
    }

    fn bind_args(
        &mut self,
        callable: &Callable,
        args: &[Node],
        ctx: &Rc<Context>,
    ) -> LangResult<Vec<(String, Object)>> {
        let mut bound = vec![];

        for (param, arg) in callable.params().into_iter().zip(args.iter()) {
            let value = self.eval_value(arg, ctx)?.wrap_enum_value();
            if !value.conforms_to(param.ty) {
                return Err(LangError::type_error(
                    format!(
                        "Expected type: {}. Received: {}",
                        param.ty,
                        value.data_type()
                    ),
                    arg.position,
                ));
            }
            bound.push((param.name, value));
        }

        Ok(bound)
    }

    /// Evaluates `object.a.b(x)[0]...` and yields the last member's value. `None`
    /// means the chain ended on a method returning `null`.
    pub(super) fn eval_dot(
        &mut self,
        object: &Node,
        members: &[Member],
        ctx: &Rc<Context>,
    ) -> LangResult<Evaluation> {
        let base = self.eval_value(object, ctx)?;
        let value = self.eval_members(base, members, ctx)?;
        Ok(into_evaluation(value))
    }

    pub(super) fn eval_members(
        &mut self,
        base: Object,
        members: &[Member],
        ctx: &Rc<Context>,
    ) -> LangResult<Option<Object>> {
        let mut current = base;

        for (i, member) in members.iter().enumerate() {
            let next = match member {
                Member::Property(name, indexes) => {
                    let value = current
                        .property(&name.name)
                        .map_err(|e| e.or_at(name.position))?;
                    Some(self.apply_indexes(value, indexes, ctx)?)
                }
                Member::Method(name, args) => {
                    let method = current
                        .method(&name.name)
                        .map_err(|e| e.or_at(name.position))?;
                    self.invoke(&method.callable, method.receiver, args, name.position, ctx)?
                }
            };

            current = match next {
                Some(value) => value,
                None if i + 1 == members.len() => return Ok(None),
                None => {
                    return Err(LangError::runtime(
                        format!("Can't access members of {}()'s result", member.name().name),
                        member.name().position,
                    ))
                }
            };
        }

        Ok(Some(current))
    }

    /// `new Name(args)`: one argument per field, in declaration order.
    pub(super) fn eval_struct_init(
        &mut self,
        name: &Identifier,
        args: &[Node],
        ctx: &Rc<Context>,
    ) -> LangResult<Object> {
        let definition = match ctx.symbols.lookup(&name.name) {
            Ok(Object::StructDef(definition)) => definition,
            _ => {
                return Err(LangError::runtime(
                    format!("Can't instantiate node: {}", name.name),
                    name.position,
                ))
            }
        };

        if definition.fields.len() != args.len() {
            return Err(LangError::runtime(
                format!(
                    "Expected {} arguments. Received {} arguments",
                    definition.fields.len(),
                    args.len()
                ),
                name.position,
            ));
        }

        let mut values = vec![];
        for (field, arg) in definition.fields.iter().zip(args.iter()) {
            let value = self.eval_value(arg, ctx)?;
            if !field.accepts(&value) {
                return Err(LangError::type_error(
                    format!(
                        "Expected type: {}. Received: {}",
                        field.type_name(),
                        value.data_type()
                    ),
                    arg.position,
                ));
            }
            values.push(value);
        }

        Ok(Object::Struct(StructRef::instantiate(&definition, values)))
    }
}

fn into_evaluation(value: Option<Object>) -> Evaluation {
    match value {
        Some(value) => Evaluation::Value(value),
        None => Evaluation::Nothing,
    }
}

/// A `null` function must not return a value; any other function must return one of
/// its declared type.
fn check_return(callable: &Callable, value: Option<Object>) -> LangResult<Option<Object>> {
    let expected = callable.return_type();

    match (expected, value) {
        (DataType::Null, None) => Ok(None),
        (DataType::Null, Some(_)) => Err(runtime("No return value expected")),
        (_, None) => Err(runtime("Expected return value")),
        (expected, Some(value)) if value.conforms_to(expected) => Ok(Some(value)),
        (expected, Some(value)) => Err(LangError::unpositioned(
            ErrorKind::Type,
            format!(
                "Expected return type: {}. Received: {}",
                expected,
                value.data_type()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::loader::MemoryLoader;

    fn run(source: &str) -> LangResult<Vec<String>> {
        let mut interpreter = Interpreter::with_loader("calls.basp", Rc::new(MemoryLoader::default()));
        interpreter.run(source)?;
        Ok(interpreter.output().printed())
    }

    #[test]
    fn test_arity_checked_before_arguments() {
        let error = run("fn add(a: int, b: int): int { return a + b }\nadd(1, missing, 3)").unwrap_err();
        assert_eq!(error.message, "Expected 2 arguments. Received 3 arguments");
    }

    #[test]
    fn test_argument_types() {
        let error = run("fn twice(n: int): int { return n * 2 }\ntwice(\"a\")").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Type);
        assert_eq!(error.message, "Expected type: NUMBER. Received: STRING");
        assert_eq!(error.position.map(|p| p.line_no), Some(1));
    }

    #[test]
    fn test_return_contract() {
        let error = run("fn f(): null { return 1 }\nf()").unwrap_err();
        assert_eq!(error.message, "No return value expected");

        let error = run("fn f(): int { int x = 1 }\nf()").unwrap_err();
        assert_eq!(error.message, "Expected return value");

        let error = run("fn f(): string { return 1 }\nf()").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Type);
        assert_eq!(error.message, "Expected return type: STRING. Received: NUMBER");
    }

    #[test]
    fn test_not_a_function() {
        let error = run("int x = 1\nx()").unwrap_err();
        assert_eq!(error.message, "1 is not a function");
    }

    #[test]
    fn test_builtin_frames_in_trace() {
        let error = run("Math.Floor(\"abc\")").unwrap_err();
        assert_eq!(error.message, "Expected type: NUMBER. Received: STRING");
        assert_eq!(error.trace[0].display_name, "<built-in Floor>");
    }

    #[test]
    fn test_method_chains() {
        let printed = run("string s = \"a,b\"\nPrint(s.split(\",\").length)\nPrint(\"hi\".toUpperCase())").unwrap();
        assert_eq!(printed, vec!["2", "HI"]);
    }

    #[test]
    fn test_struct_function_field() {
        let source = "fn hello(): string { return \"hi\" }\nstruct Greeter { greet: fn }\nGreeter g = new Greeter(hello)\nPrint(g.greet())";
        assert_eq!(run(source).unwrap(), vec!["hi"]);
    }

    #[test]
    fn test_struct_init_checks() {
        let source = "struct P { !x: int, y: string }\n";
        let error = run(&format!("{}new P(1)", source)).unwrap_err();
        assert_eq!(error.message, "Expected 2 arguments. Received 1 arguments");

        let error = run(&format!("{}new P(\"a\", \"b\")", source)).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Type);

        let error = run("new Missing(1)").unwrap_err();
        assert_eq!(error.message, "Can't instantiate node: Missing");
    }

    #[test]
    fn test_null_method_result_cannot_be_chained() {
        let error = run("array a = [1]\na.push(2).length").unwrap_err();
        assert_eq!(error.message, "Can't access members of push()'s result");
    }
}
