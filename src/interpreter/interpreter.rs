use super::array::{ArrayRef, EnumRef};
use super::context::{Context, ContextKind, ControlSignal};
use super::function::UserFn;
use super::loader::{normalize_path, DefaultLoader, ModuleLoader};
use super::object::{runtime, Object};
use super::output::OutputSink;
use super::stdlib;
use super::structs::{FieldSpec, FieldType, StructDefinition, StructRef};
use super::symbol_table::SymbolTable;
use crate::errors::{ErrorKind, LangError, LangResult};
use crate::frontend::grammar::{
    AssignOperator, DataType, ForControls, Identifier, Member, Node, NodeKind, StructDecl,
    TypeAnnotation,
};
use crate::frontend::Parser;

use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

pub const MAX_CALL_DEPTH: usize = 1000;

/// Outcome of visiting one node.
#[derive(Debug, PartialEq, Clone)]
pub enum Evaluation {
    Value(Object),
    /// Declarations, imports and calls of `null` functions.
    Nothing,
    /// Values produced by the statements of a block, in order.
    Multi(Vec<Object>),
    Signal(ControlSignal),
    Return(Option<Object>),
}

/// Execution handle of one program: its global frame, the modules it already imported
/// and the output shared with every module it pulls in.
pub struct Interpreter {
    pub(super) path: PathBuf,
    pub(super) globals: Rc<Context>,
    pub(super) output: OutputSink,
    pub(super) loader: Rc<dyn ModuleLoader>,
    pub(super) imports: HashSet<String>,
    pub(super) import_chain: Vec<PathBuf>,
    pub(super) call_depth: usize,
}

impl Interpreter {
    /// Interpreter for the program in `file_name`, loading imports from disk and the
    /// default registry.
    pub fn new(file_name: &str) -> Self {
        Self::with_loader(file_name, Rc::new(DefaultLoader::default()))
    }

    pub fn with_loader(file_name: &str, loader: Rc<dyn ModuleLoader>) -> Self {
        let path = PathBuf::from(file_name);
        let chain = vec![normalize_path(&path)];
        Self::for_module(path, None, OutputSink::new(), loader, chain)
    }

    pub(super) fn for_module(
        path: PathBuf,
        importer: Option<Rc<Context>>,
        output: OutputSink,
        loader: Rc<dyn ModuleLoader>,
        import_chain: Vec<PathBuf>,
    ) -> Self {
        let symbols = SymbolTable::new();
        stdlib::install(&symbols).expect("built-in names are unique");
        let file_name = path.display().to_string();

        Interpreter {
            path,
            globals: Context::global(&file_name, symbols, importer),
            output,
            loader,
            imports: HashSet::new(),
            import_chain,
            call_depth: 0,
        }
    }

    pub fn globals(&self) -> Rc<Context> {
        self.globals.clone()
    }

    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    /// Lexes, parses and evaluates a whole program. Returns the values of the top-level
    /// expression statements.
    #[tracing::instrument(level = "debug", skip_all, fields(file = %self.globals.file_name))]
    pub fn run(&mut self, source: &str) -> LangResult<Vec<Object>> {
        let globals = self.globals.clone();
        let tree = Parser::from_source(source)
            .map_err(|e| e.with_trace(globals.trace()))?
            .parse();
        tree.check().map_err(|e| e.with_trace(globals.trace()))?;

        match self.evaluate(&tree.root, &globals)? {
            Evaluation::Multi(values) => Ok(values),
            Evaluation::Value(value) => Ok(vec![value]),
            _ => Ok(vec![]),
        }
    }

    /// Visits `node` in `ctx`. Errors leave here positioned and carrying the frame
    /// chain they were raised in.
    pub fn evaluate(&mut self, node: &Node, ctx: &Rc<Context>) -> LangResult<Evaluation> {
        #[cfg(feature = "trace-execution")]
        tracing::trace!(node = node.kind.name(), position = %node.position, frame = %ctx.display_name, "visit");

        crate::stack::ensure_sufficient_stack(|| self.visit(node, ctx))
            .map_err(|e| e.or_at(node.position).with_trace(ctx.trace()))
    }

    /// Evaluates an expression that must produce a value.
    pub fn eval_value(&mut self, node: &Node, ctx: &Rc<Context>) -> LangResult<Object> {
        match self.evaluate(node, ctx)? {
            Evaluation::Value(value) => Ok(value),
            _ => Err(LangError::runtime(
                format!("{} doesn't produce a value", node.kind.name()),
                node.position,
            )
            .with_trace(ctx.trace())),
        }
    }

    fn visit(&mut self, node: &Node, ctx: &Rc<Context>) -> LangResult<Evaluation> {
        let value = match &node.kind {
            NodeKind::Statements(stmts) => return self.eval_statements(stmts, ctx),
            NodeKind::Number(n) => Object::Number(*n),
            NodeKind::Str(s) => Object::Str(s.clone()),
            NodeKind::Boolean(b) => Object::Boolean(*b),
            NodeKind::Prefix(op, operand) => {
                let value = self.eval_value(operand, ctx)?;
                Object::apply_prefix_op(*op, value)?
            }
            NodeKind::Infix(op, lhs, rhs) => {
                let lhs = self.eval_value(lhs, ctx)?;
                let rhs = self.eval_value(rhs, ctx)?;
                Object::apply_infix_op(*op, lhs, rhs)?
            }
            NodeKind::Assignment(op, target, value) => {
                self.eval_assignment(*op, target, value, ctx)?;
                return Ok(Evaluation::Nothing);
            }
            NodeKind::Variable(name, indexes) => {
                let value = lookup(ctx, name)?;
                self.apply_indexes(value, indexes, ctx)?
            }
            NodeKind::Index(inner, indexes) => {
                let value = self.eval_value(inner, ctx)?;
                self.apply_indexes(value, indexes, ctx)?
            }
            NodeKind::Dot(object, members) => return self.eval_dot(object, members, ctx),
            NodeKind::Array(elements) => {
                let values = elements
                    .iter()
                    .map(|element| self.eval_value(element, ctx))
                    .collect::<LangResult<Vec<Object>>>()?;
                Object::Array(ArrayRef::new(values))
            }
            NodeKind::Enum(members) => Object::Enum(EnumRef::new(
                members.iter().map(|m| m.name.clone()).collect(),
            )),
            NodeKind::StructDef(decl) => self.eval_struct_def(decl, ctx)?,
            NodeKind::StructInit(name, args) => self.eval_struct_init(name, args, ctx)?,
            NodeKind::VariableDecl(annotation, name, value) => {
                self.eval_declaration(annotation, name, value, ctx)?;
                return Ok(Evaluation::Nothing);
            }
            NodeKind::If(cases, else_body) => return self.eval_if(cases, else_body.as_deref(), ctx),
            NodeKind::For(variable, controls, body) => {
                return self.eval_for(variable, controls, body, ctx)
            }
            NodeKind::While(condition, body) => return self.eval_while(condition, body, ctx),
            NodeKind::Call(callee, args) => return self.eval_call(callee, args, ctx),
            NodeKind::Function(info) => {
                let name = &info.name;
                if ctx.symbols.contains_local(&name.name) {
                    return Err(LangError::runtime(
                        format!("Function {}() is already defined", name.name),
                        name.position,
                    ));
                }
                let func = UserFn::new(info.clone(), ctx.symbols.clone(), &ctx.file_name);
                ctx.symbols.define(&name.name, Object::Function(func))?;
                return Ok(Evaluation::Nothing);
            }
            NodeKind::Return(value) => {
                if ctx.return_target().is_none() {
                    return Err(LangError::syntax("Illegal return statement", node.position));
                }
                let value = match value {
                    Some(value) => Some(self.eval_value(value, ctx)?),
                    None => None,
                };
                return Ok(Evaluation::Return(value));
            }
            NodeKind::Break => return self.force_control(ControlSignal::Break, node, ctx),
            NodeKind::Continue => return self.force_control(ControlSignal::Continue, node, ctx),
            NodeKind::Import(info) => {
                self.eval_import(info, ctx)?;
                return Ok(Evaluation::Nothing);
            }
            NodeKind::Error(error) => return Err(error.clone()),
        };

        Ok(Evaluation::Value(value))
    }

    /// Runs statements in order until one transfers control out of the block.
    fn eval_statements(&mut self, stmts: &[Node], ctx: &Rc<Context>) -> LangResult<Evaluation> {
        let mut values = vec![];

        for stmt in stmts.iter() {
            match self.evaluate(stmt, ctx)? {
                Evaluation::Value(value) => values.push(value),
                Evaluation::Nothing | Evaluation::Multi(_) => {}
                transfer @ (Evaluation::Signal(_) | Evaluation::Return(_)) => return Ok(transfer),
            }
        }

        Ok(Evaluation::Multi(values))
    }

    fn force_control(
        &mut self,
        signal: ControlSignal,
        node: &Node,
        ctx: &Rc<Context>,
    ) -> LangResult<Evaluation> {
        let target = ctx.force_control_target().ok_or_else(|| {
            let keyword = match signal {
                ControlSignal::Break => "break",
                ControlSignal::Continue => "continue",
            };
            LangError::syntax(format!("Illegal {} statement", keyword), node.position)
        })?;
        target.signal(signal);
        Ok(Evaluation::Signal(signal))
    }

    pub(super) fn apply_indexes(
        &mut self,
        mut value: Object,
        indexes: &[Node],
        ctx: &Rc<Context>,
    ) -> LangResult<Object> {
        for index in indexes.iter() {
            let position = self.eval_value(index, ctx)?;
            value = value.index(&position).map_err(|e| e.or_at(index.position))?;
        }
        Ok(value)
    }

    fn eval_assignment(
        &mut self,
        op: AssignOperator,
        target: &Node,
        value: &Node,
        ctx: &Rc<Context>,
    ) -> LangResult<()> {
        let new_value = self.eval_value(value, ctx)?;

        match &target.kind {
            NodeKind::Variable(name, indexes) if indexes.is_empty() => {
                let old = lookup(ctx, name)?;
                let result = combine(op, old, new_value)?;
                ctx.symbols.update(&name.name, result);
                Ok(())
            }
            NodeKind::Variable(name, indexes) => {
                let base = lookup(ctx, name)?;
                self.assign_index(op, base, indexes, new_value, ctx)
            }
            NodeKind::Dot(object, members) => {
                let (last, path) = match members.split_last() {
                    Some(split) => split,
                    None => return Err(LangError::syntax("Invalid assignment target", target.position)),
                };
                let base = self.eval_value(object, ctx)?;
                let holder = self
                    .eval_members(base, path, ctx)?
                    .ok_or_else(|| LangError::runtime("Invalid assignment target", target.position))?;

                match last {
                    Member::Property(name, indexes) if indexes.is_empty() => {
                        let instance = match holder {
                            Object::Struct(instance) => instance,
                            other => {
                                return Err(LangError::runtime(
                                    format!("Can't assign to property \"{}\" of type {}", name.name, other.data_type()),
                                    name.position,
                                ))
                            }
                        };
                        let old = holder_field(&instance, name)?;
                        let result = combine(op, old, new_value).map_err(|e| e.or_at(name.position))?;
                        instance
                            .set_field(&name.name, result)
                            .map_err(|e| LangError::from(e).or_at(name.position))
                    }
                    Member::Property(name, indexes) => {
                        let base = holder.property(&name.name).map_err(|e| e.or_at(name.position))?;
                        self.assign_index(op, base, indexes, new_value, ctx)
                    }
                    Member::Method(name, _) => {
                        Err(LangError::syntax("Invalid assignment target", name.position))
                    }
                }
            }
            _ => Err(LangError::syntax("Invalid assignment target", target.position)),
        }
    }

    /// `base[i]...[j] op= value`: walks to the innermost array and rewrites one slot.
    fn assign_index(
        &mut self,
        op: AssignOperator,
        base: Object,
        indexes: &[Node],
        new_value: Object,
        ctx: &Rc<Context>,
    ) -> LangResult<()> {
        let (last, path) = match indexes.split_last() {
            Some(split) => split,
            None => return Err(runtime("Invalid assignment target")),
        };
        let container = self.apply_indexes(base, path, ctx)?;
        let slot = self.eval_value(last, ctx)?;

        let array = match &container {
            Object::Array(array) => array,
            other => {
                return Err(LangError::runtime(
                    format!("Can't assign to an index of type {}", other.data_type()),
                    last.position,
                ))
            }
        };
        let old = container.index(&slot).map_err(|e| e.or_at(last.position))?;
        let result = combine(op, old, new_value).map_err(|e| e.or_at(last.position))?;

        let written = match slot {
            Object::Number(n) => array.set(n as usize, result),
            _ => false,
        };
        if !written {
            return Err(LangError::out_of_bounds(
                format!("Index out of bounds: {}", slot),
                last.position,
            ));
        }
        Ok(())
    }

    fn eval_declaration(
        &mut self,
        annotation: &TypeAnnotation,
        name: &Identifier,
        value: &Node,
        ctx: &Rc<Context>,
    ) -> LangResult<()> {
        let mut value = self.eval_value(value, ctx)?;

        match annotation {
            TypeAnnotation::Builtin(data_type) => {
                if *data_type == DataType::Enum {
                    value = value.wrap_enum_value();
                }
                if !value.conforms_to(*data_type) {
                    return Err(LangError::type_error(
                        format!("Can't assign type {} to {}", value.data_type(), data_type),
                        name.position,
                    ));
                }
            }
            TypeAnnotation::Named(struct_name) => match &value {
                Object::Struct(instance) if instance.name() == struct_name.name => {}
                Object::Struct(instance) => {
                    return Err(LangError::type_error(
                        format!(
                            "Can't assign data type: \"{}\" to \"{}\"",
                            instance.name(),
                            struct_name.name
                        ),
                        name.position,
                    ))
                }
                other => {
                    return Err(LangError::type_error(
                        format!(
                            "Can't assign type {} to \"{}\"",
                            other.data_type(),
                            struct_name.name
                        ),
                        name.position,
                    ))
                }
            },
        }

        ctx.symbols
            .define(&name.name, value)
            .map_err(|e| LangError::from(e).or_at(name.position))
    }

    fn eval_struct_def(&mut self, decl: &StructDecl, ctx: &Rc<Context>) -> LangResult<Object> {
        let mut fields = vec![];

        for field in decl.fields.iter() {
            let ty = match &field.ty {
                TypeAnnotation::Builtin(data_type) => FieldType::Builtin(*data_type),
                TypeAnnotation::Named(type_name) if type_name.name == decl.name.name => {
                    FieldType::Named(type_name.name.clone())
                }
                TypeAnnotation::Named(type_name) => match ctx.symbols.lookup(&type_name.name) {
                    Ok(Object::StructDef(def)) => FieldType::Named(def.name.clone()),
                    _ => {
                        return Err(LangError::runtime(
                            format!(
                                "Received non-struct type for identifier: \"{}\" in struct",
                                field.name.name
                            ),
                            type_name.position,
                        ))
                    }
                },
            };
            fields.push(FieldSpec::new(field.name.name.clone(), ty, field.writable));
        }

        Ok(Object::StructDef(StructDefinition::new(
            decl.name.name.clone(),
            fields,
        )))
    }

    fn eval_if(
        &mut self,
        cases: &[(Node, Node)],
        else_body: Option<&Node>,
        ctx: &Rc<Context>,
    ) -> LangResult<Evaluation> {
        let branch_ctx = ctx.nested("<if>", ContextKind::Conditional);

        for (condition, body) in cases.iter() {
            if self.eval_value(condition, &branch_ctx)?.is_truthy() {
                return self.evaluate(body, &branch_ctx);
            }
        }

        match else_body {
            Some(body) => self.evaluate(body, &branch_ctx),
            None => Ok(Evaluation::Nothing),
        }
    }

    fn eval_while(&mut self, condition: &Node, body: &Node, ctx: &Rc<Context>) -> LangResult<Evaluation> {
        let loop_ctx = ctx.nested("<while>", ContextKind::Loop);

        while self.eval_value(condition, &loop_ctx)?.is_truthy() {
            loop_ctx.symbols.clear();

            if let Evaluation::Return(value) = self.evaluate(body, &loop_ctx)? {
                return Ok(Evaluation::Return(value));
            }
            if loop_ctx.take_signal() == Some(ControlSignal::Break) {
                break;
            }
        }

        Ok(Evaluation::Nothing)
    }

    /// Do-while shaped: the body runs before the bound check ends the loop, and the
    /// `start == end == 0` range runs no iteration at all.
    fn eval_for(
        &mut self,
        variable: &Identifier,
        controls: &ForControls,
        body: &Node,
        ctx: &Rc<Context>,
    ) -> LangResult<Evaluation> {
        let loop_ctx = ctx.nested("<for>", ContextKind::Loop);

        let (start, end, step, items) = match controls {
            ForControls::Range(start, end, step) => {
                let start = self.eval_number_control(start, ctx)?;
                let end = self.eval_number_control(end, ctx)?;
                let step_value = self.eval_number_control(step, ctx)?;
                if step_value == 0.0 {
                    return Err(LangError::runtime("Loop step can't be 0", step.position));
                }
                (start, end, step_value, None)
            }
            ForControls::Iterable(iterable) => {
                let items = match self.eval_value(iterable, &loop_ctx)? {
                    Object::Array(array) => array.elements(),
                    Object::Enum(members) => members
                        .members()
                        .iter()
                        .map(|m| Object::EnumValue(m.clone()))
                        .collect(),
                    Object::Str(s) => s.chars().map(|c| Object::Str(c.to_string())).collect(),
                    Object::Number(n) if !n.is_nan() => {
                        return self.run_for(variable, (0.0, n, 1.0), None, body, &loop_ctx)
                    }
                    other => {
                        return Err(LangError::runtime(
                            format!("Can't loop through type: {}", other.data_type()),
                            iterable.position,
                        ))
                    }
                };
                (0.0, items.len() as f64, 1.0, Some(items))
            }
        };

        self.run_for(variable, (start, end, step), items, body, &loop_ctx)
    }

    fn run_for(
        &mut self,
        variable: &Identifier,
        (start, end, step): (f64, f64, f64),
        items: Option<Vec<Object>>,
        body: &Node,
        loop_ctx: &Rc<Context>,
    ) -> LangResult<Evaluation> {
        let mut index = start;

        loop {
            let last = (step >= 0.0 && index >= end - step) || (step < 0.0 && index <= end - step);
            if last && start == 0.0 && end == 0.0 {
                break;
            }

            let current = match &items {
                Some(items) => items.get(index as usize).cloned().ok_or_else(|| {
                    LangError::out_of_bounds(
                        format!("Index out of bounds: {}", Object::Number(index)),
                        variable.position,
                    )
                })?,
                None => Object::Number(index),
            };
            loop_ctx.symbols.clear();
            loop_ctx
                .symbols
                .define(&variable.name, current)
                .map_err(|e| LangError::from(e).or_at(variable.position))?;

            if let Evaluation::Return(value) = self.evaluate(body, loop_ctx)? {
                return Ok(Evaluation::Return(value));
            }
            if loop_ctx.take_signal() == Some(ControlSignal::Break) || last {
                break;
            }

            index += step;
        }

        Ok(Evaluation::Nothing)
    }

    fn eval_number_control(&mut self, node: &Node, ctx: &Rc<Context>) -> LangResult<f64> {
        match self.eval_value(node, ctx)? {
            Object::Number(n) if n.is_nan() => {
                Err(LangError::runtime("Loop bound can't be NaN", node.position))
            }
            Object::Number(n) => Ok(n),
            other => Err(LangError::runtime(
                format!("Expected type NUMBER. Received: {}", other.data_type()),
                node.position,
            )),
        }
    }
}

fn lookup(ctx: &Rc<Context>, name: &Identifier) -> LangResult<Object> {
    ctx.symbols
        .lookup(&name.name)
        .map_err(|e| LangError::from(e).or_at(name.position))
}

fn holder_field(instance: &StructRef, name: &Identifier) -> LangResult<Object> {
    instance.field(&name.name).ok_or_else(|| {
        LangError::runtime(
            format!("{} doesn't contain property: \"{}\"", instance.display(), name.name),
            name.position,
        )
    })
}

/// Value an assignment operator stores: `=` keeps the variant of the old value, the
/// compound operators apply their arithmetic first.
fn combine(op: AssignOperator, old: Object, new_value: Object) -> LangResult<Object> {
    match op {
        AssignOperator::Assign => {
            let new_value = match old {
                Object::Enum(_) => new_value.wrap_enum_value(),
                _ => new_value,
            };
            if !old.same_type(&new_value) {
                return Err(LangError::unpositioned(
                    ErrorKind::Type,
                    format!(
                        "Can't assign type {} to {}",
                        new_value.data_type(),
                        old.data_type()
                    ),
                ));
            }
            Ok(new_value)
        }
        AssignOperator::Compound(infix) => Object::apply_infix_op(infix, old, new_value),
    }
}
