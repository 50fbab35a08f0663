use super::symbol_table::SymbolTable;
use crate::errors::TraceFrame;

use std::cell::Cell;
use std::rc::Rc;

pub const GLOBAL_CONTEXT_NAME: &str = "<Global>";

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ContextKind {
    Global,
    Function,
    Loop,
    Conditional,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ControlSignal {
    Break,
    Continue,
}

/// Execution frame: the scope in effect, which control transfers it accepts, and
/// the chain of frames that led here (used for error traces).
#[derive(Debug)]
pub struct Context {
    pub display_name: String,
    pub file_name: String,
    pub kind: ContextKind,
    pub symbols: SymbolTable,
    parent: Option<Rc<Context>>,
    pending: Cell<Option<ControlSignal>>,
}

impl Context {
    pub fn new(
        display_name: String,
        file_name: String,
        kind: ContextKind,
        symbols: SymbolTable,
        parent: Option<Rc<Context>>,
    ) -> Rc<Self> {
        Rc::new(Context {
            display_name,
            file_name,
            kind,
            symbols,
            parent,
            pending: Cell::new(None),
        })
    }

    /// Top frame of a program. `parent` is the importing frame, if any.
    pub fn global(file_name: &str, symbols: SymbolTable, parent: Option<Rc<Context>>) -> Rc<Self> {
        Self::new(
            GLOBAL_CONTEXT_NAME.to_owned(),
            file_name.to_owned(),
            ContextKind::Global,
            symbols,
            parent,
        )
    }

    /// Child frame in the same file with a fresh scope nested in this one.
    pub fn nested(self: &Rc<Self>, display_name: &str, kind: ContextKind) -> Rc<Self> {
        Self::new(
            display_name.to_owned(),
            self.file_name.clone(),
            kind,
            SymbolTable::with_enclosing(&self.symbols),
            Some(self.clone()),
        )
    }

    pub fn parent(&self) -> Option<&Rc<Context>> {
        self.parent.as_ref()
    }

    pub fn allows_force_controls(&self) -> bool {
        self.kind == ContextKind::Loop
    }

    pub fn allows_return(&self) -> bool {
        self.kind == ContextKind::Function
    }

    /// Nearest loop frame a `break`/`continue` can reach. The search never crosses a
    /// function or program boundary.
    pub fn force_control_target(self: &Rc<Self>) -> Option<Rc<Context>> {
        let mut current = Some(self.clone());
        while let Some(ctx) = current {
            if ctx.allows_force_controls() {
                return Some(ctx);
            }
            if matches!(ctx.kind, ContextKind::Function | ContextKind::Global) {
                return None;
            }
            current = ctx.parent.clone();
        }
        None
    }

    /// Nearest function frame a `return` can reach, stopping at the program's top.
    pub fn return_target(self: &Rc<Self>) -> Option<Rc<Context>> {
        let mut current = Some(self.clone());
        while let Some(ctx) = current {
            if ctx.allows_return() {
                return Some(ctx);
            }
            if ctx.kind == ContextKind::Global {
                return None;
            }
            current = ctx.parent.clone();
        }
        None
    }

    pub fn signal(&self, signal: ControlSignal) {
        self.pending.set(Some(signal));
    }

    pub fn take_signal(&self) -> Option<ControlSignal> {
        self.pending.take()
    }

    /// Frames from this one up to the outermost program, leaf first.
    pub fn trace(&self) -> Vec<TraceFrame> {
        let mut frames = vec![self.frame()];
        let mut current = self.parent.as_ref();
        while let Some(ctx) = current {
            frames.push(ctx.frame());
            current = ctx.parent.as_ref();
        }
        frames
    }

    fn frame(&self) -> TraceFrame {
        TraceFrame {
            display_name: self.display_name.clone(),
            file_name: self.file_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global() -> Rc<Context> {
        Context::global("main.basp", SymbolTable::new(), None)
    }

    #[test]
    fn test_break_reaches_loop_through_conditionals() {
        let global = global();
        let body = global.nested("<for>", ContextKind::Loop);
        let branch = body.nested("<if>", ContextKind::Conditional);

        let target = branch.force_control_target().unwrap();
        assert!(Rc::ptr_eq(&target, &body));
        assert!(global.force_control_target().is_none());
    }

    #[test]
    fn test_break_does_not_cross_functions() {
        let global = global();
        let body = global.nested("<while>", ContextKind::Loop);
        let call = Context::new(
            "<fn f>".to_owned(),
            "main.basp".to_owned(),
            ContextKind::Function,
            SymbolTable::new(),
            Some(body),
        );
        assert!(call.force_control_target().is_none());
        assert!(call.return_target().is_some());
    }

    #[test]
    fn test_return_stops_at_global() {
        let outer = global();
        let module = Context::global("lib.basp", SymbolTable::new(), Some(outer.nested("<fn g>", ContextKind::Function)));
        assert!(module.return_target().is_none());
    }

    #[test]
    fn test_pending_signal_is_taken_once() {
        let ctx = global().nested("<while>", ContextKind::Loop);
        ctx.signal(ControlSignal::Continue);
        assert_eq!(ctx.take_signal(), Some(ControlSignal::Continue));
        assert_eq!(ctx.take_signal(), None);
    }

    #[test]
    fn test_trace_is_leaf_first() {
        let global = global();
        let call = global.nested("<fn add>", ContextKind::Function);
        let names: Vec<String> = call.trace().into_iter().map(|f| f.display_name).collect();
        assert_eq!(names, vec!["<fn add>", "<Global>"]);
    }
}
