use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EffectKind {
    Print,
    Clear,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SideEffect {
    pub kind: EffectKind,
    pub value: Option<String>,
}

/// Append-only log of side effects, shared by a program and every module it imports.
/// Nothing is written until the host drains it.
#[derive(Debug, Default, Clone)]
pub struct OutputSink(Rc<RefCell<Vec<SideEffect>>>);

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print(&self, value: String) {
        self.0.borrow_mut().push(SideEffect {
            kind: EffectKind::Print,
            value: Some(value),
        });
    }

    pub fn clear(&self) {
        self.0.borrow_mut().push(SideEffect {
            kind: EffectKind::Clear,
            value: None,
        });
    }

    pub fn drain(&self) -> Vec<SideEffect> {
        self.0.borrow_mut().drain(..).collect()
    }

    /// Values of the pending print records, oldest first.
    pub fn printed(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter(|effect| effect.kind == EffectKind::Print)
            .filter_map(|effect| effect.value.clone())
            .collect()
    }
}

/// Writes drained effects the way the command line shows them.
pub fn present<W: Write>(effects: &[SideEffect], out: &mut W) -> io::Result<()> {
    for effect in effects {
        match effect.kind {
            EffectKind::Print => {
                writeln!(out, "[Basp] {}", effect.value.as_deref().unwrap_or_default())?
            }
            EffectKind::Clear => write!(out, "{}", CLEAR_SCREEN)?,
        }
    }
    out.flush()
}
