pub mod errors;
pub mod frontend;
pub mod interpreter;
pub mod stack;

pub use errors::{ErrorKind, LangError, LangResult};
pub use interpreter::{Interpreter, ModuleLoader, Object, SideEffect};

use std::rc::Rc;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the global tracing subscriber.
///
/// Reads `RUST_LOG` (for example `RUST_LOG=basp=debug`). With `verbose` set and no
/// `RUST_LOG`, debug events of this crate are shown. Safe to call multiple times.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = match std::env::var("RUST_LOG") {
            Ok(_) => EnvFilter::from_default_env(),
            Err(_) if verbose => EnvFilter::new("basp=debug"),
            Err(_) => return,
        };
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}

/// Everything one run of a program produced: the side effects recorded until it
/// finished or failed, and the values of its top-level expressions.
#[derive(Debug)]
pub struct Execution {
    pub effects: Vec<SideEffect>,
    pub result: LangResult<Vec<Object>>,
}

/// Runs `source` as the program `file_name`, resolving its imports through `loader`.
pub fn run_source(file_name: &str, source: &str, loader: Rc<dyn ModuleLoader>) -> Execution {
    let mut interpreter = Interpreter::with_loader(file_name, loader);
    let result = interpreter.run(source);
    Execution {
        effects: interpreter.output().drain(),
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{EffectKind, MemoryLoader};

    #[test]
    fn test_effects_survive_errors() {
        let execution = run_source(
            "main.basp",
            "Print(\"a\")\nClear()\nPrint(1 / 0)",
            Rc::new(MemoryLoader::default()),
        );
        let kinds: Vec<EffectKind> = execution.effects.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EffectKind::Print, EffectKind::Clear]);
        assert_eq!(execution.result.unwrap_err().message, "Can't divide by 0");
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(false);
        init_tracing(false);
    }
}
