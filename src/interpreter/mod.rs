mod array;
mod calls;
mod compare;
mod context;
mod function;
mod imports;
#[allow(clippy::module_inception)]
mod interpreter;
pub mod loader;
mod native_function;
mod object;
pub mod output;
pub mod registry;
mod stdlib;
mod structs;
mod symbol_table;

pub use array::{ArrayRef, EnumRef};
pub use context::{Context, ContextKind, ControlSignal, GLOBAL_CONTEXT_NAME};
pub use function::{ParamSpec, UserFn};
pub use imports::PACKAGE_PREFIX;
pub use interpreter::{Evaluation, Interpreter, MAX_CALL_DEPTH};
pub use loader::{DefaultLoader, LoadError, LoaderConfig, MemoryLoader, ModuleLoader, DEFAULT_REGISTRY_URL};
pub use native_function::{NativeArgs, NativeFn};
pub use object::{format_number, Callable, Object};
pub use output::{present, EffectKind, OutputSink, SideEffect};
pub use structs::{FieldError, FieldSpec, FieldType, StructDefRef, StructDefinition, StructRef};
pub use symbol_table::{SymbolError, SymbolTable};
