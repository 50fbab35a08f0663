use super::context::Context;
use super::interpreter::Interpreter;
use super::loader::{normalize_path, LoadError};
use super::object::{runtime, Object};
use super::registry::{decode_package, RegistryError};
use super::stdlib;
use super::structs::StructRef;
use crate::errors::{ErrorKind, LangError, LangResult};
use crate::frontend::grammar::ImportInfo;

use std::collections::HashMap;
use std::rc::Rc;

/// Sources starting with this prefix name registry packages instead of files.
pub const PACKAGE_PREFIX: &str = "basp:";

const ALIAS_STRUCT_NAME: &str = "Exports";

impl Interpreter {
    /// `import a, b from "source" [as alias]`. Every name must be exported by the
    /// source. Without an alias the names land in this program's globals.
    pub(super) fn eval_import(&mut self, info: &ImportInfo, ctx: &Rc<Context>) -> LangResult<()> {
        let position = info.source.position;
        let reference = match self.eval_value(&info.source, ctx)? {
            Object::Str(reference) => reference,
            other => {
                return Err(LangError::runtime(
                    format!(
                        "Expected type STRING for file path. Received: {}",
                        other.data_type()
                    ),
                    position,
                ))
            }
        };

        if self.imports.contains(&reference) {
            return Err(LangError::runtime(
                format!("Package: \"{}\" has already been imported.", reference),
                position,
            ));
        }

        let package = reference.strip_prefix(PACKAGE_PREFIX);
        let exports = match package {
            Some(package) => self.load_package(package),
            None => self.load_file(&reference, ctx),
        }
        .map_err(|e| e.or_at(position))?;

        let mut selected = vec![];
        for name in info.names.iter() {
            let value = exports.get(&name.name).cloned().ok_or_else(|| {
                LangError::runtime(
                    format!(
                        "Package: {} doesn't contain variable: \"{}\"",
                        reference, name.name
                    ),
                    name.position,
                )
            })?;
            selected.push((name.name.clone(), value));
        }

        match &info.alias {
            None => {
                if let Some(taken) = info
                    .names
                    .iter()
                    .find(|name| self.globals.symbols.contains_local(&name.name))
                {
                    return Err(LangError::runtime(
                        format!("Variable \"{}\" is already defined", taken.name),
                        taken.position,
                    ));
                }
                for (name, value) in selected {
                    self.globals.symbols.define(&name, value)?;
                }
            }
            Some(alias) => {
                let fields = selected
                    .into_iter()
                    .map(|(name, value)| (name, value, true))
                    .collect();
                let namespace = StructRef::new(ALIAS_STRUCT_NAME, fields);
                self.globals
                    .symbols
                    .define(&alias.name, Object::Struct(namespace))
                    .map_err(|e| LangError::from(e).or_at(alias.position))?;
            }
        }

        tracing::debug!(
            source = %reference,
            kind = if package.is_some() { "package" } else { "file" },
            names = ?info.names.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
            "imported"
        );
        self.imports.insert(reference);
        Ok(())
    }

    fn load_package(&mut self, package: &str) -> LangResult<HashMap<String, Object>> {
        let payload = self.loader.fetch_package(package).map_err(load_error)?;
        let value = decode_package(package, &payload).map_err(registry_error)?;

        let mut exports = HashMap::new();
        exports.insert(package.to_owned(), value);
        Ok(exports)
    }

    /// Runs the file in a child program sharing this program's output and loader, and
    /// returns the globals it defined itself.
    fn load_file(&mut self, reference: &str, ctx: &Rc<Context>) -> LangResult<HashMap<String, Object>> {
        let resolved = match self.path.parent() {
            Some(dir) => dir.join(reference),
            None => reference.into(),
        };
        let normalized = normalize_path(&resolved);

        if self.import_chain.contains(&normalized) {
            return Err(runtime("Can't have circular imports"));
        }

        let source = self.loader.read_file(&normalized).map_err(load_error)?;
        tracing::debug!(path = %normalized.display(), "running imported module");

        let mut chain = self.import_chain.clone();
        chain.push(normalized.clone());
        let mut module = Interpreter::for_module(
            normalized,
            Some(ctx.clone()),
            self.output.clone(),
            self.loader.clone(),
            chain,
        );
        module.run(&source)?;

        let mut exports = module.globals.symbols.bindings();
        exports.retain(|name, _| !stdlib::is_builtin(name));
        Ok(exports)
    }
}

fn load_error(error: LoadError) -> LangError {
    LangError::unpositioned(ErrorKind::Runtime, error.to_string())
}

fn registry_error(error: RegistryError) -> LangError {
    LangError::unpositioned(ErrorKind::Runtime, error.to_string())
}
