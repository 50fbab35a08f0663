use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use ureq::Agent;

pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:3000/import";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File: \"{0}\" doesn't exist")]
    FileNotFound(String),
    #[error("Couldn't read \"{path}\": {message}")]
    Io { path: String, message: String },
    #[error("Registry request failed: {0}")]
    Transport(String),
}

impl From<ureq::Error> for LoadError {
    fn from(value: ureq::Error) -> Self {
        LoadError::Transport(value.to_string())
    }
}

impl LoadError {
    fn io(path: &Path, error: io::Error) -> Self {
        let path = path.display().to_string();
        match error.kind() {
            io::ErrorKind::NotFound => LoadError::FileNotFound(path),
            _ => LoadError::Io {
                path,
                message: error.to_string(),
            },
        }
    }
}

/// Where imported programs come from: source files, and packages of the playground
/// registry.
pub trait ModuleLoader {
    fn read_file(&self, path: &Path) -> Result<String, LoadError>;

    /// Raw JSON payload the registry answers for `package`.
    fn fetch_package(&self, package: &str) -> Result<String, LoadError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub registry_url: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            registry_url: DEFAULT_REGISTRY_URL.to_owned(),
        }
    }
}

/// Filesystem and HTTP backed loader used by the command line.
pub struct DefaultLoader {
    config: LoaderConfig,
    agent: Agent,
}

impl DefaultLoader {
    pub fn new(config: LoaderConfig) -> Self {
        DefaultLoader {
            config,
            agent: Agent::new(),
        }
    }
}

impl Default for DefaultLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl ModuleLoader for DefaultLoader {
    fn read_file(&self, path: &Path) -> Result<String, LoadError> {
        std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))
    }

    fn fetch_package(&self, package: &str) -> Result<String, LoadError> {
        tracing::debug!(url = %self.config.registry_url, package, "fetching registry package");
        let response = match self
            .agent
            .get(&self.config.registry_url)
            .query("package", package)
            .call()
        {
            Ok(response) => response,
            // Failure payloads still carry a JSON body worth decoding.
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(e.into()),
        };
        response.into_string().map_err(|e| LoadError::Transport(e.to_string()))
    }
}

/// In-memory loader for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
    packages: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn with_file<P: AsRef<Path>>(mut self, path: P, source: &str) -> Self {
        self.files
            .insert(normalize_path(path.as_ref()), source.to_owned());
        self
    }

    pub fn with_package(mut self, package: &str, payload: &str) -> Self {
        self.packages.insert(package.to_owned(), payload.to_owned());
        self
    }
}

impl ModuleLoader for MemoryLoader {
    fn read_file(&self, path: &Path) -> Result<String, LoadError> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| LoadError::FileNotFound(path.display().to_string()))
    }

    fn fetch_package(&self, package: &str) -> Result<String, LoadError> {
        Ok(self
            .packages
            .get(package)
            .cloned()
            .unwrap_or_else(|| r#"{"success":false,"data":1}"#.to_owned()))
    }
}

/// Resolves `.` and `..` lexically, without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if normalized.file_name().is_some() {
                    normalized.pop();
                } else {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("scripts/./lib/../util.basp")),
            PathBuf::from("scripts/util.basp")
        );
        assert_eq!(normalize_path(Path::new("../a.basp")), PathBuf::from("../a.basp"));
        assert_eq!(
            normalize_path(Path::new("lib/../../b.basp")),
            PathBuf::from("../b.basp")
        );
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::default()
            .with_file("dir/lib.basp", "int x = 1")
            .with_package("BASP", r#"{"success":true,"data":{"node":"INumberNode","data":{"value":1}}}"#);

        assert_eq!(loader.read_file(Path::new("dir/./lib.basp")).unwrap(), "int x = 1");
        assert!(matches!(
            loader.read_file(Path::new("missing.basp")),
            Err(LoadError::FileNotFound(_))
        ));
        assert!(loader.fetch_package("BASP").unwrap().contains("INumberNode"));
        assert!(loader.fetch_package("nope").unwrap().contains("false"));
    }

    #[test]
    fn test_default_registry_url() {
        assert_eq!(LoaderConfig::default().registry_url, "http://localhost:3000/import");
    }
}
