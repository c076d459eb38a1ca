use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use tracing::{debug, info_span};

use crate::ast::Module;
use crate::builtins::BuiltinEnvironment;
use crate::diagnostics::CompileResult;
use crate::modules::{normalize_path, LoadedModule, ModuleLoader};
use crate::parser::parse_source;
use crate::source::SourceFile;

pub const DEFAULT_EXTENSION: &str = "lume";
pub const DEFAULT_PRELUDE: &str = "preludio";

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Standard library directory, searched after the importer's directory.
    pub stdlib_dir: Option<PathBuf>,
    /// Extra directories searched after the standard library.
    pub search_paths: Vec<PathBuf>,
    /// Appended to import paths written without one.
    pub extension: String,
    /// Whether every module implicitly merges the prelude.
    pub prelude: bool,
    pub prelude_module: String,
    /// In-memory sources that replace the file at the given path.
    pub module_overrides: HashMap<PathBuf, String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            stdlib_dir: None,
            search_paths: Vec::new(),
            extension: DEFAULT_EXTENSION.to_string(),
            prelude: true,
            prelude_module: DEFAULT_PRELUDE.to_string(),
            module_overrides: HashMap::new(),
        }
    }
}

impl CompileOptions {
    /// Defaults, with `LUME_STDLIB` and the `LUME_PATH` list applied.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(dir) = env::var_os("LUME_STDLIB").filter(|dir| !dir.is_empty()) {
            options.stdlib_dir = Some(PathBuf::from(dir));
        }
        if let Some(paths) = env::var_os("LUME_PATH") {
            options.search_paths = env::split_paths(&paths)
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
        }
        options
    }
}

/// Output of a successful run: the annotated entry tree plus every module it
/// pulled in, in the order they finished loading.
#[derive(Debug)]
pub struct Compilation {
    pub module: Module,
    pub modules: Vec<LoadedModule>,
}

impl Compilation {
    pub fn module_paths(&self) -> impl Iterator<Item = &std::path::Path> {
        self.modules.iter().map(|module| module.path.as_path())
    }
}

pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn compile(&mut self, source: &SourceFile) -> CompileResult<Compilation> {
        let path = normalize_path(&source.path);
        let _span = info_span!("compile", path = %path.display()).entered();

        let mut module = parse_source(source)?;
        let builtins = BuiltinEnvironment::new();
        let mut loader = ModuleLoader::new(&self.options);
        loader.analyze(&builtins, &path, &mut module)?;

        let modules = loader.into_loaded();
        debug!(dependencies = modules.len(), "compilation finished");
        Ok(Compilation { module, modules })
    }
}
