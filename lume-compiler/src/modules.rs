use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use path_clean::PathClean;
use tracing::{debug, trace};

use crate::analyzer::Analyzer;
use crate::ast::{ImportMode, Module, SourceSpan};
use crate::builtins::BuiltinEnvironment;
use crate::compiler::CompileOptions;
use crate::diagnostics::{CompileError, CompileResult};
use crate::parser::parse_source;
use crate::scope::Scope;
use crate::source::{SourceFile, SourceId};
use crate::symbols::{ModuleSymbol, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Loading,
    Loaded,
}

#[derive(Debug)]
struct ModuleEntry {
    scope: Rc<Scope>,
    state: ModuleState,
}

/// A module analysed as a dependency of the entry file.
#[derive(Debug)]
pub struct LoadedModule {
    pub path: PathBuf,
    pub scope: Rc<Scope>,
    pub tree: Module,
}

/// Finds, parses and analyses imported modules. One loader is shared by every
/// analyzer of a compilation run, so each file is analysed at most once.
#[derive(Debug)]
pub struct ModuleLoader {
    stdlib_dir: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    extension: String,
    module_overrides: HashMap<PathBuf, String>,
    prelude: Option<PathBuf>,
    registry: HashMap<PathBuf, ModuleEntry>,
    loaded: Vec<LoadedModule>,
    next_source_id: u32,
}

impl ModuleLoader {
    pub fn new(options: &CompileOptions) -> Self {
        let mut loader = Self {
            stdlib_dir: options.stdlib_dir.as_deref().map(normalize_path),
            search_paths: options.search_paths.iter().map(|p| normalize_path(p)).collect(),
            extension: options.extension.clone(),
            module_overrides: options
                .module_overrides
                .iter()
                .map(|(path, contents)| (normalize_path(path), contents.clone()))
                .collect(),
            prelude: None,
            registry: HashMap::new(),
            loaded: Vec::new(),
            next_source_id: 1,
        };
        if options.prelude {
            loader.prelude = loader.find_in_library(&options.prelude_module);
            debug!(prelude = ?loader.prelude, "prelude lookup");
        }
        loader
    }

    /// Path of the prelude module, when one was found.
    pub fn prelude(&self) -> Option<&Path> {
        self.prelude.as_deref()
    }

    pub fn state(&self, path: &Path) -> Option<ModuleState> {
        self.registry.get(path).map(|entry| entry.state)
    }

    /// Resolves an import relative to the importing file, then the standard
    /// library directory, then every search path.
    pub fn resolve(&self, importer: &Path, import: &str) -> Option<PathBuf> {
        let relative_base = importer
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let candidate = self.with_extension(&relative_base.join(import));
        if self.exists(&candidate) {
            return Some(candidate);
        }
        self.find_in_library(import)
    }

    fn find_in_library(&self, import: &str) -> Option<PathBuf> {
        self.stdlib_dir
            .iter()
            .chain(self.search_paths.iter())
            .map(|dir| self.with_extension(&dir.join(import)))
            .find(|candidate| self.exists(candidate))
    }

    fn with_extension(&self, path: &Path) -> PathBuf {
        let mut path = normalize_path(path);
        if path.extension().is_none() {
            path.set_extension(&self.extension);
        }
        path
    }

    fn exists(&self, path: &Path) -> bool {
        let found = self.module_overrides.contains_key(path) || path.is_file();
        trace!(path = %path.display(), found, "module candidate");
        found
    }

    fn read(&self, path: &Path) -> Option<String> {
        if let Some(contents) = self.module_overrides.get(path) {
            return Some(contents.clone());
        }
        fs::read_to_string(path).ok()
    }

    /// Loads `path` (if needed) and exports its symbols into `target`.
    /// `importer` and `span` locate the `usa` statement for error reporting.
    pub fn load_module(
        &mut self,
        builtins: &BuiltinEnvironment,
        importer: &Path,
        span: SourceSpan,
        path: &Path,
        mode: &ImportMode,
        target: &Scope,
    ) -> CompileResult<()> {
        let scope = match self.registry.get(path) {
            Some(entry) if entry.state == ModuleState::Loaded => Rc::clone(&entry.scope),
            Some(_) => {
                return Err(CompileError::semantic(
                    importer,
                    span,
                    format!("importação cíclica do módulo '{}'", path.display()),
                ))
            }
            None => {
                let contents = self.read(path).ok_or_else(|| {
                    CompileError::semantic(
                        importer,
                        span,
                        format!("não foi possível ler o módulo '{}'", path.display()),
                    )
                })?;
                let source = SourceFile::new(
                    SourceId(self.next_source_id),
                    path.to_path_buf(),
                    contents,
                );
                self.next_source_id += 1;
                let mut tree = parse_source(&source)?;
                let scope = self.analyze(builtins, path, &mut tree)?;
                self.loaded.push(LoadedModule {
                    path: path.to_path_buf(),
                    scope: Rc::clone(&scope),
                    tree,
                });
                scope
            }
        };

        export(importer, span, path, &scope, mode, target)
    }

    /// Runs a fresh analyzer over an already parsed module, tracking its
    /// state in the registry. Returns the module's root scope.
    pub fn analyze(
        &mut self,
        builtins: &BuiltinEnvironment,
        path: &Path,
        tree: &mut Module,
    ) -> CompileResult<Rc<Scope>> {
        debug!(path = %path.display(), "loading module");
        // The prelude lives in its own layer so modules may shadow its names.
        // Dependencies of the prelude itself are analysed without it.
        let prelude = self.prelude.clone().filter(|prelude| {
            prelude != path && self.state(prelude) != Some(ModuleState::Loading)
        });
        let parent = match prelude {
            Some(_) => Scope::child(builtins.scope()),
            None => Rc::clone(builtins.scope()),
        };
        let scope = Scope::child(&parent);
        self.registry.insert(
            path.to_path_buf(),
            ModuleEntry {
                scope: Rc::clone(&scope),
                state: ModuleState::Loading,
            },
        );

        if let Some(prelude) = prelude {
            let span = SourceSpan::single_point(1, 1);
            self.load_module(builtins, path, span, &prelude, &ImportMode::Merge, &parent)?;
        }
        Analyzer::new(path, builtins, self, Rc::clone(&scope)).analyze(tree)?;

        if let Some(entry) = self.registry.get_mut(path) {
            entry.state = ModuleState::Loaded;
        }
        debug!(path = %path.display(), symbols = scope.count(), "module loaded");
        Ok(scope)
    }

    /// Dependencies in the order they finished loading.
    pub fn into_loaded(self) -> Vec<LoadedModule> {
        self.loaded
    }
}

fn export(
    importer: &Path,
    span: SourceSpan,
    path: &Path,
    scope: &Rc<Scope>,
    mode: &ImportMode,
    target: &Scope,
) -> CompileResult<()> {
    let define = |name: &str, symbol: Symbol| -> CompileResult<()> {
        match target.get(name) {
            Some(existing) if existing.same_as(&symbol) => Ok(()),
            Some(_) => Err(CompileError::semantic(
                importer,
                span,
                format!("identificador '{}' já declarado neste escopo", name),
            )),
            None => {
                target.define(name, symbol);
                Ok(())
            }
        }
    };

    match mode {
        ImportMode::Merge => {
            for (name, symbol) in exported_symbols(scope) {
                define(&name, symbol)?;
            }
        }
        ImportMode::Items(items) => {
            for item in items {
                let symbol = scope
                    .get(&item.name)
                    .filter(|symbol| !matches!(symbol, Symbol::Module(_)))
                    .ok_or_else(|| {
                        CompileError::semantic(
                            importer,
                            item.span,
                            format!(
                                "o módulo '{}' não exporta '{}'",
                                path.display(),
                                item.name
                            ),
                        )
                    })?;
                define(&item.name, symbol).map_err(|err| relocate(err, item.span))?;
            }
        }
        ImportMode::Alias(alias) => {
            let name = match alias {
                Some(alias) => alias.name.clone(),
                None => path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            };
            let symbol = Symbol::Module(Rc::new(ModuleSymbol {
                name: name.clone(),
                path: path.to_path_buf(),
                scope: Rc::clone(scope),
            }));
            define(&name, symbol)?;
        }
    }
    Ok(())
}

/// Root symbols a module makes available; module aliases are not re-exported.
fn exported_symbols(scope: &Scope) -> Vec<(String, Symbol)> {
    scope
        .symbols()
        .into_iter()
        .filter(|(_, symbol)| !matches!(symbol, Symbol::Module(_)))
        .collect()
}

fn relocate(mut error: CompileError, span: SourceSpan) -> CompileError {
    error.line = span.line;
    error.column = span.column;
    error
}

/// Absolute, lexically normalised form of a path.
pub fn normalize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.clean()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
            .clean()
    }
}
