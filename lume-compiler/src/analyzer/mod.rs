use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::ast::{Module, SourceSpan, Statement, TypeExpression, TypeExpressionKind, UseStatement};
use crate::builtins::BuiltinEnvironment;
use crate::diagnostics::{CompileError, CompileResult};
use crate::modules::ModuleLoader;
use crate::scope::Scope;
use crate::symbols::{Symbol, VariableSymbol};
use crate::types::Type;

mod calls;
mod decl;
mod expr;
mod stmt;

/// Operations shared by the analyzer and the helpers it delegates to
/// (record and union declarations, pattern lowering).
pub trait Checker {
    fn path(&self) -> &Path;

    fn error(&self, span: SourceSpan, message: impl Into<String>) -> CompileError {
        CompileError::semantic(self.path(), span, message)
    }

    fn enter_scope(&mut self);

    /// Leaves the innermost scope and returns how many symbols it held.
    fn exit_scope(&mut self) -> usize;

    fn resolve(&self, name: &str) -> Option<Symbol>;

    /// Defines `name` in the innermost scope, rejecting redeclarations there.
    fn define(&mut self, name: &str, symbol: Symbol, span: SourceSpan) -> CompileResult<()>;

    fn declare_variable(
        &mut self,
        name: &str,
        ty: Type,
        span: SourceSpan,
    ) -> CompileResult<Rc<VariableSymbol>>;

    fn resolve_type(&mut self, expr: &TypeExpression) -> CompileResult<Type>;
}

#[derive(Debug, Clone)]
struct FunctionContext {
    name: String,
    return_type: Type,
    receiver: Option<Type>,
}

/// Walks one module, resolving names and annotating the tree with types and
/// symbols. Imports are delegated to the shared [`ModuleLoader`], which runs a
/// fresh analyzer per imported file.
pub struct Analyzer<'a> {
    path: PathBuf,
    builtins: &'a BuiltinEnvironment,
    loader: &'a mut ModuleLoader,
    module_scope: Rc<Scope>,
    scope: Rc<Scope>,
    functions: Vec<FunctionContext>,
    loop_depth: usize,
    next_local: usize,
    /// Variables whose initializer is being analysed.
    initializing: Vec<String>,
    /// Type expected by the enclosing context, consumed by the next expression.
    expected: Option<Type>,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        path: &Path,
        builtins: &'a BuiltinEnvironment,
        loader: &'a mut ModuleLoader,
        module_scope: Rc<Scope>,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            builtins,
            loader,
            scope: Rc::clone(&module_scope),
            module_scope,
            functions: Vec::new(),
            loop_depth: 0,
            next_local: 0,
            initializing: Vec::new(),
            expected: None,
        }
    }

    pub fn analyze(&mut self, module: &mut Module) -> CompileResult<()> {
        let span = tracing::info_span!("analyze", path = %self.path.display());
        let _entered = span.enter();

        for statement in module.statements.iter_mut() {
            if let Statement::Use(use_stmt) = statement {
                self.visit_use(use_stmt)?;
            }
        }

        self.declare_types(&mut module.statements)?;
        self.declare_functions(&mut module.statements)?;

        for statement in module.statements.iter_mut() {
            match statement {
                Statement::Use(_) | Statement::Union(_) => {}
                Statement::Function(function) => self.check_function_body(function, None)?,
                Statement::Record(record) => self.check_record_methods(record)?,
                other => self.visit_statement(other)?,
            }
        }

        tracing::debug!(globals = self.module_scope.count(), "module analysed");
        Ok(())
    }

    fn visit_use(&mut self, stmt: &mut UseStatement) -> CompileResult<()> {
        let path = self
            .loader
            .resolve(&self.path, &stmt.module_path)
            .ok_or_else(|| {
                self.error(
                    stmt.module_span,
                    format!("módulo '{}' não encontrado", stmt.module_path),
                )
            })?;
        tracing::debug!(import = %stmt.module_path, resolved = %path.display(), "resolved import");
        self.loader.load_module(
            self.builtins,
            &self.path,
            stmt.module_span,
            &path,
            &stmt.mode,
            &self.module_scope,
        )?;
        stmt.resolved_path = Some(path);
        Ok(())
    }

    fn at_module_level(&self) -> bool {
        Rc::ptr_eq(&self.scope, &self.module_scope)
    }

    fn out_name(&mut self, name: &str) -> String {
        if self.at_module_level() {
            name.to_string()
        } else {
            self.next_local += 1;
            format!("{}_{}", name, self.next_local)
        }
    }

    fn current_function(&self) -> Option<&FunctionContext> {
        self.functions.last()
    }

    fn undeclared(&self, name: &str, span: SourceSpan) -> CompileError {
        self.error(span, format!("identificador '{}' não declarado", name))
    }

    fn resolve_type_symbol(&self, path: &[String], span: SourceSpan) -> CompileResult<Type> {
        let symbol = match path {
            [name] => self.resolve(name),
            [module, name] => match self.resolve(module) {
                Some(Symbol::Module(module_symbol)) => module_symbol.scope.get(name),
                Some(_) => {
                    return Err(self.error(span, format!("'{}' não é um módulo", module)))
                }
                None => return Err(self.undeclared(module, span)),
            },
            _ => None,
        };
        let display = path.join(".");
        match symbol {
            Some(Symbol::Type(Type::Variant(_))) => Err(self.error(
                span,
                format!("'{}' é uma variante, não um tipo", display),
            )),
            Some(Symbol::Type(ty)) => Ok(ty),
            Some(other) => Err(self.error(
                span,
                format!("'{}' não é um tipo ({})", display, other.kind_name()),
            )),
            None => Err(self.error(span, format!("tipo '{}' não declarado", display))),
        }
    }
}

impl Checker for Analyzer<'_> {
    fn path(&self) -> &Path {
        &self.path
    }

    fn enter_scope(&mut self) {
        self.scope = Scope::child(&self.scope);
    }

    fn exit_scope(&mut self) -> usize {
        let count = self.scope.count();
        if let Some(parent) = self.scope.parent().cloned() {
            self.scope = parent;
        }
        count
    }

    fn resolve(&self, name: &str) -> Option<Symbol> {
        self.scope.resolve(name)
    }

    fn define(&mut self, name: &str, symbol: Symbol, span: SourceSpan) -> CompileResult<()> {
        if self.scope.get(name).is_some() {
            return Err(self.error(
                span,
                format!("identificador '{}' já declarado neste escopo", name),
            ));
        }
        self.scope.define(name, symbol);
        Ok(())
    }

    fn declare_variable(
        &mut self,
        name: &str,
        ty: Type,
        span: SourceSpan,
    ) -> CompileResult<Rc<VariableSymbol>> {
        let out_name = self.out_name(name);
        let symbol = VariableSymbol::new(name, out_name, ty);
        self.define(name, Symbol::Variable(Rc::clone(&symbol)), span)?;
        Ok(symbol)
    }

    fn resolve_type(&mut self, expr: &TypeExpression) -> CompileResult<Type> {
        match &expr.kind {
            TypeExpressionKind::Vector(element) => {
                let element = self.resolve_type(element)?;
                if element.is_void() {
                    return Err(self.error(expr.span, "vetores de 'vazio' não são permitidos"));
                }
                Ok(Type::Vector(Box::new(element)))
            }
            TypeExpressionKind::Named { path, arguments } => {
                let base = self.resolve_type_symbol(path, expr.span)?;
                if arguments.is_empty() {
                    if base.is_generic() {
                        return Err(self.error(
                            expr.span,
                            format!("o tipo '{}' requer argumentos de tipo", base.describe()),
                        ));
                    }
                    return Ok(base);
                }
                let arguments = arguments
                    .iter()
                    .map(|argument| self.resolve_type(argument))
                    .collect::<CompileResult<Vec<_>>>()?;
                base.bind_positional(&arguments)
                    .map_err(|err| self.error(expr.span, err.to_string()))
            }
        }
    }
}
