use std::rc::Rc;

use super::{Analyzer, Checker, FunctionContext};
use crate::ast::{
    Block, FunctionStatement, RecordStatement, Statement, TypeParameter, UnionStatement,
};
use crate::diagnostics::CompileResult;
use crate::symbols::{FunctionSymbol, MethodSymbol, Symbol, VariableSymbol, BUILTIN_ANNOTATION};
use crate::types::{RecordType, Type, UnionType};

const MAX_PARAMETERS: usize = 255;

/// Resolves and attaches the fields of a record declared by `stmt`.
fn declare_record_fields<C: Checker>(
    checker: &mut C,
    stmt: &RecordStatement,
    record: &Rc<RecordType>,
) -> CompileResult<()> {
    checker.enter_scope();
    define_type_parameters(checker, &stmt.type_parameters)?;
    for field in &stmt.fields {
        let ty = checker.resolve_type(&field.type_annotation)?;
        if ty.is_void() {
            return Err(checker.error(
                field.span,
                format!("o campo '{}' não pode ser do tipo 'vazio'", field.name),
            ));
        }
        if !record.define_field(&field.name, ty) {
            return Err(checker.error(
                field.span,
                format!("campo '{}' repetido em '{}'", field.name, stmt.name),
            ));
        }
    }
    checker.exit_scope();
    Ok(())
}

/// Resolves the variants of a union and defines each one as a constructor.
fn declare_union_variants<C: Checker>(
    checker: &mut C,
    stmt: &UnionStatement,
    union: &Rc<UnionType>,
) -> CompileResult<()> {
    let mut constructors = Vec::new();
    checker.enter_scope();
    define_type_parameters(checker, &stmt.type_parameters)?;
    for declaration in &stmt.variants {
        let parameters = declaration
            .parameters
            .iter()
            .map(|parameter| checker.resolve_type(parameter))
            .collect::<CompileResult<Vec<_>>>()?;
        if let Some(parameter) = parameters.iter().find(|parameter| parameter.is_void()) {
            return Err(checker.error(
                declaration.span,
                format!(
                    "a variante '{}' não pode ter parâmetros do tipo '{}'",
                    declaration.name,
                    parameter.describe()
                ),
            ));
        }
        let variant = union
            .define_variant(&declaration.name, parameters)
            .ok_or_else(|| {
                checker.error(
                    declaration.span,
                    format!("variante '{}' repetida em '{}'", declaration.name, stmt.name),
                )
            })?;
        constructors.push((variant, declaration.span));
    }
    checker.exit_scope();

    for (variant, span) in constructors {
        let name = variant.name.clone();
        checker.define(&name, Symbol::Type(Type::Variant(variant)), span)?;
    }
    Ok(())
}

fn define_type_parameters<C: Checker>(
    checker: &mut C,
    parameters: &[TypeParameter],
) -> CompileResult<()> {
    for parameter in parameters {
        checker.define(
            &parameter.name,
            Symbol::Type(Type::TypeVar(parameter.name.clone())),
            parameter.span,
        )?;
    }
    Ok(())
}

fn type_parameter_names(parameters: &[TypeParameter]) -> Vec<String> {
    parameters.iter().map(|param| param.name.clone()).collect()
}

impl Analyzer<'_> {
    /// Registers every record and union of the module before any of them is
    /// filled in, so declarations may refer to each other in any order.
    pub(super) fn declare_types(&mut self, statements: &mut [Statement]) -> CompileResult<()> {
        for statement in statements.iter_mut() {
            match statement {
                Statement::Record(stmt) => {
                    let ty = Type::Record(RecordType::new(
                        &stmt.name,
                        type_parameter_names(&stmt.type_parameters),
                    ));
                    self.define(&stmt.name, Symbol::Type(ty.clone()), stmt.name_span)?;
                    stmt.ty = Some(ty);
                }
                Statement::Union(stmt) => {
                    let ty = Type::Union(UnionType::new(
                        &stmt.name,
                        type_parameter_names(&stmt.type_parameters),
                        false,
                    ));
                    self.define(&stmt.name, Symbol::Type(ty.clone()), stmt.name_span)?;
                    stmt.ty = Some(ty);
                }
                _ => {}
            }
        }

        for statement in statements.iter() {
            match statement {
                Statement::Record(stmt) => {
                    if let Some(Type::Record(record)) = &stmt.ty {
                        declare_record_fields(self, stmt, record)?;
                    }
                }
                Statement::Union(stmt) => {
                    if let Some(Type::Union(union)) = &stmt.ty {
                        declare_union_variants(self, stmt, union)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Registers function signatures and record methods ahead of any body.
    pub(super) fn declare_functions(&mut self, statements: &mut [Statement]) -> CompileResult<()> {
        for statement in statements.iter_mut() {
            match statement {
                Statement::Function(stmt) => {
                    let symbol = self.function_signature(stmt, &[])?;
                    self.define(&stmt.name, Symbol::Function(Rc::clone(&symbol)), stmt.name_span)?;
                    stmt.symbol = Some(symbol);
                }
                Statement::Record(stmt) => {
                    let Some(Type::Record(record)) = stmt.ty.clone() else {
                        continue;
                    };
                    for method in stmt.methods.iter_mut() {
                        let symbol = self.function_signature(method, &stmt.type_parameters)?;
                        let method_symbol = MethodSymbol::new(Rc::clone(&symbol), &record);
                        if !record.define_method(method_symbol) {
                            return Err(self.error(
                                method.name_span,
                                format!(
                                    "o registo '{}' já tem um membro '{}'",
                                    record.name, method.name
                                ),
                            ));
                        }
                        method.symbol = Some(symbol);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn function_signature(
        &mut self,
        stmt: &FunctionStatement,
        outer_type_parameters: &[TypeParameter],
    ) -> CompileResult<Rc<FunctionSymbol>> {
        if stmt.parameters.len() > MAX_PARAMETERS {
            return Err(self.error(
                stmt.name_span,
                format!(
                    "a função '{}' tem mais de {} parâmetros",
                    stmt.name, MAX_PARAMETERS
                ),
            ));
        }
        for annotation in &stmt.annotations {
            if annotation.name != BUILTIN_ANNOTATION {
                return Err(self.error(
                    annotation.span,
                    format!("anotação desconhecida '@{}'", annotation.name),
                ));
            }
        }

        self.enter_scope();
        define_type_parameters(self, outer_type_parameters)?;
        define_type_parameters(self, &stmt.type_parameters)?;

        let mut parameters: Vec<(String, Rc<VariableSymbol>)> = Vec::new();
        for parameter in &stmt.parameters {
            if parameters.iter().any(|(name, _)| *name == parameter.name) {
                return Err(self.error(
                    parameter.span,
                    format!("parâmetro '{}' repetido em '{}'", parameter.name, stmt.name),
                ));
            }
            let ty = self.resolve_type(&parameter.type_annotation)?;
            if ty.is_void() {
                return Err(self.error(
                    parameter.span,
                    format!("o parâmetro '{}' não pode ser do tipo 'vazio'", parameter.name),
                ));
            }
            parameters.push((
                parameter.name.clone(),
                VariableSymbol::new(&parameter.name, &parameter.name, ty),
            ));
        }

        let return_type = match &stmt.return_type {
            Some(annotation) => self.resolve_type(annotation)?,
            None => Type::VOID,
        };
        self.exit_scope();

        Ok(Rc::new(FunctionSymbol {
            name: stmt.name.clone(),
            out_name: stmt.name.clone(),
            type_parameters: type_parameter_names(&stmt.type_parameters),
            parameters,
            return_type,
            annotations: stmt
                .annotations
                .iter()
                .map(|annotation| annotation.name.clone())
                .collect(),
        }))
    }

    pub(super) fn check_function_body(
        &mut self,
        stmt: &mut FunctionStatement,
        receiver: Option<(Type, &[TypeParameter])>,
    ) -> CompileResult<()> {
        let Some(symbol) = stmt.symbol.clone() else {
            return Ok(());
        };
        if symbol.has_annotation(BUILTIN_ANNOTATION) {
            return Ok(());
        }
        let Some(body) = stmt.body.as_mut() else {
            return Ok(());
        };

        let (receiver, outer_type_parameters) = match receiver {
            Some((ty, params)) => (Some(ty), params),
            None => (None, &[][..]),
        };

        self.enter_scope();
        define_type_parameters(self, outer_type_parameters)?;
        define_type_parameters(self, &stmt.type_parameters)?;
        self.enter_scope();
        for (name, parameter) in &symbol.parameters {
            self.define(name, Symbol::Variable(Rc::clone(parameter)), stmt.name_span)?;
        }

        self.functions.push(FunctionContext {
            name: stmt.name.clone(),
            return_type: symbol.return_type.clone(),
            receiver,
        });
        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);

        self.visit_block(body)?;

        self.loop_depth = saved_loop_depth;
        self.functions.pop();
        self.exit_scope();
        self.exit_scope();

        if !symbol.return_type.is_void() && !block_returns(body) {
            return Err(self.error(
                stmt.name_span,
                format!("a função '{}' nem sempre retorna um valor", stmt.name),
            ));
        }
        Ok(())
    }

    pub(super) fn check_record_methods(&mut self, stmt: &mut RecordStatement) -> CompileResult<()> {
        let Some(record_type) = stmt.ty.clone() else {
            return Ok(());
        };
        let receiver = if stmt.type_parameters.is_empty() {
            record_type
        } else {
            Type::Constructed {
                base: Box::new(record_type),
                arguments: stmt
                    .type_parameters
                    .iter()
                    .map(|param| Type::TypeVar(param.name.clone()))
                    .collect(),
            }
        };
        for method in stmt.methods.iter_mut() {
            self.check_function_body(method, Some((receiver.clone(), &stmt.type_parameters)))?;
        }
        Ok(())
    }
}

/// Conservative check that every path through `block` ends in `retorna`.
pub(super) fn block_returns(block: &Block) -> bool {
    block.statements.iter().any(statement_returns)
}

fn statement_returns(statement: &Statement) -> bool {
    match statement {
        Statement::Return(_) => true,
        Statement::Conditional(stmt) => match &stmt.alternative {
            Some(alternative) => {
                stmt.clauses
                    .iter()
                    .all(|clause| block_returns(&clause.consequent))
                    && block_returns(alternative)
            }
            None => false,
        },
        Statement::Switch(stmt) => match &stmt.default {
            Some(default) => {
                stmt.cases.iter().all(|case| block_returns(&case.body)) && block_returns(default)
            }
            None => false,
        },
        Statement::Loop(stmt) => block_returns(&stmt.body),
        Statement::Match(stmt) => {
            !stmt.arms.is_empty() && stmt.arms.iter().all(|arm| block_returns(&arm.body))
        }
        _ => false,
    }
}
