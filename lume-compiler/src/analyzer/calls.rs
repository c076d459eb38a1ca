use std::collections::HashSet;
use std::rc::Rc;

use super::{Analyzer, Checker};
use crate::ast::{CallExpression, CallResolution, Expression, ExpressionKind, SourceSpan};
use crate::builtins::BuiltinFunction;
use crate::diagnostics::CompileResult;
use crate::symbols::{FunctionSymbol, MethodSymbol, Symbol};
use crate::types::{positional_bindings, Primitive, Type, TypeBindings, VariantType};

enum Callee {
    Symbol(Symbol, String),
    Method {
        method: Rc<MethodSymbol>,
        receiver: Type,
    },
    Builtin(BuiltinFunction),
}

/// Whether `ty` mentions any of the given type parameters.
fn mentions(ty: &Type, parameters: &[String]) -> bool {
    match ty {
        Type::TypeVar(name) => parameters.contains(name),
        Type::Vector(element) => mentions(element, parameters),
        Type::Constructed { arguments, .. } => {
            arguments.iter().any(|argument| mentions(argument, parameters))
        }
        _ => false,
    }
}

impl Analyzer<'_> {
    pub(super) fn visit_call(
        &mut self,
        call: &mut CallExpression,
        span: SourceSpan,
        hint: Option<&Type>,
    ) -> CompileResult<Type> {
        let callee = self.resolve_callee(&mut call.callee)?;
        let type_arguments = call
            .type_arguments
            .iter()
            .map(|argument| self.resolve_type(argument))
            .collect::<CompileResult<Vec<_>>>()?;

        let (ty, resolution) = match callee {
            Callee::Builtin(builtin) => {
                let ty = self.check_builtin_call(builtin, call, &type_arguments, span, hint)?;
                (ty, CallResolution::Builtin(builtin))
            }
            Callee::Method { method, receiver } => {
                let bindings = receiver
                    .as_record()
                    .map(|(_, bindings)| bindings)
                    .unwrap_or_default();
                let function = Rc::new(method.function.specialise(&bindings));
                let (ty, _) = self.check_function_call(&function, call, &type_arguments, span)?;
                (ty, CallResolution::Method(method))
            }
            Callee::Symbol(symbol, name) => match symbol {
                Symbol::Function(function) => {
                    let (ty, resolved) =
                        self.check_function_call(&function, call, &type_arguments, span)?;
                    (ty, CallResolution::Function(resolved))
                }
                Symbol::Type(record @ Type::Record(_)) => {
                    let ty =
                        self.check_record_construction(&record, call, &type_arguments, span, hint)?;
                    (ty.clone(), CallResolution::Record(ty))
                }
                Symbol::Type(Type::Variant(variant)) => {
                    let index = variant.index;
                    let ty = self.check_variant_construction(
                        &variant,
                        call,
                        &type_arguments,
                        span,
                        hint,
                    )?;
                    (ty.clone(), CallResolution::Variant(ty, index))
                }
                Symbol::Type(target @ Type::Primitive(_)) if !target.is_void() => {
                    let ty = self.check_cast(&target, call, &type_arguments, span)?;
                    (ty, CallResolution::Cast(target))
                }
                Symbol::Type(Type::Union(union)) if union.is_option() => {
                    let target = Type::Union(union)
                        .bind_positional(&type_arguments)
                        .map_err(|err| self.error(span, err.to_string()))?;
                    let ty = self.check_cast(&target, call, &[], span)?;
                    (ty, CallResolution::Cast(target))
                }
                other => {
                    return Err(self.error(
                        call.callee.span,
                        format!("'{}' não pode ser chamado ({})", name, other.kind_name()),
                    ))
                }
            },
        };

        call.resolution = Some(resolution);
        Ok(ty)
    }

    fn resolve_callee(&mut self, callee: &mut Expression) -> CompileResult<Callee> {
        match &mut callee.kind {
            ExpressionKind::Identifier(identifier) => {
                if self.initializing.contains(&identifier.name) {
                    return Err(self.error(
                        identifier.span,
                        format!(
                            "a variável '{}' não pode ser usada no seu próprio inicializador",
                            identifier.name
                        ),
                    ));
                }
                match self.resolve(&identifier.name) {
                    Some(symbol) => {
                        callee.symbol = Some(symbol.clone());
                        Ok(Callee::Symbol(symbol, identifier.name.clone()))
                    }
                    None => BuiltinFunction::from_name(&identifier.name)
                        .map(Callee::Builtin)
                        .ok_or_else(|| self.undeclared(&identifier.name, identifier.span)),
                }
            }
            ExpressionKind::Member(member) => {
                if let Some((module, symbol)) = self.module_member(member)? {
                    callee.symbol = Some(symbol.clone());
                    let name = format!("{}.{}", module, member.property);
                    return Ok(Callee::Symbol(symbol, name));
                }

                let receiver = self.visit_value(&mut member.object)?;
                let method = receiver
                    .as_record()
                    .and_then(|(record, _)| record.method(&member.property));
                match method {
                    Some(method) => {
                        callee.symbol = Some(Symbol::Method(Rc::clone(&method)));
                        Ok(Callee::Method { method, receiver })
                    }
                    None if receiver.field_type(&member.property).is_some() => Err(self.error(
                        member.property_span,
                        format!("o campo '{}' não pode ser chamado", member.property),
                    )),
                    None => Err(self.error(
                        member.property_span,
                        format!(
                            "o tipo '{}' não tem o método '{}'",
                            receiver.describe(),
                            member.property
                        ),
                    )),
                }
            }
            _ => Err(self.error(callee.span, "esta expressão não pode ser chamada")),
        }
    }

    fn reject_named_arguments(&self, call: &CallExpression, message: &str) -> CompileResult<()> {
        match call.arguments.iter().find(|argument| argument.name.is_some()) {
            Some(argument) => Err(self.error(
                argument.name_span.unwrap_or(argument.expression.span),
                message,
            )),
            None => Ok(()),
        }
    }

    fn check_arity(
        &self,
        name: &str,
        expected: usize,
        found: usize,
        span: SourceSpan,
    ) -> CompileResult<()> {
        if expected == found {
            return Ok(());
        }
        Err(self.error(
            span,
            format!(
                "'{}' espera {} argumento(s), recebeu {}",
                name, expected, found
            ),
        ))
    }

    fn reject_type_arguments(
        &self,
        name: &str,
        type_arguments: &[Type],
        span: SourceSpan,
    ) -> CompileResult<()> {
        if type_arguments.is_empty() {
            return Ok(());
        }
        Err(self.error(span, format!("'{}' não aceita argumentos de tipo", name)))
    }

    /// Checks one argument against `expected`. Type parameters mentioned by
    /// `expected` are inferred into `mapping`.
    fn check_argument(
        &mut self,
        expected: &Type,
        expression: &mut Expression,
        type_parameters: &[String],
        mapping: &mut TypeBindings,
        mismatch: impl FnOnce(&Type, &Type) -> String,
    ) -> CompileResult<()> {
        let expected = expected.substitute(mapping);
        let generic = mentions(&expected, type_parameters);
        let actual = if generic {
            self.visit_value(expression)?
        } else {
            self.visit_expected(expression, &expected)?
        };
        let compatible = if generic {
            expected.unify(&actual, mapping)
        } else {
            expected.accepts(&actual)
        };
        if compatible {
            return Ok(());
        }
        let message = mismatch(&expected.substitute(mapping), &actual);
        Err(self.error(expression.span, message))
    }

    /// Seeds bindings from explicit type arguments, or from the expected type
    /// when it is an instance of the same generic declaration.
    fn initial_bindings(
        &self,
        owner: &str,
        type_parameters: &[String],
        type_arguments: &[Type],
        from_hint: Option<TypeBindings>,
        span: SourceSpan,
    ) -> CompileResult<TypeBindings> {
        if !type_arguments.is_empty() {
            return positional_bindings(owner, type_parameters, type_arguments)
                .map_err(|err| self.error(span, err.to_string()));
        }
        Ok(from_hint.unwrap_or_default())
    }

    /// Every type parameter must have been inferred by now.
    fn finish_bindings(
        &self,
        owner: &str,
        type_parameters: &[String],
        mapping: &mut TypeBindings,
        span: SourceSpan,
    ) -> CompileResult<()> {
        mapping.retain(|name, _| type_parameters.contains(name));
        match type_parameters
            .iter()
            .find(|param| !mapping.contains_key(*param))
        {
            Some(param) => Err(self.error(
                span,
                format!(
                    "não é possível inferir o argumento de tipo '{}' de '{}'",
                    param, owner
                ),
            )),
            None => Ok(()),
        }
    }

    fn check_function_call(
        &mut self,
        function: &Rc<FunctionSymbol>,
        call: &mut CallExpression,
        type_arguments: &[Type],
        span: SourceSpan,
    ) -> CompileResult<(Type, Rc<FunctionSymbol>)> {
        let name = function.name.clone();
        self.reject_named_arguments(
            call,
            "argumentos nomeados só são permitidos na construção de registos",
        )?;
        self.check_arity(&name, function.parameters.len(), call.arguments.len(), span)?;
        if !function.is_generic() {
            self.reject_type_arguments(&name, type_arguments, span)?;
        }

        let type_parameters = function.type_parameters.clone();
        let mut mapping =
            self.initial_bindings(&name, &type_parameters, type_arguments, None, span)?;

        for (index, (argument, (parameter, symbol))) in call
            .arguments
            .iter_mut()
            .zip(function.parameters.iter())
            .enumerate()
        {
            self.check_argument(
                &symbol.ty,
                &mut argument.expression,
                &type_parameters,
                &mut mapping,
                |expected, actual| {
                    format!(
                        "parâmetro {} ('{}') de '{}': esperado '{}', recebido '{}'",
                        index + 1,
                        parameter,
                        name,
                        expected.describe(),
                        actual.describe()
                    )
                },
            )?;
        }

        if !function.is_generic() {
            return Ok((function.return_type.clone(), Rc::clone(function)));
        }
        self.finish_bindings(&name, &type_parameters, &mut mapping, span)?;
        let specialised = function
            .bind(&mapping)
            .map_err(|err| self.error(span, err.to_string()))?;
        Ok((specialised.return_type.clone(), Rc::new(specialised)))
    }

    fn check_record_construction(
        &mut self,
        record_type: &Type,
        call: &mut CallExpression,
        type_arguments: &[Type],
        span: SourceSpan,
        hint: Option<&Type>,
    ) -> CompileResult<Type> {
        let Some((record, _)) = record_type.as_record() else {
            return Err(self.error(span, "registo inválido"));
        };
        let name = record.name.clone();
        if !record_type.is_generic() {
            self.reject_type_arguments(&name, type_arguments, span)?;
        }
        if let Some(argument) = call.arguments.iter().find(|argument| argument.name.is_none()) {
            return Err(self.error(
                argument.expression.span,
                format!(
                    "a construção de '{}' requer argumentos nomeados (campo: valor)",
                    name
                ),
            ));
        }

        let from_hint = hint
            .and_then(Type::as_record)
            .filter(|(hinted, _)| Rc::ptr_eq(hinted, &record))
            .map(|(_, bindings)| bindings);
        let type_parameters = record.type_parameters.clone();
        let mut mapping =
            self.initial_bindings(&name, &type_parameters, type_arguments, from_hint, span)?;

        let mut initialised: HashSet<String> = HashSet::new();
        for argument in call.arguments.iter_mut() {
            let field_name = argument.name.clone().unwrap_or_default();
            let field_span = argument.name_span.unwrap_or(argument.expression.span);
            if !initialised.insert(field_name.clone()) {
                return Err(self.error(
                    field_span,
                    format!("o campo '{}' foi inicializado mais de uma vez", field_name),
                ));
            }
            let Some(field_type) = record.field(&field_name) else {
                return Err(self.error(
                    field_span,
                    format!("o registo '{}' não tem o campo '{}'", name, field_name),
                ));
            };
            self.check_argument(
                &field_type,
                &mut argument.expression,
                &type_parameters,
                &mut mapping,
                |expected, actual| {
                    format!(
                        "campo '{}' de '{}': esperado '{}', recebido '{}'",
                        field_name,
                        name,
                        expected.describe(),
                        actual.describe()
                    )
                },
            )?;
        }

        if let Some((missing, _)) = record
            .fields()
            .into_iter()
            .find(|(field, _)| !initialised.contains(field))
        {
            return Err(self.error(
                span,
                format!("falta inicializar o campo '{}' de '{}'", missing, name),
            ));
        }

        if !record_type.is_generic() {
            return Ok(record_type.clone());
        }
        self.finish_bindings(&name, &type_parameters, &mut mapping, span)?;
        record_type
            .bind(&mapping)
            .map_err(|err| self.error(span, err.to_string()))
    }

    fn check_variant_construction(
        &mut self,
        variant: &Rc<VariantType>,
        call: &mut CallExpression,
        type_arguments: &[Type],
        span: SourceSpan,
        hint: Option<&Type>,
    ) -> CompileResult<Type> {
        let name = variant.name.clone();
        let union = variant
            .union()
            .ok_or_else(|| self.error(span, format!("a união de '{}' já não existe", name)))?;
        let union_type = Type::Union(Rc::clone(&union));
        if union.type_parameters.is_empty() {
            self.reject_type_arguments(&name, type_arguments, span)?;
        }
        self.reject_named_arguments(call, "argumentos nomeados não são permitidos em variantes")?;
        self.check_arity(&name, variant.parameters.len(), call.arguments.len(), span)?;

        let from_hint = hint
            .and_then(Type::as_union)
            .filter(|(hinted, _)| Rc::ptr_eq(hinted, &union))
            .map(|(_, bindings)| bindings);
        let type_parameters = union.type_parameters.clone();
        let mut mapping =
            self.initial_bindings(&name, &type_parameters, type_arguments, from_hint, span)?;

        for (index, (argument, parameter)) in call
            .arguments
            .iter_mut()
            .zip(variant.parameters.iter())
            .enumerate()
        {
            self.check_argument(
                parameter,
                &mut argument.expression,
                &type_parameters,
                &mut mapping,
                |expected, actual| {
                    format!(
                        "parâmetro {} de '{}': esperado '{}', recebido '{}'",
                        index + 1,
                        name,
                        expected.describe(),
                        actual.describe()
                    )
                },
            )?;
        }

        if type_parameters.is_empty() {
            return Ok(union_type);
        }
        self.finish_bindings(&name, &type_parameters, &mut mapping, span)?;
        union_type
            .bind(&mapping)
            .map_err(|err| self.error(span, err.to_string()))
    }

    fn check_cast(
        &mut self,
        target: &Type,
        call: &mut CallExpression,
        type_arguments: &[Type],
        span: SourceSpan,
    ) -> CompileResult<Type> {
        let name = target.describe();
        self.reject_type_arguments(&name, type_arguments, span)?;
        self.reject_named_arguments(call, "argumentos nomeados não são permitidos em conversões")?;
        self.check_arity(&name, 1, call.arguments.len(), span)?;
        let argument = &mut call.arguments[0].expression;
        let actual = self.visit_value(argument)?;
        if !actual.check_cast(target) {
            return Err(self.error(
                argument.span,
                format!(
                    "não é possível converter '{}' em '{}'",
                    actual.describe(),
                    name
                ),
            ));
        }
        Ok(target.clone())
    }

    fn check_builtin_call(
        &mut self,
        builtin: BuiltinFunction,
        call: &mut CallExpression,
        type_arguments: &[Type],
        span: SourceSpan,
        hint: Option<&Type>,
    ) -> CompileResult<Type> {
        let name = builtin.name();
        self.reject_named_arguments(call, "argumentos nomeados não são permitidos aqui")?;
        if builtin != BuiltinFunction::Vector {
            self.reject_type_arguments(name, type_arguments, span)?;
        }

        match builtin {
            BuiltinFunction::Vector => {
                self.check_arity(name, 1, call.arguments.len(), span)?;
                let element = match (type_arguments, hint) {
                    ([element], _) => element.clone(),
                    ([], Some(Type::Vector(element))) => element.as_ref().clone(),
                    ([], _) => {
                        return Err(self.error(
                            span,
                            "indique o tipo dos elementos com vetor[T](n)",
                        ))
                    }
                    (_, _) => {
                        return Err(self.error(
                            span,
                            format!(
                                "'vetor' espera 1 argumento de tipo, recebeu {}",
                                type_arguments.len()
                            ),
                        ))
                    }
                };
                if !element.is_zero_initializable() {
                    return Err(self.error(
                        span,
                        format!(
                            "o tipo '{}' não tem valor inicial e não pode preencher um vetor",
                            element.describe()
                        ),
                    ));
                }
                self.expect_int_argument(name, &mut call.arguments[0].expression, 1)?;
                Ok(Type::Vector(Box::new(element)))
            }
            BuiltinFunction::Length => {
                self.check_arity(name, 1, call.arguments.len(), span)?;
                let argument = &mut call.arguments[0].expression;
                let ty = self.visit_value(argument)?;
                if matches!(ty, Type::Vector(_)) || ty.is_primitive(Primitive::Text) {
                    Ok(Type::INT)
                } else {
                    Err(self.error(
                        argument.span,
                        format!(
                            "parâmetro 1 de 'tamanho': esperado um vetor ou 'texto', recebido '{}'",
                            ty.describe()
                        ),
                    ))
                }
            }
            BuiltinFunction::Append => {
                self.check_arity(name, 2, call.arguments.len(), span)?;
                let element = self.expect_vector_argument(name, &mut call.arguments[0].expression)?;
                self.check_argument(
                    &element,
                    &mut call.arguments[1].expression,
                    &[],
                    &mut TypeBindings::new(),
                    |expected, actual| {
                        format!(
                            "parâmetro 2 de 'anexa': esperado '{}', recebido '{}'",
                            expected.describe(),
                            actual.describe()
                        )
                    },
                )?;
                Ok(Type::VOID)
            }
            BuiltinFunction::Remove => {
                self.check_arity(name, 2, call.arguments.len(), span)?;
                let element = self.expect_vector_argument(name, &mut call.arguments[0].expression)?;
                self.expect_int_argument(name, &mut call.arguments[1].expression, 2)?;
                Ok(element)
            }
        }
    }

    fn expect_vector_argument(
        &mut self,
        name: &str,
        argument: &mut Expression,
    ) -> CompileResult<Type> {
        match self.visit_value(argument)? {
            Type::Vector(element) => Ok(*element),
            other => Err(self.error(
                argument.span,
                format!(
                    "parâmetro 1 de '{}': esperado um vetor, recebido '{}'",
                    name,
                    other.describe()
                ),
            )),
        }
    }

    fn expect_int_argument(
        &mut self,
        name: &str,
        argument: &mut Expression,
        position: usize,
    ) -> CompileResult<()> {
        let ty = self.visit_value(argument)?;
        if ty.is_primitive(Primitive::Int) {
            return Ok(());
        }
        Err(self.error(
            argument.span,
            format!(
                "parâmetro {} de '{}': esperado 'int', recebido '{}'",
                position,
                name,
                ty.describe()
            ),
        ))
    }
}
