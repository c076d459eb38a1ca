use std::rc::Rc;

use super::{Analyzer, Checker};
use crate::ast::{
    AssignmentExpression, BinaryExpression, Expression, ExpressionKind, Identifier,
    IndexExpression, Literal, MemberExpression, SourceSpan, UnaryExpression, VectorLiteral,
};
use crate::diagnostics::CompileResult;
use crate::symbols::Symbol;
use crate::types::{self, Primitive, Type};

impl Analyzer<'_> {
    /// Analyses `expr` with `expected` as a hint for constructs whose type
    /// cannot be inferred on their own (`[]`, `Nenhuma`, `vetor(n)`).
    pub(super) fn visit_expected(
        &mut self,
        expr: &mut Expression,
        expected: &Type,
    ) -> CompileResult<Type> {
        self.expected = Some(expected.clone());
        self.visit_expression(expr)
    }

    pub(super) fn visit_expression(&mut self, expr: &mut Expression) -> CompileResult<Type> {
        let hint = self.expected.take();
        let span = expr.span;
        let ty = match &mut expr.kind {
            ExpressionKind::Identifier(identifier) => {
                let (ty, symbol) = self.visit_identifier(identifier, hint.as_ref())?;
                expr.symbol = Some(symbol);
                ty
            }
            ExpressionKind::Literal(literal) => literal_type(literal),
            ExpressionKind::Vector(vector) => self.visit_vector(vector, span, hint.as_ref())?,
            ExpressionKind::Unary(unary) => self.visit_unary(unary, span)?,
            ExpressionKind::Binary(binary) => self.visit_binary(binary, span)?,
            ExpressionKind::Assignment(assignment) => self.visit_assignment(assignment, span)?,
            ExpressionKind::Index(index) => self.visit_index(index)?,
            ExpressionKind::Member(member) => {
                let (ty, symbol) = self.visit_member(member, span, hint.as_ref())?;
                expr.symbol = symbol;
                ty
            }
            ExpressionKind::Call(call) => self.visit_call(call, span, hint.as_ref())?,
            ExpressionKind::Target => self.visit_target(span)?,
            ExpressionKind::Grouping(inner) => match hint {
                Some(hint) => self.visit_expected(inner, &hint)?,
                None => self.visit_expression(inner)?,
            },
        };
        expr.ty = Some(ty.clone());
        Ok(ty)
    }

    /// Analyses an expression that must produce a value.
    pub(super) fn visit_value(&mut self, expr: &mut Expression) -> CompileResult<Type> {
        let ty = self.visit_expression(expr)?;
        if ty.is_void() {
            return Err(self.error(expr.span, "a expressão não produz valor"));
        }
        Ok(ty)
    }

    fn visit_identifier(
        &mut self,
        identifier: &Identifier,
        hint: Option<&Type>,
    ) -> CompileResult<(Type, Symbol)> {
        if self.initializing.iter().any(|name| *name == identifier.name) {
            return Err(self.error(
                identifier.span,
                format!(
                    "a variável '{}' não pode ser usada no seu próprio inicializador",
                    identifier.name
                ),
            ));
        }
        let symbol = self
            .resolve(&identifier.name)
            .ok_or_else(|| self.undeclared(&identifier.name, identifier.span))?;
        let ty = self.symbol_value(&symbol, &identifier.name, identifier.span, hint)?;
        Ok((ty, symbol))
    }

    /// Type of `symbol` used as a value.
    pub(super) fn symbol_value(
        &self,
        symbol: &Symbol,
        name: &str,
        span: SourceSpan,
        hint: Option<&Type>,
    ) -> CompileResult<Type> {
        if !symbol.can_evaluate() {
            return Err(self.error(
                span,
                format!(
                    "'{}' não pode ser usado como valor ({})",
                    name,
                    symbol.kind_name()
                ),
            ));
        }
        match symbol {
            Symbol::Variable(variable) => Ok(variable.ty.clone()),
            Symbol::Type(Type::Variant(variant)) => {
                let union = variant.union().ok_or_else(|| {
                    self.error(span, format!("a união de '{}' já não existe", name))
                })?;
                if union.type_parameters.is_empty() {
                    return Ok(Type::Union(union));
                }
                match hint.and_then(|hint| hint.as_union().map(|(owner, _)| (owner, hint))) {
                    Some((owner, hint)) if Rc::ptr_eq(&owner, &union) => Ok(hint.clone()),
                    _ => Err(self.error(
                        span,
                        format!(
                            "não é possível inferir os argumentos de tipo de '{}'; indique-os com {}[...]()",
                            name, name
                        ),
                    )),
                }
            }
            _ => Err(self.error(span, format!("'{}' não pode ser usado como valor", name))),
        }
    }

    fn visit_vector(
        &mut self,
        vector: &mut VectorLiteral,
        span: SourceSpan,
        hint: Option<&Type>,
    ) -> CompileResult<Type> {
        let expected_element = match hint {
            Some(Type::Vector(element)) => Some(element.as_ref().clone()),
            _ => None,
        };

        let mut element_type = expected_element.clone();
        for element in vector.elements.iter_mut() {
            let actual = match &element_type {
                Some(expected) => self.visit_expected(element, expected)?,
                None => self.visit_value(element)?,
            };
            element_type = match element_type {
                None => Some(actual),
                Some(current) if current.accepts(&actual) => Some(current),
                // an earlier `int` widens to a later `real`
                Some(current) if expected_element.is_none() && actual.accepts(&current) => {
                    Some(actual)
                }
                Some(current) => {
                    return Err(self.error(
                        element.span,
                        format!(
                            "elemento do vetor incompatível: esperado '{}', recebido '{}'",
                            current.describe(),
                            actual.describe()
                        ),
                    ))
                }
            };
        }

        match element_type {
            Some(element) if element.is_primitive(Primitive::Null) => Err(self.error(
                span,
                "não é possível inferir o tipo de um vetor de 'nulo'",
            )),
            Some(element) => Ok(Type::Vector(Box::new(element))),
            None => Err(self.error(
                span,
                "não é possível inferir o tipo de um vetor vazio",
            )),
        }
    }

    fn visit_unary(&mut self, unary: &mut UnaryExpression, span: SourceSpan) -> CompileResult<Type> {
        let operand = self.visit_value(&mut unary.operand)?;
        types::unaryop(unary.operator, &operand).ok_or_else(|| {
            self.error(
                span,
                format!(
                    "o operador '{}' não se aplica a '{}'",
                    unary.operator.symbol(),
                    operand.describe()
                ),
            )
        })
    }

    fn visit_binary(
        &mut self,
        binary: &mut BinaryExpression,
        span: SourceSpan,
    ) -> CompileResult<Type> {
        let left = self.visit_value(&mut binary.left)?;
        let right = self.visit_value(&mut binary.right)?;
        types::binop(binary.operator, &left, &right).ok_or_else(|| {
            self.error(
                span,
                format!(
                    "o operador '{}' não se aplica a '{}' e '{}'",
                    binary.operator.symbol(),
                    left.describe(),
                    right.describe()
                ),
            )
        })
    }

    fn visit_assignment(
        &mut self,
        assignment: &mut AssignmentExpression,
        span: SourceSpan,
    ) -> CompileResult<Type> {
        let target_span = assignment.target.span;
        match &assignment.target.kind {
            ExpressionKind::Identifier(identifier) => match self.resolve(&identifier.name) {
                Some(Symbol::Variable(_)) => {}
                Some(Symbol::Module(_)) => {
                    return Err(self.error(
                        target_span,
                        format!("o módulo '{}' não pode ser atribuído", identifier.name),
                    ))
                }
                Some(other) => {
                    return Err(self.error(
                        target_span,
                        format!(
                            "não é possível atribuir a '{}' ({})",
                            identifier.name,
                            other.kind_name()
                        ),
                    ))
                }
                None => return Err(self.undeclared(&identifier.name, target_span)),
            },
            ExpressionKind::Member(member) => {
                if let ExpressionKind::Identifier(object) = &member.object.kind {
                    if let Some(Symbol::Module(_)) = self.resolve(&object.name) {
                        return Err(self.error(
                            target_span,
                            format!(
                                "'{}.{}' pertence a um módulo e não pode ser atribuído",
                                object.name, member.property
                            ),
                        ));
                    }
                }
            }
            ExpressionKind::Index(_) => {}
            _ => return Err(self.error(target_span, "alvo de atribuição inválido")),
        }

        let target = self.visit_value(&mut assignment.target)?;
        let value = self.visit_expected(&mut assignment.value, &target)?;
        if !target.accepts(&value) {
            return Err(self.error(
                span,
                format!(
                    "não é possível atribuir '{}' a '{}'",
                    value.describe(),
                    target.describe()
                ),
            ));
        }
        Ok(target)
    }

    fn visit_index(&mut self, index: &mut IndexExpression) -> CompileResult<Type> {
        let object = self.visit_value(&mut index.object)?;
        let position = self.visit_value(&mut index.index)?;
        if !position.is_primitive(Primitive::Int) {
            return Err(self.error(
                index.index.span,
                format!("o índice deve ser 'int', recebeu '{}'", position.describe()),
            ));
        }
        match &object {
            Type::Vector(element) => Ok(element.as_ref().clone()),
            other if other.is_primitive(Primitive::Text) => Ok(Type::TEXT),
            other => Err(self.error(
                index.object.span,
                format!("o tipo '{}' não pode ser indexado", other.describe()),
            )),
        }
    }

    /// Field access, or a name looked up through a module alias.
    fn visit_member(
        &mut self,
        member: &mut MemberExpression,
        span: SourceSpan,
        hint: Option<&Type>,
    ) -> CompileResult<(Type, Option<Symbol>)> {
        if let Some((module, symbol)) = self.module_member(member)? {
            let name = format!("{}.{}", module, member.property);
            let ty = self.symbol_value(&symbol, &name, span, hint)?;
            member.object.symbol = self.resolve(&module);
            return Ok((ty, Some(symbol)));
        }

        let object = self.visit_value(&mut member.object)?;
        if let Some(field) = object.field_type(&member.property) {
            return Ok((field, None));
        }
        let is_method = object
            .as_record()
            .and_then(|(record, _)| record.method(&member.property))
            .is_some();
        let message = if is_method {
            format!("o método '{}' tem de ser chamado", member.property)
        } else {
            format!(
                "o tipo '{}' não tem o campo '{}'",
                object.describe(),
                member.property
            )
        };
        Err(self.error(member.property_span, message))
    }

    /// Resolves `alias.name` when `alias` names an imported module.
    pub(super) fn module_member(
        &self,
        member: &MemberExpression,
    ) -> CompileResult<Option<(String, Symbol)>> {
        let ExpressionKind::Identifier(object) = &member.object.kind else {
            return Ok(None);
        };
        let Some(Symbol::Module(module)) = self.resolve(&object.name) else {
            return Ok(None);
        };
        match module.scope.get(&member.property) {
            Some(symbol) => Ok(Some((object.name.clone(), symbol))),
            None => Err(self.error(
                member.property_span,
                format!(
                    "o módulo '{}' não exporta '{}'",
                    object.name, member.property
                ),
            )),
        }
    }

    fn visit_target(&self, span: SourceSpan) -> CompileResult<Type> {
        self.current_function()
            .and_then(|context| context.receiver.clone())
            .ok_or_else(|| self.error(span, "'alvo' só pode ser usado dentro de métodos"))
    }
}

fn literal_type(literal: &Literal) -> Type {
    match literal {
        Literal::Integer(_) => Type::INT,
        Literal::Float(_) => Type::REAL,
        Literal::String(_) => Type::TEXT,
        Literal::Boolean(_) => Type::BOOL,
        Literal::Null => Type::NULL,
    }
}
