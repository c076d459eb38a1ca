use std::collections::HashSet;

use super::{Analyzer, Checker};
use crate::ast::{
    Block, ConditionalStatement, Expression, ExpressionKind, Literal, LoopHeader, LoopStatement,
    MatchStatement, ReturnStatement, SourceSpan, Statement, SwitchStatement, VarStatement,
};
use crate::diagnostics::CompileResult;
use crate::patterns::{lower_pattern, Column, MatchCompiler, Row};
use crate::types::{Primitive, Type};

impl Analyzer<'_> {
    pub(super) fn visit_block(&mut self, block: &mut Block) -> CompileResult<()> {
        self.enter_scope();
        for statement in block.statements.iter_mut() {
            self.visit_statement(statement)?;
        }
        block.local_count = self.exit_scope();
        Ok(())
    }

    pub(super) fn visit_statement(&mut self, statement: &mut Statement) -> CompileResult<()> {
        match statement {
            Statement::Use(stmt) => Err(self.error(
                stmt.module_span,
                "'usa' só é permitido no nível do módulo",
            )),
            Statement::Function(stmt) => Err(self.error(
                stmt.name_span,
                "funções só podem ser declaradas no nível do módulo",
            )),
            Statement::Record(stmt) => Err(self.error(
                stmt.name_span,
                "registos só podem ser declarados no nível do módulo",
            )),
            Statement::Union(stmt) => Err(self.error(
                stmt.name_span,
                "uniões só podem ser declaradas no nível do módulo",
            )),
            Statement::Var(stmt) => self.visit_var(stmt),
            Statement::Conditional(stmt) => self.visit_conditional(stmt),
            Statement::Loop(stmt) => self.visit_loop(stmt),
            Statement::Switch(stmt) => self.visit_switch(stmt),
            Statement::Match(stmt) => self.visit_match(stmt),
            Statement::Return(stmt) => self.visit_return(stmt),
            Statement::Break(stmt) => self.check_in_loop("quebra", stmt.span),
            Statement::Continue(stmt) => self.check_in_loop("continua", stmt.span),
            Statement::Expression(stmt) => self.visit_expression(&mut stmt.expression).map(|_| ()),
        }
    }

    fn visit_var(&mut self, stmt: &mut VarStatement) -> CompileResult<()> {
        let declared = match &stmt.type_annotation {
            Some(annotation) => Some(self.resolve_type(annotation)?),
            None => None,
        };

        let ty = match (declared, stmt.initializer.as_mut()) {
            (Some(declared), Some(initializer)) => {
                let actual = self.visit_initializer(&stmt.name, initializer, Some(&declared))?;
                if !declared.accepts(&actual) {
                    return Err(self.error(
                        initializer.span,
                        format!(
                            "não é possível atribuir '{}' a '{}' do tipo '{}'",
                            actual.describe(),
                            stmt.name,
                            declared.describe()
                        ),
                    ));
                }
                declared
            }
            (Some(declared), None) => {
                if !declared.is_zero_initializable() {
                    return Err(self.error(
                        stmt.span,
                        format!(
                            "a variável '{}' do tipo '{}' precisa de um inicializador",
                            stmt.name,
                            declared.describe()
                        ),
                    ));
                }
                declared
            }
            (None, Some(initializer)) => {
                let actual = self.visit_initializer(&stmt.name, initializer, None)?;
                if actual.is_primitive(Primitive::Null) {
                    return Err(self.error(
                        initializer.span,
                        format!(
                            "não é possível inferir o tipo de '{}' a partir de 'nulo'",
                            stmt.name
                        ),
                    ));
                }
                actual
            }
            (None, None) => {
                return Err(self.error(
                    stmt.span,
                    format!(
                        "a variável '{}' precisa de um tipo ou de um inicializador",
                        stmt.name
                    ),
                ))
            }
        };

        if ty.is_void() {
            return Err(self.error(
                stmt.span,
                format!("a variável '{}' não pode ser do tipo 'vazio'", stmt.name),
            ));
        }

        let symbol = self.declare_variable(&stmt.name, ty, stmt.span)?;
        stmt.symbol = Some(symbol);
        Ok(())
    }

    fn visit_initializer(
        &mut self,
        name: &str,
        initializer: &mut Expression,
        expected: Option<&Type>,
    ) -> CompileResult<Type> {
        self.initializing.push(name.to_string());
        let result = match expected {
            Some(expected) => self.visit_expected(initializer, expected),
            None => self.visit_expression(initializer),
        };
        self.initializing.pop();
        result
    }

    fn expect_condition(&mut self, condition: &mut Expression, keyword: &str) -> CompileResult<()> {
        let ty = self.visit_expression(condition)?;
        if !ty.is_primitive(Primitive::Bool) {
            return Err(self.error(
                condition.span,
                format!(
                    "a condição de '{}' deve ser 'bool', recebeu '{}'",
                    keyword,
                    ty.describe()
                ),
            ));
        }
        Ok(())
    }

    fn visit_conditional(&mut self, stmt: &mut ConditionalStatement) -> CompileResult<()> {
        for (index, clause) in stmt.clauses.iter_mut().enumerate() {
            let keyword = if index == 0 { "se" } else { "senaose" };
            self.expect_condition(&mut clause.condition, keyword)?;
            self.visit_block(&mut clause.consequent)?;
        }
        if let Some(alternative) = stmt.alternative.as_mut() {
            self.visit_block(alternative)?;
        }
        Ok(())
    }

    fn visit_loop(&mut self, stmt: &mut LoopStatement) -> CompileResult<()> {
        self.enter_scope();
        match &mut stmt.header {
            LoopHeader::Condition(condition) => self.expect_condition(condition, "enquanto")?,
            LoopHeader::Range {
                variable,
                start,
                end,
                symbol,
            } => {
                for bound in [&mut *start, &mut *end] {
                    let ty = self.visit_expression(bound)?;
                    if !ty.is_primitive(Primitive::Int) {
                        return Err(self.error(
                            bound.span,
                            format!(
                                "os limites de 'para' devem ser 'int', recebeu '{}'",
                                ty.describe()
                            ),
                        ));
                    }
                }
                *symbol = Some(self.declare_variable(&variable.name, Type::INT, variable.span)?);
            }
            LoopHeader::Each {
                variable,
                iterable,
                symbol,
            } => {
                let ty = self.visit_expression(iterable)?;
                let element = match &ty {
                    Type::Vector(element) => element.as_ref().clone(),
                    other if other.is_primitive(Primitive::Text) => Type::TEXT,
                    other => {
                        return Err(self.error(
                            iterable.span,
                            format!("não é possível iterar sobre '{}'", other.describe()),
                        ))
                    }
                };
                *symbol = Some(self.declare_variable(&variable.name, element, variable.span)?);
            }
        }

        self.loop_depth += 1;
        let result = self.visit_block(&mut stmt.body);
        self.loop_depth -= 1;
        result?;
        self.exit_scope();
        Ok(())
    }

    fn visit_switch(&mut self, stmt: &mut SwitchStatement) -> CompileResult<()> {
        let ty = self.visit_expression(&mut stmt.scrutinee)?;
        if !ty.is_primitive(Primitive::Int) && !ty.is_primitive(Primitive::Text) {
            return Err(self.error(
                stmt.scrutinee.span,
                format!(
                    "'escolha' só aceita 'int' ou 'texto', recebeu '{}'",
                    ty.describe()
                ),
            ));
        }

        let mut seen: HashSet<String> = HashSet::new();
        for case in stmt.cases.iter_mut() {
            for value in case.values.iter_mut() {
                let value_ty = self.visit_expression(value)?;
                if value_ty != ty {
                    return Err(self.error(
                        value.span,
                        format!(
                            "valor de 'caso' incompatível: esperado '{}', recebido '{}'",
                            ty.describe(),
                            value_ty.describe()
                        ),
                    ));
                }
                if let Some(key) = literal_key(value) {
                    if !seen.insert(key.clone()) {
                        return Err(self.error(
                            value.span,
                            format!("valor de 'caso' repetido: {}", key),
                        ));
                    }
                }
            }
            self.visit_block(&mut case.body)?;
        }
        if let Some(default) = stmt.default.as_mut() {
            self.visit_block(default)?;
        }
        Ok(())
    }

    fn visit_match(&mut self, stmt: &mut MatchStatement) -> CompileResult<()> {
        let ty = self.visit_expression(&mut stmt.scrutinee)?;
        if ty.is_void() {
            return Err(self.error(
                stmt.scrutinee.span,
                "não é possível usar 'iguala' com uma expressão sem valor",
            ));
        }

        let mut compiler = MatchCompiler::new();
        let subject = compiler.new_variable(ty.clone());
        let mut rows = Vec::with_capacity(stmt.arms.len());

        for (index, arm) in stmt.arms.iter_mut().enumerate() {
            self.enter_scope();
            let mut bindings = Vec::new();
            let pattern = lower_pattern(self, &arm.pattern, &ty, &mut bindings)?;
            if let Some(guard) = arm.guard.as_mut() {
                self.expect_condition(guard, "caso ... se")?;
            }
            self.visit_block(&mut arm.body)?;
            self.exit_scope();
            arm.bindings = bindings;
            rows.push(Row::new(
                vec![Column::new(subject.clone(), pattern)],
                arm.guard.is_some(),
                index,
            ));
        }

        let compiled = compiler.compile(rows);
        if compiled.has_missing() {
            return Err(self.error(
                stmt.span,
                format!(
                    "o 'iguala' não é exaustivo; padrões em falta: {}",
                    compiled.missing_patterns().join(", ")
                ),
            ));
        }

        for (index, arm) in stmt.arms.iter().enumerate() {
            if !compiled.reachable.contains(&index) {
                tracing::warn!(
                    path = %self.path.display(),
                    line = arm.span.line,
                    "caso inalcançável em 'iguala'"
                );
            }
        }

        stmt.reachable_arms = compiled.reachable;
        stmt.decision = Some(compiled.tree);
        Ok(())
    }

    fn visit_return(&mut self, stmt: &mut ReturnStatement) -> CompileResult<()> {
        let Some(context) = self.current_function().cloned() else {
            return Err(self.error(stmt.span, "'retorna' fora de uma função"));
        };

        match stmt.expression.as_mut() {
            Some(expression) if context.return_type.is_void() => {
                self.visit_expression(expression)?;
                Err(self.error(
                    expression.span,
                    format!("a função '{}' não retorna valor", context.name),
                ))
            }
            Some(expression) => {
                let actual = self.visit_expected(expression, &context.return_type)?;
                if context.return_type.accepts(&actual) {
                    Ok(())
                } else {
                    Err(self.error(
                        expression.span,
                        format!(
                            "retorno incompatível em '{}': esperado '{}', recebido '{}'",
                            context.name,
                            context.return_type.describe(),
                            actual.describe()
                        ),
                    ))
                }
            }
            None if context.return_type.is_void() => Ok(()),
            None => Err(self.error(
                stmt.span,
                format!(
                    "a função '{}' deve retornar um valor do tipo '{}'",
                    context.name,
                    context.return_type.describe()
                ),
            )),
        }
    }

    fn check_in_loop(&self, keyword: &str, span: SourceSpan) -> CompileResult<()> {
        if self.loop_depth == 0 {
            return Err(self.error(span, format!("'{}' fora de um ciclo", keyword)));
        }
        Ok(())
    }
}

fn literal_key(expression: &Expression) -> Option<String> {
    match &expression.kind {
        ExpressionKind::Literal(Literal::Integer(value)) => Some(value.to_string()),
        ExpressionKind::Literal(Literal::String(value)) => Some(format!("{:?}", value)),
        ExpressionKind::Unary(unary) => match &unary.operand.kind {
            ExpressionKind::Literal(Literal::Integer(value)) => Some(format!("-{}", value)),
            _ => None,
        },
        _ => None,
    }
}
