use crate::ast::*;
use crate::diagnostics::{CompileError, CompileResult};
use crate::lexer::{Keyword, Token, TokenKind};
use crate::source::SourceFile;
use crate::symbols::BUILTIN_ANNOTATION;

#[derive(Copy, Clone, PartialEq, PartialOrd)]
enum Precedence {
    Lowest = 0,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
}

impl Precedence {
    fn of(kind: &TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Equal => Some(Precedence::Assignment),
            TokenKind::Keyword(Keyword::Ou) => Some(Precedence::Or),
            TokenKind::Keyword(Keyword::E) => Some(Precedence::And),
            TokenKind::DoubleEqual | TokenKind::BangEqual => Some(Precedence::Equality),
            TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::Less
            | TokenKind::LessEqual => Some(Precedence::Comparison),
            TokenKind::Plus | TokenKind::Minus => Some(Precedence::Term),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(Precedence::Factor),
            _ => None,
        }
    }
}

pub struct Parser<'a> {
    source: &'a SourceFile,
    tokens: Vec<Token>,
    current: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a SourceFile, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            current: 0,
        }
    }

    fn span_from_token(token: &Token) -> SourceSpan {
        let len = token.lexeme.chars().count().max(1);
        SourceSpan::new(
            token.line,
            token.column,
            token.line,
            token.column + len.saturating_sub(1),
        )
    }

    fn union_spans(a: &SourceSpan, b: &SourceSpan) -> SourceSpan {
        SourceSpan::union(a, b)
    }

    pub fn parse(&mut self) -> CompileResult<Module> {
        let mut statements = Vec::new();

        loop {
            self.skip_newlines();
            if self.is_at_end() {
                break;
            }
            statements.push(self.parse_statement()?);
        }

        Ok(Module::new(statements))
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> CompileError {
        CompileError::syntax(&self.source.path, token.line, token.column, message)
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        let token = self.peek();
        let found = if matches!(token.kind, TokenKind::Eof) {
            "fim do ficheiro".to_string()
        } else if matches!(token.kind, TokenKind::Newline) {
            "fim de linha".to_string()
        } else {
            format!("'{}'", token.lexeme)
        };
        self.error_at(token, format!("esperado {}, encontrado {}", expected, found))
    }

    fn parse_statement(&mut self) -> CompileResult<Statement> {
        let statement = match self.peek_kind() {
            TokenKind::At => {
                let annotations = self.parse_annotations()?;
                if !self.check_keyword(Keyword::Func) {
                    return Err(self.unexpected("'func' depois de anotação"));
                }
                return self.parse_function(annotations).map(Statement::Function);
            }
            TokenKind::Keyword(Keyword::Usa) => self.parse_use()?,
            TokenKind::Keyword(Keyword::Var) => self.parse_var()?,
            TokenKind::Keyword(Keyword::Func) => {
                return self.parse_function(Vec::new()).map(Statement::Function)
            }
            TokenKind::Keyword(Keyword::Registo) => return self.parse_record(),
            TokenKind::Keyword(Keyword::Uniao) => return self.parse_union(),
            TokenKind::Keyword(Keyword::Se) => return self.parse_conditional(),
            TokenKind::Keyword(Keyword::Enquanto) => return self.parse_while(),
            TokenKind::Keyword(Keyword::Para) => return self.parse_for(),
            TokenKind::Keyword(Keyword::Escolha) => return self.parse_switch(),
            TokenKind::Keyword(Keyword::Iguala) => return self.parse_match(),
            TokenKind::Keyword(Keyword::Retorna) => self.parse_return()?,
            TokenKind::Keyword(Keyword::Quebra) => {
                let span = Self::span_from_token(self.advance());
                Statement::Break(BreakStatement { span })
            }
            TokenKind::Keyword(Keyword::Continua) => {
                let span = Self::span_from_token(self.advance());
                Statement::Continue(ContinueStatement { span })
            }
            _ => {
                let expression = self.parse_expression()?;
                Statement::Expression(ExpressionStatement { expression })
            }
        };
        self.expect_terminator()?;
        Ok(statement)
    }

    fn parse_annotations(&mut self) -> CompileResult<Vec<Annotation>> {
        let mut annotations = Vec::new();
        while matches!(self.peek_kind(), TokenKind::At) {
            let at_token = self.advance().clone();
            let name = self.expect_identifier("nome da anotação")?;
            annotations.push(Annotation {
                name: name.name,
                span: Self::union_spans(&Self::span_from_token(&at_token), &name.span),
            });
            self.skip_newlines();
        }
        Ok(annotations)
    }

    fn parse_use(&mut self) -> CompileResult<Statement> {
        self.advance(); // consume 'usa'

        let mode = match self.peek_kind() {
            TokenKind::Star => {
                self.advance();
                self.expect_keyword(Keyword::De, "'de' depois de 'usa *'")?;
                Some(ImportMode::Merge)
            }
            TokenKind::LParen => {
                self.advance();
                let mut items = Vec::new();
                loop {
                    self.skip_newlines();
                    items.push(self.expect_identifier("nome a importar")?);
                    self.skip_newlines();
                    match self.peek_kind() {
                        TokenKind::Comma => {
                            self.advance();
                        }
                        TokenKind::RParen => {
                            self.advance();
                            break;
                        }
                        _ => return Err(self.unexpected("',' ou ')' na lista de importação")),
                    }
                }
                self.expect_keyword(Keyword::De, "'de' depois da lista de importação")?;
                Some(ImportMode::Items(items))
            }
            _ => None,
        };

        let module_token = self.peek().clone();
        let module_span = Self::span_from_token(&module_token);
        let module_path = match &module_token.kind {
            TokenKind::StringLiteral(value) => {
                self.advance();
                value.clone()
            }
            _ => return Err(self.unexpected("caminho do módulo entre aspas")),
        };

        let mode = match mode {
            Some(mode) => mode,
            None if self.check_keyword(Keyword::Como) => {
                self.advance();
                ImportMode::Alias(Some(self.expect_identifier("nome do módulo")?))
            }
            None => ImportMode::Alias(None),
        };

        Ok(Statement::Use(UseStatement {
            module_path,
            module_span,
            mode,
            resolved_path: None,
        }))
    }

    fn parse_var(&mut self) -> CompileResult<Statement> {
        self.advance(); // consume 'var'
        let name = self.expect_identifier("nome da variável")?;

        let type_annotation = if matches!(self.peek_kind(), TokenKind::Colon) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };

        let initializer = if matches!(self.peek_kind(), TokenKind::Equal) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Statement::Var(VarStatement {
            name: name.name,
            span: name.span,
            type_annotation,
            initializer,
            symbol: None,
        }))
    }

    fn parse_function(&mut self, annotations: Vec<Annotation>) -> CompileResult<FunctionStatement> {
        self.advance(); // consume 'func'
        let name = self.expect_identifier("nome da função")?;
        let type_parameters = self.parse_type_parameters()?;

        self.expect_token(TokenKind::LParen, "'(' antes dos parâmetros")?;
        let mut parameters = Vec::new();
        self.skip_newlines();
        if !matches!(self.peek_kind(), TokenKind::RParen) {
            loop {
                self.skip_newlines();
                let param = self.expect_identifier("nome do parâmetro")?;
                self.expect_token(TokenKind::Colon, "':' depois do nome do parâmetro")?;
                let type_annotation = self.parse_type()?;
                parameters.push(FunctionParameter {
                    name: param.name,
                    span: param.span,
                    type_annotation,
                });
                self.skip_newlines();
                match self.peek_kind() {
                    TokenKind::Comma => {
                        self.advance();
                    }
                    TokenKind::RParen => break,
                    _ => return Err(self.unexpected("',' ou ')' na lista de parâmetros")),
                }
            }
        }
        self.expect_token(TokenKind::RParen, "')' depois dos parâmetros")?;

        let return_type = if matches!(self.peek_kind(), TokenKind::Colon) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };

        let is_builtin = annotations
            .iter()
            .any(|annotation| annotation.name == BUILTIN_ANNOTATION);
        let body = if is_builtin {
            self.expect_terminator()?;
            None
        } else {
            self.expect_terminator()?;
            let block = self.parse_block_until(&[Keyword::Fim])?;
            self.expect_keyword(Keyword::Fim, "'fim' no final da função")?;
            self.expect_terminator()?;
            Some(block)
        };

        Ok(FunctionStatement {
            annotations,
            name: name.name,
            name_span: name.span,
            type_parameters,
            parameters,
            return_type,
            body,
            symbol: None,
        })
    }

    fn parse_type_parameters(&mut self) -> CompileResult<Vec<TypeParameter>> {
        let mut params = Vec::new();
        if !matches!(self.peek_kind(), TokenKind::LBracket) {
            return Ok(params);
        }
        self.advance(); // consume '['
        loop {
            let name = self.expect_identifier("nome do parâmetro de tipo")?;
            params.push(TypeParameter {
                name: name.name,
                span: name.span,
            });
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBracket => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("',' ou ']' nos parâmetros de tipo")),
            }
        }
        Ok(params)
    }

    fn parse_record(&mut self) -> CompileResult<Statement> {
        self.advance(); // consume 'registo'
        let name = self.expect_identifier("nome do registo")?;
        let type_parameters = self.parse_type_parameters()?;
        self.expect_terminator()?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek_kind() {
                TokenKind::Keyword(Keyword::Fim) => {
                    self.advance();
                    break;
                }
                TokenKind::Keyword(Keyword::Func) | TokenKind::At => {
                    let annotations = self.parse_annotations()?;
                    if !self.check_keyword(Keyword::Func) {
                        return Err(self.unexpected("'func' depois de anotação"));
                    }
                    methods.push(self.parse_function(annotations)?);
                }
                TokenKind::Identifier => {
                    let field = self.expect_identifier("nome do campo")?;
                    self.expect_token(TokenKind::Colon, "':' depois do nome do campo")?;
                    let type_annotation = self.parse_type()?;
                    fields.push(RecordField {
                        name: field.name,
                        span: field.span,
                        type_annotation,
                    });
                    self.expect_terminator()?;
                }
                _ => return Err(self.unexpected("campo, método ou 'fim' no registo")),
            }
        }
        self.expect_terminator()?;

        Ok(Statement::Record(RecordStatement {
            name: name.name,
            name_span: name.span,
            type_parameters,
            fields,
            methods,
            ty: None,
        }))
    }

    fn parse_union(&mut self) -> CompileResult<Statement> {
        self.advance(); // consume 'uniao'
        let name = self.expect_identifier("nome da união")?;
        let type_parameters = self.parse_type_parameters()?;
        self.expect_terminator()?;

        let mut variants = Vec::new();
        loop {
            self.skip_newlines();
            if self.check_keyword(Keyword::Fim) {
                self.advance();
                break;
            }
            let variant = self.expect_identifier("nome da variante")?;
            let mut parameters = Vec::new();
            if matches!(self.peek_kind(), TokenKind::LParen) {
                self.advance();
                loop {
                    parameters.push(self.parse_type()?);
                    match self.peek_kind() {
                        TokenKind::Comma => {
                            self.advance();
                        }
                        TokenKind::RParen => {
                            self.advance();
                            break;
                        }
                        _ => return Err(self.unexpected("',' ou ')' nos parâmetros da variante")),
                    }
                }
            }
            variants.push(VariantDeclaration {
                name: variant.name,
                span: variant.span,
                parameters,
            });
            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect_terminator()?;

        Ok(Statement::Union(UnionStatement {
            name: name.name,
            name_span: name.span,
            type_parameters,
            variants,
            ty: None,
        }))
    }

    fn parse_conditional(&mut self) -> CompileResult<Statement> {
        let start = Self::span_from_token(self.advance()); // consume 'se'
        let terminators = [Keyword::SenaoSe, Keyword::Senao, Keyword::Fim];

        let mut clauses = Vec::new();
        let condition = self.parse_expression()?;
        let consequent = self.parse_block_until(&terminators)?;
        clauses.push(ConditionalClause {
            condition,
            consequent,
        });

        while self.check_keyword(Keyword::SenaoSe) {
            self.advance();
            let condition = self.parse_expression()?;
            let consequent = self.parse_block_until(&terminators)?;
            clauses.push(ConditionalClause {
                condition,
                consequent,
            });
        }

        let alternative = if self.check_keyword(Keyword::Senao) {
            self.advance();
            Some(self.parse_block_until(&[Keyword::Fim])?)
        } else {
            None
        };

        self.expect_keyword(Keyword::Fim, "'fim' no final de 'se'")?;
        self.expect_terminator()?;

        Ok(Statement::Conditional(ConditionalStatement {
            clauses,
            alternative,
            span: start,
        }))
    }

    fn parse_while(&mut self) -> CompileResult<Statement> {
        let span = Self::span_from_token(self.advance()); // consume 'enquanto'
        let condition = self.parse_expression()?;
        let body = self.parse_block_until(&[Keyword::Fim])?;
        self.expect_keyword(Keyword::Fim, "'fim' no final de 'enquanto'")?;
        self.expect_terminator()?;
        Ok(Statement::Loop(LoopStatement {
            header: LoopHeader::Condition(condition),
            body,
            span,
        }))
    }

    fn parse_for(&mut self) -> CompileResult<Statement> {
        let span = Self::span_from_token(self.advance()); // consume 'para'
        let variable = self.expect_identifier("variável do ciclo")?;

        let header = if self.check_keyword(Keyword::De) {
            self.advance();
            let start = self.parse_expression()?;
            self.expect_keyword(Keyword::Ate, "'ate' no ciclo 'para'")?;
            let end = self.parse_expression()?;
            LoopHeader::Range {
                variable,
                start,
                end,
                symbol: None,
            }
        } else if self.check_keyword(Keyword::Em) {
            self.advance();
            let iterable = self.parse_expression()?;
            LoopHeader::Each {
                variable,
                iterable,
                symbol: None,
            }
        } else {
            return Err(self.unexpected("'de' ou 'em' no ciclo 'para'"));
        };

        let body = self.parse_block_until(&[Keyword::Fim])?;
        self.expect_keyword(Keyword::Fim, "'fim' no final de 'para'")?;
        self.expect_terminator()?;
        Ok(Statement::Loop(LoopStatement { header, body, span }))
    }

    fn parse_switch(&mut self) -> CompileResult<Statement> {
        let span = Self::span_from_token(self.advance()); // consume 'escolha'
        let scrutinee = self.parse_expression()?;
        self.expect_terminator()?;
        let terminators = [Keyword::Caso, Keyword::Padrao, Keyword::Fim];

        let mut cases = Vec::new();
        let mut default = None;
        loop {
            self.skip_newlines();
            match self.peek_keyword() {
                Some(Keyword::Caso) => {
                    let case_span = Self::span_from_token(self.advance());
                    let mut values = vec![self.parse_expression()?];
                    while matches!(self.peek_kind(), TokenKind::Comma) {
                        self.advance();
                        values.push(self.parse_expression()?);
                    }
                    let body = self.parse_block_until(&terminators)?;
                    cases.push(SwitchCase {
                        values,
                        body,
                        span: case_span,
                    });
                }
                Some(Keyword::Padrao) if default.is_none() => {
                    self.advance();
                    default = Some(self.parse_block_until(&terminators)?);
                }
                Some(Keyword::Fim) => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("'caso', 'padrao' ou 'fim' em 'escolha'")),
            }
        }
        self.expect_terminator()?;

        Ok(Statement::Switch(SwitchStatement {
            scrutinee,
            cases,
            default,
            span,
        }))
    }

    fn parse_match(&mut self) -> CompileResult<Statement> {
        let span = Self::span_from_token(self.advance()); // consume 'iguala'
        let scrutinee = self.parse_expression()?;
        self.expect_terminator()?;

        let mut arms = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek_keyword() {
                Some(Keyword::Caso) => {
                    let arm_span = Self::span_from_token(self.advance());
                    let pattern = self.parse_pattern()?;
                    let guard = if self.check_keyword(Keyword::Se) {
                        self.advance();
                        Some(self.parse_expression()?)
                    } else {
                        None
                    };
                    let body = self.parse_block_until(&[Keyword::Caso, Keyword::Fim])?;
                    arms.push(MatchArm {
                        pattern,
                        guard,
                        body,
                        span: arm_span,
                        bindings: Vec::new(),
                    });
                }
                Some(Keyword::Fim) => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("'caso' ou 'fim' em 'iguala'")),
            }
        }
        self.expect_terminator()?;

        Ok(Statement::Match(MatchStatement {
            scrutinee,
            arms,
            span,
            decision: None,
            reachable_arms: Vec::new(),
        }))
    }

    fn parse_pattern(&mut self) -> CompileResult<Pattern> {
        let token = self.advance().clone();
        let span = Self::span_from_token(&token);
        let kind = match &token.kind {
            TokenKind::Identifier if token.lexeme == "_" => PatternKind::Wildcard,
            TokenKind::Identifier => {
                if matches!(self.peek_kind(), TokenKind::LParen) {
                    self.advance();
                    let mut arguments = Vec::new();
                    if !matches!(self.peek_kind(), TokenKind::RParen) {
                        loop {
                            arguments.push(self.parse_pattern()?);
                            if matches!(self.peek_kind(), TokenKind::Comma) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect_token(TokenKind::RParen, "')' no final do padrão")?;
                    PatternKind::Constructor {
                        name: token.lexeme.clone(),
                        arguments,
                    }
                } else {
                    PatternKind::Binding(token.lexeme.clone())
                }
            }
            TokenKind::Minus => {
                let value = self.expect_integer()?;
                self.finish_integer_pattern(-value)?
            }
            TokenKind::IntegerLiteral(value) => self.finish_integer_pattern(*value)?,
            TokenKind::StringLiteral(value) => PatternKind::Literal(Literal::String(value.clone())),
            TokenKind::BooleanLiteral(value) => PatternKind::Literal(Literal::Boolean(*value)),
            _ => {
                return Err(self.error_at(
                    &token,
                    format!("padrão inválido '{}'", token.lexeme),
                ))
            }
        };
        let end = self.previous_span();
        Ok(Pattern {
            kind,
            span: Self::union_spans(&span, &end),
        })
    }

    fn finish_integer_pattern(&mut self, start: i64) -> CompileResult<PatternKind> {
        if !matches!(self.peek_kind(), TokenKind::DotDot) {
            return Ok(PatternKind::Literal(Literal::Integer(start)));
        }
        self.advance(); // consume '..'
        let negative = matches!(self.peek_kind(), TokenKind::Minus);
        if negative {
            self.advance();
        }
        let end = self.expect_integer()?;
        Ok(PatternKind::Range(start, if negative { -end } else { end }))
    }

    fn expect_integer(&mut self) -> CompileResult<i64> {
        match self.peek_kind() {
            TokenKind::IntegerLiteral(value) => {
                let value = *value;
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected("literal inteiro")),
        }
    }

    fn parse_return(&mut self) -> CompileResult<Statement> {
        let span = Self::span_from_token(self.advance()); // consume 'retorna'
        let expression = if self.at_terminator() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        Ok(Statement::Return(ReturnStatement { span, expression }))
    }

    fn parse_block_until(&mut self, terminators: &[Keyword]) -> CompileResult<Block> {
        let mut statements = Vec::new();

        loop {
            self.skip_newlines();
            if self
                .peek_keyword()
                .map(|kw| terminators.contains(&kw))
                .unwrap_or(false)
            {
                break;
            }
            if self.is_at_end() {
                return Err(self.unexpected("'fim'"));
            }
            statements.push(self.parse_statement()?);
        }

        Ok(Block {
            statements,
            local_count: 0,
        })
    }

    pub(crate) fn parse_type(&mut self) -> CompileResult<TypeExpression> {
        let token = self.peek().clone();
        let start = Self::span_from_token(&token);
        match token.kind {
            TokenKind::LBracket => {
                self.advance();
                let element = self.parse_type()?;
                self.expect_token(TokenKind::RBracket, "']' no tipo vetor")?;
                Ok(TypeExpression {
                    kind: TypeExpressionKind::Vector(Box::new(element)),
                    span: Self::union_spans(&start, &self.previous_span()),
                })
            }
            TokenKind::Identifier => {
                self.advance();
                let mut path = vec![token.lexeme];
                while matches!(self.peek_kind(), TokenKind::Dot) {
                    self.advance();
                    path.push(self.expect_identifier("nome do tipo")?.name);
                }
                let mut arguments = Vec::new();
                if matches!(self.peek_kind(), TokenKind::LBracket) {
                    self.advance();
                    loop {
                        arguments.push(self.parse_type()?);
                        match self.peek_kind() {
                            TokenKind::Comma => {
                                self.advance();
                            }
                            TokenKind::RBracket => {
                                self.advance();
                                break;
                            }
                            _ => return Err(self.unexpected("',' ou ']' nos argumentos de tipo")),
                        }
                    }
                }
                Ok(TypeExpression {
                    kind: TypeExpressionKind::Named { path, arguments },
                    span: Self::union_spans(&start, &self.previous_span()),
                })
            }
            _ => Err(self.unexpected("um tipo")),
        }
    }

    fn parse_expression(&mut self) -> CompileResult<Expression> {
        self.parse_expression_prec(Precedence::Lowest)
    }

    fn parse_expression_prec(&mut self, precedence: Precedence) -> CompileResult<Expression> {
        let mut expr = self.parse_prefix_expression()?;

        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    expr = self.finish_call(expr, Vec::new())?;
                    continue;
                }
                TokenKind::LBracket => {
                    if let Some(call_expr) = self.try_finish_generic_call(&expr)? {
                        expr = call_expr;
                        continue;
                    }
                    expr = self.finish_index(expr)?;
                    continue;
                }
                TokenKind::Dot => {
                    expr = self.finish_member(expr)?;
                    continue;
                }
                _ => {}
            }

            let next_precedence = match Precedence::of(self.peek_kind()) {
                Some(p) => p,
                None => break,
            };

            if precedence >= next_precedence {
                break;
            }

            expr = self.parse_infix_expression(expr, next_precedence)?;
        }

        Ok(expr)
    }

    fn parse_prefix_expression(&mut self) -> CompileResult<Expression> {
        let token = self.advance().clone();
        let token_span = Self::span_from_token(&token);
        let kind = match token.kind {
            TokenKind::Identifier => ExpressionKind::Identifier(Identifier {
                name: token.lexeme,
                span: token_span,
            }),
            TokenKind::IntegerLiteral(value) => ExpressionKind::Literal(Literal::Integer(value)),
            TokenKind::FloatLiteral(value) => ExpressionKind::Literal(Literal::Float(value)),
            TokenKind::StringLiteral(value) => ExpressionKind::Literal(Literal::String(value)),
            TokenKind::BooleanLiteral(value) => ExpressionKind::Literal(Literal::Boolean(value)),
            TokenKind::Keyword(Keyword::Nulo) => ExpressionKind::Literal(Literal::Null),
            TokenKind::Keyword(Keyword::Alvo) => ExpressionKind::Target,
            TokenKind::Minus | TokenKind::Keyword(Keyword::Nao) => {
                let operator = if matches!(token.kind, TokenKind::Minus) {
                    UnaryOperator::Negative
                } else {
                    UnaryOperator::Not
                };
                let operand = self.parse_expression_prec(Precedence::Unary)?;
                let span = Self::union_spans(&token_span, &operand.span);
                return Ok(Expression::new(
                    span,
                    ExpressionKind::Unary(UnaryExpression {
                        operator,
                        operand: Box::new(operand),
                    }),
                ));
            }
            TokenKind::LParen => {
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect_token(TokenKind::RParen, "')' depois da expressão")?;
                let span = Self::union_spans(&token_span, &self.previous_span());
                return Ok(Expression::new(
                    span,
                    ExpressionKind::Grouping(Box::new(inner)),
                ));
            }
            TokenKind::LBracket => return self.parse_vector_literal(token_span),
            _ => {
                return Err(self.error_at(
                    &token,
                    format!("token inesperado '{}'", token.lexeme.escape_debug()),
                ))
            }
        };
        Ok(Expression::new(token_span, kind))
    }

    fn parse_vector_literal(&mut self, opening_span: SourceSpan) -> CompileResult<Expression> {
        let mut elements = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek_kind(), TokenKind::RBracket) {
                self.advance();
                break;
            }
            elements.push(self.parse_expression()?);
            self.skip_newlines();
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBracket => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("',' ou ']' no vetor")),
            }
        }
        let span = Self::union_spans(&opening_span, &self.previous_span());
        Ok(Expression::new(
            span,
            ExpressionKind::Vector(VectorLiteral { elements }),
        ))
    }

    fn parse_infix_expression(
        &mut self,
        left: Expression,
        precedence: Precedence,
    ) -> CompileResult<Expression> {
        let operator_token = self.advance().clone();
        self.skip_newlines();
        if matches!(operator_token.kind, TokenKind::Equal) {
            // assignment is right-associative
            let value = self.parse_expression_prec(Precedence::Lowest)?;
            let span = Self::union_spans(&left.span, &value.span);
            return Ok(Expression::new(
                span,
                ExpressionKind::Assignment(AssignmentExpression {
                    target: Box::new(left),
                    value: Box::new(value),
                }),
            ));
        }

        let operator = binary_operator_from_token(&operator_token.kind)
            .ok_or_else(|| self.error_at(&operator_token, "operador binário desconhecido"))?;
        let right = self.parse_expression_prec(precedence)?;
        let span = Self::union_spans(&left.span, &right.span);
        Ok(Expression::new(
            span,
            ExpressionKind::Binary(BinaryExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            }),
        ))
    }

    /// Tries to read `callee[T, ...](...)`. Restores the cursor and returns
    /// `None` when the brackets turn out to be an index expression.
    fn try_finish_generic_call(&mut self, callee: &Expression) -> CompileResult<Option<Expression>> {
        if !matches!(
            callee.kind,
            ExpressionKind::Identifier(_) | ExpressionKind::Member(_)
        ) {
            return Ok(None);
        }

        let saved_index = self.current;
        self.advance(); // consume '['
        let mut type_arguments = Vec::new();
        loop {
            match self.parse_type() {
                Ok(argument) => type_arguments.push(argument),
                Err(_) => {
                    self.current = saved_index;
                    return Ok(None);
                }
            }
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBracket => {
                    self.advance();
                    break;
                }
                _ => {
                    self.current = saved_index;
                    return Ok(None);
                }
            }
        }

        if !matches!(self.peek_kind(), TokenKind::LParen) {
            self.current = saved_index;
            return Ok(None);
        }

        let expression = self.finish_call(callee.clone(), type_arguments)?;
        Ok(Some(expression))
    }

    fn finish_call(
        &mut self,
        callee: Expression,
        type_arguments: Vec<TypeExpression>,
    ) -> CompileResult<Expression> {
        self.expect_token(TokenKind::LParen, "'(' para iniciar os argumentos")?;

        let mut arguments: Vec<CallArgument> = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek_kind(), TokenKind::RParen) {
                self.advance();
                break;
            }

            let (name, name_span) = if matches!(self.peek_kind(), TokenKind::Identifier)
                && matches!(self.peek_kind_at(1), Some(TokenKind::Colon))
            {
                let name_token = self.advance().clone();
                let span = Some(Self::span_from_token(&name_token));
                self.advance(); // consume ':'
                (Some(name_token.lexeme), span)
            } else {
                (None, None)
            };

            let expression = self.parse_expression()?;
            arguments.push(CallArgument {
                name,
                name_span,
                expression,
            });
            self.skip_newlines();
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("',' ou ')' nos argumentos")),
            }
        }

        let span = Self::union_spans(&callee.span, &self.previous_span());
        Ok(Expression::new(
            span,
            ExpressionKind::Call(CallExpression {
                callee: Box::new(callee),
                type_arguments,
                arguments,
                resolution: None,
            }),
        ))
    }

    fn finish_index(&mut self, object: Expression) -> CompileResult<Expression> {
        self.expect_token(TokenKind::LBracket, "'[' no acesso por índice")?;
        let index = self.parse_expression()?;
        self.expect_token(TokenKind::RBracket, "']' depois do índice")?;
        let span = Self::union_spans(&object.span, &self.previous_span());
        Ok(Expression::new(
            span,
            ExpressionKind::Index(IndexExpression {
                object: Box::new(object),
                index: Box::new(index),
            }),
        ))
    }

    fn finish_member(&mut self, object: Expression) -> CompileResult<Expression> {
        self.expect_token(TokenKind::Dot, "'.' no acesso a membro")?;
        let property = self.expect_identifier("nome do membro depois de '.'")?;
        let span = Self::union_spans(&object.span, &property.span);
        Ok(Expression::new(
            span,
            ExpressionKind::Member(MemberExpression {
                object: Box::new(object),
                property: property.name,
                property_span: property.span,
            }),
        ))
    }

    fn expect_identifier(&mut self, what: &str) -> CompileResult<Identifier> {
        if matches!(self.peek_kind(), TokenKind::Identifier) {
            let token = self.advance().clone();
            Ok(Identifier {
                span: Self::span_from_token(&token),
                name: token.lexeme,
            })
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_token(&mut self, expected: TokenKind, message: &str) -> CompileResult<()> {
        if std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(message))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword, message: &str) -> CompileResult<()> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(message))
        }
    }

    fn at_terminator(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        ) || matches!(
            self.peek_keyword(),
            Some(Keyword::Fim | Keyword::Senao | Keyword::SenaoSe | Keyword::Caso | Keyword::Padrao)
        )
    }

    fn expect_terminator(&mut self) -> CompileResult<()> {
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            _ if self.at_terminator() => Ok(()),
            _ => Err(self.unexpected("fim de linha")),
        }
    }

    fn previous_span(&self) -> SourceSpan {
        self.current
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map(Self::span_from_token)
            .unwrap_or_default()
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.peek_keyword(), Some(kw) if kw == keyword)
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        match self.peek_kind() {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens
            .get(self.current + offset)
            .map(|token| token.kind.clone())
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }
}

fn binary_operator_from_token(kind: &TokenKind) -> Option<BinaryOperator> {
    let operator = match kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Subtract,
        TokenKind::Star => BinaryOperator::Multiply,
        TokenKind::Slash => BinaryOperator::Divide,
        TokenKind::Percent => BinaryOperator::Modulo,
        TokenKind::DoubleEqual => BinaryOperator::Equal,
        TokenKind::BangEqual => BinaryOperator::NotEqual,
        TokenKind::Greater => BinaryOperator::Greater,
        TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
        TokenKind::Less => BinaryOperator::Less,
        TokenKind::LessEqual => BinaryOperator::LessEqual,
        TokenKind::Keyword(Keyword::E) => BinaryOperator::And,
        TokenKind::Keyword(Keyword::Ou) => BinaryOperator::Or,
        _ => return None,
    };
    Some(operator)
}

/// Lexes and parses a whole source file.
pub fn parse_source(source: &SourceFile) -> CompileResult<Module> {
    let tokens = crate::lexer::Lexer::new(source).tokenize()?;
    Parser::new(source, tokens).parse()
}

#[cfg(test)]
mod tests;
