use std::path::PathBuf;
use std::rc::Rc;

use crate::builtins::BuiltinFunction;
use crate::patterns::Decision;
use crate::symbols::{FunctionSymbol, MethodSymbol, Symbol, VariableSymbol};
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    pub fn single_point(line: usize, column: usize) -> Self {
        Self::new(line, column, line, column)
    }

    pub fn union(a: &Self, b: &Self) -> Self {
        if a.line == 0 {
            return *b;
        }
        if b.line == 0 {
            return *a;
        }

        let (start_line, start_column) =
            if (a.line < b.line) || (a.line == b.line && a.column <= b.column) {
                (a.line, a.column)
            } else {
                (b.line, b.column)
            };

        let (end_line, end_column) = if (a.end_line > b.end_line)
            || (a.end_line == b.end_line && a.end_column >= b.end_column)
        {
            (a.end_line, a.end_column)
        } else {
            (b.end_line, b.end_column)
        };

        Self::new(start_line, start_column, end_line, end_column)
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub statements: Vec<Statement>,
}

impl Module {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, Clone)]
pub enum Statement {
    Use(UseStatement),
    Var(VarStatement),
    Function(FunctionStatement),
    Record(RecordStatement),
    Union(UnionStatement),
    Conditional(ConditionalStatement),
    Loop(LoopStatement),
    Switch(SwitchStatement),
    Match(MatchStatement),
    Return(ReturnStatement),
    Break(BreakStatement),
    Continue(ContinueStatement),
    Expression(ExpressionStatement),
}

impl Statement {
    pub fn span(&self) -> SourceSpan {
        match self {
            Statement::Use(stmt) => stmt.module_span,
            Statement::Var(stmt) => stmt.span,
            Statement::Function(stmt) => stmt.name_span,
            Statement::Record(stmt) => stmt.name_span,
            Statement::Union(stmt) => stmt.name_span,
            Statement::Conditional(stmt) => stmt.span,
            Statement::Loop(stmt) => stmt.span,
            Statement::Switch(stmt) => stmt.span,
            Statement::Match(stmt) => stmt.span,
            Statement::Return(stmt) => stmt.span,
            Statement::Break(stmt) => stmt.span,
            Statement::Continue(stmt) => stmt.span,
            Statement::Expression(stmt) => stmt.expression.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UseStatement {
    pub module_path: String,
    pub module_span: SourceSpan,
    pub mode: ImportMode,
    /// Filled in by the module loader once the import is resolved on disk.
    pub resolved_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum ImportMode {
    /// `usa "m"` or `usa "m" como nome`; `None` means the alias is the file stem.
    Alias(Option<Identifier>),
    /// `usa (a, b) de "m"`
    Items(Vec<Identifier>),
    /// `usa * de "m"`
    Merge,
}

#[derive(Debug, Clone)]
pub struct Annotation {
    pub name: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct VarStatement {
    pub name: String,
    pub span: SourceSpan,
    pub type_annotation: Option<TypeExpression>,
    pub initializer: Option<Expression>,
    pub symbol: Option<Rc<VariableSymbol>>,
}

#[derive(Debug, Clone)]
pub struct TypeExpression {
    pub kind: TypeExpressionKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum TypeExpressionKind {
    /// `int`, `Ponto`, `Opcao[int]`, `geo.Ponto`
    Named {
        path: Vec<String>,
        arguments: Vec<TypeExpression>,
    },
    /// `[T]`
    Vector(Box<TypeExpression>),
}

#[derive(Debug, Clone)]
pub struct TypeParameter {
    pub name: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct FunctionStatement {
    pub annotations: Vec<Annotation>,
    pub name: String,
    pub name_span: SourceSpan,
    pub type_parameters: Vec<TypeParameter>,
    pub parameters: Vec<FunctionParameter>,
    pub return_type: Option<TypeExpression>,
    /// `None` only for `@embutido` declarations.
    pub body: Option<Block>,
    pub symbol: Option<Rc<FunctionSymbol>>,
}

#[derive(Debug, Clone)]
pub struct FunctionParameter {
    pub name: String,
    pub span: SourceSpan,
    pub type_annotation: TypeExpression,
}

#[derive(Debug, Clone)]
pub struct RecordStatement {
    pub name: String,
    pub name_span: SourceSpan,
    pub type_parameters: Vec<TypeParameter>,
    pub fields: Vec<RecordField>,
    pub methods: Vec<FunctionStatement>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone)]
pub struct RecordField {
    pub name: String,
    pub span: SourceSpan,
    pub type_annotation: TypeExpression,
}

#[derive(Debug, Clone)]
pub struct UnionStatement {
    pub name: String,
    pub name_span: SourceSpan,
    pub type_parameters: Vec<TypeParameter>,
    pub variants: Vec<VariantDeclaration>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone)]
pub struct VariantDeclaration {
    pub name: String,
    pub span: SourceSpan,
    pub parameters: Vec<TypeExpression>,
}

#[derive(Debug, Clone)]
pub struct ConditionalStatement {
    /// The `se` clause followed by every `senaose` clause.
    pub clauses: Vec<ConditionalClause>,
    pub alternative: Option<Block>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ConditionalClause {
    pub condition: Expression,
    pub consequent: Block,
}

#[derive(Debug, Clone)]
pub struct LoopStatement {
    pub header: LoopHeader,
    pub body: Block,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum LoopHeader {
    /// `enquanto cond`
    Condition(Expression),
    /// `para i de a ate b`
    Range {
        variable: Identifier,
        start: Expression,
        end: Expression,
        symbol: Option<Rc<VariableSymbol>>,
    },
    /// `para x em v`
    Each {
        variable: Identifier,
        iterable: Expression,
        symbol: Option<Rc<VariableSymbol>>,
    },
}

#[derive(Debug, Clone)]
pub struct SwitchStatement {
    pub scrutinee: Expression,
    pub cases: Vec<SwitchCase>,
    pub default: Option<Block>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub values: Vec<Expression>,
    pub body: Block,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct MatchStatement {
    pub scrutinee: Expression,
    pub arms: Vec<MatchArm>,
    pub span: SourceSpan,
    pub decision: Option<Decision>,
    pub reachable_arms: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Expression>,
    pub body: Block,
    pub span: SourceSpan,
    pub bindings: Vec<Rc<VariableSymbol>>,
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    Wildcard,
    /// A bare name: a catch-all binding, unless it names a constructor.
    Binding(String),
    Literal(Literal),
    /// Inclusive integer range `a..b`.
    Range(i64, i64),
    Constructor {
        name: String,
        arguments: Vec<Pattern>,
    },
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub span: SourceSpan,
    pub expression: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct BreakStatement {
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ContinueStatement {
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ExpressionStatement {
    pub expression: Expression,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
    /// Number of locals declared directly in this block's scope.
    pub local_count: usize,
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negative,
    Not,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Negative => "-",
            UnaryOperator::Not => "nao",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::And => "e",
            BinaryOperator::Or => "ou",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub span: SourceSpan,
    pub kind: ExpressionKind,
    /// Result type, recorded by the analyzer.
    pub ty: Option<Type>,
    /// Resolved symbol for names and member accesses, recorded by the analyzer.
    pub symbol: Option<Symbol>,
}

impl Expression {
    pub fn new(span: SourceSpan, kind: ExpressionKind) -> Self {
        Self {
            span,
            kind,
            ty: None,
            symbol: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Identifier(Identifier),
    Literal(Literal),
    Vector(VectorLiteral),
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Call(CallExpression),
    Member(MemberExpression),
    Index(IndexExpression),
    Assignment(AssignmentExpression),
    /// `alvo`, the receiver inside a method body.
    Target,
    Grouping(Box<Expression>),
}

#[derive(Debug, Clone)]
pub struct VectorLiteral {
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub type_arguments: Vec<TypeExpression>,
    pub arguments: Vec<CallArgument>,
    pub resolution: Option<CallResolution>,
}

#[derive(Debug, Clone)]
pub struct CallArgument {
    pub name: Option<String>,
    pub name_span: Option<SourceSpan>,
    pub expression: Expression,
}

/// What a call site turned out to be once its callee was resolved.
#[derive(Debug, Clone)]
pub enum CallResolution {
    Function(Rc<FunctionSymbol>),
    Method(Rc<MethodSymbol>),
    Builtin(BuiltinFunction),
    /// Record construction with named field initializers.
    Record(Type),
    /// Union variant construction; the index is the variant's position.
    Variant(Type, usize),
    Cast(Type),
}

#[derive(Debug, Clone)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: String,
    pub property_span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct IndexExpression {
    pub object: Box<Expression>,
    pub index: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct AssignmentExpression {
    pub target: Box<Expression>,
    pub value: Box<Expression>,
}
