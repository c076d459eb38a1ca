//! Compiles `iguala` arms into decision trees and finds missing patterns.
//!
//! Rows of patterns are specialised column by column: each step picks a
//! branch variable, splits the rows by the constructor they expect for it and
//! recurses. A `Failure` leaf that is still reachable means some value is not
//! covered by any arm.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use tracing::trace;

use crate::analyzer::Checker;
use crate::ast::{Literal, Pattern, PatternKind};
use crate::diagnostics::{CompileError, CompileResult};
use crate::symbols::{Symbol, VariableSymbol};
use crate::types::{Primitive, Type};

/// A value being tested: the scrutinee or one of its sub-values.
#[derive(Debug, Clone)]
pub struct Variable {
    pub id: usize,
    pub ty: Type,
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constructor {
    True,
    False,
    /// Inclusive integer range; a literal is a range of one value.
    Int(i64, i64),
    Text(String),
    /// Variant of the union type, by position.
    Variant(Type, usize),
}

impl Constructor {
    /// Position among the finite constructors of a type.
    fn index(&self) -> usize {
        match self {
            Constructor::False => 1,
            Constructor::Variant(_, index) => *index,
            _ => 0,
        }
    }
}

/// Pattern lowered against the scrutinee type.
#[derive(Debug, Clone)]
pub enum Pat {
    Constructor(Constructor, Vec<Pat>),
    Binding(String),
    Wildcard,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub variable: Variable,
    pub pattern: Pat,
}

impl Column {
    pub fn new(variable: Variable, pattern: Pat) -> Self {
        Self { variable, pattern }
    }
}

/// What runs when a row matches: its bindings and the arm index.
#[derive(Debug, Clone)]
pub struct Body {
    pub bindings: Vec<(String, Variable)>,
    pub arm: usize,
}

#[derive(Debug, Clone)]
pub struct Row {
    pub columns: Vec<Column>,
    pub guarded: bool,
    pub body: Body,
}

impl Row {
    pub fn new(columns: Vec<Column>, guarded: bool, arm: usize) -> Self {
        Self {
            columns,
            guarded,
            body: Body {
                bindings: Vec::new(),
                arm,
            },
        }
    }

    fn remove_column(&mut self, variable: &Variable) -> Option<Column> {
        self.columns
            .iter()
            .position(|column| column.variable == *variable)
            .map(|index| self.columns.remove(index))
    }
}

#[derive(Debug, Clone)]
pub struct Case {
    pub constructor: Constructor,
    pub arguments: Vec<Variable>,
    pub body: Decision,
}

#[derive(Debug, Clone)]
pub enum Decision {
    Success(Body),
    Failure,
    /// Runs the guard of `arm`; on success `Body`, otherwise the fallback.
    Guard(usize, Body, Box<Decision>),
    /// Tests a variable against each case; the fallback covers every value
    /// not listed, and is only present for types with infinitely many values.
    Switch(Variable, Vec<Case>, Option<Box<Decision>>),
}

/// Result of compiling one `iguala`.
#[derive(Debug)]
pub struct Match {
    pub tree: Decision,
    /// Arms that some value can reach, in ascending order.
    pub reachable: Vec<usize>,
    missing: bool,
}

impl Match {
    pub fn has_missing(&self) -> bool {
        self.missing
    }

    /// Renders the values no arm covers, such as `Quadrado(_)`.
    pub fn missing_patterns(&self) -> Vec<String> {
        let mut missing = BTreeSet::new();
        let mut terms = Vec::new();
        add_missing_patterns(&self.tree, &mut terms, &mut missing);
        missing.into_iter().collect()
    }
}

#[derive(Default)]
pub struct MatchCompiler {
    next_variable: usize,
    reachable: BTreeSet<usize>,
    missing: bool,
}

impl MatchCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_variable(&mut self, ty: Type) -> Variable {
        let variable = Variable {
            id: self.next_variable,
            ty,
        };
        self.next_variable += 1;
        variable
    }

    pub fn compile(mut self, rows: Vec<Row>) -> Match {
        let tree = self.compile_rows(rows);
        trace!(tree = ?tree, "compiled decision tree");
        Match {
            tree,
            reachable: self.reachable.into_iter().collect(),
            missing: self.missing,
        }
    }

    fn compile_rows(&mut self, mut rows: Vec<Row>) -> Decision {
        if rows.is_empty() {
            self.missing = true;
            return Decision::Failure;
        }

        for row in rows.iter_mut() {
            move_bindings_to_body(row);
        }

        if rows[0].columns.is_empty() {
            let row = rows.remove(0);
            self.reachable.insert(row.body.arm);
            return if row.guarded {
                Decision::Guard(row.body.arm, row.body, Box::new(self.compile_rows(rows)))
            } else {
                Decision::Success(row.body)
            };
        }

        let branch = branch_variable(&rows);
        match &branch.ty {
            ty if ty.is_primitive(Primitive::Bool) => {
                let cases = vec![
                    (Constructor::True, Vec::new(), Vec::new()),
                    (Constructor::False, Vec::new(), Vec::new()),
                ];
                let cases = self.compile_finite_cases(rows, &branch, cases);
                Decision::Switch(branch.clone(), cases, None)
            }
            ty if ty.is_primitive(Primitive::Int) || ty.is_primitive(Primitive::Text) => {
                let (cases, fallback) = self.compile_literal_cases(rows, &branch);
                Decision::Switch(branch.clone(), cases, Some(Box::new(fallback)))
            }
            ty => {
                let cases = match ty.as_union() {
                    Some((union, _)) => union
                        .variants()
                        .iter()
                        .map(|variant| {
                            let parameters = ty
                                .variant_parameters(variant.index)
                                .unwrap_or_default();
                            let arguments = parameters
                                .into_iter()
                                .map(|param| self.new_variable(param))
                                .collect();
                            (
                                Constructor::Variant(ty.clone(), variant.index),
                                arguments,
                                Vec::new(),
                            )
                        })
                        .collect(),
                    None => Vec::new(),
                };
                let cases = self.compile_finite_cases(rows, &branch, cases);
                Decision::Switch(branch.clone(), cases, None)
            }
        }
    }

    /// Specialises rows for types with a known, finite set of constructors.
    fn compile_finite_cases(
        &mut self,
        rows: Vec<Row>,
        branch: &Variable,
        mut cases: Vec<(Constructor, Vec<Variable>, Vec<Row>)>,
    ) -> Vec<Case> {
        for mut row in rows {
            match row.remove_column(branch) {
                Some(Column {
                    pattern: Pat::Constructor(constructor, arguments),
                    ..
                }) => {
                    let Some((_, variables, case_rows)) = cases.get_mut(constructor.index()) else {
                        continue;
                    };
                    let mut columns = row.columns;
                    columns.extend(
                        variables
                            .iter()
                            .cloned()
                            .zip(arguments)
                            .map(|(variable, pattern)| Column::new(variable, pattern)),
                    );
                    case_rows.push(Row {
                        columns,
                        guarded: row.guarded,
                        body: row.body,
                    });
                }
                // bindings were moved out already; a remaining column is a constructor
                Some(_) | None => {
                    for (_, _, case_rows) in cases.iter_mut() {
                        case_rows.push(row.clone());
                    }
                }
            }
        }

        cases
            .into_iter()
            .map(|(constructor, arguments, rows)| Case {
                constructor,
                arguments,
                body: self.compile_rows(rows),
            })
            .collect()
    }

    /// Groups rows by literal for `int` and `texto`. Integer ranges are split
    /// at every boundary so cases never overlap; each case keeps, in arm
    /// order, every row whose pattern covers it plus the untested rows.
    fn compile_literal_cases(
        &mut self,
        rows: Vec<Row>,
        branch: &Variable,
    ) -> (Vec<Case>, Decision) {
        let entries: Vec<(Option<Constructor>, Row)> = rows
            .into_iter()
            .map(|mut row| {
                let tested = match row.remove_column(branch) {
                    Some(Column {
                        pattern: Pat::Constructor(constructor, _),
                        ..
                    }) => Some(constructor),
                    _ => None,
                };
                (tested, row)
            })
            .collect();

        let tested: Vec<&Constructor> = entries
            .iter()
            .filter_map(|(constructor, _)| constructor.as_ref())
            .collect();

        let cases = disjoint_constructors(&tested)
            .into_iter()
            .map(|constructor| {
                let case_rows = entries
                    .iter()
                    .filter(|(tested, _)| match tested {
                        Some(tested) => covers(tested, &constructor),
                        None => true,
                    })
                    .map(|(_, row)| row.clone())
                    .collect();
                Case {
                    constructor,
                    arguments: Vec::new(),
                    body: self.compile_rows(case_rows),
                }
            })
            .collect();

        let fallback_rows = entries
            .into_iter()
            .filter(|(tested, _)| tested.is_none())
            .map(|(_, row)| row)
            .collect();
        (cases, self.compile_rows(fallback_rows))
    }
}

/// Splits the tested literals into constructors that never overlap. Each
/// result is either fully inside or fully outside every input.
fn disjoint_constructors(tested: &[&Constructor]) -> Vec<Constructor> {
    let mut result: Vec<Constructor> = Vec::new();
    let mut bounds: Vec<i128> = Vec::new();
    for constructor in tested {
        match constructor {
            Constructor::Int(lo, hi) => {
                bounds.push(i128::from(*lo));
                bounds.push(i128::from(*hi) + 1);
            }
            other => {
                if !result.contains(other) {
                    result.push((*other).clone());
                }
            }
        }
    }
    bounds.sort_unstable();
    bounds.dedup();

    for window in bounds.windows(2) {
        let (Ok(lo), Ok(hi)) = (i64::try_from(window[0]), i64::try_from(window[1] - 1)) else {
            continue;
        };
        let interval = Constructor::Int(lo, hi);
        if tested.iter().any(|constructor| covers(constructor, &interval)) {
            result.push(interval);
        }
    }
    result
}

/// Whether every value matched by `inner` is also matched by `outer`.
fn covers(outer: &Constructor, inner: &Constructor) -> bool {
    match (outer, inner) {
        (Constructor::Int(lo, hi), Constructor::Int(inner_lo, inner_hi)) => {
            lo <= inner_lo && inner_hi <= hi
        }
        (a, b) => a == b,
    }
}

/// Moves binding and wildcard columns out of the row; bindings go to the body.
fn move_bindings_to_body(row: &mut Row) {
    let columns = std::mem::take(&mut row.columns);
    for column in columns {
        match column.pattern {
            Pat::Binding(name) => row.body.bindings.push((name, column.variable)),
            Pat::Wildcard => {}
            pattern => row.columns.push(Column::new(column.variable, pattern)),
        }
    }
}

/// The variable of the first row tested by the most rows; ties go to the
/// one seen first.
fn branch_variable(rows: &[Row]) -> Variable {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for row in rows {
        for column in &row.columns {
            *counts.entry(column.variable.id).or_insert(0) += 1;
        }
    }

    let mut best = &rows[0].columns[0].variable;
    for column in &rows[0].columns[1..] {
        if counts[&column.variable.id] > counts[&best.id] {
            best = &column.variable;
        }
    }
    best.clone()
}

struct Term {
    variable: usize,
    name: String,
    arguments: Vec<usize>,
}

impl Term {
    fn render(&self, terms: &[Term], positions: &HashMap<usize, usize>) -> String {
        if self.arguments.is_empty() {
            return self.name.clone();
        }
        let arguments = self
            .arguments
            .iter()
            .map(|argument| match positions.get(argument) {
                Some(index) => terms[*index].render(terms, positions),
                None => "_".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.name, arguments)
    }
}

fn add_missing_patterns(node: &Decision, terms: &mut Vec<Term>, missing: &mut BTreeSet<String>) {
    match node {
        Decision::Success(_) => {}
        Decision::Failure => {
            let positions: HashMap<usize, usize> = terms
                .iter()
                .enumerate()
                .map(|(index, term)| (term.variable, index))
                .collect();
            let pattern = terms
                .first()
                .map(|term| term.render(terms, &positions))
                .unwrap_or_else(|| "_".to_string());
            missing.insert(pattern);
        }
        Decision::Guard(_, _, fallback) => add_missing_patterns(fallback, terms, missing),
        Decision::Switch(variable, cases, fallback) => {
            for case in cases {
                let (name, arguments) = match &case.constructor {
                    Constructor::True => ("verdadeiro".to_string(), Vec::new()),
                    Constructor::False => ("falso".to_string(), Vec::new()),
                    Constructor::Int(lo, hi) if lo == hi => (lo.to_string(), Vec::new()),
                    Constructor::Int(lo, hi) => (format!("{}..{}", lo, hi), Vec::new()),
                    Constructor::Text(value) => (format!("{:?}", value), Vec::new()),
                    Constructor::Variant(ty, index) => {
                        let name = ty
                            .as_union()
                            .and_then(|(union, _)| union.variant_at(*index))
                            .map(|variant| variant.name.clone())
                            .unwrap_or_else(|| "_".to_string());
                        let arguments = case.arguments.iter().map(|arg| arg.id).collect();
                        (name, arguments)
                    }
                };
                terms.push(Term {
                    variable: variable.id,
                    name,
                    arguments,
                });
                add_missing_patterns(&case.body, terms, missing);
                terms.pop();
            }
            if let Some(fallback) = fallback {
                add_missing_patterns(fallback, terms, missing);
            }
        }
    }
}

/// Type-checks `pattern` against `ty`, defining its bindings in the current
/// scope of `checker`, and lowers it for the decision-tree compiler.
pub fn lower_pattern<C: Checker>(
    checker: &mut C,
    pattern: &Pattern,
    ty: &Type,
    bindings: &mut Vec<Rc<VariableSymbol>>,
) -> CompileResult<Pat> {
    match &pattern.kind {
        PatternKind::Wildcard => Ok(Pat::Wildcard),
        PatternKind::Binding(name) => {
            if names_variant_of(checker, name, ty) {
                return lower_constructor(checker, pattern, name, &[], ty, bindings);
            }
            let symbol = checker.declare_variable(name, ty.clone(), pattern.span)?;
            bindings.push(symbol);
            Ok(Pat::Binding(name.clone()))
        }
        PatternKind::Literal(literal) => {
            let (expected, constructor) = match literal {
                Literal::Integer(value) => (Primitive::Int, Constructor::Int(*value, *value)),
                Literal::String(value) => (Primitive::Text, Constructor::Text(value.clone())),
                Literal::Boolean(true) => (Primitive::Bool, Constructor::True),
                Literal::Boolean(false) => (Primitive::Bool, Constructor::False),
                Literal::Float(_) | Literal::Null => {
                    return Err(checker.error(
                        pattern.span,
                        "só são permitidos literais 'int', 'texto' e 'bool' em padrões",
                    ))
                }
            };
            if !ty.is_primitive(expected) {
                return Err(mismatch(checker, pattern, expected.name(), ty));
            }
            Ok(Pat::Constructor(constructor, Vec::new()))
        }
        PatternKind::Range(start, end) => {
            if !ty.is_primitive(Primitive::Int) {
                return Err(mismatch(checker, pattern, "int", ty));
            }
            if start > end {
                return Err(checker.error(
                    pattern.span,
                    format!("intervalo vazio {}..{}", start, end),
                ));
            }
            Ok(Pat::Constructor(Constructor::Int(*start, *end), Vec::new()))
        }
        PatternKind::Constructor { name, arguments } => {
            lower_constructor(checker, pattern, name, arguments, ty, bindings)
        }
    }
}

fn mismatch<C: Checker>(checker: &C, pattern: &Pattern, found: &str, ty: &Type) -> CompileError {
    checker.error(
        pattern.span,
        format!(
            "padrão do tipo '{}' incompatível com '{}'",
            found,
            ty.describe()
        ),
    )
}

/// Whether a bare name in a pattern refers to a variant of the scrutinee's union.
fn names_variant_of<C: Checker>(checker: &C, name: &str, ty: &Type) -> bool {
    let Some((union, _)) = ty.as_union() else {
        return false;
    };
    match checker.resolve(name) {
        Some(Symbol::Type(Type::Variant(variant))) => variant
            .union()
            .is_some_and(|owner| Rc::ptr_eq(&owner, &union)),
        _ => false,
    }
}

fn lower_constructor<C: Checker>(
    checker: &mut C,
    pattern: &Pattern,
    name: &str,
    arguments: &[Pattern],
    ty: &Type,
    bindings: &mut Vec<Rc<VariableSymbol>>,
) -> CompileResult<Pat> {
    let Some((union, _)) = ty.as_union() else {
        return Err(checker.error(
            pattern.span,
            format!(
                "o padrão '{}' não corresponde ao tipo '{}'",
                name,
                ty.describe()
            ),
        ));
    };
    let Some(variant) = union.variant(name) else {
        return Err(checker.error(
            pattern.span,
            format!("'{}' não é uma variante de '{}'", name, union.name),
        ));
    };

    let parameters = ty.variant_parameters(variant.index).unwrap_or_default();
    if parameters.len() != arguments.len() {
        return Err(checker.error(
            pattern.span,
            format!(
                "a variante '{}' espera {} argumento(s), recebeu {}",
                name,
                parameters.len(),
                arguments.len()
            ),
        ));
    }

    let mut lowered = Vec::with_capacity(arguments.len());
    for (argument, parameter) in arguments.iter().zip(parameters.iter()) {
        lowered.push(lower_pattern(checker, argument, parameter, bindings)?);
    }
    Ok(Pat::Constructor(
        Constructor::Variant(ty.clone(), variant.index),
        lowered,
    ))
}

#[cfg(test)]
mod tests;
