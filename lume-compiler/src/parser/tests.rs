use std::path::PathBuf;

use super::parse_source;
use crate::ast::*;
use crate::source::{SourceFile, SourceId};

fn parse(contents: &str) -> Module {
    let source = SourceFile::new(SourceId(0), PathBuf::from("teste.lume"), contents.to_string());
    parse_source(&source).expect("source should parse")
}

fn parse_err(contents: &str) -> String {
    let source = SourceFile::new(SourceId(0), PathBuf::from("teste.lume"), contents.to_string());
    parse_source(&source).expect_err("source should fail").message
}

#[test]
fn parses_use_forms() {
    let module = parse(
        "usa \"util\"\nusa \"geo/ponto\" como p\nusa (a, b) de \"lib\"\nusa * de \"mat\"\n",
    );
    let modes: Vec<_> = module
        .statements
        .iter()
        .map(|stmt| match stmt {
            Statement::Use(use_stmt) => use_stmt.mode.clone(),
            other => panic!("expected use, got {:?}", other),
        })
        .collect();

    assert!(matches!(modes[0], ImportMode::Alias(None)));
    assert!(matches!(&modes[1], ImportMode::Alias(Some(id)) if id.name == "p"));
    assert!(matches!(&modes[2], ImportMode::Items(items) if items.len() == 2));
    assert!(matches!(modes[3], ImportMode::Merge));
}

#[test]
fn respects_operator_precedence() {
    let module = parse("var x = 1 + 2 * 3\n");
    let Statement::Var(var) = &module.statements[0] else {
        panic!("expected var");
    };
    let init = var.initializer.as_ref().expect("initializer");
    let ExpressionKind::Binary(add) = &init.kind else {
        panic!("expected binary");
    };
    assert_eq!(add.operator, BinaryOperator::Add);
    assert!(matches!(
        &add.right.kind,
        ExpressionKind::Binary(mul) if mul.operator == BinaryOperator::Multiply
    ));
}

#[test]
fn distinguishes_generic_call_from_index() {
    let module = parse("identidade[int](1)\nv[i]\n");
    let Statement::Expression(first) = &module.statements[0] else {
        panic!("expected expression");
    };
    assert!(matches!(
        &first.expression.kind,
        ExpressionKind::Call(call) if call.type_arguments.len() == 1
    ));
    let Statement::Expression(second) = &module.statements[1] else {
        panic!("expected expression");
    };
    assert!(matches!(second.expression.kind, ExpressionKind::Index(_)));
}

#[test]
fn parses_named_arguments() {
    let module = parse("Ponto(x: 1, y: 2)\n");
    let Statement::Expression(stmt) = &module.statements[0] else {
        panic!("expected expression");
    };
    let ExpressionKind::Call(call) = &stmt.expression.kind else {
        panic!("expected call");
    };
    let names: Vec<_> = call
        .arguments
        .iter()
        .map(|arg| arg.name.clone().unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["x", "y"]);
}

#[test]
fn parses_match_with_patterns_and_guard() {
    let module = parse(
        "iguala f\ncaso Circulo(r) se r > 1\n  escreva(r)\ncaso 1..5\n  escreva(1)\ncaso _\nfim\n",
    );
    let Statement::Match(stmt) = &module.statements[0] else {
        panic!("expected match");
    };
    assert_eq!(stmt.arms.len(), 3);
    assert!(stmt.arms[0].guard.is_some());
    assert!(matches!(
        &stmt.arms[0].pattern.kind,
        PatternKind::Constructor { name, arguments } if name == "Circulo" && arguments.len() == 1
    ));
    assert!(matches!(stmt.arms[1].pattern.kind, PatternKind::Range(1, 5)));
    assert!(matches!(stmt.arms[2].pattern.kind, PatternKind::Wildcard));
}

#[test]
fn parses_records_unions_and_builtins() {
    let module = parse(
        "registo Ponto\n  x: int\n  y: int\n  func norma(): int\n    retorna alvo.x\n  fim\nfim\n\
         uniao Forma\n  Circulo(real)\n  Vazio\nfim\n\
         @embutido\nfunc relogio(): int\n",
    );
    let Statement::Record(record) = &module.statements[0] else {
        panic!("expected record");
    };
    assert_eq!(record.fields.len(), 2);
    assert_eq!(record.methods.len(), 1);
    let Statement::Union(union) = &module.statements[1] else {
        panic!("expected union");
    };
    assert_eq!(union.variants.len(), 2);
    assert!(union.variants[1].parameters.is_empty());
    let Statement::Function(function) = &module.statements[2] else {
        panic!("expected function");
    };
    assert!(function.body.is_none());
    assert_eq!(function.annotations[0].name, "embutido");
}

#[test]
fn parses_conditional_chain() {
    let module = parse("se a\n  x = 1\nsenaose b\n  x = 2\nsenão\n  x = 3\nfim\n");
    let Statement::Conditional(stmt) = &module.statements[0] else {
        panic!("expected conditional");
    };
    assert_eq!(stmt.clauses.len(), 2);
    assert!(stmt.alternative.is_some());
}

#[test]
fn reports_missing_fim() {
    let message = parse_err("enquanto verdadeiro\n  escreva(1)\n");
    assert!(message.contains("'fim'"), "{}", message);
}
