use std::rc::Rc;

use super::*;
use crate::types::UnionType;

fn shape() -> Type {
    let union = UnionType::new("Forma", Vec::new(), false);
    union.define_variant("Circulo", vec![Type::REAL]).expect("fresh variant");
    union.define_variant("Quadrado", vec![Type::REAL]).expect("fresh variant");
    union.define_variant("Ponto", Vec::new()).expect("fresh variant");
    Type::Union(union)
}

fn variant(ty: &Type, index: usize, arguments: Vec<Pat>) -> Pat {
    Pat::Constructor(Constructor::Variant(ty.clone(), index), arguments)
}

fn int(value: i64) -> Pat {
    Pat::Constructor(Constructor::Int(value, value), Vec::new())
}

fn compile(ty: Type, arms: Vec<(Pat, bool)>) -> Match {
    let mut compiler = MatchCompiler::new();
    let subject = compiler.new_variable(ty);
    let rows = arms
        .into_iter()
        .enumerate()
        .map(|(index, (pattern, guarded))| {
            Row::new(vec![Column::new(subject.clone(), pattern)], guarded, index)
        })
        .collect();
    compiler.compile(rows)
}

#[test]
fn union_match_covering_every_variant_is_exhaustive() {
    let ty = shape();
    let result = compile(
        ty.clone(),
        vec![
            (variant(&ty, 0, vec![Pat::Binding("r".into())]), false),
            (variant(&ty, 1, vec![Pat::Wildcard]), false),
            (variant(&ty, 2, Vec::new()), false),
        ],
    );
    assert!(!result.has_missing());
    assert_eq!(result.reachable, vec![0, 1, 2]);
}

#[test]
fn reports_missing_variant_with_placeholder_arguments() {
    let ty = shape();
    let result = compile(
        ty.clone(),
        vec![
            (variant(&ty, 0, vec![Pat::Binding("r".into())]), false),
            (variant(&ty, 2, Vec::new()), false),
        ],
    );
    assert!(result.has_missing());
    assert_eq!(result.missing_patterns(), vec!["Quadrado(_)".to_string()]);
}

#[test]
fn binding_moves_into_body() {
    let ty = shape();
    let result = compile(ty, vec![(Pat::Binding("f".into()), false)]);
    match result.tree {
        Decision::Success(body) => {
            assert_eq!(body.arm, 0);
            assert_eq!(body.bindings.len(), 1);
            assert_eq!(body.bindings[0].0, "f");
        }
        other => panic!("expected a success leaf, got {:?}", other),
    }
}

#[test]
fn guarded_arm_falls_through_to_next_row() {
    let result = compile(
        Type::BOOL,
        vec![
            (Pat::Constructor(Constructor::True, Vec::new()), true),
            (Pat::Constructor(Constructor::False, Vec::new()), false),
        ],
    );
    assert!(result.has_missing());
    assert_eq!(result.missing_patterns(), vec!["verdadeiro".to_string()]);
}

#[test]
fn bool_match_with_both_literals_is_exhaustive() {
    let result = compile(
        Type::BOOL,
        vec![
            (Pat::Constructor(Constructor::True, Vec::new()), false),
            (Pat::Constructor(Constructor::False, Vec::new()), false),
        ],
    );
    assert!(!result.has_missing());
}

#[test]
fn integers_need_a_catch_all() {
    let result = compile(Type::INT, vec![(int(1), false), (int(2), false)]);
    assert!(result.has_missing());
    assert_eq!(result.missing_patterns(), vec!["_".to_string()]);

    let result = compile(
        Type::INT,
        vec![(int(1), false), (int(2), false), (Pat::Wildcard, false)],
    );
    assert!(!result.has_missing());
    assert_eq!(result.reachable, vec![0, 1, 2]);
}

#[test]
fn arm_after_catch_all_is_unreachable() {
    let result = compile(
        Type::INT,
        vec![(Pat::Wildcard, false), (int(3), false)],
    );
    assert!(!result.has_missing());
    assert_eq!(result.reachable, vec![0]);
}

#[test]
fn literal_inside_earlier_range_is_unreachable() {
    let result = compile(
        Type::INT,
        vec![
            (Pat::Constructor(Constructor::Int(1, 10), Vec::new()), false),
            (int(5), false),
            (Pat::Wildcard, false),
        ],
    );
    assert_eq!(result.reachable, vec![0, 2]);
}

fn range(lo: i64, hi: i64) -> Pat {
    Pat::Constructor(Constructor::Int(lo, hi), Vec::new())
}

#[test]
fn overlapping_ranges_split_into_disjoint_cases() {
    let result = compile(
        Type::INT,
        vec![
            (range(1, 5), true),
            (range(3, 8), false),
            (Pat::Wildcard, false),
        ],
    );
    assert!(!result.has_missing());
    assert_eq!(result.reachable, vec![0, 1, 2]);

    let Decision::Switch(_, cases, Some(fallback)) = &result.tree else {
        panic!("expected an integer switch, got {:?}", result.tree);
    };
    let constructors: Vec<&Constructor> = cases.iter().map(|case| &case.constructor).collect();
    assert_eq!(
        constructors,
        vec![
            &Constructor::Int(1, 2),
            &Constructor::Int(3, 5),
            &Constructor::Int(6, 8),
        ]
    );

    // a failed guard on 3..5 still reaches the second arm
    let Decision::Guard(0, _, after_guard) = &cases[1].body else {
        panic!("expected the guard of arm 0, got {:?}", cases[1].body);
    };
    assert!(matches!(after_guard.as_ref(), Decision::Success(body) if body.arm == 1));

    let Decision::Guard(0, _, after_guard) = &cases[0].body else {
        panic!("expected the guard of arm 0, got {:?}", cases[0].body);
    };
    assert!(matches!(after_guard.as_ref(), Decision::Success(body) if body.arm == 2));

    assert!(matches!(&cases[2].body, Decision::Success(body) if body.arm == 1));
    assert!(matches!(fallback.as_ref(), Decision::Success(body) if body.arm == 2));
}

#[test]
fn nested_option_patterns_report_inner_missing_value() {
    let option = UnionType::new(crate::types::OPTION_TYPE_NAME, vec!["T".into()], true);
    option
        .define_variant("Alguma", vec![Type::TypeVar("T".into())])
        .expect("fresh variant");
    option.define_variant("Nenhuma", Vec::new()).expect("fresh variant");
    let ty = Type::Union(Rc::clone(&option))
        .bind_positional(&[Type::BOOL])
        .expect("one argument");

    let result = compile(
        ty.clone(),
        vec![
            (
                variant(&ty, 0, vec![Pat::Constructor(Constructor::True, Vec::new())]),
                false,
            ),
            (variant(&ty, 1, Vec::new()), false),
        ],
    );
    assert_eq!(result.missing_patterns(), vec!["Alguma(falso)".to_string()]);
}
