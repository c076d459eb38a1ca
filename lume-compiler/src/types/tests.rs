use std::rc::Rc;

use super::*;
use crate::ast::{BinaryOperator, UnaryOperator};

fn option_union() -> Rc<UnionType> {
    let union = UnionType::new(OPTION_TYPE_NAME, vec!["T".to_string()], true);
    union
        .define_variant("Alguma", vec![Type::TypeVar("T".to_string())])
        .expect("fresh variant");
    union.define_variant("Nenhuma", Vec::new()).expect("fresh variant");
    union
}

fn option_of(union: &Rc<UnionType>, inner: Type) -> Type {
    Type::Union(Rc::clone(union))
        .bind_positional(&[inner])
        .expect("Opcao takes one argument")
}

#[test]
fn int_promotes_to_real_but_not_back() {
    assert!(Type::INT.promote_to(&Type::REAL));
    assert!(!Type::REAL.promote_to(&Type::INT));
    assert!(!Type::INT.promote_to(&Type::INT));
}

#[test]
fn everything_but_void_promotes_to_indef() {
    let record = Type::Record(RecordType::new("Ponto", Vec::new()));
    assert!(record.promote_to(&Type::INDEF));
    assert!(Type::Vector(Box::new(Type::INT)).promote_to(&Type::INDEF));
    assert!(Type::TEXT.promote_to(&Type::INDEF));
    assert!(!Type::VOID.promote_to(&Type::INDEF));
    assert!(!Type::INDEF.promote_to(&Type::INDEF));
}

#[test]
fn primitives_never_equal_records() {
    let record = Type::Record(RecordType::new("int", Vec::new()));
    assert_ne!(record, Type::INT);
    assert_eq!(record, record.clone());
    let other = Type::Record(RecordType::new("int", Vec::new()));
    assert_ne!(record, other);
}

#[test]
fn constructed_types_compare_base_and_arguments() {
    let option = option_union();
    assert_eq!(option_of(&option, Type::INT), option_of(&option, Type::INT));
    assert_ne!(option_of(&option, Type::INT), option_of(&option, Type::REAL));

    let lookalike = option_union();
    assert_ne!(option_of(&option, Type::INT), option_of(&lookalike, Type::INT));
    assert_eq!(option_of(&option, Type::INT).describe(), "Opcao[int]");
}

#[test]
fn casts_between_scalars_and_into_options() {
    let option = option_union();
    assert!(Type::INT.check_cast(&Type::TEXT));
    assert!(Type::TEXT.check_cast(&Type::REAL));
    assert!(Type::INDEF.check_cast(&Type::INT));
    assert!(Type::INT.check_cast(&option_of(&option, Type::INT)));
    assert!(Type::NULL.check_cast(&option_of(&option, Type::TEXT)));
    assert!(!Type::REAL.check_cast(&option_of(&option, Type::INT)));
    assert!(!Type::INDEF.check_cast(&Type::VOID));
}

#[test]
fn arithmetic_result_types() {
    assert_eq!(binop(BinaryOperator::Add, &Type::INT, &Type::INT), Some(Type::INT));
    assert_eq!(binop(BinaryOperator::Divide, &Type::INT, &Type::INT), Some(Type::REAL));
    assert_eq!(binop(BinaryOperator::Multiply, &Type::INT, &Type::REAL), Some(Type::REAL));
    assert_eq!(binop(BinaryOperator::Add, &Type::TEXT, &Type::TEXT), Some(Type::TEXT));
    assert_eq!(binop(BinaryOperator::Subtract, &Type::TEXT, &Type::TEXT), None);
    assert_eq!(binop(BinaryOperator::Add, &Type::INDEF, &Type::INT), Some(Type::INDEF));
    assert_eq!(binop(BinaryOperator::Add, &Type::BOOL, &Type::INT), None);
}

#[test]
fn equality_and_logic_result_types() {
    let option = option_union();
    let opt = option_of(&option, Type::INT);
    assert_eq!(binop(BinaryOperator::Equal, &opt, &Type::NULL), Some(Type::BOOL));
    assert_eq!(binop(BinaryOperator::NotEqual, &Type::NULL, &opt), Some(Type::BOOL));
    assert_eq!(binop(BinaryOperator::Equal, &Type::INT, &Type::REAL), Some(Type::BOOL));
    assert_eq!(binop(BinaryOperator::Equal, &Type::INT, &Type::TEXT), None);
    assert_eq!(binop(BinaryOperator::And, &Type::BOOL, &Type::BOOL), Some(Type::BOOL));
    assert_eq!(binop(BinaryOperator::Or, &Type::INT, &Type::BOOL), None);
    assert_eq!(unaryop(UnaryOperator::Not, &Type::BOOL), Some(Type::BOOL));
    assert_eq!(unaryop(UnaryOperator::Negative, &Type::TEXT), None);
}

#[test]
fn bind_validates_type_argument_names() {
    let record = Type::Record(RecordType::new("Par", vec!["A".into(), "B".into()]));

    let mut mapping = TypeBindings::new();
    mapping.insert("A".into(), Type::INT);
    assert_eq!(
        record.bind(&mapping),
        Err(BindError::MissingParameter {
            owner: "Par".into(),
            parameter: "B".into(),
        })
    );

    mapping.insert("B".into(), Type::TEXT);
    mapping.insert("C".into(), Type::BOOL);
    assert_eq!(
        record.bind(&mapping),
        Err(BindError::UnknownParameter {
            owner: "Par".into(),
            parameter: "C".into(),
        })
    );

    mapping.remove("C");
    let bound = record.bind(&mapping).expect("complete mapping");
    assert_eq!(bound.describe(), "Par[int, texto]");

    assert_eq!(
        Type::INT.bind(&mapping),
        Err(BindError::NotGeneric("int".into()))
    );
}

#[test]
fn constructed_records_substitute_field_types() {
    let record = RecordType::new("Caixa", vec!["T".into()]);
    assert!(record.define_field("valor", Type::TypeVar("T".into())));
    assert!(!record.define_field("valor", Type::INT));

    let boxed = Type::Record(record)
        .bind_positional(&[Type::TEXT])
        .expect("one argument");
    assert_eq!(boxed.field_type("valor"), Some(Type::TEXT));
    assert_eq!(boxed.field_type("outro"), None);
}

#[test]
fn unify_infers_type_variables() {
    let option = option_union();
    let mut mapping = TypeBindings::new();
    let expected = Type::Vector(Box::new(Type::TypeVar("T".into())));
    assert!(expected.unify(&Type::Vector(Box::new(Type::INT)), &mut mapping));
    assert_eq!(mapping.get("T"), Some(&Type::INT));

    // bound variables accept promotions
    assert!(Type::TypeVar("T".into()).unify(&Type::INT, &mut mapping));
    assert!(!Type::TypeVar("T".into()).unify(&Type::TEXT, &mut mapping));

    let mut mapping = TypeBindings::new();
    let generic_option = option_of(&option, Type::TypeVar("U".into()));
    assert!(generic_option.unify(&Type::REAL, &mut mapping));
    assert_eq!(mapping.get("U"), Some(&Type::REAL));
}

#[test]
fn options_accept_inner_values_and_null() {
    let option = option_union();
    let opt = option_of(&option, Type::REAL);
    assert!(opt.accepts(&Type::REAL));
    assert!(opt.accepts(&Type::INT));
    assert!(opt.accepts(&Type::NULL));
    assert!(!opt.accepts(&Type::TEXT));
    assert!(opt.is_zero_initializable());
}
