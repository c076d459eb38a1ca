use lume_compiler::{Primitive, RecordType, Type};
use proptest::prelude::*;

fn any_type() -> impl Strategy<Value = Type> {
    let leaf = prop_oneof![
        prop::sample::select(Primitive::ALL.to_vec()).prop_map(Type::Primitive),
        Just(Type::Record(RecordType::new("Ponto", Vec::new()))),
    ];
    leaf.prop_recursive(2, 8, 1, |inner| inner.prop_map(|ty| Type::Vector(Box::new(ty))))
}

proptest! {
    #[test]
    fn promotion_is_irreflexive(ty in any_type()) {
        prop_assert!(!ty.promote_to(&ty));
    }

    #[test]
    fn promotion_is_asymmetric(a in any_type(), b in any_type()) {
        prop_assert!(!(a.promote_to(&b) && b.promote_to(&a)));
    }

    #[test]
    fn promotion_is_transitive(a in any_type(), b in any_type(), c in any_type()) {
        if a.promote_to(&b) && b.promote_to(&c) {
            prop_assert!(a.promote_to(&c));
        }
    }

    #[test]
    fn accepts_is_reflexive_for_non_void(ty in any_type()) {
        prop_assume!(!ty.is_void());
        prop_assert!(ty.accepts(&ty));
    }
}
