use std::rc::Rc;

use crate::scope::Scope;
use crate::symbols::{FunctionSymbol, Symbol, VariableSymbol, BUILTIN_ANNOTATION};
use crate::types::{Primitive, Type, UnionType, OPTION_TYPE_NAME};

/// Calls handled directly by the compiler rather than through a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFunction {
    /// `vetor[T](n)` builds a vector of `n` zero values.
    Vector,
    /// `tamanho(v)` length of a vector or text.
    Length,
    /// `anexa(v, x)` appends to a vector.
    Append,
    /// `remove(v, i)` removes and returns an element.
    Remove,
}

impl BuiltinFunction {
    pub const ALL: [BuiltinFunction; 4] = [
        BuiltinFunction::Vector,
        BuiltinFunction::Length,
        BuiltinFunction::Append,
        BuiltinFunction::Remove,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinFunction::Vector => "vetor",
            BuiltinFunction::Length => "tamanho",
            BuiltinFunction::Append => "anexa",
            BuiltinFunction::Remove => "remove",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }
}

/// Symbols visible to every module. Created once per compilation and shared
/// by reference with every nested analyzer.
#[derive(Debug)]
pub struct BuiltinEnvironment {
    scope: Rc<Scope>,
    option: Rc<UnionType>,
}

impl BuiltinEnvironment {
    pub fn new() -> Self {
        let scope = Scope::root();

        for primitive in Primitive::ALL {
            if primitive == Primitive::Null {
                continue;
            }
            scope.define(primitive.name(), Symbol::Type(Type::Primitive(primitive)));
        }

        let option = UnionType::new(OPTION_TYPE_NAME, vec!["T".to_string()], true);
        scope.define(OPTION_TYPE_NAME, Symbol::Type(Type::Union(Rc::clone(&option))));
        let variants = [
            ("Alguma", vec![Type::TypeVar("T".to_string())]),
            ("Nenhuma", Vec::new()),
        ];
        for (name, parameters) in variants {
            if let Some(variant) = option.define_variant(name, parameters) {
                scope.define(name, Symbol::Type(Type::Variant(variant)));
            }
        }

        define_builtin(&scope, "escreva", vec![("valor", Type::INDEF)], Type::VOID);
        define_builtin(&scope, "leia", Vec::new(), Type::TEXT);

        Self { scope, option }
    }

    pub fn scope(&self) -> &Rc<Scope> {
        &self.scope
    }

    pub fn option_union(&self) -> &Rc<UnionType> {
        &self.option
    }

    pub fn option_of(&self, inner: Type) -> Type {
        Type::Constructed {
            base: Box::new(Type::Union(Rc::clone(&self.option))),
            arguments: vec![inner],
        }
    }
}

impl Default for BuiltinEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

fn define_builtin(scope: &Scope, name: &str, parameters: Vec<(&str, Type)>, return_type: Type) {
    let function = FunctionSymbol {
        name: name.to_string(),
        out_name: name.to_string(),
        type_parameters: Vec::new(),
        parameters: parameters
            .into_iter()
            .map(|(param, ty)| (param.to_string(), VariableSymbol::new(param, param, ty)))
            .collect(),
        return_type,
        annotations: vec![BUILTIN_ANNOTATION.to_string()],
    };
    scope.define(name, Symbol::Function(Rc::new(function)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_primitives_option_and_io() {
        let builtins = BuiltinEnvironment::new();
        let scope = builtins.scope();
        assert!(matches!(scope.get("int"), Some(Symbol::Type(Type::Primitive(Primitive::Int)))));
        assert!(scope.get("nulo").is_none());
        assert!(matches!(scope.get("Nenhuma"), Some(Symbol::Type(Type::Variant(_)))));

        let print = scope.get("escreva").expect("escreva is builtin");
        assert!(print.is_builtin());
        assert_eq!(
            builtins.option_of(Type::INT).describe(),
            "Opcao[int]"
        );
        assert!(builtins.option_of(Type::INT).option_argument().is_some());
    }

    #[test]
    fn builtin_call_table_round_trips_names() {
        for builtin in BuiltinFunction::ALL {
            assert_eq!(BuiltinFunction::from_name(builtin.name()), Some(builtin));
        }
        assert_eq!(BuiltinFunction::from_name("escreva"), None);
    }
}
