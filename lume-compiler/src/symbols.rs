use std::path::PathBuf;
use std::rc::{Rc, Weak};

use crate::scope::Scope;
use crate::types::{self, BindError, RecordType, Type, TypeBindings};

/// Annotation marking declarations provided by the compiler itself.
pub const BUILTIN_ANNOTATION: &str = "embutido";

#[derive(Debug)]
pub struct VariableSymbol {
    pub name: String,
    /// Identifier used by code generation; unique within a module.
    pub out_name: String,
    pub ty: Type,
}

impl VariableSymbol {
    pub fn new(name: impl Into<String>, out_name: impl Into<String>, ty: Type) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            out_name: out_name.into(),
            ty,
        })
    }
}

#[derive(Debug)]
pub struct FunctionSymbol {
    pub name: String,
    pub out_name: String,
    pub type_parameters: Vec<String>,
    /// Parameters in declaration order.
    pub parameters: Vec<(String, Rc<VariableSymbol>)>,
    pub return_type: Type,
    pub annotations: Vec<String>,
}

impl FunctionSymbol {
    pub fn parameter_types(&self) -> Vec<Type> {
        self.parameters
            .iter()
            .map(|(_, symbol)| symbol.ty.clone())
            .collect()
    }

    pub fn parameter(&self, name: &str) -> Option<&Rc<VariableSymbol>> {
        self.parameters
            .iter()
            .find(|(parameter, _)| parameter == name)
            .map(|(_, symbol)| symbol)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|annotation| annotation == name)
    }

    pub fn is_generic(&self) -> bool {
        !self.type_parameters.is_empty()
    }

    /// Specialises a generic function; the result has no type parameters.
    pub fn bind(&self, mapping: &TypeBindings) -> Result<FunctionSymbol, BindError> {
        types::ordered_bindings(&self.name, &self.type_parameters, mapping)?;
        Ok(self.specialise(mapping))
    }

    /// Substitutes type variables without validating the mapping. Type
    /// parameters left unbound stay generic.
    pub(crate) fn specialise(&self, mapping: &TypeBindings) -> FunctionSymbol {
        FunctionSymbol {
            name: self.name.clone(),
            out_name: self.out_name.clone(),
            type_parameters: self
                .type_parameters
                .iter()
                .filter(|param| !mapping.contains_key(*param))
                .cloned()
                .collect(),
            parameters: self
                .parameters
                .iter()
                .map(|(name, symbol)| {
                    (
                        name.clone(),
                        VariableSymbol::new(
                            symbol.name.clone(),
                            symbol.out_name.clone(),
                            symbol.ty.substitute(mapping),
                        ),
                    )
                })
                .collect(),
            return_type: self.return_type.substitute(mapping),
            annotations: self.annotations.clone(),
        }
    }
}

#[derive(Debug)]
pub struct MethodSymbol {
    pub function: Rc<FunctionSymbol>,
    receiver: Weak<RecordType>,
}

impl MethodSymbol {
    pub fn new(function: Rc<FunctionSymbol>, receiver: &Rc<RecordType>) -> Rc<Self> {
        Rc::new(Self {
            function,
            receiver: Rc::downgrade(receiver),
        })
    }

    pub fn receiver(&self) -> Option<Type> {
        self.receiver.upgrade().map(Type::Record)
    }
}

/// A module imported under an alias.
#[derive(Debug)]
pub struct ModuleSymbol {
    pub name: String,
    pub path: PathBuf,
    pub scope: Rc<Scope>,
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Variable(Rc<VariableSymbol>),
    Function(Rc<FunctionSymbol>),
    Method(Rc<MethodSymbol>),
    Type(Type),
    Module(Rc<ModuleSymbol>),
}

impl Symbol {
    pub fn name(&self) -> String {
        match self {
            Symbol::Variable(variable) => variable.name.clone(),
            Symbol::Function(function) => function.name.clone(),
            Symbol::Method(method) => method.function.name.clone(),
            Symbol::Type(ty) => ty.describe(),
            Symbol::Module(module) => module.name.clone(),
        }
    }

    pub fn out_name(&self) -> String {
        match self {
            Symbol::Variable(variable) => variable.out_name.clone(),
            Symbol::Function(function) => function.out_name.clone(),
            Symbol::Method(method) => method.function.out_name.clone(),
            other => other.name(),
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Symbol::Type(_))
    }

    pub fn is_callable(&self) -> bool {
        match self {
            Symbol::Function(_) | Symbol::Method(_) => true,
            Symbol::Type(Type::Union(union)) => union.is_option(),
            Symbol::Type(ty) => matches!(
                ty,
                Type::Primitive(_) | Type::Record(_) | Type::Variant(_)
            ) && !ty.is_void(),
            Symbol::Variable(_) | Symbol::Module(_) => false,
        }
    }

    /// Whether the symbol may appear as a value: variables and bare
    /// constructors without parameters.
    pub fn can_evaluate(&self) -> bool {
        match self {
            Symbol::Variable(_) => true,
            Symbol::Type(Type::Variant(variant)) => variant.parameters.is_empty(),
            _ => false,
        }
    }

    pub fn is_builtin(&self) -> bool {
        match self {
            Symbol::Function(function) => function.has_annotation(BUILTIN_ANNOTATION),
            Symbol::Method(method) => method.function.has_annotation(BUILTIN_ANNOTATION),
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Symbol::Variable(_) => "variável",
            Symbol::Function(_) => "função",
            Symbol::Method(_) => "método",
            Symbol::Type(_) => "tipo",
            Symbol::Module(_) => "módulo",
        }
    }

    /// Two symbols are the same when they refer to the same declaration.
    pub fn same_as(&self, other: &Symbol) -> bool {
        match (self, other) {
            (Symbol::Variable(a), Symbol::Variable(b)) => Rc::ptr_eq(a, b),
            (Symbol::Function(a), Symbol::Function(b)) => Rc::ptr_eq(a, b),
            (Symbol::Method(a), Symbol::Method(b)) => Rc::ptr_eq(a, b),
            (Symbol::Type(a), Symbol::Type(b)) => a == b,
            (Symbol::Module(a), Symbol::Module(b)) => a.path == b.path,
            _ => false,
        }
    }
}
