use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;

use crate::symbols::MethodSymbol;

mod operators;

pub use operators::{binop, unaryop};

/// Name of the builtin optional union.
pub const OPTION_TYPE_NAME: &str = "Opcao";

pub type TypeBindings = HashMap<String, Type>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    Real,
    Bool,
    Text,
    Void,
    Indef,
    Null,
}

impl Primitive {
    pub const ALL: [Primitive; 7] = [
        Primitive::Int,
        Primitive::Real,
        Primitive::Bool,
        Primitive::Text,
        Primitive::Void,
        Primitive::Indef,
        Primitive::Null,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Int => "int",
            Primitive::Real => "real",
            Primitive::Bool => "bool",
            Primitive::Text => "texto",
            Primitive::Void => "vazio",
            Primitive::Indef => "indef",
            Primitive::Null => "nulo",
        }
    }

    pub fn is_zero_initializable(self) -> bool {
        !matches!(self, Primitive::Void | Primitive::Null)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Primitive::Int | Primitive::Real)
    }
}

#[derive(Clone)]
pub enum Type {
    Primitive(Primitive),
    Vector(Box<Type>),
    Record(Rc<RecordType>),
    Union(Rc<UnionType>),
    /// A union variant; only used as the type of its constructor symbol.
    Variant(Rc<VariantType>),
    TypeVar(String),
    /// A generic record or union applied to type arguments.
    Constructed {
        base: Box<Type>,
        arguments: Vec<Type>,
    },
}

pub struct RecordType {
    pub name: String,
    pub type_parameters: Vec<String>,
    fields: RefCell<Vec<(String, Type)>>,
    methods: RefCell<HashMap<String, Rc<MethodSymbol>>>,
}

impl RecordType {
    pub fn new(name: impl Into<String>, type_parameters: Vec<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            type_parameters,
            fields: RefCell::new(Vec::new()),
            methods: RefCell::new(HashMap::new()),
        })
    }

    /// Returns `false` when a field with the same name already exists.
    pub fn define_field(&self, name: impl Into<String>, ty: Type) -> bool {
        let name = name.into();
        let mut fields = self.fields.borrow_mut();
        if fields.iter().any(|(existing, _)| *existing == name) {
            return false;
        }
        fields.push((name, ty));
        true
    }

    pub fn field(&self, name: &str) -> Option<Type> {
        self.fields
            .borrow()
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty.clone())
    }

    pub fn fields(&self) -> Vec<(String, Type)> {
        self.fields.borrow().clone()
    }

    /// Returns `false` when the name is already taken by a field or method.
    pub fn define_method(&self, method: Rc<MethodSymbol>) -> bool {
        let name = method.function.name.clone();
        if self.field(&name).is_some() {
            return false;
        }
        let mut methods = self.methods.borrow_mut();
        if methods.contains_key(&name) {
            return false;
        }
        methods.insert(name, method);
        true
    }

    pub fn method(&self, name: &str) -> Option<Rc<MethodSymbol>> {
        self.methods.borrow().get(name).cloned()
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods: Vec<String> = self.methods.borrow().keys().cloned().collect();
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("type_parameters", &self.type_parameters)
            .field("fields", &self.fields.borrow())
            .field("methods", &methods)
            .finish()
    }
}

pub struct UnionType {
    pub name: String,
    pub type_parameters: Vec<String>,
    pub builtin: bool,
    variants: RefCell<Vec<Rc<VariantType>>>,
}

impl UnionType {
    pub fn new(name: impl Into<String>, type_parameters: Vec<String>, builtin: bool) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            type_parameters,
            builtin,
            variants: RefCell::new(Vec::new()),
        })
    }

    /// Appends a variant and returns it, or `None` when the name is taken.
    pub fn define_variant(
        self: &Rc<Self>,
        name: impl Into<String>,
        parameters: Vec<Type>,
    ) -> Option<Rc<VariantType>> {
        let name = name.into();
        let mut variants = self.variants.borrow_mut();
        if variants.iter().any(|variant| variant.name == name) {
            return None;
        }
        let variant = Rc::new(VariantType {
            name,
            index: variants.len(),
            union: Rc::downgrade(self),
            parameters,
        });
        variants.push(Rc::clone(&variant));
        Some(variant)
    }

    pub fn variants(&self) -> Vec<Rc<VariantType>> {
        self.variants.borrow().clone()
    }

    pub fn variant(&self, name: &str) -> Option<Rc<VariantType>> {
        self.variants
            .borrow()
            .iter()
            .find(|variant| variant.name == name)
            .cloned()
    }

    pub fn variant_at(&self, index: usize) -> Option<Rc<VariantType>> {
        self.variants.borrow().get(index).cloned()
    }

    pub fn is_option(&self) -> bool {
        self.builtin && self.name == OPTION_TYPE_NAME
    }
}

impl fmt::Debug for UnionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variants: Vec<String> = self
            .variants
            .borrow()
            .iter()
            .map(|variant| variant.name.clone())
            .collect();
        f.debug_struct("UnionType")
            .field("name", &self.name)
            .field("type_parameters", &self.type_parameters)
            .field("variants", &variants)
            .finish()
    }
}

pub struct VariantType {
    pub name: String,
    pub index: usize,
    union: Weak<UnionType>,
    pub parameters: Vec<Type>,
}

impl VariantType {
    pub fn union(&self) -> Option<Rc<UnionType>> {
        self.union.upgrade()
    }
}

impl fmt::Debug for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner = self.union().map(|union| union.name.clone());
        f.debug_struct("VariantType")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("union", &owner)
            .field("parameters", &self.parameters)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("o tipo '{0}' não é genérico")]
    NotGeneric(String),
    #[error("'{owner}' não tem parâmetro de tipo '{parameter}'")]
    UnknownParameter { owner: String, parameter: String },
    #[error("falta o argumento de tipo '{parameter}' de '{owner}'")]
    MissingParameter { owner: String, parameter: String },
    #[error("'{owner}' espera {expected} argumento(s) de tipo, recebeu {found}")]
    ArgumentCount {
        owner: String,
        expected: usize,
        found: usize,
    },
}

/// Checks that `mapping` names exactly the given type parameters and returns
/// the arguments in declaration order.
pub(crate) fn ordered_bindings(
    owner: &str,
    type_parameters: &[String],
    mapping: &TypeBindings,
) -> Result<Vec<Type>, BindError> {
    if type_parameters.is_empty() {
        return Err(BindError::NotGeneric(owner.to_string()));
    }
    let mut names: Vec<&String> = mapping.keys().collect();
    names.sort();
    if let Some(unknown) = names
        .into_iter()
        .find(|name| !type_parameters.contains(name))
    {
        return Err(BindError::UnknownParameter {
            owner: owner.to_string(),
            parameter: unknown.clone(),
        });
    }
    type_parameters
        .iter()
        .map(|parameter| {
            mapping
                .get(parameter)
                .cloned()
                .ok_or_else(|| BindError::MissingParameter {
                    owner: owner.to_string(),
                    parameter: parameter.clone(),
                })
        })
        .collect()
}

/// Zips positional type arguments with the declared parameter names.
pub(crate) fn positional_bindings(
    owner: &str,
    type_parameters: &[String],
    arguments: &[Type],
) -> Result<TypeBindings, BindError> {
    if type_parameters.is_empty() {
        return Err(BindError::NotGeneric(owner.to_string()));
    }
    if type_parameters.len() != arguments.len() {
        return Err(BindError::ArgumentCount {
            owner: owner.to_string(),
            expected: type_parameters.len(),
            found: arguments.len(),
        });
    }
    Ok(type_parameters
        .iter()
        .cloned()
        .zip(arguments.iter().cloned())
        .collect())
}

impl Type {
    pub const INT: Type = Type::Primitive(Primitive::Int);
    pub const REAL: Type = Type::Primitive(Primitive::Real);
    pub const BOOL: Type = Type::Primitive(Primitive::Bool);
    pub const TEXT: Type = Type::Primitive(Primitive::Text);
    pub const VOID: Type = Type::Primitive(Primitive::Void);
    pub const INDEF: Type = Type::Primitive(Primitive::Indef);
    pub const NULL: Type = Type::Primitive(Primitive::Null);

    pub fn describe(&self) -> String {
        match self {
            Type::Primitive(primitive) => primitive.name().to_string(),
            Type::Vector(element) => format!("[{}]", element.describe()),
            Type::Record(record) => record.name.clone(),
            Type::Union(union) => union.name.clone(),
            Type::Variant(variant) => variant.name.clone(),
            Type::TypeVar(name) => name.clone(),
            Type::Constructed { base, arguments } => {
                let args = arguments
                    .iter()
                    .map(|arg| arg.describe())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}[{args}]", base.describe())
            }
        }
    }

    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            Type::Primitive(primitive) => Some(*primitive),
            _ => None,
        }
    }

    pub fn is_primitive(&self, primitive: Primitive) -> bool {
        self.primitive() == Some(primitive)
    }

    pub fn is_numeric(&self) -> bool {
        self.primitive().map(Primitive::is_numeric).unwrap_or(false)
    }

    pub fn is_void(&self) -> bool {
        self.is_primitive(Primitive::Void)
    }

    pub fn is_zero_initializable(&self) -> bool {
        match self {
            Type::Primitive(primitive) => primitive.is_zero_initializable(),
            Type::Vector(_) => true,
            _ => self.option_argument().is_some(),
        }
    }

    pub fn type_parameters(&self) -> &[String] {
        match self {
            Type::Record(record) => &record.type_parameters,
            Type::Union(union) => &union.type_parameters,
            _ => &[],
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.type_parameters().is_empty()
    }

    /// The `T` of `Opcao[T]`.
    pub fn option_argument(&self) -> Option<&Type> {
        match self {
            Type::Constructed { base, arguments } => match base.as_ref() {
                Type::Union(union) if union.is_option() => arguments.first(),
                _ => None,
            },
            _ => None,
        }
    }

    /// Splits a (possibly constructed) record into its definition and bindings.
    pub fn as_record(&self) -> Option<(Rc<RecordType>, TypeBindings)> {
        match self {
            Type::Record(record) => Some((Rc::clone(record), TypeBindings::new())),
            Type::Constructed { base, arguments } => match base.as_ref() {
                Type::Record(record) => Some((
                    Rc::clone(record),
                    record
                        .type_parameters
                        .iter()
                        .cloned()
                        .zip(arguments.iter().cloned())
                        .collect(),
                )),
                _ => None,
            },
            _ => None,
        }
    }

    /// Splits a (possibly constructed) union into its definition and bindings.
    pub fn as_union(&self) -> Option<(Rc<UnionType>, TypeBindings)> {
        match self {
            Type::Union(union) => Some((Rc::clone(union), TypeBindings::new())),
            Type::Constructed { base, arguments } => match base.as_ref() {
                Type::Union(union) => Some((
                    Rc::clone(union),
                    union
                        .type_parameters
                        .iter()
                        .cloned()
                        .zip(arguments.iter().cloned())
                        .collect(),
                )),
                _ => None,
            },
            _ => None,
        }
    }

    /// Field type with the receiver's type arguments applied.
    pub fn field_type(&self, name: &str) -> Option<Type> {
        let (record, bindings) = self.as_record()?;
        record.field(name).map(|ty| ty.substitute(&bindings))
    }

    /// Parameter types of a union variant with the union's type arguments applied.
    pub fn variant_parameters(&self, index: usize) -> Option<Vec<Type>> {
        let (union, bindings) = self.as_union()?;
        let variant = union.variant_at(index)?;
        Some(
            variant
                .parameters
                .iter()
                .map(|param| param.substitute(&bindings))
                .collect(),
        )
    }

    /// Applies a generic record or union to named type arguments.
    pub fn bind(&self, mapping: &TypeBindings) -> Result<Type, BindError> {
        let (owner, parameters) = match self {
            Type::Record(record) => (&record.name, &record.type_parameters),
            Type::Union(union) => (&union.name, &union.type_parameters),
            other => return Err(BindError::NotGeneric(other.describe())),
        };
        let arguments = ordered_bindings(owner, parameters, mapping)?;
        Ok(Type::Constructed {
            base: Box::new(self.clone()),
            arguments,
        })
    }

    /// Applies a generic record or union to positional type arguments.
    pub fn bind_positional(&self, arguments: &[Type]) -> Result<Type, BindError> {
        let mapping = positional_bindings(&self.describe(), self.type_parameters(), arguments)?;
        self.bind(&mapping)
    }

    pub fn substitute(&self, mapping: &TypeBindings) -> Type {
        if mapping.is_empty() {
            return self.clone();
        }
        match self {
            Type::TypeVar(name) => mapping
                .get(name)
                .cloned()
                .unwrap_or_else(|| Type::TypeVar(name.clone())),
            Type::Vector(element) => Type::Vector(Box::new(element.substitute(mapping))),
            Type::Constructed { base, arguments } => Type::Constructed {
                base: base.clone(),
                arguments: arguments
                    .iter()
                    .map(|arg| arg.substitute(mapping))
                    .collect(),
            },
            other => other.clone(),
        }
    }

    pub fn contains_type_vars(&self) -> bool {
        match self {
            Type::TypeVar(_) => true,
            Type::Vector(element) => element.contains_type_vars(),
            Type::Constructed { arguments, .. } => {
                arguments.iter().any(Type::contains_type_vars)
            }
            _ => false,
        }
    }

    /// Matches `actual` against `self`, recording type variables in `mapping`.
    /// Unbound variables on `self` are filled; bound ones must accept `actual`.
    pub fn unify(&self, actual: &Type, mapping: &mut TypeBindings) -> bool {
        match self {
            Type::TypeVar(name) => {
                if let Some(existing) = mapping.get(name) {
                    existing.accepts(actual)
                } else if actual.is_primitive(Primitive::Null) || actual.is_void() {
                    false
                } else {
                    mapping.insert(name.clone(), actual.clone());
                    true
                }
            }
            Type::Vector(expected) => match actual {
                Type::Vector(element) => expected.unify(element, mapping),
                _ => false,
            },
            Type::Constructed { base, arguments } => match actual {
                Type::Constructed {
                    base: actual_base,
                    arguments: actual_arguments,
                } if base == actual_base => arguments
                    .iter()
                    .zip(actual_arguments.iter())
                    .all(|(expected, actual)| expected.unify(actual, mapping)),
                // `T` and `nulo` where `Opcao[T]` is expected
                _ => match self.option_argument() {
                    Some(_) if actual.is_primitive(Primitive::Null) => true,
                    Some(inner) => inner.unify(actual, mapping),
                    None => false,
                },
            },
            expected => expected.accepts(actual),
        }
    }

    /// Whether a value of type `actual` may be stored where `self` is expected.
    pub fn accepts(&self, actual: &Type) -> bool {
        if self == actual || actual.promote_to(self) {
            return true;
        }
        match self.option_argument() {
            Some(inner) => {
                actual.is_primitive(Primitive::Null)
                    || inner == actual
                    || actual.promote_to(inner)
            }
            None => false,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Primitive(a), Type::Primitive(b)) => a == b,
            (Type::Vector(a), Type::Vector(b)) => a == b,
            (Type::Record(a), Type::Record(b)) => Rc::ptr_eq(a, b),
            (Type::Union(a), Type::Union(b)) => Rc::ptr_eq(a, b),
            (Type::Variant(a), Type::Variant(b)) => Rc::ptr_eq(a, b),
            (Type::TypeVar(a), Type::TypeVar(b)) => a == b,
            (
                Type::Constructed {
                    base: a_base,
                    arguments: a_args,
                },
                Type::Constructed {
                    base: b_base,
                    arguments: b_args,
                },
            ) => a_base == b_base && a_args == b_args,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.describe())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests;
