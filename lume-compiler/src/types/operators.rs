use crate::ast::{BinaryOperator, UnaryOperator};

use super::{Primitive, Type};

impl Type {
    /// Implicit widening. Not reflexive: a type never promotes to itself.
    pub fn promote_to(&self, target: &Type) -> bool {
        match (self, target) {
            (Type::Primitive(Primitive::Int), Type::Primitive(Primitive::Real)) => true,
            (_, Type::Primitive(Primitive::Indef)) => match self {
                Type::Primitive(primitive) => {
                    !matches!(primitive, Primitive::Void | Primitive::Indef)
                }
                Type::Vector(_) | Type::Record(_) | Type::Union(_) | Type::Constructed { .. } => {
                    true
                }
                Type::Variant(_) | Type::TypeVar(_) => false,
            },
            _ => false,
        }
    }

    /// Explicit conversion `alvo(valor)`, including `Opcao[T](valor)` from
    /// `T` or `nulo`.
    pub fn check_cast(&self, target: &Type) -> bool {
        const CONVERTIBLE: [Primitive; 4] =
            [Primitive::Int, Primitive::Real, Primitive::Bool, Primitive::Text];

        if let (Some(from), Some(to)) = (self.primitive(), target.primitive()) {
            if CONVERTIBLE.contains(&from) && CONVERTIBLE.contains(&to) {
                return true;
            }
        }
        if self.is_primitive(Primitive::Indef) && !target.is_void() {
            return true;
        }
        if let Some(inner) = target.option_argument() {
            if self.is_primitive(Primitive::Null) || self == inner {
                return true;
            }
        }
        self == target && !self.is_void()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Category {
    Int,
    Real,
    Text,
    Bool,
    Indef,
    Null,
    Other,
}

fn category(ty: &Type) -> Category {
    match ty.primitive() {
        Some(Primitive::Int) => Category::Int,
        Some(Primitive::Real) => Category::Real,
        Some(Primitive::Text) => Category::Text,
        Some(Primitive::Bool) => Category::Bool,
        Some(Primitive::Indef) => Category::Indef,
        Some(Primitive::Null) => Category::Null,
        _ => Category::Other,
    }
}

fn is_numeric(category: Category) -> bool {
    matches!(category, Category::Int | Category::Real)
}

/// Result type of `lhs op rhs`, or `None` when the operator does not apply.
pub fn binop(operator: BinaryOperator, lhs: &Type, rhs: &Type) -> Option<Type> {
    use BinaryOperator::*;

    let (left, right) = (category(lhs), category(rhs));
    let indef = left == Category::Indef || right == Category::Indef;

    match operator {
        Add | Subtract | Multiply | Modulo => {
            if left == Category::Int && right == Category::Int {
                Some(Type::INT)
            } else if is_numeric(left) && is_numeric(right) {
                Some(Type::REAL)
            } else if operator == Add && left == Category::Text && right == Category::Text {
                Some(Type::TEXT)
            } else if indef && operands_allow_indef(left, right, operator == Add) {
                Some(Type::INDEF)
            } else {
                None
            }
        }
        Divide => {
            if is_numeric(left) && is_numeric(right) {
                Some(Type::REAL)
            } else if indef && operands_allow_indef(left, right, false) {
                Some(Type::INDEF)
            } else {
                None
            }
        }
        Less | LessEqual | Greater | GreaterEqual => {
            let comparable = (is_numeric(left) && is_numeric(right))
                || (left == Category::Text && right == Category::Text)
                || (indef && operands_allow_indef(left, right, true));
            comparable.then_some(Type::BOOL)
        }
        Equal | NotEqual => equality_applies(lhs, rhs).then_some(Type::BOOL),
        And | Or => (left == Category::Bool && right == Category::Bool).then_some(Type::BOOL),
    }
}

fn operands_allow_indef(left: Category, right: Category, allow_text: bool) -> bool {
    let allowed = |category: Category| {
        category == Category::Indef
            || is_numeric(category)
            || (allow_text && category == Category::Text)
    };
    allowed(left) && allowed(right)
}

fn equality_applies(lhs: &Type, rhs: &Type) -> bool {
    if lhs.is_void() || rhs.is_void() {
        return false;
    }
    if lhs == rhs {
        return true;
    }
    let (left, right) = (category(lhs), category(rhs));
    if is_numeric(left) && is_numeric(right) {
        return true;
    }
    if left == Category::Indef || right == Category::Indef {
        return true;
    }
    (lhs.option_argument().is_some() && right == Category::Null)
        || (rhs.option_argument().is_some() && left == Category::Null)
}

pub fn unaryop(operator: UnaryOperator, operand: &Type) -> Option<Type> {
    match (operator, category(operand)) {
        (UnaryOperator::Negative, Category::Int) => Some(Type::INT),
        (UnaryOperator::Negative, Category::Real) => Some(Type::REAL),
        (UnaryOperator::Negative, Category::Indef) => Some(Type::INDEF),
        (UnaryOperator::Not, Category::Bool) => Some(Type::BOOL),
        _ => None,
    }
}
