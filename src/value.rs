use crate::accessor::AccessorSignature;
use crate::ast::Literal;
use crate::function_descriptor::FunctionDescriptor;
use crate::lattice::{Lattice, TriState};
use crate::layout::Layout;
use crate::path::PathElement;
use crate::signature::Signature;
use crate::types::Type;
use std::fmt;

/// What is known about the value of one expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Unknown,
    Class(Type),
    /// A `MethodHandle` or `MethodType`.
    Signature(Signature),
    Accessor(AccessorSignature),
    Layout(Layout),
    PathElement(PathElement),
    FunctionDescriptor(FunctionDescriptor),
    Constant(Literal),
}

impl Value {
    pub fn as_class(&self) -> Type {
        match self {
            Value::Class(t) => t.clone(),
            _ => Type::Top,
        }
    }

    pub fn as_signature(&self) -> Signature {
        match self {
            Value::Signature(s) => s.clone(),
            _ => Signature::Top,
        }
    }

    pub fn as_accessor(&self) -> AccessorSignature {
        match self {
            Value::Accessor(a) => a.clone(),
            _ => AccessorSignature::Top,
        }
    }

    pub fn as_layout(&self) -> Layout {
        match self {
            Value::Layout(l) => l.clone(),
            _ => Layout::Top,
        }
    }

    pub fn as_path_element(&self) -> PathElement {
        match self {
            Value::PathElement(p) => p.clone(),
            _ => PathElement::Top,
        }
    }

    pub fn as_function_descriptor(&self) -> FunctionDescriptor {
        match self {
            Value::FunctionDescriptor(fd) => fd.clone(),
            _ => FunctionDescriptor::Top,
        }
    }

    pub fn as_integral(&self) -> Option<i64> {
        match self {
            Value::Constant(Literal::Integral { value, .. }) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Constant(Literal::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Constant(Literal::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// The static type of a constant, as needed to bind it to a parameter.
    pub fn constant_type(&self) -> Type {
        match self {
            Value::Constant(literal) => literal.ty(),
            _ => Type::Top,
        }
    }

    pub fn is_zero_constant(&self) -> TriState {
        match self {
            Value::Constant(literal) => TriState::from_bool(literal.is_zero()),
            _ => TriState::Unknown,
        }
    }
}

impl Lattice for Value {
    fn top() -> Self {
        Value::Unknown
    }

    fn is_top(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        fn lift<T: Lattice>(a: &T, b: &T, wrap: impl Fn(T) -> Value) -> (Value, TriState) {
            let (joined, same) = a.join_identical(b);
            if joined.is_top() {
                (Value::Unknown, same)
            } else {
                (wrap(joined), same)
            }
        }

        match (self, other) {
            (Value::Class(a), Value::Class(b)) => lift(a, b, Value::Class),
            (Value::Signature(a), Value::Signature(b)) => lift(a, b, Value::Signature),
            (Value::Accessor(a), Value::Accessor(b)) => lift(a, b, Value::Accessor),
            (Value::Layout(a), Value::Layout(b)) => lift(a, b, Value::Layout),
            (Value::PathElement(a), Value::PathElement(b)) => lift(a, b, Value::PathElement),
            (Value::FunctionDescriptor(a), Value::FunctionDescriptor(b)) => {
                lift(a, b, Value::FunctionDescriptor)
            }
            (Value::Constant(a), Value::Constant(b)) if a == b => (self.clone(), TriState::Yes),
            (Value::Unknown, _) | (_, Value::Unknown) => (Value::Unknown, TriState::Unknown),
            _ => (Value::Unknown, TriState::No),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unknown => f.write_str("⊤"),
            Value::Class(t) => write!(f, "{}", t),
            Value::Signature(s) => write!(f, "{}", s),
            Value::Accessor(a) => write!(f, "{}", a),
            Value::Layout(l) => write!(f, "{}", l),
            Value::PathElement(p) => write!(f, "{}", p),
            Value::FunctionDescriptor(fd) => write!(f, "{}", fd),
            Value::Constant(literal) => write!(f, "{}", literal),
        }
    }
}
