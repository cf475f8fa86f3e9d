use crate::lattice::{Lattice, TriState};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

pub const PRIMITIVES: [Primitive; 8] = [
    Primitive::Boolean,
    Primitive::Byte,
    Primitive::Char,
    Primitive::Short,
    Primitive::Int,
    Primitive::Long,
    Primitive::Float,
    Primitive::Double,
];

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    pub fn from_name(name: &str) -> Option<Primitive> {
        PRIMITIVES.iter().copied().find(|p| p.name() == name)
    }

    pub fn wrapper(self) -> &'static str {
        match self {
            Primitive::Boolean => "Boolean",
            Primitive::Byte => "Byte",
            Primitive::Char => "Character",
            Primitive::Short => "Short",
            Primitive::Int => "Integer",
            Primitive::Long => "Long",
            Primitive::Float => "Float",
            Primitive::Double => "Double",
        }
    }

    pub fn from_wrapper(name: &str) -> Option<Primitive> {
        PRIMITIVES.iter().copied().find(|p| p.wrapper() == name)
    }

    pub fn byte_size(self) -> u64 {
        match self {
            Primitive::Boolean | Primitive::Byte => 1,
            Primitive::Char | Primitive::Short => 2,
            Primitive::Int | Primitive::Float => 4,
            Primitive::Long | Primitive::Double => 8,
        }
    }

    /// Strict widening: `byte < short < int < long`, `char < int`, `float < double`.
    pub fn widens_to(self, to: Primitive) -> bool {
        use Primitive::*;

        matches!(
            (self, to),
            (Byte, Short | Int | Long)
                | (Short, Int | Long)
                | (Char, Int | Long)
                | (Int, Long)
                | (Float, Double)
        )
    }

    pub fn boxed(self) -> Type {
        Type::class(self.wrapper())
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reference {
    Class(Box<str>),
    Array(Box<Type>),
    /// The type of the `null` literal.
    Null,
}

/// A descriptor: the static type of one parameter, return value or accessed value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Top,
    Void,
    Primitive(Primitive),
    Reference(Reference),
}

impl Type {
    pub fn class(name: &str) -> Type {
        Type::Reference(Reference::Class(name.into()))
    }

    pub fn array_of(component: Type) -> Type {
        Type::Reference(Reference::Array(Box::new(component)))
    }

    pub fn object() -> Type {
        Type::class("Object")
    }

    pub fn memory_segment() -> Type {
        Type::class("MemorySegment")
    }

    pub fn segment_allocator() -> Type {
        Type::class("SegmentAllocator")
    }

    /// Parses a source-level type name such as `int`, `String` or `long[][]`.
    /// `?` and `⊤` stand for an unresolved type.
    pub fn parse(name: &str) -> Type {
        let name = name.trim();

        if let Some(component) = name.strip_suffix("[]") {
            return match Type::parse(component) {
                Type::Top => Type::Top,
                Type::Void => Type::Top,
                component => Type::array_of(component),
            };
        }

        match name {
            "?" | "⊤" | "" => Type::Top,
            "void" => Type::Void,
            "null" => Type::Reference(Reference::Null),
            _ => match Primitive::from_name(name) {
                Some(p) => Type::Primitive(p),
                None => Type::class(name),
            },
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Type::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_array(&self) -> TriState {
        match self {
            Type::Top => TriState::Unknown,
            Type::Reference(Reference::Array(_)) => TriState::Yes,
            _ => TriState::No,
        }
    }

    pub fn component_type(&self) -> Option<&Type> {
        match self {
            Type::Reference(Reference::Array(component)) => Some(component),
            _ => None,
        }
    }

    pub fn unboxed(&self) -> Option<Primitive> {
        match self {
            Type::Reference(Reference::Class(name)) => Primitive::from_wrapper(name),
            _ => None,
        }
    }
}

impl Lattice for Type {
    fn top() -> Self {
        Type::Top
    }

    fn is_top(&self) -> bool {
        matches!(self, Type::Top)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Top => f.write_str("⊤"),
            Type::Void => f.write_str("void"),
            Type::Primitive(p) => write!(f, "{}", p),
            Type::Reference(Reference::Class(name)) => f.write_str(name),
            Type::Reference(Reference::Array(component)) => write!(f, "{}[]", component),
            Type::Reference(Reference::Null) => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_names() {
        for name in ["int", "void", "String", "int[]", "String[][][]", "⊤"] {
            assert_eq!(Type::parse(name).to_string(), name);
        }

        assert_eq!(Type::parse("?"), Type::Top);
        assert_eq!(Type::parse("void[]"), Type::Top);
    }

    #[test]
    fn widening_order() {
        use Primitive::*;

        assert!(Byte.widens_to(Long));
        assert!(Char.widens_to(Int));
        assert!(Float.widens_to(Double));

        assert!(!Int.widens_to(Int));
        assert!(!Long.widens_to(Int));
        assert!(!Byte.widens_to(Char));
        assert!(!Int.widens_to(Float));
        assert!(!Boolean.widens_to(Int));
    }

    #[test]
    fn wrappers() {
        assert_eq!(Primitive::Int.boxed(), Type::class("Integer"));
        assert_eq!(Type::class("Character").unboxed(), Some(Primitive::Char));
        assert_eq!(Type::class("Number").unboxed(), None);
    }
}
