use crate::lattice::TriState;
use crate::types::{Reference, Type};
use std::collections::{HashMap, HashSet};

/// Declared-type facts about reference types, as provided by symbol resolution.
pub trait TypeHierarchy {
    /// Whether a value of type `sub` is assignable to `sup` without a cast.
    fn is_subtype(&self, sub: &Type, sup: &Type) -> TriState;

    fn is_interface(&self, ty: &Type) -> TriState {
        let _ = ty;
        TriState::Unknown
    }
}

struct ClassFacts {
    supertypes: Vec<Box<str>>,
    interface: bool,
}

/// A closed-world table of classes. Classes not in the table are unknown.
pub struct KnownHierarchy {
    classes: HashMap<Box<str>, ClassFacts>,
}

impl Default for KnownHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl KnownHierarchy {
    pub fn new() -> KnownHierarchy {
        let mut hierarchy = KnownHierarchy::empty();

        hierarchy.declare_interface("Serializable", &[]);
        hierarchy.declare_interface("Comparable", &[]);
        hierarchy.declare_interface("CharSequence", &[]);
        hierarchy.declare_interface("Cloneable", &[]);
        hierarchy.declare_interface("SegmentAllocator", &[]);
        hierarchy.declare_interface("MemorySegment", &[]);

        hierarchy.declare("Object", &[]);
        hierarchy.declare("Number", &["Serializable"]);
        for wrapper in ["Byte", "Short", "Integer", "Long", "Float", "Double"] {
            hierarchy.declare(wrapper, &["Number", "Comparable"]);
        }
        hierarchy.declare("Character", &["Serializable", "Comparable"]);
        hierarchy.declare("Boolean", &["Serializable", "Comparable"]);
        hierarchy.declare("String", &["Serializable", "Comparable", "CharSequence"]);
        hierarchy.declare("Throwable", &["Serializable"]);
        hierarchy.declare("Exception", &["Throwable"]);
        hierarchy.declare("RuntimeException", &["Exception"]);

        hierarchy
    }

    pub fn empty() -> KnownHierarchy {
        KnownHierarchy {
            classes: HashMap::new(),
        }
    }

    pub fn declare(&mut self, class: &str, supertypes: &[&str]) {
        self.insert(class, supertypes, false);
    }

    pub fn declare_interface(&mut self, interface: &str, supertypes: &[&str]) {
        self.insert(interface, supertypes, true);
    }

    fn insert(&mut self, name: &str, supertypes: &[&str], interface: bool) {
        self.classes.insert(
            name.into(),
            ClassFacts {
                supertypes: supertypes.iter().map(|s| (*s).into()).collect(),
                interface,
            },
        );
    }

    /// All transitive supertypes of `class`, or `None` if some class on the way is unknown.
    fn ancestors<'a>(&'a self, class: &'a str) -> Option<HashSet<&'a str>> {
        let mut seen = HashSet::new();
        let mut pending = vec![class];

        while let Some(current) = pending.pop() {
            if !seen.insert(current) {
                continue;
            }

            let facts = self.classes.get(current)?;
            pending.extend(facts.supertypes.iter().map(|s| &**s));
        }

        seen.insert("Object");
        Some(seen)
    }
}

impl TypeHierarchy for KnownHierarchy {
    fn is_subtype(&self, sub: &Type, sup: &Type) -> TriState {
        match (sub, sup) {
            (Type::Top, _) | (_, Type::Top) => TriState::Unknown,
            _ if sub == sup => TriState::Yes,
            (Type::Reference(_), Type::Reference(Reference::Class(name))) if &**name == "Object" => {
                TriState::Yes
            }
            (Type::Reference(Reference::Null), Type::Reference(_)) => TriState::Yes,
            (Type::Reference(Reference::Array(a)), Type::Reference(Reference::Array(b))) => {
                match (&**a, &**b) {
                    (Type::Reference(_), Type::Reference(_)) => self.is_subtype(a, b),
                    (Type::Top, _) | (_, Type::Top) => TriState::Unknown,
                    _ => TriState::No,
                }
            }
            (Type::Reference(Reference::Array(_)), Type::Reference(Reference::Class(name))) => {
                TriState::from_bool(matches!(&**name, "Cloneable" | "Serializable"))
            }
            (Type::Reference(Reference::Class(a)), Type::Reference(Reference::Class(b))) => {
                match self.ancestors(a) {
                    Some(ancestors) => TriState::from_bool(ancestors.contains(&**b)),
                    None => TriState::Unknown,
                }
            }
            _ => TriState::No,
        }
    }

    fn is_interface(&self, ty: &Type) -> TriState {
        match ty {
            Type::Reference(Reference::Class(name)) => match self.classes.get(name) {
                Some(facts) => TriState::from_bool(facts.interface),
                None => TriState::Unknown,
            },
            Type::Top => TriState::Unknown,
            _ => TriState::No,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrappers_are_numbers() {
        let h = KnownHierarchy::new();

        assert_eq!(
            h.is_subtype(&Type::class("Integer"), &Type::class("Number")),
            TriState::Yes
        );
        assert_eq!(
            h.is_subtype(&Type::class("Character"), &Type::class("Number")),
            TriState::No
        );
        assert_eq!(
            h.is_subtype(&Type::class("String"), &Type::object()),
            TriState::Yes
        );
    }

    #[test]
    fn unknown_classes_are_undecided() {
        let h = KnownHierarchy::new();

        assert_eq!(
            h.is_subtype(&Type::class("Widget"), &Type::class("Number")),
            TriState::Unknown
        );
    }

    #[test]
    fn declared_classes_extend_the_table() {
        let mut h = KnownHierarchy::new();
        h.declare("Widget", &["Comparable"]);

        assert_eq!(
            h.is_subtype(&Type::class("Widget"), &Type::class("Comparable")),
            TriState::Yes
        );
        assert_eq!(
            h.is_subtype(&Type::class("Widget"), &Type::class("String")),
            TriState::No
        );
    }

    #[test]
    fn arrays() {
        let h = KnownHierarchy::new();
        let strings = Type::parse("String[]");

        assert_eq!(h.is_subtype(&strings, &Type::parse("Object[]")), TriState::Yes);
        assert_eq!(h.is_subtype(&Type::parse("int[]"), &Type::parse("long[]")), TriState::No);
        assert_eq!(h.is_subtype(&strings, &Type::object()), TriState::Yes);
    }
}
