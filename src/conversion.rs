//! Conversions between descriptors, as applied when a handle is retargeted to a new
//! signature or when a constant value is bound to a declared type.

use crate::hierarchy::TypeHierarchy;
use crate::lattice::TriState;
use crate::types::{Reference, Type};

/// Checks the cast-like conversion of a value of type `from` to type `to`.
///
/// Returns the reason when the conversion can be rejected with certainty. Unknown
/// operands are accepted.
pub fn check_cast(from: &Type, to: &Type, hierarchy: &dyn TypeHierarchy) -> Result<(), String> {
    match (from, to) {
        (Type::Top, _) | (_, Type::Top) => Ok(()),
        _ if from == to => Ok(()),
        (Type::Primitive(a), Type::Primitive(b)) => {
            if a.widens_to(*b) {
                Ok(())
            } else {
                Err(format!("Incompatible primitive conversion: {} to {}", a, b))
            }
        }
        (Type::Primitive(p), Type::Reference(_)) => {
            if hierarchy.is_subtype(&p.boxed(), to).is_no() {
                Err(format!("Incompatible boxed assignment: {} to {}.", p, to))
            } else {
                Ok(())
            }
        }
        (Type::Reference(Reference::Null), Type::Primitive(p)) => {
            Err(format!("Cannot cast reference type null to primitive type {}", p))
        }
        (Type::Reference(_), Type::Primitive(p)) => {
            let unboxable = match from.unboxed() {
                Some(q) => q == *p || q.widens_to(*p),
                // A supertype of the wrapper, e.g. `Number` or `Object`.
                None => !hierarchy.is_subtype(&p.boxed(), from).is_no(),
            };

            if unboxable {
                Ok(())
            } else {
                Err(format!(
                    "Cannot cast reference type {} to primitive type {}",
                    from, p
                ))
            }
        }
        (Type::Reference(_), Type::Reference(_)) => {
            if provably_unrelated(from, to, hierarchy) {
                Err(format!("Incompatible reference conversion: {} to {}", from, to))
            } else {
                Ok(())
            }
        }
        _ => Err(format!("Incompatible conversion: {} to {}", from, to)),
    }
}

/// Checks a return value conversion, where `void` may be both introduced and dropped.
pub fn check_return(from: &Type, to: &Type, hierarchy: &dyn TypeHierarchy) -> Result<(), String> {
    if from.is_void() || to.is_void() {
        return Ok(());
    }

    check_cast(from, to, hierarchy)
}

/// Checks whether a value of type `from` can be passed where `to` is declared, as in a
/// method invocation: no narrowing and no downcasts.
pub fn check_assignment(
    from: &Type,
    to: &Type,
    hierarchy: &dyn TypeHierarchy,
) -> Result<(), String> {
    let assignable = match (from, to) {
        (Type::Top, _) | (_, Type::Top) => TriState::Unknown,
        _ if from == to => TriState::Yes,
        (Type::Primitive(a), Type::Primitive(b)) => TriState::from_bool(a.widens_to(*b)),
        (Type::Primitive(p), Type::Reference(_)) => hierarchy.is_subtype(&p.boxed(), to),
        (Type::Reference(_), Type::Primitive(p)) => match from.unboxed() {
            Some(q) => TriState::from_bool(q == *p || q.widens_to(*p)),
            None => TriState::No,
        },
        (Type::Reference(_), Type::Reference(_)) => hierarchy.is_subtype(from, to),
        _ => TriState::No,
    };

    if assignable.is_no() {
        Err(format!("Expected parameter of type {} but got {}.", to, from))
    } else {
        Ok(())
    }
}

fn provably_unrelated(a: &Type, b: &Type, hierarchy: &dyn TypeHierarchy) -> bool {
    let related = hierarchy.is_subtype(a, b).or(hierarchy.is_subtype(b, a));

    // A non-final class may always be cast to an interface.
    let involves_interface = hierarchy
        .is_interface(a)
        .or(hierarchy.is_interface(b))
        .is_yes();

    related.is_no() && !involves_interface
}
