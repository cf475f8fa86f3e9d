use crate::error::{Anchor, Problems};
use crate::lattice::{Lattice, LatticeList, TriState};
use crate::types::{Primitive, Type};
use std::fmt;

pub type CoordinateList = LatticeList<Type>;

/// The shape of a var handle: the coordinates that locate a value and the type of the
/// value itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccessorSignature {
    Top,
    Complete {
        coordinates: CoordinateList,
        value: Type,
        /// `Yes` once the handle has `invokeExact` behavior.
        exact: TriState,
    },
}

impl AccessorSignature {
    pub fn new(coordinates: Vec<Type>, value: Type) -> AccessorSignature {
        AccessorSignature::Complete {
            coordinates: LatticeList::complete(coordinates),
            value,
            exact: TriState::No,
        }
    }

    pub fn from_parts(coordinates: CoordinateList, value: Type, exact: TriState) -> AccessorSignature {
        if coordinates.is_top() && value.is_top() {
            AccessorSignature::Top
        } else {
            AccessorSignature::Complete {
                coordinates,
                value,
                exact,
            }
        }
    }

    /// An accessor whose leading coordinates are known but whose remaining shape is not.
    pub fn incomplete(prefix: Vec<Type>) -> AccessorSignature {
        let known = prefix.into_iter().enumerate().collect();
        AccessorSignature::from_parts(LatticeList::incomplete(known), Type::Top, TriState::No)
    }

    pub fn coordinates(&self) -> CoordinateList {
        match self {
            AccessorSignature::Top => LatticeList::Top,
            AccessorSignature::Complete { coordinates, .. } => coordinates.clone(),
        }
    }

    pub fn value(&self) -> Type {
        match self {
            AccessorSignature::Top => Type::Top,
            AccessorSignature::Complete { value, .. } => value.clone(),
        }
    }

    pub fn exact(&self) -> TriState {
        match self {
            AccessorSignature::Top => TriState::Unknown,
            AccessorSignature::Complete { exact, .. } => *exact,
        }
    }

    fn with_exact(&self, exact: TriState) -> AccessorSignature {
        match self {
            AccessorSignature::Top => AccessorSignature::Top,
            AccessorSignature::Complete {
                coordinates, value, ..
            } => AccessorSignature::from_parts(coordinates.clone(), value.clone(), exact),
        }
    }
}

impl Lattice for AccessorSignature {
    fn top() -> Self {
        AccessorSignature::Top
    }

    fn is_top(&self) -> bool {
        matches!(self, AccessorSignature::Top)
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        if self.is_top() || other.is_top() {
            return (AccessorSignature::Top, TriState::Unknown);
        }

        let (coordinates, same_coordinates) = self.coordinates().join_identical(&other.coordinates());
        let (value, same_value) = self.value().join_identical(&other.value());
        let exact = self.exact().join(other.exact());

        (
            AccessorSignature::from_parts(coordinates, value, exact),
            same_coordinates.and(same_value),
        )
    }
}

impl fmt::Display for AccessorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessorSignature::Top => f.write_str("⊤"),
            AccessorSignature::Complete {
                coordinates, value, ..
            } => write!(f, "({})({})", coordinates.render(","), value),
        }
    }
}

pub fn array_element_var_handle(array_class: &Type) -> AccessorSignature {
    let int = Type::Primitive(Primitive::Int);

    match array_class.component_type() {
        Some(component) => AccessorSignature::new(vec![array_class.clone(), int], component.clone()),
        None => AccessorSignature::new(vec![Type::Top, int], Type::Top),
    }
}

const VIEW_COMPONENTS: [Primitive; 6] = [
    Primitive::Short,
    Primitive::Char,
    Primitive::Int,
    Primitive::Long,
    Primitive::Float,
    Primitive::Double,
];

pub fn byte_array_view_var_handle(view_array_class: &Type, problems: &mut Problems) -> AccessorSignature {
    view_var_handle(Type::array_of(Type::Primitive(Primitive::Byte)), view_array_class, problems)
}

pub fn byte_buffer_view_var_handle(view_array_class: &Type, problems: &mut Problems) -> AccessorSignature {
    view_var_handle(Type::class("ByteBuffer"), view_array_class, problems)
}

fn view_var_handle(base: Type, view_array_class: &Type, problems: &mut Problems) -> AccessorSignature {
    let coordinates = vec![base, Type::Primitive(Primitive::Int)];

    let value = match view_array_class {
        Type::Top => Type::Top,
        class => match class.component_type() {
            None => {
                problems.type_mismatch(
                    Anchor::Argument(0),
                    format!("Unexpected class type '{}', must be an array type.", class),
                );
                Type::Top
            }
            Some(component) => match component.as_primitive() {
                Some(p) if VIEW_COMPONENTS.contains(&p) => component.clone(),
                _ => {
                    let expected = VIEW_COMPONENTS
                        .iter()
                        .map(|p| format!("'{}'", p))
                        .collect::<Vec<_>>()
                        .join(", ");
                    problems.type_mismatch(
                        Anchor::Argument(0),
                        format!("Expected one of {}, got '{}'", expected, component),
                    );
                    Type::Top
                }
            },
        },
    };

    AccessorSignature::new(coordinates, value)
}

/// `withInvokeBehavior()` when `exact` is false, `withInvokeExactBehavior()` otherwise.
pub fn with_invoke_behavior(
    accessor: &AccessorSignature,
    exact: bool,
    problems: &mut Problems,
) -> AccessorSignature {
    let requested = TriState::from_bool(exact);

    if accessor.exact() == requested {
        let behavior = if exact { "invokeExact" } else { "invoke" };
        problems.redundant(
            Anchor::Call,
            format!("VarHandle already has '{}' behavior", behavior),
        );
        return accessor.clone();
    }

    accessor.with_exact(requested)
}
