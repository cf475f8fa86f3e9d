use crate::lattice::{Lattice, LatticeList, TriState};
use crate::types::Type;
use std::fmt;

pub type ParameterList = LatticeList<Type>;

/// The shape of a method type or method handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Signature {
    Top,
    Complete {
        params: ParameterList,
        ret: Type,
        /// Whether the handle collects trailing arguments into its last array parameter.
        varargs: TriState,
    },
}

impl Signature {
    pub fn new(ret: Type, params: Vec<Type>) -> Signature {
        Signature::Complete {
            params: LatticeList::complete(params),
            ret,
            varargs: TriState::No,
        }
    }

    /// Builds a signature, collapsing to `Top` when nothing is known.
    pub fn from_parts(params: ParameterList, ret: Type, varargs: TriState) -> Signature {
        if params.is_top() && ret.is_top() {
            Signature::Top
        } else {
            Signature::Complete {
                params,
                ret,
                varargs,
            }
        }
    }

    pub fn params(&self) -> ParameterList {
        match self {
            Signature::Top => LatticeList::Top,
            Signature::Complete { params, .. } => params.clone(),
        }
    }

    pub fn ret(&self) -> Type {
        match self {
            Signature::Top => Type::Top,
            Signature::Complete { ret, .. } => ret.clone(),
        }
    }

    pub fn varargs(&self) -> TriState {
        match self {
            Signature::Top => TriState::Unknown,
            Signature::Complete { varargs, .. } => *varargs,
        }
    }

    pub fn arity(&self) -> Option<usize> {
        match self {
            Signature::Top => None,
            Signature::Complete { params, .. } => params.len(),
        }
    }

    pub fn with_params(&self, params: ParameterList) -> Signature {
        match self {
            Signature::Top if params.is_top() => Signature::Top,
            Signature::Top => Signature::from_parts(params, Type::Top, TriState::Unknown),
            Signature::Complete { ret, varargs, .. } => {
                Signature::from_parts(params, ret.clone(), *varargs)
            }
        }
    }

    /// A signature of unknown shape stays unknown even when its return type is set.
    pub fn with_ret(&self, ret: Type) -> Signature {
        match self {
            Signature::Top => Signature::Top,
            Signature::Complete {
                params, varargs, ..
            } => Signature::from_parts(params.clone(), ret, *varargs),
        }
    }

    pub fn with_varargs(&self, varargs: TriState) -> Signature {
        match self {
            Signature::Top => Signature::Top,
            Signature::Complete { params, ret, .. } => {
                Signature::from_parts(params.clone(), ret.clone(), varargs)
            }
        }
    }

    /// Equality of parameter and return types, ignoring the varargs flag.
    pub fn same_shape(&self, other: &Signature) -> TriState {
        let (_, params) = self.params().join_identical(&other.params());
        let (_, ret) = self.ret().join_identical(&other.ret());
        params.and(ret)
    }
}

impl Lattice for Signature {
    fn top() -> Self {
        Signature::Top
    }

    fn is_top(&self) -> bool {
        matches!(self, Signature::Top)
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        match (self, other) {
            (Signature::Top, _) | (_, Signature::Top) => (Signature::Top, TriState::Unknown),
            _ => {
                let (params, same_params) = self.params().join_identical(&other.params());
                let (ret, same_ret) = self.ret().join_identical(&other.ret());
                let varargs = self.varargs().join(other.varargs());

                (
                    Signature::from_parts(params, ret, varargs),
                    same_params.and(same_ret),
                )
            }
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Top => f.write_str("⊤"),
            Signature::Complete { params, ret, .. } => {
                write!(f, "({}){}", params.render(","), ret)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(ret: &str, params: &[&str]) -> Signature {
        Signature::new(
            Type::parse(ret),
            params.iter().map(|p| Type::parse(p)).collect(),
        )
    }

    #[test]
    fn display() {
        assert_eq!(sig("void", &["int", "double"]).to_string(), "(int,double)void");
        assert_eq!(sig("int", &[]).to_string(), "()int");
        assert_eq!(Signature::Top.to_string(), "⊤");
        assert_eq!(
            Signature::Top
                .with_params(LatticeList::Top.insert_all(1, &[Type::parse("int")]))
                .to_string(),
            "(1=int)⊤"
        );
    }

    #[test]
    fn join_is_pointwise() {
        let a = sig("int", &["double"]);
        let b = sig("float", &["double"]);

        assert_eq!(a.join(&b).to_string(), "(double)⊤");
        assert_eq!(a.join(&a), a);
        assert_eq!(a.join(&Signature::Top), Signature::Top);
    }

    #[test]
    fn join_of_disagreeing_arity() {
        let a = sig("int", &["double"]);
        let b = sig("int", &["double", "int"]);

        assert_eq!(a.join(&b).to_string(), "({⊤})int");
    }

    #[test]
    fn unknown_signature_ignores_return_type() {
        assert_eq!(Signature::Top.with_ret(Type::Void), Signature::Top);
    }
}
