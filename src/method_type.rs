use crate::error::{Anchor, Problems};
use crate::lattice::{LatticeList, TriState};
use crate::signature::Signature;
use crate::types::{Primitive, Reference, Type};

/// The state of an index argument after validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Index {
    Known(usize),
    Unknown,
    Invalid,
}

pub(crate) fn non_negative_index(value: Option<i64>, anchor: Anchor, problems: &mut Problems) -> Index {
    match value {
        None => Index::Unknown,
        Some(v) if v < 0 => {
            problems.bounds(anchor, format!("Negative index value {} not allowed.", v));
            Index::Invalid
        }
        Some(v) => Index::Known(v as usize),
    }
}

/// Reports every `void` in `types` and replaces it with top. `first_arg` is the argument
/// position of `types[0]`.
pub(crate) fn non_void_types(types: &[Type], first_arg: usize, problems: &mut Problems) -> Vec<Type> {
    types
        .iter()
        .enumerate()
        .map(|(i, t)| {
            if t.is_void() {
                problems.type_mismatch(Anchor::Argument(first_arg + i), "Type must not be void.");
                Type::Top
            } else {
                t.clone()
            }
        })
        .collect()
}

/// Inserts `types` into the parameters of `target` at `pos`. `pos_arg` is the argument
/// position of the index, the types follow it.
pub(crate) fn splice_params(
    target: &Signature,
    pos: Option<i64>,
    types: &[Type],
    pos_arg: usize,
    problems: &mut Problems,
) -> Signature {
    let types = non_void_types(types, pos_arg + 1, problems);

    let pos = match non_negative_index(pos, Anchor::Argument(pos_arg), problems) {
        Index::Known(pos) => pos,
        Index::Unknown | Index::Invalid => return Signature::Top,
    };

    let params = target.params();

    if let Some(len) = params.len() {
        if pos > len {
            problems.bounds(
                Anchor::Argument(pos_arg),
                format!(
                    "Position argument value {} is out of bounds [0, {}].",
                    pos, len
                ),
            );
            return Signature::Top;
        }
    }

    target.with_params(params.insert_all(pos, &types))
}

pub fn method_type(ret: &Type, params: &[Type], problems: &mut Problems) -> Signature {
    let params = non_void_types(params, 1, problems);
    Signature::new(ret.clone(), params)
}

/// `MethodType.methodType(ret, other)`, taking the parameters of another method type.
pub fn method_type_like(ret: &Type, other: &Signature) -> Signature {
    match other {
        Signature::Top => Signature::from_parts(LatticeList::Top, ret.clone(), TriState::No),
        Signature::Complete { params, .. } => {
            Signature::from_parts(params.clone(), ret.clone(), TriState::No)
        }
    }
}

pub fn append_parameter_types(mt: &Signature, types: &[Type], problems: &mut Problems) -> Signature {
    let types = non_void_types(types, 0, problems);
    mt.with_params(mt.params().append_all(&types))
}

pub fn insert_parameter_types(
    mt: &Signature,
    pos: Option<i64>,
    types: &[Type],
    problems: &mut Problems,
) -> Signature {
    splice_params(mt, pos, types, 0, problems)
}

pub fn drop_parameter_types(
    mt: &Signature,
    start: Option<i64>,
    end: Option<i64>,
    problems: &mut Problems,
) -> Signature {
    let start = non_negative_index(start, Anchor::Argument(0), problems);
    let end = non_negative_index(end, Anchor::Argument(1), problems);

    let (Index::Known(start), Index::Known(end)) = (start, end) else {
        return Signature::Top;
    };

    let params = mt.params();
    let out_of_bounds = start > end || params.len().map_or(false, |len| end > len);

    if out_of_bounds {
        let upper = params
            .len()
            .map_or_else(|| "?".to_string(), |len| len.to_string());
        problems.bounds(
            Anchor::Call,
            format!(
                "Range [{}, {}) is out of bounds [0, {}].",
                start, end, upper
            ),
        );
        return Signature::Top;
    }

    mt.with_params(params.remove_range(start, end))
}

pub fn change_parameter_type(
    mt: &Signature,
    index: Option<i64>,
    ty: &Type,
    problems: &mut Problems,
) -> Signature {
    let ty = non_void_types(std::slice::from_ref(ty), 1, problems).remove(0);

    let index = match non_negative_index(index, Anchor::Argument(0), problems) {
        Index::Known(index) => index,
        Index::Unknown => return mt.with_params(LatticeList::Top),
        Index::Invalid => return Signature::Top,
    };

    let params = mt.params();

    if let Some(len) = params.len() {
        if index >= len {
            problems.bounds(
                Anchor::Argument(0),
                format!(
                    "Position argument value {} is out of bounds [0, {}).",
                    index, len
                ),
            );
            return Signature::Top;
        }
    }

    mt.with_params(params.replace(index, ty))
}

pub fn change_return_type(mt: &Signature, ty: &Type) -> Signature {
    mt.with_ret(ty.clone())
}

pub fn generic(mt: &Signature) -> Signature {
    map_types(mt, |_| Type::object(), |_| Type::object())
}

/// Reference types become `Object`, primitives stay.
pub fn erase(mt: &Signature) -> Signature {
    let erase = |t: &Type| match t {
        Type::Reference(_) => Type::object(),
        other => other.clone(),
    };
    map_types(mt, erase, erase)
}

pub fn wrap(mt: &Signature) -> Signature {
    let wrap = |t: &Type| match t {
        Type::Primitive(p) => p.boxed(),
        Type::Void => Type::class("Void"),
        other => other.clone(),
    };
    map_types(mt, wrap, wrap)
}

pub fn unwrap(mt: &Signature) -> Signature {
    let unwrap = |t: &Type| match t {
        Type::Reference(Reference::Class(name)) if &**name == "Void" => Type::Void,
        other => match other.unboxed() {
            Some(p) => Type::Primitive(p),
            None => other.clone(),
        },
    };
    map_types(mt, unwrap, unwrap)
}

fn map_types(mt: &Signature, param: impl Fn(&Type) -> Type, ret: impl Fn(&Type) -> Type) -> Signature {
    match mt {
        Signature::Top => Signature::Top,
        Signature::Complete {
            params,
            ret: r,
            varargs,
        } => {
            let params = params.map(|t| if matches!(t, Type::Top) { Type::Top } else { param(t) });
            let ret = match r {
                Type::Top => Type::Top,
                r => ret(r),
            };
            Signature::from_parts(params, ret, *varargs)
        }
    }
}

pub fn parameter_count(mt: &Signature) -> Option<usize> {
    mt.arity()
}

pub fn parameter_type(mt: &Signature, index: Option<i64>, problems: &mut Problems) -> Type {
    match non_negative_index(index, Anchor::Argument(0), problems) {
        Index::Known(index) => match mt.params().get(index) {
            Some(t) => t,
            None => {
                problems.bounds(
                    Anchor::Argument(0),
                    format!(
                        "Position argument value {} is out of bounds [0, {}).",
                        index,
                        mt.arity().unwrap_or(0)
                    ),
                );
                Type::Top
            }
        },
        Index::Unknown | Index::Invalid => Type::Top,
    }
}

/// Whether a type names a primitive `int`, as needed for switch keys.
pub(crate) fn is_int(t: &Type) -> TriState {
    match t {
        Type::Top => TriState::Unknown,
        t => TriState::from_bool(t.as_primitive() == Some(Primitive::Int)),
    }
}
