//! Signature computation for the method handle combinators.
//!
//! Static factories take their arguments in declaration order, so `Anchor::Argument(0)`
//! is the first argument of the call. Instance methods report problems with the handle
//! itself on `Anchor::Receiver`.

use crate::conversion::{check_assignment, check_cast, check_return};
use crate::error::{Anchor, Problems};
use crate::hierarchy::TypeHierarchy;
use crate::lattice::{Lattice, LatticeList, TriState};
use crate::method_type::{is_int, non_negative_index, splice_params, Index};
use crate::signature::Signature;
use crate::types::Type;

pub fn identity(ty: &Type, problems: &mut Problems) -> Signature {
    if ty.is_void() {
        problems.type_mismatch(Anchor::Argument(0), "Type must not be void.");
        return Signature::Top;
    }

    Signature::new(ty.clone(), vec![ty.clone()])
}

/// `MethodHandles.constant(ty, value)` where `value_type` is the static type of the value.
pub fn constant(
    ty: &Type,
    value_type: &Type,
    value_is_zero: TriState,
    hierarchy: &dyn TypeHierarchy,
    problems: &mut Problems,
) -> Signature {
    if ty.is_void() {
        problems.type_mismatch(Anchor::Argument(0), "Type must not be void.");
        return Signature::Top;
    }

    match check_assignment(value_type, ty, hierarchy) {
        Err(message) => problems.type_mismatch(Anchor::Call, message),
        Ok(()) if value_is_zero.is_yes() => problems.redundant(
            Anchor::Call,
            "Usage of 'constant' with zero value can be replaced with 'zero'.",
        ),
        Ok(()) => {}
    }

    Signature::new(ty.clone(), Vec::new())
}

pub fn zero(ty: &Type) -> Signature {
    Signature::new(ty.clone(), Vec::new())
}

pub fn empty(mt: &Signature) -> Signature {
    mt.with_varargs(TriState::No)
}

pub fn type_of(handle: &Signature) -> Signature {
    handle.with_varargs(TriState::No)
}

pub fn drop_arguments(
    target: &Signature,
    pos: Option<i64>,
    types: &[Type],
    problems: &mut Problems,
) -> Signature {
    splice_params(target, pos, types, 1, problems)
}

pub fn drop_return(target: &Signature, problems: &mut Problems) -> Signature {
    if target.ret().is_void() {
        problems.redundant(
            Anchor::Call,
            "MethodHandle to drop return from already has return type 'void'.",
        );
        return target.clone();
    }

    target.with_ret(Type::Void)
}

pub fn filter_return_value(
    target: &Signature,
    filter: &Signature,
    problems: &mut Problems,
) -> Signature {
    let filter_params = filter.params();
    let filter_anchor = Anchor::Argument(1);

    match target.ret() {
        Type::Void => {
            if filter_params.len().map_or(false, |len| len > 0) {
                problems.type_mismatch(
                    filter_anchor,
                    "The target MethodHandle returns 'void' but the filter expects parameters",
                );
                return Signature::Top;
            }
        }
        target_ret => {
            if filter_params.len().map_or(false, |len| len > 1) {
                problems.arity(filter_anchor, "Filter must accept at most one parameter");
                return Signature::Top;
            }

            if let Some(param) = filter_params.get(0) {
                if param.join_identical(&target_ret).1.is_no() {
                    problems.type_mismatch(
                        filter_anchor,
                        format!(
                            "Filter parameter '{}' is incompatible with target return type '{}'",
                            param, target_ret
                        ),
                    );
                    return Signature::Top;
                }
            }
        }
    }

    match target {
        Signature::Top => Signature::Top,
        Signature::Complete {
            params, varargs, ..
        } => Signature::from_parts(params.clone(), filter.ret(), *varargs),
    }
}

pub fn collect_arguments(
    target: &Signature,
    pos: Option<i64>,
    filter: &Signature,
    problems: &mut Problems,
) -> Signature {
    let pos = match non_negative_index(pos, Anchor::Argument(1), problems) {
        Index::Known(pos) => pos,
        Index::Unknown | Index::Invalid => return Signature::Top,
    };

    let params = target.params();
    let filter_ret = filter.ret();

    if let Some(len) = params.len() {
        let upper = if filter_ret.is_void() { len } else { len.saturating_sub(1) };
        if pos > upper || (!filter_ret.is_void() && len == 0) {
            problems.bounds(
                Anchor::Argument(1),
                format!(
                    "Position argument value {} is out of bounds [0, {}].",
                    pos, upper
                ),
            );
            return Signature::Top;
        }
    }

    let replaced = match &filter_ret {
        Type::Void => 0,
        Type::Top => return target.with_params(LatticeList::Top),
        filter_ret => {
            if let Some(param) = params.get(pos) {
                if param.join_identical(filter_ret).1.is_no() {
                    problems.type_mismatch(
                        Anchor::Argument(2),
                        format!(
                            "Filter return type '{}' does not match the target parameter type '{}' at position {}",
                            filter_ret, param, pos
                        ),
                    );
                    return Signature::Top;
                }
            }
            1
        }
    };

    let params = params.remove_range(pos, pos + replaced);

    let params = match filter.params() {
        LatticeList::Complete(inserted) => params.insert_all(pos, &inserted),
        _ => LatticeList::incomplete(
            params
                .known()
                .into_iter()
                .filter(|(i, _)| *i < pos)
                .collect(),
        ),
    };

    target.with_params(params)
}

/// `MethodHandles.insertArguments(target, pos, values...)`, given the static types of the
/// values.
pub fn insert_arguments(
    target: &Signature,
    pos: Option<i64>,
    value_types: &[Type],
    hierarchy: &dyn TypeHierarchy,
    problems: &mut Problems,
) -> Signature {
    let pos = match non_negative_index(pos, Anchor::Argument(1), problems) {
        Index::Known(pos) => pos,
        Index::Unknown | Index::Invalid => return Signature::Top,
    };

    let params = target.params();

    if let Some(len) = params.len() {
        if pos + value_types.len() > len {
            problems.bounds(
                Anchor::Argument(1),
                format!(
                    "Cannot insert {} value(s) at position {} into {} parameter(s).",
                    value_types.len(),
                    pos,
                    len
                ),
            );
            return Signature::Top;
        }
    }

    for (i, value_type) in value_types.iter().enumerate() {
        if let Some(param) = params.get(pos + i) {
            if let Err(message) = check_assignment(value_type, &param, hierarchy) {
                problems.type_mismatch(Anchor::Argument(2 + i), message);
            }
        }
    }

    target.with_params(params.remove_range(pos, pos + value_types.len()))
}

/// `handle.bindTo(value)`: binds the leading reference parameter.
pub fn bind_to(
    target: &Signature,
    value_type: &Type,
    hierarchy: &dyn TypeHierarchy,
    problems: &mut Problems,
) -> Signature {
    let params = target.params();

    match params.get(0) {
        None => {
            problems.arity(Anchor::Receiver, "MethodHandle has no parameter to bind to.");
            return Signature::Top;
        }
        Some(Type::Primitive(p)) => {
            problems.type_mismatch(
                Anchor::Receiver,
                format!("The first parameter must be a reference type but was {}.", p),
            );
            return Signature::Top;
        }
        Some(first) => {
            if let Err(message) = check_assignment(value_type, &first, hierarchy) {
                problems.type_mismatch(Anchor::Argument(0), message);
            }
        }
    }

    target.with_params(params.remove_range(0, 1))
}

pub fn table_switch(fallback: &Signature, cases: &[Signature], problems: &mut Problems) -> Signature {
    if cases.is_empty() {
        problems.type_mismatch(Anchor::Call, "At least one case MethodHandle is required.");
    }

    let handles = std::iter::once(fallback).chain(cases).enumerate();
    let mut result = fallback.clone();

    for (i, handle) in handles {
        match handle.params().get(0) {
            None => {
                problems.type_mismatch(
                    Anchor::Argument(i),
                    "MethodHandle must have a leading parameter of type 'int'.",
                );
                return Signature::Top;
            }
            Some(key) if is_int(&key).is_no() => {
                problems.type_mismatch(
                    Anchor::Argument(i),
                    format!(
                        "MethodHandle must have a leading parameter of type 'int' but was '{}'.",
                        key
                    ),
                );
                return Signature::Top;
            }
            Some(_) => {}
        }

        let (joined, same) = result.join_identical(handle);

        if same.is_no() {
            problems.type_mismatch(
                Anchor::Argument(i),
                format!(
                    "Case type {} does not match the fallback type {}.",
                    handle, fallback
                ),
            );
            return Signature::Top;
        }

        result = joined;
    }

    result
}

/// The cleanup takes the thrown exception, then the result of the target unless it
/// returns `void`, then a prefix of the target's parameters.
pub fn try_finally(
    target: &Signature,
    cleanup: &Signature,
    hierarchy: &dyn TypeHierarchy,
    problems: &mut Problems,
) -> Signature {
    let cleanup_anchor = Anchor::Argument(1);
    let target_ret = target.ret();
    let cleanup_ret = cleanup.ret();

    if target_ret.join_identical(&cleanup_ret).1.is_no() {
        problems.type_mismatch(
            cleanup_anchor,
            format!(
                "Return types do not match: {} != {}",
                target_ret, cleanup_ret
            ),
        );
    }

    let leading = match target_ret {
        Type::Top => return target.clone(),
        Type::Void => 1,
        _ => 2,
    };

    let cleanup_params = cleanup.params();

    if let Some(len) = cleanup_params.len() {
        if len < leading {
            problems.arity(
                cleanup_anchor,
                format!("Expected at least {} parameters, got {}", leading, len),
            );
            return Signature::Top;
        }
    }

    if let Some(thrown) = cleanup_params.get(0) {
        if hierarchy
            .is_subtype(&thrown, &Type::class("Throwable"))
            .is_no()
        {
            problems.type_mismatch(
                cleanup_anchor,
                format!(
                    "Parameter at index 0 must be a Throwable but was {}",
                    thrown
                ),
            );
        }
    }

    if leading == 2 {
        if let Some(result) = cleanup_params.get(1) {
            if result.join_identical(&target_ret).1.is_no() {
                problems.type_mismatch(
                    cleanup_anchor,
                    format!(
                        "Parameter at index 1 must match the return type ({}) but was {}",
                        target_ret, result
                    ),
                );
            }
        }
    }

    let (Some(cleanup_params), Some(target_params)) =
        (cleanup_params.as_slice(), target.params().as_slice().map(<[Type]>::to_vec))
    else {
        return target.clone();
    };

    let trailing = &cleanup_params[leading..];

    if trailing.len() > target_params.len() {
        problems.arity(
            cleanup_anchor,
            format!(
                "Expected at most {} parameters, got {}",
                leading + target_params.len(),
                cleanup_params.len()
            ),
        );
        return Signature::Top;
    }

    for (i, (cleanup_param, target_param)) in trailing.iter().zip(&target_params).enumerate() {
        if cleanup_param.join_identical(target_param).1.is_no() {
            problems.type_mismatch(
                cleanup_anchor,
                format!(
                    "Parameter at index {} must be {} but was {}",
                    leading + i,
                    target_param,
                    cleanup_param
                ),
            );
            return Signature::Top;
        }
    }

    target.clone()
}

/// Arguments flow from the requested parameter types into the current ones, the result
/// flows from the current return type to the requested one. Positions that cannot be
/// converted become top, and only the first of them is reported.
pub fn as_type(
    target: &Signature,
    requested: &Signature,
    hierarchy: &dyn TypeHierarchy,
    problems: &mut Problems,
) -> Signature {
    if target.is_top() || requested.is_top() {
        return requested.with_varargs(TriState::No);
    }

    if target.same_shape(requested).is_yes() {
        problems.redundant(
            Anchor::Call,
            "Call to 'asType' is redundant as the MethodHandle already has that type",
        );
        return target.clone();
    }

    let current = target.params();

    if let (Some(a), Some(b)) = (current.len(), requested.params().len()) {
        if a != b {
            problems.arity(
                Anchor::Argument(0),
                format!(
                    "Cannot convert a MethodHandle with {} parameters to one with {}",
                    a, b
                ),
            );
            return Signature::Top;
        }
    }

    let mut first_failure: Option<String> = None;

    let params = requested.params().map_indexed(|i, requested_param| {
        let current_param = current.get(i).unwrap_or(Type::Top);

        match check_cast(requested_param, &current_param, hierarchy) {
            Ok(()) => requested_param.clone(),
            Err(message) => {
                first_failure.get_or_insert(message);
                Type::Top
            }
        }
    });

    let ret = match check_return(&target.ret(), &requested.ret(), hierarchy) {
        Ok(()) => requested.ret(),
        Err(message) => {
            first_failure.get_or_insert(message);
            Type::Top
        }
    };

    if let Some(message) = first_failure {
        problems.type_mismatch(Anchor::Receiver, message);
    }

    Signature::from_parts(params, ret, TriState::No)
}

pub fn with_varargs(target: &Signature, flag: Option<bool>, problems: &mut Problems) -> Signature {
    match flag {
        None => target.with_varargs(TriState::Unknown),
        Some(false) => {
            if target.varargs().is_no() {
                problems.redundant(Anchor::Call, "Redundant method invocation.");
                return target.clone();
            }
            target.with_varargs(TriState::No)
        }
        Some(true) => {
            if target.varargs().is_yes() {
                problems.redundant(Anchor::Call, "Redundant method invocation.");
                return target.clone();
            }

            if let Some(params) = target.params().as_slice() {
                let Some(last) = params.last() else {
                    problems.arity(
                        Anchor::Receiver,
                        "MethodHandle must have at least one parameter to be varargs.",
                    );
                    return Signature::Top;
                };

                if last.is_array().is_no() {
                    problems.type_mismatch(
                        Anchor::Receiver,
                        format!("Last parameter type must be an array but was {}.", last),
                    );
                    return Signature::Top;
                }
            }

            target.with_varargs(TriState::Yes)
        }
    }
}

pub fn as_fixed_arity(target: &Signature) -> Signature {
    target.with_varargs(TriState::No)
}

pub fn as_varargs_collector(
    target: &Signature,
    array_type: &Type,
    problems: &mut Problems,
) -> Signature {
    if array_type.is_array().is_no() {
        problems.type_mismatch(
            Anchor::Argument(0),
            format!("Unexpected class type '{}', must be an array type.", array_type),
        );
        return Signature::Top;
    }

    if let Some(params) = target.params().as_slice() {
        match params.last() {
            None => {
                problems.arity(
                    Anchor::Receiver,
                    "MethodHandle must have at least one parameter to be varargs.",
                );
                return Signature::Top;
            }
            Some(last) if last.join_identical(array_type).1.is_no() => {
                problems.type_mismatch(
                    Anchor::Argument(0),
                    format!(
                        "Array type {} does not match the last parameter type {}.",
                        array_type, last
                    ),
                );
                return Signature::Top;
            }
            Some(_) => {}
        }
    }

    target.with_varargs(TriState::Yes)
}

/// Checks a `handle.invokeExact(args...)` call when `exact` is set, `handle.invoke(args...)`
/// otherwise. `arg_types` are the static types of the arguments.
///
/// `invokeExact` needs identical types. `invoke` converts each argument as `asType` would,
/// and a varargs handle accepts any argument count there.
pub fn check_invocation(
    handle: &Signature,
    exact: bool,
    arg_types: &[Type],
    hierarchy: &dyn TypeHierarchy,
    problems: &mut Problems,
) {
    let Some(params) = handle.params().as_slice().map(<[Type]>::to_vec) else {
        return;
    };

    if params.len() != arg_types.len() {
        if exact || handle.varargs().is_no() {
            problems.arity(
                Anchor::Call,
                format!("Expected {} arguments but got {}.", params.len(), arg_types.len()),
            );
        }
        return;
    }

    let mismatch = params.iter().zip(arg_types).any(|(param, arg)| {
        if exact {
            param.join_identical(arg).1.is_no()
        } else {
            check_cast(arg, param, hierarchy).is_err()
        }
    });

    if mismatch {
        let render = |types: &[Type]| {
            types
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        problems.type_mismatch(
            Anchor::Call,
            format!(
                "Argument types do not match: expected ({}) but got ({}).",
                render(&params),
                render(arg_types)
            ),
        );
    }
}
