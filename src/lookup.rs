//! Handles produced by a `MethodHandles.Lookup` from a class, a member name and a type.
//!
//! The lookup object is the receiver, so `Anchor::Argument(0)` is the referenced class.

use crate::accessor::AccessorSignature;
use crate::error::{Anchor, Problems};
use crate::lattice::Lattice;
use crate::signature::Signature;
use crate::types::Type;

fn reference_type(ty: &Type, anchor: Anchor, problems: &mut Problems) -> Type {
    match ty {
        Type::Void | Type::Primitive(_) => {
            problems.type_mismatch(anchor, format!("Expected a reference type but got '{}'.", ty));
            Type::Top
        }
        _ => ty.clone(),
    }
}

fn non_void(ty: &Type, anchor: Anchor, problems: &mut Problems) -> Type {
    if ty.is_void() {
        problems.type_mismatch(anchor, "Type must not be void.");
        return Type::Top;
    }

    ty.clone()
}

fn prepend_param(mt: &Signature, param: Type) -> Signature {
    mt.with_params(mt.params().insert_all(0, &[param]))
}

pub fn find_static(refc: &Type, mt: &Signature, problems: &mut Problems) -> Signature {
    reference_type(refc, Anchor::Argument(0), problems);
    mt.clone()
}

/// `findVirtual(refc, name, type)`: the receiver becomes the leading parameter.
pub fn find_virtual(refc: &Type, mt: &Signature, problems: &mut Problems) -> Signature {
    let receiver = reference_type(refc, Anchor::Argument(0), problems);
    prepend_param(mt, receiver)
}

pub fn find_special(
    refc: &Type,
    mt: &Signature,
    special_caller: &Type,
    problems: &mut Problems,
) -> Signature {
    reference_type(refc, Anchor::Argument(0), problems);
    prepend_param(mt, special_caller.clone())
}

/// `findConstructor(refc, type)`, where `type` must return `void`.
pub fn find_constructor(refc: &Type, mt: &Signature, problems: &mut Problems) -> Signature {
    let ret = mt.ret();
    if !ret.is_void() && !ret.is_top() {
        problems.type_mismatch(
            Anchor::Argument(1),
            format!("Expected return type void but got {}.", ret),
        );
        return Signature::Top;
    }

    let class = reference_type(refc, Anchor::Argument(0), problems);
    mt.with_ret(class)
}

pub fn find_getter(refc: &Type, ty: &Type, problems: &mut Problems) -> Signature {
    let receiver = reference_type(refc, Anchor::Argument(0), problems);
    let ty = non_void(ty, Anchor::Argument(2), problems);
    Signature::new(ty, vec![receiver])
}

pub fn find_setter(refc: &Type, ty: &Type, problems: &mut Problems) -> Signature {
    let receiver = reference_type(refc, Anchor::Argument(0), problems);
    let ty = non_void(ty, Anchor::Argument(2), problems);
    Signature::new(Type::Void, vec![receiver, ty])
}

pub fn find_static_getter(refc: &Type, ty: &Type, problems: &mut Problems) -> Signature {
    reference_type(refc, Anchor::Argument(0), problems);
    let ty = non_void(ty, Anchor::Argument(2), problems);
    Signature::new(ty, Vec::new())
}

pub fn find_static_setter(refc: &Type, ty: &Type, problems: &mut Problems) -> Signature {
    reference_type(refc, Anchor::Argument(0), problems);
    let ty = non_void(ty, Anchor::Argument(2), problems);
    Signature::new(Type::Void, vec![ty])
}

/// `findVarHandle(recv, name, type)`: an instance field, located by its holder.
pub fn find_var_handle(recv: &Type, ty: &Type, problems: &mut Problems) -> AccessorSignature {
    let recv = reference_type(recv, Anchor::Argument(0), problems);
    let ty = non_void(ty, Anchor::Argument(2), problems);
    AccessorSignature::new(vec![recv], ty)
}

pub fn find_static_var_handle(decl: &Type, ty: &Type, problems: &mut Problems) -> AccessorSignature {
    reference_type(decl, Anchor::Argument(0), problems);
    let ty = non_void(ty, Anchor::Argument(2), problems);
    AccessorSignature::new(Vec::new(), ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    fn sig(ret: &str, params: &[&str]) -> Signature {
        Signature::new(
            Type::parse(ret),
            params.iter().map(|p| Type::parse(p)).collect(),
        )
    }

    #[test]
    fn methods() {
        let mut problems = Problems::new();
        let mt = sig("String", &["int"]);
        let list = Type::parse("List");

        assert_eq!(find_static(&list, &mt, &mut problems), mt);
        assert_eq!(find_virtual(&list, &mt, &mut problems).to_string(), "(List,int)String");
        assert_eq!(
            find_special(&list, &mt, &Type::parse("Listie"), &mut problems).to_string(),
            "(Listie,int)String"
        );
        assert!(problems.is_empty());

        assert_eq!(
            find_virtual(&list, &Signature::Top, &mut problems).to_string(),
            "(0=List)⊤"
        );
    }

    #[test]
    fn primitive_classes_are_not_looked_up() {
        let mut problems = Problems::new();
        let mt = sig("void", &[]);

        assert_eq!(find_virtual(&Type::parse("int"), &mt, &mut problems).to_string(), "(⊤)void");
        assert_eq!(find_static(&Type::parse("void"), &mt, &mut problems), mt);
        assert_eq!(
            problems.messages(),
            [
                "Expected a reference type but got 'int'.",
                "Expected a reference type but got 'void'.",
            ]
        );
        assert!(problems
            .iter()
            .all(|p| p.kind == DiagnosticKind::TypeMismatch && p.anchor == Anchor::Argument(0)));
    }

    #[test]
    fn constructors() {
        let mut problems = Problems::new();
        let point = Type::parse("Point");

        assert_eq!(
            find_constructor(&point, &sig("void", &["int", "int"]), &mut problems).to_string(),
            "(int,int)Point"
        );
        assert_eq!(find_constructor(&point, &Signature::Top, &mut problems), Signature::Top);
        assert!(problems.is_empty());

        assert_eq!(
            find_constructor(&point, &sig("int", &[]), &mut problems),
            Signature::Top
        );
        assert_eq!(problems.messages(), ["Expected return type void but got int."]);
        assert_eq!(problems.iter().next().map(|p| p.anchor), Some(Anchor::Argument(1)));
    }

    #[test]
    fn field_accessors() {
        let mut problems = Problems::new();
        let point = Type::parse("Point");
        let int = Type::parse("int");

        assert_eq!(find_getter(&point, &int, &mut problems).to_string(), "(Point)int");
        assert_eq!(find_setter(&point, &int, &mut problems).to_string(), "(Point,int)void");
        assert_eq!(find_static_getter(&point, &int, &mut problems).to_string(), "()int");
        assert_eq!(find_static_setter(&point, &int, &mut problems).to_string(), "(int)void");
        assert!(problems.is_empty());

        assert_eq!(
            find_getter(&point, &Type::Void, &mut problems).to_string(),
            "(Point)⊤"
        );
        assert_eq!(problems.messages(), ["Type must not be void."]);
        assert_eq!(problems.iter().next().map(|p| p.anchor), Some(Anchor::Argument(2)));
    }

    #[test]
    fn var_handles() {
        let mut problems = Problems::new();
        let holder = Type::parse("LookupFindVarHandle");

        assert_eq!(
            find_var_handle(&holder, &Type::parse("int"), &mut problems).to_string(),
            "(LookupFindVarHandle)(int)"
        );
        assert_eq!(
            find_static_var_handle(&holder, &Type::parse("Boolean"), &mut problems).to_string(),
            "()(Boolean)"
        );
        assert!(problems.is_empty());

        assert_eq!(
            find_var_handle(&holder, &Type::Void, &mut problems).to_string(),
            "(LookupFindVarHandle)(⊤)"
        );
        assert_eq!(
            find_var_handle(&Type::parse("int"), &Type::parse("int"), &mut problems).to_string(),
            "(⊤)(int)"
        );
        assert_eq!(
            find_static_var_handle(&Type::Void, &Type::Void, &mut problems).to_string(),
            "()(⊤)"
        );
        assert_eq!(problems.len(), 4);
    }
}
