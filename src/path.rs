//! Layout paths and everything derived from walking them: var handles, byte offsets and
//! byte offset handles.

use crate::accessor::AccessorSignature;
use crate::error::{Anchor, Problems};
use crate::lattice::{Lattice, LatticeList, TriState};
use crate::layout::{Layout, LayoutName};
use crate::signature::Signature;
use crate::types::{Primitive, Type};
use std::fmt;
use tracing::trace;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathElement {
    Top,
    GroupByIndex(Option<u64>),
    GroupByName(Option<Box<str>>),
    SequenceAny,
    SequenceAt(Option<u64>),
    SequenceStartStep { start: Option<u64>, step: Option<i64> },
    Dereference,
}

impl PathElement {
    fn family(&self) -> &'static str {
        match self {
            PathElement::GroupByIndex(_) | PathElement::GroupByName(_) => "group",
            PathElement::Dereference => "dereference",
            _ => "sequence",
        }
    }
}

impl Lattice for PathElement {
    fn top() -> Self {
        PathElement::Top
    }

    fn is_top(&self) -> bool {
        matches!(self, PathElement::Top)
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Top => f.write_str("{⊤}"),
            PathElement::GroupByIndex(Some(i)) => write!(f, "groupElement({})", i),
            PathElement::GroupByIndex(None) => f.write_str("groupElement(index?)"),
            PathElement::GroupByName(Some(name)) => write!(f, "groupElement({})", name),
            PathElement::GroupByName(None) => f.write_str("groupElement(name?)"),
            PathElement::SequenceAny => f.write_str("sequenceElement()"),
            PathElement::SequenceAt(Some(i)) => write!(f, "sequenceElement({})", i),
            PathElement::SequenceAt(None) => f.write_str("sequenceElement(index?)"),
            PathElement::SequenceStartStep { start, step } => {
                let start = start.map_or_else(|| "?".to_string(), |s| s.to_string());
                let step = step.map_or_else(|| "?".to_string(), |s| s.to_string());
                write!(f, "sequenceElement({}, {})", start, step)
            }
            PathElement::Dereference => f.write_str("dereferenceElement()"),
        }
    }
}

fn non_negative(value: Option<i64>, anchor: Anchor, problems: &mut Problems) -> Result<Option<u64>, ()> {
    match value {
        Some(v) if v < 0 => {
            problems.bounds(anchor, format!("Argument must be >= 0 but is {}.", v));
            Err(())
        }
        v => Ok(v.map(|v| v as u64)),
    }
}

pub fn group_element_index(index: Option<i64>, problems: &mut Problems) -> PathElement {
    match non_negative(index, Anchor::Argument(0), problems) {
        Ok(index) => PathElement::GroupByIndex(index),
        Err(()) => PathElement::Top,
    }
}

pub fn group_element_name(name: Option<&str>) -> PathElement {
    PathElement::GroupByName(name.map(Into::into))
}

pub fn sequence_element() -> PathElement {
    PathElement::SequenceAny
}

pub fn sequence_element_at(index: Option<i64>, problems: &mut Problems) -> PathElement {
    match non_negative(index, Anchor::Argument(0), problems) {
        Ok(index) => PathElement::SequenceAt(index),
        Err(()) => PathElement::Top,
    }
}

/// `sequenceElement(start, step)`. Both arguments are checked, independent of any layout.
pub fn sequence_element_range(start: Option<i64>, step: Option<i64>, problems: &mut Problems) -> PathElement {
    let start = non_negative(start, Anchor::Argument(0), problems);

    let step_ok = match step {
        Some(0) => {
            problems.bounds(Anchor::Argument(1), "Argument must be != 0 but is 0.");
            false
        }
        _ => true,
    };

    match start {
        Ok(start) if step_ok => PathElement::SequenceStartStep { start, step },
        _ => PathElement::Top,
    }
}

pub fn dereference_element() -> PathElement {
    PathElement::Dereference
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Deriving a var handle, dereferencing is allowed.
    Access,
    /// Computing an offset, the path may not leave the root layout.
    Offset,
}

#[derive(Clone, Debug, PartialEq)]
enum Walk {
    /// A path element itself is unknown.
    Top,
    Reached {
        layout: Layout,
        /// One `long` per open index.
        open_indices: usize,
        offset: Option<u64>,
    },
    /// The path could not be followed to its end: the layout was unknown or a problem
    /// was reported. The open indices up to that point are still known.
    Stuck { open_indices: usize },
}

fn walk(root: &Layout, path: &[PathElement], mode: Mode, problems: &mut Problems) -> Walk {
    if path.iter().any(|element| element.is_top()) {
        return Walk::Top;
    }

    let mut current = root.clone();
    let mut open_indices = 0;
    let mut offset = Some(0u64);

    for (i, element) in path.iter().enumerate() {
        let anchor = Anchor::Argument(i);

        if current.is_top() {
            return Walk::Stuck { open_indices };
        }

        let next = match (element, &current) {
            (PathElement::GroupByIndex(index), Layout::Struct(g) | Layout::Union(g)) => {
                let Some(index) = *index else {
                    return Walk::Stuck { open_indices };
                };

                let Some(member) = g.members.get(index as usize) else {
                    problems.bounds(
                        anchor,
                        format!(
                            "Group element at index {} exceeds the number of member layouts {}.",
                            index,
                            g.members.len()
                        ),
                    );
                    return Walk::Stuck { open_indices };
                };

                if let Layout::Struct(_) = current {
                    let preceding = g.members[..index as usize]
                        .iter()
                        .try_fold(0u64, |total, m| total.checked_add(m.byte_size()?));
                    offset = offset.zip(preceding).and_then(|(a, b)| a.checked_add(b));
                }

                member.as_ref().clone()
            }
            (PathElement::GroupByName(name), Layout::Struct(g) | Layout::Union(g)) => {
                let Some(name) = name else {
                    return Walk::Stuck { open_indices };
                };

                let mut preceding = Some(0u64);
                let mut found = None;

                for member in &g.members {
                    match member.name() {
                        // This member may carry the name we are looking for.
                        LayoutName::Unknown => return Walk::Stuck { open_indices },
                        LayoutName::Named(n) if n == *name => {
                            found = Some(member.as_ref().clone());
                            break;
                        }
                        _ => {}
                    }
                    preceding = preceding.zip(member.byte_size()).and_then(|(a, b)| a.checked_add(b));
                }

                let Some(member) = found else {
                    problems.structural(
                        anchor,
                        format!(
                            "Group layout does not have a member layout with name {}.",
                            name
                        ),
                    );
                    return Walk::Stuck { open_indices };
                };

                if let Layout::Struct(_) = current {
                    offset = offset.zip(preceding).and_then(|(a, b)| a.checked_add(b));
                }

                member
            }
            (PathElement::SequenceAny | PathElement::SequenceStartStep { .. }, Layout::Sequence(s)) => {
                open_indices += 1;
                offset = None;
                s.element.as_ref().clone()
            }
            // The index is not checked against the element count.
            (PathElement::SequenceAt(index), Layout::Sequence(s)) => {
                let skipped = index.zip(s.element.byte_size()).and_then(|(i, size)| i.checked_mul(size));
                offset = offset.zip(skipped).and_then(|(a, b)| a.checked_add(b));
                s.element.as_ref().clone()
            }
            (PathElement::Dereference, Layout::Address(a)) => {
                if mode == Mode::Offset {
                    problems.type_mismatch(anchor, "Dereference path element is not allowed here.");
                    return Walk::Stuck { open_indices };
                }

                let Some(target) = &a.target else {
                    problems.type_mismatch(
                        anchor,
                        "Cannot dereference an AddressLayout without a target layout.",
                    );
                    return Walk::Stuck { open_indices };
                };

                offset = Some(0);
                target.as_ref().clone()
            }
            (element, layout) => {
                problems.type_mismatch(
                    anchor,
                    format!(
                        "A {} path element cannot be applied to a {}.",
                        element.family(),
                        layout.kind_name()
                    ),
                );
                return Walk::Stuck { open_indices };
            }
        };

        trace!(step = %element, layout = %next, "followed path element");
        current = next;
    }

    if current.is_top() {
        return Walk::Stuck { open_indices };
    }

    Walk::Reached {
        layout: current,
        open_indices,
        offset,
    }
}

fn long() -> Type {
    Type::Primitive(Primitive::Long)
}

fn accessor(root: &Layout, path: &[PathElement], leading: Vec<Type>, problems: &mut Problems) -> AccessorSignature {
    let coordinates = |open_indices: usize| {
        let mut coordinates = leading.clone();
        coordinates.extend(std::iter::repeat_with(long).take(open_indices));
        coordinates
    };

    match walk(root, path, Mode::Access, problems) {
        Walk::Top => AccessorSignature::Top,
        Walk::Stuck { open_indices } => AccessorSignature::incomplete(coordinates(open_indices)),
        Walk::Reached {
            layout: layout @ (Layout::Value(_) | Layout::Address(_)),
            open_indices,
            ..
        } => AccessorSignature::new(coordinates(open_indices), layout.carrier()),
        Walk::Reached { .. } => {
            problems.type_mismatch(
                Anchor::Call,
                "The layout targeted by the given path is not a 'ValueLayout'.",
            );
            AccessorSignature::Top
        }
    }
}

pub fn var_handle(root: &Layout, path: &[PathElement], problems: &mut Problems) -> AccessorSignature {
    accessor(root, path, vec![Type::memory_segment()], problems)
}

/// `layout.arrayElementVarHandle(path...)`, which adds a leading index over an array of
/// `root`.
pub fn array_element_var_handle(root: &Layout, path: &[PathElement], problems: &mut Problems) -> AccessorSignature {
    accessor(root, path, vec![Type::memory_segment(), long()], problems)
}

pub fn byte_offset(root: &Layout, path: &[PathElement], problems: &mut Problems) -> Option<u64> {
    match walk(root, path, Mode::Offset, problems) {
        Walk::Reached {
            offset,
            open_indices: 0,
            ..
        } => offset,
        _ => None,
    }
}

/// `layout.byteOffsetHandle(path...)`: takes a base offset and one index per open
/// sequence element.
pub fn byte_offset_handle(root: &Layout, path: &[PathElement], problems: &mut Problems) -> Signature {
    match walk(root, path, Mode::Offset, problems) {
        Walk::Top => Signature::Top,
        Walk::Reached { open_indices, .. } => {
            Signature::new(long(), std::iter::repeat_with(long).take(open_indices + 1).collect())
        }
        Walk::Stuck { open_indices } => {
            let known = std::iter::repeat_with(long)
                .take(open_indices + 1)
                .enumerate()
                .collect();
            Signature::from_parts(LatticeList::incomplete(known), Type::Top, TriState::No)
        }
    }
}

pub fn select(root: &Layout, path: &[PathElement], problems: &mut Problems) -> Layout {
    match walk(root, path, Mode::Offset, problems) {
        Walk::Reached { layout, .. } => layout,
        Walk::Top | Walk::Stuck { .. } => Layout::Top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{sequence_layout, struct_layout, union_layout, with_target_layout};

    fn java(name: &str) -> Layout {
        Layout::predefined(name, None).unwrap()
    }

    fn named(name: &str, layout: &str) -> Layout {
        java(layout).with_name(Some(name))
    }

    fn name(n: &str) -> PathElement {
        group_element_name(Some(n))
    }

    #[test]
    fn element_construction() {
        let mut problems = Problems::new();

        assert_eq!(sequence_element_at(Some(-1), &mut problems), PathElement::Top);
        assert_eq!(group_element_index(Some(-1), &mut problems), PathElement::Top);
        assert_eq!(sequence_element_range(Some(0), Some(0), &mut problems), PathElement::Top);
        assert_eq!(sequence_element_range(Some(-1), Some(1), &mut problems), PathElement::Top);
        assert_eq!(
            problems.messages(),
            [
                "Argument must be >= 0 but is -1.",
                "Argument must be >= 0 but is -1.",
                "Argument must be != 0 but is 0.",
                "Argument must be >= 0 but is -1.",
            ]
        );

        let range = sequence_element_range(Some(5), Some(-1), &mut problems);
        assert_eq!(range.to_string(), "sequenceElement(5, -1)");
        assert_eq!(group_element_index(None, &mut problems).to_string(), "groupElement(index?)");
        assert_eq!(PathElement::Top.to_string(), "{⊤}");
    }

    #[test]
    fn sequence_paths() {
        let mut problems = Problems::new();
        let seq = sequence_layout(Some(10), &java("JAVA_INT"), &mut problems);

        assert_eq!(
            var_handle(&seq, &[sequence_element()], &mut problems).to_string(),
            "(MemorySegment,long)(int)"
        );
        assert_eq!(
            var_handle(&seq, &[PathElement::SequenceAt(Some(12345))], &mut problems).to_string(),
            "(MemorySegment)(int)"
        );
        assert!(problems.is_empty());

        assert_eq!(var_handle(&seq, &[], &mut problems), AccessorSignature::Top);
        assert_eq!(
            problems.messages(),
            ["The layout targeted by the given path is not a 'ValueLayout'."]
        );
    }

    #[test]
    fn mismatched_steps() {
        let mut problems = Problems::new();
        let seq = sequence_layout(Some(10), &java("JAVA_INT"), &mut problems);

        let twice = var_handle(&seq, &[sequence_element(), sequence_element()], &mut problems);
        assert_eq!(twice.to_string(), "(0=MemorySegment,1=long)(⊤)");
        assert_eq!(
            problems.messages(),
            ["A sequence path element cannot be applied to a ValueLayout."]
        );
        assert_eq!(problems.iter().next().map(|p| p.anchor), Some(Anchor::Argument(1)));

        let mut problems = Problems::new();
        let structure = struct_layout(&[java("JAVA_INT")], &mut problems);
        let out_of_bounds = var_handle(&structure, &[PathElement::GroupByIndex(Some(1))], &mut problems);
        assert_eq!(out_of_bounds.to_string(), "(0=MemorySegment)(⊤)");
        assert_eq!(
            problems.messages(),
            ["Group element at index 1 exceeds the number of member layouts 1."]
        );

        assert_eq!(
            var_handle(&Layout::Top, &[], &mut problems).to_string(),
            "(0=MemorySegment)(⊤)"
        );
    }

    #[test]
    fn lookup_by_name() {
        let mut problems = Problems::new();

        let known = union_layout(&[named("a", "JAVA_INT"), named("b", "JAVA_BOOLEAN")]);
        assert_eq!(
            var_handle(&known, &[name("b")], &mut problems).to_string(),
            "(MemorySegment)(boolean)"
        );

        let duplicate = union_layout(&[named("a", "JAVA_INT"), named("a", "JAVA_BOOLEAN")]);
        assert_eq!(
            var_handle(&duplicate, &[name("a")], &mut problems).to_string(),
            "(MemorySegment)(int)"
        );

        let shadowed = union_layout(&[java("JAVA_INT").with_name(None), named("a", "JAVA_BOOLEAN")]);
        assert_eq!(
            var_handle(&shadowed, &[name("a")], &mut problems).to_string(),
            "(0=MemorySegment)(⊤)"
        );

        let trailing = union_layout(&[named("a", "JAVA_INT"), java("JAVA_BOOLEAN").with_name(None)]);
        assert_eq!(
            var_handle(&trailing, &[name("a")], &mut problems).to_string(),
            "(MemorySegment)(int)"
        );
        assert_eq!(
            var_handle(&trailing, &[name("x")], &mut problems).to_string(),
            "(0=MemorySegment)(⊤)"
        );
        assert!(problems.is_empty());

        var_handle(&known, &[name("x")], &mut problems);
        assert_eq!(
            problems.messages(),
            ["Group layout does not have a member layout with name x."]
        );
    }

    #[test]
    fn dereference() {
        let mut problems = Problems::new();
        let target = union_layout(&[named("a", "JAVA_INT"), named("b", "JAVA_BOOLEAN")]);
        let address = with_target_layout(&java("ADDRESS"), Some(&target), &mut problems);

        assert_eq!(
            var_handle(&address, &[dereference_element(), name("a")], &mut problems).to_string(),
            "(MemorySegment)(int)"
        );
        assert!(problems.is_empty());

        let handle = byte_offset_handle(&address, &[dereference_element()], &mut problems);
        assert_eq!(handle.to_string(), "(0=long)⊤");
        assert_eq!(problems.messages(), ["Dereference path element is not allowed here."]);
    }

    #[test]
    fn offsets() {
        let mut problems = Problems::new();
        let pair = struct_layout(&[java("JAVA_INT"), java("JAVA_INT")], &mut problems);
        let seq = sequence_layout(Some(10), &pair, &mut problems);

        assert_eq!(
            byte_offset_handle(&pair, &[PathElement::GroupByIndex(Some(1))], &mut problems).to_string(),
            "(long)long"
        );
        assert_eq!(
            byte_offset_handle(&seq, &[sequence_element()], &mut problems).to_string(),
            "(long,long)long"
        );
        assert_eq!(
            byte_offset_handle(&seq, &[PathElement::SequenceAt(Some(5))], &mut problems).to_string(),
            "(long)long"
        );

        let path = [PathElement::SequenceAt(Some(5)), PathElement::GroupByIndex(Some(1))];
        assert_eq!(byte_offset(&seq, &path, &mut problems), Some(44));
        assert_eq!(byte_offset(&seq, &[sequence_element()], &mut problems), None);
        assert_eq!(select(&seq, &path, &mut problems).to_string(), "int4");
        assert!(problems.is_empty());
    }

    #[test]
    fn offsets_past_u64_are_unknown() {
        let mut problems = Problems::new();
        let inner = sequence_layout(Some(4), &java("JAVA_BYTE"), &mut problems);
        let outer = sequence_layout(Some(10), &inner, &mut problems);

        // The index is not checked against the count, so the sum may exceed u64.
        let path = [
            PathElement::SequenceAt(Some((1 << 62) - 1)),
            PathElement::SequenceAt(Some(5)),
        ];
        assert_eq!(byte_offset(&outer, &path, &mut problems), None);
        assert_eq!(select(&outer, &path, &mut problems).to_string(), "byte1");
        assert!(problems.is_empty());
    }

    #[test]
    fn layout_array_elements() {
        let mut problems = Problems::new();
        let pair = struct_layout(&[named("i", "JAVA_INT"), named("f", "JAVA_FLOAT")], &mut problems);
        let seq = sequence_layout(Some(123), &pair, &mut problems);

        assert_eq!(
            array_element_var_handle(&pair, &[name("f")], &mut problems).to_string(),
            "(MemorySegment,long)(float)"
        );
        assert_eq!(
            array_element_var_handle(&seq, &[sequence_element(), name("i")], &mut problems).to_string(),
            "(MemorySegment,long,long)(int)"
        );
        assert_eq!(
            array_element_var_handle(&Layout::Top, &[], &mut problems).to_string(),
            "(0=MemorySegment,1=long)(⊤)"
        );
    }
}
