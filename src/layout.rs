use crate::error::{Anchor, Problems};
use crate::lattice::Lattice;
use crate::types::{Primitive, Type};
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LayoutName {
    Unnamed,
    Named(Box<str>),
    /// Named, but the name is not a compile-time constant.
    Unknown,
}

impl fmt::Display for LayoutName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutName::Unnamed => Ok(()),
            LayoutName::Named(name) => write!(f, "({})", name),
            LayoutName::Unknown => f.write_str("({⊤})"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ValueLayout {
    pub carrier: Primitive,
    pub byte_alignment: u64,
    pub name: LayoutName,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AddressLayout {
    /// Platform dependent, unknown unless configured.
    pub byte_size: Option<u64>,
    pub byte_alignment: Option<u64>,
    pub target: Option<Arc<Layout>>,
    pub name: LayoutName,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PaddingLayout {
    pub byte_size: u64,
    pub byte_alignment: u64,
    pub name: LayoutName,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SequenceLayout {
    pub element_count: Option<u64>,
    pub element: Arc<Layout>,
    /// Set by `withByteAlignment`, otherwise the element's alignment applies.
    pub byte_alignment: Option<u64>,
    pub name: LayoutName,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupLayout {
    pub members: Vec<Arc<Layout>>,
    /// Set by `withByteAlignment`, otherwise the largest member alignment applies.
    pub byte_alignment: Option<u64>,
    pub name: LayoutName,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Layout {
    Top,
    Value(ValueLayout),
    Address(AddressLayout),
    Padding(PaddingLayout),
    Sequence(SequenceLayout),
    Struct(GroupLayout),
    Union(GroupLayout),
}

impl Layout {
    pub fn value(carrier: Primitive) -> Layout {
        Layout::Value(ValueLayout {
            carrier,
            byte_alignment: carrier.byte_size(),
            name: LayoutName::Unnamed,
        })
    }

    pub fn address(byte_size: Option<u64>) -> Layout {
        Layout::Address(AddressLayout {
            byte_size,
            byte_alignment: byte_size,
            target: None,
            name: LayoutName::Unnamed,
        })
    }

    /// The `ValueLayout` constants, e.g. `JAVA_INT` or `ADDRESS_UNALIGNED`.
    pub fn predefined(constant: &str, address_size: Option<u64>) -> Option<Layout> {
        let (base, unaligned) = match constant.strip_suffix("_UNALIGNED") {
            Some(base) => (base, true),
            None => (constant, false),
        };

        let layout = match base {
            "ADDRESS" => Layout::address(address_size),
            _ => {
                let carrier = base
                    .strip_prefix("JAVA_")
                    .and_then(|name| Primitive::from_name(&name.to_ascii_lowercase()))?;
                Layout::value(carrier)
            }
        };

        if unaligned {
            Some(layout.realigned(1))
        } else {
            Some(layout)
        }
    }

    pub fn byte_size(&self) -> Option<u64> {
        match self {
            Layout::Top => None,
            Layout::Value(v) => Some(v.carrier.byte_size()),
            Layout::Address(a) => a.byte_size,
            Layout::Padding(p) => Some(p.byte_size),
            Layout::Sequence(s) => s.element_count?.checked_mul(s.element.byte_size()?),
            Layout::Struct(g) => g
                .members
                .iter()
                .try_fold(0u64, |total, m| total.checked_add(m.byte_size()?)),
            Layout::Union(g) => g
                .members
                .iter()
                .try_fold(0u64, |max, m| Some(max.max(m.byte_size()?))),
        }
    }

    pub fn byte_alignment(&self) -> Option<u64> {
        match self {
            Layout::Top => None,
            Layout::Value(v) => Some(v.byte_alignment),
            Layout::Address(a) => a.byte_alignment,
            Layout::Padding(p) => Some(p.byte_alignment),
            Layout::Sequence(s) => s.byte_alignment.or_else(|| s.element.byte_alignment()),
            Layout::Struct(g) | Layout::Union(g) => {
                g.byte_alignment.or_else(|| self.member_alignment())
            }
        }
    }

    /// The smallest alignment the nested layouts still allow.
    fn member_alignment(&self) -> Option<u64> {
        match self {
            Layout::Sequence(s) => s.element.byte_alignment(),
            Layout::Struct(g) | Layout::Union(g) => g
                .members
                .iter()
                .try_fold(1u64, |max, m| Some(max.max(m.byte_alignment()?))),
            _ => Some(1),
        }
    }

    pub fn element_count(&self) -> Option<u64> {
        match self {
            Layout::Sequence(s) => s.element_count,
            _ => None,
        }
    }

    pub fn name(&self) -> LayoutName {
        match self {
            Layout::Top => LayoutName::Unknown,
            Layout::Value(v) => v.name.clone(),
            Layout::Address(a) => a.name.clone(),
            Layout::Padding(p) => p.name.clone(),
            Layout::Sequence(s) => s.name.clone(),
            Layout::Struct(g) | Layout::Union(g) => g.name.clone(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Layout::Top => "MemoryLayout",
            Layout::Value(_) => "ValueLayout",
            Layout::Address(_) => "AddressLayout",
            Layout::Padding(_) => "PaddingLayout",
            Layout::Sequence(_) => "SequenceLayout",
            Layout::Struct(_) => "StructLayout",
            Layout::Union(_) => "UnionLayout",
        }
    }

    /// The Java type a value of this layout is passed as.
    pub fn carrier(&self) -> Type {
        match self {
            Layout::Value(v) => Type::Primitive(v.carrier),
            Layout::Address(_) | Layout::Sequence(_) | Layout::Struct(_) | Layout::Union(_) => {
                Type::memory_segment()
            }
            Layout::Padding(_) | Layout::Top => Type::Top,
        }
    }

    pub fn with_name(&self, name: Option<&str>) -> Layout {
        let name = match name {
            Some(name) => LayoutName::Named(name.into()),
            None => LayoutName::Unknown,
        };
        self.renamed(name)
    }

    pub fn without_name(&self) -> Layout {
        self.renamed(LayoutName::Unnamed)
    }

    fn renamed(&self, name: LayoutName) -> Layout {
        let mut layout = self.clone();
        match &mut layout {
            Layout::Top => {}
            Layout::Value(v) => v.name = name,
            Layout::Address(a) => a.name = name,
            Layout::Padding(p) => p.name = name,
            Layout::Sequence(s) => s.name = name,
            Layout::Struct(g) | Layout::Union(g) => g.name = name,
        }
        layout
    }

    fn realigned(&self, alignment: u64) -> Layout {
        let mut layout = self.clone();
        match &mut layout {
            Layout::Top => {}
            Layout::Value(v) => v.byte_alignment = alignment,
            Layout::Address(a) => a.byte_alignment = Some(alignment),
            Layout::Padding(p) => p.byte_alignment = alignment,
            Layout::Sequence(s) => s.byte_alignment = Some(alignment),
            Layout::Struct(g) | Layout::Union(g) => g.byte_alignment = Some(alignment),
        }
        layout
    }

    fn has_natural_alignment(&self) -> bool {
        match self {
            Layout::Top => true,
            Layout::Sequence(s) => match s.byte_alignment {
                Some(alignment) => s.element.byte_alignment() == Some(alignment),
                None => true,
            },
            Layout::Padding(p) => p.byte_alignment == 1,
            _ => match (self.byte_size(), self.byte_alignment()) {
                (Some(size), Some(alignment)) => size == alignment,
                _ => true,
            },
        }
    }
}

impl Lattice for Layout {
    fn top() -> Self {
        Layout::Top
    }

    fn is_top(&self) -> bool {
        matches!(self, Layout::Top)
    }
}

fn write_size(f: &mut fmt::Formatter<'_>, size: Option<u64>) -> fmt::Result {
    match size {
        Some(size) => write!(f, "{}", size),
        None => f.write_str("?"),
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Layout::Top = self {
            return f.write_str("⊤");
        }

        if !self.has_natural_alignment() {
            write_size(f, self.byte_alignment())?;
            f.write_str("%")?;
        }

        match self {
            Layout::Top => {}
            Layout::Value(v) => write!(f, "{}{}", v.carrier, v.carrier.byte_size())?,
            Layout::Address(a) => {
                f.write_str("a")?;
                write_size(f, a.byte_size)?;
                if let Some(target) = &a.target {
                    write!(f, ":{}", target)?;
                }
            }
            Layout::Padding(p) => write!(f, "x{}", p.byte_size)?,
            Layout::Sequence(s) => {
                f.write_str("[")?;
                write_size(f, s.element_count)?;
                write!(f, ":{}]", s.element)?;
            }
            Layout::Struct(g) | Layout::Union(g) => {
                let separator = if let Layout::Union(_) = self { "|" } else { "" };
                let members = g
                    .members
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(separator);
                write!(f, "[{}]", members)?;
            }
        }

        write!(f, "{}", self.name())
    }
}

pub fn padding_layout(byte_size: Option<i64>, problems: &mut Problems) -> Layout {
    match byte_size {
        None => Layout::Top,
        Some(size) if size <= 0 => {
            problems.bounds(
                Anchor::Argument(0),
                format!("Argument must be > 0 but is {}.", size),
            );
            Layout::Top
        }
        Some(size) => Layout::Padding(PaddingLayout {
            byte_size: size as u64,
            byte_alignment: 1,
            name: LayoutName::Unnamed,
        }),
    }
}

pub fn sequence_layout(element_count: Option<i64>, element: &Layout, problems: &mut Problems) -> Layout {
    let element_count = match element_count {
        Some(count) if count < 0 => {
            problems.structural(
                Anchor::Argument(0),
                format!("Argument must be >= 0 but is {}.", count),
            );
            return Layout::Top;
        }
        count => count.map(|c| c as u64),
    };

    if element.is_top() {
        return Layout::Top;
    }

    if let (Some(size), Some(alignment)) = (element.byte_size(), element.byte_alignment()) {
        if alignment != 0 && size % alignment != 0 {
            problems.structural(
                Anchor::Argument(1),
                format!(
                    "Element layout size {} is not a multiple of its byte alignment {}.",
                    size, alignment
                ),
            );
            return Layout::Top;
        }

        if let Some(count) = element_count {
            let fits = count
                .checked_mul(size)
                .map_or(false, |total| total <= i64::MAX as u64);
            if !fits {
                problems.structural(
                    Anchor::Argument(0),
                    format!(
                        "Sequence of {} elements of {} bytes overflows the addressable size.",
                        count, size
                    ),
                );
                return Layout::Top;
            }
        }
    }

    Layout::Sequence(SequenceLayout {
        element_count,
        element: Arc::new(element.clone()),
        byte_alignment: None,
        name: LayoutName::Unnamed,
    })
}

/// `MemoryLayout.structLayout(members...)`. Each member must start at an offset that is a
/// multiple of its alignment.
pub fn struct_layout(members: &[Layout], problems: &mut Problems) -> Layout {
    let mut offset = Some(0u64);

    for (i, member) in members.iter().enumerate() {
        if let (Some(at), Some(alignment)) = (offset, member.byte_alignment()) {
            if alignment != 0 && at % alignment != 0 {
                problems.structural(
                    Anchor::Argument(i),
                    format!(
                        "Layout requires a byte alignment of {} but is inserted at an offset of {}.",
                        alignment, at
                    ),
                );
                return Layout::Top;
            }
        }

        offset = offset.zip(member.byte_size()).and_then(|(at, size)| at.checked_add(size));
    }

    Layout::Struct(group(members))
}

pub fn union_layout(members: &[Layout]) -> Layout {
    Layout::Union(group(members))
}

fn group(members: &[Layout]) -> GroupLayout {
    GroupLayout {
        members: members.iter().cloned().map(Arc::new).collect(),
        byte_alignment: None,
        name: LayoutName::Unnamed,
    }
}

pub fn with_byte_alignment(layout: &Layout, alignment: Option<i64>, problems: &mut Problems) -> Layout {
    let Some(alignment) = alignment else {
        return Layout::Top;
    };

    if alignment <= 0 || (alignment as u64).count_ones() != 1 {
        problems.bounds(
            Anchor::Argument(0),
            format!("Byte alignment must be a power of two but is {}.", alignment),
        );
        return Layout::Top;
    }

    let alignment = alignment as u64;

    if let Layout::Sequence(_) | Layout::Struct(_) | Layout::Union(_) = layout {
        if layout.member_alignment().map_or(false, |required| alignment < required) {
            problems.structural(
                Anchor::Argument(0),
                format!(
                    "This layout cannot be {} byte aligned due to one of its member layouts.",
                    alignment
                ),
            );
            return Layout::Top;
        }
    }

    layout.realigned(alignment)
}

/// `address.withTargetLayout(target)`, or `withoutTargetLayout()` when `target` is `None`.
pub fn with_target_layout(layout: &Layout, target: Option<&Layout>, problems: &mut Problems) -> Layout {
    match layout {
        Layout::Address(address) => Layout::Address(AddressLayout {
            target: target.map(|t| Arc::new(t.clone())),
            ..address.clone()
        }),
        Layout::Top => Layout::Top,
        other => {
            problems.type_mismatch(
                Anchor::Receiver,
                format!("Expected an AddressLayout but got a {}.", other.kind_name()),
            );
            Layout::Top
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn java(name: &str) -> Layout {
        Layout::predefined(name, None).unwrap()
    }

    #[test]
    fn predefined_layouts() {
        assert_eq!(java("JAVA_INT").to_string(), "int4");
        assert_eq!(java("JAVA_BOOLEAN").to_string(), "boolean1");
        assert_eq!(java("JAVA_INT_UNALIGNED").to_string(), "1%int4");
        assert_eq!(java("ADDRESS").to_string(), "a?");
        assert_eq!(Layout::predefined("ADDRESS", Some(8)).unwrap().to_string(), "a8");
        assert_eq!(Layout::predefined("JAVA_WORD", None), None);
    }

    #[test]
    fn names() {
        let jiu = java("JAVA_INT_UNALIGNED").with_name(Some("jiu"));
        assert_eq!(jiu.to_string(), "1%int4(jiu)");

        let unknown = java("JAVA_LONG").with_name(None);
        assert_eq!(unknown.to_string(), "long8({⊤})");
        assert_eq!(unknown.without_name().to_string(), "long8");
    }

    #[test]
    fn struct_alignment() {
        let mut problems = Problems::new();

        let misaligned = struct_layout(&[java("JAVA_SHORT"), java("JAVA_LONG")], &mut problems);
        assert_eq!(misaligned, Layout::Top);
        assert_eq!(
            problems.messages(),
            ["Layout requires a byte alignment of 8 but is inserted at an offset of 2."]
        );

        let mut problems = Problems::new();
        let padding = padding_layout(Some(6), &mut problems);
        let padded = struct_layout(&[java("JAVA_SHORT"), padding, java("JAVA_LONG")], &mut problems);
        assert_eq!(padded.to_string(), "8%[short2x6long8]");
        assert_eq!(padded.byte_size(), Some(16));
        assert!(problems.is_empty());
    }

    #[test]
    fn group_rendering() {
        let mut problems = Problems::new();

        let two_ints = struct_layout(&[java("JAVA_INT"), java("JAVA_INT")], &mut problems);
        assert_eq!(two_ints.to_string(), "4%[int4int4]");

        let mixed = struct_layout(&[java("JAVA_INT"), java("JAVA_LONG_UNALIGNED")], &mut problems);
        assert_eq!(mixed.to_string(), "4%[int41%long8]");

        assert_eq!(struct_layout(&[], &mut problems).to_string(), "1%[]");

        let union = union_layout(&[java("JAVA_INT"), java("JAVA_LONG")]);
        assert_eq!(union.to_string(), "[int4|long8]");
        assert_eq!(
            struct_layout(&[union.clone(), union], &mut problems).to_string(),
            "8%[[int4|long8][int4|long8]]"
        );
        assert!(problems.is_empty());
    }

    #[test]
    fn sequences() {
        let mut problems = Problems::new();

        assert_eq!(sequence_layout(Some(0), &java("JAVA_INT"), &mut problems).to_string(), "[0:int4]");
        assert_eq!(sequence_layout(None, &java("JAVA_INT"), &mut problems).to_string(), "[?:int4]");
        assert!(problems.is_empty());

        assert_eq!(sequence_layout(Some(-10), &java("JAVA_INT"), &mut problems), Layout::Top);
        assert_eq!(problems.messages(), ["Argument must be >= 0 but is -10."]);

        let mut problems = Problems::new();
        assert_eq!(
            sequence_layout(Some(i64::MAX >> 1), &java("JAVA_LONG"), &mut problems),
            Layout::Top
        );
        assert_eq!(problems.len(), 1);

        let mut problems = Problems::new();
        let unpadded = struct_layout(&[java("JAVA_LONG"), java("JAVA_INT")], &mut problems);
        assert_eq!(unpadded.to_string(), "8%[long8int4]");
        assert_eq!(sequence_layout(Some(1), &unpadded, &mut problems), Layout::Top);
        assert_eq!(problems.len(), 1);
    }

    #[test]
    fn byte_alignment_override() {
        let mut problems = Problems::new();
        let two_ints = struct_layout(&[java("JAVA_INT"), java("JAVA_INT")], &mut problems);

        assert_eq!(
            with_byte_alignment(&two_ints, Some(8), &mut problems).to_string(),
            "8%[int4int4]"
        );
        assert!(problems.is_empty());

        let union = union_layout(&[java("JAVA_INT"), java("JAVA_LONG")]);
        assert_eq!(with_byte_alignment(&union, Some(4), &mut problems), Layout::Top);
        assert_eq!(
            problems.messages(),
            ["This layout cannot be 4 byte aligned due to one of its member layouts."]
        );

        let mut problems = Problems::new();
        assert_eq!(with_byte_alignment(&java("JAVA_INT"), Some(3), &mut problems), Layout::Top);
        assert_eq!(problems.len(), 1);

        let seq = sequence_layout(Some(10), &java("JAVA_INT"), &mut problems);
        assert_eq!(
            with_byte_alignment(&seq, Some(16), &mut problems).to_string(),
            "16%[10:int4]"
        );
    }

    #[test]
    fn address_targets() {
        let mut problems = Problems::new();
        let two_ints = struct_layout(&[java("JAVA_INT"), java("JAVA_INT")], &mut problems);

        let address = with_target_layout(&java("ADDRESS"), Some(&two_ints), &mut problems);
        assert_eq!(address.to_string(), "a?:4%[int4int4]");
        assert_eq!(
            with_target_layout(&address, None, &mut problems).to_string(),
            "a?"
        );
        assert!(problems.is_empty());
    }
}
