use crate::error::{Anchor, Problems};
use crate::lattice::{Lattice, LatticeList, TriState};
use crate::layout::Layout;
use crate::method_type::{non_negative_index, Index};
use crate::signature::Signature;
use crate::types::Type;
use std::fmt;

/// The native signature of a foreign function. `ret` is `None` for a `void` function.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FunctionDescriptor {
    Top,
    Complete {
        args: LatticeList<Layout>,
        ret: Option<Layout>,
    },
}

impl FunctionDescriptor {
    pub fn args(&self) -> LatticeList<Layout> {
        match self {
            FunctionDescriptor::Top => LatticeList::Top,
            FunctionDescriptor::Complete { args, .. } => args.clone(),
        }
    }

    /// `Some(Layout::Top)` when the return layout is not known.
    pub fn ret(&self) -> Option<Layout> {
        match self {
            FunctionDescriptor::Top => Some(Layout::Top),
            FunctionDescriptor::Complete { ret, .. } => ret.clone(),
        }
    }

    fn with_args(&self, args: LatticeList<Layout>) -> FunctionDescriptor {
        FunctionDescriptor::Complete {
            args,
            ret: self.ret(),
        }
    }

    fn with_ret(&self, ret: Option<Layout>) -> FunctionDescriptor {
        FunctionDescriptor::Complete {
            args: self.args(),
            ret,
        }
    }
}

impl Lattice for FunctionDescriptor {
    fn top() -> Self {
        FunctionDescriptor::Top
    }

    fn is_top(&self) -> bool {
        matches!(self, FunctionDescriptor::Top)
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        if self.is_top() || other.is_top() {
            return (FunctionDescriptor::Top, TriState::Unknown);
        }

        let (args, same_args) = self.args().join_identical(&other.args());
        let (ret, same_ret) = match (self.ret(), other.ret()) {
            (None, None) => (None, TriState::Yes),
            (Some(a), Some(b)) => {
                let (ret, same) = a.join_identical(&b);
                (Some(ret), same)
            }
            _ => (Some(Layout::Top), TriState::No),
        };

        (
            FunctionDescriptor::Complete { args, ret },
            same_args.and(same_ret),
        )
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionDescriptor::Top => f.write_str("⊤"),
            FunctionDescriptor::Complete { args, ret } => {
                write!(f, "({})", args.render(""))?;
                match ret {
                    Some(ret) => write!(f, "{}", ret),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Padding layouts describe no value and cannot be passed. `first_arg` is the argument
/// position of `layouts[0]`.
fn argument_layouts(layouts: &[Layout], first_arg: usize, problems: &mut Problems) -> Vec<Layout> {
    layouts
        .iter()
        .enumerate()
        .map(|(i, layout)| match layout {
            Layout::Padding(_) => {
                problems.type_mismatch(
                    Anchor::Argument(first_arg + i),
                    "Unsupported padding layout argument in function descriptor.",
                );
                Layout::Top
            }
            layout => layout.clone(),
        })
        .collect()
}

pub fn of(ret: &Layout, args: &[Layout], problems: &mut Problems) -> FunctionDescriptor {
    let ret = argument_layouts(std::slice::from_ref(ret), 0, problems).remove(0);

    FunctionDescriptor::Complete {
        args: LatticeList::complete(argument_layouts(args, 1, problems)),
        ret: Some(ret),
    }
}

pub fn of_void(args: &[Layout], problems: &mut Problems) -> FunctionDescriptor {
    FunctionDescriptor::Complete {
        args: LatticeList::complete(argument_layouts(args, 0, problems)),
        ret: None,
    }
}

pub fn drop_return_layout(fd: &FunctionDescriptor) -> FunctionDescriptor {
    fd.with_ret(None)
}

pub fn change_return_layout(fd: &FunctionDescriptor, ret: &Layout, problems: &mut Problems) -> FunctionDescriptor {
    let ret = argument_layouts(std::slice::from_ref(ret), 0, problems).remove(0);
    fd.with_ret(Some(ret))
}

pub fn append_argument_layouts(
    fd: &FunctionDescriptor,
    layouts: &[Layout],
    problems: &mut Problems,
) -> FunctionDescriptor {
    let layouts = argument_layouts(layouts, 0, problems);
    fd.with_args(fd.args().append_all(&layouts))
}

pub fn insert_argument_layouts(
    fd: &FunctionDescriptor,
    index: Option<i64>,
    layouts: &[Layout],
    problems: &mut Problems,
) -> FunctionDescriptor {
    let layouts = argument_layouts(layouts, 1, problems);

    let index = match non_negative_index(index, Anchor::Argument(0), problems) {
        Index::Known(index) => index,
        Index::Unknown => return fd.with_args(LatticeList::Top),
        Index::Invalid => return FunctionDescriptor::Top,
    };

    let args = fd.args();

    if let Some(len) = args.len() {
        if index > len {
            problems.bounds(
                Anchor::Argument(0),
                format!("Index {} is out of bounds [0, {}].", index, len),
            );
            return FunctionDescriptor::Top;
        }
    }

    fd.with_args(args.insert_all(index, &layouts))
}

/// `fd.returnLayout()`; `None` for a `void` function.
pub fn return_layout(fd: &FunctionDescriptor) -> Option<Layout> {
    fd.ret()
}

pub fn to_method_type(fd: &FunctionDescriptor) -> Signature {
    if fd.is_top() {
        return Signature::Top;
    }

    let params = fd.args().map(Layout::carrier);
    let ret = fd.ret().map_or(Type::Void, |ret| ret.carrier());

    Signature::from_parts(params, ret, TriState::No)
}

/// `linker.downcallHandle(fd)`, or `linker.downcallHandle(address, fd)` when the target
/// address is bound.
pub fn downcall_handle(fd: &FunctionDescriptor, address_bound: bool) -> Signature {
    let mut leading = Vec::new();

    if !address_bound {
        leading.push(Type::memory_segment());
    }

    let method_type = to_method_type(fd);

    let params = match fd.ret() {
        Some(Layout::Struct(_) | Layout::Union(_)) => {
            leading.push(Type::segment_allocator());
            method_type.params().insert_all(0, &leading)
        }
        // Whether an allocator is needed is not known, so are the later positions.
        Some(Layout::Top) => LatticeList::incomplete(leading.into_iter().enumerate().collect()),
        _ => method_type.params().insert_all(0, &leading),
    };

    Signature::from_parts(params, method_type.ret(), TriState::No)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{struct_layout, union_layout};

    fn java(name: &str) -> Layout {
        Layout::predefined(name, None).unwrap()
    }

    #[test]
    fn descriptor_transforms() {
        let mut problems = Problems::new();
        let floats = struct_layout(&[java("JAVA_FLOAT")], &mut problems);

        let fd = of(&java("JAVA_INT"), &[floats], &mut problems);
        assert_eq!(fd.to_string(), "([float4])int4");
        assert_eq!(drop_return_layout(&fd).to_string(), "([float4])");

        let appended = append_argument_layouts(&fd, &[java("JAVA_DOUBLE")], &mut problems);
        assert_eq!(appended.to_string(), "([float4]double8)int4");

        let union = union_layout(&[java("JAVA_BOOLEAN"), java("JAVA_BYTE")]);
        let inserted = insert_argument_layouts(&appended, Some(1), &[union], &mut problems);
        assert_eq!(inserted.to_string(), "([float4][boolean1|byte1]double8)int4");

        assert_eq!(
            change_return_layout(&fd, &java("JAVA_CHAR"), &mut problems).to_string(),
            "([float4])char2"
        );
        assert!(problems.is_empty());

        assert_eq!(to_method_type(&fd).to_string(), "(MemorySegment)int");
        assert_eq!(
            to_method_type(&inserted).to_string(),
            "(MemorySegment,MemorySegment,double)int"
        );
    }

    #[test]
    fn downcalls() {
        let mut problems = Problems::new();
        let mixed = struct_layout(&[java("JAVA_INT"), java("JAVA_LONG_UNALIGNED")], &mut problems);
        let fd = of(&java("JAVA_INT"), &[mixed, java("JAVA_BOOLEAN")], &mut problems);
        assert_eq!(fd.to_string(), "(4%[int41%long8]boolean1)int4");

        assert_eq!(
            downcall_handle(&fd, false).to_string(),
            "(MemorySegment,MemorySegment,boolean)int"
        );
        assert_eq!(downcall_handle(&fd, true).to_string(), "(MemorySegment,boolean)int");

        let returns_struct = of(&struct_layout(&[], &mut problems), &[], &mut problems);
        assert_eq!(returns_struct.to_string(), "()1%[]");
        assert_eq!(
            downcall_handle(&returns_struct, false).to_string(),
            "(MemorySegment,SegmentAllocator)MemorySegment"
        );
        assert_eq!(
            downcall_handle(&returns_struct, true).to_string(),
            "(SegmentAllocator)MemorySegment"
        );

        assert_eq!(
            downcall_handle(&FunctionDescriptor::Top, false).to_string(),
            "(0=MemorySegment)⊤"
        );
    }

    #[test]
    fn padding_is_not_an_argument() {
        let mut problems = Problems::new();
        let padding = crate::layout::padding_layout(Some(4), &mut problems);

        let fd = of_void(&[padding], &mut problems);
        assert_eq!(fd.to_string(), "(⊤)");
        assert_eq!(problems.len(), 1);
    }
}
