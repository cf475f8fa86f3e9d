use crate::accessor;
use crate::ast::Literal;
use crate::config::Options;
use crate::error::Problems;
use crate::function_descriptor as fd;
use crate::hierarchy::TypeHierarchy;
use crate::layout::{self, Layout};
use crate::lookup;
use crate::method_handles as mh;
use crate::method_type as mt;
use crate::path;
use crate::types::Type;
use crate::value::Value;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    // MethodType factories and transforms
    MethodType,
    AppendParameterTypes,
    InsertParameterTypes,
    DropParameterTypes,
    ChangeParameterType,
    ChangeReturnType,
    Generic,
    Erase,
    Wrap,
    Unwrap,
    ParameterCount,
    ParameterType,
    ReturnType,

    // MethodHandles factories and MethodHandle methods
    Identity,
    Constant,
    Zero,
    Empty,
    DropArguments,
    DropReturn,
    FilterReturnValue,
    CollectArguments,
    InsertArguments,
    TableSwitch,
    TryFinally,
    TypeOf,
    AsType,
    WithVarargs,
    AsFixedArity,
    AsVarargsCollector,
    BindTo,
    Invoke,
    InvokeExact,

    // MethodHandles.Lookup
    Lookup,
    FindStatic,
    FindVirtual,
    FindSpecial,
    FindConstructor,
    FindGetter,
    FindSetter,
    FindStaticGetter,
    FindStaticSetter,
    FindVarHandle,
    FindStaticVarHandle,

    // VarHandles
    ArrayElementVarHandle,
    ByteArrayViewVarHandle,
    ByteBufferViewVarHandle,
    WithInvokeBehavior,
    WithInvokeExactBehavior,

    // MemoryLayout
    /// A `ValueLayout` constant such as `JAVA_INT`.
    LayoutConstant(Box<str>),
    PaddingLayout,
    SequenceLayout,
    StructLayout,
    UnionLayout,
    WithName,
    WithoutName,
    WithByteAlignment,
    WithTargetLayout,
    WithoutTargetLayout,
    ByteSize,
    ByteAlignment,
    ElementCount,
    VarHandle,
    LayoutArrayElementVarHandle,
    ByteOffset,
    ByteOffsetHandle,
    Select,

    // PathElement
    GroupElement,
    SequenceElement,
    DereferenceElement,

    // FunctionDescriptor and Linker
    FunctionDescriptorOf,
    FunctionDescriptorOfVoid,
    DropReturnLayout,
    AppendArgumentLayouts,
    InsertArgumentLayouts,
    ChangeReturnLayout,
    ReturnLayout,
    ToMethodType,
    DowncallHandle,
}

impl Operation {
    /// Resolves a static method, called with or without its class qualifier.
    pub fn from_static(name: &str) -> Option<Operation> {
        use Operation::*;

        let op = match name {
            "methodType" => MethodType,
            "identity" => Identity,
            "constant" => Constant,
            "zero" => Zero,
            "empty" => Empty,
            "dropArguments" => DropArguments,
            "dropReturn" => DropReturn,
            "filterReturnValue" => FilterReturnValue,
            "collectArguments" => CollectArguments,
            "insertArguments" => InsertArguments,
            "tableSwitch" => TableSwitch,
            "tryFinally" => TryFinally,
            "lookup" | "publicLookup" => Lookup,
            "arrayElementVarHandle" => ArrayElementVarHandle,
            "byteArrayViewVarHandle" => ByteArrayViewVarHandle,
            "byteBufferViewVarHandle" => ByteBufferViewVarHandle,
            "paddingLayout" => PaddingLayout,
            "sequenceLayout" => SequenceLayout,
            "structLayout" => StructLayout,
            "unionLayout" => UnionLayout,
            "groupElement" => GroupElement,
            "sequenceElement" => SequenceElement,
            "dereferenceElement" => DereferenceElement,
            "of" => FunctionDescriptorOf,
            "ofVoid" => FunctionDescriptorOfVoid,
            _ => return None,
        };

        Some(op)
    }

    pub fn from_instance(name: &str) -> Option<Operation> {
        use Operation::*;

        let op = match name {
            "appendParameterTypes" => AppendParameterTypes,
            "insertParameterTypes" => InsertParameterTypes,
            "dropParameterTypes" => DropParameterTypes,
            "changeParameterType" => ChangeParameterType,
            "changeReturnType" => ChangeReturnType,
            "generic" => Generic,
            "erase" => Erase,
            "wrap" => Wrap,
            "unwrap" => Unwrap,
            "parameterCount" => ParameterCount,
            "parameterType" => ParameterType,
            "returnType" => ReturnType,
            "type" => TypeOf,
            "asType" => AsType,
            "withVarargs" => WithVarargs,
            "asFixedArity" => AsFixedArity,
            "asVarargsCollector" => AsVarargsCollector,
            "bindTo" => BindTo,
            "invoke" => Invoke,
            "invokeExact" => InvokeExact,
            "findStatic" => FindStatic,
            "findVirtual" => FindVirtual,
            "findSpecial" => FindSpecial,
            "findConstructor" => FindConstructor,
            "findGetter" => FindGetter,
            "findSetter" => FindSetter,
            "findStaticGetter" => FindStaticGetter,
            "findStaticSetter" => FindStaticSetter,
            "findVarHandle" => FindVarHandle,
            "findStaticVarHandle" => FindStaticVarHandle,
            "withInvokeBehavior" => WithInvokeBehavior,
            "withInvokeExactBehavior" => WithInvokeExactBehavior,
            "withName" => WithName,
            "withoutName" => WithoutName,
            "withByteAlignment" => WithByteAlignment,
            "withTargetLayout" => WithTargetLayout,
            "withoutTargetLayout" => WithoutTargetLayout,
            "byteSize" => ByteSize,
            "byteAlignment" => ByteAlignment,
            "elementCount" => ElementCount,
            "varHandle" => VarHandle,
            "arrayElementVarHandle" => LayoutArrayElementVarHandle,
            "byteOffset" => ByteOffset,
            "byteOffsetHandle" => ByteOffsetHandle,
            "select" => Select,
            "dropReturnLayout" => DropReturnLayout,
            "appendArgumentLayouts" => AppendArgumentLayouts,
            "insertArgumentLayouts" => InsertArgumentLayouts,
            "changeReturnLayout" => ChangeReturnLayout,
            "returnLayout" => ReturnLayout,
            "toMethodType" => ToMethodType,
            "downcallHandle" => DowncallHandle,
            _ => return None,
        };

        Some(op)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::LayoutConstant(name) => f.write_str(name),
            other => write!(f, "{:?}", other),
        }
    }
}

pub struct Evaluator<'a> {
    pub hierarchy: &'a dyn TypeHierarchy,
    pub options: &'a Options,
}

fn integral(value: u64) -> Value {
    match i64::try_from(value) {
        Ok(v) => Value::Constant(Literal::long(v)),
        Err(_) => Value::Unknown,
    }
}

fn class(t: Type) -> Value {
    match t {
        Type::Top => Value::Unknown,
        t => Value::Class(t),
    }
}

impl Evaluator<'_> {
    /// Computes the value of `op` applied to `receiver` (`Value::Unknown` for static
    /// methods) and `args`. Problems are anchored relative to the call.
    pub fn evaluate(&self, op: &Operation, receiver: &Value, args: &[Value], problems: &mut Problems) -> Value {
        use Operation as Op;

        let unknown = Value::Unknown;
        let arg = |i: usize| args.get(i).unwrap_or(&unknown);
        let classes = |from: usize| -> Vec<Type> {
            args.iter().skip(from).map(Value::as_class).collect()
        };
        let layouts = |from: usize| -> Vec<Layout> {
            args.iter().skip(from).map(Value::as_layout).collect()
        };
        let path_elements = || -> Vec<path::PathElement> {
            args.iter().map(Value::as_path_element).collect()
        };
        let hierarchy = self.hierarchy;

        match op {
            Op::MethodType => {
                let ret = arg(0).as_class();
                match arg(1) {
                    Value::Signature(other) if args.len() == 2 => {
                        Value::Signature(mt::method_type_like(&ret, other))
                    }
                    _ => Value::Signature(mt::method_type(&ret, &classes(1), problems)),
                }
            }
            Op::AppendParameterTypes => Value::Signature(mt::append_parameter_types(
                &receiver.as_signature(),
                &classes(0),
                problems,
            )),
            Op::InsertParameterTypes => Value::Signature(mt::insert_parameter_types(
                &receiver.as_signature(),
                arg(0).as_integral(),
                &classes(1),
                problems,
            )),
            Op::DropParameterTypes => Value::Signature(mt::drop_parameter_types(
                &receiver.as_signature(),
                arg(0).as_integral(),
                arg(1).as_integral(),
                problems,
            )),
            Op::ChangeParameterType => Value::Signature(mt::change_parameter_type(
                &receiver.as_signature(),
                arg(0).as_integral(),
                &arg(1).as_class(),
                problems,
            )),
            Op::ChangeReturnType => Value::Signature(mt::change_return_type(
                &receiver.as_signature(),
                &arg(0).as_class(),
            )),
            Op::Generic => Value::Signature(mt::generic(&receiver.as_signature())),
            Op::Erase => Value::Signature(mt::erase(&receiver.as_signature())),
            Op::Wrap => Value::Signature(mt::wrap(&receiver.as_signature())),
            Op::Unwrap => Value::Signature(mt::unwrap(&receiver.as_signature())),
            Op::ParameterCount => match mt::parameter_count(&receiver.as_signature()) {
                Some(count) => Value::Constant(Literal::int(count as i64)),
                None => Value::Unknown,
            },
            Op::ParameterType => class(mt::parameter_type(
                &receiver.as_signature(),
                arg(0).as_integral(),
                problems,
            )),
            Op::ReturnType => class(receiver.as_signature().ret()),

            Op::Identity => Value::Signature(mh::identity(&arg(0).as_class(), problems)),
            Op::Constant => Value::Signature(mh::constant(
                &arg(0).as_class(),
                &arg(1).constant_type(),
                arg(1).is_zero_constant(),
                hierarchy,
                problems,
            )),
            Op::Zero => Value::Signature(mh::zero(&arg(0).as_class())),
            Op::Empty => Value::Signature(mh::empty(&arg(0).as_signature())),
            Op::DropArguments => Value::Signature(mh::drop_arguments(
                &arg(0).as_signature(),
                arg(1).as_integral(),
                &classes(2),
                problems,
            )),
            Op::DropReturn => Value::Signature(mh::drop_return(&arg(0).as_signature(), problems)),
            Op::FilterReturnValue => Value::Signature(mh::filter_return_value(
                &arg(0).as_signature(),
                &arg(1).as_signature(),
                problems,
            )),
            Op::CollectArguments => Value::Signature(mh::collect_arguments(
                &arg(0).as_signature(),
                arg(1).as_integral(),
                &arg(2).as_signature(),
                problems,
            )),
            Op::InsertArguments => {
                let value_types: Vec<Type> = args.iter().skip(2).map(Value::constant_type).collect();
                Value::Signature(mh::insert_arguments(
                    &arg(0).as_signature(),
                    arg(1).as_integral(),
                    &value_types,
                    hierarchy,
                    problems,
                ))
            }
            Op::TableSwitch => {
                let cases: Vec<_> = args.iter().skip(1).map(Value::as_signature).collect();
                Value::Signature(mh::table_switch(&arg(0).as_signature(), &cases, problems))
            }
            Op::TryFinally => Value::Signature(mh::try_finally(
                &arg(0).as_signature(),
                &arg(1).as_signature(),
                hierarchy,
                problems,
            )),
            Op::TypeOf => Value::Signature(mh::type_of(&receiver.as_signature())),
            Op::AsType => Value::Signature(mh::as_type(
                &receiver.as_signature(),
                &arg(0).as_signature(),
                hierarchy,
                problems,
            )),
            Op::WithVarargs => Value::Signature(mh::with_varargs(
                &receiver.as_signature(),
                arg(0).as_bool(),
                problems,
            )),
            Op::AsFixedArity => Value::Signature(mh::as_fixed_arity(&receiver.as_signature())),
            Op::AsVarargsCollector => Value::Signature(mh::as_varargs_collector(
                &receiver.as_signature(),
                &arg(0).as_class(),
                problems,
            )),
            Op::BindTo => Value::Signature(mh::bind_to(
                &receiver.as_signature(),
                &arg(0).constant_type(),
                hierarchy,
                problems,
            )),
            Op::Invoke | Op::InvokeExact => {
                let arg_types: Vec<Type> = args.iter().map(Value::constant_type).collect();
                mh::check_invocation(
                    &receiver.as_signature(),
                    *op == Op::InvokeExact,
                    &arg_types,
                    hierarchy,
                    problems,
                );
                Value::Unknown
            }

            // The lookup object itself carries nothing.
            Op::Lookup => Value::Unknown,
            Op::FindStatic => Value::Signature(lookup::find_static(
                &arg(0).as_class(),
                &arg(2).as_signature(),
                problems,
            )),
            Op::FindVirtual => Value::Signature(lookup::find_virtual(
                &arg(0).as_class(),
                &arg(2).as_signature(),
                problems,
            )),
            Op::FindSpecial => Value::Signature(lookup::find_special(
                &arg(0).as_class(),
                &arg(2).as_signature(),
                &arg(3).as_class(),
                problems,
            )),
            Op::FindConstructor => Value::Signature(lookup::find_constructor(
                &arg(0).as_class(),
                &arg(1).as_signature(),
                problems,
            )),
            Op::FindGetter => {
                Value::Signature(lookup::find_getter(&arg(0).as_class(), &arg(2).as_class(), problems))
            }
            Op::FindSetter => {
                Value::Signature(lookup::find_setter(&arg(0).as_class(), &arg(2).as_class(), problems))
            }
            Op::FindStaticGetter => Value::Signature(lookup::find_static_getter(
                &arg(0).as_class(),
                &arg(2).as_class(),
                problems,
            )),
            Op::FindStaticSetter => Value::Signature(lookup::find_static_setter(
                &arg(0).as_class(),
                &arg(2).as_class(),
                problems,
            )),
            Op::FindVarHandle => Value::Accessor(lookup::find_var_handle(
                &arg(0).as_class(),
                &arg(2).as_class(),
                problems,
            )),
            Op::FindStaticVarHandle => Value::Accessor(lookup::find_static_var_handle(
                &arg(0).as_class(),
                &arg(2).as_class(),
                problems,
            )),

            Op::ArrayElementVarHandle => {
                Value::Accessor(accessor::array_element_var_handle(&arg(0).as_class()))
            }
            Op::ByteArrayViewVarHandle => Value::Accessor(accessor::byte_array_view_var_handle(
                &arg(0).as_class(),
                problems,
            )),
            Op::ByteBufferViewVarHandle => Value::Accessor(accessor::byte_buffer_view_var_handle(
                &arg(0).as_class(),
                problems,
            )),
            Op::WithInvokeBehavior => Value::Accessor(accessor::with_invoke_behavior(
                &receiver.as_accessor(),
                false,
                problems,
            )),
            Op::WithInvokeExactBehavior => Value::Accessor(accessor::with_invoke_behavior(
                &receiver.as_accessor(),
                true,
                problems,
            )),

            Op::LayoutConstant(name) => match Layout::predefined(name, self.options.address_size) {
                Some(layout) => Value::Layout(layout),
                None => Value::Unknown,
            },
            Op::PaddingLayout => Value::Layout(layout::padding_layout(arg(0).as_integral(), problems)),
            Op::SequenceLayout => Value::Layout(layout::sequence_layout(
                arg(0).as_integral(),
                &arg(1).as_layout(),
                problems,
            )),
            Op::StructLayout => Value::Layout(layout::struct_layout(&layouts(0), problems)),
            Op::UnionLayout => Value::Layout(layout::union_layout(&layouts(0))),
            Op::WithName => Value::Layout(receiver.as_layout().with_name(arg(0).as_str())),
            Op::WithoutName => Value::Layout(receiver.as_layout().without_name()),
            Op::WithByteAlignment => Value::Layout(layout::with_byte_alignment(
                &receiver.as_layout(),
                arg(0).as_integral(),
                problems,
            )),
            Op::WithTargetLayout => Value::Layout(layout::with_target_layout(
                &receiver.as_layout(),
                Some(&arg(0).as_layout()),
                problems,
            )),
            Op::WithoutTargetLayout => Value::Layout(layout::with_target_layout(
                &receiver.as_layout(),
                None,
                problems,
            )),
            Op::ByteSize => receiver.as_layout().byte_size().map_or(Value::Unknown, integral),
            Op::ByteAlignment => receiver.as_layout().byte_alignment().map_or(Value::Unknown, integral),
            Op::ElementCount => receiver.as_layout().element_count().map_or(Value::Unknown, integral),
            Op::VarHandle => Value::Accessor(path::var_handle(
                &receiver.as_layout(),
                &path_elements(),
                problems,
            )),
            Op::LayoutArrayElementVarHandle => Value::Accessor(path::array_element_var_handle(
                &receiver.as_layout(),
                &path_elements(),
                problems,
            )),
            Op::ByteOffset => path::byte_offset(&receiver.as_layout(), &path_elements(), problems)
                .map_or(Value::Unknown, integral),
            Op::ByteOffsetHandle => Value::Signature(path::byte_offset_handle(
                &receiver.as_layout(),
                &path_elements(),
                problems,
            )),
            Op::Select => Value::Layout(path::select(&receiver.as_layout(), &path_elements(), problems)),

            Op::GroupElement => match arg(0) {
                Value::Constant(Literal::Str(name)) => {
                    Value::PathElement(path::group_element_name(Some(name)))
                }
                Value::Constant(Literal::Integral { value, .. }) => {
                    Value::PathElement(path::group_element_index(Some(*value), problems))
                }
                // The overload is not known.
                _ => Value::PathElement(path::PathElement::GroupByIndex(None)),
            },
            Op::SequenceElement => match args.len() {
                0 => Value::PathElement(path::sequence_element()),
                1 => Value::PathElement(path::sequence_element_at(arg(0).as_integral(), problems)),
                _ => Value::PathElement(path::sequence_element_range(
                    arg(0).as_integral(),
                    arg(1).as_integral(),
                    problems,
                )),
            },
            Op::DereferenceElement => Value::PathElement(path::dereference_element()),

            Op::FunctionDescriptorOf => {
                Value::FunctionDescriptor(fd::of(&arg(0).as_layout(), &layouts(1), problems))
            }
            Op::FunctionDescriptorOfVoid => {
                Value::FunctionDescriptor(fd::of_void(&layouts(0), problems))
            }
            Op::DropReturnLayout => {
                Value::FunctionDescriptor(fd::drop_return_layout(&receiver.as_function_descriptor()))
            }
            Op::AppendArgumentLayouts => Value::FunctionDescriptor(fd::append_argument_layouts(
                &receiver.as_function_descriptor(),
                &layouts(0),
                problems,
            )),
            Op::InsertArgumentLayouts => Value::FunctionDescriptor(fd::insert_argument_layouts(
                &receiver.as_function_descriptor(),
                arg(0).as_integral(),
                &layouts(1),
                problems,
            )),
            Op::ChangeReturnLayout => Value::FunctionDescriptor(fd::change_return_layout(
                &receiver.as_function_descriptor(),
                &arg(0).as_layout(),
                problems,
            )),
            Op::ReturnLayout => match fd::return_layout(&receiver.as_function_descriptor()) {
                Some(Layout::Top) | None => Value::Unknown,
                Some(layout) => Value::Layout(layout),
            },
            Op::ToMethodType => {
                Value::Signature(fd::to_method_type(&receiver.as_function_descriptor()))
            }
            Op::DowncallHandle => {
                let address_bound = args.len() > 1;
                let descriptor = args.last().unwrap_or(&unknown).as_function_descriptor();
                Value::Signature(fd::downcall_handle(&descriptor, address_bound))
            }
        }
    }
}
