use handlehints::config::Options;
use handlehints::driver::Context;
use handlehints::report::Report;
use insta::assert_snapshot;
use std::fs;

fn report(unit: &str) -> Report {
    let contents = fs::read_to_string(format!("tests/units/{}.hh", unit)).unwrap();

    match Context::new().report(&contents, &Options::default()) {
        Ok(report) => report,
        Err(e) => panic!("Unit \"{}\" could not be read: {}", unit, e),
    }
}

#[test]
fn method_types() {
    let report = report("method_types");
    assert!(report.has_errors());

    assert_snapshot!(report.to_string(), @r"
    1:6 mt = (int)void
    2:6 appended = (int,long)void
    3:6 dropped = (long)void
    4:6 bad = ⊤
    5:6 generic = (Object,Object)Object
    6:6 wrapped = (Integer)Integer
    7:6 count = 2
    8:6 voids = (⊤)int
    4:10 error[BoundsError]: Range [1, 3) is out of bounds [0, 2].
    8:45 error[TypeMismatch]: Type must not be void.
    ");
}

#[test]
fn as_type() {
    let report = report("as_type");

    assert_snapshot!(report.to_string(), @r"
    1:6 mh = (int)int
    2:6 same = (int)int
    3:6 wider = (char)long
    4:6 narrow = (⊤)⊤
    2:11 warning[RedundancyWarning]: Call to 'asType' is redundant as the MethodHandle already has that type
    4:22 error[TypeMismatch]: Incompatible primitive conversion: long to int
    ");
}

#[test]
fn filter_return() {
    let report = report("filter_return");

    assert_snapshot!(report.to_string(), @r"
    1:6 voidTarget = ()void
    2:6 filter = (int)void
    3:6 rejected = ⊤
    4:6 intTarget = ()int
    5:6 filtered = ()void
    3:59 error[TypeMismatch]: The target MethodHandle returns 'void' but the filter expects parameters
    ");
}

#[test]
fn drop_arguments() {
    let report = report("drop_arguments");

    assert_snapshot!(report.to_string(), @r"
    1:6 unknown = ⊤
    2:6 dropped = (1=int)⊤
    3:6 negative = ⊤
    3:52 error[BoundsError]: Negative index value -1 not allowed.
    ");
}

#[test]
fn struct_layouts() {
    let report = report("struct_layouts");

    assert_snapshot!(report.to_string(), @r"
    1:6 misaligned = ⊤
    2:6 padded = 8%[short2x6long8]
    3:6 size = 16L
    4:6 negative = ⊤
    5:6 huge = ⊤
    6:6 seq = [10:int4]
    1:55 error[StructuralError]: Layout requires a byte alignment of 8 but is inserted at an offset of 2.
    4:44 error[StructuralError]: Argument must be >= 0 but is -1.
    5:40 error[StructuralError]: Sequence of 4611686018427387903 elements of 8 bytes overflows the addressable size.
    ");
}

#[test]
fn paths() {
    let report = report("paths");

    assert_snapshot!(report.to_string(), @r"
    1:6 point = 4%[int4(x)int4(y)]
    2:6 y = (MemorySegment)(int)
    3:6 offset = 4L
    4:6 points = [10:4%[int4(x)int4(y)]]
    5:6 xs = (MemorySegment,long)(int)
    6:6 missing = (0=MemorySegment)(⊤)
    6:32 error[StructuralError]: Group layout does not have a member layout with name z.
    ");
}

#[test]
fn control_flow() {
    let report = report("control_flow");
    assert!(!report.has_errors());

    assert_snapshot!(report.to_string(), @r"
    2:6 mt = (int)int
    3:16 mt = (int)long
    4:6 joined = (int)⊤
    5:6 grown = ()void
    6:12 grown = ({⊤})void
    7:6 after = ({⊤})void
    ");
}

#[test]
fn lookup() {
    let report = report("lookup");

    assert_snapshot!(report.to_string(), @r"
    1:6 lookup = ⊤
    2:6 length = (String)int
    3:6 parse = (String)int
    4:6 ctor = (int,int)Point
    5:6 badCtor = ⊤
    6:6 getter = (Point)int
    7:6 field = (⊤)(int)
    8:6 statics = ()(⊤)
    5:51 error[TypeMismatch]: Expected return type void but got int.
    7:35 error[TypeMismatch]: Expected a reference type but got 'int'.
    8:64 error[TypeMismatch]: Type must not be void.
    10:1 error[TypeMismatch]: Argument types do not match: expected (String) but got (int).
    11:1 error[ArityError]: Expected 2 arguments but got 1.
    ");
}

#[test]
fn unreadable_units_are_rejected() {
    let options = Options::default();

    assert!(Context::new().report("(let x", &options).is_err());
    assert!(Context::new().report("(let x (.frobnicate y))", &options).is_err());
}
