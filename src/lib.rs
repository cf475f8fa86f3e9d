pub mod lattice;
pub mod types;
pub mod hierarchy;
pub mod conversion;

pub mod signature;
pub mod method_type;
pub mod method_handles;
pub mod accessor;
pub mod lookup;

pub mod layout;
pub mod path;
pub mod function_descriptor;

pub mod ast;
pub mod value;
pub mod eval;
pub mod flow;
pub mod scope_stack;

pub mod lower;
pub mod sexpr;

pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod report;
pub mod source_location;
