use crate::eval::Operation;
use crate::source_location::SourceSpan;
use crate::types::{Primitive, Type};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl nohash_hasher::IsEnabled for NodeId {}

pub struct NodeIdGenerator {
    counter: u32,
}

impl Default for NodeIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeIdGenerator {
    pub fn new() -> NodeIdGenerator {
        NodeIdGenerator { counter: 0 }
    }

    pub fn gen_id(&mut self) -> NodeId {
        self.counter += 1;
        NodeId(self.counter)
    }
}

/// One analyzed unit: a method body.
#[derive(Clone, Debug)]
pub struct Unit {
    pub body: Block,
}

#[derive(Clone, Debug)]
pub struct Name {
    pub id: NodeId,
    pub span: SourceSpan,
    pub text: Box<str>,
}

#[derive(Clone, Debug)]
pub struct Statement {
    pub id: NodeId,
    pub span: SourceSpan,
    pub kind: StatementKind,
}

#[derive(Clone, Debug)]
pub enum StatementKind {
    /// A declaration; without an initializer the variable is unknown until assigned.
    Let {
        name: Name,
        init: Option<Box<Expr>>,
    },
    Assign {
        name: Name,
        val: Box<Expr>,
    },
    Expr(Box<Expr>),
    Block(Block),
    If {
        then: Block,
        otherwise: Option<Block>,
    },
    Switch {
        arms: Vec<Block>,
        default: Option<Block>,
    },
    Loop(Block),
}

#[derive(Clone, Debug)]
pub struct Block {
    pub id: NodeId,
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub id: NodeId,
    pub span: SourceSpan,
    pub kind: ExprKind,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    /// An expression the symbol resolver could not make sense of.
    Unresolved,
    Literal(Literal),
    Class(Type),
    Identifier(Box<str>),
    Call {
        op: Operation,
        receiver: Option<Box<Expr>>,
        args: Vec<Expr>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
    /// Any integral constant together with its static type, e.g. `'c'` or `10L`.
    Integral { ty: Primitive, value: i64 },
    Bool(bool),
    Str(Box<str>),
    Null,
}

impl Literal {
    pub fn int(value: i64) -> Literal {
        Literal::Integral {
            ty: Primitive::Int,
            value,
        }
    }

    pub fn long(value: i64) -> Literal {
        Literal::Integral {
            ty: Primitive::Long,
            value,
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            Literal::Integral { ty, .. } => Type::Primitive(*ty),
            Literal::Bool(_) => Type::Primitive(Primitive::Boolean),
            Literal::Str(_) => Type::class("String"),
            Literal::Null => Type::parse("null"),
        }
    }

    /// Whether this is the default value of its type.
    pub fn is_zero(&self) -> bool {
        match self {
            Literal::Integral { value, .. } => *value == 0,
            Literal::Bool(b) => !b,
            Literal::Str(_) => false,
            Literal::Null => true,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integral {
                ty: Primitive::Long,
                value,
            } => write!(f, "{}L", value),
            Literal::Integral {
                ty: Primitive::Char,
                value,
            } => match u32::try_from(*value).ok().and_then(char::from_u32) {
                Some(c) => write!(f, "'{}'", c),
                None => write!(f, "{}", value),
            },
            Literal::Integral { value, .. } => write!(f, "{}", value),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::Null => f.write_str("null"),
        }
    }
}
