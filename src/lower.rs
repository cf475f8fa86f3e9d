//! Turns the S-expression form of a unit into the analyzed IR.
//!
//! Statements:
//!
//! ```text
//! (let x expr)      (let x)       (set x expr)      (do stmt...)
//! (if (then stmt...) (else stmt...))
//! (switch (case stmt...) ... (default stmt...))
//! (loop stmt...)
//! ```
//!
//! Expressions are literals (`1`, `10L`, `'c'`, `true`, `null`, `"text"`,
//! `(cast byte 1)`), class literals (`int.class`, `String[].class`), variables, `?` for
//! anything unresolved, predefined layouts such as `JAVA_INT`, and calls:
//! `(MethodHandles.identity int.class)` for static methods and
//! `(.asType mh mt)` for instance methods with the receiver first.

use crate::ast::*;
use crate::eval::Operation;
use crate::sexpr::{SExpr, SExprKind};
use crate::source_location::{SourceLocation, SourceSpan};
use crate::types::{Primitive, Type};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("{0}: expected a list")]
    ExpectedList(SourceLocation),
    #[error("{0}: expected a name")]
    ExpectedName(SourceLocation),
    #[error("{loc}: malformed '{form}'")]
    Malformed { form: &'static str, loc: SourceLocation },
    #[error("{loc}: invalid literal '{text}'")]
    InvalidLiteral { text: String, loc: SourceLocation },
    #[error("{loc}: unknown operation '{name}'")]
    UnknownOperation { name: String, loc: SourceLocation },
}

struct Lowerer {
    ids: NodeIdGenerator,
}

fn is_constant_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn unqualified(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

fn integral_literal(text: &str) -> Option<Literal> {
    if let Some(value) = text.strip_suffix(|c: char| c == 'L' || c == 'l') {
        return value.parse().ok().map(Literal::long);
    }

    if let Some(inner) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        let unescaped = unescape(inner);
        let mut chars = unescaped.chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => Some(Literal::Integral {
                ty: Primitive::Char,
                value: i64::from(u32::from(c)),
            }),
            _ => None,
        };
    }

    text.parse().ok().map(Literal::int)
}

impl Lowerer {
    fn name(&mut self, sexpr: &SExpr) -> Result<Name, LowerError> {
        match sexpr.as_atom() {
            Some(text) if !text.starts_with(|c: char| c.is_ascii_digit()) => Ok(Name {
                id: self.ids.gen_id(),
                span: sexpr.span,
                text: text.into(),
            }),
            _ => Err(LowerError::ExpectedName(sexpr.span.start)),
        }
    }

    fn block(&mut self, statements: &[SExpr]) -> Result<Block, LowerError> {
        let statements = statements
            .iter()
            .map(|s| self.statement(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Block {
            id: self.ids.gen_id(),
            statements,
        })
    }

    /// A `(keyword stmt...)` clause of an `if` or `switch`.
    fn clause<'s>(&self, sexpr: &'s SExpr<'s>) -> Result<(&'s str, &'s [SExpr<'s>]), LowerError> {
        let items = sexpr
            .as_list()
            .ok_or(LowerError::ExpectedList(sexpr.span.start))?;

        match items.split_first() {
            Some((keyword, body)) => match keyword.as_atom() {
                Some(keyword) => Ok((keyword, body)),
                None => Err(LowerError::ExpectedName(keyword.span.start)),
            },
            None => Err(LowerError::ExpectedName(sexpr.span.start)),
        }
    }

    fn statement(&mut self, sexpr: &SExpr) -> Result<Statement, LowerError> {
        let loc = sexpr.span.start;
        let head = sexpr
            .as_list()
            .and_then(|items| items.split_first())
            .and_then(|(head, rest)| head.as_atom().map(|head| (head, rest)));

        let kind = match head {
            Some(("let", [name])) => StatementKind::Let {
                name: self.name(name)?,
                init: None,
            },
            Some(("let", [name, init])) => StatementKind::Let {
                name: self.name(name)?,
                init: Some(Box::new(self.expr(init)?)),
            },
            Some(("let", _)) => return Err(LowerError::Malformed { form: "let", loc }),
            Some(("set", [name, val])) => StatementKind::Assign {
                name: self.name(name)?,
                val: Box::new(self.expr(val)?),
            },
            Some(("set", _)) => return Err(LowerError::Malformed { form: "set", loc }),
            Some(("do", body)) => StatementKind::Block(self.block(body)?),
            Some(("loop", body)) => StatementKind::Loop(self.block(body)?),
            Some(("if", clauses)) => {
                let mut then = None;
                let mut otherwise = None;

                for clause in clauses {
                    match self.clause(clause)? {
                        ("then", body) if then.is_none() => then = Some(self.block(body)?),
                        ("else", body) if otherwise.is_none() => {
                            otherwise = Some(self.block(body)?)
                        }
                        _ => return Err(LowerError::Malformed { form: "if", loc }),
                    }
                }

                let then = then.ok_or(LowerError::Malformed { form: "if", loc })?;
                StatementKind::If { then, otherwise }
            }
            Some(("switch", clauses)) => {
                let mut arms = Vec::new();
                let mut default = None;

                for clause in clauses {
                    match self.clause(clause)? {
                        ("case", body) => arms.push(self.block(body)?),
                        ("default", body) if default.is_none() => default = Some(self.block(body)?),
                        _ => return Err(LowerError::Malformed { form: "switch", loc }),
                    }
                }

                StatementKind::Switch { arms, default }
            }
            _ => StatementKind::Expr(Box::new(self.expr(sexpr)?)),
        };

        Ok(Statement {
            id: self.ids.gen_id(),
            span: sexpr.span,
            kind,
        })
    }

    fn new_expr(&mut self, span: SourceSpan, kind: ExprKind) -> Expr {
        Expr {
            id: self.ids.gen_id(),
            span,
            kind,
        }
    }

    fn atom(&mut self, text: &str, span: SourceSpan) -> Result<Expr, LowerError> {
        let kind = match text {
            "?" => ExprKind::Unresolved,
            "true" => ExprKind::Literal(Literal::Bool(true)),
            "false" => ExprKind::Literal(Literal::Bool(false)),
            "null" => ExprKind::Literal(Literal::Null),
            _ if text.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '\'') => {
                match integral_literal(text) {
                    Some(literal) => ExprKind::Literal(literal),
                    None => {
                        return Err(LowerError::InvalidLiteral {
                            text: text.to_string(),
                            loc: span.start,
                        })
                    }
                }
            }
            _ => {
                if let Some(class) = text.strip_suffix(".class") {
                    ExprKind::Class(Type::parse(class))
                } else if is_constant_name(unqualified(text)) {
                    ExprKind::Call {
                        op: Operation::LayoutConstant(unqualified(text).into()),
                        receiver: None,
                        args: Vec::new(),
                    }
                } else {
                    ExprKind::Identifier(text.into())
                }
            }
        };

        Ok(self.new_expr(span, kind))
    }

    fn cast(&mut self, args: &[SExpr], span: SourceSpan) -> Result<Expr, LowerError> {
        let malformed = LowerError::Malformed {
            form: "cast",
            loc: span.start,
        };

        let [ty, value] = args else {
            return Err(malformed);
        };

        let ty = ty
            .as_atom()
            .and_then(Primitive::from_name)
            .ok_or_else(|| malformed.clone())?;

        let value = match value.as_atom().and_then(integral_literal) {
            Some(Literal::Integral { value, .. }) => value,
            _ => return Err(malformed),
        };

        Ok(self.new_expr(span, ExprKind::Literal(Literal::Integral { ty, value })))
    }

    fn expr(&mut self, sexpr: &SExpr) -> Result<Expr, LowerError> {
        let span = sexpr.span;

        let items = match &sexpr.kind {
            SExprKind::Atom(text) => return self.atom(text, span),
            SExprKind::LitString(text) => {
                let literal = Literal::Str(unescape(text).into());
                return Ok(self.new_expr(span, ExprKind::Literal(literal)));
            }
            SExprKind::List(items) => items,
        };

        let Some((head, rest)) = items.split_first() else {
            return Err(LowerError::ExpectedName(span.start));
        };
        let head = head
            .as_atom()
            .ok_or(LowerError::ExpectedName(head.span.start))?;

        if head == "cast" {
            return self.cast(rest, span);
        }

        let unknown_operation = || LowerError::UnknownOperation {
            name: head.to_string(),
            loc: span.start,
        };

        let (op, receiver, args) = match head.strip_prefix('.') {
            Some(method) => {
                let op = Operation::from_instance(method).ok_or_else(unknown_operation)?;
                let (receiver, args) = rest.split_first().ok_or(LowerError::Malformed {
                    form: "instance call",
                    loc: span.start,
                })?;
                (op, Some(Box::new(self.expr(receiver)?)), args)
            }
            None => {
                let op = Operation::from_static(unqualified(head)).ok_or_else(unknown_operation)?;
                (op, None, rest)
            }
        };

        let args = args
            .iter()
            .map(|arg| self.expr(arg))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.new_expr(span, ExprKind::Call { op, receiver, args }))
    }
}

/// Lowers the top-level forms of a fixture file into one unit.
pub fn lower(forms: &[SExpr]) -> Result<Unit, LowerError> {
    let mut lowerer = Lowerer {
        ids: NodeIdGenerator::new(),
    };

    Ok(Unit {
        body: lowerer.block(forms)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sexpr::parse;

    fn lower_source(source: &str) -> Result<Unit, LowerError> {
        lower(&parse(source).unwrap())
    }

    #[test]
    fn literals() {
        assert_eq!(integral_literal("10L"), Some(Literal::long(10)));
        assert_eq!(integral_literal("-3"), Some(Literal::int(-3)));
        assert_eq!(
            integral_literal("'c'"),
            Some(Literal::Integral {
                ty: Primitive::Char,
                value: 99
            })
        );
        assert_eq!(integral_literal("1x"), None);
    }

    #[test]
    fn statements() {
        let unit = lower_source(
            "(let mt (MethodType.methodType void.class int.class))
             (if (then (set mt ?)))
             (switch (case) (default (loop (.dropReturn mt))))",
        )
        .unwrap();

        let kinds: Vec<_> = unit.body.statements.iter().map(|s| &s.kind).collect();
        assert!(matches!(kinds[0], StatementKind::Let { init: Some(_), .. }));
        assert!(matches!(kinds[1], StatementKind::If { otherwise: None, .. }));
        assert!(matches!(kinds[2], StatementKind::Switch { arms, default: Some(_) } if arms.len() == 1));
    }

    #[test]
    fn calls() {
        let unit = lower_source("(.withName (MemoryLayout.structLayout JAVA_INT) \"s\")").unwrap();

        let StatementKind::Expr(e) = &unit.body.statements[0].kind else {
            panic!("expected an expression statement");
        };
        let ExprKind::Call { op, receiver, args } = &e.kind else {
            panic!("expected a call");
        };

        assert_eq!(*op, Operation::WithName);
        assert!(matches!(
            receiver.as_deref().map(|r| &r.kind),
            Some(ExprKind::Call {
                op: Operation::StructLayout,
                ..
            })
        ));
        assert!(matches!(&args[0].kind, ExprKind::Literal(Literal::Str(s)) if &**s == "s"));
    }

    #[test]
    fn errors() {
        assert_eq!(
            lower_source("(frobnicate 1)").unwrap_err(),
            LowerError::UnknownOperation {
                name: "frobnicate".to_string(),
                loc: SourceLocation::new(1, 1)
            }
        );
        assert!(matches!(
            lower_source("(let 1 2)").unwrap_err(),
            LowerError::ExpectedName(_)
        ));
        assert!(matches!(
            lower_source("(cast byte x)").unwrap_err(),
            LowerError::Malformed { form: "cast", .. }
        ));
    }
}
