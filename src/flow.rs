//! The flow join engine.
//!
//! Walks one unit in program order, keeping the abstract value of every variable in a
//! scope stack. Branches run on copies of the environment which are joined where control
//! flow merges again; loops are iterated until the environment at their head is stable.

use crate::ast::*;
use crate::config::Options;
use crate::error::{Anchor, Diagnostic, Problems};
use crate::eval::Evaluator;
use crate::hierarchy::TypeHierarchy;
use crate::scope_stack::ScopeStack;
use crate::source_location::SourceSpan;
use crate::value::Value;
use nohash_hasher::IntMap;
use tracing::{debug, trace};

/// A variable receiving a value, either at its declaration or by assignment.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub span: SourceSpan,
    pub name: Box<str>,
    pub value: Value,
}

/// The result of analyzing one unit.
#[derive(Debug, Default)]
pub struct Analysis {
    pub values: IntMap<NodeId, Value>,
    pub bindings: Vec<Binding>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Analysis {
    pub fn value_of(&self, id: NodeId) -> &Value {
        self.values.get(&id).unwrap_or(&Value::Unknown)
    }
}

struct FlowAnalyzer<'a> {
    evaluator: Evaluator<'a>,
    max_loop_passes: usize,

    scopes: ScopeStack<Box<str>, Value>,
    values: IntMap<NodeId, Value>,

    // Keyed by the node that produced them. Evaluating a node again, as happens on every
    // loop pass, replaces what the previous pass recorded.
    bindings: IntMap<NodeId, Binding>,
    diagnostics: IntMap<NodeId, Vec<Diagnostic>>,
}

impl<'a> FlowAnalyzer<'a> {
    fn new(options: &'a Options, hierarchy: &'a dyn TypeHierarchy) -> FlowAnalyzer<'a> {
        FlowAnalyzer {
            evaluator: Evaluator { hierarchy, options },
            max_loop_passes: options.max_loop_passes.max(1),
            scopes: ScopeStack::new(),
            values: IntMap::default(),
            bindings: IntMap::default(),
            diagnostics: IntMap::default(),
        }
    }

    fn finish(self) -> Analysis {
        let mut bindings: Vec<Binding> = self.bindings.into_values().collect();
        bindings.sort_by(|a, b| a.span.cmp(&b.span));

        let mut diagnostics: Vec<Diagnostic> = self.diagnostics.into_values().flatten().collect();
        diagnostics.sort_by(|a, b| {
            a.span
                .cmp(&b.span)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.message.cmp(&b.message))
        });

        Analysis {
            values: self.values,
            bindings,
            diagnostics,
        }
    }

    fn bind(&mut self, name: &Name, value: Value) {
        self.bindings.insert(
            name.id,
            Binding {
                span: name.span,
                name: name.text.clone(),
                value,
            },
        );
    }

    fn visit_block(&mut self, block: &Block) {
        self.scopes.push_empty_scope();

        for statement in &block.statements {
            self.visit_statement(statement);
        }

        self.scopes.pop();
    }

    fn visit_statement(&mut self, statement: &Statement) {
        use StatementKind::*;

        match &statement.kind {
            Let { name, init } => {
                let value = match init {
                    Some(init) => self.visit_expr(init),
                    None => Value::Unknown,
                };

                self.scopes.insert(name.text.clone(), value.clone());
                self.bind(name, value);
            }
            Assign { name, val } => {
                let value = self.visit_expr(val);

                if !self.scopes.assign(&name.text, value.clone()) {
                    debug!(name = %name.text, "assignment to an undeclared variable");
                }

                self.bind(name, value);
            }
            Expr(e) => {
                self.visit_expr(e);
            }
            Block(block) => self.visit_block(block),
            If { then, otherwise } => {
                let before = self.scopes.clone();

                self.visit_block(then);
                let after_then = std::mem::replace(&mut self.scopes, before);

                if let Some(otherwise) = otherwise {
                    self.visit_block(otherwise);
                }

                self.merge(&after_then);
            }
            Switch { arms, default } => {
                let before = self.scopes.clone();
                let mut merged: Option<ScopeStack<Box<str>, Value>> = None;

                for arm in arms.iter().chain(default) {
                    self.scopes = before.clone();
                    self.visit_block(arm);

                    merged = Some(match merged {
                        Some(merged) => merged.join(&self.scopes),
                        None => self.scopes.clone(),
                    });
                }

                // Without a default, no arm may run at all.
                self.scopes = match merged {
                    Some(merged) if default.is_some() => merged,
                    Some(merged) => merged.join(&before),
                    None => before,
                };
            }
            Loop(body) => self.visit_loop(statement.id, body),
        }
    }

    fn merge(&mut self, other: &ScopeStack<Box<str>, Value>) {
        let joined = self.scopes.join(other);

        if joined != self.scopes || joined != *other {
            trace!("branches disagree, merge loses precision");
        }

        self.scopes = joined;
    }

    fn visit_loop(&mut self, id: NodeId, body: &Block) {
        let mut head = self.scopes.clone();

        for pass in 1..=self.max_loop_passes {
            self.scopes = head.clone();
            self.visit_block(body);

            let next = head.join(&self.scopes);

            if next == head {
                debug!(loop_id = ?id, passes = pass, "loop converged");
                self.scopes = head;
                return;
            }

            head = next;
        }

        // One more pass with every variable that kept changing set to top, so that the
        // recorded values are valid for any number of iterations.
        self.scopes = head.clone();
        self.visit_block(body);
        let widened = head.widen_changed(&head.join(&self.scopes));

        debug!(loop_id = ?id, passes = self.max_loop_passes, "loop did not converge, widening");

        self.scopes = widened.clone();
        self.visit_block(body);
        self.scopes = widened.join(&self.scopes);
    }

    fn visit_expr(&mut self, expression: &Expr) -> Value {
        use ExprKind::*;

        let value = match &expression.kind {
            Unresolved => Value::Unknown,
            Literal(literal) => Value::Constant(literal.clone()),
            Class(crate::types::Type::Top) => Value::Unknown,
            Class(ty) => Value::Class(ty.clone()),
            Identifier(name) => self.scopes.get(name).cloned().unwrap_or(Value::Unknown),
            Call { op, receiver, args } => {
                let receiver_value = match receiver {
                    Some(receiver) => self.visit_expr(receiver),
                    None => Value::Unknown,
                };
                let arg_values: Vec<Value> = args.iter().map(|arg| self.visit_expr(arg)).collect();

                let mut problems = Problems::new();
                let value = self
                    .evaluator
                    .evaluate(op, &receiver_value, &arg_values, &mut problems);

                trace!(node = ?expression.id, op = %op, value = %value, "evaluated call");

                let anchor_span = |anchor: Anchor| -> SourceSpan {
                    match anchor {
                        Anchor::Call => expression.span,
                        Anchor::Receiver => receiver.as_ref().map_or(expression.span, |r| r.span),
                        Anchor::Argument(i) => args.get(i).map_or(expression.span, |a| a.span),
                    }
                };

                let mut diagnostics: Vec<Diagnostic> = problems
                    .into_vec()
                    .into_iter()
                    .map(|p| Diagnostic::new(p.kind, anchor_span(p.anchor), p.message))
                    .collect();
                diagnostics.dedup_by(|a, b| a.message == b.message && a.span == b.span);

                self.diagnostics.insert(expression.id, diagnostics);

                value
            }
        };

        self.values.insert(expression.id, value.clone());
        value
    }
}

pub fn analyze(unit: &Unit, options: &Options, hierarchy: &dyn TypeHierarchy) -> Analysis {
    let mut analyzer = FlowAnalyzer::new(options, hierarchy);
    analyzer.visit_block(&unit.body);

    let analysis = analyzer.finish();
    debug!(
        expressions = analysis.values.len(),
        diagnostics = analysis.diagnostics.len(),
        "analysis finished"
    );

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Operation;
    use crate::hierarchy::KnownHierarchy;
    use crate::source_location::SourceLocation;
    use crate::types::Type;

    struct Builder {
        ids: NodeIdGenerator,
        line: u32,
    }

    impl Builder {
        fn new() -> Builder {
            Builder {
                ids: NodeIdGenerator::new(),
                line: 0,
            }
        }

        fn span(&mut self) -> SourceSpan {
            self.line += 1;
            SourceSpan::single(SourceLocation::new(self.line, 1))
        }

        fn expr(&mut self, kind: ExprKind) -> Expr {
            Expr {
                id: self.ids.gen_id(),
                span: self.span(),
                kind,
            }
        }

        fn class(&mut self, name: &str) -> Expr {
            self.expr(ExprKind::Class(Type::parse(name)))
        }

        fn method_type(&mut self, ret: &str, params: &[&str]) -> Expr {
            let mut args = vec![self.class(ret)];
            for p in params {
                args.push(self.class(p));
            }
            self.expr(ExprKind::Call {
                op: Operation::MethodType,
                receiver: None,
                args,
            })
        }

        fn name(&mut self, text: &str) -> Name {
            Name {
                id: self.ids.gen_id(),
                span: self.span(),
                text: text.into(),
            }
        }

        fn statement(&mut self, kind: StatementKind) -> Statement {
            Statement {
                id: self.ids.gen_id(),
                span: self.span(),
                kind,
            }
        }

        fn let_(&mut self, text: &str, init: Expr) -> Statement {
            let name = self.name(text);
            self.statement(StatementKind::Let {
                name,
                init: Some(Box::new(init)),
            })
        }

        fn set(&mut self, text: &str, val: Expr) -> Statement {
            let name = self.name(text);
            self.statement(StatementKind::Assign {
                name,
                val: Box::new(val),
            })
        }

        fn block(&mut self, statements: Vec<Statement>) -> Block {
            Block {
                id: self.ids.gen_id(),
                statements,
            }
        }
    }

    fn run(unit: &Unit) -> Analysis {
        analyze(unit, &Options::default(), &KnownHierarchy::new())
    }

    fn final_binding<'a>(analysis: &'a Analysis, name: &str) -> &'a Value {
        &analysis
            .bindings
            .iter()
            .rev()
            .find(|b| &*b.name == name)
            .unwrap()
            .value
    }

    #[test]
    fn if_without_else_joins_with_fall_through() {
        let mut b = Builder::new();

        let init = b.method_type("int", &["int"]);
        let decl = b.let_("mt", init);
        let other = b.method_type("long", &["int"]);
        let assign = b.set("mt", other);
        let then = b.block(vec![assign]);
        let branch = b.statement(StatementKind::If {
            then,
            otherwise: None,
        });
        let read = b.expr(ExprKind::Identifier("mt".into()));
        let after = b.let_("after", read);

        let body = b.block(vec![decl, branch, after]);
        let analysis = run(&Unit { body });

        assert_eq!(final_binding(&analysis, "after").to_string(), "(int)⊤");
    }

    #[test]
    fn switch_arms_are_joined() {
        let mut b = Builder::new();

        let name = b.name("mt");
        let decl = b.statement(StatementKind::Let { name, init: None });

        let mut arms = Vec::new();
        for _ in 0..2 {
            let value = b.method_type("void", &["int"]);
            let assign = b.set("mt", value);
            arms.push(b.block(vec![assign]));
        }
        let value = b.method_type("void", &["int"]);
        let assign = b.set("mt", value);
        let default = Some(b.block(vec![assign]));

        let switch = b.statement(StatementKind::Switch { arms, default });
        let read = b.expr(ExprKind::Identifier("mt".into()));
        let after = b.let_("after", read);

        let body = b.block(vec![decl, switch, after]);
        let analysis = run(&Unit { body });

        assert_eq!(final_binding(&analysis, "after").to_string(), "(int)void");
    }

    #[test]
    fn loops_reach_a_fixpoint() {
        let mut b = Builder::new();

        let init = b.method_type("void", &[]);
        let decl = b.let_("mt", init);

        let receiver = b.expr(ExprKind::Identifier("mt".into()));
        let int = b.class("int");
        let append = b.expr(ExprKind::Call {
            op: Operation::AppendParameterTypes,
            receiver: Some(Box::new(receiver)),
            args: vec![int],
        });
        let assign = b.set("mt", append);
        let body = b.block(vec![assign]);
        let looped = b.statement(StatementKind::Loop(body));

        let read = b.expr(ExprKind::Identifier("mt".into()));
        let after = b.let_("after", read);

        let body = b.block(vec![decl, looped, after]);
        let analysis = run(&Unit { body });

        // Zero or more iterations: the arity is not known.
        assert_eq!(final_binding(&analysis, "after").to_string(), "({⊤})void");
    }

    #[test]
    fn diagnostics_are_anchored_and_deduplicated_across_passes() {
        let mut b = Builder::new();

        let void = b.class("void");
        let identity = b.expr(ExprKind::Call {
            op: Operation::Identity,
            receiver: None,
            args: vec![void],
        });
        let void_span = match &identity.kind {
            ExprKind::Call { args, .. } => args[0].span,
            _ => unreachable!(),
        };
        let statement = b.statement(StatementKind::Expr(Box::new(identity)));
        let body = b.block(vec![statement]);
        let looped = b.statement(StatementKind::Loop(body));

        let body = b.block(vec![looped]);
        let analysis = run(&Unit { body });

        assert_eq!(analysis.diagnostics.len(), 1);
        assert_eq!(analysis.diagnostics[0].span, void_span);
        assert_eq!(analysis.diagnostics[0].message, "Type must not be void.");
    }
}
