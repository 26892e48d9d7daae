//! Expression tree and evaluation.
//!
//! An expression is one of four node kinds: a literal, a late-bound
//! variable, a container (ordered children combined by a logical operator),
//! or a function call.  Every node supports [`Expr::infer_type`] (pure) and
//! [`Expr::eval`] (may side-effect, e.g. a register write).
//!
//! Evaluation is driven through an [`EvalContext`], the trait the bridge
//! implements to give the evaluator access to `$variable` resolution, the
//! local `SET_VAR` scope, and the function table.  Function callables
//! receive their argument nodes *unevaluated* and decide which of them to
//! evaluate — this is what makes `IF`/`IF_ELSE` and user-registered
//! short-circuit functions possible.

use crate::error::{ScriptError, ScriptResult};
use crate::functions::FunctionTable;
use crate::value::{Type, Value};

// ── EvalContext ───────────────────────────────────────────────────────────────

/// Dependency-injection interface used by the evaluator.
///
/// A bridge implements this against its block controller; tests implement
/// it over plain maps.  `$name` resolution is late — a tree may reference
/// variables that have no value until the moment `infer_type`/`eval` asks.
pub trait EvalContext {
    /// The function table used for overload resolution and dispatch.
    fn functions(&self) -> &FunctionTable;

    /// Type of the `$name` variable.
    fn var_type(&self, name: &str) -> ScriptResult<Type>;

    /// Current value of the `$name` variable.
    fn var_value(&self, name: &str) -> ScriptResult<Value>;

    /// Read from the local variable scope (`GET_INT` & co).
    fn get_local(&self, name: &str) -> Option<Value>;

    /// Write to the local variable scope (`SET_VAR`).
    fn set_local(&mut self, name: &str, value: Value);
}

// ── Container ─────────────────────────────────────────────────────────────────

/// How a container combines its children's evaluation results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combiner {
    /// No combiner seen yet; evaluates like [`Combiner::All`].
    Unset,
    /// Evaluate every child, return the last value.
    All,
    /// Stop at the first child whose value is boolean-false.
    And,
    /// Stop at the first child whose value is boolean-true.
    Or,
}

/// An ordered sequence of child expressions plus a combiner.
#[derive(Debug, Clone, Default)]
pub struct Container {
    combiner: Option<Combiner>,
    children: Vec<Expr>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child expression.
    pub fn add(&mut self, child: Expr) {
        self.children.push(child);
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[Expr] {
        &self.children
    }

    pub fn combiner(&self) -> Combiner {
        self.combiner.unwrap_or(Combiner::Unset)
    }

    /// Set the combiner.  It may be set at most once; a second, *different*
    /// combiner within the same container is a syntax error.
    pub fn set_combiner(&mut self, combiner: Combiner) -> ScriptResult<()> {
        match self.combiner {
            Some(current) if current != combiner => Err(ScriptError::syntax(format!(
                "combiner mixing: container already combines with {current:?}"
            ))),
            _ => {
                self.combiner = Some(combiner);
                Ok(())
            }
        }
    }

    /// `And`/`Or` containers are always boolean; an `All`/unset container
    /// has the type of its last child, or `Bool` when empty.
    pub fn infer_type(&self, ctx: &dyn EvalContext) -> ScriptResult<Type> {
        match self.combiner() {
            Combiner::And | Combiner::Or => Ok(Type::Bool),
            Combiner::All | Combiner::Unset => match self.children.last() {
                Some(child) => child.infer_type(ctx),
                None => Ok(Type::Bool),
            },
        }
    }

    /// Evaluate children strictly in order with combiner-dependent early
    /// exit.  An empty container evaluates to `true`.
    pub fn eval(&self, ctx: &mut dyn EvalContext) -> ScriptResult<Value> {
        let mut last = Value::Bool(true);
        for child in &self.children {
            last = child.eval(ctx)?;
            match self.combiner() {
                Combiner::And if !last.to_bool() => break,
                Combiner::Or if last.to_bool() => break,
                _ => {}
            }
        }
        Ok(last)
    }
}

// ── Function ──────────────────────────────────────────────────────────────────

/// A named function call; children are the call arguments in order.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    args: Vec<Expr>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Function {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Expr] {
        &self.args
    }

    /// Append a call argument.
    pub fn add(&mut self, arg: Expr) {
        self.args.push(arg);
    }

    /// The ordered argument-type list, inferred from the attached args.
    fn signature(&self, ctx: &dyn EvalContext) -> ScriptResult<Vec<Type>> {
        self.args.iter().map(|arg| arg.infer_type(ctx)).collect()
    }

    pub fn infer_type(&self, ctx: &dyn EvalContext) -> ScriptResult<Type> {
        let signature = self.signature(ctx)?;
        ctx.functions().return_type(&self.name, &signature)
    }

    /// Resolve the overload for the inferred signature and invoke it with
    /// the *unevaluated* argument nodes.
    pub fn eval(&self, ctx: &mut dyn EvalContext) -> ScriptResult<Value> {
        let signature = self.signature(ctx)?;
        let callable = ctx.functions().callable(&self.name, &signature)?;
        callable.as_ref()(&self.args, ctx)
    }
}

// ── Expr ──────────────────────────────────────────────────────────────────────

/// A node of the expression tree.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    Container(Container),
    Function(Function),
}

impl Expr {
    /// Static type of this node.  Pure, but may still fail when it depends
    /// on an unresolvable variable or an unregistered function signature.
    pub fn infer_type(&self, ctx: &dyn EvalContext) -> ScriptResult<Type> {
        match self {
            Expr::Literal(value) => Ok(value.type_of()),
            Expr::Variable(name) => ctx.var_type(name),
            Expr::Container(container) => container.infer_type(ctx),
            Expr::Function(function) => function.infer_type(ctx),
        }
    }

    /// Evaluate this node.  Literals are self-evaluating; variables resolve
    /// through the context at this moment, not before.
    pub fn eval(&self, ctx: &mut dyn EvalContext) -> ScriptResult<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => ctx.var_value(name),
            Expr::Container(container) => container.eval(ctx),
            Expr::Function(function) => function.eval(ctx),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
