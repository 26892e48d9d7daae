//! Per-block bridge between script text and a block controller.
//!
//! One [`BlockBridge`] exists per hardware-processing block.  It owns a
//! parser and a function table pre-loaded with the builtin library plus the
//! block-specific functions (`SR_WRITE`, `SET_ARG`), resolves `$name`
//! variables against the block's argument store, and exposes the single
//! public entry point [`BlockBridge::run_and_check`].
//!
//! Calls on one bridge are serialized behind its mutex — the local variable
//! scope and the register-write side channel are shared, mutable state.
//! Bridges for different blocks share nothing and run concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::builtins::{self, eval_int, eval_string};
use crate::error::{ScriptError, ScriptResult};
use crate::expr::{EvalContext, Expr};
use crate::functions::FunctionTable;
use crate::parser::Parser;
use crate::value::{Type, Value};

// ── Collaborator surface ──────────────────────────────────────────────────────

/// Capability surface of the surrounding block-control subsystem.
///
/// Implemented outside this crate; the scripting engine treats it as an
/// opaque provider of register writes and the hierarchical argument store.
pub trait BlockController: Send {
    /// Write a settings register by name.
    fn sr_write(&mut self, register_name: &str, value: u32) -> anyhow::Result<()>;

    /// Declared type of a configuration argument.
    fn arg_type(&self, name: &str) -> anyhow::Result<Type>;

    /// Current value of a configuration argument.
    fn arg_value(&self, name: &str, port: u32) -> anyhow::Result<Value>;

    /// Update a configuration argument.
    fn set_arg(&mut self, name: &str, value: Value, port: u32) -> anyhow::Result<()>;
}

type SharedController = Arc<Mutex<dyn BlockController>>;

// ── Bridge ────────────────────────────────────────────────────────────────────

/// The per-block script interface.
pub struct BlockBridge {
    inner: Mutex<BridgeInner>,
}

struct BridgeInner {
    parser: Parser,
    table: Arc<FunctionTable>,
    controller: SharedController,
    /// Local `SET_VAR` scope; never survives a single `run_and_check`.
    locals: HashMap<String, Value>,
}

impl BlockBridge {
    pub fn new<C: BlockController + 'static>(controller: C) -> Self {
        let controller: SharedController = Arc::new(Mutex::new(controller));
        let mut table = builtins::default_table();
        register_block_functions(&mut table, &controller);
        let table = Arc::new(table);
        BlockBridge {
            inner: Mutex::new(BridgeInner {
                parser: Parser::new(table.clone()),
                table,
                controller,
                locals: HashMap::new(),
            }),
        }
    }

    /// Parse and evaluate `code`, requiring a truthy result.
    ///
    /// Parse and evaluation failures propagate unmodified.  A result whose
    /// `to_bool()` is false fails with a runtime error carrying
    /// `error_message` when non-empty, else a generated message quoting the
    /// script.  The local variable scope is cleared on every exit path.
    pub fn run_and_check(&self, code: &str, error_message: &str) -> ScriptResult<()> {
        let mut inner = self.inner.lock();
        debug!(%code, "running block script");
        let outcome = inner.run(code);
        inner.locals.clear();
        let value = outcome?;
        if value.to_bool() {
            Ok(())
        } else if error_message.is_empty() {
            Err(ScriptError::runtime(format!(
                "script `{code}` did not evaluate to true"
            )))
        } else {
            Err(ScriptError::runtime(error_message))
        }
    }
}

impl BridgeInner {
    fn run(&mut self, code: &str) -> ScriptResult<Value> {
        let tree = self.parser.parse(code)?;
        tree.eval(self)
    }
}

impl EvalContext for BridgeInner {
    fn functions(&self) -> &FunctionTable {
        &self.table
    }

    fn var_type(&self, name: &str) -> ScriptResult<Type> {
        self.controller
            .lock()
            .arg_type(name)
            .map_err(|e| ScriptError::syntax(format!("cannot infer type of ${name}: {e}")))
    }

    fn var_value(&self, name: &str) -> ScriptResult<Value> {
        self.controller
            .lock()
            .arg_value(name, 0)
            .map_err(|e| ScriptError::syntax(format!("cannot read ${name}: {e}")))
    }

    fn get_local(&self, name: &str) -> Option<Value> {
        self.locals.get(name).cloned()
    }

    fn set_local(&mut self, name: &str, value: Value) {
        self.locals.insert(name.to_owned(), value);
    }
}

// ── Block-specific functions ──────────────────────────────────────────────────

fn register_block_functions(table: &mut FunctionTable, controller: &SharedController) {
    use Type::{Bool, Int, String};

    // A failed register write degrades a compound expression to `false`
    // instead of aborting it: collaborator failures are logged and
    // swallowed at this boundary, never raised.
    let ctrl = controller.clone();
    table.register("SR_WRITE", &[String, Int], Bool, move |args, ctx| {
        let register = eval_string(args, 0, ctx)?;
        let raw = eval_int(args, 1, ctx)?;
        let value = match u32::try_from(raw) {
            Ok(value) => value,
            Err(_) => {
                warn!(%register, raw, "register write value out of u32 range");
                return Ok(Value::Bool(false));
            }
        };
        match ctrl.lock().sr_write(&register, value) {
            Ok(()) => Ok(Value::Bool(true)),
            Err(e) => {
                warn!(%register, value, error = %e, "register write failed");
                Ok(Value::Bool(false))
            }
        }
    });

    for ty in Type::ALL {
        let ctrl = controller.clone();
        table.register("SET_ARG", &[String, ty], Bool, move |args, ctx| {
            set_arg(&ctrl, args, ctx, false)
        });
        let ctrl = controller.clone();
        table.register("SET_ARG", &[String, ty, Int], Bool, move |args, ctx| {
            set_arg(&ctrl, args, ctx, true)
        });
    }
}

fn set_arg(
    controller: &SharedController,
    args: &[Expr],
    ctx: &mut dyn EvalContext,
    with_port: bool,
) -> ScriptResult<Value> {
    let name = eval_string(args, 0, ctx)?;
    let value = args
        .get(1)
        .ok_or_else(|| ScriptError::syntax("missing argument 1"))?
        .eval(ctx)?;
    let port = if with_port {
        u32::try_from(eval_int(args, 2, ctx)?)
            .map_err(|_| ScriptError::runtime("SET_ARG: port must be non-negative"))?
    } else {
        0
    };
    controller
        .lock()
        .set_arg(&name, value, port)
        .map_err(|e| ScriptError::runtime(format!("cannot set argument {name}: {e}")))?;
    Ok(Value::Bool(true))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
