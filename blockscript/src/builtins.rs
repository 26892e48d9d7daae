//! The builtin function library.
//!
//! Every fresh table starts from [`default_table`]: arithmetic, comparison,
//! bit manipulation, power-of-two helpers, boolean constants, lazy
//! conditionals, a blocking `SLEEP`, and the `SET_VAR`/`GET_*` local-scope
//! functions.  Block-specific functions (`SR_WRITE`, `SET_ARG`) are
//! registered on top of these by the bridge.
//!
//! Callables receive their arguments *unevaluated*; the helpers below
//! evaluate one argument and coerce it to the expected tag.  `IF` and
//! `IF_ELSE` rely on this to evaluate only the selected branch.

use std::thread;
use std::time::Duration;

use crate::error::{ScriptError, ScriptResult};
use crate::expr::{EvalContext, Expr};
use crate::functions::FunctionTable;
use crate::value::{Type, Value};

/// A fresh table pre-loaded with the builtin library.
pub fn default_table() -> FunctionTable {
    let mut table = FunctionTable::new();
    register(&mut table);
    table
}

/// Register the builtin library into `table`.
pub fn register(table: &mut FunctionTable) {
    use Type::{Bool, Double, Int, String};

    // ── Arithmetic ────────────────────────────────────────────────────────────

    table.register("ADD", &[Int, Int], Int, |args, ctx| {
        Ok(Value::Int(eval_int(args, 0, ctx)? + eval_int(args, 1, ctx)?))
    });
    table.register("ADD", &[Double, Double], Double, |args, ctx| {
        Ok(Value::Double(
            eval_double(args, 0, ctx)? + eval_double(args, 1, ctx)?,
        ))
    });
    table.register("MULT", &[Int, Int], Int, |args, ctx| {
        Ok(Value::Int(eval_int(args, 0, ctx)? * eval_int(args, 1, ctx)?))
    });
    table.register("MULT", &[Double, Double], Double, |args, ctx| {
        Ok(Value::Double(
            eval_double(args, 0, ctx)? * eval_double(args, 1, ctx)?,
        ))
    });
    table.register("DIV", &[Int, Int], Int, |args, ctx| {
        let lhs = eval_int(args, 0, ctx)?;
        let rhs = eval_int(args, 1, ctx)?;
        if rhs == 0 {
            return Err(ScriptError::runtime("DIV: division by zero"));
        }
        Ok(Value::Int(lhs / rhs))
    });
    table.register("DIV", &[Double, Double], Double, |args, ctx| {
        let lhs = eval_double(args, 0, ctx)?;
        let rhs = eval_double(args, 1, ctx)?;
        if rhs == 0.0 {
            return Err(ScriptError::runtime("DIV: division by zero"));
        }
        Ok(Value::Double(lhs / rhs))
    });
    table.register("MODULO", &[Int, Int], Int, |args, ctx| {
        let lhs = eval_int(args, 0, ctx)?;
        let rhs = eval_int(args, 1, ctx)?;
        if rhs == 0 {
            return Err(ScriptError::runtime("MODULO: modulo by zero"));
        }
        Ok(Value::Int(lhs % rhs))
    });
    table.register("MODULO", &[Double, Double], Double, |args, ctx| {
        let lhs = eval_double(args, 0, ctx)?;
        let rhs = eval_double(args, 1, ctx)?;
        if rhs == 0.0 {
            return Err(ScriptError::runtime("MODULO: modulo by zero"));
        }
        Ok(Value::Double(lhs % rhs))
    });

    // ── Comparison ────────────────────────────────────────────────────────────

    table.register("LE", &[Int, Int], Bool, |args, ctx| {
        Ok(Value::Bool(eval_int(args, 0, ctx)? <= eval_int(args, 1, ctx)?))
    });
    table.register("LE", &[Double, Double], Bool, |args, ctx| {
        Ok(Value::Bool(
            eval_double(args, 0, ctx)? <= eval_double(args, 1, ctx)?,
        ))
    });
    table.register("GE", &[Int, Int], Bool, |args, ctx| {
        Ok(Value::Bool(eval_int(args, 0, ctx)? >= eval_int(args, 1, ctx)?))
    });
    table.register("GE", &[Double, Double], Bool, |args, ctx| {
        Ok(Value::Bool(
            eval_double(args, 0, ctx)? >= eval_double(args, 1, ctx)?,
        ))
    });

    // ── Bit manipulation ──────────────────────────────────────────────────────

    table.register("SHIFT_LEFT", &[Int, Int], Int, |args, ctx| {
        Ok(Value::Int(
            eval_int(args, 0, ctx)? << (eval_int(args, 1, ctx)? & 63),
        ))
    });
    table.register("SHIFT_RIGHT", &[Int, Int], Int, |args, ctx| {
        Ok(Value::Int(
            eval_int(args, 0, ctx)? >> (eval_int(args, 1, ctx)? & 63),
        ))
    });
    table.register("BITWISE_AND", &[Int, Int], Int, |args, ctx| {
        Ok(Value::Int(eval_int(args, 0, ctx)? & eval_int(args, 1, ctx)?))
    });
    table.register("BITWISE_OR", &[Int, Int], Int, |args, ctx| {
        Ok(Value::Int(eval_int(args, 0, ctx)? | eval_int(args, 1, ctx)?))
    });
    table.register("BITWISE_XOR", &[Int, Int], Int, |args, ctx| {
        Ok(Value::Int(eval_int(args, 0, ctx)? ^ eval_int(args, 1, ctx)?))
    });

    // ── Power-of-two helpers ──────────────────────────────────────────────────

    table.register("IS_PWR_OF_2", &[Int], Bool, |args, ctx| {
        let n = eval_int(args, 0, ctx)?;
        Ok(Value::Bool(n > 0 && (n & (n - 1)) == 0))
    });
    table.register("LOG2", &[Int], Int, |args, ctx| {
        let n = eval_int(args, 0, ctx)?;
        if n <= 0 {
            return Err(ScriptError::runtime(format!(
                "LOG2: argument must be positive, got {n}"
            )));
        }
        Ok(Value::Int(i64::from(n.ilog2())))
    });

    // ── Boolean ───────────────────────────────────────────────────────────────

    table.register("TRUE", &[], Bool, |_args, _ctx| Ok(Value::Bool(true)));
    table.register("FALSE", &[], Bool, |_args, _ctx| Ok(Value::Bool(false)));
    table.register("NOT", &[Bool], Bool, |args, ctx| {
        Ok(Value::Bool(!eval_arg(args, 0, ctx)?.to_bool()))
    });

    // ── Conditionals ──────────────────────────────────────────────────────────
    //
    // The condition is evaluated first, then only the selected branch.
    // IF reports whether its branch ran; IF_ELSE returns the branch value.

    for ty in Type::ALL {
        table.register("IF", &[Bool, ty], Bool, |args, ctx| {
            if eval_arg(args, 0, ctx)?.to_bool() {
                eval_arg(args, 1, ctx)?;
                Ok(Value::Bool(true))
            } else {
                Ok(Value::Bool(false))
            }
        });
        table.register("IF_ELSE", &[Bool, ty, ty], ty, |args, ctx| {
            if eval_arg(args, 0, ctx)?.to_bool() {
                eval_arg(args, 1, ctx)
            } else {
                eval_arg(args, 2, ctx)
            }
        });
    }

    // ── Control ───────────────────────────────────────────────────────────────

    table.register("SLEEP", &[Double], Bool, |args, ctx| {
        let seconds = eval_double(args, 0, ctx)?;
        if seconds.is_finite() && seconds > 0.0 {
            thread::sleep(Duration::from_secs_f64(seconds));
        }
        Ok(Value::Bool(true))
    });

    // ── Local variable scope ──────────────────────────────────────────────────

    for ty in Type::ALL {
        table.register("SET_VAR", &[String, ty], Bool, |args, ctx| {
            let name = eval_string(args, 0, ctx)?;
            let value = eval_arg(args, 1, ctx)?;
            ctx.set_local(&name, value);
            Ok(Value::Bool(true))
        });
    }
    table.register("GET_INT", &[String], Int, |args, ctx| {
        read_scope(args, ctx, Type::Int)
    });
    table.register("GET_DOUBLE", &[String], Double, |args, ctx| {
        read_scope(args, ctx, Type::Double)
    });
    table.register("GET_STRING", &[String], String, |args, ctx| {
        read_scope(args, ctx, Type::String)
    });
    table.register("GET_BOOL", &[String], Bool, |args, ctx| {
        read_scope(args, ctx, Type::Bool)
    });
    table.register("GET_INT_VECTOR", &[String], Type::IntVector, |args, ctx| {
        read_scope(args, ctx, Type::IntVector)
    });
}

// ── Argument helpers ──────────────────────────────────────────────────────────

pub(crate) fn eval_arg(
    args: &[Expr],
    idx: usize,
    ctx: &mut dyn EvalContext,
) -> ScriptResult<Value> {
    args.get(idx)
        .ok_or_else(|| ScriptError::syntax(format!("missing argument {idx}")))?
        .eval(ctx)
}

pub(crate) fn eval_int(args: &[Expr], idx: usize, ctx: &mut dyn EvalContext) -> ScriptResult<i64> {
    eval_arg(args, idx, ctx)?.get_int()
}

pub(crate) fn eval_double(
    args: &[Expr],
    idx: usize,
    ctx: &mut dyn EvalContext,
) -> ScriptResult<f64> {
    eval_arg(args, idx, ctx)?.get_double()
}

pub(crate) fn eval_string(
    args: &[Expr],
    idx: usize,
    ctx: &mut dyn EvalContext,
) -> ScriptResult<String> {
    eval_arg(args, idx, ctx)?.get_string()
}

/// Read a scope variable set by `SET_VAR`, requiring the expected tag.
fn read_scope(args: &[Expr], ctx: &mut dyn EvalContext, expected: Type) -> ScriptResult<Value> {
    let name = eval_string(args, 0, ctx)?;
    let value = ctx
        .get_local(&name)
        .ok_or_else(|| ScriptError::syntax(format!("unknown variable: {name}")))?;
    if value.type_of() != expected {
        return Err(ScriptError::type_error(format!(
            "variable {name} holds a {} value, expected {expected}",
            value.type_of()
        )));
    }
    Ok(value)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
