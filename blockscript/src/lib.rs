//! Typed validation/action scripting for reconfigurable hardware blocks.
//!
//! A *block script* attaches runtime checks and side effects to the
//! configurable arguments of a hardware-processing block — "reject a
//! samples-per-packet value unless it is a power of two between 16 and
//! 4096", or "write a configuration register whenever an argument
//! changes".  A script is one or more comma-separated expressions over
//! five value types (`int`, `double`, `string`, `bool`, `int_vector`),
//! with `AND`/`OR` combinators, `$name` argument variables, and an
//! overloaded builtin function library:
//!
//! ```text
//! GE($spp, 16) AND LE($spp, 4096) AND IS_PWR_OF_2($spp)
//! IF($enable, SR_WRITE('DSP_CTRL', 0x2))
//! ```
//!
//! Each block gets one [`BlockBridge`], wired to the block's controller.
//! The bridge parses, type-checks, and evaluates one complete script per
//! [`BlockBridge::run_and_check`] call and requires the result to be
//! truthy:
//!
//! ```rust
//! use blockscript::{BlockBridge, BlockController, Type, Value};
//!
//! struct Controller;
//!
//! impl BlockController for Controller {
//!     fn sr_write(&mut self, _register: &str, _value: u32) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//!     fn arg_type(&self, _name: &str) -> anyhow::Result<Type> {
//!         Ok(Type::Int)
//!     }
//!     fn arg_value(&self, _name: &str, _port: u32) -> anyhow::Result<Value> {
//!         Ok(Value::Int(64))
//!     }
//!     fn set_arg(&mut self, _name: &str, _value: Value, _port: u32) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let bridge = BlockBridge::new(Controller);
//! bridge
//!     .run_and_check("GE($spp, 16) AND IS_PWR_OF_2($spp)", "spp out of range")
//!     .unwrap();
//! ```
//!
//! Evaluation is lazy where it matters: `AND`/`OR` stop at the first
//! decisive child, and `IF`/`IF_ELSE` evaluate only the selected branch.
//! Scripts cannot loop or define functions, and the only I/O they can
//! cause is a register write or a blocking `SLEEP`.

pub mod block;
pub mod builtins;
pub mod error;
pub mod expr;
pub mod functions;
pub mod parser;
pub mod value;

// Re-exports for convenience.
pub use block::{BlockBridge, BlockController};
pub use error::{ScriptError, ScriptResult};
pub use expr::{Combiner, Container, EvalContext, Expr, Function};
pub use functions::FunctionTable;
pub use parser::Parser;
pub use value::{Type, Value};
