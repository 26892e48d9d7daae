//! Error taxonomy for the scripting engine.
//!
//! Three categories cover everything a script can raise: `Syntax` for
//! parse-time and type-inference failures, `Type` for a typed accessor
//! hitting a value of another tag, and `Runtime` for evaluation faults and
//! failed `run_and_check` assertions.  Failures raised by the block
//! controller never surface directly; they are either swallowed
//! (`SR_WRITE`) or mapped into one of these categories at the boundary.

use thiserror::Error;

/// Convenience result type used across the crate.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Everything that can go wrong while parsing or running a block script.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// Malformed script text, unknown names, or an argument list that
    /// matches no registered function signature.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// A tag-specific accessor was called on a value of a different tag.
    #[error("type error: {0}")]
    Type(String),

    /// An evaluation fault, or a script whose result was not truthy.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ScriptError {
    /// Build a [`ScriptError::Syntax`] value.
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    /// Build a [`ScriptError::Type`] value.
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    /// Build a [`ScriptError::Runtime`] value.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
