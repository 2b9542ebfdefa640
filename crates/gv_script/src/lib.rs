//! Script layer of the gcvet harness.
//!
//! Scans the line-oriented mutation DSL into statements, executes
//! them against the graph model, and records one generated-code
//! operation per validated statement. All script errors are fatal
//! and carry the offending line number.

pub mod error;
pub mod interp;
pub mod stmt;

pub use error::{ScriptError, ScriptErrorKind};
pub use interp::{Interpreter, Op, TestPlan, interpret};
pub use stmt::{Stmt, scan_stmt};

/// Lines starting with this marker are comments.
pub const COMMENT_MARKER: char = '#';
