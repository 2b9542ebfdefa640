//! Fatal script errors.

use std::error::Error;
use std::fmt;

use gv_core::{Handle, ModelError};

/// The closed set of ways a script can be invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptErrorKind {
    /// Token did not match any statement form.
    MalformedToken { token: String },
    /// Statement addressed a handle with no live object.
    UndefinedHandle { handle: Handle },
    /// Creation under a handle that is still live.
    HandleRedefined { handle: Handle },
    /// Slot index at or beyond the object's declared slot count.
    SlotOutOfBounds {
        handle: Handle,
        index: usize,
        slot_count: usize,
    },
    /// Root decrement on an object whose root count is zero.
    RootUnderflow { handle: Handle },
}

/// A fatal script error plus the 1-based line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub kind: ScriptErrorKind,
    pub line: u32,
}

impl ScriptError {
    pub fn new(kind: ScriptErrorKind, line: u32) -> Self {
        Self { kind, line }
    }

    pub(crate) fn from_model(err: ModelError, line: u32) -> Self {
        let kind = match err {
            ModelError::HandleInUse { handle } => ScriptErrorKind::HandleRedefined { handle },
            ModelError::UndefinedHandle { handle } => ScriptErrorKind::UndefinedHandle { handle },
            ModelError::SlotOutOfBounds {
                handle,
                index,
                slot_count,
            } => ScriptErrorKind::SlotOutOfBounds {
                handle,
                index,
                slot_count,
            },
            ModelError::RootUnderflow { handle } => ScriptErrorKind::RootUnderflow { handle },
        };
        Self { kind, line }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ScriptErrorKind::MalformedToken { token } => {
                write!(f, "malformed statement `{token}` on line: {}", self.line)
            }
            ScriptErrorKind::UndefinedHandle { handle } => {
                write!(f, "invalid object index: {handle} on line: {}", self.line)
            }
            ScriptErrorKind::HandleRedefined { handle } => write!(
                f,
                "invalid object definition: {handle} already defined on line: {}",
                self.line
            ),
            ScriptErrorKind::SlotOutOfBounds {
                handle,
                index,
                slot_count,
            } => write!(
                f,
                "invalid reference index {index} on {handle}[{index}] \
                 ({slot_count} slots declared) on line: {}",
                self.line
            ),
            ScriptErrorKind::RootUnderflow { handle } => write!(
                f,
                "trying to decrease zero root reference count object on -{handle} on line: {}",
                self.line
            ),
        }
    }
}

impl Error for ScriptError {}
