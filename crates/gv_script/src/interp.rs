//! Script interpreter.
//!
//! Executes scanned statements against the graph model and records,
//! in the same order, one generated-code operation per validated
//! statement. The resulting `TestPlan` is both the oracle's
//! prediction and the exact operation sequence the collector under
//! test will observe.

use smallvec::SmallVec;

use gv_core::{GraphModel, Handle, ObjectId, ReachableSet, mark_reachable};

use crate::COMMENT_MARKER;
use crate::error::{ScriptError, ScriptErrorKind};
use crate::stmt::{Stmt, scan_stmt};

/// One validated operation, ready for code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Timed wait, milliseconds.
    Sleep(u32),
    /// Trigger a collection.
    Collect,
    /// Dump collector state.
    Dump,
    Create {
        id: ObjectId,
        handle: Handle,
        slots: usize,
    },
    SetRef {
        obj: Handle,
        index: usize,
        target: Option<Handle>,
    },
    AddRoot(Handle),
    RemoveRoot(Handle),
    DropHandle(Handle),
    /// The final oracle pass deemed this identity unreachable; the
    /// verification pass must make no liveness assertion for it.
    ExpectGarbage(ObjectId),
    /// Run verification and report. Always the last operation.
    EndOfTest,
}

/// Interpreter output: the operation sequence plus the oracle's
/// final accounting.
#[derive(Debug)]
pub struct TestPlan {
    pub ops: Vec<Op>,
    pub total_allocated: usize,
    pub expected_survivors: usize,
    pub final_reachable: ReachableSet,
}

/// Interpret a whole script. Convenience over [`Interpreter`].
pub fn interpret(source: &str) -> Result<TestPlan, ScriptError> {
    let mut interp = Interpreter::new();
    interp.feed(source)?;
    Ok(interp.finish())
}

/// Line-by-line script interpreter.
#[derive(Debug, Default)]
pub struct Interpreter {
    model: GraphModel,
    ops: Vec<Op>,
    line: u32,
    ended: bool,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute every statement in `source`, stopping early at `e`.
    /// Comment and blank lines advance the line counter only.
    pub fn feed(&mut self, source: &str) -> Result<(), ScriptError> {
        for line in source.lines() {
            self.line += 1;
            if self.ended {
                break;
            }
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
                continue;
            }
            let tokens: SmallVec<[&str; 8]> = trimmed.split_whitespace().collect();
            for token in tokens {
                let stmt = scan_stmt(token).ok_or_else(|| {
                    ScriptError::new(
                        ScriptErrorKind::MalformedToken {
                            token: token.to_string(),
                        },
                        self.line,
                    )
                })?;
                self.exec(stmt)?;
                if self.ended {
                    break;
                }
            }
        }
        Ok(())
    }

    fn exec(&mut self, stmt: Stmt) -> Result<(), ScriptError> {
        let line = self.line;
        match stmt {
            Stmt::Wait(millis) => self.ops.push(Op::Sleep(millis)),
            Stmt::Dump => self.ops.push(Op::Dump),
            Stmt::End => self.ended = true,
            Stmt::Collect => {
                self.ops.push(Op::Collect);
                // Model state must reflect post-collection liveness:
                // handles to unreachable objects become invalid for
                // every later statement.
                let reachable = mark_reachable(&self.model);
                self.model.retain_reachable(&reachable);
            }
            Stmt::Create { handle, slot_count } => {
                let id = self
                    .model
                    .create(handle, slot_count)
                    .map_err(|e| ScriptError::from_model(e, line))?;
                self.ops.push(Op::Create {
                    id,
                    handle,
                    slots: slot_count,
                });
            }
            Stmt::SetRef { obj, index, target } => {
                self.model
                    .set_ref(obj, index, Some(target))
                    .map_err(|e| ScriptError::from_model(e, line))?;
                self.ops.push(Op::SetRef {
                    obj,
                    index,
                    target: Some(target),
                });
            }
            Stmt::ClearRef { obj, index } => {
                self.model
                    .set_ref(obj, index, None)
                    .map_err(|e| ScriptError::from_model(e, line))?;
                self.ops.push(Op::SetRef {
                    obj,
                    index,
                    target: None,
                });
            }
            Stmt::AddRoot(handle) => {
                self.model
                    .add_root(handle)
                    .map_err(|e| ScriptError::from_model(e, line))?;
                self.ops.push(Op::AddRoot(handle));
            }
            Stmt::RemoveRoot(handle) => {
                self.model
                    .remove_root(handle)
                    .map_err(|e| ScriptError::from_model(e, line))?;
                self.ops.push(Op::RemoveRoot(handle));
            }
            Stmt::DropHandle(handle) => {
                self.model
                    .drop_handle(handle)
                    .map_err(|e| ScriptError::from_model(e, line))?;
                self.ops.push(Op::DropHandle(handle));
            }
        }
        Ok(())
    }

    /// Final oracle pass: everything not reachable now is expected
    /// garbage, even if the script forgot to clear a handle to it.
    /// Appends one `ExpectGarbage` per doomed identity, then the
    /// closing `EndOfTest`.
    pub fn finish(self) -> TestPlan {
        let Interpreter {
            model, mut ops, ..
        } = self;
        let reachable = mark_reachable(&model);
        for obj in model.objects() {
            if !reachable.contains(obj.id()) {
                ops.push(Op::ExpectGarbage(obj.id()));
            }
        }
        ops.push(Op::EndOfTest);
        TestPlan {
            ops,
            total_allocated: model.total_allocated(),
            expected_survivors: reachable.len(),
            final_reachable: reachable,
        }
    }

    /// The model as mutated so far. Mostly for tests.
    pub fn model(&self) -> &GraphModel {
        &self.model
    }
}
