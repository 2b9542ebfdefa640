//! Code generation and build/execute orchestration for gcvet.
//!
//! Turns an interpreted `TestPlan` into compilable C units, drives
//! the external toolchain, runs the linked test binary against the
//! collector under test and parses its survivor report.

pub mod build;
pub mod codegen;
pub mod support;

pub use build::{BuildConfig, BuildError, RunReport, Verdict, run_plan};
pub use codegen::{ChunkPolicy, GeneratedProgram, Unit, generate_units};
