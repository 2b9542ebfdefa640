//! C code generation and chunking.
//!
//! Renders the interpreter's operation stream into one or more
//! compilable translation units. A single unbounded function risks
//! compiler resource limits on large stress scripts, so the stream is
//! split at a configurable statement threshold; calling the chunk
//! functions in order reproduces the exact original sequence.

use gv_script::{Op, TestPlan};

use crate::support::SUPPORT_HEADER_NAME;

/// Chunk splitting policy. The threshold is a practical
/// translation-unit size, not a behavioral contract.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPolicy {
    pub statements_per_unit: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            statements_per_unit: 60_000,
        }
    }
}

/// One generated translation unit.
#[derive(Debug, Clone)]
pub struct Unit {
    pub file_name: String,
    pub source: String,
}

/// The full generated program: ordered chunks plus the driver.
#[derive(Debug)]
pub struct GeneratedProgram {
    pub chunks: Vec<Unit>,
    pub driver: Unit,
}

/// Render `plan` into chunk units and a driver unit.
pub fn generate_units(plan: &TestPlan, test_name: &str, policy: ChunkPolicy) -> GeneratedProgram {
    let per_unit = policy.statements_per_unit.max(1);

    // The op stream always ends with `EndOfTest`, so there is at
    // least one chunk.
    let mut chunks = Vec::with_capacity(plan.ops.len().div_ceil(per_unit));
    for (i, ops) in plan.ops.chunks(per_unit).enumerate() {
        chunks.push(render_chunk(i + 1, ops));
    }

    let driver = render_driver(plan, test_name, chunks.len());
    GeneratedProgram { chunks, driver }
}

fn chunk_func(index: usize) -> String {
    format!("gv_chunk_{index}")
}

fn render_chunk(index: usize, ops: &[Op]) -> Unit {
    let mut source = String::with_capacity(ops.len() * 32 + 128);
    source.push_str(&format!("#include \"{SUPPORT_HEADER_NAME}\"\n\n"));
    source.push_str(&format!("void {}(void) {{\n", chunk_func(index)));
    for op in ops {
        source.push_str("    ");
        push_stmt(&mut source, op);
        source.push('\n');
    }
    source.push_str("}\n");
    Unit {
        file_name: format!("gv_chunk_{index}.c"),
        source,
    }
}

fn render_driver(plan: &TestPlan, test_name: &str, chunk_count: usize) -> Unit {
    let mut source = String::new();
    source.push_str("#include <stdio.h>\n");
    source.push_str(&format!("#include \"{SUPPORT_HEADER_NAME}\"\n\n"));
    for i in 1..=chunk_count {
        source.push_str(&format!("void {}(void);\n", chunk_func(i)));
    }
    source.push_str("\nint main(void) {\n");
    source.push_str(&format!(
        "    printf(\"running gc test: {}\\n\");\n",
        sanitize_name(test_name)
    ));
    source.push_str(&format!(
        "    harness_init({}u, {}u);\n",
        plan.total_allocated, plan.expected_survivors
    ));
    for i in 1..=chunk_count {
        source.push_str(&format!("    {}();\n", chunk_func(i)));
    }
    source.push_str("    return 0;\n}\n");
    Unit {
        file_name: "gv_main.c".to_string(),
        source,
    }
}

/// Render one operation as a C statement against the support API.
fn push_stmt(out: &mut String, op: &Op) {
    let mut buf = itoa::Buffer::new();
    match *op {
        Op::Sleep(millis) => {
            out.push_str("millisleep(");
            out.push_str(buf.format(millis));
            out.push_str(");");
        }
        Op::Collect => out.push_str("run_collection();"),
        Op::Dump => out.push_str("dump_state();"),
        Op::Create { id, handle, slots } => {
            out.push_str("create_object(");
            out.push_str(buf.format(id.0));
            out.push_str(", ");
            out.push_str(buf.format(handle.0));
            out.push_str(", ");
            out.push_str(buf.format(slots));
            out.push_str(");");
        }
        Op::SetRef { obj, index, target } => {
            out.push_str("set_reference(");
            out.push_str(buf.format(obj.0));
            out.push_str(", ");
            out.push_str(buf.format(index));
            out.push_str(", ");
            match target {
                Some(t) => out.push_str(buf.format(t.0)),
                None => out.push_str("GV_NO_REF"),
            }
            out.push_str(");");
        }
        Op::AddRoot(handle) => {
            out.push_str("add_root(");
            out.push_str(buf.format(handle.0));
            out.push_str(");");
        }
        Op::RemoveRoot(handle) => {
            out.push_str("remove_root(");
            out.push_str(buf.format(handle.0));
            out.push_str(");");
        }
        Op::DropHandle(handle) => {
            out.push_str("drop_handle(");
            out.push_str(buf.format(handle.0));
            out.push_str(");");
        }
        Op::ExpectGarbage(id) => {
            out.push_str("expect_garbage(");
            out.push_str(buf.format(id.0));
            out.push_str(");");
        }
        Op::EndOfTest => out.push_str("end_of_test();"),
    }
}

/// The test name ends up inside a C string literal; keep it tame.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gv_script::interpret;

    fn plan() -> TestPlan {
        interpret("0=2 1=0 2=0\n+0\n0[0]=1\ngc\n0[0]\ne\n").unwrap()
    }

    #[test]
    fn single_chunk_contains_all_statements() {
        let plan = plan();
        let prog = generate_units(&plan, "t", ChunkPolicy::default());
        assert_eq!(prog.chunks.len(), 1);
        let src = &prog.chunks[0].source;
        assert!(src.contains("create_object(0, 0, 2);"));
        assert!(src.contains("add_root(0);"));
        assert!(src.contains("set_reference(0, 0, 1);"));
        assert!(src.contains("run_collection();"));
        assert!(src.contains("set_reference(0, 0, GV_NO_REF);"));
        assert!(src.contains("expect_garbage(1);"));
        assert!(src.contains("expect_garbage(2);"));
        assert!(src.ends_with("end_of_test();\n}\n"));
    }

    #[test]
    fn chunking_preserves_order_and_count() {
        let plan = plan();
        let total_ops = plan.ops.len();
        let prog = generate_units(
            &plan,
            "t",
            ChunkPolicy {
                statements_per_unit: 3,
            },
        );
        assert_eq!(prog.chunks.len(), total_ops.div_ceil(3));

        // Concatenating chunk bodies yields the same statement
        // sequence as a single unchunked unit.
        let whole = generate_units(&plan, "t", ChunkPolicy::default());
        let stmts = |units: &[Unit]| -> Vec<String> {
            units
                .iter()
                .flat_map(|u| {
                    u.source
                        .lines()
                        .filter(|l| l.starts_with("    "))
                        .map(|l| l.trim().to_string())
                        .collect::<Vec<_>>()
                })
                .collect()
        };
        assert_eq!(stmts(&prog.chunks), stmts(&whole.chunks));
    }

    #[test]
    fn driver_calls_every_chunk_in_order() {
        let plan = plan();
        let prog = generate_units(
            &plan,
            "mytest",
            ChunkPolicy {
                statements_per_unit: 2,
            },
        );
        let driver = &prog.driver.source;
        assert!(driver.contains("running gc test: mytest"));
        assert!(driver.contains(&format!(
            "harness_init({}u, {}u);",
            plan.total_allocated, plan.expected_survivors
        )));
        let mut last = 0;
        for i in 1..=prog.chunks.len() {
            let pos = driver
                .find(&format!("    gv_chunk_{i}();"))
                .unwrap_or_else(|| panic!("driver missing call to chunk {i}"));
            assert!(pos > last);
            last = pos;
        }
    }

    #[test]
    fn empty_script_still_produces_a_runnable_program() {
        let plan = interpret("").unwrap();
        let prog = generate_units(&plan, "empty", ChunkPolicy::default());
        assert_eq!(prog.chunks.len(), 1);
        // Just the end-of-test call.
        assert!(prog.chunks[0].source.contains("end_of_test();"));
    }

    #[test]
    fn test_name_is_sanitized_for_c_literal() {
        let plan = interpret("").unwrap();
        let prog = generate_units(&plan, "a\"b\\c\nd", ChunkPolicy::default());
        assert!(prog.driver.source.contains("running gc test: a_b_c_d"));
    }
}
