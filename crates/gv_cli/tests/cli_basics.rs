use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn write_temp_script(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir();
    let unique = format!(
        "gcvet_test_{}_{}_{}.gct",
        name,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    );
    let path = dir.join(unique);
    fs::write(&path, content).unwrap();
    path
}

fn run_gcvet(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_gcvet"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn no_arguments_prints_usage() {
    let out = run_gcvet(&[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Usage:"));
}

#[test]
fn unknown_command_is_a_usage_error() {
    let out = run_gcvet(&["frobnicate"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn check_reports_oracle_totals() {
    let path = write_temp_script("check_totals", "0=2\n1=0\n+0\n0[0]=1\n");
    let out = run_gcvet(&["check", path.to_string_lossy().as_ref()]);
    let _ = fs::remove_file(&path);
    assert!(
        out.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("total object allocations: 2"), "{stdout}");
    assert!(
        stdout.contains("expected number of objects to survive gc: 2"),
        "{stdout}"
    );
}

#[test]
fn check_rejects_invalid_script_with_line_number() {
    let path = write_temp_script("check_invalid", "0=2\n0[2]=0\n");
    let out = run_gcvet(&["check", path.to_string_lossy().as_ref()]);
    let _ = fs::remove_file(&path);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("line: 2"), "{stderr}");
    assert!(stderr.contains("invalid reference index 2"), "{stderr}");
}

#[test]
fn check_missing_file_is_a_usage_error() {
    let out = run_gcvet(&["check", "/nonexistent/gcvet_script"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn gen_emits_a_script_check_accepts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stress.gct");
    let out = run_gcvet(&[
        "gen", "-n", "3", "-c", "50", "-f", "4", "--seed", "99", "-o",
        path.to_string_lossy().as_ref(),
    ]);
    assert!(
        out.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let out = run_gcvet(&["check", path.to_string_lossy().as_ref()]);
    assert!(
        out.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("total object allocations: 150"), "{stdout}");
}

#[test]
fn gen_is_deterministic_under_a_seed() {
    let a = run_gcvet(&["gen", "-n", "2", "-c", "30", "--seed", "5"]);
    let b = run_gcvet(&["gen", "-n", "2", "-c", "30", "--seed", "5"]);
    assert!(a.status.success() && b.status.success());
    assert_eq!(a.stdout, b.stdout);
    assert!(!a.stdout.is_empty());
}

#[test]
fn run_requires_toolchain_flags() {
    let path = write_temp_script("run_missing_flags", "0=1\n+0\n");
    let out = run_gcvet(&["run", path.to_string_lossy().as_ref()]);
    let _ = fs::remove_file(&path);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("--include"));
}

#[test]
fn run_surfaces_compiler_failure() {
    // A compiler that always fails must abort the run with a
    // compile error, not a panic or a verdict.
    let path = write_temp_script("run_bad_cc", "0=1\n+0\n");
    let out = run_gcvet(&[
        "run",
        path.to_string_lossy().as_ref(),
        "--include",
        ".",
        "--collector",
        "/nonexistent/collector.o",
        "--cc",
        "false",
    ]);
    let _ = fs::remove_file(&path);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("compilation of"), "{stderr}");
}
