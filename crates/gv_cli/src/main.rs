use std::io::Write;
use std::path::PathBuf;

use gv_gen::{GenConfig, generate};
use gv_harness::{BuildConfig, Verdict, run_plan};
use gv_script::interpret;

#[cfg(not(target_env = "msvc"))]
use mimalloc::MiMalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const USAGE: &str = "Usage: gcvet <gen|check|run> [options]\n\
  gen   [-n N] [-c C] [-f F] [-r R] [-s S] [-d D] [--seed SEED] [-o FILE]\n\
  check <script>\n\
  run   <script> --include DIR --collector OBJECT [--cc CC]\n\
        [--chunk-limit N] [--work-dir DIR] [--keep-artifacts]";

fn main() {
    env_logger::init();
    let mut argv: Vec<String> = std::env::args().skip(1).collect();
    let Some(cmd) = argv.first().cloned() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    argv.remove(0);

    match cmd.as_str() {
        "gen" => cmd_gen(&argv),
        "check" => cmd_check(&argv),
        "run" => cmd_run(&argv),
        _ => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(2);
        }
    }
}

fn usage_exit(msg: &str) -> ! {
    eprintln!("{msg}\n{USAGE}");
    std::process::exit(2);
}

/// Pull the value following a flag, or die with usage.
fn take_value(argv: &[String], i: &mut usize, flag: &str) -> String {
    *i += 1;
    match argv.get(*i) {
        Some(v) => v.clone(),
        None => usage_exit(&format!("Missing value for {flag}")),
    }
}

fn parse_num<T: std::str::FromStr>(value: &str, flag: &str) -> T {
    match value.parse() {
        Ok(v) => v,
        Err(_) => usage_exit(&format!("Invalid value for {flag}: {value}")),
    }
}

fn cmd_gen(argv: &[String]) {
    let mut config = GenConfig::default();
    let mut out_file: Option<PathBuf> = None;

    let mut i = 0;
    while i < argv.len() {
        let a = argv[i].as_str();
        match a {
            "-n" => config.iterations = parse_num(&take_value(argv, &mut i, a), a),
            "-c" => config.objects_per_iter = parse_num(&take_value(argv, &mut i, a), a),
            "-f" => config.max_fanout = parse_num(&take_value(argv, &mut i, a), a),
            "-r" => config.root_percent = parse_num(&take_value(argv, &mut i, a), a),
            "-s" => config.survivor_percent = parse_num(&take_value(argv, &mut i, a), a),
            "-d" => config.delete_percent = parse_num(&take_value(argv, &mut i, a), a),
            "--seed" => config.seed = Some(parse_num(&take_value(argv, &mut i, a), a)),
            "-o" => out_file = Some(PathBuf::from(take_value(argv, &mut i, a))),
            _ => usage_exit(&format!("Unknown option: {a}")),
        }
        i += 1;
    }

    let script = generate(&config);
    match out_file {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, script) {
                eprintln!("Failed to write {}: {e}", path.display());
                std::process::exit(1);
            }
        }
        None => {
            let mut out = std::io::stdout().lock();
            if let Err(e) = out.write_all(script.as_bytes()) {
                if e.kind() == std::io::ErrorKind::BrokenPipe {
                    return;
                }
                eprintln!("stdout error: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn cmd_check(argv: &[String]) {
    let [path] = argv else {
        usage_exit("Missing <script>");
    };
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {path}: {e}");
            std::process::exit(2);
        }
    };
    let plan = match interpret(&source) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    println!("total object allocations: {}", plan.total_allocated);
    println!(
        "expected number of objects to survive gc: {}",
        plan.expected_survivors
    );
}

fn cmd_run(argv: &[String]) {
    let mut script: Option<String> = None;
    let mut include_dir: Option<PathBuf> = None;
    let mut collector: Option<PathBuf> = None;
    let mut cc: Option<String> = None;
    let mut chunk_limit: Option<usize> = None;
    let mut work_dir: Option<PathBuf> = None;
    let mut keep_artifacts = false;

    let mut i = 0;
    while i < argv.len() {
        let a = argv[i].as_str();
        match a {
            "--include" => include_dir = Some(PathBuf::from(take_value(argv, &mut i, a))),
            "--collector" => collector = Some(PathBuf::from(take_value(argv, &mut i, a))),
            "--cc" => cc = Some(take_value(argv, &mut i, a)),
            "--chunk-limit" => chunk_limit = Some(parse_num(&take_value(argv, &mut i, a), a)),
            "--work-dir" => work_dir = Some(PathBuf::from(take_value(argv, &mut i, a))),
            "--keep-artifacts" => keep_artifacts = true,
            _ if a.starts_with('-') => usage_exit(&format!("Unknown option: {a}")),
            _ => {
                if script.replace(a.to_string()).is_some() {
                    usage_exit("More than one <script> given");
                }
            }
        }
        i += 1;
    }

    let Some(script) = script else {
        usage_exit("Missing <script>");
    };
    let Some(include_dir) = include_dir else {
        usage_exit("Missing --include");
    };
    let Some(collector) = collector else {
        usage_exit("Missing --collector");
    };

    let source = match std::fs::read_to_string(&script) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {script}: {e}");
            std::process::exit(2);
        }
    };
    let plan = match interpret(&source) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    println!("total object allocations: {}", plan.total_allocated);
    println!(
        "expected number of objects to survive gc: {}",
        plan.expected_survivors
    );

    let mut config = BuildConfig::new(include_dir, collector);
    if let Some(cc) = cc {
        config.cc = cc;
    }
    if let Some(limit) = chunk_limit {
        config.chunk.statements_per_unit = limit;
    }
    config.work_dir = work_dir;
    config.keep_artifacts = keep_artifacts;

    let test_name = std::path::Path::new(&script)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| script.clone());

    let report = match run_plan(&plan, &test_name, &config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let mut out = std::io::stdout().lock();
    let _ = out.write_all(report.stdout.as_bytes());
    drop(out);

    match report.verdict() {
        Verdict::Pass => {}
        Verdict::Mismatch => {
            eprintln!(
                "survivor mismatch: expected {}, actual {}, {} object(s) not found",
                report.expected_survivors,
                report
                    .actual_survivors
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                report.missing_objects
            );
            std::process::exit(1);
        }
    }
}
