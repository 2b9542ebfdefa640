//! Build and execution orchestration.
//!
//! Writes the generated units, compiles each one, links them with the
//! collector under test and the runtime-support unit, runs the
//! resulting binary and parses its report. Every step is a blocking
//! external process; any failure is fatal to the run.
//!
//! Artifacts live in a scratch directory that is removed on every
//! exit path, success or failure, unless retention is requested.

use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use gv_script::TestPlan;
use log::{debug, info};
use tempfile::TempDir;

use crate::codegen::{ChunkPolicy, GeneratedProgram, Unit, generate_units};
use crate::support::{SUPPORT_HEADER, SUPPORT_HEADER_NAME, SUPPORT_SOURCE, SUPPORT_SOURCE_NAME};

/// Toolchain and layout configuration for one harness run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// C compiler binary.
    pub cc: String,
    /// Directory holding the collector's public headers (`gc.h`).
    pub include_dir: PathBuf,
    /// The collector's compiled artifact to link against.
    pub collector_object: PathBuf,
    pub cflags: Vec<String>,
    pub link_libs: Vec<String>,
    /// Build in this directory instead of a scratch dir. Implies
    /// artifact retention.
    pub work_dir: Option<PathBuf>,
    /// Keep the scratch directory for post-mortem debugging.
    pub keep_artifacts: bool,
    pub chunk: ChunkPolicy,
}

impl BuildConfig {
    pub fn new(include_dir: impl Into<PathBuf>, collector_object: impl Into<PathBuf>) -> Self {
        Self {
            cc: "gcc".to_string(),
            include_dir: include_dir.into(),
            collector_object: collector_object.into(),
            cflags: ["-std=gnu99", "-O2", "-Wall", "-g"]
                .map(str::to_string)
                .to_vec(),
            link_libs: vec!["-lrt".to_string()],
            work_dir: None,
            keep_artifacts: false,
            chunk: ChunkPolicy::default(),
        }
    }
}

/// Fatal external-process error.
#[derive(Debug)]
pub enum BuildError {
    Io(std::io::Error),
    Spawn { cmd: String, source: std::io::Error },
    Compile { unit: String, output: String },
    Link { output: String },
    Run { code: Option<i32>, output: String },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Io(e) => write!(f, "i/o error: {e}"),
            BuildError::Spawn { cmd, source } => write!(f, "failed to run {cmd}: {source}"),
            BuildError::Compile { unit, output } => {
                write!(f, "compilation of {unit} failed\n{output}")
            }
            BuildError::Link { output } => write!(f, "linking failed\n{output}"),
            BuildError::Run { code, output } => match code {
                Some(code) => write!(f, "test binary exited with code {code}\n{output}"),
                None => write!(f, "test binary was killed by a signal\n{output}"),
            },
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BuildError::Io(e) => Some(e),
            BuildError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BuildError {
    fn from(e: std::io::Error) -> Self {
        BuildError::Io(e)
    }
}

/// Parsed output of one executed test binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub expected_survivors: usize,
    /// The `actual survivors N` figure, if the binary printed one.
    pub actual_survivors: Option<usize>,
    /// Count of `... not found` liveness-assertion failures.
    pub missing_objects: usize,
    pub stdout: String,
}

impl RunReport {
    pub fn verdict(&self) -> Verdict {
        if self.missing_objects == 0 && self.actual_survivors == Some(self.expected_survivors) {
            Verdict::Pass
        } else {
            Verdict::Mismatch
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// The collector's survivor set diverged from the oracle's.
    Mismatch,
}

enum Scratch {
    Temp(TempDir),
    Fixed(PathBuf),
}

impl Scratch {
    fn path(&self) -> &Path {
        match self {
            Scratch::Temp(dir) => dir.path(),
            Scratch::Fixed(path) => path,
        }
    }
}

/// An absolute path is required: the test binary is executed with its
/// working directory set to the scratch dir, so a relative program
/// path would be resolved after that chdir and miss the binary.
fn scratch_dir(config: &BuildConfig) -> Result<Scratch, BuildError> {
    match &config.work_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            Ok(Scratch::Fixed(std::path::absolute(dir)?))
        }
        None => Ok(Scratch::Temp(TempDir::with_prefix("gcvet-")?)),
    }
}

/// Generate, build, run and parse one test plan end to end.
pub fn run_plan(
    plan: &TestPlan,
    test_name: &str,
    config: &BuildConfig,
) -> Result<RunReport, BuildError> {
    let program = generate_units(plan, test_name, config.chunk);
    info!(
        "generated {} chunk unit(s), {} statements",
        program.chunks.len(),
        plan.ops.len()
    );

    let scratch = scratch_dir(config)?;
    debug!("build directory: {}", scratch.path().display());

    let report = build_and_run(&program, plan, scratch.path(), config);

    match scratch {
        Scratch::Temp(dir) if config.keep_artifacts => {
            let kept = dir.keep();
            info!("artifacts retained in {}", kept.display());
        }
        Scratch::Temp(dir) => drop(dir),
        Scratch::Fixed(path) => debug!("artifacts left in {}", path.display()),
    }

    report
}

fn build_and_run(
    program: &GeneratedProgram,
    plan: &TestPlan,
    dir: &Path,
    config: &BuildConfig,
) -> Result<RunReport, BuildError> {
    let support_header = Unit {
        file_name: SUPPORT_HEADER_NAME.to_string(),
        source: SUPPORT_HEADER.to_string(),
    };
    let support_source = Unit {
        file_name: SUPPORT_SOURCE_NAME.to_string(),
        source: SUPPORT_SOURCE.to_string(),
    };

    fs::write(dir.join(&support_header.file_name), &support_header.source)?;

    let mut objects = Vec::new();
    let mut sources: Vec<&Unit> = vec![&support_source];
    sources.extend(program.chunks.iter());
    sources.push(&program.driver);

    let include_dir = std::path::absolute(&config.include_dir)?;
    let collector = std::path::absolute(&config.collector_object)?;

    for unit in sources {
        fs::write(dir.join(&unit.file_name), &unit.source)?;
        let object = Path::new(&unit.file_name).with_extension("o");
        let mut cmd = Command::new(&config.cc);
        cmd.current_dir(dir)
            .args(&config.cflags)
            .arg("-I")
            .arg(&include_dir)
            .arg("-c")
            .arg(&unit.file_name)
            .arg("-o")
            .arg(&object);
        let output = run_command(&mut cmd)?;
        if !output.status.success() {
            return Err(BuildError::Compile {
                unit: unit.file_name.clone(),
                output: format_output(&output),
            });
        }
        objects.push(object);
    }

    let exe = "gv_test";
    let mut cmd = Command::new(&config.cc);
    cmd.current_dir(dir).arg("-o").arg(exe);
    cmd.args(&objects);
    cmd.arg(&collector);
    cmd.args(&config.link_libs);
    let output = run_command(&mut cmd)?;
    if !output.status.success() {
        return Err(BuildError::Link {
            output: format_output(&output),
        });
    }

    let mut cmd = Command::new(dir.join(exe));
    cmd.current_dir(dir);
    let output = run_command(&mut cmd)?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        return Err(BuildError::Run {
            code: output.status.code(),
            output: format_output(&output),
        });
    }

    Ok(parse_report(&stdout, plan.expected_survivors))
}

/// Scan the binary's report for the survivor figure and any
/// missing-object diagnostics.
fn parse_report(stdout: &str, expected_survivors: usize) -> RunReport {
    let mut actual_survivors = None;
    let mut missing_objects = 0;
    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix("actual survivors ") {
            actual_survivors = rest.trim().parse().ok();
        } else if line.starts_with("object ") && line.contains("not found") {
            missing_objects += 1;
        }
    }
    RunReport {
        expected_survivors,
        actual_survivors,
        missing_objects,
        stdout: stdout.to_string(),
    }
}

fn run_command(cmd: &mut Command) -> Result<Output, BuildError> {
    let rendered = render_command(cmd);
    info!("$ {rendered}");
    cmd.output().map_err(|source| BuildError::Spawn {
        cmd: rendered,
        source,
    })
}

fn render_command(cmd: &Command) -> String {
    let mut s = shell_escape(&cmd.get_program().to_string_lossy());
    for arg in cmd.get_args() {
        s.push(' ');
        s.push_str(&shell_escape(&arg.to_string_lossy()));
    }
    s
}

fn format_output(o: &Output) -> String {
    let mut s = String::new();
    if !o.stdout.is_empty() {
        s.push_str("stdout:\n");
        s.push_str(&String::from_utf8_lossy(&o.stdout));
        if !s.ends_with('\n') {
            s.push('\n');
        }
    }
    if !o.stderr.is_empty() {
        s.push_str("stderr:\n");
        s.push_str(&String::from_utf8_lossy(&o.stderr));
        if !s.ends_with('\n') {
            s.push('\n');
        }
    }
    if s.is_empty() {
        s.push_str("(no output)\n");
    }
    s
}

fn shell_escape(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:".contains(c))
    {
        return s.to_string();
    }
    format!("{s:?}")
}
