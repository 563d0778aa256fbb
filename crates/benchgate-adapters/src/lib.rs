//! Std adapters for benchgate.
//!
//! In clean-arch terms: this is where we touch the world. Statistics come
//! either from a document on disk or from an external measurement command.

use anyhow::Context;
use benchgate_error::ConfigError;
use benchgate_types::{STATS_SCHEMA_V1, StatsDocument, VariantStatistics};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const SUBJECT_TOKENS: [&str; 2] = ["{{ subject }}", "{{subject}}"];
const ATTEMPT_TOKENS: [&str; 2] = ["{{ attempt }}", "{{attempt}}"];

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("command argv must not be empty")]
    EmptyArgv,

    #[error("measurement command timed out after {0:?}")]
    Timeout(Duration),

    #[error("measurement command exited with code {code}: {stderr}")]
    CommandFailed { code: i32, stderr: String },

    #[error("measurement command produced undecodable statistics: {output}")]
    Decode {
        output: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no statistics for subject `{0}`")]
    NoStatistics(String),

    #[error(transparent)]
    Document(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Where the statistics of a subject come from.
///
/// `attempt` starts at 1 and grows with every re-measurement.
pub trait StatisticsSource {
    fn collect(&self, subject: &str, attempt: u32)
    -> Result<Vec<VariantStatistics>, AdapterError>;

    /// Whether a second `collect` for the same subject can yield new numbers.
    fn can_remeasure(&self) -> bool;
}

/// Serves a statistics document that was measured ahead of time.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    document: StatsDocument,
}

impl SnapshotSource {
    pub fn new(document: StatsDocument) -> Self {
        Self { document }
    }

    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        load_stats_document(path).map(Self::new)
    }
}

impl StatisticsSource for SnapshotSource {
    fn collect(
        &self,
        subject: &str,
        _attempt: u32,
    ) -> Result<Vec<VariantStatistics>, AdapterError> {
        let results: Vec<_> = self.document.for_subject(subject).cloned().collect();
        if results.is_empty() {
            return Err(AdapterError::NoStatistics(subject.to_string()));
        }
        Ok(results)
    }

    fn can_remeasure(&self) -> bool {
        false
    }
}

/// Runs an external measurement command once per subject and attempt.
///
/// `{{ subject }}` and `{{ attempt }}` in argv are substituted before the
/// command runs. The command must print a `benchgate.stats.v1` document on
/// stdout.
#[derive(Debug, Clone)]
pub struct CommandSource {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl CommandSource {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            cwd: None,
            timeout: None,
        }
    }

    pub fn with_cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn argv_for(&self, subject: &str, attempt: u32) -> Vec<String> {
        let attempt = attempt.to_string();
        self.argv
            .iter()
            .map(|arg| substitute(arg, subject, &attempt))
            .collect()
    }
}

impl StatisticsSource for CommandSource {
    fn collect(
        &self,
        subject: &str,
        attempt: u32,
    ) -> Result<Vec<VariantStatistics>, AdapterError> {
        let argv = self.argv_for(subject, attempt);
        let output = run(&argv, self.cwd.as_deref(), self.timeout)?;

        if output.code != 0 {
            return Err(AdapterError::CommandFailed {
                code: output.code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let document: StatsDocument =
            serde_json::from_slice(&output.stdout).map_err(|source| AdapterError::Decode {
                output: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                source,
            })?;
        check_schema(&document)?;

        let results: Vec<_> = document.for_subject(subject).cloned().collect();
        if results.is_empty() {
            return Err(AdapterError::NoStatistics(subject.to_string()));
        }
        Ok(results)
    }

    fn can_remeasure(&self) -> bool {
        true
    }
}

fn substitute(arg: &str, subject: &str, attempt: &str) -> String {
    let mut out = arg.to_string();
    for token in SUBJECT_TOKENS {
        out = out.replace(token, subject);
    }
    for token in ATTEMPT_TOKENS {
        out = out.replace(token, attempt);
    }
    out
}

struct Output {
    code: i32,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn run(argv: &[String], cwd: Option<&Path>, timeout: Option<Duration>) -> Result<Output, AdapterError> {
    let (program, args) = argv.split_first().ok_or(AdapterError::EmptyArgv)?;

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own group, so a timeout can take down whatever the command forked.
        cmd.process_group(0);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn {argv:?}"))?;

    let stdout = child.stdout.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf).map(|_| buf).unwrap_or_default()
        })
    });
    let stderr = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf).map(|_| buf).unwrap_or_default()
        })
    });

    let join = |handle: Option<thread::JoinHandle<Vec<u8>>>| {
        handle
            .map(|h| h.join().unwrap_or_default())
            .unwrap_or_default()
    };

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("failed to wait for {argv:?}"))?
        {
            break status;
        }
        if let Some(limit) = timeout
            && start.elapsed() >= limit
        {
            kill_tree(&mut child);
            let _ = child.wait();
            // With the group gone the pipes close and both readers finish.
            join(stdout);
            join(stderr);
            return Err(AdapterError::Timeout(limit));
        }
        thread::sleep(Duration::from_millis(10));
    };

    Ok(Output {
        code: status.code().unwrap_or(-1),
        stdout: join(stdout),
        stderr: join(stderr),
    })
}

/// SIGKILL the child's process group. Errors are ignored: the group may
/// already have exited.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
}

/// Without process groups only the direct child can be killed; output
/// readers may then wait on grandchildren that inherited the pipes.
#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

/// Read a `benchgate.stats.v1` document.
pub fn load_stats_document(path: &Path) -> Result<StatsDocument, ConfigError> {
    let bytes = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: StatsDocument =
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    check_schema(&document)?;
    Ok(document)
}

pub fn check_schema(document: &StatsDocument) -> Result<(), ConfigError> {
    if document.schema == STATS_SCHEMA_V1 {
        Ok(())
    } else {
        Err(ConfigError::Schema {
            found: document.schema.clone(),
            expected: STATS_SCHEMA_V1,
        })
    }
}
