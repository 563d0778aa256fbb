use anyhow::Context;
use benchgate_adapters::{CommandSource, SnapshotSource, StatisticsSource, load_stats_document};
use benchgate_app::{
    CheckOutcome, CheckRequest, CheckUseCase, SystemClock, ValidateUseCase, eval_expression,
    render_result, render_text,
};
use benchgate_config::load_config;
use benchgate_types::{AssertionStatus, Statistics, ToolInfo};
use clap::{ArgAction, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "BENCHGATE_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "benchgate",
    version,
    about = "Performance assertions over benchmark statistics, for CI"
)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). BENCHGATE_LOG wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate every selected subject's assertions and emit a report.
    Check {
        /// Config file (benchgate.toml)
        #[arg(long)]
        config: PathBuf,

        /// Statistics document (benchgate.stats.v1)
        #[arg(long, required_unless_present = "command", conflicts_with = "command")]
        stats: Option<PathBuf>,

        /// Measurement command printing a statistics document; supports
        /// {{ subject }} and {{ attempt }}. Enables re-measurement.
        #[arg(long)]
        command: Option<String>,

        /// Working directory for --command
        #[arg(long, requires = "command")]
        cwd: Option<PathBuf>,

        /// Timeout per measurement command (e.g. "30s")
        #[arg(long, requires = "command")]
        timeout: Option<String>,

        /// Baseline statistics document (benchgate.stats.v1)
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Only check this subject. Repeatable.
        #[arg(long)]
        subject: Vec<String>,

        /// Only check subjects in this group. Repeatable.
        #[arg(long)]
        group: Vec<String>,

        /// Write the JSON report here
        #[arg(long)]
        out: Option<PathBuf>,

        /// Pretty-print JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Parse every assertion in a config file without measuring.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },

    /// Evaluate one assertion against statistics given on the command line.
    Eval {
        expression: String,

        /// Current statistic, e.g. mode.time=0.004. Repeatable.
        #[arg(long, value_parser = parse_key_val_f64)]
        stat: Vec<(String, f64)>,

        /// Baseline statistic, e.g. mode.mem=1000. Repeatable.
        #[arg(long, value_parser = parse_key_val_f64)]
        baseline_stat: Vec<(String, f64)>,

        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the syntax tree of an assertion as JSON.
    Parse {
        expression: String,

        /// Pretty-print JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match real_main(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn real_main(cli: Cli) -> anyhow::Result<u8> {
    match cli.cmd {
        Command::Check {
            config,
            stats,
            command,
            cwd,
            timeout,
            baseline,
            subject,
            group,
            out,
            pretty,
        } => {
            info!(config = %config.display(), "checking");
            let config = load_config(&config)?;
            debug!(subjects = config.subjects.len(), "config loaded");
            let baseline = baseline
                .as_deref()
                .map(load_stats_document)
                .transpose()?;

            let req = CheckRequest {
                config,
                subjects: subject,
                groups: group,
                baseline,
                tool: tool_info(),
            };

            let outcome = match (stats, command) {
                (Some(path), _) => {
                    debug!(stats = %path.display(), "reading statistics snapshot");
                    run_check(SnapshotSource::open(&path)?, req)?
                }
                (None, Some(command)) => {
                    debug!(%command, "measuring with command");
                    let argv = shell_words::split(&command)
                        .with_context(|| format!("invalid --command: {command}"))?;
                    let timeout = timeout.as_deref().map(parse_duration).transpose()?;
                    let source = CommandSource::new(argv)
                        .with_cwd(cwd)
                        .with_timeout(timeout);
                    run_check(source, req)?
                }
                (None, None) => anyhow::bail!("either --stats or --command is required"),
            };

            if let Some(out) = &out {
                write_json(out, &outcome.report, pretty)?;
            }
            print!("{}", render_text(&outcome.report));

            info!(
                status = ?outcome.report.status,
                exit_code = outcome.exit_code,
                "check finished"
            );
            Ok(exit_code(outcome.exit_code))
        }

        Command::Validate { config } => {
            let config = load_config(&config)?;
            let outcome = ValidateUseCase::new().execute(&config);
            debug!(checked = outcome.checked, invalid = outcome.invalid.len(), "validated");

            for invalid in &outcome.invalid {
                println!("ERROR {}: {}", invalid.subject, invalid.error);
            }
            println!(
                "{} assertions checked, {} invalid",
                outcome.checked,
                outcome.invalid.len()
            );

            Ok(exit_code(outcome.exit_code()))
        }

        Command::Eval {
            expression,
            stat,
            baseline_stat,
            json,
        } => {
            let current = statistics(&stat).context("invalid --stat")?;
            let baseline = if baseline_stat.is_empty() {
                None
            } else {
                Some(statistics(&baseline_stat).context("invalid --baseline-stat")?)
            };

            let result = eval_expression(&expression, &current, baseline.as_ref());
            debug!(%expression, status = ?result.status, "evaluated");
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", render_result(&result));
            }

            Ok(match result.status {
                AssertionStatus::Passed => 0,
                AssertionStatus::Failed => 2,
                AssertionStatus::Error => 1,
            })
        }

        Command::Parse { expression, pretty } => {
            let ast = benchgate_expr::parse(&expression)?;
            let json = if pretty {
                serde_json::to_string_pretty(&ast)?
            } else {
                serde_json::to_string(&ast)?
            };
            println!("{json}");
            Ok(0)
        }
    }
}

fn run_check<S: StatisticsSource>(source: S, req: CheckRequest) -> anyhow::Result<CheckOutcome> {
    CheckUseCase::new(source, SystemClock).execute(req)
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "benchgate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn statistics(pairs: &[(String, f64)]) -> anyhow::Result<Statistics> {
    Ok(Statistics::from_dotted(
        pairs.iter().map(|(k, v)| (k.as_str(), *v)),
    )?)
}

fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let d = humantime::parse_duration(s).with_context(|| format!("invalid duration: {s}"))?;
    Ok(d)
}

fn parse_key_val_f64(s: &str) -> Result<(String, f64), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| "expected KEY=VALUE".to_string())?;
    let f: f64 = v.parse().map_err(|_| format!("invalid float value: {v}"))?;
    Ok((k.to_string(), f))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T, pretty: bool) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }

    let bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };

    atomic_write(path, &bytes)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    use std::io::Write;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

    {
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("create temp {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write temp {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
