//! mreplace CLI - apply many literal replacements to a document in one pass
//!
//! Every pattern is matched literally against the original text. Where
//! patterns compete, the longest one wins, and replaced text is never matched
//! again, so `a -> b` and `b -> c` turn "a b" into "b c".
//!
//! Rules come from (in order of precedence):
//! - `--replace FROM TO` arguments and `--rules FILE` files
//! - `[[rules]]` tables in `.mreplace.toml`

mod backup;
mod config;
mod gate;
mod output;
mod process;
mod rules;

use anyhow::{bail, Result};
use clap::Parser;
use colored::*;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use backup::{verify_written, BackupManager};
use config::Config;
use gate::{AutoApprove, CommitGate, Prompt};
use mreplace_core::{RuleSet, SubstitutionEngine};
use output::{OutputFormat, Reporter};
use process::{process_document, write_file, DocumentSource};

#[derive(Parser)]
#[command(name = "mreplace")]
#[command(version)]
#[command(about = "Apply many literal text replacements to a document in a single pass")]
struct Cli {
    /// Document to process, or `-` to read from stdin
    path: PathBuf,

    /// Replace FROM with TO (can be specified multiple times)
    #[arg(
        long,
        short = 'r',
        num_args = 2,
        value_names = ["FROM", "TO"],
        allow_hyphen_values = true
    )]
    replace: Vec<String>,

    /// Load rules from a TOML or JSON file (can be specified multiple times)
    #[arg(long = "rules", value_name = "FILE")]
    rules_files: Vec<PathBuf>,

    /// Preview changes without writing them (default mode)
    #[arg(long, conflicts_with_all = ["fix", "interactive"])]
    check: bool,

    /// Write the substituted document
    #[arg(long)]
    fix: bool,

    /// Show the preview and ask before writing
    #[arg(long, short = 'i')]
    interactive: bool,

    /// Show changes without applying them (alias for --check)
    #[arg(long, short = 'n', hide = true, conflicts_with_all = ["fix", "interactive"])]
    dry_run: bool,

    /// Write the result to PATH instead of overwriting the input
    #[arg(long, short = 'o', value_name = "PATH", conflicts_with = "stdout")]
    output: Option<PathBuf>,

    /// Write the result to stdout instead of overwriting the input
    #[arg(long)]
    stdout: bool,

    /// Output format: text, json, diff
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(long, conflicts_with = "format")]
    json: bool,

    /// Path to config file (default: auto-detect .mreplace.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ignore config files
    #[arg(long)]
    no_config: bool,

    /// Back up the target file before overwriting it
    #[arg(long)]
    backup: bool,

    /// Directory for backups (default: .mreplace-backup)
    #[arg(long, value_name = "DIR")]
    backup_dir: Option<PathBuf>,

    /// Show verbose output
    #[arg(long, short = 'v')]
    verbose: bool,
}


/// Where committed text goes
#[derive(Debug, Clone, PartialEq, Eq)]
enum Sink {
    Stdout,
    File(PathBuf),
}

impl Sink {
    fn resolve(source: &DocumentSource, output: Option<&Path>, stdout: bool) -> Self {
        match (output, source.path()) {
            (Some(path), _) => Sink::File(path.to_path_buf()),
            (None, Some(path)) if !stdout => Sink::File(path.to_path_buf()),
            _ => Sink::Stdout,
        }
    }

    /// True when writing here would overwrite the source document
    fn is_source(&self, source: &DocumentSource) -> bool {
        match (self, source.path()) {
            (Sink::File(path), Some(source)) => path == source || same_file(path, source),
            _ => false,
        }
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Stdout => f.write_str("<stdout>"),
            Sink::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Spellings like `./doc.txt` and `doc.txt` name the same existing file
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// One resolved invocation: what to read, where to write, and how to report
struct Job {
    source: DocumentSource,
    sink: Sink,
    fix_mode: bool,
    interactive: bool,
    format: OutputFormat,
    verbose: bool,
}

impl Job {
    fn from_cli(cli: &Cli, format: OutputFormat) -> Result<Self> {
        let source = DocumentSource::from_arg(&cli.path);

        if cli.interactive && source == DocumentSource::Stdin {
            bail!("--interactive needs the terminal for confirmation and cannot read the document from stdin");
        }
        if cli.interactive && format == OutputFormat::Json {
            bail!("--interactive previews changes as text or diff and cannot be combined with JSON output");
        }

        // --check, --dry-run, or neither --fix nor --interactive
        let check_mode = cli.check || cli.dry_run || !(cli.fix || cli.interactive);
        let sink = Sink::resolve(&source, cli.output.as_deref(), cli.stdout);

        Ok(Self {
            source,
            sink,
            fix_mode: !check_mode,
            interactive: cli.interactive,
            format,
            verbose: cli.verbose,
        })
    }

    fn check_mode(&self) -> bool {
        !self.fix_mode
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    if cli.no_config {
        return Ok(Config::default());
    }

    if let Some(config_path) = &cli.config {
        let cfg = Config::load_path(config_path)?;
        tracing::debug!(path = %config_path.display(), "using config");
        return Ok(cfg);
    }

    match Config::load()? {
        Some((cfg, path)) => {
            tracing::debug!(path = %path.display(), "using config");
            Ok(cfg)
        }
        None => Ok(Config::default()),
    }
}

/// `--json` wins over `--format`, which wins over the config file
fn resolve_format(cli: &Cli, config: &Config) -> Result<OutputFormat> {
    if cli.json {
        return Ok(OutputFormat::Json);
    }

    match cli.format.as_deref().or(config.output.format.as_deref()) {
        Some(name) => OutputFormat::from_str(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid output format '{}'. Valid options: text, json, diff",
                name
            )
        }),
        None => Ok(OutputFormat::Text),
    }
}

fn run() -> Result<u8> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let format = resolve_format(&cli, &config)?;

    let cli_rules = rules::collect_cli_rules(&cli.rules_files, &cli.replace)?;
    let rule_set = rules::build_rule_set(config.effective_rules(cli_rules));

    if rule_set.is_empty() {
        eprintln!(
            "{}: No valid replacement rules. Use --replace FROM TO, --rules FILE or a config file.",
            "Error".red()
        );
        return Ok(1);
    }

    let job = Job::from_cli(&cli, format)?;
    let mut backups = BackupManager::new(
        cli.backup_dir.clone().unwrap_or_else(|| config.backup_dir()),
        cli.backup || config.backup.enabled,
    );
    let mut gate: Box<dyn CommitGate> = if job.interactive {
        Box::new(Prompt::new(io::stdin().lock(), io::stderr()))
    } else {
        Box::new(AutoApprove)
    };

    execute(
        &job,
        &rule_set,
        &mut backups,
        gate.as_mut(),
        &mut io::stdout().lock(),
        &mut io::stderr(),
    )
}

/// Substitute, report, and commit through `gate`; returns the exit code
fn execute<O: Write, E: Write>(
    job: &Job,
    rule_set: &RuleSet,
    backups: &mut BackupManager,
    gate: &mut dyn CommitGate,
    stdout: &mut O,
    stderr: &mut E,
) -> Result<u8> {
    let mode = if job.fix_mode { "fix" } else { "check" };
    tracing::debug!(
        mode,
        rules = rule_set.len(),
        source = %job.source,
        sink = %job.sink,
        "starting"
    );

    // Keep stdout clean when it carries the document
    let mut discard = io::sink();
    let (report_out, document_out) = if job.fix_mode && job.sink == Sink::Stdout {
        (stderr as &mut dyn Write, stdout as &mut dyn Write)
    } else {
        (stdout as &mut dyn Write, &mut discard as &mut dyn Write)
    };

    let mut reporter = Reporter::new(report_out, job.format, job.verbose, rule_set.len());
    let label = job.source.to_string();

    let document = match job.source.read() {
        Ok(document) => document,
        Err(e) => {
            reporter.report_error(&label, &format!("{:#}", e))?;
            return finish(reporter, job.check_mode());
        }
    };

    let engine = SubstitutionEngine::new(rule_set);
    let result = process_document(document, &engine)?;

    if !result.has_changes() {
        // The sink still receives the document when it is somewhere else
        if job.fix_mode && !job.sink.is_source(&job.source) {
            commit(&job.sink, result.final_text(), backups, document_out)?;
        }
        reporter.report_skipped(&label)?;
        return finish(reporter, job.check_mode());
    }

    if job.check_mode() || job.interactive {
        reporter.report_check(&label, result.edits.clone(), &result.old_source, result.final_text())?;
    }
    if job.check_mode() {
        return finish(reporter, true);
    }

    let target = job.sink.to_string();
    if gate.approve(&target, result.edits.len())? {
        commit(&job.sink, result.final_text(), backups, document_out)?;
        reporter.report_fix(&target, result.edits)?;
    } else {
        reporter.report_declined(&label, result.edits)?;
    }

    finish(reporter, false)
}

/// Hand the text to the sink, backing up and verifying file targets
fn commit(sink: &Sink, text: &str, backups: &mut BackupManager, stdout: &mut dyn Write) -> Result<()> {
    match sink {
        Sink::Stdout => {
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
        Sink::File(path) => {
            if let Some(saved) = backups.save(path)? {
                tracing::info!(backup = %saved.display(), "original saved");
            }

            write_file(path, text)?;
            if !verify_written(path, text)? {
                bail!("Verification failed after writing {}", path.display());
            }
        }
    }
    Ok(())
}

fn finish<W: Write>(reporter: Reporter<W>, check_mode: bool) -> Result<u8> {
    let summary = reporter.summary().clone();
    reporter.finish(check_mode)?;

    let exit_code = if summary.errors > 0 {
        1
    } else if check_mode && summary.changed {
        2
    } else {
        0
    };

    Ok(exit_code)
}
