use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use oracle_repair::oracle::{self, Oracle, OracleError, OracleStats, ServerOracle, SubprocessOracle};
use oracle_repair::{Alphabet, Grammar, RepairOutcome, SearchEngine, SearchLimits};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repair")]
#[command(about = "Repair a string until an external oracle accepts it", long_about = None)]
#[command(version)]
struct Cli {
    /// Oracle executable path, or `re2-server:<Category>` for the
    /// persistent matcher (Date, Time, URL, ISBN, IPv4, IPv6, FilePath)
    oracle_spec: String,

    /// The input string, or a path to a file whose contents are the input
    input: String,

    /// Where the repaired string is written on success
    output: PathBuf,

    /// Show a unified diff between the input and the repaired string
    #[arg(long)]
    diff: bool,
}

enum Finished {
    Repaired,
    NoFix(usize),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    oracle::ignore_sigpipe();

    // Argument errors map to exit 1, and even a misuse ends with the
    // statistics line. Help and version requests are not misuses.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err)
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            let _ = err.print();
            println!("{}", OracleStats::default());
            return ExitCode::FAILURE;
        }
    };

    let mut stats = OracleStats::default();
    let code = match run(&cli, &mut stats) {
        Ok(Finished::Repaired) => ExitCode::SUCCESS,
        Ok(Finished::NoFix(max_edits)) => {
            println!("No fix with up to {max_edits} edits found.");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{}", format!("{err:#}").red());
            ExitCode::FAILURE
        }
    };

    // Contractual last line of every run.
    println!("{stats}");
    code
}

fn run(cli: &Cli, stats: &mut OracleStats) -> Result<Finished> {
    let input = read_input(&cli.input);
    let mut oracle = build_oracle(&cli.oracle_spec)?;

    let limits = SearchLimits::from_env();
    let alphabet = Alphabet::from_env();
    let covering = Grammar::from_input(&input).covering(limits.tail_insertion);
    let engine = SearchEngine::new(&covering, alphabet, limits);

    let outcome = engine.run(&input, &mut *oracle);
    *stats = *oracle.stats();

    match outcome {
        RepairOutcome::Repaired { output, .. } => {
            fs::write(&cli.output, &output).with_context(|| {
                format!("Failed to write repaired output to {}", cli.output.display())
            })?;
            println!("Repaired string: {}", String::from_utf8_lossy(&output));
            if cli.diff {
                display_diff(&input, &output);
            }
            Ok(Finished::Repaired)
        }
        RepairOutcome::NoFix { max_edits } => Ok(Finished::NoFix(max_edits)),
    }
}

/// The input argument is a file path when it names a readable file,
/// otherwise it is the input itself.
fn read_input(arg: &str) -> Vec<u8> {
    match fs::read(arg) {
        Ok(bytes) => bytes,
        Err(_) => arg.as_bytes().to_vec(),
    }
}

fn build_oracle(spec: &str) -> Result<Box<dyn Oracle>, OracleError> {
    if let Some(category) = ServerOracle::parse_spec(spec) {
        return Ok(Box::new(ServerOracle::spawn(category)?));
    }
    let program = ensure_executable(Path::new(spec))?;
    Ok(Box::new(SubprocessOracle::new(program)))
}

/// Reject oracle paths that could never answer, before the search starts.
fn ensure_executable(path: &Path) -> Result<PathBuf, OracleError> {
    let executable = fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false);

    if executable {
        Ok(path.to_path_buf())
    } else {
        Err(OracleError::NotExecutable(path.to_path_buf()))
    }
}

/// Unified diff between the input and the repaired string.
fn display_diff(original: &[u8], repaired: &[u8]) {
    let original = String::from_utf8_lossy(original);
    let repaired = String::from_utf8_lossy(repaired);

    println!("{}", "--- input (original)".dimmed());
    println!("{}", "+++ output (repaired)".dimmed());

    let diff = TextDiff::from_lines(original.as_ref(), repaired.as_ref());
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{change}").red(),
            ChangeTag::Insert => format!("+{change}").green(),
            ChangeTag::Equal => format!(" {change}").normal(),
        };
        print!("{sign}");
    }
    // candidates rarely carry a trailing newline
    println!();
}
