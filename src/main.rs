use ansi_term::Colour;
use clap::{Parser, ValueEnum};
use dirdedupe::logging::{init_logging, LogLevel};
use dirdedupe::{
    DeletionFailure, DirectoryCatalog, DuplicateResolver, LineWriter, ResolverOptions, RunReport,
};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

/// Deletes byte-identical duplicate files in a single directory, keeping the
/// first copy the directory listing returns. Subdirectories are left alone.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to deduplicate
    directory: PathBuf,

    /// Delete without asking for confirmation first
    #[arg(short = 'f', long)]
    force: bool,

    /// Do not print a line for every file read, compared and deleted.
    #[arg(short = 'q', long)]
    quiet: bool,

    /// File name to leave out of the scan. May be given more than once.
    #[arg(short = 'x', long = "exclude", value_name = "NAME")]
    exclude: Vec<String>,

    /// Do not revisit files that already took part in a duplicate group.
    #[arg(long)]
    skip_resolved: bool,

    /// Exit with a failure status if any duplicate could not be deleted.
    #[arg(long)]
    fail_on_error: bool,

    /// Summary format to emit after processing.
    #[arg(long, value_enum, default_value = "text")]
    summary_format: SummaryFormat,

    /// Optional path to write the final summary output.
    #[arg(long)]
    summary_path: Option<PathBuf>,

    /// Suppress printing the final summary lines to stdout (file/JSON output still generated).
    #[arg(long)]
    summary_silent: bool,

    /// Logging verbosity for progress and diagnostics. RUST_LOG takes precedence.
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

/// Converts a file size in bytes to a human‐readable string with appropriate units.
fn human_readable(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let mins = secs / 60;
    let secs = secs % 60;
    if mins > 0 {
        format!("{} min {} sec", mins, secs)
    } else {
        format!("{} sec", secs)
    }
}

#[derive(Copy, Clone, Debug, Serialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum SummaryFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    directory: String,
    candidate_files: usize,
    visited_files: usize,
    skipped_files: usize,
    duplicate_groups: usize,
    deleted_files: usize,
    reclaimed_bytes: u64,
    elapsed_seconds: f64,
    skip_resolved: bool,
    summary_format: SummaryFormat,
    deleted: &'a [PathBuf],
    failures: &'a [DeletionFailure],
}

fn write_summary_to_path(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut data = contents.to_string();
    if !data.ends_with('\n') {
        data.push('\n');
    }
    fs::write(path, data)
}

#[derive(Debug)]
enum AppError {
    Io(io::Error),
    Catalog(dirdedupe::Error),
    DeletionFailures(usize),
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<dirdedupe::Error> for AppError {
    fn from(err: dirdedupe::Error) -> Self {
        AppError::Catalog(err)
    }
}

fn text_summary(report: &RunReport, elapsed: Duration) -> String {
    format!(
        "{} files scanned, {} duplicate groups found, {} files deleted ({} reclaimed) in {}.",
        report.candidates,
        report.duplicate_groups,
        report.deleted.len(),
        human_readable(report.reclaimed_bytes),
        format_duration(elapsed)
    )
}

fn run_app<R: BufRead>(args: Args, mut input: R) -> Result<(), AppError> {
    let summary_stdout = args.summary_format == SummaryFormat::Text && !args.summary_silent;
    let log_output = !args.quiet && args.log_level.shows_info();
    let warn_logs = !args.quiet && args.log_level.shows_warnings();
    let show_progress = log_output && args.summary_format == SummaryFormat::Text;
    let mut summary_lines: Vec<String> = Vec::new();

    let catalog =
        DirectoryCatalog::open_with_exclusions(&args.directory, args.exclude.iter().cloned())?;

    if summary_stdout {
        println!(
            "Starting duplicate scan in directory: {} ({} files)",
            catalog.directory().display(),
            catalog.len()
        );
    }

    if !args.force {
        print!(
            "WARNING: Duplicate files will be permanently deleted. Do you wish to proceed? (y/N): "
        );
        io::stdout().flush()?;
        let mut confirmation = String::new();
        input.read_line(&mut confirmation)?;
        if !confirmation.trim().eq_ignore_ascii_case("y") {
            println!("Operation cancelled.");
            return Ok(());
        }
    }

    let options = ResolverOptions {
        show_progress,
        skip_resolved: args.skip_resolved,
    };
    let start = Instant::now();
    let report = DuplicateResolver::with_sink(LineWriter::stdout())
        .options(options)
        .run(&catalog);
    let elapsed = start.elapsed();

    if log_output && !report.deleted.is_empty() {
        println!();
        println!("{}", Colour::Fixed(8).paint("Deleted files:"));
        for path in &report.deleted {
            println!("  {}", path.display());
        }
    }

    let summary = text_summary(&report, elapsed);
    summary_lines.push(format!("Duplicate scan summary: {}", summary));
    if summary_stdout {
        println!(
            "{} {}",
            Colour::RGB(173, 216, 230).paint("Duplicate scan summary:"),
            Colour::RGB(255, 255, 224).paint(summary)
        );
        println!("Operation complete.");
    }

    if !report.failures.is_empty() {
        if warn_logs {
            eprintln!("The following files could not be deleted:");
            for failure in &report.failures {
                eprintln!("  {}: {}", failure.path.display(), failure.error);
            }
        } else {
            eprintln!("{} deletion failures", report.failures.len());
        }
        for failure in &report.failures {
            summary_lines.push(format!(
                "Failure: {}: {}",
                failure.path.display(),
                failure.error
            ));
        }
    }

    let mut json_summary_output: Option<String> = None;
    if args.summary_format == SummaryFormat::Json {
        let json_summary = JsonSummary {
            directory: args.directory.display().to_string(),
            candidate_files: report.candidates,
            visited_files: report.visited,
            skipped_files: report.skipped,
            duplicate_groups: report.duplicate_groups,
            deleted_files: report.deleted.len(),
            reclaimed_bytes: report.reclaimed_bytes,
            elapsed_seconds: elapsed.as_secs_f64(),
            skip_resolved: args.skip_resolved,
            summary_format: args.summary_format,
            deleted: &report.deleted,
            failures: &report.failures,
        };
        let json_output = serde_json::to_string_pretty(&json_summary)
            .map_err(|err| AppError::Io(io::Error::new(io::ErrorKind::Other, err.to_string())))?;
        if !args.summary_silent {
            println!("{}", json_output);
        }
        json_summary_output = Some(json_output);
    }

    if let Some(path) = &args.summary_path {
        let contents = match args.summary_format {
            SummaryFormat::Json => json_summary_output.unwrap_or_else(|| String::from("{}")),
            SummaryFormat::Text => summary_lines.join("\n"),
        };
        write_summary_to_path(path, &contents)?;
    }

    if args.fail_on_error && !report.failures.is_empty() {
        return Err(AppError::DeletionFailures(report.failures.len()));
    }

    Ok(())
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    init_logging(args.log_level);
    let stdin = io::stdin();
    let stdin_lock = stdin.lock();
    match run_app(args, stdin_lock) {
        Ok(()) => Ok(()),
        Err(AppError::Io(err)) => Err(err),
        Err(AppError::Catalog(err)) => {
            eprintln!("{}", err);
            process::exit(1);
        }
        Err(AppError::DeletionFailures(count)) => {
            eprintln!("{} duplicate files could not be deleted.", count);
            process::exit(1);
        }
    }
}
