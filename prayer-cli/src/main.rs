//! Prayer CLI - split an aggregate prayer document into record files
//!
//! Reads one JSON document, finds the nested mapping of sub-prayers and writes
//! each entry to `<target-dir>/<identifier>.json` with the identifier injected.
//! Settings come from command-line flags, then an optional TOML file, then
//! built-in defaults.

use clap::{ArgAction, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use prayer_io::{
    execute_export_with_progress, ExportConfig, ExportRequest, ExportSummary, KeyCollisionMode,
};
use std::error::Error;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "prayer-export")]
#[command(about = "Split a prayer document into one JSON file per sub-prayer")]
#[command(version)]
struct Cli {
    /// Source document (default: the Birchot HaShachar database file)
    source: Option<PathBuf>,
    /// Existing directory receiving one file per record
    #[arg(short = 'o', long)]
    target_dir: Option<PathBuf>,
    /// Nested path as an RFC 6901 JSON Pointer (e.g. /2-0rwa/sub-prayers)
    #[arg(long, conflicts_with = "segment")]
    pointer: Option<String>,
    /// Nested path segment; repeat for each level
    #[arg(long = "segment", action = ArgAction::Append)]
    segment: Vec<String>,
    /// Field that receives each record's identifier
    #[arg(long)]
    identifier_field: Option<String>,
    /// What to do when a record already has the identifier field
    #[arg(long, value_enum)]
    on_collision: Option<CollisionArg>,
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Maximum source document size in bytes
    #[arg(long)]
    max_buffer_bytes: Option<usize>,
    /// Resolve and validate everything, but write no files
    #[arg(long)]
    dry_run: bool,
    /// Show a progress spinner while writing
    #[arg(long)]
    progress: bool,
    /// Print the export summary as JSON on stdout
    #[arg(long)]
    json_summary: bool,
    /// Log debug detail
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CollisionArg {
    Overwrite,
    Error,
}

impl From<CollisionArg> for KeyCollisionMode {
    fn from(arg: CollisionArg) -> Self {
        match arg {
            CollisionArg::Overwrite => KeyCollisionMode::Overwrite,
            CollisionArg::Error => KeyCollisionMode::Error,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(std::io::stderr().lock(), "Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let show_progress = cli.progress;
    let json_summary = cli.json_summary;
    let config = resolve_config(cli)?;
    let request = ExportRequest::from_config(&config)?;

    let progress_bar = show_progress.then(|| create_spinner("Writing records"));
    let summary = execute_export_with_progress(request, |record| {
        if let Some(pb) = progress_bar.as_ref() {
            pb.inc(1);
            pb.set_message(record.identifier.clone());
        }
    })?;
    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!("Wrote {} records", summary.records_written));
    }

    if json_summary {
        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &summary)?;
        writeln!(&mut stdout)?;
    }
    report_summary(&summary)?;
    Ok(())
}

/// Layer command-line flags over the configuration file (if any)
fn resolve_config(cli: Cli) -> Result<ExportConfig, Box<dyn Error>> {
    let mut config = match cli.config.as_deref() {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::default(),
    };

    if cli.source.is_some() {
        config.source = cli.source;
    }
    if cli.target_dir.is_some() {
        config.target_dir = cli.target_dir;
    }
    if let Some(pointer) = cli.pointer {
        config.pointer = Some(pointer);
        config.segments = None;
    } else if !cli.segment.is_empty() {
        config.segments = Some(cli.segment);
        config.pointer = None;
    }
    if let Some(field) = cli.identifier_field {
        if field.is_empty() {
            return Err("--identifier-field must not be empty".into());
        }
        config.identifier_field = Some(field);
    }
    if let Some(mode) = cli.on_collision {
        config.on_collision = Some(mode.into());
    }
    if let Some(max) = cli.max_buffer_bytes {
        config.limits.max_buffer_bytes = max;
    }
    if cli.dry_run {
        config.dry_run = Some(true);
    }

    config.limits.validate()?;
    debug!(?config, "resolved configuration");
    Ok(config)
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn report_summary(summary: &ExportSummary) -> Result<(), Box<dyn Error>> {
    let target_dir = &summary.target_dir;
    let mut stderr = std::io::stderr().lock();
    let secs = summary.duration.as_secs_f64().max(f64::EPSILON);
    if summary.dry_run {
        writeln!(
            &mut stderr,
            "Dry run: {} records would be exported to {} (source bytes: {}, elapsed: {:.2?})",
            summary.records_found,
            target_dir.display(),
            summary.source_bytes,
            summary.duration
        )?;
    } else {
        writeln!(
            &mut stderr,
            "Exported {} records to {} (source bytes: {}, elapsed: {:.2?}, {:.1} rec/s)",
            summary.records_written,
            target_dir.display(),
            summary.source_bytes,
            summary.duration,
            summary.records_written as f64 / secs
        )?;
    }
    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use prayer_io::config::{DEFAULT_SOURCE, DEFAULT_TARGET_DIR};
    use std::fs;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["prayer-export"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn no_arguments_reproduce_historical_run() {
        let config = resolve_config(parse(&[])).unwrap();
        let request = ExportRequest::from_config(&config).unwrap();
        assert_eq!(request.source, PathBuf::from(DEFAULT_SOURCE));
        assert_eq!(request.target_dir, PathBuf::from(DEFAULT_TARGET_DIR));
        assert_eq!(request.segments, vec!["2-0rwa", "sub-prayers"]);
        assert_eq!(request.identifier_field, "prayer-id");
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("export.toml");
        fs::write(
            &config_path,
            "source = \"from-file.json\"\npointer = \"/x/y\"\nidentifier_field = \"id\"\n",
        )
        .unwrap();

        let cli = parse(&[
            "from-flag.json",
            "--config",
            config_path.to_str().unwrap(),
            "--segment",
            "3-shacharit",
            "--segment",
            "sub-prayers",
        ]);
        let config = resolve_config(cli).unwrap();

        assert_eq!(config.source, Some(PathBuf::from("from-flag.json")));
        assert_eq!(config.pointer, None);
        assert_eq!(
            config.resolve_segments().unwrap(),
            vec!["3-shacharit", "sub-prayers"]
        );
        assert_eq!(config.identifier_field.as_deref(), Some("id"));
    }

    #[test]
    fn pointer_and_segment_conflict() {
        let result =
            Cli::try_parse_from(["prayer-export", "--pointer", "/a", "--segment", "a"]);
        assert!(result.is_err());
    }

    #[test]
    fn collision_flag_maps_to_mode() {
        let config = resolve_config(parse(&["--on-collision", "error"])).unwrap();
        assert_eq!(config.on_collision, Some(KeyCollisionMode::Error));
    }

    #[test]
    fn oversized_buffer_flag_is_rejected() {
        let result = resolve_config(parse(&["--max-buffer-bytes", "1000000000000"]));
        assert!(result.is_err());
    }
}
