use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use snaptrail::{DedupPolicy, NormalizeOptions, ReconstructOptions, Table, TimeZoneMode};
use snaptrail_git::ReconstructConfig;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to the git repository
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    /// Tracked file, relative to the repository root
    #[arg(short, long)]
    path: String,

    /// Branch name or revision expression
    #[arg(short, long, default_value = "main")]
    branch: String,

    /// Top-level field holding the observation list
    #[arg(long, default_value = snaptrail::DEFAULT_SEQUENCE_FIELD)]
    sequence_field: String,

    /// Columns to drop from the output (comma-separated or repeated)
    #[arg(long, value_delimiter = ',', default_values = snaptrail::DEFAULT_EXCLUDED_COLUMNS)]
    exclude: Vec<String>,

    /// Keep every column, ignoring --exclude
    #[arg(long)]
    no_exclude: bool,

    /// Zone for commit times: local, utc or commit
    #[arg(long, default_value_t = TimeZoneMode::Local)]
    time_zone: TimeZoneMode,

    /// Flatten nested objects in observations into columns joined by this separator
    #[arg(long)]
    flatten: Option<String>,

    /// Keep only the latest revision's row per value of these columns
    #[arg(long = "dedup-key", value_delimiter = ',')]
    dedup_key: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Output file (use - for stdout) [default: data_history.csv or data_history.json]
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    fn default_output(self) -> &'static str {
        match self {
            OutputFormat::Csv => "data_history.csv",
            OutputFormat::Json => "data_history.json",
        }
    }
}

impl BuildArgs {
    fn config(&self) -> Result<ReconstructConfig> {
        let repo_path = if self.repo.is_absolute() {
            self.repo.clone()
        } else {
            std::env::current_dir()?.join(&self.repo)
        };

        let excluded_columns = if self.no_exclude {
            Vec::new()
        } else {
            self.exclude
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string())
                .collect()
        };

        let dedup = if self.dedup_key.is_empty() {
            DedupPolicy::KeepAll
        } else {
            DedupPolicy::LatestRevisionWins {
                key: self.dedup_key.clone(),
            }
        };

        Ok(ReconstructConfig {
            repository_location: repo_path,
            tracked_path: self.path.clone(),
            reference: self.branch.clone(),
            options: ReconstructOptions {
                normalize: NormalizeOptions {
                    sequence_field: self.sequence_field.clone(),
                    flatten_separator: self.flatten.clone(),
                },
                excluded_columns,
                time_zone: self.time_zone,
                dedup,
            },
        })
    }
}

pub fn run(args: BuildArgs, pretty: bool) -> Result<()> {
    let config = args.config()?;
    debug!(?config, "resolved build configuration");
    let report = snaptrail_git::reconstruct(&config)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.format.default_output().to_string());

    if output == "-" {
        let stdout = std::io::stdout();
        write_table(&report.table, args.format, pretty, stdout.lock())?;
        return Ok(());
    }

    let path = Path::new(&output);
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_table(&report.table, args.format, pretty, BufWriter::new(file))
        .with_context(|| format!("Failed to write {:?}", path))?;

    println!(
        "Wrote {} rows ({} columns) to {}",
        report.table.len(),
        report.table.columns.len(),
        path.display()
    );
    println!(
        "Revisions: {} processed, {} skipped",
        report.processed,
        report.skipped.len()
    );
    Ok(())
}

fn write_table<W: Write>(
    table: &Table,
    format: OutputFormat,
    pretty: bool,
    mut writer: W,
) -> Result<()> {
    match format {
        OutputFormat::Csv => snaptrail::write_csv(table, writer)?,
        OutputFormat::Json => {
            let json = snaptrail::to_json(table, pretty)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }
    }
    Ok(())
}
