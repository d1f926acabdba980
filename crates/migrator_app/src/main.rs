mod config;
mod csv_io;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use migrator_core::BatchCoordinator;
use migrator_engine::{
    write_failure_report, ArticleProcessor, Capabilities, ReportOptions, ReqwestMediaFetcher,
    UnicodeCleanup,
};
use migrator_logging::{migrator_error, migrator_info, migrator_warn, LogDestination};

use crate::config::{LinkHandling, MigratorConfig};

/// Migrate a CMS article export: clean the HTML, download media and write a
/// publish-ready CSV.
#[derive(Debug, Parser)]
#[command(name = "migrator_app", version)]
struct Cli {
    /// CMS export to read.
    #[arg(long)]
    input: PathBuf,
    /// Destination CSV.
    #[arg(long)]
    output: PathBuf,
    /// RON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Root folder for downloaded media.
    #[arg(long)]
    media_dir: Option<PathBuf>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long, value_enum)]
    link_mode: Option<LinkHandling>,
    /// Where skipped_rows.txt and the run summary go (default: next to the output).
    #[arg(long)]
    report_dir: Option<PathBuf>,
    /// Log to the terminal only, without writing migrator.log.
    #[arg(long)]
    no_log_file: bool,
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<MigratorConfig> {
        let mut config = match &self.config {
            Some(path) => MigratorConfig::load(path)?,
            None => MigratorConfig::default(),
        };
        if let Some(dir) = &self.media_dir {
            config.media_dir = dir.clone();
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(mode) = self.link_mode {
            config.link_handling = mode;
        }
        if let Some(dir) = &self.report_dir {
            config.report_dir = Some(dir.clone());
        }
        Ok(config)
    }

    fn report_dir(&self, config: &MigratorConfig) -> PathBuf {
        config.report_dir.clone().unwrap_or_else(|| {
            self.output
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let destination = if cli.no_log_file {
        LogDestination::Terminal
    } else {
        LogDestination::default()
    };
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    migrator_logging::initialize(destination, level);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            migrator_error!("Migration aborted: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every row completed or was filtered.
fn run(cli: &Cli) -> Result<bool> {
    let config = cli.resolve_config()?;
    let loaded = csv_io::load_export(&cli.input, &config.field_mapping())?;

    let fetcher = ReqwestMediaFetcher::new(config.fetch_settings())
        .context("failed to set up media downloads")?;
    let processor = ArticleProcessor::new(
        Capabilities {
            normalizer: Arc::new(UnicodeCleanup),
            fetcher: Arc::new(fetcher),
        },
        config.processor_settings(),
    );

    let report = BatchCoordinator::new(&processor, config.coordinator_settings()).run(&loaded.rows);

    let output_schema = ArticleProcessor::output_schema(&loaded.schema);
    let written = csv_io::write_rows(&cli.output, &output_schema, report.completed_rows())?;
    migrator_info!(
        "Wrote {} rows to {} ({} filtered, {} failed, {} passes)",
        report.completed.len(),
        written.display(),
        report.filtered.len(),
        report.permanently_failed.len(),
        report.passes
    );

    let generated_utc = chrono::Utc::now().to_rfc3339();
    let paths = write_failure_report(
        &cli.report_dir(&config),
        &report,
        &generated_utc,
        ReportOptions::default(),
    )?;
    if let Some(skipped) = paths.skipped_path {
        migrator_warn!(
            "{} rows could not be migrated; indices listed in {}",
            report.permanently_failed.len(),
            skipped.display()
        );
    }
    Ok(report.is_clean())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_values() {
        let cli = Cli::parse_from([
            "migrator_app",
            "--input",
            "in.csv",
            "--output",
            "out/result.csv",
            "--batch-size",
            "7",
            "--link-mode",
            "unwrap",
            "--media-dir",
            "media",
        ]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.batch_size, 7);
        assert_eq!(config.link_handling, LinkHandling::Unwrap);
        assert_eq!(config.media_dir, PathBuf::from("media"));
        assert_eq!(cli.report_dir(&config), PathBuf::from("out"));
    }

    #[test]
    fn report_dir_defaults_to_working_directory_for_bare_output() {
        let cli = Cli::parse_from(["migrator_app", "--input", "a.csv", "--output", "b.csv"]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(cli.report_dir(&config), PathBuf::from("."));
    }
}
