use std::process::ExitCode;

use clap::Parser;
use colored::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use usage_report::cli::{Args, OutputFormat};
use usage_report::{ReportConfig, UsageReport};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(report) if report.has_failures() => {
            error!(sections = ?report.failed_sections(), "report generated with failed sections");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<UsageReport, Box<dyn std::error::Error>> {
    let config = args.apply_to(ReportConfig::load(args.config.as_deref())?);
    info!(
        data_dir = %config.data_directory.display(),
        matches = %config.matches_path().display(),
        "building usage report"
    );

    let report = UsageReport::build(&config);
    if args.output.is_some() {
        colored::control::set_override(false);
    }
    let rendered = match args.format {
        OutputFormat::Text => report.render_text(),
        OutputFormat::Json => report.to_json()?,
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)?;
            info!(bytes = rendered.len(), path = %path.display(), "report written");
        }
        None => println!("{rendered}"),
    }

    Ok(report)
}
