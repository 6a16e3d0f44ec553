use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{
    self, CommandReport, history::HistoryOptions, sections::SectionsOptions, watch::WatchOptions,
};
use crate::intel::source::ReportSource;

#[derive(Debug, Parser)]
#[command(
    name = "intel-report",
    version,
    about = "Versioned archive and section/metric views for scheduling intelligence reports"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Archive the live report as the next version (once per session).
    Archive,
    /// List archived versions with their generation time.
    History {
        /// Oldest first instead of newest first.
        #[arg(long)]
        asc: bool,
    },
    /// Split a report into its sections.
    Sections {
        /// `live`, `latest`, or `v<N>`.
        #[arg(long, default_value = "live")]
        source: ReportSource,
        /// Only this section key (e.g. `conflicts`).
        #[arg(long)]
        section: Option<String>,
    },
    /// Extract solver metrics from one report.
    Metrics {
        #[arg(long, default_value = "live")]
        source: ReportSource,
    },
    /// Metric series across all archived versions.
    Trends,
    /// Print a report verbatim.
    Show {
        #[arg(long, default_value = "latest")]
        source: ReportSource,
    },
    /// Run a display session: archive once, then poll the live report.
    Watch {
        /// Stop after N cycles (0 = until a STOP file appears).
        #[arg(long)]
        cycles: Option<u64>,
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Remove the session marker (clears a stale marker left by a killed session).
    Release,
    /// Show resolved paths, marker state, and configuration problems.
    Status,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "[{}] {}",
        report.command,
        if report.ok { "ok" } else { "failed" }
    );
    for detail in &report.details {
        println!("{detail}");
    }
    for issue in &report.issues {
        eprintln!("issue: {issue}");
    }
    Ok(())
}

/// Returns whether the command finished without issues. Session finalizers
/// have already run by the time this returns.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();

    let report = match cli.command {
        Command::Archive => commands::archive::run()?,
        Command::History { asc } => commands::history::run(&HistoryOptions { ascending: asc })?,
        Command::Sections { source, section } => {
            commands::sections::run(&SectionsOptions { source, section })?
        }
        Command::Metrics { source } => commands::metrics::run(source)?,
        Command::Trends => commands::trends::run()?,
        Command::Show { source } => commands::show::run(source)?,
        Command::Watch {
            cycles,
            interval_secs,
        } => commands::watch::run(&WatchOptions {
            cycles,
            interval_secs,
            echo: !cli.json,
        })?,
        Command::Release => commands::release::run()?,
        Command::Status => commands::status::run()?,
    };

    print_report(&report, cli.json)?;
    Ok(report.ok)
}
