use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tabled::{settings::Style, Table, Tabled};

use equitrain::{
    init_logging, AnalysisError, AnalysisOutcome, AnalysisType, Analyzer, AppConfig, Database,
    SubjectId,
};

/// Equitrain - Horse Training Analytics CLI
///
/// Summarizes recorded training sessions per horse and flags sessions that
/// look like physiological overload.
#[derive(Parser)]
#[command(name = "equitrain")]
#[command(version)]
#[command(about = "Horse training analytics CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides the database path from the config
    #[arg(short, long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import training sessions from a JSON file
    Import {
        /// JSON array of sessions
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Per-type summary and heart-rate trends
    Basic {
        /// Restrict to one horse (all horses when omitted)
        #[arg(short, long)]
        subject: Option<String>,
    },

    /// Rule and model based overload detection for one horse
    Overload {
        #[arg(short, long)]
        subject: String,
    },

    /// Print a stored analysis document
    Show {
        #[arg(short, long)]
        subject: String,

        /// training_summary or overload
        #[arg(short, long, default_value = "training_summary")]
        kind: AnalysisType,
    },

    /// List stored analyses and database counts
    Status,
}

#[derive(Tabled)]
struct SubjectRow {
    #[tabled(rename = "Horse")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Types")]
    types: usize,
    #[tabled(rename = "Records")]
    records: usize,
}

#[derive(Tabled)]
struct AnalysisRow {
    #[tabled(rename = "Horse")]
    subject: String,
    #[tabled(rename = "Analysis")]
    kind: String,
    #[tabled(rename = "Generated")]
    generated_at: String,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };
    config.apply_env_overrides();
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    config.validate()?;
    Ok(config)
}

fn open_database(config: &AppConfig) -> Result<Database> {
    let path = &config.database.path;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
    }
    Database::new(path).with_context(|| format!("Failed to open database: {}", path.display()))
}

/// Print a failure; analysis errors are logged at their severity
fn report_error(err: &anyhow::Error) {
    let message = match err.downcast_ref::<AnalysisError>() {
        Some(analysis_err) => analysis_err.report(),
        None => format!("{:#}", err),
    };
    eprintln!("{} {}", "✗".red().bold(), message);
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    init_logging(&config.logging.clone().with_verbosity(cli.verbose))?;

    match &cli.command {
        Commands::Import { file } => {
            let mut db = open_database(&config)?;
            println!("{}", "Importing training sessions...".green().bold());
            let count = db
                .import_sessions_file(file)
                .with_context(|| format!("Failed to import {}", file.display()))?;
            println!("{} {} sessions imported", "✓".green(), count);
        }

        Commands::Basic { subject } => {
            let db = open_database(&config)?;
            let analyzer = Analyzer::from_config(&db, &config);
            println!("{}", "Running training summary...".cyan().bold());

            match analyzer.run_basic_analysis(subject.as_deref())? {
                AnalysisOutcome::Success(report) => {
                    let rows: Vec<SubjectRow> = report
                        .subjects
                        .iter()
                        .map(|s| SubjectRow {
                            id: s.subject_id.to_string(),
                            name: s.subject_name.clone(),
                            types: s.training_types,
                            records: s.records,
                        })
                        .collect();
                    println!("{}", Table::new(rows).with(Style::rounded()));
                    if report.entries_malformed > 0 {
                        println!(
                            "{} {} malformed entries skipped",
                            "!".yellow(),
                            report.entries_malformed
                        );
                    }
                    println!("{} {} summaries stored", "✓".cyan(), report.subjects.len());
                }
                AnalysisOutcome::Empty(reason) => {
                    println!("{} Nothing to analyze: {}", "-".dimmed(), reason);
                }
            }
        }

        Commands::Overload { subject } => {
            let db = open_database(&config)?;
            let analyzer = Analyzer::from_config(&db, &config);
            println!("{}", "Running overload analysis...".magenta().bold());

            match analyzer.run_overload_analysis(Some(subject.as_str()))? {
                AnalysisOutcome::Success(stats) => {
                    println!("  Sessions:    {}", stats.total);
                    println!("  Overloaded:  {}", stats.overloaded_count.to_string().red());
                    println!("  OK:          {}", stats.ok_count.to_string().green());
                    println!("  Rule flags:  {}", stats.rule_flagged);
                    println!("  Model flags: {}", stats.model_flagged);
                    for (rule, hits) in stats.rule_hits.iter().filter(|(_, &hits)| hits > 0) {
                        println!("    {:>3} × {}", hits, rule.description());
                    }
                    if let Some(accuracy) = stats.accuracy {
                        println!("  Accuracy:    {}", accuracy);
                    }
                    println!("{} Overload analysis stored", "✓".magenta());
                }
                AnalysisOutcome::Empty(reason) => {
                    println!("{} Not enough data: {}", "-".dimmed(), reason);
                }
            }
        }

        Commands::Show { subject, kind } => {
            let db = open_database(&config)?;
            let subject_id = SubjectId::parse(subject)?;
            match db.load_analysis(&subject_id, *kind)? {
                Some(stored) => {
                    println!("{}", serde_json::to_string_pretty(&stored.document)?);
                }
                None => {
                    println!("{} No {} analysis stored for {}", "-".dimmed(), kind, subject_id);
                }
            }
        }

        Commands::Status => {
            let db = open_database(&config)?;
            let stats = db.get_stats()?;
            println!(
                "{} sessions, {} horses, {} analyses",
                stats.session_count, stats.subject_count, stats.analysis_count
            );
            let rows: Vec<AnalysisRow> = db
                .list_analyses()?
                .into_iter()
                .map(|(subject, kind, generated_at)| AnalysisRow {
                    subject,
                    kind,
                    generated_at: generated_at.format("%Y-%m-%d %H:%M").to_string(),
                })
                .collect();
            if !rows.is_empty() {
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }
    }

    Ok(())
}
