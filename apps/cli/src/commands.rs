//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use certledger_core::{
    ExtractConfig, LedgerConfig, LedgerSummary, ProgressReporter, RosterSource,
};
use certledger_extract::discover_documents;
use certledger_recon::ledger_columns;
use certledger_shared::{AppConfig, BatchConfig, ExportConfig, init_config, load_config};
use certledger_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// certledger: compile certificate competencies into a contact ledger.
#[derive(Parser)]
#[command(
    name = "certledger",
    version,
    about = "Extract course codes from certificate text and cross-reference them with a contact roster.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract certificates, cross-reference the roster, and write the ledger.
    Process {
        /// Certificate text files or directories containing them.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Roster CSV (defaults to `defaults.roster_path`).
        #[arg(short, long, conflicts_with = "stored_roster")]
        roster: Option<PathBuf>,

        /// Use the roster previously imported into the database.
        #[arg(long)]
        stored_roster: bool,

        /// Ledger CSV destination (defaults to `defaults.output_path`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Record the run in the database.
        #[arg(long)]
        save: bool,

        /// Database path (defaults to `storage.db_path`).
        #[arg(long, env = "CERTLEDGER_DB")]
        db: Option<PathBuf>,

        /// Maximum documents read in parallel.
        #[arg(long)]
        concurrency: Option<u32>,

        /// Write issue dates as YYYY-MM-DD.
        #[arg(long)]
        normalize_dates: bool,
    },

    /// Extract certificate records only, without the roster.
    Extract {
        /// Certificate text files or directories containing them.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Records CSV destination. Prints a table to stdout when omitted.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Roster management.
    Roster {
        #[command(subcommand)]
        action: RosterAction,
    },

    /// List ledger runs recorded in the database, or show one run.
    Runs {
        /// Run identifier to show in detail.
        id: Option<String>,

        /// Database path (defaults to `storage.db_path`).
        #[arg(long, env = "CERTLEDGER_DB")]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Roster subcommands.
#[derive(Subcommand)]
pub(crate) enum RosterAction {
    /// Import a roster CSV into the database, replacing the stored one.
    Import {
        /// Roster CSV with a `Name` column.
        csv: PathBuf,

        /// Database path (defaults to `storage.db_path`).
        #[arg(long, env = "CERTLEDGER_DB")]
        db: Option<PathBuf>,
    },
    /// Print the stored roster.
    Show {
        /// Database path (defaults to `storage.db_path`).
        #[arg(long, env = "CERTLEDGER_DB")]
        db: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "certledger=info",
        1 => "certledger=debug",
        _ => "certledger=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Process {
            paths,
            roster,
            stored_roster,
            out,
            save,
            db,
            concurrency,
            normalize_dates,
        } => {
            let opts = ProcessOptions {
                paths,
                roster,
                stored_roster,
                out,
                save,
                db,
                concurrency,
                normalize_dates,
            };
            cmd_process(opts).await
        }
        Command::Extract { paths, out } => cmd_extract(&paths, out).await,
        Command::Roster { action } => match action {
            RosterAction::Import { csv, db } => cmd_roster_import(csv, db).await,
            RosterAction::Show { db } => cmd_roster_show(db).await,
        },
        Command::Runs { id, db } => match id {
            Some(id) => cmd_run_show(&id, db).await,
            None => cmd_runs(db).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

struct ProcessOptions {
    paths: Vec<PathBuf>,
    roster: Option<PathBuf>,
    stored_roster: bool,
    out: Option<PathBuf>,
    save: bool,
    db: Option<PathBuf>,
    concurrency: Option<u32>,
    normalize_dates: bool,
}

async fn cmd_process(opts: ProcessOptions) -> Result<()> {
    let config = load_config()?;

    let mut batch = BatchConfig::from(&config);
    if let Some(c) = opts.concurrency {
        batch.concurrency = c;
    }

    let mut export = ExportConfig::try_from(&config)?;
    export.normalize_dates |= opts.normalize_dates;

    let documents = collect_documents(&opts.paths, &batch)?;
    let db_path = opts.db.unwrap_or_else(|| PathBuf::from(&config.storage.db_path));

    let roster = if opts.stored_roster {
        RosterSource::Stored(db_path.clone())
    } else {
        let path = opts
            .roster
            .unwrap_or_else(|| PathBuf::from(&config.defaults.roster_path));
        if !path.exists() {
            return Err(eyre!(
                "roster file not found: {}. Pass --roster or set defaults.roster_path.",
                path.display()
            ));
        }
        RosterSource::Csv(path)
    };

    let output_path = opts
        .out
        .unwrap_or_else(|| PathBuf::from(&config.defaults.output_path));

    let ledger_config = LedgerConfig {
        documents,
        roster,
        output_path: Some(output_path),
        db_path: opts.save.then_some(db_path),
        batch,
        export,
    };

    info!(
        documents = ledger_config.documents.len(),
        save = opts.save,
        "processing certificates"
    );

    let reporter = CliProgress::new();
    let summary = certledger_core::build_ledger(&ledger_config, &reporter).await?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &LedgerSummary) {
    println!();
    println!("  Ledger compiled!");
    println!("  Documents: {}", summary.documents.len());
    println!("  Rows:      {}", summary.rows.len());
    println!("  Matched:   {}", summary.matched);
    println!("  Unmatched: {}", summary.unmatched);
    if let Some(path) = &summary.output_path {
        println!("  Output:    {}", path.display());
    }
    if let Some(run_id) = &summary.run_id {
        println!("  Run:       {run_id}");
    }
    println!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());

    if !summary.ambiguous_names.is_empty() {
        println!();
        println!("  Duplicate roster names (first entry used):");
        for name in &summary.ambiguous_names {
            println!("    - {name}");
        }
    }

    let failures: Vec<(&str, &str)> = summary.failures().collect();
    if !failures.is_empty() {
        println!();
        println!("  Failed documents:");
        for (document, reason) in failures {
            println!("    - {document}: {reason}");
        }
    }
    println!();
}

async fn cmd_extract(paths: &[PathBuf], out: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let batch = BatchConfig::from(&config);
    let export = ExportConfig::try_from(&config)?;
    let documents = collect_documents(paths, &batch)?;

    let extract_config = ExtractConfig {
        documents,
        output_path: out.clone(),
        batch,
        export,
    };

    let reporter = CliProgress::new();
    let outcome = certledger_core::extract_records(&extract_config, &reporter).await?;

    if out.is_none() {
        for r in &outcome.records {
            println!(
                "{}\t{}\t{}\t{}",
                r.name.as_deref().unwrap_or(""),
                r.certificate_number.as_deref().unwrap_or(""),
                r.issue_date.as_deref().unwrap_or(""),
                r.course_code
            );
        }
    }

    for failure in &outcome.failures {
        eprintln!("  failed: {failure}");
    }
    info!(
        records = outcome.records.len(),
        failed = outcome.failures.len(),
        "extraction finished"
    );
    Ok(())
}

async fn cmd_roster_import(csv: PathBuf, db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let db_path = db.unwrap_or_else(|| PathBuf::from(&config.storage.db_path));

    let count = certledger_core::import_roster(&csv, &db_path).await?;
    println!(
        "Imported {count} contact(s) from {} into {}",
        csv.display(),
        db_path.display()
    );
    Ok(())
}

async fn cmd_roster_show(db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let db_path = db.unwrap_or_else(|| PathBuf::from(&config.storage.db_path));

    let roster = Storage::open(&db_path).await?.load_roster().await?;
    if roster.is_empty() {
        println!("No roster stored in {}", db_path.display());
        return Ok(());
    }

    println!("Name\t{}", roster.columns.join("\t"));
    for contact in &roster.contacts {
        let values: Vec<&str> = roster
            .columns
            .iter()
            .map(|c| contact.attribute(c))
            .collect();
        println!("{}\t{}", contact.name, values.join("\t"));
    }
    Ok(())
}

async fn cmd_runs(db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let db_path = db.unwrap_or_else(|| PathBuf::from(&config.storage.db_path));

    let runs = Storage::open(&db_path).await?.list_runs().await?;
    if runs.is_empty() {
        println!("No ledger runs recorded in {}", db_path.display());
        return Ok(());
    }

    for run in runs {
        println!(
            "{}  {}  docs={} failed={} rows={}",
            run.id,
            run.created_at.format("%Y-%m-%d %H:%M:%S"),
            run.document_count,
            run.failed_count,
            run.row_count
        );
    }
    Ok(())
}

async fn cmd_run_show(id: &str, db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let db_path = db.unwrap_or_else(|| PathBuf::from(&config.storage.db_path));
    let storage = Storage::open(&db_path).await?;

    let Some(columns) = storage.run_columns(id).await? else {
        return Err(eyre!("no ledger run with id {id}"));
    };

    println!("Documents:");
    for doc in storage.run_documents(id).await? {
        match &doc.error {
            Some(reason) => println!("  {}  FAILED: {reason}", doc.document),
            None => println!("  {}  records={}", doc.document, doc.record_count),
        }
    }

    println!();
    println!("{}", ledger_columns(&columns).join("\t"));
    for row in storage.ledger_rows(id).await? {
        let r = &row.record;
        let mut cells = vec![
            r.name.clone().unwrap_or_default(),
            r.certificate_number.clone().unwrap_or_default(),
            r.issue_date.clone().unwrap_or_default(),
            r.course_code.clone(),
        ];
        cells.extend(row.attributes.into_iter().map(|(_, v)| v));
        println!("{}", cells.join("\t"));
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

/// Expand CLI paths into document files; fails if nothing is left.
fn collect_documents(paths: &[PathBuf], batch: &BatchConfig) -> Result<Vec<PathBuf>> {
    let documents = discover_documents(paths, &batch.document_extension)?;
    if documents.is_empty() {
        return Err(eyre!(
            "no .{} documents found in the given paths",
            batch.document_extension
        ));
    }
    Ok(documents)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_process_flags() {
        let cli = Cli::try_parse_from([
            "certledger",
            "process",
            "certs/",
            "extra.txt",
            "--roster",
            "clients.csv",
            "--save",
            "--normalize-dates",
            "-vv",
        ])
        .expect("parse");
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Process {
                paths,
                roster,
                save,
                normalize_dates,
                stored_roster,
                ..
            } => {
                assert_eq!(paths.len(), 2);
                assert_eq!(roster, Some(PathBuf::from("clients.csv")));
                assert!(save);
                assert!(normalize_dates);
                assert!(!stored_roster);
            }
            _ => panic!("expected process command"),
        }
    }

    #[test]
    fn roster_and_stored_roster_conflict() {
        let result = Cli::try_parse_from([
            "certledger",
            "process",
            "certs/",
            "--roster",
            "clients.csv",
            "--stored-roster",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn collect_documents_requires_matches() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = collect_documents(&[dir.path().to_path_buf()], &BatchConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("no .txt documents"));
    }
}
