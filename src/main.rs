// ==========================================
// Tabular Import - command line entry
// ==========================================
// Usage:
//   tabular-import <file>                  import into the configured database
//   tabular-import --json <file>           same, report printed as JSON
//   tabular-import --preview <file> [n]    print the first n rows of every source
// Other settings come from TABULAR_IMPORT_* environment variables.
// ==========================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tabular_import::api::display_cell;
use tabular_import::{logging, ImportApi, ImportSettings};

#[derive(Parser, Debug)]
#[command(name = "tabular-import")]
#[command(about = "Import CSV and spreadsheet files into SQLite tables")]
#[command(version)]
struct Cli {
    /// CSV, XLSX, XLS or ODS file
    file: PathBuf,

    /// Rows to show per source (with --preview)
    #[arg(requires = "preview")]
    rows: Option<usize>,

    /// Print the first rows of every source instead of importing
    #[arg(long, conflicts_with = "json")]
    preview: bool,

    /// Print the import report as JSON
    #[arg(long)]
    json: bool,

    /// Destination SQLite database
    #[arg(long, value_name = "PATH", env = "TABULAR_IMPORT_DB_PATH")]
    db: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = ImportSettings::from_env().context("failed to read settings")?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    logging::init_with_format(settings.log_format);

    tracing::info!("{} {}", tabular_import::APP_NAME, tabular_import::VERSION);
    let api = ImportApi::new(settings);

    if cli.preview {
        for preview in api.preview_file(&cli.file, cli.rows)? {
            println!("== {} ({} rows) ==", preview.name, preview.total_rows);
            println!("{}", preview.columns.join("\t"));
            for row in &preview.rows {
                let cells: Vec<&str> = row.iter().map(display_cell).collect();
                println!("{}", cells.join("\t"));
            }
        }
        return Ok(());
    }

    let report = api
        .import_file(&cli.file)
        .with_context(|| format!("import of {} failed", cli.file.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for source in &report.sources {
            match (&source.table_name, &source.error) {
                (Some(table), None) => println!(
                    "{} -> {}: {} row(s)",
                    source.source_name, table, source.rows_inserted
                ),
                (_, Some(error)) => println!("{}: FAILED ({})", source.source_name, error),
                (None, None) => println!("{}: skipped", source.source_name),
            }
        }
        println!(
            "{} succeeded, {} failed, {} row(s) inserted",
            report.succeeded(),
            report.failed(),
            report.total_rows()
        );
    }

    if report.failed() > 0 {
        std::process::exit(1);
    }

    Ok(())
}
