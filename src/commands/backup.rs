use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::backup::{Backup, BackupOptions, BackupReport};
use crate::catalog::{Catalog, PgCatalog};
use crate::config::SchemadumpConfig;
use crate::db::DatabaseConfig;
use crate::error::{BackupError, Result};
use crate::output::OutputHandler;

/// Output path that selects stdout instead of a file
pub const STDOUT_PATH: &str = "-";

#[derive(Debug)]
pub struct BackupResult {
    pub destination: PathBuf,
    pub report: BackupReport,
}

/// Resolve the connection settings from config, `DATABASE_URL` or the libpq variables
pub fn database_config(config: &SchemadumpConfig) -> Result<DatabaseConfig> {
    let mut db_config = match config
        .connection_string
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
    {
        Some(url) => DatabaseConfig::from_url(&url)?,
        None => {
            debug!("No connection string given, using PG* environment variables");
            DatabaseConfig::from_env()?
        }
    };

    if let Some(database) = &config.database {
        db_config = db_config.with_database(database.clone());
    }

    Ok(db_config.merge_tls_config(config.build_tls_config()?))
}

/// Open the sink for `path`, `-` meaning stdout
pub fn open_sink(path: &Path) -> Result<Box<dyn Write>> {
    if path == Path::new(STDOUT_PATH) {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }

    let file = File::create(path).map_err(|e| BackupError::SinkOpen {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Run a backup of `catalog` into the file at `path`
///
/// The file is opened before any catalog query runs. On failure it keeps whatever was
/// written before the error.
pub async fn backup_to_path(
    catalog: &dyn Catalog,
    path: &Path,
    options: BackupOptions,
    output: &dyn OutputHandler,
) -> Result<BackupReport> {
    let mut sink = open_sink(path)?;
    let result = Backup::new(catalog, &mut sink, options, output).run().await;

    // Keep partial output on failure
    if let Err(e) = &result {
        flush_partial(&mut sink, path);
        let destination = path.display().to_string();
        crate::log_error!(e, destination = destination.as_str());
    }
    result
}

/// Flush what was written before a failure, returning whether that succeeded
fn flush_partial<W: Write + ?Sized>(sink: &mut W, path: &Path) -> bool {
    match sink.flush() {
        Ok(()) => true,
        Err(e) => {
            warn!(destination = %path.display(), error = %e, "Could not flush partial backup output");
            false
        }
    }
}

pub async fn execute_backup(
    config: &SchemadumpConfig,
    output: &dyn OutputHandler,
) -> Result<BackupResult> {
    let db_config = database_config(config)?;
    let schema = config.schema_or_default();
    let destination = config.output_path_for(&db_config.database);

    info!(
        database = %db_config.database,
        schema,
        destination = %destination.display(),
        "Connecting"
    );
    let catalog = PgCatalog::connect(&db_config, schema, config.statement_timeout()).await?;

    let report = backup_to_path(&catalog, &destination, config.backup_options(), output).await?;

    Ok(BackupResult {
        destination,
        report,
    })
}

#[cfg(feature = "cli")]
pub fn print_backup_summary(result: &BackupResult) {
    use crate::logging::format_duration;
    use owo_colors::OwoColorize;

    let report = &result.report;
    eprintln!("\n{}", "=== Backup Summary ===".bold().blue());
    eprintln!("{}: {}", "Database".bold(), report.database.cyan());
    eprintln!("{}: {}", "Output".bold(), result.destination.display().to_string().cyan());

    if !report.tables_written.is_empty() {
        eprintln!("\n{}:", "Tables".bold().green());
        for table in &report.tables_written {
            let rows = report.rows_per_table.get(table.as_str()).copied().unwrap_or(0);
            eprintln!("  {} {} ({} rows)", "✓".green().bold(), table.cyan(), rows);
        }
    }

    if !report.tables_skipped.is_empty() {
        eprintln!("\n{}:", "Skipped".bold().yellow());
        for (name, reason) in &report.tables_skipped {
            eprintln!("  {} {:?}: {}", "⚠".yellow(), name, reason);
        }
    }

    if !report.cycles.is_empty() {
        eprintln!("\n{}:", "Circular foreign keys".bold().yellow());
        for cycle in &report.cycles {
            eprintln!("  {} {}", "↻".yellow(), cycle);
        }
    }

    eprintln!(
        "\n{} {} tables, {} rows, {} index columns in {}",
        "✓".green().bold(),
        report.tables_written.len().to_string().yellow(),
        report.total_rows().to_string().yellow(),
        report.index_count.to_string().yellow(),
        format_duration(report.duration)
    );
}
