//! Dependency-ordered schema and data backups for PostgreSQL.
//!
//! The engine reads a database through the [`catalog::Catalog`] trait, orders tables so
//! every table follows the tables its foreign keys reference, and writes a plain SQL
//! script of `CREATE TABLE`, `INSERT INTO` and `CREATE INDEX` statements.

pub mod analysis;
pub mod backup;
pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;

pub use analysis::{Cycle, DependencyGraph, Resolution};
pub use backup::{Backup, BackupOptions, BackupReport};
pub use catalog::{Catalog, MemoryCatalog, PgCatalog, TableName};
pub use commands::{BackupResult, OrderResult};
pub use config::SchemadumpConfig;
pub use error::{BackupError, Result};

use output::SilentOutputHandler;

/// Back up the database described by `config`, reporting progress only through tracing
pub async fn backup_database(config: &SchemadumpConfig) -> Result<BackupResult> {
    commands::execute_backup(config, &SilentOutputHandler).await
}

/// Emission order of the database described by `config`
pub async fn table_order(config: &SchemadumpConfig) -> Result<OrderResult> {
    commands::execute_order(config).await
}
