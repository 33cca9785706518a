//! Backup script generation.
//!
//! [`Backup::run`] drives one run against a [`Catalog`]: it validates table names, orders
//! the tables by their foreign keys, then writes table definitions, row data and indexes to
//! the sink in that order. Nothing is buffered beyond a single statement, so on failure the
//! sink holds everything written up to the failing step.

pub mod data;
pub mod index;
pub mod schema;
pub mod value;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::analysis::{Cycle, DependencyGraph, Resolution};
use crate::catalog::{Catalog, TableName, TableNameError};
use crate::error::{BackupError, ErrorContext, Result};
use crate::output::OutputHandler;

pub use data::emit_table_data;
pub use index::emit_indexes;
pub use schema::{emit_create_table, render_create_table};
pub use value::{encode_row, encode_value};

/// Separator between entries of a `CREATE TABLE` block
pub const COLUMN_SEPARATOR: &str = ",\n    ";

fn plain_ident() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid identifier pattern"))
}

/// Plain lowercase identifiers are written as is, anything else is double-quoted
pub fn render_ident(name: &str) -> Cow<'_, str> {
    if plain_ident().is_match(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Start the script with a comment naming the database and generation time
    pub include_header: bool,
    /// Fail instead of warning when the foreign keys form a cycle
    pub strict_cycles: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            include_header: true,
            strict_cycles: false,
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default)]
pub struct BackupReport {
    pub database: String,
    /// Tables in the order they were written
    pub tables_written: Vec<TableName>,
    pub tables_skipped: Vec<(String, TableNameError)>,
    pub rows_per_table: BTreeMap<String, u64>,
    pub index_count: usize,
    pub cycles: Vec<Cycle>,
    pub duration: Duration,
}

impl BackupReport {
    pub fn total_rows(&self) -> u64 {
        self.rows_per_table.values().sum()
    }
}

/// Split raw catalog names into valid tables and rejected ones
pub fn validate_tables(raw: Vec<String>) -> (Vec<TableName>, Vec<(String, TableNameError)>) {
    let mut valid = Vec::with_capacity(raw.len());
    let mut skipped = Vec::new();

    for name in raw {
        match TableName::parse(&name) {
            Ok(table) => valid.push(table),
            Err(e) => {
                warn!(table = %name, error = %e, "Skipping table with invalid name");
                skipped.push((name, e));
            }
        }
    }

    (valid, skipped)
}

/// Build the foreign key graph for `tables`
pub async fn build_dependency_graph(
    catalog: &dyn Catalog,
    tables: &[TableName],
) -> Result<DependencyGraph> {
    let mut graph = DependencyGraph::new(tables);

    for table in tables {
        let edges = catalog
            .foreign_keys(table)
            .await
            .table_context("foreign_keys", table.as_str())?;
        for edge in edges {
            graph.add_dependency(table, &edge.referenced_table);
        }
    }

    debug!(
        tables = graph.node_count(),
        edges = graph.edge_count(),
        "Built dependency graph"
    );
    Ok(graph)
}

/// Enumerate, validate and order the tables of `catalog`
pub async fn resolve_tables(
    catalog: &dyn Catalog,
) -> Result<(Resolution, DependencyGraph, Vec<(String, TableNameError)>)> {
    let raw = catalog.list_tables().await?;
    let (tables, skipped) = validate_tables(raw);
    let graph = build_dependency_graph(catalog, &tables).await?;
    let resolution = graph.resolve();
    Ok((resolution, graph, skipped))
}

pub fn render_header(database: &str) -> String {
    format!(
        "-- Backup of database {}\n-- Generated {}\n\n",
        database,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// One backup run over a catalog and a sink
pub struct Backup<'a, W: Write> {
    catalog: &'a dyn Catalog,
    out: &'a mut W,
    options: BackupOptions,
    output: &'a dyn OutputHandler,
}

impl<'a, W: Write> Backup<'a, W> {
    pub fn new(
        catalog: &'a dyn Catalog,
        out: &'a mut W,
        options: BackupOptions,
        output: &'a dyn OutputHandler,
    ) -> Self {
        Self {
            catalog,
            out,
            options,
            output,
        }
    }

    pub async fn run(self) -> Result<BackupReport> {
        let started = Instant::now();
        let Backup {
            catalog,
            out,
            options,
            output,
        } = self;
        let database = catalog.database_name().to_string();
        info!(database = %database, "Starting backup");

        let (resolution, _graph, skipped) = resolve_tables(catalog).await?;
        for (name, reason) in &skipped {
            output.warning(&format!("Skipping table {}: {}", name, reason));
        }

        if resolution.has_cycles() {
            let description = resolution.describe_cycles();
            if options.strict_cycles {
                return Err(BackupError::CycleDetected(description));
            }
            warn!(cycles = %description, "Foreign key cycle, emission order is best effort");
            output.warning(&format!("Circular foreign keys: {}", description));
        }

        if options.include_header {
            out.write_all(render_header(&database).as_bytes())?;
        }

        output.heading("Table definitions");
        let mut definitions = Vec::with_capacity(resolution.order.len());
        for table in &resolution.order {
            output.status("Creating", table.as_str());
            definitions.push(emit_create_table(catalog, table, out).await?);
        }

        output.heading("Table data");
        let mut rows_per_table = BTreeMap::new();
        for (table, columns) in resolution.order.iter().zip(&definitions) {
            let rows = emit_table_data(catalog, table, columns, out).await?;
            output.status("Dumped", &format!("{} ({} rows)", table, rows));
            rows_per_table.insert(table.to_string(), rows);
        }

        let index_count = emit_indexes(catalog, &resolution.order, out).await?;
        output.status("Indexed", &format!("{} index columns", index_count));

        out.flush()?;

        let report = BackupReport {
            database,
            tables_written: resolution.order,
            tables_skipped: skipped,
            rows_per_table,
            index_count,
            cycles: resolution.cycles,
            duration: started.elapsed(),
        };
        info!(
            tables = report.tables_written.len(),
            rows = report.total_rows(),
            "Backup finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        ColumnDescriptor, ForeignKeyEdge, IndexEntry, MemoryCatalog, RowStream, RowValue,
    };
    use crate::output::SilentOutputHandler;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts column lookups made against the wrapped catalog
    struct CountingCatalog {
        inner: MemoryCatalog,
        column_lookups: AtomicUsize,
    }

    #[async_trait]
    impl Catalog for CountingCatalog {
        fn database_name(&self) -> &str {
            self.inner.database_name()
        }

        async fn list_tables(&self) -> Result<Vec<String>> {
            self.inner.list_tables().await
        }

        async fn list_columns(&self, table: &TableName) -> Result<Vec<ColumnDescriptor>> {
            self.column_lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.list_columns(table).await
        }

        async fn primary_key_columns(&self, table: &TableName) -> Result<Vec<String>> {
            self.inner.primary_key_columns(table).await
        }

        async fn foreign_keys(&self, table: &TableName) -> Result<Vec<ForeignKeyEdge>> {
            self.inner.foreign_keys(table).await
        }

        async fn indexes(&self) -> Result<Vec<IndexEntry>> {
            self.inner.indexes().await
        }

        async fn rows<'a>(
            &'a self,
            table: &'a TableName,
            columns: &'a [ColumnDescriptor],
        ) -> Result<RowStream<'a>> {
            self.inner.rows(table, columns).await
        }
    }

    #[tokio::test]
    async fn test_columns_are_looked_up_once_per_table() {
        let catalog = CountingCatalog {
            inner: MemoryCatalog::new("shop")
                .with_table("customers", vec![ColumnDescriptor::new("id", "integer")])
                .with_table("orders", vec![ColumnDescriptor::new("id", "integer")])
                .with_row("orders", vec![RowValue::Scalar("1".to_string())]),
            column_lookups: AtomicUsize::new(0),
        };

        let mut out: Vec<u8> = Vec::new();
        let report = Backup::new(&catalog, &mut out, BackupOptions::default(), &SilentOutputHandler)
            .run()
            .await
            .unwrap();

        assert_eq!(report.total_rows(), 1);
        assert_eq!(catalog.column_lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_render_ident() {
        assert_eq!(render_ident("customer_id"), "customer_id");
        assert_eq!(render_ident("_hidden"), "_hidden");
        assert_eq!(render_ident("CustomerId"), "\"CustomerId\"");
        assert_eq!(render_ident("2nd"), "\"2nd\"");
        assert_eq!(render_ident("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_validate_tables_splits_invalid_names() {
        let (valid, skipped) = validate_tables(vec![
            "orders_2024".to_string(),
            "orders;drop".to_string(),
            "".to_string(),
            "customers".to_string(),
        ]);

        let names: Vec<&str> = valid.iter().map(TableName::as_str).collect();
        assert_eq!(names, vec!["orders_2024", "customers"]);
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].0, "orders;drop");
        assert_eq!(skipped[1].1, TableNameError::Empty);
    }

    #[test]
    fn test_header_names_database() {
        let header = render_header("chinook");
        assert!(header.starts_with("-- Backup of database chinook\n-- Generated "));
        assert!(header.ends_with("UTC\n\n"));
    }
}
