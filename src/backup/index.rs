use std::collections::HashSet;
use std::io::Write;

use tracing::debug;

use super::render_ident;
use crate::catalog::{Catalog, IndexEntry, TableName};
use crate::error::{BackupError, Result};

pub const INDEX_SECTION_HEADER: &str = "-- Indexes\n";

/// One statement per (index, column) entry. A composite index therefore comes out as
/// several single-column statements sharing the index name.
pub fn render_create_index(entry: &IndexEntry) -> String {
    format!(
        "CREATE INDEX {} ON {} ({});\n",
        render_ident(&entry.index_name),
        render_ident(&entry.table),
        render_ident(&entry.column)
    )
}

/// Write the index section, returning the number of statements written
///
/// Entries whose table is not part of the backup are dropped.
pub async fn emit_indexes<W: Write>(
    catalog: &dyn Catalog,
    tables: &[TableName],
    out: &mut W,
) -> Result<usize> {
    let entries = catalog.indexes().await.map_err(|e| match e {
        BackupError::CatalogQuery { table, message, source, .. } => BackupError::CatalogQuery {
            operation: "indexes".to_string(),
            table,
            message,
            source,
        },
        other => other,
    })?;

    let known: HashSet<&str> = tables.iter().map(TableName::as_str).collect();

    out.write_all(INDEX_SECTION_HEADER.as_bytes())?;

    let mut written = 0;
    for entry in &entries {
        if !known.contains(entry.table.as_str()) {
            debug!(index = %entry.index_name, table = %entry.table, "Skipping index on excluded table");
            continue;
        }
        out.write_all(render_create_index(entry).as_bytes())?;
        written += 1;
    }

    out.write_all(b"\n")?;
    Ok(written)
}
