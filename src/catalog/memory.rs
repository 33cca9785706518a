use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use super::{
    Catalog, ColumnDescriptor, ForeignKeyEdge, IndexEntry, Row, RowStream, RowValue, TableName,
};
use crate::error::{BackupError, Result};

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    name: String,
    columns: Vec<ColumnDescriptor>,
    primary_key: Vec<String>,
    foreign_keys: Vec<ForeignKeyEdge>,
    rows: Vec<Row>,
    fail_rows: Option<String>,
}

/// Catalog held entirely in memory
///
/// Tables are reported in insertion order. Useful for library callers that already
/// have catalog data at hand, and for exercising the backup engine without a server.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    database: String,
    tables: Vec<MemoryTable>,
    indexes: Vec<IndexEntry>,
}

impl MemoryCatalog {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    /// Add a table; columns flagged as primary key form its key, in column order
    pub fn with_table(mut self, name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        let primary_key = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect();
        self.tables.push(MemoryTable {
            name: name.into(),
            columns,
            primary_key,
            ..Default::default()
        });
        self
    }

    pub fn with_foreign_key(
        mut self,
        table: &str,
        column: &str,
        referenced_table: &str,
        referenced_column: &str,
    ) -> Self {
        if let Some(t) = self.table_mut(table) {
            t.foreign_keys.push(ForeignKeyEdge {
                source_table: table.to_string(),
                source_column: column.to_string(),
                referenced_table: referenced_table.to_string(),
                referenced_column: referenced_column.to_string(),
            });
        }
        self
    }

    pub fn with_row(mut self, table: &str, values: Vec<RowValue>) -> Self {
        if let Some(t) = self.table_mut(table) {
            t.rows.push(Row::new(values));
        }
        self
    }

    pub fn with_index(mut self, index_name: &str, table: &str, column: &str) -> Self {
        self.indexes.push(IndexEntry {
            index_name: index_name.to_string(),
            table: table.to_string(),
            column: column.to_string(),
        });
        self
    }

    /// Make the row query of `table` fail with `message`
    pub fn with_failing_rows(mut self, table: &str, message: &str) -> Self {
        if let Some(t) = self.table_mut(table) {
            t.fail_rows = Some(message.to_string());
        }
        self
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut MemoryTable> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    fn table(&self, operation: &str, name: &TableName) -> Result<&MemoryTable> {
        self.tables
            .iter()
            .find(|t| t.name == name.as_str())
            .ok_or_else(|| BackupError::catalog(operation, Some(name.as_str()), "no such table"))
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn list_columns(&self, table: &TableName) -> Result<Vec<ColumnDescriptor>> {
        Ok(self.table("list_columns", table)?.columns.clone())
    }

    async fn primary_key_columns(&self, table: &TableName) -> Result<Vec<String>> {
        Ok(self.table("primary_key_columns", table)?.primary_key.clone())
    }

    async fn foreign_keys(&self, table: &TableName) -> Result<Vec<ForeignKeyEdge>> {
        Ok(self.table("foreign_keys", table)?.foreign_keys.clone())
    }

    async fn indexes(&self) -> Result<Vec<IndexEntry>> {
        Ok(self.indexes.clone())
    }

    async fn rows<'a>(
        &'a self,
        table: &'a TableName,
        _columns: &'a [ColumnDescriptor],
    ) -> Result<RowStream<'a>> {
        let t = self.table("rows", table)?;
        if let Some(message) = &t.fail_rows {
            return Err(BackupError::catalog("rows", Some(table.as_str()), message.clone()));
        }
        Ok(stream::iter(t.rows.iter().map(|row| Ok(row.clone()))).boxed())
    }
}
