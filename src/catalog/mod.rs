//! Read-only view of a database catalog.
//!
//! The backup engine only talks to the database through the [`Catalog`] trait, so the
//! handle is always passed explicitly and the engine can run against PostgreSQL or an
//! in-memory catalog alike.

pub mod memory;
pub mod postgres;
pub mod table_name;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::Result;

pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;
pub use table_name::{TableName, TableNameError, MAX_TABLE_NAME_LEN};

/// How values of a column are rendered, decided once by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Binary,
    Scalar,
}

/// Column as declared in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub type_name: String,
    /// Declared size, 0 when the type carries none
    pub size: u32,
    pub is_primary_key: bool,
    pub kind: ValueKind,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let kind = ValueKind::for_type_name(&type_name);
        Self {
            name: name.into(),
            type_name,
            size: 0,
            is_primary_key: false,
            kind,
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Character types whose declared length belongs in the DDL
    pub fn is_length_bounded(&self) -> bool {
        matches!(
            self.type_name.to_ascii_lowercase().as_str(),
            "varchar" | "character varying" | "char" | "character" | "bpchar" | "nchar" | "nvarchar"
        )
    }
}

impl ValueKind {
    /// Classify a declared type name
    ///
    /// Only numeric and boolean types are written bare. Every other non-binary type
    /// (dates, uuids, json, enums, arrays and so on) is written as a quoted string
    /// literal and left to the server to cast on insert.
    pub fn for_type_name(type_name: &str) -> Self {
        match type_name.to_ascii_lowercase().as_str() {
            "bytea" | "blob" | "binary" | "varbinary" => ValueKind::Binary,
            "smallint" | "integer" | "int" | "bigint" | "int2" | "int4" | "int8" | "numeric"
            | "decimal" | "real" | "double precision" | "float4" | "float8" | "boolean"
            | "bool" => ValueKind::Scalar,
            _ => ValueKind::Text,
        }
    }
}

/// One referencing column of a foreign key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyEdge {
    pub source_table: String,
    pub source_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// One (index, table, column) catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub index_name: String,
    pub table: String,
    pub column: String,
}

/// A typed value read from a row
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    Null,
    Text(String),
    Binary(Vec<u8>),
    /// Numeric or boolean value in the server's string form
    Scalar(String),
}

/// One row of a table, in column order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<RowValue>,
}

impl Row {
    pub fn new(values: Vec<RowValue>) -> Self {
        Self { values }
    }

    pub fn column_count(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, index: usize) -> Option<&RowValue> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[RowValue] {
        &self.values
    }
}

impl From<Vec<RowValue>> for Row {
    fn from(values: Vec<RowValue>) -> Self {
        Self::new(values)
    }
}

/// Lazily fetched rows of one table
pub type RowStream<'a> = BoxStream<'a, Result<Row>>;

/// Query interface over a database catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Name of the database, used in the backup header
    fn database_name(&self) -> &str;

    /// Base tables only, unvalidated
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Columns in declaration order
    async fn list_columns(&self, table: &TableName) -> Result<Vec<ColumnDescriptor>>;

    /// Primary key columns in key order
    async fn primary_key_columns(&self, table: &TableName) -> Result<Vec<String>>;

    /// One edge per referencing column
    async fn foreign_keys(&self, table: &TableName) -> Result<Vec<ForeignKeyEdge>>;

    async fn indexes(&self) -> Result<Vec<IndexEntry>>;

    /// Stream the rows of `table`, values ordered as `columns`
    async fn rows<'a>(
        &'a self,
        table: &'a TableName,
        columns: &'a [ColumnDescriptor],
    ) -> Result<RowStream<'a>>;
}
