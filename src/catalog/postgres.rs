use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_postgres::Client;
use tracing::{debug, warn};

use super::{
    Catalog, ColumnDescriptor, ForeignKeyEdge, IndexEntry, Row, RowStream, RowValue, TableName,
    ValueKind,
};
use crate::db::{connect_to_database, DatabaseConfig};
use crate::error::{BackupError, Result};

const LIST_TABLES: &str = r#"
    SELECT table_name::text
    FROM information_schema.tables
    WHERE table_schema = $1 AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

const LIST_COLUMNS: &str = r#"
    SELECT c.column_name::text,
           CASE WHEN c.data_type IN ('USER-DEFINED', 'ARRAY') THEN c.udt_name::text
                ELSE c.data_type::text END,
           c.character_maximum_length::int4,
           EXISTS (
               SELECT 1
               FROM pg_index i
               JOIN pg_class t ON t.oid = i.indrelid
               JOIN pg_namespace n ON n.oid = t.relnamespace
               JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY (i.indkey)
               WHERE i.indisprimary
                 AND n.nspname::text = c.table_schema::text
                 AND t.relname::text = c.table_name::text
                 AND a.attname::text = c.column_name::text
           )
    FROM information_schema.columns c
    WHERE c.table_schema = $1 AND c.table_name = $2
    ORDER BY c.ordinal_position
"#;

const PRIMARY_KEY_COLUMNS: &str = r#"
    SELECT a.attname::text
    FROM pg_index i
    JOIN pg_class t ON t.oid = i.indrelid
    JOIN pg_namespace n ON n.oid = t.relnamespace
    CROSS JOIN LATERAL unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    WHERE i.indisprimary AND n.nspname = $1 AND t.relname = $2
    ORDER BY k.ord
"#;

const FOREIGN_KEYS: &str = r#"
    SELECT a.attname::text, rt.relname::text, ra.attname::text
    FROM pg_constraint c
    JOIN pg_class t ON t.oid = c.conrelid
    JOIN pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_class rt ON rt.oid = c.confrelid
    CROSS JOIN LATERAL unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(attnum, refnum, ord)
    JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum
    JOIN pg_attribute ra ON ra.attrelid = c.confrelid AND ra.attnum = k.refnum
    WHERE c.contype = 'f' AND n.nspname = $1 AND t.relname = $2
    ORDER BY c.conname, k.ord
"#;

// Primary key indexes come back with the PRIMARY KEY constraint
const LIST_INDEXES: &str = r#"
    SELECT ic.relname::text, t.relname::text, a.attname::text
    FROM pg_index i
    JOIN pg_class ic ON ic.oid = i.indexrelid
    JOIN pg_class t ON t.oid = i.indrelid
    JOIN pg_namespace n ON n.oid = t.relnamespace
    CROSS JOIN LATERAL unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    WHERE n.nspname = $1 AND t.relkind = 'r' AND NOT i.indisprimary
    ORDER BY t.relname, ic.relname, k.ord
"#;

/// Catalog backed by a live PostgreSQL connection, scoped to one schema
pub struct PgCatalog {
    client: Client,
    database: String,
    schema: String,
}

impl PgCatalog {
    pub fn new(client: Client, database: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
            schema: schema.into(),
        }
    }

    /// Connect, spawn the connection task and apply the session settings
    pub async fn connect(
        config: &DatabaseConfig,
        schema: &str,
        statement_timeout: Option<Duration>,
    ) -> Result<Self> {
        let (client, connection) = connect_to_database(config).await?;
        connection.spawn();

        if let Some(timeout) = statement_timeout {
            debug!("Setting statement_timeout to {}ms", timeout.as_millis());
            client
                .batch_execute(&format!("SET statement_timeout = {}", timeout.as_millis()))
                .await
                .map_err(|e| BackupError::from_query("set_statement_timeout", None, e))?;
        }

        Ok(Self::new(client, config.database.clone(), schema))
    }

    fn select_rows_sql(&self, table: &TableName, columns: &[ColumnDescriptor]) -> String {
        let select_list = columns
            .iter()
            .map(|column| match column.kind {
                ValueKind::Binary => quote_ident(&column.name),
                ValueKind::Text | ValueKind::Scalar => {
                    format!("{}::text", quote_ident(&column.name))
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "SELECT {} FROM {}.{}",
            select_list,
            quote_ident(&self.schema),
            quote_ident(table.as_str())
        )
    }
}

/// Always quote, so mixed-case names keep their case
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Convert one driver row into typed values
fn decode_row(row: &tokio_postgres::Row, kinds: &[ValueKind], table: &str) -> Result<Row> {
    let mut values = Vec::with_capacity(kinds.len());

    for (i, kind) in kinds.iter().enumerate() {
        let value = match kind {
            ValueKind::Text => row
                .try_get::<_, Option<String>>(i)
                .map_err(|e| BackupError::from_query("rows", Some(table), e))?
                .map_or(RowValue::Null, RowValue::Text),
            ValueKind::Scalar => row
                .try_get::<_, Option<String>>(i)
                .map_err(|e| BackupError::from_query("rows", Some(table), e))?
                .map_or(RowValue::Null, RowValue::Scalar),
            ValueKind::Binary => match row.try_get::<_, Option<Vec<u8>>>(i) {
                Ok(Some(bytes)) => RowValue::Binary(bytes),
                Ok(None) => RowValue::Null,
                Err(e) => {
                    warn!(table, column = i, error = %e, "Unreadable binary value, writing NULL");
                    RowValue::Null
                }
            },
        };
        values.push(value);
    }

    Ok(Row::new(values))
}

#[async_trait]
impl Catalog for PgCatalog {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(LIST_TABLES, &[&self.schema.as_str()])
            .await
            .map_err(|e| BackupError::from_query("list_tables", None, e))?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    async fn list_columns(&self, table: &TableName) -> Result<Vec<ColumnDescriptor>> {
        let name = table.as_str();
        let rows = self
            .client
            .query(LIST_COLUMNS, &[&self.schema.as_str(), &name])
            .await
            .map_err(|e| BackupError::from_query("list_columns", Some(name), e))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let column_name: String = row.get(0);
                let type_name: String = row.get(1);
                let size: Option<i32> = row.get(2);
                let is_primary_key: bool = row.get(3);

                let mut column = ColumnDescriptor::new(column_name, type_name)
                    .with_size(size.and_then(|s| u32::try_from(s).ok()).unwrap_or(0));
                if is_primary_key {
                    column = column.primary_key();
                }
                column
            })
            .collect())
    }

    async fn primary_key_columns(&self, table: &TableName) -> Result<Vec<String>> {
        let name = table.as_str();
        let rows = self
            .client
            .query(PRIMARY_KEY_COLUMNS, &[&self.schema.as_str(), &name])
            .await
            .map_err(|e| BackupError::from_query("primary_key_columns", Some(name), e))?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    async fn foreign_keys(&self, table: &TableName) -> Result<Vec<ForeignKeyEdge>> {
        let name = table.as_str();
        let rows = self
            .client
            .query(FOREIGN_KEYS, &[&self.schema.as_str(), &name])
            .await
            .map_err(|e| BackupError::from_query("foreign_keys", Some(name), e))?;

        Ok(rows
            .into_iter()
            .map(|row| ForeignKeyEdge {
                source_table: name.to_string(),
                source_column: row.get(0),
                referenced_table: row.get(1),
                referenced_column: row.get(2),
            })
            .collect())
    }

    async fn indexes(&self) -> Result<Vec<IndexEntry>> {
        let rows = self
            .client
            .query(LIST_INDEXES, &[&self.schema.as_str()])
            .await
            .map_err(|e| BackupError::from_query("indexes", None, e))?;

        Ok(rows
            .into_iter()
            .map(|row| IndexEntry {
                index_name: row.get(0),
                table: row.get(1),
                column: row.get(2),
            })
            .collect())
    }

    async fn rows<'a>(
        &'a self,
        table: &'a TableName,
        columns: &'a [ColumnDescriptor],
    ) -> Result<RowStream<'a>> {
        let sql = self.select_rows_sql(table, columns);
        debug!("Streaming rows: {}", sql);

        let params: Vec<String> = Vec::new();
        let stream = self
            .client
            .query_raw(sql.as_str(), params)
            .await
            .map_err(|e| BackupError::from_query("rows", Some(table.as_str()), e))?;

        let kinds: Vec<ValueKind> = columns.iter().map(|c| c.kind).collect();
        let table_name = table.as_str().to_string();

        Ok(stream
            .map(move |row| match row {
                Ok(row) => decode_row(&row, &kinds, &table_name),
                Err(e) => Err(BackupError::from_query("rows", Some(&table_name), e)),
            })
            .boxed())
    }
}
