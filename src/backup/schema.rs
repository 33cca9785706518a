use std::io::Write;

use tracing::debug;

use super::{render_ident, COLUMN_SEPARATOR};
use crate::catalog::{Catalog, ColumnDescriptor, ForeignKeyEdge, TableName};
use crate::error::{ErrorContext, Result};

/// `name type`, with the declared length for bounded character types
pub fn render_column(column: &ColumnDescriptor) -> String {
    let mut definition = format!("{} {}", render_ident(&column.name), column.type_name);
    if column.is_length_bounded() && column.size > 0 {
        definition.push_str(&format!("({})", column.size));
    }
    definition
}

pub fn render_foreign_key(edge: &ForeignKeyEdge) -> String {
    format!(
        "FOREIGN KEY ({}) REFERENCES {}({})",
        render_ident(&edge.source_column),
        render_ident(&edge.referenced_table),
        render_ident(&edge.referenced_column)
    )
}

/// Full `CREATE TABLE` block, including the trailing blank line
pub fn render_create_table(
    table: &TableName,
    columns: &[ColumnDescriptor],
    primary_key: &[String],
    foreign_keys: &[ForeignKeyEdge],
) -> String {
    let mut definitions: Vec<String> = columns.iter().map(render_column).collect();

    if !primary_key.is_empty() {
        let key_columns: Vec<String> = primary_key.iter().map(|c| render_ident(c).into_owned()).collect();
        definitions.push(format!("PRIMARY KEY ({})", key_columns.join(", ")));
    }

    definitions.extend(foreign_keys.iter().map(render_foreign_key));

    format!(
        "CREATE TABLE {} (\n    {}\n);\n\n",
        render_ident(table.as_str()),
        definitions.join(COLUMN_SEPARATOR)
    )
}

/// Query the structure of `table` and write its creation statement
///
/// Returns the columns so the data section can reuse them.
pub async fn emit_create_table<W: Write>(
    catalog: &dyn Catalog,
    table: &TableName,
    out: &mut W,
) -> Result<Vec<ColumnDescriptor>> {
    let columns = catalog
        .list_columns(table)
        .await
        .table_context("list_columns", table.as_str())?;
    let primary_key = catalog
        .primary_key_columns(table)
        .await
        .table_context("primary_key_columns", table.as_str())?;
    let foreign_keys = catalog
        .foreign_keys(table)
        .await
        .table_context("foreign_keys", table.as_str())?;

    debug!(
        table = %table,
        columns = columns.len(),
        primary_key = primary_key.len(),
        foreign_keys = foreign_keys.len(),
        "Writing table definition"
    );

    out.write_all(render_create_table(table, &columns, &primary_key, &foreign_keys).as_bytes())?;
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn orders() -> TableName {
        TableName::parse("orders").unwrap()
    }

    #[test]
    fn test_render_column_size_only_for_bounded_types() {
        assert_eq!(
            render_column(&ColumnDescriptor::new("name", "VARCHAR").with_size(120)),
            "name VARCHAR(120)"
        );
        assert_eq!(render_column(&ColumnDescriptor::new("name", "varchar")), "name varchar");
        assert_eq!(
            render_column(&ColumnDescriptor::new("id", "integer").with_size(32)),
            "id integer"
        );
    }

    #[test]
    fn test_render_column_quotes_unusual_names() {
        assert_eq!(
            render_column(&ColumnDescriptor::new("unit price", "numeric")),
            "\"unit price\" numeric"
        );
    }

    #[test]
    fn test_create_table_with_keys() {
        let columns = vec![
            ColumnDescriptor::new("id", "integer").primary_key(),
            ColumnDescriptor::new("customer_id", "integer"),
            ColumnDescriptor::new("note", "character varying").with_size(200),
        ];
        let foreign_keys = vec![ForeignKeyEdge {
            source_table: "orders".to_string(),
            source_column: "customer_id".to_string(),
            referenced_table: "customers".to_string(),
            referenced_column: "id".to_string(),
        }];

        let sql = render_create_table(&orders(), &columns, &["id".to_string()], &foreign_keys);
        assert_eq!(
            sql,
            indoc! {"
                CREATE TABLE orders (
                    id integer,
                    customer_id integer,
                    note character varying(200),
                    PRIMARY KEY (id),
                    FOREIGN KEY (customer_id) REFERENCES customers(id)
                );

            "}
        );
    }

    #[test]
    fn test_composite_primary_key_is_single_constraint() {
        let columns = vec![
            ColumnDescriptor::new("playlist_id", "integer").primary_key(),
            ColumnDescriptor::new("track_id", "integer").primary_key(),
        ];
        let table = TableName::parse("playlist_track").unwrap();
        let sql = render_create_table(
            &table,
            &columns,
            &["playlist_id".to_string(), "track_id".to_string()],
            &[],
        );

        assert_eq!(sql.matches("PRIMARY KEY").count(), 1);
        assert!(sql.contains("PRIMARY KEY (playlist_id, track_id)\n);"));
    }

    #[test]
    fn test_table_names_needing_quotes() {
        let table = TableName::parse("2024_orders").unwrap();
        let foreign_keys = vec![ForeignKeyEdge {
            source_table: "2024_orders".to_string(),
            source_column: "CustomerId".to_string(),
            referenced_table: "Customer".to_string(),
            referenced_column: "CustomerId".to_string(),
        }];

        let sql = render_create_table(
            &table,
            &[ColumnDescriptor::new("CustomerId", "integer")],
            &[],
            &foreign_keys,
        );
        assert_eq!(
            sql,
            indoc! {r#"
                CREATE TABLE "2024_orders" (
                    "CustomerId" integer,
                    FOREIGN KEY ("CustomerId") REFERENCES "Customer"("CustomerId")
                );

            "#}
        );
    }

    #[test]
    fn test_table_without_keys() {
        let sql = render_create_table(&orders(), &[ColumnDescriptor::new("id", "integer")], &[], &[]);
        assert_eq!(sql, "CREATE TABLE orders (\n    id integer\n);\n\n");
    }
}
