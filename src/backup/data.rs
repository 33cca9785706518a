use std::io::Write;

use futures_util::TryStreamExt;
use tracing::{debug, trace};

use super::render_ident;
use super::value::encode_row;
use crate::catalog::{Catalog, ColumnDescriptor, Row, TableName};
use crate::error::{ErrorContext, Result};

pub fn render_section_header(table: &TableName) -> String {
    format!("-- Data for table {}\n", table)
}

pub fn render_insert(table: &TableName, row: &Row) -> String {
    format!(
        "INSERT INTO {} VALUES {};\n",
        render_ident(table.as_str()),
        encode_row(row.values())
    )
}

/// Write the data section of `table`, returning the number of rows written
///
/// `columns` are the ones its definition was written with. Each statement is written
/// before the next row is pulled from the catalog, so an error part way through leaves
/// every earlier row in the sink.
pub async fn emit_table_data<W: Write>(
    catalog: &dyn Catalog,
    table: &TableName,
    columns: &[ColumnDescriptor],
    out: &mut W,
) -> Result<u64> {
    out.write_all(render_section_header(table).as_bytes())?;

    let mut rows = catalog
        .rows(table, columns)
        .await
        .table_context("rows", table.as_str())?;

    let mut count = 0u64;
    while let Some(row) = rows.try_next().await.table_context("rows", table.as_str())? {
        trace!(table = %table, columns = row.column_count(), "Row");
        out.write_all(render_insert(table, &row).as_bytes())?;
        count += 1;
    }

    out.write_all(b"\n")?;
    debug!(table = %table, rows = count, "Wrote table data");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RowValue;

    #[test]
    fn test_render_insert() {
        let table = TableName::parse("customers").unwrap();
        let row = Row::new(vec![
            RowValue::Scalar("1".to_string()),
            RowValue::Text("O'Brien".to_string()),
            RowValue::Null,
        ]);
        assert_eq!(
            render_insert(&table, &row),
            "INSERT INTO customers VALUES (1, 'O''Brien', NULL);\n"
        );
    }

    #[test]
    fn test_insert_quotes_mixed_case_table() {
        let table = TableName::parse("Customer").unwrap();
        let row = Row::new(vec![RowValue::Scalar("1".to_string())]);
        assert_eq!(render_insert(&table, &row), "INSERT INTO \"Customer\" VALUES (1);\n");
    }

    #[test]
    fn test_section_header() {
        let table = TableName::parse("orders_2024").unwrap();
        assert_eq!(render_section_header(&table), "-- Data for table orders_2024\n");
    }
}
