//! Full table reads.

use common::errors::{AppError, AppResult};
use common::models::{ColumnDescriptor, DataRow};
use common::utils::IdentifierValidator;
use sqlx::postgres::{PgConnection, PgRow};

use crate::metadata;
use crate::value_decoder::{decode_column, decodes_natively};

/// Reads every row of `schema.table`.
///
/// Each row becomes a [`DataRow`] keyed by the catalog column names in
/// catalog order. The first failing row aborts the whole read.
pub async fn read_table(
    conn: &mut PgConnection,
    schema: &str,
    table: &str,
) -> AppResult<Vec<DataRow>> {
    metadata::ensure_table_exists(conn, schema, table).await?;
    let columns = metadata::list_columns(conn, schema, table).await?;

    let sql = select_statement(schema, table, &columns);
    let rows = sqlx::query(&sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            AppError::DataAccess(format!("Failed to read {:?}.{:?}: {}", schema, table, e))
        })?;

    tracing::debug!(schema = %schema, table = %table, rows = rows.len(), "Table read");
    rows.iter().map(|row| to_data_row(row, &columns)).collect()
}

/// `SELECT "c1", "c2" FROM "schema"."table"` over catalog-confirmed names.
/// Columns of types without a typed decoding are selected as their text form.
fn select_statement(schema: &str, table: &str, columns: &[ColumnDescriptor]) -> String {
    let projection = columns
        .iter()
        .map(|c| {
            let quoted = IdentifierValidator::quote(&c.name);
            if decodes_natively(&c.declared_type) {
                quoted
            } else {
                format!("{0}::text AS {0}", quoted)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {} FROM {}",
        projection,
        IdentifierValidator::qualified(schema, table)
    )
}

fn to_data_row(row: &PgRow, columns: &[ColumnDescriptor]) -> AppResult<DataRow> {
    let mut record = DataRow::new();
    for column in columns {
        let value = decode_column(row, column.name.as_str())?;
        record.insert(column.name.clone(), value);
    }
    Ok(record)
}
