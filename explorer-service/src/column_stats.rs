//! Column aggregates.

use common::errors::{AppError, AppResult};
use common::models::ColumnStats;
use common::utils::IdentifierValidator;
use serde_json::Value;
use sqlx::postgres::PgConnection;

use crate::metadata;
use crate::value_decoder::{decode_column, decodes_natively};

/// Aggregates computed for a column, one query each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aggregate {
    Average,
    Minimum,
    Maximum,
    Median,
}

impl Aggregate {
    fn label(self) -> &'static str {
        match self {
            Aggregate::Average => "avg",
            Aggregate::Minimum => "min",
            Aggregate::Maximum => "max",
            Aggregate::Median => "median",
        }
    }

    /// Query text over an already quoted column and table. With `as_text`
    /// the result is cast to its text form.
    fn statement(self, column: &str, target: &str, as_text: bool) -> String {
        let expression = match self {
            Aggregate::Average => format!("AVG({})", column),
            Aggregate::Minimum => format!("MIN({})", column),
            Aggregate::Maximum => format!("MAX({})", column),
            Aggregate::Median => format!("PERCENTILE_DISC(0.5) WITHIN GROUP (ORDER BY {})", column),
        };
        if as_text {
            format!("SELECT ({})::text FROM {}", expression, target)
        } else {
            format!("SELECT {} FROM {}", expression, target)
        }
    }
}

/// Computes average, minimum, maximum and median of `schema.table.column`.
///
/// An aggregate that yields no row or SQL NULL is left absent. Values keep
/// the type the engine reports, e.g. `AVG` over integers is an exact numeric.
pub async fn compute_column_stats(
    conn: &mut PgConnection,
    schema: &str,
    table: &str,
    column: &str,
) -> AppResult<ColumnStats> {
    metadata::ensure_table_exists(conn, schema, table).await?;
    let columns = metadata::list_columns(conn, schema, table).await?;
    let Some(descriptor) = columns.iter().find(|c| c.name == column) else {
        return Err(AppError::UnknownIdentifier {
            object: "column",
            name: format!("{}.{}.{}", schema, table, column),
        });
    };

    let as_text = !decodes_natively(&descriptor.declared_type);
    let column = IdentifierValidator::quote(column);
    let target = IdentifierValidator::qualified(schema, table);

    Ok(ColumnStats {
        average: aggregate(conn, Aggregate::Average, &column, &target, as_text).await?,
        minimum: aggregate(conn, Aggregate::Minimum, &column, &target, as_text).await?,
        maximum: aggregate(conn, Aggregate::Maximum, &column, &target, as_text).await?,
        median: aggregate(conn, Aggregate::Median, &column, &target, as_text).await?,
    })
}

async fn aggregate(
    conn: &mut PgConnection,
    kind: Aggregate,
    column: &str,
    target: &str,
    as_text: bool,
) -> AppResult<Option<Value>> {
    let sql = kind.statement(column, target, as_text);
    let row = sqlx::query(&sql)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            AppError::DataAccess(format!(
                "{} of {} on {} failed: {}",
                kind.label(),
                column,
                target,
                e
            ))
        })?;

    let Some(row) = row else {
        return Ok(None);
    };
    match decode_column(&row, 0usize)? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::LiveDb;
    use serde_json::json;

    #[test]
    fn test_statements() {
        let target = IdentifierValidator::qualified("shop", "orders");
        let column = IdentifierValidator::quote("total");
        assert_eq!(
            Aggregate::Average.statement(&column, &target, false),
            r#"SELECT AVG("total") FROM "shop"."orders""#
        );
        assert_eq!(
            Aggregate::Median.statement(&column, &target, false),
            r#"SELECT PERCENTILE_DISC(0.5) WITHIN GROUP (ORDER BY "total") FROM "shop"."orders""#
        );
        assert_eq!(
            Aggregate::Maximum.statement(&column, &target, true),
            r#"SELECT (MAX("total"))::text FROM "shop"."orders""#
        );
    }

    #[tokio::test]
    async fn test_live_stats() {
        let Some(db) = LiveDb::setup(&[
            "CREATE TABLE {schema}.readings (id INT PRIMARY KEY, value INT, label TEXT)",
            "INSERT INTO {schema}.readings VALUES (1, 4, 'd'), (2, 1, 'a'), (3, 3, 'c'), (4, 2, 'b')",
            "CREATE TABLE {schema}.empty (value INT)",
        ])
        .await
        else {
            return;
        };
        let mut conn = db.connect().await;
        let schema = db.schema.clone();

        let stats = compute_column_stats(&mut conn, &schema, "readings", "value")
            .await
            .unwrap();
        assert_eq!(
            stats.average.as_ref().map(|v| v.to_string()),
            Some("2.5000000000000000".to_string())
        );
        assert_eq!(stats.minimum, Some(json!(1)));
        assert_eq!(stats.maximum, Some(json!(4)));
        assert_eq!(stats.median, Some(json!(2)));

        let empty = compute_column_stats(&mut conn, &schema, "empty", "value")
            .await
            .unwrap();
        assert!(empty.is_empty());

        // AVG is undefined for text.
        assert!(matches!(
            compute_column_stats(&mut conn, &schema, "readings", "label").await,
            Err(AppError::DataAccess(_))
        ));
        assert!(matches!(
            compute_column_stats(&mut conn, &schema, "readings", "nope").await,
            Err(AppError::UnknownIdentifier { .. })
        ));

        drop(conn);
        db.teardown().await;
    }

    #[tokio::test]
    async fn test_live_stats_over_interval() {
        let Some(db) = LiveDb::setup(&[
            "CREATE TABLE {schema}.trips (took INTERVAL)",
            "INSERT INTO {schema}.trips VALUES ('1 hour'), ('3 hours'), ('2 hours')",
        ])
        .await
        else {
            return;
        };
        let mut conn = db.connect().await;

        let stats = compute_column_stats(&mut conn, &db.schema, "trips", "took")
            .await
            .unwrap();
        assert_eq!(stats.average, Some(json!("02:00:00")));
        assert_eq!(stats.minimum, Some(json!("01:00:00")));
        assert_eq!(stats.maximum, Some(json!("03:00:00")));
        assert_eq!(stats.median, Some(json!("02:00:00")));

        drop(conn);
        db.teardown().await;
    }
}
