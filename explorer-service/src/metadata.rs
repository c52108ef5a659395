//! Catalog introspection.
//!
//! Everything here reads the catalog with bound parameters. Caller supplied
//! names are only ever compared against catalog values, never placed into
//! query text.
//!
//! Schemas and primary keys come from `pg_catalog`: `information_schema`
//! hides schemas and constraints of objects the login role does not own,
//! which would blank out both for a read-only role.

use common::errors::{AppError, AppResult};
use common::models::{
    ColumnDescriptor, Nullability, PrimaryKeySet, SchemaDescriptor, TableDescriptor,
};
use sqlx::postgres::PgConnection;

/// Row of the column query, before primary key membership is known.
#[derive(Debug, sqlx::FromRow)]
struct ColumnRow {
    name: String,
    declared_type: String,
    size: Option<i32>,
    is_nullable: Option<String>,
    is_identity: Option<String>,
    column_default: Option<String>,
}

impl ColumnRow {
    fn into_descriptor(self) -> ColumnDescriptor {
        let auto_increment =
            is_auto_increment(self.is_identity.as_deref(), self.column_default.as_deref());
        ColumnDescriptor {
            name: self.name,
            declared_type: self.declared_type,
            size: self.size,
            nullable: Nullability::from_catalog(self.is_nullable.as_deref()),
            auto_increment,
            primary_key: false,
        }
    }
}

/// Lists every schema of the connected database, ordered by name. TOAST and
/// per-session temporary schemas are left out.
pub async fn list_schemas(conn: &mut PgConnection) -> AppResult<Vec<SchemaDescriptor>> {
    let rows: Vec<(String, Option<String>)> = sqlx::query_as(
        "SELECT nspname::text, current_database()::text
         FROM pg_catalog.pg_namespace
         WHERE nspname <> 'pg_toast' AND nspname !~ '^pg_(toast_)?temp_'
         ORDER BY nspname",
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::DataAccess(format!("Failed to list schemas: {}", e)))?;

    Ok(rows
        .into_iter()
        .map(|(name, catalog)| SchemaDescriptor::new(name, catalog.as_deref()))
        .collect())
}

/// Lists the base tables of `schema`, ordered by name. Views are excluded.
/// An unknown schema yields an empty list.
pub async fn list_tables(conn: &mut PgConnection, schema: &str) -> AppResult<Vec<TableDescriptor>> {
    let rows: Vec<(Option<String>, String, String)> = sqlx::query_as(
        "SELECT table_catalog::text, table_schema::text, table_name::text
         FROM information_schema.tables
         WHERE table_schema::text = $1 AND table_type = 'BASE TABLE'
         ORDER BY table_name",
    )
    .bind(schema)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        AppError::DataAccess(format!("Failed to list tables of schema {:?}: {}", schema, e))
    })?;

    Ok(rows
        .into_iter()
        .map(|(catalog, schema, name)| TableDescriptor {
            catalog,
            schema,
            name,
        })
        .collect())
}

/// Names of the columns forming the primary key of `schema.table`.
///
/// Read from the table's primary key index, so only columns of this very
/// relation are returned, whatever the login role owns.
pub async fn list_primary_key_column_names(
    conn: &mut PgConnection,
    schema: &str,
    table: &str,
) -> AppResult<PrimaryKeySet> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT a.attname::text
         FROM pg_catalog.pg_index i
         JOIN pg_catalog.pg_class c ON c.oid = i.indrelid
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
         JOIN pg_catalog.pg_attribute a
           ON a.attrelid = c.oid AND a.attnum = ANY(i.indkey)
         WHERE i.indisprimary
           AND NOT a.attisdropped
           AND n.nspname::text = $1
           AND c.relname::text = $2",
    )
    .bind(schema)
    .bind(table)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        AppError::DataAccess(format!(
            "Failed to read primary key of {:?}.{:?}: {}",
            schema, table, e
        ))
    })?;

    Ok(names.into_iter().collect())
}

/// Lists the columns of `schema.table` in catalog order with primary key
/// membership filled in. A missing table yields an empty list.
pub async fn list_columns(
    conn: &mut PgConnection,
    schema: &str,
    table: &str,
) -> AppResult<Vec<ColumnDescriptor>> {
    let rows: Vec<ColumnRow> = sqlx::query_as(
        "SELECT column_name::text AS name,
                udt_name::text AS declared_type,
                COALESCE(character_maximum_length, numeric_precision, datetime_precision)::int4 AS size,
                is_nullable::text AS is_nullable,
                is_identity::text AS is_identity,
                column_default::text AS column_default
         FROM information_schema.columns
         WHERE table_schema::text = $1 AND table_name::text = $2
         ORDER BY ordinal_position",
    )
    .bind(schema)
    .bind(table)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        AppError::DataAccess(format!(
            "Failed to list columns of {:?}.{:?}: {}",
            schema, table, e
        ))
    })?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let primary_key = list_primary_key_column_names(conn, schema, table).await?;
    let columns = rows.into_iter().map(ColumnRow::into_descriptor).collect();
    Ok(mark_primary_keys(columns, &primary_key))
}

/// Confirms that `schema.table` is a base table known to the catalog.
pub async fn ensure_table_exists(
    conn: &mut PgConnection,
    schema: &str,
    table: &str,
) -> AppResult<()> {
    let tables = list_tables(conn, schema).await?;
    if tables.iter().any(|t| t.name == table) {
        Ok(())
    } else {
        Err(AppError::UnknownIdentifier {
            object: "table",
            name: format!("{}.{}", schema, table),
        })
    }
}

/// Sets `primary_key` on exactly the columns named in `primary_key`.
pub fn mark_primary_keys(
    columns: Vec<ColumnDescriptor>,
    primary_key: &PrimaryKeySet,
) -> Vec<ColumnDescriptor> {
    columns
        .into_iter()
        .map(|mut column| {
            column.primary_key = primary_key.contains(&column.name);
            column
        })
        .collect()
}

/// Identity columns and `serial`-style `nextval(...)` defaults.
pub fn is_auto_increment(is_identity: Option<&str>, column_default: Option<&str>) -> bool {
    let identity = is_identity.is_some_and(|v| v.eq_ignore_ascii_case("YES"));
    let sequence = column_default.is_some_and(|d| d.trim_start().starts_with("nextval("));
    identity || sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{connect_as, LiveDb};

    fn column(name: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.to_string(),
            declared_type: "int4".into(),
            size: Some(32),
            nullable: Nullability::No,
            auto_increment: false,
            primary_key: false,
        }
    }

    #[test]
    fn test_mark_primary_keys() {
        let pk: PrimaryKeySet = ["order_id", "line_no"].iter().map(|s| s.to_string()).collect();
        let marked = mark_primary_keys(
            vec![column("order_id"), column("line_no"), column("sku")],
            &pk,
        );
        let flags: Vec<_> = marked.iter().map(|c| c.primary_key).collect();
        assert_eq!(flags, vec![true, true, false]);
        assert_eq!(marked[2].name, "sku");
    }

    #[test]
    fn test_mark_primary_keys_only_uses_given_set() {
        // `id` is the key of some other table; this table has none.
        let marked = mark_primary_keys(vec![column("id"), column("name")], &PrimaryKeySet::new());
        assert!(marked.iter().all(|c| !c.primary_key));
    }

    #[test]
    fn test_is_auto_increment() {
        assert!(is_auto_increment(Some("YES"), None));
        assert!(is_auto_increment(
            Some("NO"),
            Some("nextval('orders_id_seq'::regclass)")
        ));
        assert!(!is_auto_increment(Some("NO"), Some("0")));
        assert!(!is_auto_increment(None, None));
    }

    #[test]
    fn test_column_row_into_descriptor() {
        let row = ColumnRow {
            name: "title".into(),
            declared_type: "varchar".into(),
            size: Some(200),
            is_nullable: Some("YES".into()),
            is_identity: Some("NO".into()),
            column_default: None,
        };
        let descriptor = row.into_descriptor();
        assert_eq!(descriptor.declared_type, "varchar");
        assert_eq!(descriptor.size, Some(200));
        assert_eq!(descriptor.nullable, Nullability::Yes);
        assert!(!descriptor.auto_increment);
        assert!(!descriptor.primary_key);
    }

    #[tokio::test]
    async fn test_live_catalog_listing() {
        let Some(db) = LiveDb::setup(&[
            "CREATE TABLE {schema}.customers (id SERIAL PRIMARY KEY, name TEXT NOT NULL)",
            "CREATE TABLE {schema}.orders (id INT, customer_id INT, note VARCHAR(40))",
            "CREATE VIEW {schema}.customer_names AS SELECT name FROM {schema}.customers",
        ])
        .await
        else {
            return;
        };

        let mut conn = db.connect().await;
        let schema = db.schema.clone();

        let schemas = list_schemas(&mut conn).await.unwrap();
        assert!(schemas.iter().any(|s| s.name == schema));

        let tables: Vec<_> = list_tables(&mut conn, &schema)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(tables, vec!["customers", "orders"]);

        let orders = list_columns(&mut conn, &schema, "orders").await.unwrap();
        assert_eq!(orders.len(), 3);
        assert!(orders.iter().all(|c| !c.primary_key));
        assert_eq!(orders[2].size, Some(40));

        let customers = list_columns(&mut conn, &schema, "customers").await.unwrap();
        assert!(customers[0].primary_key && customers[0].auto_increment);
        assert_eq!(customers[1].nullable, Nullability::No);

        assert!(list_columns(&mut conn, &schema, "missing").await.unwrap().is_empty());
        assert!(list_tables(&mut conn, "no_such_schema_here").await.unwrap().is_empty());
        assert!(matches!(
            ensure_table_exists(&mut conn, &schema, "customer_names").await,
            Err(AppError::UnknownIdentifier { .. })
        ));
        let view_columns = list_columns(&mut conn, &schema, "customer_names").await.unwrap();
        assert_eq!(view_columns.len(), 1);
        assert!(!view_columns[0].primary_key);

        drop(conn);
        db.teardown().await;
    }

    #[tokio::test]
    async fn test_live_catalog_listing_as_reader() {
        let Some(mut db) = LiveDb::setup(&[
            "CREATE TABLE {schema}.accounts (id INT PRIMARY KEY, owner TEXT)",
            "CREATE TABLE {schema}.entries (account_id INT, line INT, amount INT, PRIMARY KEY (account_id, line))",
        ])
        .await
        else {
            return;
        };
        let hidden = format!("{}_hidden", db.schema);
        let mut admin = db.connect().await;
        sqlx::query(&format!("CREATE SCHEMA \"{}\"", hidden))
            .execute(&mut admin)
            .await
            .unwrap();

        let reader = db.create_reader().await;
        let mut conn = connect_as(&reader).await;
        let schema = db.schema.clone();

        let schemas: Vec<_> = list_schemas(&mut conn)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert!(schemas.contains(&schema));
        assert!(schemas.contains(&hidden));
        assert!(schemas.iter().all(|s| !s.starts_with("pg_temp_")));

        let accounts = list_columns(&mut conn, &schema, "accounts").await.unwrap();
        let flags: Vec<_> = accounts.iter().map(|c| (c.name.as_str(), c.primary_key)).collect();
        assert_eq!(flags, vec![("id", true), ("owner", false)]);

        let entries = list_columns(&mut conn, &schema, "entries").await.unwrap();
        let flags: Vec<_> = entries.iter().map(|c| c.primary_key).collect();
        assert_eq!(flags, vec![true, true, false]);

        drop(conn);
        sqlx::query(&format!("DROP SCHEMA \"{}\"", hidden))
            .execute(&mut admin)
            .await
            .unwrap();
        drop(admin);
        db.teardown().await;
    }
}
