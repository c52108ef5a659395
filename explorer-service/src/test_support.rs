//! Fixtures for tests that need a running PostgreSQL.
//!
//! Live tests are skipped unless `EXPLORER_TEST_PGHOST` is set. Each fixture
//! creates its own schema, plus any reader roles asked for, and drops them in
//! [`LiveDb::teardown`].

use std::sync::Arc;
use std::time::Duration;

use common::models::ConnectionProfile;
use sqlx::postgres::PgConnection;
use sqlx::Connection;

use crate::connection_factory::{connect_options, ConnectionFactory};
use crate::profile_store::InMemoryProfileStore;

pub const LIVE_INSTANCE: &str = "live";

/// Profile built from the `EXPLORER_TEST_PG*` variables.
pub fn live_profile() -> Option<ConnectionProfile> {
    let host = std::env::var("EXPLORER_TEST_PGHOST").ok()?;
    let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
    Some(ConnectionProfile {
        instance_name: LIVE_INSTANCE.to_string(),
        hostname: host,
        port: var("EXPLORER_TEST_PGPORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(5432),
        database_name: var("EXPLORER_TEST_PGDATABASE").unwrap_or_else(|| "postgres".into()),
        username: var("EXPLORER_TEST_PGUSER"),
        password: var("EXPLORER_TEST_PGPASSWORD"),
    })
}

pub async fn connect_as(profile: &ConnectionProfile) -> PgConnection {
    PgConnection::connect_with(&connect_options(profile))
        .await
        .expect("connect to test database")
}

/// Factory that knows `profile` under its instance name.
pub fn factory_for(profile: ConnectionProfile) -> ConnectionFactory {
    ConnectionFactory::new(
        Arc::new(InMemoryProfileStore::with_profiles([profile])),
        Duration::from_secs(10),
    )
}

pub struct LiveDb {
    pub profile: ConnectionProfile,
    pub schema: String,
    roles: Vec<String>,
}

impl LiveDb {
    /// Creates a fresh schema and runs `statements` in it. `{schema}` in a
    /// statement is replaced by the quoted schema name.
    pub async fn setup(statements: &[&str]) -> Option<Self> {
        let Some(profile) = live_profile() else {
            eprintln!("skipping live test: EXPLORER_TEST_PGHOST not set");
            return None;
        };
        let schema = format!("explorer_test_{}", uuid::Uuid::new_v4().simple());
        let db = Self {
            profile,
            schema,
            roles: Vec::new(),
        };

        let mut conn = db.connect().await;
        let quoted = format!("\"{}\"", db.schema);
        sqlx::query(&format!("CREATE SCHEMA {}", quoted))
            .execute(&mut conn)
            .await
            .expect("create test schema");
        for statement in statements {
            sqlx::query(&statement.replace("{schema}", &quoted))
                .execute(&mut conn)
                .await
                .unwrap_or_else(|e| panic!("fixture statement {:?} failed: {}", statement, e));
        }
        let _ = conn.close().await;
        Some(db)
    }

    pub async fn connect(&self) -> PgConnection {
        connect_as(&self.profile).await
    }

    /// Factory that knows the live instance under [`LIVE_INSTANCE`].
    pub fn factory(&self) -> ConnectionFactory {
        factory_for(self.profile.clone())
    }

    /// Creates a login role that may only use the test schema and SELECT its
    /// current tables, and returns a profile that logs in as it.
    pub async fn create_reader(&mut self) -> ConnectionProfile {
        let role = format!("explorer_reader_{}", uuid::Uuid::new_v4().simple());
        let password = uuid::Uuid::new_v4().simple().to_string();
        let mut conn = self.connect().await;
        for statement in [
            format!("CREATE ROLE \"{}\" LOGIN PASSWORD '{}'", role, password),
            format!("GRANT USAGE ON SCHEMA \"{}\" TO \"{}\"", self.schema, role),
            format!(
                "GRANT SELECT ON ALL TABLES IN SCHEMA \"{}\" TO \"{}\"",
                self.schema, role
            ),
        ] {
            sqlx::query(&statement)
                .execute(&mut conn)
                .await
                .unwrap_or_else(|e| panic!("reader setup {:?} failed: {}", statement, e));
        }
        let _ = conn.close().await;
        self.roles.push(role.clone());

        ConnectionProfile {
            username: Some(role),
            password: Some(password),
            ..self.profile.clone()
        }
    }

    pub async fn teardown(self) {
        let mut conn = self.connect().await;
        sqlx::query(&format!("DROP SCHEMA \"{}\" CASCADE", self.schema))
            .execute(&mut conn)
            .await
            .expect("drop test schema");
        for role in &self.roles {
            sqlx::query(&format!("DROP ROLE IF EXISTS \"{}\"", role))
                .execute(&mut conn)
                .await
                .expect("drop test role");
        }
        let _ = conn.close().await;
    }
}
