//! SQLite persistence layer for agents and their customers.
//!
//! Every operation runs exactly one parameterized statement on a connection
//! borrowed from the pool; the connection goes back when the call returns.

use std::fs;
use std::str::FromStr;

use roster_config::ServerConfig;
use roster_core::{Agent, AgentPatch, AgentUpdate, Customer, FieldValue, NewAgent};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, instrument};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS agents (
        AGENT_CODE TEXT PRIMARY KEY NOT NULL,
        AGENT_NAME TEXT,
        WORKING_AREA TEXT,
        COMMISSION REAL,
        PHONE_NO TEXT,
        COUNTRY TEXT
    )",
    "CREATE TABLE IF NOT EXISTS customer (
        CUST_CODE TEXT PRIMARY KEY NOT NULL,
        CUST_NAME TEXT,
        CUST_CITY TEXT,
        WORKING_AREA TEXT,
        CUST_COUNTRY TEXT,
        GRADE INTEGER,
        OPENING_AMT REAL,
        RECEIVE_AMT REAL,
        PAYMENT_AMT REAL,
        OUTSTANDING_AMT REAL,
        PHONE_NO TEXT,
        AGENT_CODE TEXT
    )",
    "CREATE INDEX IF NOT EXISTS customer_agent_code ON customer (AGENT_CODE)",
];

const AGENT_COLUMNS: &str = "AGENT_CODE, AGENT_NAME, WORKING_AREA, COMMISSION, PHONE_NO, COUNTRY";

const CUSTOMER_COLUMNS: &str = "CUST_CODE, CUST_NAME, CUST_CITY, WORKING_AREA, CUST_COUNTRY, GRADE, \
     OPENING_AMT, RECEIVE_AMT, PAYMENT_AMT, OUTSTANDING_AMT, PHONE_NO, AGENT_CODE";

/// Errors from the storage layer.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// No pooled connection became available in time, or the pool is closed.
    #[error("database unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable(err),
            other => StoreError::Query(other),
        }
    }
}

/// Storage client handed to request handlers. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AgentStore {
    pool: SqlitePool,
}

impl AgentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a bounded pool for `config.database_url`, creating the file if needed.
    pub async fn connect(config: &ServerConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await?;

        info!(
            "Database pool ready at {} ({} connections)",
            config.database_url, config.max_connections
        );
        Ok(Self::new(pool))
    }

    /// Creates the `agents` and `customer` tables if they are missing.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Lists every agent, ordered by code.
    #[instrument(skip(self))]
    pub async fn list_agents(&self) -> Result<Vec<Agent>, StoreError> {
        let sql = format!("SELECT {AGENT_COLUMNS} FROM agents ORDER BY AGENT_CODE");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let agents = rows.iter().map(agent_from_row).collect::<Result<Vec<_>, _>>()?;
        debug!("Fetched {} agents", agents.len());
        Ok(agents)
    }

    /// Returns every agent stored under `code`. Empty when there is none.
    #[instrument(skip(self))]
    pub async fn agents_by_code(&self, code: &str) -> Result<Vec<Agent>, StoreError> {
        let sql = format!("SELECT {AGENT_COLUMNS} FROM agents WHERE AGENT_CODE = ?");
        let rows = sqlx::query(&sql).bind(code).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(agent_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    /// Inserts an agent and returns the generated row id.
    #[instrument(skip(self, agent), fields(code = %agent.code))]
    pub async fn insert_agent(&self, agent: &NewAgent) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO agents (AGENT_CODE, AGENT_NAME, WORKING_AREA, COMMISSION, PHONE_NO, COUNTRY)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&agent.code)
        .bind(&agent.name)
        .bind(&agent.working_area)
        .bind(agent.commission)
        .bind(&agent.phone)
        .bind(&agent.country)
        .execute(&self.pool)
        .await?;
        let id = result.last_insert_rowid();
        info!("Inserted agent {} as row {}", agent.code, id);
        Ok(id)
    }

    /// Replaces all mutable fields. Returns the number of rows touched.
    #[instrument(skip(self, update), fields(code = %update.code))]
    pub async fn update_agent(&self, update: &AgentUpdate) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE agents SET AGENT_NAME = ?, WORKING_AREA = ?, COMMISSION = ?, PHONE_NO = ?, COUNTRY = ?
             WHERE AGENT_CODE = ?",
        )
        .bind(&update.name)
        .bind(&update.working_area)
        .bind(update.commission)
        .bind(&update.phone)
        .bind(&update.country)
        .bind(&update.code)
        .execute(&self.pool)
        .await?;
        debug!("Updated {} rows", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Updates only the supplied fields. Returns the number of rows touched.
    #[instrument(skip(self, patch), fields(code = %patch.code))]
    pub async fn patch_agent(&self, patch: &AgentPatch) -> Result<u64, StoreError> {
        let sql = patch_sql(patch);
        let mut query = sqlx::query(&sql);
        for (_, value) in &patch.changes {
            query = match value {
                FieldValue::Text(text) => query.bind(text.as_str()),
                FieldValue::Decimal(number) => query.bind(*number),
            };
        }
        let result = query.bind(patch.code.as_str()).execute(&self.pool).await?;
        debug!("Patched {} rows", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Deletes by code. Returns the number of rows removed.
    #[instrument(skip(self))]
    pub async fn delete_agent(&self, code: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM agents WHERE AGENT_CODE = ?")
            .bind(code)
            .execute(&self.pool)
            .await?;
        info!("Deleted {} rows for agent {}", result.rows_affected(), code);
        Ok(result.rows_affected())
    }

    /// Lists the customers assigned to an agent, ordered by customer code.
    #[instrument(skip(self))]
    pub async fn customers_of(&self, agent_code: &str) -> Result<Vec<Customer>, StoreError> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer WHERE AGENT_CODE = ? ORDER BY CUST_CODE"
        );
        let rows = sqlx::query(&sql).bind(agent_code).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(customer_from_row).collect::<Result<Vec<_>, _>>()?)
    }
}

/// Builds the `UPDATE` for a patch. Column names come from the field
/// allow-list only; every value is a bound parameter.
fn patch_sql(patch: &AgentPatch) -> String {
    let assignments: Vec<String> = patch
        .changes
        .iter()
        .map(|(field, _)| format!("{} = ?", field.column()))
        .collect();
    format!(
        "UPDATE agents SET {} WHERE AGENT_CODE = ?",
        assignments.join(", ")
    )
}

fn agent_from_row(row: &SqliteRow) -> Result<Agent, sqlx::Error> {
    Ok(Agent {
        code: row.try_get("AGENT_CODE")?,
        name: row.try_get("AGENT_NAME")?,
        working_area: row.try_get("WORKING_AREA")?,
        commission: row.try_get("COMMISSION")?,
        phone: row.try_get("PHONE_NO")?,
        country: row.try_get("COUNTRY")?,
    })
}

fn customer_from_row(row: &SqliteRow) -> Result<Customer, sqlx::Error> {
    Ok(Customer {
        cust_code: row.try_get("CUST_CODE")?,
        cust_name: row.try_get("CUST_NAME")?,
        cust_city: row.try_get("CUST_CITY")?,
        working_area: row.try_get("WORKING_AREA")?,
        cust_country: row.try_get("CUST_COUNTRY")?,
        grade: row.try_get("GRADE")?,
        opening_amt: row.try_get("OPENING_AMT")?,
        receive_amt: row.try_get("RECEIVE_AMT")?,
        payment_amt: row.try_get("PAYMENT_AMT")?,
        outstanding_amt: row.try_get("OUTSTANDING_AMT")?,
        phone_no: row.try_get("PHONE_NO")?,
        agent_code: row.try_get("AGENT_CODE")?,
    })
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use roster_core::AgentField;

    use super::testing::*;
    use super::*;

    fn subbarao() -> NewAgent {
        NewAgent {
            code: "A001".into(),
            name: "Subbarao".into(),
            working_area: "Bangalore".into(),
            commission: 0.14,
            phone: "077-12346674".into(),
            country: "India".into(),
        }
    }

    #[tokio::test]
    async fn insert_then_lookup() {
        let store = memory_store().await;
        let id = store.insert_agent(&subbarao()).await.unwrap();
        assert!(id > 0);

        let found = store.agents_by_code("A001").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name.as_deref(), Some("Subbarao"));
        assert_eq!(found[0].commission, Some(0.14));

        assert!(store.agents_by_code("A999").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_code_is_a_query_error() {
        let store = memory_store().await;
        store.insert_agent(&subbarao()).await.unwrap();
        let err = store.insert_agent(&subbarao()).await.unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }

    #[tokio::test]
    async fn list_is_ordered_by_code() {
        let store = memory_store().await;
        for code in ["A003", "A001", "A002"] {
            let mut agent = subbarao();
            agent.code = code.into();
            store.insert_agent(&agent).await.unwrap();
        }
        let codes: Vec<String> = store
            .list_agents()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.code)
            .collect();
        assert_eq!(codes, vec!["A001", "A002", "A003"]);
    }

    #[tokio::test]
    async fn update_and_delete_report_rows_touched() {
        let store = memory_store().await;
        store.insert_agent(&subbarao()).await.unwrap();

        let update = AgentUpdate {
            code: "A001".into(),
            name: "Alex".into(),
            working_area: "London".into(),
            commission: 0.13,
            phone: "075-12458969".into(),
            country: "UK".into(),
        };
        assert_eq!(store.update_agent(&update).await.unwrap(), 1);
        let agent = &store.agents_by_code("A001").await.unwrap()[0];
        assert_eq!(agent.country.as_deref(), Some("UK"));

        assert_eq!(store.delete_agent("A404").await.unwrap(), 0);
        assert_eq!(store.delete_agent("A001").await.unwrap(), 1);
        assert_eq!(count_agents(&store).await, 0);
    }

    #[tokio::test]
    async fn patch_touches_only_supplied_columns() {
        let store = memory_store().await;
        store.insert_agent(&subbarao()).await.unwrap();

        let patch = AgentPatch {
            code: "A001".into(),
            changes: vec![
                (AgentField::Commission, FieldValue::Decimal(0.2)),
                (AgentField::WorkingArea, FieldValue::Text("Chennai".into())),
            ],
        };
        assert_eq!(
            patch_sql(&patch),
            "UPDATE agents SET COMMISSION = ?, WORKING_AREA = ? WHERE AGENT_CODE = ?"
        );
        assert_eq!(store.patch_agent(&patch).await.unwrap(), 1);

        let agent = &store.agents_by_code("A001").await.unwrap()[0];
        assert_eq!(agent.commission, Some(0.2));
        assert_eq!(agent.working_area.as_deref(), Some("Chennai"));
        assert_eq!(agent.name.as_deref(), Some("Subbarao"));
        assert_eq!(agent.phone.as_deref(), Some("077-12346674"));
    }

    #[tokio::test]
    async fn customers_are_filtered_by_agent() {
        let store = memory_store().await;
        seed_customer(&store, "C00013", "Holmes", "A003").await;
        seed_customer(&store, "C00001", "Micheal", "A008").await;
        seed_customer(&store, "C00020", "Albert", "A008").await;

        let customers = store.customers_of("A008").await.unwrap();
        let codes: Vec<&str> = customers.iter().map(|c| c.cust_code.as_str()).collect();
        assert_eq!(codes, vec!["C00001", "C00020"]);
        assert_eq!(customers[0].grade, Some(2));
        assert_eq!(customers[0].outstanding_amt, Some(4000.0));

        assert!(store.customers_of("A000").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exhausted_pool_reports_unavailable() {
        let store = memory_store_with_timeout(Duration::from_millis(100)).await;
        let _held = pool(&store).acquire().await.unwrap();

        let err = store.list_agents().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn connect_creates_database_file() {
        let dir = std::env::temp_dir().join(format!("roster-db-{}", std::process::id()));
        let path = dir.join("nested").join("sample.db");
        let config = ServerConfig {
            database_url: format!("sqlite://{}", path.display()),
            max_connections: 2,
            ..ServerConfig::default()
        };

        let store = AgentStore::connect(&config).await.unwrap();
        store.init_schema().await.unwrap();
        store.insert_agent(&subbarao()).await.unwrap();
        store.close().await;
        assert!(path.exists());

        let _ = fs::remove_dir_all(&dir);
    }
}
