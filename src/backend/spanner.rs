use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gcloud_googleapis::spanner::admin::database::v1::{
    GetDatabaseDdlRequest, UpdateDatabaseDdlRequest,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig};
use gcloud_spanner::mutation::insert_or_update;
use gcloud_spanner::statement::Statement;
use gcloud_spanner::value::CommitTimestamp;
use std::sync::Arc;

use super::RecordBackend;
use crate::config::SpannerConfig;
use crate::models::{AddressRecord, DeviceId};

const TABLE: &str = "device_records";

/// Record storage backed by Cloud Spanner
///
/// One row per device, keyed by the device id. Single-use read-only
/// transactions are strong reads, so a read always sees the last committed
/// write for that row.
#[derive(Clone)]
pub struct SpannerBackend {
    inner: Arc<Client>,
}

impl SpannerBackend {
    /// Connect to Spanner, creating the records table if it is missing
    ///
    /// `ClientConfig::default()` picks up `SPANNER_EMULATOR_HOST` from the
    /// environment, so the emulator is used whenever that variable is set.
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        let database_path = format!(
            "projects/{}/instances/{}/databases/{}",
            config.project, config.instance, config.database
        );
        ensure_schema(&database_path).await?;

        match &config.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
        })
    }
}

#[async_trait]
impl RecordBackend for SpannerBackend {
    async fn get(&self, id: DeviceId) -> Result<Option<AddressRecord>> {
        let mut statement =
            Statement::new("SELECT device, ip, updated_at FROM device_records WHERE id = @id");
        statement.add_param("id", &id.to_string());

        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query device record from Spanner")?;

        let Some(row) = result_set.next().await? else {
            tracing::debug!("No record stored for device id: {}", id);
            return Ok(None);
        };

        let device: String = row.column_by_name("device")?;
        let ip: String = row.column_by_name("ip")?;
        let updated_at_str: String = row.column_by_name("updated_at")?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .context("Failed to parse updated_at timestamp")?
            .with_timezone(&Utc);

        Ok(Some(AddressRecord {
            device,
            ip,
            updated_at,
        }))
    }

    async fn put(&self, id: DeviceId, record: &AddressRecord) -> Result<()> {
        let id_str = id.to_string();

        let mutation = insert_or_update(
            TABLE,
            &["id", "device", "ip", "updated_at"],
            &[&id_str, &record.device, &record.ip, &CommitTimestamp::new()],
        );

        self.inner
            .apply(vec![mutation])
            .await
            .context("Failed to upsert device record to Spanner")?;

        tracing::debug!("Upserted record for device {} ({})", record.device, id);
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

/// DDL for the records table; one row per device id
const SCHEMA: &str = "CREATE TABLE device_records (
    id STRING(36) NOT NULL,
    device STRING(MAX) NOT NULL,
    ip STRING(MAX) NOT NULL,
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (id)";

/// Create the records table in an existing database if it is not declared yet
///
/// The instance and database are operator-managed; a missing database is a
/// startup error.
async fn ensure_schema(database_path: &str) -> Result<()> {
    let admin = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let statements = admin
        .database()
        .get_database_ddl(
            GetDatabaseDdlRequest {
                database: database_path.to_string(),
            },
            None,
        )
        .await
        .with_context(|| format!("Spanner database {} must exist", database_path))?
        .into_inner()
        .statements;

    if statements.iter().any(|ddl| declares_table(ddl, TABLE)) {
        tracing::info!("Schema ready: table '{}' present", TABLE);
        return Ok(());
    }

    tracing::info!("Creating table '{}' in {}", TABLE, database_path);
    let request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: vec![SCHEMA.to_string()],
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin
        .database()
        .update_database_ddl(request, None)
        .await
        .context("Failed to submit table DDL")?;
    operation
        .wait(None)
        .await
        .with_context(|| format!("Failed to create table '{}'", TABLE))?;

    Ok(())
}

/// Whether a DDL statement is the `CREATE TABLE` for `table`
fn declares_table(ddl: &str, table: &str) -> bool {
    let mut words = ddl.split_whitespace();
    matches!(
        (words.next(), words.next(), words.next()),
        (Some(create), Some(kind), Some(name))
            if create.eq_ignore_ascii_case("CREATE")
                && kind.eq_ignore_ascii_case("TABLE")
                && name.split('(').next().unwrap_or(name).trim_matches('`') == table
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceName;

    /// Emulator target; `test-instance` and `test-database` must be created beforehand
    fn emulator_config() -> SpannerConfig {
        unsafe {
            std::env::set_var("SPANNER_EMULATOR_HOST", "localhost:9010");
        }

        SpannerConfig {
            emulator_host: Some("localhost:9010".to_string()),
            project: "test-project".to_string(),
            instance: "test-instance".to_string(),
            database: "test-database".to_string(),
        }
    }

    #[test]
    fn test_backend_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SpannerBackend>();
    }

    #[test]
    fn test_declares_table_matches_own_schema() {
        assert!(declares_table(SCHEMA, TABLE));
        assert!(declares_table("CREATE TABLE `device_records` (id STRING(36))", TABLE));
        assert!(declares_table("create table device_records(id STRING(36))", TABLE));
    }

    #[test]
    fn test_declares_table_ignores_other_statements() {
        for ddl in [
            "CREATE TABLE kv_store (id STRING(36)) PRIMARY KEY (id)",
            "CREATE TABLE device_records_archive (id STRING(36))",
            "CREATE INDEX device_records_by_ip ON device_records (ip)",
        ] {
            assert!(!declares_table(ddl, TABLE), "{}", ddl);
        }
        assert!(!declares_table("CREATE TABLE", TABLE));
        assert!(!declares_table("", TABLE));
    }

    #[tokio::test]
    #[ignore = "requires the Spanner emulator on localhost:9010"]
    async fn test_schema_setup_is_idempotent() {
        let config = emulator_config();

        SpannerBackend::from_config(&config)
            .await
            .expect("first connection should create or find the table");
        SpannerBackend::from_config(&config)
            .await
            .expect("second connection should find the table");
    }

    #[tokio::test]
    #[ignore = "requires the Spanner emulator on localhost:9010"]
    async fn test_missing_database_is_an_error() {
        let config = SpannerConfig {
            database: "no-such-database".to_string(),
            ..emulator_config()
        };

        let error = SpannerBackend::from_config(&config).await.err().unwrap();
        assert!(error.to_string().contains("must exist"));
    }

    #[tokio::test]
    #[ignore = "requires the Spanner emulator on localhost:9010"]
    async fn test_put_and_get() {
        let backend = SpannerBackend::from_config(&emulator_config())
            .await
            .expect("Failed to create Spanner backend");

        let name = DeviceName::parse("spanner-router").unwrap();
        let first = AddressRecord::new(&name, "10.0.0.1".to_string());
        let second = AddressRecord::new(&name, "10.0.0.2".to_string());

        backend.put(name.id(), &first).await.unwrap();
        backend.put(name.id(), &second).await.unwrap();

        let stored = backend.get(name.id()).await.unwrap().unwrap();
        assert_eq!(stored.device, "spanner-router");
        assert_eq!(stored.ip, "10.0.0.2");

        let unknown = DeviceName::parse("spanner-never-written").unwrap();
        assert!(backend.get(unknown.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires the Spanner emulator on localhost:9010"]
    async fn test_health_check() {
        let backend = SpannerBackend::from_config(&emulator_config())
            .await
            .expect("Failed to create Spanner backend");

        backend.health_check().await.unwrap();
    }
}
