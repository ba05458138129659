use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roadwatch_common::{Device, JoinedFaultRow, NewFaultRecord, RepairStatus};
use roadwatch_core::{FaultStore, FaultTx, StoreError, StoreResult};
use sqlx::{PgPool, Postgres, Transaction};

/// Postgres-backed fault store. Schema lives in `/migrations`.
#[derive(Clone)]
pub struct PgFaultStore {
    pool: PgPool,
}

impl PgFaultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeviceRow {
    id: i64,
    identifier: String,
}

#[derive(Debug, sqlx::FromRow)]
struct JoinedRow {
    fault_id: i64,
    neighborhood_id: i64,
    neighborhood_name: String,
    latitude: f64,
    longitude: f64,
    detected_at: DateTime<Utc>,
    confidence: f64,
    repair_status: String,
    image_ref: Option<String>,
    fault_type_name: String,
    fault_type_priority: String,
    fault_type_description: String,
}

impl From<JoinedRow> for JoinedFaultRow {
    fn from(row: JoinedRow) -> Self {
        Self {
            fault_id: row.fault_id,
            neighborhood_id: row.neighborhood_id,
            neighborhood_name: row.neighborhood_name,
            latitude: row.latitude,
            longitude: row.longitude,
            detected_at: row.detected_at,
            confidence: row.confidence,
            repair_status: RepairStatus::from_str_loose(&row.repair_status),
            image_ref: row.image_ref,
            fault_type_name: row.fault_type_name,
            fault_type_priority: row.fault_type_priority,
            fault_type_description: row.fault_type_description,
        }
    }
}

#[async_trait]
impl FaultStore for PgFaultStore {
    async fn lookup_or_create_device(&self, identifier: &str) -> StoreResult<Device> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, DeviceRow>(
            r#"
            INSERT INTO devices (identifier)
            VALUES ($1)
            ON CONFLICT (identifier) DO UPDATE SET identifier = EXCLUDED.identifier
            RETURNING id, identifier
            "#,
        )
        .bind(identifier)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(Device {
            id: row.id,
            identifier: row.identifier,
        })
    }

    async fn begin(&self) -> StoreResult<Box<dyn FaultTx>> {
        let tx = self.pool.begin().await.map_err(store_err)?;
        Ok(Box::new(PgFaultTx { tx }))
    }

    async fn scan_joined_faults(&self) -> StoreResult<Vec<JoinedFaultRow>> {
        let rows = sqlx::query_as::<_, JoinedRow>(
            r#"
            SELECT f.id AS fault_id,
                   n.id AS neighborhood_id,
                   n.name AS neighborhood_name,
                   f.latitude,
                   f.longitude,
                   f.detected_at,
                   f.confidence,
                   f.repair_status,
                   f.image_ref,
                   t.name AS fault_type_name,
                   t.priority AS fault_type_priority,
                   t.description AS fault_type_description
            FROM fault_records f
            JOIN neighborhoods n ON n.id = f.neighborhood_id
            JOIN fault_types t ON t.id = f.fault_type_id
            ORDER BY COUNT(*) OVER (PARTITION BY n.id) DESC, n.id, f.detected_at, f.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Rolls back when dropped without `commit`.
struct PgFaultTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl FaultTx for PgFaultTx {
    async fn lookup_neighborhood_id(&mut self, name: &str) -> StoreResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM neighborhoods WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)
    }

    async fn lookup_fault_type_id(&mut self, name: &str) -> StoreResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM fault_types WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)
    }

    async fn insert_fault(&mut self, record: &NewFaultRecord) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO fault_records
                (device_id, neighborhood_id, fault_type_id, latitude, longitude,
                 detected_at, confidence, repair_status, image_ref)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(record.device_id)
        .bind(record.neighborhood_id)
        .bind(record.fault_type_id)
        .bind(record.coordinate.latitude())
        .bind(record.coordinate.longitude())
        .bind(record.detected_at)
        .bind(record.confidence)
        .bind(record.repair_status.to_string())
        .bind(&record.image_ref)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_err)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_err)
    }
}

/// Connection-level failures are `Unavailable`; the rest are query failures.
/// Messages are logged here and never carry the DSN.
fn store_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            tracing::error!(error = %err, "Database unavailable");
            StoreError::Unavailable("database connection unavailable".to_string())
        }
        other => {
            tracing::error!(error = %other, "Database query failed");
            StoreError::Query(other.to_string())
        }
    }
}
