//! PostgreSQL backend. One statement per operation; "no rows" and constraint
//! violations are translated into the same error kinds the in-memory store
//! produces.

use super::{DeviceStore, UserStore};
use crate::errors::{Error, Result};
use crate::model::{Device, NewDevice, NewTelemetry, Telemetry, User};
use async_trait::async_trait;
use sqlx::PgPool;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate a backend failure into a store error. `what` names the record
/// for not-found and duplicate messages.
fn map_sqlx_error(err: sqlx::Error, what: &str) -> Error {
    let code = match &err {
        sqlx::Error::RowNotFound => return Error::NotFound(format!("{} not found", what)),
        sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
        _ => None,
    };

    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => Error::DuplicateKey(format!("{} already exists", what)),
        Some(FOREIGN_KEY_VIOLATION) => Error::NotFound(format!("{} not found", what)),
        _ => Error::Database(err),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, &format!("user {}", user.id)))?;

        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, &format!("user {}", id)))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, email, created_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

#[async_trait]
impl DeviceStore for PgStore {
    async fn create_device(&self, device: NewDevice) -> Result<Device> {
        sqlx::query_as::<_, Device>(
            r#"
            INSERT INTO devices (name, device_type, mac_address, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, device_type, mac_address, is_active, created_at, updated_at
            "#,
        )
        .bind(&device.name)
        .bind(&device.device_type)
        .bind(&device.mac_address)
        .bind(device.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_sqlx_error(e, &format!("device with MAC address {}", device.mac_address))
        })
    }

    async fn get_device(&self, id: i64) -> Result<Device> {
        let mut device = sqlx::query_as::<_, Device>(
            r#"
            SELECT id, name, device_type, mac_address, is_active, created_at, updated_at
            FROM devices
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, &format!("device {}", id)))?;

        device.telemetries = sqlx::query_as::<_, Telemetry>(
            r#"
            SELECT id, device_id, data_type, value, recorded_at, created_at
            FROM telemetries
            WHERE device_id = $1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(device)
    }

    async fn list_devices(&self) -> Result<Vec<Device>> {
        let devices = sqlx::query_as::<_, Device>(
            r#"
            SELECT id, name, device_type, mac_address, is_active, created_at, updated_at
            FROM devices
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(devices)
    }

    async fn add_telemetry(&self, telemetry: NewTelemetry) -> Result<Telemetry> {
        sqlx::query_as::<_, Telemetry>(
            r#"
            INSERT INTO telemetries (device_id, data_type, value, recorded_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, device_id, data_type, value, recorded_at, created_at
            "#,
        )
        .bind(telemetry.device_id)
        .bind(&telemetry.data_type)
        .bind(telemetry.value)
        .bind(telemetry.recorded_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, &format!("device {}", telemetry.device_id)))
    }
}
