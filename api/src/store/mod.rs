//! Record store contract and its backends.
//!
//! Handlers only ever see `Arc<dyn Storage>`; which backend sits behind it is
//! decided once at startup.

pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::model::{Device, NewDevice, NewTelemetry, Telemetry, User};
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a fully populated user.
    ///
    /// Fails with `DuplicateKey` if a user with the same id exists.
    async fn create_user(&self, user: User) -> Result<()>;

    /// Fails with `NotFound` if no user has this id.
    async fn get_user(&self, id: &str) -> Result<User>;

    /// Snapshot of every user, in no particular order.
    async fn list_users(&self) -> Result<Vec<User>>;
}

#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Insert a device, assigning its id and timestamps.
    ///
    /// Fails with `DuplicateKey` if the MAC address is already registered.
    async fn create_device(&self, device: NewDevice) -> Result<Device>;

    /// Fetch a device together with its telemetries.
    async fn get_device(&self, id: i64) -> Result<Device>;

    /// Every device, without telemetries.
    async fn list_devices(&self) -> Result<Vec<Device>>;

    /// Append a reading. Fails with `NotFound` if the device does not exist.
    async fn add_telemetry(&self, telemetry: NewTelemetry) -> Result<Telemetry>;
}

/// Everything the HTTP layer needs from a backend
pub trait Storage: UserStore + DeviceStore {}

impl<T: UserStore + DeviceStore> Storage for T {}
