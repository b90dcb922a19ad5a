//! In-memory backend guarded by reader/writer locks

use super::{DeviceStore, UserStore};
use crate::errors::{Error, Result};
use crate::model::{Device, NewDevice, NewTelemetry, Telemetry, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    devices: RwLock<DeviceTable>,
}

struct DeviceTable {
    devices: HashMap<i64, Device>,
    mac_addresses: HashSet<String>,
    telemetries: HashMap<i64, Vec<Telemetry>>,
    next_device_id: i64,
    next_telemetry_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            devices: RwLock::new(DeviceTable {
                devices: HashMap::new(),
                mac_addresses: HashSet::new(),
                telemetries: HashMap::new(),
                next_device_id: 1,
                next_telemetry_id: 1,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;

        if users.contains_key(&user.id) {
            return Err(Error::DuplicateKey(format!("user {} already exists", user.id)));
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        let users = self.users.read().await;

        users
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("user {} not found", id)))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users = self.users.read().await;
        Ok(users.values().cloned().collect())
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn create_device(&self, device: NewDevice) -> Result<Device> {
        let mut table = self.devices.write().await;

        if table.mac_addresses.contains(&device.mac_address) {
            return Err(Error::DuplicateKey(format!(
                "device with MAC address {} already exists",
                device.mac_address
            )));
        }

        let id = table.next_device_id;
        table.next_device_id += 1;

        let now = Utc::now();
        let device = Device {
            id,
            name: device.name,
            device_type: device.device_type,
            mac_address: device.mac_address,
            is_active: device.is_active,
            created_at: now,
            updated_at: now,
            telemetries: Vec::new(),
        };

        table.mac_addresses.insert(device.mac_address.clone());
        table.devices.insert(id, device.clone());
        Ok(device)
    }

    async fn get_device(&self, id: i64) -> Result<Device> {
        let table = self.devices.read().await;

        let mut device = table
            .devices
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("device {} not found", id)))?;
        device.telemetries = table.telemetries.get(&id).cloned().unwrap_or_default();
        Ok(device)
    }

    async fn list_devices(&self) -> Result<Vec<Device>> {
        let table = self.devices.read().await;
        Ok(table.devices.values().cloned().collect())
    }

    async fn add_telemetry(&self, telemetry: NewTelemetry) -> Result<Telemetry> {
        let mut table = self.devices.write().await;

        if !table.devices.contains_key(&telemetry.device_id) {
            return Err(Error::NotFound(format!(
                "device {} not found",
                telemetry.device_id
            )));
        }

        let id = table.next_telemetry_id;
        table.next_telemetry_id += 1;

        let telemetry = Telemetry {
            id,
            device_id: telemetry.device_id,
            data_type: telemetry.data_type,
            value: telemetry.value,
            recorded_at: telemetry.recorded_at,
            created_at: Utc::now(),
        };

        table
            .telemetries
            .entry(telemetry.device_id)
            .or_default()
            .push(telemetry.clone());
        Ok(telemetry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn user(id: &str, username: &str) -> User {
        User {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            created_at: Utc::now(),
        }
    }

    fn new_device(mac: &str) -> NewDevice {
        NewDevice {
            name: "thermo".to_string(),
            device_type: "Sensor".to_string(),
            mac_address: mac.to_string(),
            is_active: true,
        }
    }

    fn reading(device_id: i64, value: f64) -> NewTelemetry {
        NewTelemetry {
            device_id,
            data_type: "Temperature".to_string(),
            value,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_then_list_returns_both() {
        let store = MemoryStore::new();
        store.create_user(user("usr_1", "alice")).await.unwrap();
        store.create_user(user("usr_2", "bob")).await.unwrap();

        let mut names: Vec<String> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        names.sort();

        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let store = MemoryStore::new();
        store.create_user(user("usr_1", "alice")).await.unwrap();

        let err = store.create_user(user("usr_1", "mallory")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "alice");
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let store = MemoryStore::new();
        let err = store.get_user("usr_404").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_get_existing_user() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let alice = user("usr_1", "alice");
            store.create_user(alice.clone()).await.unwrap();

            assert_eq!(store.get_user("usr_1").await.unwrap(), alice);
        });
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let store = MemoryStore::new();
        assert!(store.list_users().await.unwrap().is_empty());
        assert!(store.list_devices().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let n = 200;

        let handles: Vec<_> = (0..n)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create_user(user(&format!("usr_{}", i), &format!("user{}", i)))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list_users().await.unwrap().len(), n);
        for i in 0..n {
            assert!(store.get_user(&format!("usr_{}", i)).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_device_ids_increase_from_one() {
        let store = MemoryStore::new();
        let first = store.create_device(new_device("AA:00")).await.unwrap();
        let second = store.create_device(new_device("AA:01")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.list_devices().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_mac_is_rejected() {
        let store = MemoryStore::new();
        store.create_device(new_device("AA:00")).await.unwrap();

        let err = store.create_device(new_device("AA:00")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));
        assert_eq!(store.list_devices().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_device_loads_telemetries() {
        let store = MemoryStore::new();
        let device = store.create_device(new_device("AA:00")).await.unwrap();
        let other = store.create_device(new_device("AA:01")).await.unwrap();

        store.add_telemetry(reading(device.id, 20.0)).await.unwrap();
        store.add_telemetry(reading(device.id, 21.0)).await.unwrap();
        store.add_telemetry(reading(other.id, 99.0)).await.unwrap();

        let loaded = store.get_device(device.id).await.unwrap();
        let values: Vec<f64> = loaded.telemetries.iter().map(|t| t.value).collect();
        assert_eq!(values, vec![20.0, 21.0]);

        // listing does not eager-load
        let listed = store.list_devices().await.unwrap();
        assert!(listed.iter().all(|d| d.telemetries.is_empty()));
    }

    #[tokio::test]
    async fn test_telemetry_for_missing_device() {
        let store = MemoryStore::new();

        let err = store.add_telemetry(reading(99999, 1.0)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        {
            let table = store.devices.read().await;
            assert!(table.telemetries.is_empty());
            assert_eq!(table.next_telemetry_id, 1);
        }

        // the rejected reading must not have consumed an id
        let device = store.create_device(new_device("AA:00")).await.unwrap();
        let stored = store.add_telemetry(reading(device.id, 2.0)).await.unwrap();
        assert_eq!(stored.id, 1);
        assert_eq!(store.get_device(device.id).await.unwrap().telemetries.len(), 1);
    }
}
