//! In-process `UserStore` used by unit and router tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::{StoreError, UserStore};
use crate::users::repo_types::{DriverSummary, GeoPoint, NewUser, Role, User};

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    broken: Mutex<HashSet<Uuid>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `mark_offline_if_stale` for `id` fail.
    pub fn break_writes_for(&self, id: Uuid) {
        self.broken.lock().unwrap().insert(id);
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }
}

fn is_stale(u: &User, cutoff: OffsetDateTime) -> bool {
    u.is_online && u.last_location_update.map_or(true, |t| t < cutoff)
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.phone == new.phone) {
            return Err(StoreError::DuplicatePhone);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            phone: new.phone,
            password_hash: new.password_hash,
            role: new.role,
            is_online: false,
            location: GeoPoint::ORIGIN,
            last_location_update: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.get(id))
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.phone == phone).cloned())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        Ok(match users.get_mut(&id) {
            Some(u) => {
                u.password_hash = password_hash.to_string();
                u.updated_at = OffsetDateTime::now_utc();
                true
            }
            None => false,
        })
    }

    async fn record_location(
        &self,
        id: Uuid,
        location: GeoPoint,
        at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        Ok(users.get_mut(&id).map(|u| {
            u.location = location;
            u.last_location_update = Some(at);
            u.is_online = true;
            u.updated_at = at;
            u.clone()
        }))
    }

    async fn set_online(&self, id: Uuid, is_online: bool) -> Result<Option<bool>, StoreError> {
        let mut users = self.users.lock().unwrap();
        Ok(users.get_mut(&id).map(|u| {
            u.is_online = is_online;
            u.updated_at = OffsetDateTime::now_utc();
            u.is_online
        }))
    }

    async fn stale_online_ids(&self, cutoff: OffsetDateTime) -> Result<Vec<Uuid>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .filter(|u| is_stale(u, cutoff))
            .map(|u| u.id)
            .collect())
    }

    async fn mark_offline_if_stale(
        &self,
        id: Uuid,
        cutoff: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        if self.broken.lock().unwrap().contains(&id) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut users = self.users.lock().unwrap();
        Ok(match users.get_mut(&id) {
            Some(u) if is_stale(u, cutoff) => {
                u.is_online = false;
                u.updated_at = OffsetDateTime::now_utc();
                true
            }
            _ => false,
        })
    }

    async fn list_drivers(&self) -> Result<Vec<DriverSummary>, StoreError> {
        let users = self.users.lock().unwrap();
        let mut drivers: Vec<DriverSummary> = users
            .values()
            .filter(|u| u.role == Role::Driver)
            .map(DriverSummary::from)
            .collect();
        drivers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(drivers)
    }
}
