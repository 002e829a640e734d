use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::{DriverRow, DriverSummary, GeoPoint, NewUser, User, UserRow};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("phone already registered")]
    DuplicatePhone,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence for user accounts and their presence state.
///
/// Every mutating method is a single atomic write; callers never need a
/// read-modify-write cycle of their own.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account with a fresh id, `(0,0)` location and offline.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, StoreError>;

    /// Returns `false` when no such user exists.
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool, StoreError>;

    /// Set location, `last_location_update = at` and `is_online = true` in one write.
    async fn record_location(
        &self,
        id: Uuid,
        location: GeoPoint,
        at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError>;

    /// Returns the stored flag, or `None` when no such user exists.
    async fn set_online(&self, id: Uuid, is_online: bool) -> Result<Option<bool>, StoreError>;

    /// Ids of online users whose last location update is older than `cutoff`
    /// (or missing).
    async fn stale_online_ids(&self, cutoff: OffsetDateTime) -> Result<Vec<Uuid>, StoreError>;

    /// Flip one user offline, but only if it is still online and still stale.
    async fn mark_offline_if_stale(
        &self,
        id: Uuid,
        cutoff: OffsetDateTime,
    ) -> Result<bool, StoreError>;

    async fn list_drivers(&self) -> Result<Vec<DriverSummary>, StoreError>;
}

const USER_COLUMNS: &str = "id, name, phone, password_hash, role, is_online, longitude, latitude, \
                            last_location_update, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn to_user(row: UserRow) -> Result<User, StoreError> {
    User::try_from(row).map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, name, phone, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::DuplicatePhone,
            other => StoreError::Database(other),
        })?;
        to_user(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(to_user).transpose()
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone = $1"
        ))
        .bind(phone)
        .fetch_optional(&self.db)
        .await?;
        row.map(to_user).transpose()
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn record_location(
        &self,
        id: Uuid,
        location: GeoPoint,
        at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET longitude = $2,
                   latitude = $3,
                   last_location_update = $4,
                   is_online = TRUE,
                   updated_at = $4
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(location.lng())
        .bind(location.lat())
        .bind(at)
        .fetch_optional(&self.db)
        .await?;
        row.map(to_user).transpose()
    }

    async fn set_online(&self, id: Uuid, is_online: bool) -> Result<Option<bool>, StoreError> {
        let flag = sqlx::query_scalar::<_, bool>(
            r#"
            UPDATE users
               SET is_online = $2, updated_at = now()
             WHERE id = $1
            RETURNING is_online
            "#,
        )
        .bind(id)
        .bind(is_online)
        .fetch_optional(&self.db)
        .await?;
        Ok(flag)
    }

    async fn stale_online_ids(&self, cutoff: OffsetDateTime) -> Result<Vec<Uuid>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
              FROM users
             WHERE is_online
               AND (last_location_update IS NULL OR last_location_update < $1)
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.db)
        .await?;
        Ok(ids)
    }

    async fn mark_offline_if_stale(
        &self,
        id: Uuid,
        cutoff: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET is_online = FALSE, updated_at = now()
             WHERE id = $1
               AND is_online
               AND (last_location_update IS NULL OR last_location_update < $2)
            "#,
        )
        .bind(id)
        .bind(cutoff)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn list_drivers(&self) -> Result<Vec<DriverSummary>, StoreError> {
        let rows = sqlx::query_as::<_, DriverRow>(
            r#"
            SELECT name, phone, is_online, longitude, latitude
              FROM users
             WHERE role = 'driver'
             ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        rows.into_iter()
            .map(|r| {
                DriverSummary::try_from(r)
                    .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))
            })
            .collect()
    }
}
