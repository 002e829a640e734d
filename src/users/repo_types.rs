use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

/// Account kind, fixed at registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "user")]
    Rider,
    Driver,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Rider => "rider",
            Role::Driver => "driver",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rider" => Some(Role::Rider),
            "driver" => Some(Role::Driver),
            _ => None,
        }
    }
}

/// A WGS84 position. Construct through [`GeoPoint::new`] so the ranges hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "GeoJsonPoint")]
pub struct GeoPoint {
    lng: f64,
    lat: f64,
}

impl GeoPoint {
    pub const ORIGIN: GeoPoint = GeoPoint { lng: 0.0, lat: 0.0 };

    pub fn new(lng: f64, lat: f64) -> Result<Self, AppError> {
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::InvalidArgument(
                "Longitude must be between -180 and 180.".into(),
            ));
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::InvalidArgument(
                "Latitude must be between -90 and 90.".into(),
            ));
        }
        Ok(Self { lng, lat })
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }
}

/// Wire shape: `{"type":"Point","coordinates":[lng,lat]}`.
#[derive(Serialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: [f64; 2],
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(p: GeoPoint) -> Self {
        Self {
            kind: "Point",
            coordinates: [p.lng, p.lat],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    #[serde(rename = "type")]
    pub role: Role,
    pub is_online: bool,
    pub location: GeoPoint,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_location_update: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields supplied when a user is created; everything else is defaulted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
}

/// Directory projection of a driver.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSummary {
    pub name: String,
    pub location: GeoPoint,
    pub phone: String,
    pub is_online: bool,
}

impl From<&User> for DriverSummary {
    fn from(u: &User) -> Self {
        Self {
            name: u.name.clone(),
            location: u.location,
            phone: u.phone.clone(),
            is_online: u.is_online,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub password_hash: String,
    pub role: String,
    pub is_online: bool,
    pub longitude: f64,
    pub latitude: f64,
    pub last_location_update: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&r.role).ok_or_else(|| format!("unknown role {:?}", r.role))?;
        let location = GeoPoint::new(r.longitude, r.latitude).map_err(|e| e.to_string())?;
        Ok(Self {
            id: r.id,
            name: r.name,
            phone: r.phone,
            password_hash: r.password_hash,
            role,
            is_online: r.is_online,
            location,
            last_location_update: r.last_location_update,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct DriverRow {
    pub name: String,
    pub phone: String,
    pub is_online: bool,
    pub longitude: f64,
    pub latitude: f64,
}

impl TryFrom<DriverRow> for DriverSummary {
    type Error = String;

    fn try_from(r: DriverRow) -> Result<Self, Self::Error> {
        Ok(Self {
            location: GeoPoint::new(r.longitude, r.latitude).map_err(|e| e.to_string())?,
            name: r.name,
            phone: r.phone,
            is_online: r.is_online,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geopoint_rejects_out_of_range() {
        assert!(GeoPoint::new(200.0, 10.0).is_err());
        assert!(GeoPoint::new(10.0, -100.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(-180.0, 90.0).is_ok());
    }

    #[test]
    fn geopoint_serializes_as_geojson() {
        let p = GeoPoint::new(90.0, 45.0).unwrap();
        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"], serde_json::json!([90.0, 45.0]));
    }

    #[test]
    fn role_accepts_legacy_user_alias() {
        let r: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(r, Role::Rider);
        let r: Role = serde_json::from_str("\"driver\"").unwrap();
        assert_eq!(r, Role::Driver);
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            phone: "5551234567".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Driver,
            is_online: false,
            location: GeoPoint::ORIGIN,
            last_location_update: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("passwordHash"));
        assert!(json.contains("\"type\":\"driver\""));
        assert!(json.contains("\"isOnline\":false"));
    }
}
