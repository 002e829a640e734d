use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{check_password_input, hash_password, verify_password},
    },
    error::AppError,
    users::{
        repo::UserStore,
        repo_types::{NewUser, Role, User},
    },
};

const INVALID_CREDENTIALS: &str = "Invalid Credentials";

lazy_static! {
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{7,15}$").unwrap();
    static ref PHONE_NOISE_RE: Regex = Regex::new(r"[\s\-.()]").unwrap();
    // Verified against when the phone is unknown so both login failures cost the same.
    static ref DECOY_HASH: Option<String> = hash_password("decoy-password").ok();
}

/// Strip formatting characters and check the result looks like a phone number.
pub(crate) fn normalize_phone(raw: &str) -> Result<String, AppError> {
    let phone = PHONE_NOISE_RE.replace_all(raw.trim(), "").into_owned();
    if !PHONE_RE.is_match(&phone) {
        return Err(AppError::InvalidArgument("Invalid phone number.".into()));
    }
    Ok(phone)
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
}

#[instrument(skip(store, password))]
pub async fn register(
    store: &dyn UserStore,
    name: &str,
    phone: &str,
    password: &str,
    role: Role,
) -> Result<User, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidArgument("Name is required.".into()));
    }
    let phone = normalize_phone(phone)?;
    check_password_input(password)?;

    if store.find_by_phone(&phone).await?.is_some() {
        warn!(%phone, "phone already registered");
        return Err(AppError::Conflict("User already exists.".into()));
    }

    let user = store
        .insert(NewUser {
            name: name.to_string(),
            phone,
            password_hash: hash_password(password)?,
            role,
        })
        .await?;

    info!(user_id = %user.id, role = user.role.as_str(), "user registered");
    Ok(user)
}

#[instrument(skip(store, keys, password))]
pub async fn login(
    store: &dyn UserStore,
    keys: &JwtKeys,
    phone: &str,
    password: &str,
) -> Result<Session, AppError> {
    let invalid = || AppError::Unauthorized(INVALID_CREDENTIALS.into());

    let Ok(phone) = normalize_phone(phone) else {
        return Err(invalid());
    };

    let Some(user) = store.find_by_phone(&phone).await? else {
        if let Some(decoy) = DECOY_HASH.as_deref() {
            let _ = verify_password(password, decoy);
        }
        warn!("login for unknown phone");
        return Err(invalid());
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(invalid());
    }

    let token = keys.issue(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Session {
        token,
        user_id: user.id,
    })
}

/// Unauthenticated "forgot password" path keyed by phone.
#[instrument(skip(store, new_password))]
pub async fn reset_password(
    store: &dyn UserStore,
    phone: &str,
    new_password: &str,
) -> Result<(), AppError> {
    check_password_input(new_password)?;
    let not_found = || AppError::NotFound("User not found.".into());

    let phone = normalize_phone(phone).map_err(|_| not_found())?;
    let user = store.find_by_phone(&phone).await?.ok_or_else(not_found)?;

    let hash = hash_password(new_password)?;
    if !store.set_password_hash(user.id, &hash).await? {
        return Err(not_found());
    }
    info!(user_id = %user.id, "password reset");
    Ok(())
}

#[instrument(skip(store, old_password, new_password))]
pub async fn update_password(
    store: &dyn UserStore,
    user_id: Uuid,
    old_password: &str,
    new_password: &str,
) -> Result<(), AppError> {
    check_password_input(new_password)?;
    let not_found = || AppError::NotFound("User not found.".into());

    let user = store.find_by_id(user_id).await?.ok_or_else(not_found)?;

    if !verify_password(old_password, &user.password_hash)? {
        warn!(%user_id, "password update with wrong old password");
        return Err(AppError::Unauthorized("Incorrect old password.".into()));
    }

    let hash = hash_password(new_password)?;
    if !store.set_password_hash(user_id, &hash).await? {
        return Err(not_found());
    }
    info!(%user_id, "password updated");
    Ok(())
}
