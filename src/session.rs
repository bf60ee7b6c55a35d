//! Login sessions.
//!
//! The signed cookie holds `logged_in` and `token`, where `token` is the id
//! of a row in the sessions table. Lookups go through a short-lived moka
//! cache so most requests skip the database.

use crate::orm::sessions;
use crate::user::Principal;
use actix_session::{Session, SessionInsertError};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{NaiveDateTime, Utc};
use moka::sync::Cache;
use once_cell::sync::Lazy;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use std::time::Duration;
use uuid::Uuid;

const COOKIE_LOGGED_IN: &str = "logged_in";
const COOKIE_TOKEN: &str = "token";

static ARGON2: Lazy<Argon2<'static>> = Lazy::new(Argon2::default);

/// Session rows by id. Entries still carry their own expiry.
static SESSION_CACHE: Lazy<Cache<Uuid, CachedSession>> = Lazy::new(|| {
    Cache::builder()
        .time_to_live(Duration::from_secs(300))
        .max_capacity(10_000)
        .support_invalidation_closures()
        .build()
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedSession {
    pub user_id: i32,
    pub expires_at: NaiveDateTime,
}

pub fn get_argon2() -> &'static Argon2<'static> {
    &ARGON2
}

/// Hashes a password into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(get_argon2()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// False for a wrong password and for an unparsable hash.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => get_argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

pub async fn new_session<C>(db: &C, user_id: i32, ttl: chrono::Duration) -> Result<Uuid, DbErr>
where
    C: ConnectionTrait,
{
    let uuid = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    let expires_at = now + ttl;

    sessions::ActiveModel {
        id: Set(uuid.to_string()),
        user_id: Set(Some(user_id)),
        created_at: Set(now),
        expires_at: Set(expires_at),
    }
    .insert(db)
    .await?;

    SESSION_CACHE.insert(
        uuid,
        CachedSession {
            user_id,
            expires_at,
        },
    );

    Ok(uuid)
}

/// Returns the unexpired session with this id.
pub async fn get_session<C>(db: &C, uuid: Uuid) -> Result<Option<CachedSession>, DbErr>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();

    if let Some(cached) = SESSION_CACHE.get(&uuid) {
        if cached.expires_at > now {
            return Ok(Some(cached));
        }
        SESSION_CACHE.invalidate(&uuid);
        return Ok(None);
    }

    let row = sessions::Entity::find_by_id(uuid.to_string())
        .filter(sessions::Column::ExpiresAt.gt(now))
        .one(db)
        .await?;

    Ok(row.and_then(|row| {
        let session = CachedSession {
            user_id: row.user_id?,
            expires_at: row.expires_at,
        };
        SESSION_CACHE.insert(uuid, session.clone());
        Some(session)
    }))
}

pub async fn remove_session<C>(db: &C, uuid: Uuid) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    SESSION_CACHE.invalidate(&uuid);
    sessions::Entity::delete_many()
        .filter(sessions::Column::Id.eq(uuid.to_string()))
        .exec(db)
        .await?;
    Ok(())
}

/// Ends every session the user holds, cached ones included.
/// Returns how many rows were removed.
pub async fn invalidate_user_sessions<C>(db: &C, user_id: i32) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    if let Err(e) = SESSION_CACHE.invalidate_entries_if(move |_, session| session.user_id == user_id) {
        log::error!("Unable to evict cached sessions of user {}: {}", user_id, e);
    }

    let res = sessions::Entity::delete_many()
        .filter(sessions::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// Deletes expired session rows. Returns how many were removed.
pub async fn expire_sessions<C>(db: &C) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    let res = sessions::Entity::delete_many()
        .filter(sessions::Column::ExpiresAt.lte(Utc::now().naive_utc()))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// Stores a fresh session id in the cookie.
pub fn start_cookie_session(cookies: &Session, uuid: Uuid) -> Result<(), SessionInsertError> {
    cookies.renew();
    cookies.insert(COOKIE_LOGGED_IN, true)?;
    cookies.insert(COOKIE_TOKEN, uuid.to_string())?;
    Ok(())
}

/// Drops the login keys from the cookie, returning the session id they held.
pub fn end_cookie_session(cookies: &Session) -> Option<Uuid> {
    let token = cookies_token(cookies);
    cookies.remove(COOKIE_LOGGED_IN);
    cookies.remove(COOKIE_TOKEN);
    token
}

fn cookies_token(cookies: &Session) -> Option<Uuid> {
    match cookies.get::<String>(COOKIE_TOKEN) {
        Ok(Some(token)) => Uuid::parse_str(&token).ok(),
        Ok(None) => None,
        Err(e) => {
            log::error!("Unable to read session token from cookie: {}", e);
            None
        }
    }
}

pub async fn authenticate_by_cookie<C>(db: &C, cookies: &Session) -> Option<(Uuid, CachedSession)>
where
    C: ConnectionTrait,
{
    let uuid = cookies_token(cookies)?;
    match get_session(db, uuid).await {
        Ok(session) => session.map(|s| (uuid, s)),
        Err(e) => {
            log::error!("authenticate_by_cookie: {}", e);
            None
        }
    }
}

/// Resolves the cookie to an active user, if any.
pub async fn authenticate_client_by_session<C>(db: &C, cookies: &Session) -> Option<Principal>
where
    C: ConnectionTrait,
{
    let (_, session) = authenticate_by_cookie(db, cookies).await?;
    match Principal::get_by_id(db, session.user_id).await {
        Ok(principal) => principal,
        Err(e) => {
            log::error!("authenticate_client_by_session: {}", e);
            None
        }
    }
}
