//! SQLite-backed user store

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use super::{CredentialStore, UserStore};
use crate::types::{Identity, NewIdentity, Role, UpdateUserRequest, UserFilter};
use crate::{Error, Result};

const CREATE_ROLES: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    role_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    role_name        TEXT    NOT NULL UNIQUE,
    role_description TEXT,
    priority_level   INTEGER NOT NULL,
    created_at       TEXT    NOT NULL,
    updated_at       TEXT
)"#;

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT    NOT NULL UNIQUE,
    password_hash TEXT    NOT NULL,
    email         TEXT    NOT NULL UNIQUE,
    phone         TEXT,
    full_name     TEXT    NOT NULL,
    avatar_url    TEXT,
    role_id       INTEGER NOT NULL REFERENCES roles (role_id),
    is_active     INTEGER NOT NULL DEFAULT 1,
    last_login    TEXT,
    created_at    TEXT    NOT NULL,
    updated_at    TEXT    NOT NULL
)"#;

const SELECT_IDENTITY: &str = r#"
SELECT u.user_id, u.username, u.password_hash, u.email, u.phone, u.full_name,
       u.avatar_url, r.role_name, r.role_description, u.is_active, u.last_login,
       u.created_at, u.updated_at
FROM users u
JOIN roles r ON r.role_id = u.role_id"#;

/// User store over a SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    /// Connect, create the schema if needed and seed the role catalogue
    pub async fn new(database_url: &str) -> Result<Self> {
        // every connection to `sqlite::memory:` is its own database
        let in_memory = database_url.contains(":memory:");
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options.connect(database_url).await?;
        let store = Self { pool };
        store.migrate().await?;
        info!("User store ready at {}", redact_url(database_url));
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_ROLES).execute(&self.pool).await?;
        sqlx::query(CREATE_USERS).execute(&self.pool).await?;

        let now = Utc::now();
        for role in Role::ALL {
            sqlx::query(
                "INSERT OR IGNORE INTO roles (role_name, role_description, priority_level, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(role.name())
            .bind(role.default_description())
            .bind(i64::from(role.priority()))
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;
        }
        debug!("User store schema in place");
        Ok(())
    }

    async fn fetch_one_by_id(&self, user_id: i64) -> Result<Option<Identity>> {
        let sql = format!("{} WHERE u.user_id = ?", SELECT_IDENTITY);
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(identity_from_row).transpose()
    }
}

#[async_trait]
impl CredentialStore for SqliteUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>> {
        let sql = format!("{} WHERE u.username = ?", SELECT_IDENTITY);
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(identity_from_row).transpose()
    }

    async fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE users SET last_login = ?, updated_at = ? WHERE user_id = ?")
            .bind(at)
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn create_user(&self, user: NewIdentity) -> Result<Identity> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, email, phone, full_name, role_id, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, (SELECT role_id FROM roles WHERE role_name = ?), ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.full_name)
        .bind(user.role.name())
        .bind(user.active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        let result = result.map_err(|e| unique_violation(e, &user.email, &user.username))?;

        let user_id = result.last_insert_rowid();
        self.fetch_one_by_id(user_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("User {} vanished after insert", user_id)))
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<Identity>> {
        self.fetch_one_by_id(user_id).await
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<Identity>> {
        let sql = format!(
            "{} WHERE (? IS NULL OR u.is_active = ?) AND (? IS NULL OR r.role_name = ?) ORDER BY u.user_id",
            SELECT_IDENTITY
        );
        let role = filter.role.map(|role| role.name());
        let rows = sqlx::query(&sql)
            .bind(filter.active)
            .bind(filter.active)
            .bind(role)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(identity_from_row).collect()
    }

    async fn set_active(&self, user_id: i64, active: bool) -> Result<Identity> {
        let result = sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE user_id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(user_id.to_string()));
        }
        self.fetch_one_by_id(user_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }

    async fn update_user(&self, user_id: i64, update: UpdateUserRequest) -> Result<Identity> {
        let result = sqlx::query(
            "UPDATE users SET \
                 email = COALESCE(?, email), \
                 phone = COALESCE(?, phone), \
                 full_name = COALESCE(?, full_name), \
                 avatar_url = COALESCE(?, avatar_url), \
                 role_id = COALESCE((SELECT role_id FROM roles WHERE role_name = ?), role_id), \
                 is_active = COALESCE(?, is_active), \
                 updated_at = ? \
             WHERE user_id = ?",
        )
        .bind(&update.email)
        .bind(&update.phone)
        .bind(&update.full_name)
        .bind(&update.avatar_url)
        .bind(update.role_name.map(|role| role.name()))
        .bind(update.is_active)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, update.email.as_deref().unwrap_or_default(), ""))?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(user_id.to_string()));
        }
        self.fetch_one_by_id(user_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }
}

/// Map a unique-index violation to `UserAlreadyExists`, naming the taken value
fn unique_violation(err: sqlx::Error, email: &str, username: &str) -> Error {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            let taken = if db_err.message().contains("email") {
                email
            } else {
                username
            };
            Error::UserAlreadyExists(taken.to_string())
        }
        other => other.into(),
    }
}

fn identity_from_row(row: &SqliteRow) -> Result<Identity> {
    let role_name: String = row.try_get("role_name")?;
    let role = Role::from_str(&role_name)
        .map_err(|_| Error::Internal(format!("Unknown role in store: {}", role_name)))?;

    Ok(Identity {
        id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        full_name: row.try_get("full_name")?,
        avatar_url: row.try_get("avatar_url")?,
        role,
        role_description: row.try_get("role_description")?,
        active: row.try_get("is_active")?,
        last_login: row.try_get("last_login")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Strip credentials from a connection string before logging it
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
