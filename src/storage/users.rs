//! User directory: create-or-fetch users keyed by phone number.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use thiserror::Error;

use crate::core::validation::{normalize_phone, ValidationError};
use crate::storage::db::{get_connection, DbPool};

/// A registered bot user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Normalized `+<digits>` phone, unique per user
    pub phone: String,
    /// Chat the user last registered from
    pub chat_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub converted_image_counter: i64,
}

/// Failures of the user directory.
///
/// "Not found" is never an error: lookups return `Ok(None)`.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("user directory unavailable: {0}")]
    Pool(#[from] r2d2::Error),

    #[error(transparent)]
    InvalidPhone(#[from] ValidationError),

    #[error("user with phone {0} is missing right after insert")]
    Missing(String),
}

/// Persistence seam for users.
///
/// Implementations are synchronous; SQLite calls are short and the
/// handlers call them inline.
pub trait UserDirectory: Send + Sync {
    fn get_by_phone(&self, phone: &str) -> Result<Option<User>, DirectoryError>;

    fn get_by_chat(&self, chat_id: i64) -> Result<Option<User>, DirectoryError>;

    /// Inserts a user; an already registered phone is left untouched.
    fn create_user(&self, name: &str, phone: &str) -> Result<(), DirectoryError>;

    /// Persists `name`, `phone`, `chat_id` and the counter; refreshes `updated_at`.
    fn update(&self, user: &mut User) -> Result<(), DirectoryError>;

    fn increment_converted_images(&self, user_id: i64, by: i64) -> Result<(), DirectoryError>;
}

/// Create-or-fetch a user by phone and bind them to `chat_id`.
///
/// Re-registering an existing phone returns the stored user (its original
/// name is kept) and never inserts a second row.
pub fn register_user(
    directory: &dyn UserDirectory,
    name: &str,
    phone: &str,
    chat_id: Option<i64>,
) -> Result<User, DirectoryError> {
    let phone = normalize_phone(phone)?;

    let mut user = match directory.get_by_phone(&phone)? {
        Some(existing) => existing,
        None => {
            directory.create_user(name.trim(), &phone)?;
            log::info!("Registered new user with phone {}", phone);
            directory
                .get_by_phone(&phone)?
                .ok_or_else(|| DirectoryError::Missing(phone.clone()))?
        }
    };

    if chat_id.is_some() && user.chat_id != chat_id {
        user.chat_id = chat_id;
        directory.update(&mut user)?;
    }

    Ok(user)
}

/// SQLite-backed [`UserDirectory`].
#[derive(Clone)]
pub struct SqliteUserDirectory {
    pool: DbPool,
}

impl SqliteUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, phone, chat_id, created_at, updated_at, converted_image_counter";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        chat_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        converted_image_counter: row.get(6)?,
    })
}

impl UserDirectory for SqliteUserDirectory {
    fn get_by_phone(&self, phone: &str) -> Result<Option<User>, DirectoryError> {
        let conn = get_connection(&self.pool)?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE phone = ?1", USER_COLUMNS),
                params![phone],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn get_by_chat(&self, chat_id: i64) -> Result<Option<User>, DirectoryError> {
        let conn = get_connection(&self.pool)?;
        let user = conn
            .query_row(
                &format!(
                    "SELECT {} FROM users WHERE chat_id = ?1 ORDER BY updated_at DESC LIMIT 1",
                    USER_COLUMNS
                ),
                params![chat_id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn create_user(&self, name: &str, phone: &str) -> Result<(), DirectoryError> {
        let conn = get_connection(&self.pool)?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (name, phone, created_at, updated_at, converted_image_counter)
             VALUES (?1, ?2, ?3, ?3, 0)
             ON CONFLICT(phone) DO NOTHING",
            params![name, phone, now],
        )?;
        Ok(())
    }

    fn update(&self, user: &mut User) -> Result<(), DirectoryError> {
        let conn = get_connection(&self.pool)?;
        user.updated_at = Utc::now();
        conn.execute(
            "UPDATE users
             SET name = ?1, phone = ?2, chat_id = ?3, updated_at = ?4, converted_image_counter = ?5
             WHERE id = ?6",
            params![
                user.name,
                user.phone,
                user.chat_id,
                user.updated_at,
                user.converted_image_counter,
                user.id
            ],
        )?;
        Ok(())
    }

    fn increment_converted_images(&self, user_id: i64, by: i64) -> Result<(), DirectoryError> {
        let conn = get_connection(&self.pool)?;
        conn.execute(
            "UPDATE users
             SET converted_image_counter = converted_image_counter + ?1, updated_at = ?2
             WHERE id = ?3",
            params![by, Utc::now(), user_id],
        )?;
        Ok(())
    }
}
