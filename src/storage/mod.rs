//! Database access and the user directory

pub mod db;
pub mod migrations;
pub mod users;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
pub use migrations::schema_version;
pub use users::{register_user, DirectoryError, SqliteUserDirectory, User, UserDirectory};
