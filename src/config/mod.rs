//! Configuration management: database connection and schema setup,
//! runtime settings, and the declarative permission table.

pub mod database;
pub mod permissions;
pub mod settings;

pub use database::{create_connection, create_tables, get_database_url};
pub use settings::{Settings, load_default_settings, load_settings};
