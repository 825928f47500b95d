//! Database layer for the clinic application.
//!
//! Provides a single shared SQLite connection per process and bootstraps the
//! clinic schema from `db_init.sql` the first time the database is opened.
//!
//! # Layout
//!
//! The component directory holds `db_init.sql`. The database file lives one
//! level up, at `<app-root>/data/clinic.db`. See [`DbPaths`].
//!
//! # Lifecycle
//!
//! - The process-wide [`ConnectionProvider`] is set with [`install`] at
//!   startup, or created on first use by [`provider`].
//! - The first [`get_connection`] opens the file, enables foreign keys and
//!   runs the bootstrap script unless the `doctors` table already exists.
//! - The connection is never closed explicitly.
//!
//! Every error returned from the provider except
//! [`DbError::AlreadyInstalled`] is fatal: callers are expected to stop the
//! process rather than run against a missing or half-built schema.

mod bootstrap;
mod connection;
mod error;
mod provider;

pub use bootstrap::{
    bootstrap, execute_script, is_missing_table, split_statements, BootstrapOutcome,
};
pub use connection::{
    open_connection, schema_present, DbPaths, DB_FILE_NAME, INIT_SCRIPT_NAME,
    SCHEMA_SENTINEL_TABLE,
};
pub use error::DbError;
pub use provider::{get_connection, install, provider, ConnectionProvider, SharedConnection};
