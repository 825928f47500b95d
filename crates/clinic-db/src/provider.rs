//! The shared connection provider.
//!
//! A [`ConnectionProvider`] owns at most one SQLite connection for its whole
//! lifetime. The first call to [`ConnectionProvider::get_connection`] opens
//! the database file, enables foreign keys, and bootstraps the schema if the
//! sentinel table is missing. Every later call hands out the same handle.
//!
//! The process-wide provider lives in a static and is never torn down; the
//! connection is released when the process exits.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use rusqlite::Connection;

use crate::bootstrap::{bootstrap, BootstrapOutcome};
use crate::connection::{open_connection, schema_present, DbPaths};
use crate::error::DbError;

/// The single connection handle shared across the application.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Lazily opens and bootstraps exactly one connection.
#[derive(Debug)]
pub struct ConnectionProvider {
    paths: DbPaths,
    handle: OnceLock<SharedConnection>,
    outcome: OnceLock<BootstrapOutcome>,
    init_lock: Mutex<()>,
}

impl ConnectionProvider {
    /// Creates a provider for the given locations. Nothing is opened yet.
    pub fn new(paths: DbPaths) -> Self {
        Self {
            paths,
            handle: OnceLock::new(),
            outcome: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Creates a provider whose paths derive from `component_dir`.
    pub fn for_component_dir(component_dir: impl AsRef<std::path::Path>) -> Self {
        Self::new(DbPaths::for_component_dir(component_dir))
    }

    /// The database and bootstrap script locations.
    pub fn paths(&self) -> &DbPaths {
        &self.paths
    }

    /// Whether the connection has been created.
    pub fn is_initialized(&self) -> bool {
        self.handle.get().is_some()
    }

    /// How the schema was prepared when the connection was created.
    pub fn bootstrap_outcome(&self) -> Option<BootstrapOutcome> {
        self.outcome.get().copied()
    }

    /// Returns the shared connection, creating and bootstrapping it on first use.
    ///
    /// Concurrent first calls are serialized: one thread opens the database
    /// while the others wait and then reuse its handle. A failed attempt
    /// leaves the provider uninitialized.
    ///
    /// # Errors
    ///
    /// Returns `DbError::ConnectionFailure` if the database cannot be opened
    /// or inspected, and `DbError::BootstrapFailure` or `DbError::ScriptRead`
    /// if the schema script cannot be applied. All of these are fatal.
    pub fn get_connection(&self) -> Result<SharedConnection, DbError> {
        if let Some(conn) = self.handle.get() {
            return Ok(Arc::clone(conn));
        }

        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(conn) = self.handle.get() {
            return Ok(Arc::clone(conn));
        }

        let (conn, outcome) = open_and_bootstrap(&self.paths)?;
        let _ = self.outcome.set(outcome);
        let conn = self.handle.get_or_init(|| Arc::new(Mutex::new(conn)));

        Ok(Arc::clone(conn))
    }
}

fn open_and_bootstrap(paths: &DbPaths) -> Result<(Connection, BootstrapOutcome), DbError> {
    let conn = open_connection(&paths.database)?;

    let present = schema_present(&conn).map_err(|source| DbError::ConnectionFailure {
        path: paths.database.clone(),
        source,
    })?;

    let outcome = if present {
        tracing::debug!(
            path = %paths.database.display(),
            "schema already present, skipping bootstrap"
        );
        BootstrapOutcome::SchemaPresent
    } else {
        bootstrap(&conn, &paths.init_script)?
    };

    Ok((conn, outcome))
}

static PROCESS_PROVIDER: OnceLock<ConnectionProvider> = OnceLock::new();

/// Installs the process-wide provider.
///
/// Call this once at startup, before anything uses [`provider`] or
/// [`get_connection`].
///
/// # Errors
///
/// Returns `DbError::AlreadyInstalled` if a provider is already in place,
/// including one created implicitly by an earlier [`provider`] call.
pub fn install(provider: ConnectionProvider) -> Result<&'static ConnectionProvider, DbError> {
    let mut installed = false;
    let current = PROCESS_PROVIDER.get_or_init(|| {
        installed = true;
        provider
    });

    if installed {
        Ok(current)
    } else {
        Err(DbError::AlreadyInstalled)
    }
}

/// Returns the process-wide provider.
///
/// Falls back to a provider rooted at the running executable's directory
/// when none was installed.
pub fn provider() -> &'static ConnectionProvider {
    PROCESS_PROVIDER
        .get_or_init(|| ConnectionProvider::new(default_paths(DbPaths::from_current_exe())))
}

/// Paths for the implicit provider: the executable's directory, or the
/// current directory if that cannot be determined.
fn default_paths(from_exe: std::io::Result<DbPaths>) -> DbPaths {
    match from_exe {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!(error = %e, "cannot locate executable, using current directory");
            DbPaths::for_component_dir(".")
        }
    }
}

/// Returns the process-wide shared connection.
///
/// # Errors
///
/// See [`ConnectionProvider::get_connection`].
pub fn get_connection() -> Result<SharedConnection, DbError> {
    provider().get_connection()
}
