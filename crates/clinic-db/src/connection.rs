//! Database file locations and connection setup.

use std::path::{Component, Path, PathBuf};

use rusqlite::{Connection, OpenFlags};

use crate::error::DbError;

/// File name of the clinic database inside the `data` directory.
pub const DB_FILE_NAME: &str = "clinic.db";

/// File name of the bootstrap script inside the component directory.
pub const INIT_SCRIPT_NAME: &str = "db_init.sql";

/// Table whose presence marks the schema as already initialized.
pub const SCHEMA_SENTINEL_TABLE: &str = "doctors";

/// Resolved locations of the database file and its bootstrap script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbPaths {
    /// `<app-root>/data/clinic.db`.
    pub database: PathBuf,

    /// `<component-dir>/db_init.sql`.
    pub init_script: PathBuf,
}

impl DbPaths {
    /// Derives both paths from the component directory.
    ///
    /// The application root is the component directory's parent; the
    /// database lives under its `data` subdirectory and the script sits
    /// next to the component.
    pub fn for_component_dir(component_dir: impl AsRef<Path>) -> Self {
        let component_dir = component_dir.as_ref();
        let app_root = one_level_up(component_dir);

        Self {
            database: app_root.join("data").join(DB_FILE_NAME),
            init_script: component_dir.join(INIT_SCRIPT_NAME),
        }
    }

    /// Uses the directory of the running executable as the component directory.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from [`std::env::current_exe`], or `NotFound`
    /// if the executable path has no parent.
    pub fn from_current_exe() -> std::io::Result<Self> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "executable path has no parent directory",
            )
        })?;
        Ok(Self::for_component_dir(dir))
    }
}

/// The directory one level above `dir`.
///
/// Only a trailing normal component is dropped; a trailing `..` (or a bare
/// `.`) gets another `..` appended instead.
fn one_level_up(dir: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = dir
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect();

    match parts.last() {
        Some(Component::Normal(_)) => {
            parts.pop();
        }
        Some(Component::RootDir | Component::Prefix(_)) => {}
        Some(Component::ParentDir | Component::CurDir) | None => {
            parts.push(Component::ParentDir)
        }
    }

    parts.iter().collect()
}

/// Opens (creating if absent) the database file and enables foreign keys.
///
/// The `data` directory itself is not created; a missing directory is a
/// connection failure.
///
/// # Errors
///
/// Returns `DbError::ConnectionFailure` if the file cannot be opened or the
/// foreign key pragma does not take effect.
pub fn open_connection(path: &Path) -> Result<Connection, DbError> {
    let fail = |source| DbError::ConnectionFailure {
        path: path.to_path_buf(),
        source,
    };

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let conn = Connection::open_with_flags(path, flags).map_err(fail)?;

    // rusqlite surfaces every SQLite failure as an Err, so there is no
    // separate error mode to switch on. Foreign keys are off by default.
    conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(fail)?;

    let fk: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .map_err(fail)?;
    if fk != 1 {
        return Err(fail(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("failed to enable foreign keys, got: {}", fk)),
        )));
    }

    tracing::debug!(path = %path.display(), "opened clinic database");

    Ok(conn)
}

/// Checks the catalog for the sentinel table.
pub fn schema_present(conn: &Connection) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [SCHEMA_SENTINEL_TABLE],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_resolve_relative_to_component_dir() {
        let paths = DbPaths::for_component_dir("/srv/clinic/public");
        assert_eq!(paths.database, PathBuf::from("/srv/clinic/data/clinic.db"));
        assert_eq!(
            paths.init_script,
            PathBuf::from("/srv/clinic/public/db_init.sql")
        );
    }

    #[test]
    fn current_dir_resolves_to_its_parent() {
        let paths = DbPaths::for_component_dir(".");
        assert_eq!(paths.database, PathBuf::from("../data/clinic.db"));
        assert_eq!(paths.init_script, PathBuf::from("./db_init.sql"));

        let paths = DbPaths::for_component_dir("srv/public/.");
        assert_eq!(paths.database, PathBuf::from("srv/data/clinic.db"));
    }

    #[test]
    fn trailing_parent_dir_goes_up_again() {
        let paths = DbPaths::for_component_dir("srv/public/..");
        assert_eq!(
            paths.database,
            PathBuf::from("srv/public/../../data/clinic.db")
        );

        let paths = DbPaths::for_component_dir("..");
        assert_eq!(paths.database, PathBuf::from("../../data/clinic.db"));
    }

    #[test]
    fn relative_and_root_component_dirs() {
        let paths = DbPaths::for_component_dir("public");
        assert_eq!(paths.database, PathBuf::from("data/clinic.db"));

        let paths = DbPaths::for_component_dir("/");
        assert_eq!(paths.database, PathBuf::from("/data/clinic.db"));
    }

    #[test]
    fn open_creates_file_with_foreign_keys() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("clinic.db");
        assert!(!db_path.exists());

        let conn = open_connection(&db_path).expect("open should succeed");
        assert!(db_path.exists(), "opening should create the file");

        let fk: i32 = conn
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .expect("should query foreign_keys");
        assert_eq!(fk, 1, "foreign keys should be enabled");
    }

    #[test]
    fn open_fails_when_data_dir_is_missing() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("data").join("clinic.db");

        let err = open_connection(&db_path).expect_err("missing directory should fail");
        match err {
            DbError::ConnectionFailure { path, .. } => assert_eq!(path, db_path),
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn schema_presence_tracks_sentinel_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!schema_present(&conn).unwrap());

        conn.execute_batch("CREATE TABLE patients (id INTEGER PRIMARY KEY);")
            .unwrap();
        assert!(!schema_present(&conn).unwrap());

        conn.execute_batch("CREATE TABLE doctors (id INTEGER PRIMARY KEY);")
            .unwrap();
        assert!(schema_present(&conn).unwrap());
    }
}
