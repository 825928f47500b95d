//! The process-wide provider can only be installed once per test binary, so
//! everything touching it lives in this single test.

use std::fs;
use std::sync::Arc;

use clinic_db::{ConnectionProvider, DbError};
use tempfile::TempDir;

#[test]
fn installed_provider_backs_free_function() {
    let root = TempDir::new().expect("failed to create temp dir");
    let public = root.path().join("public");
    fs::create_dir(&public).expect("failed to create component dir");
    fs::create_dir(root.path().join("data")).expect("failed to create data dir");
    fs::write(
        public.join("db_init.sql"),
        "CREATE TABLE doctors (id INTEGER PRIMARY KEY);",
    )
    .expect("failed to write script");

    let installed = clinic_db::install(ConnectionProvider::for_component_dir(&public))
        .expect("first install should succeed");
    assert!(std::ptr::eq(installed, clinic_db::provider()));

    let again = clinic_db::install(ConnectionProvider::for_component_dir(&public));
    assert!(matches!(again, Err(DbError::AlreadyInstalled)));
    assert!(!again.unwrap_err().is_fatal());

    let from_fn = clinic_db::get_connection().expect("failed to get connection");
    let from_provider = clinic_db::provider()
        .get_connection()
        .expect("failed to get connection");
    assert!(Arc::ptr_eq(&from_fn, &from_provider));
    assert!(root.path().join("data/clinic.db").exists());
}
