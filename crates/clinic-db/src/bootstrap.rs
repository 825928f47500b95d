//! One-time schema bootstrap from a plain SQL script.
//!
//! The script is split with a deliberately naive line-based algorithm:
//! `--` starts a comment wherever it appears (string literals included) and
//! every `;` ends a statement. Bootstrap scripts are trusted content shipped
//! next to the binary, so these limits are part of the contract.
//!
//! Statements run one at a time in script order. A statement that fails
//! because a referenced table does not exist yet (cleanup `DELETE`s against
//! a fresh database) is skipped; any other failure aborts the bootstrap.

use std::path::Path;

use rusqlite::Connection;

use crate::error::DbError;

/// What happened when the provider initialized the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The sentinel table already existed; the script was not run.
    SchemaPresent,

    /// The script ran to completion.
    Applied {
        /// Statements that executed successfully.
        statements: usize,
        /// Statements skipped because they referenced a missing table.
        skipped_missing_table: usize,
    },

    /// The script was found but held no statements.
    EmptyScript,

    /// No script file exists; the schema was left empty.
    ScriptMissing,
}

impl BootstrapOutcome {
    /// Whether at least one bootstrap statement executed successfully.
    pub fn ran_statements(&self) -> bool {
        matches!(self, BootstrapOutcome::Applied { statements, .. } if *statements > 0)
    }
}

/// Splits a bootstrap script into individual `;`-terminated statements.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut stripped = String::with_capacity(script.len());
    for line in script.split_inclusive('\n') {
        match line.find("--") {
            // The comment runs up to, not including, the line feed.
            Some(pos) => {
                stripped.push_str(&line[..pos]);
                if line.ends_with('\n') {
                    stripped.push('\n');
                }
            }
            None => stripped.push_str(line),
        }
    }

    stripped
        .split(';')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| format!("{piece};"))
        .collect()
}

/// Whether the error reports a reference to a table that does not exist.
pub fn is_missing_table(err: &rusqlite::Error) -> bool {
    err.to_string().contains("no such table")
}

/// Executes every statement of `script` in order.
///
/// # Errors
///
/// Returns `DbError::BootstrapFailure` for the first statement that fails
/// with anything other than a missing-table error. Later statements are not
/// executed.
pub fn execute_script(conn: &Connection, script: &str) -> Result<BootstrapOutcome, DbError> {
    let statements = split_statements(script);
    if statements.is_empty() {
        return Ok(BootstrapOutcome::EmptyScript);
    }

    let mut executed = 0;
    let mut skipped = 0;

    for (index, statement) in statements.into_iter().enumerate() {
        match conn.execute_batch(&statement) {
            Ok(()) => executed += 1,
            Err(e) if is_missing_table(&e) => {
                tracing::debug!(index, error = %e, "skipping statement on missing table");
                skipped += 1;
            }
            Err(source) => {
                return Err(DbError::BootstrapFailure {
                    index,
                    statement,
                    source,
                })
            }
        }
    }

    Ok(BootstrapOutcome::Applied {
        statements: executed,
        skipped_missing_table: skipped,
    })
}

/// Reads the script at `script_path` and executes it.
///
/// A missing script is not an error: a warning is logged and the schema is
/// left as it is.
///
/// # Errors
///
/// Returns `DbError::ScriptRead` if the file exists but cannot be read, or
/// the error from [`execute_script`].
pub fn bootstrap(conn: &Connection, script_path: &Path) -> Result<BootstrapOutcome, DbError> {
    let script = match std::fs::read_to_string(script_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                path = %script_path.display(),
                "bootstrap script not found, schema left empty"
            );
            return Ok(BootstrapOutcome::ScriptMissing);
        }
        Err(source) => {
            return Err(DbError::ScriptRead {
                path: script_path.to_path_buf(),
                source,
            })
        }
    };

    let outcome = execute_script(conn, &script)?;

    match outcome {
        BootstrapOutcome::Applied {
            statements,
            skipped_missing_table,
        } if outcome.ran_statements() => tracing::info!(
            path = %script_path.display(),
            statements,
            skipped_missing_table,
            "database initialized from bootstrap script"
        ),
        BootstrapOutcome::Applied {
            skipped_missing_table,
            ..
        } => tracing::debug!(
            path = %script_path.display(),
            skipped_missing_table,
            "every bootstrap statement referenced a missing table"
        ),
        _ => tracing::debug!(path = %script_path.display(), "bootstrap script is empty"),
    }

    Ok(outcome)
}
