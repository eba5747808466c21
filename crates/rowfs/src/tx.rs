//! Transaction scoping.
//!
//! Every logical operation runs inside exactly one SQLite transaction.
//! Writers take the write lock up front (`BEGIN IMMEDIATE`); readers use a
//! deferred transaction so all of their queries see a single snapshot.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::{FsError, FsResult};

/// Run `f` in a write transaction.
pub fn write<T>(
    conn: &mut Connection,
    f: impl FnOnce(&Transaction<'_>) -> FsResult<T>,
) -> FsResult<T> {
    run(conn, TransactionBehavior::Immediate, f)
}

/// Run `f` in a read transaction.
pub fn read<T>(
    conn: &mut Connection,
    f: impl FnOnce(&Transaction<'_>) -> FsResult<T>,
) -> FsResult<T> {
    run(conn, TransactionBehavior::Deferred, f)
}

/// Commit when `f` succeeds, roll back when it fails.
///
/// A failed rollback is reported together with the error that caused it.
fn run<T>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    f: impl FnOnce(&Transaction<'_>) -> FsResult<T>,
) -> FsResult<T> {
    let tx = Transaction::new(conn, behavior)
        .map_err(|e| FsError::store("cannot start transaction", e))?;

    match f(&tx) {
        Ok(value) => {
            tx.commit()
                .map_err(|e| FsError::store("cannot commit transaction", e))?;
            Ok(value)
        }
        Err(err) => match tx.rollback() {
            Ok(()) => Err(err),
            Err(rollback) => {
                tracing::error!(error = %err, %rollback, "rollback failed");
                Err(FsError::RollbackFailed {
                    source: Box::new(err),
                    rollback,
                })
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER NOT NULL UNIQUE);")
            .unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_commit_on_success() {
        let mut conn = setup();
        let n = write(&mut conn, |tx| {
            tx.execute("INSERT INTO t (v) VALUES (1)", [])
                .map_err(|e| FsError::store("insert", e))
        })
        .unwrap();
        assert_eq!(n, 1);
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn test_rollback_on_error() {
        let mut conn = setup();
        let result: FsResult<()> = write(&mut conn, |tx| {
            tx.execute("INSERT INTO t (v) VALUES (1)", [])
                .map_err(|e| FsError::store("insert", e))?;
            Err(FsError::directory_not_empty("x"))
        });
        assert!(matches!(result, Err(FsError::DirectoryNotEmpty(_))));
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn test_rollback_on_constraint_failure() {
        let mut conn = setup();
        let result = write(&mut conn, |tx| {
            tx.execute("INSERT INTO t (v) VALUES (7)", [])
                .map_err(|e| FsError::store("first insert", e))?;
            tx.execute("INSERT INTO t (v) VALUES (7)", [])
                .map_err(|e| FsError::store("second insert", e))
        });
        assert!(matches!(result, Err(FsError::Store { .. })));
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn test_failed_rollback_keeps_original_error() {
        let mut conn = setup();
        let result: FsResult<()> = write(&mut conn, |tx| {
            // Ending the transaction early makes the later ROLLBACK fail.
            tx.execute_batch("ROLLBACK")
                .map_err(|e| FsError::store("early rollback", e))?;
            Err(FsError::directory_not_empty("x"))
        });

        match result {
            Err(FsError::RollbackFailed { source, .. }) => {
                assert!(matches!(*source, FsError::DirectoryNotEmpty(ref p) if p == "x"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(conn.is_autocommit());
    }
}
