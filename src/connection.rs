use std::{
    ffi::{c_int, CString},
    fmt,
    path::Path,
    rc::Rc,
};

use libsqlite3_sys as ffi;

use crate::{
    raw::{EngineError, RawConnection},
    ConnectionOptions, OpenFlags, Result, SqliteError, Statement, Transaction,
};

const MEMORY_PATH: &str = ":memory:";

struct Inner {
    raw: RawConnection,
    path: String,
}

/// Handle to an open database.
///
/// Cloning is cheap and shares the native handle; it is closed when the last
/// clone, including those held by [`Statement`] and [`Transaction`], is
/// dropped. Not meant to be shared across threads.
#[derive(Clone)]
pub struct Connection {
    inner: Rc<Inner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.inner.path)
            .field("handles", &Rc::strong_count(&self.inner))
            .finish()
    }
}

impl Connection {
    /// Opens a private, temporary in-memory database, discarded on close.
    pub fn new() -> Result<Self> {
        Self::open_in_memory()
    }

    /// Same as [`Connection::new`].
    pub fn open_in_memory() -> Result<Self> {
        Self::open_with_options(MEMORY_PATH, ConnectionOptions::default())
    }

    /// Opens or creates the database file at `path` for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, ConnectionOptions::default())
    }

    /// Opens the database file at `path` with explicit open flags.
    pub fn open_with_flags(path: impl AsRef<Path>, flags: OpenFlags) -> Result<Self> {
        Self::open_with_options(path, ConnectionOptions::default().with_flags(flags))
    }

    /// Opens the database file at `path` and applies `options`.
    pub fn open_with_options(path: impl AsRef<Path>, options: ConnectionOptions) -> Result<Self> {
        let path = path.as_ref();
        let display = path.to_string_lossy().into_owned();
        let c_path = path
            .to_str()
            .and_then(|value| CString::new(value).ok())
            .ok_or_else(|| {
                EngineError::new(
                    ffi::SQLITE_CANTOPEN,
                    "path is not valid UTF-8 or contains a NUL byte",
                )
                .into_open(&display)
            })?;

        let raw = RawConnection::open(&c_path, options.flags.bits())
            .map_err(|err| err.into_open(&display))?;
        if let Some(timeout_ms) = options.busy_timeout_ms {
            let timeout_ms = c_int::try_from(timeout_ms).unwrap_or(c_int::MAX);
            raw.busy_timeout(timeout_ms)
                .map_err(|err| err.into_open(&display))?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(path = %display, flags = options.flags.bits(), "opened database");

        Ok(Self {
            inner: Rc::new(Inner { raw, path: display }),
        })
    }

    /// Path the connection was opened with, `:memory:` for transient databases.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Executes one or more semicolon-separated statements without
    /// parameters, discarding any rows.
    pub fn execute(&self, statements: &str) -> Result<()> {
        let sql = CString::new(statements).map_err(|_| {
            EngineError::new(ffi::SQLITE_MISUSE, "statement text contains a NUL byte")
                .into_execution(statements)
        })?;
        self.inner
            .raw
            .exec(&sql)
            .map_err(|err| err.into_execution(statements))
    }

    /// Rows changed by the most recent INSERT, UPDATE or DELETE on this
    /// connection.
    pub fn row_count(&self) -> usize {
        usize::try_from(self.inner.raw.changes()).unwrap_or(0)
    }

    /// Rowid of the most recent successful INSERT on this connection.
    pub fn last_insert_rowid(&self) -> i64 {
        self.inner.raw.last_insert_rowid()
    }

    /// Returns `false` while a transaction is open.
    pub fn is_autocommit(&self) -> bool {
        self.inner.raw.is_autocommit()
    }

    /// Compiles `statement` into a [`Statement`] bound to this connection.
    pub fn prepare(&self, statement: &str) -> Result<Statement> {
        Statement::new(self.clone(), statement)
    }

    /// Issues `BEGIN` and returns the guard that ends the transaction.
    pub fn begin_transaction(&self) -> Result<Transaction> {
        Transaction::new(self.clone())
    }

    pub(crate) fn raw(&self) -> &RawConnection {
        &self.inner.raw
    }
}

/// Reports an empty or multi-statement text as a compile failure.
pub(crate) fn prepare_error(sql: &str, message: &str) -> SqliteError {
    EngineError::new(ffi::SQLITE_MISUSE, message).into_prepare(sql)
}
