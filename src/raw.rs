//! Thin owners of the engine's native handles.
//!
//! This is the only module containing `unsafe` code. Everything above it
//! works with [`RawConnection`] and [`RawStatement`], which release their
//! handle on drop.
//!
//! Safety: `RawConnection::db` and `RawStatement::stmt` are non-null and
//! live from construction until `Drop`. Engine calls that take only one of
//! those handles plus scalar arguments rely on that alone and carry no
//! per-call note; calls that pass or read other pointers are annotated.

use std::{
    ffi::{c_char, c_int, CStr},
    ptr, slice,
};

use libsqlite3_sys as ffi;

use crate::SqliteError;

/// Error code and diagnostic captured from the engine.
#[derive(Debug)]
pub(crate) struct EngineError {
    pub(crate) code: c_int,
    pub(crate) message: String,
}

impl EngineError {
    pub(crate) fn new(code: c_int, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn from_code(code: c_int) -> Self {
        // SAFETY: sqlite3_errstr returns a static, NUL-terminated string.
        let message = unsafe { cstr_lossy(ffi::sqlite3_errstr(code)) };
        Self::new(code, message)
    }

    /// # Safety
    ///
    /// `db` must be a live connection handle.
    unsafe fn from_db(db: *mut ffi::sqlite3, code: c_int) -> Self {
        Self::new(code, cstr_lossy(ffi::sqlite3_errmsg(db)))
    }

    pub(crate) fn into_open(self, path: impl Into<String>) -> SqliteError {
        SqliteError::Open {
            path: path.into(),
            message: self.message,
            code: self.code,
        }
    }

    pub(crate) fn into_prepare(self, sql: impl Into<String>) -> SqliteError {
        SqliteError::Prepare {
            sql: sql.into(),
            message: self.message,
            code: self.code,
        }
    }

    pub(crate) fn into_execution(self, sql: impl Into<String>) -> SqliteError {
        SqliteError::Execution {
            sql: sql.into(),
            message: self.message,
            code: self.code,
        }
    }
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn cstr_lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

/// Owned `sqlite3*` connection handle.
pub(crate) struct RawConnection {
    db: *mut ffi::sqlite3,
}

impl RawConnection {
    pub(crate) fn open(path: &CStr, flags: c_int) -> Result<Self, EngineError> {
        let mut db = ptr::null_mut();
        // SAFETY: `path` is NUL-terminated and `db` is a valid out-pointer.
        let rc = unsafe { ffi::sqlite3_open_v2(path.as_ptr(), &mut db, flags, ptr::null()) };
        if rc != ffi::SQLITE_OK {
            let err = if db.is_null() {
                EngineError::from_code(rc)
            } else {
                // SAFETY: the engine may hand back a handle even on failure; it
                // carries the diagnostic and must still be closed.
                unsafe { EngineError::from_db(db, rc) }
            };
            // SAFETY: closing a null or failed handle is allowed.
            unsafe { ffi::sqlite3_close(db) };
            return Err(err);
        }
        // SAFETY: `db` is a freshly opened handle.
        unsafe { ffi::sqlite3_extended_result_codes(db, 1) };
        Ok(Self { db })
    }

    pub(crate) fn busy_timeout(&self, timeout_ms: c_int) -> Result<(), EngineError> {
        let rc = unsafe { ffi::sqlite3_busy_timeout(self.db, timeout_ms) };
        self.check(rc)
    }

    /// Runs semicolon-separated statements without parameters or results.
    pub(crate) fn exec(&self, sql: &CStr) -> Result<(), EngineError> {
        let mut errmsg: *mut c_char = ptr::null_mut();
        // SAFETY: `sql` is NUL-terminated; no callback is registered.
        let rc = unsafe {
            ffi::sqlite3_exec(self.db, sql.as_ptr(), None, ptr::null_mut(), &mut errmsg)
        };
        if rc == ffi::SQLITE_OK {
            return Ok(());
        }
        if errmsg.is_null() {
            return Err(self.last_error(rc));
        }
        // SAFETY: `errmsg` was allocated by the engine and is freed exactly once.
        let message = unsafe {
            let message = cstr_lossy(errmsg);
            ffi::sqlite3_free(errmsg.cast());
            message
        };
        Err(EngineError::new(rc, message))
    }

    pub(crate) fn changes(&self) -> c_int {
        unsafe { ffi::sqlite3_changes(self.db) }
    }

    pub(crate) fn last_insert_rowid(&self) -> i64 {
        unsafe { ffi::sqlite3_last_insert_rowid(self.db) }
    }

    pub(crate) fn is_autocommit(&self) -> bool {
        unsafe { ffi::sqlite3_get_autocommit(self.db) != 0 }
    }

    /// Compiles the first statement in `sql`.
    ///
    /// Returns the plan (absent when the text holds only whitespace or
    /// comments) and the byte offset where the unparsed tail begins.
    pub(crate) fn prepare(&self, sql: &str) -> Result<(Option<RawStatement>, usize), EngineError> {
        let len = c_int::try_from(sql.len())
            .map_err(|_| EngineError::new(ffi::SQLITE_TOOBIG, "statement text is too long"))?;
        let mut stmt = ptr::null_mut();
        let mut tail: *const c_char = ptr::null();
        // SAFETY: the engine reads at most `len` bytes of `sql`.
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(self.db, sql.as_ptr().cast(), len, &mut stmt, &mut tail)
        };
        if rc != ffi::SQLITE_OK {
            let err = self.last_error(rc);
            // SAFETY: finalizing a null plan is a no-op.
            unsafe { ffi::sqlite3_finalize(stmt) };
            return Err(err);
        }
        let consumed = if tail.is_null() {
            sql.len()
        } else {
            // SAFETY: `tail` points into the same buffer as `sql`, at or past its start.
            let offset = unsafe { tail.offset_from(sql.as_ptr().cast()) };
            usize::try_from(offset).unwrap_or(sql.len())
        };
        let stmt = (!stmt.is_null()).then_some(RawStatement { stmt });
        Ok((stmt, consumed))
    }

    fn check(&self, rc: c_int) -> Result<(), EngineError> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(self.last_error(rc))
        }
    }

    fn last_error(&self, code: c_int) -> EngineError {
        // SAFETY: `self.db` stays open for the lifetime of `self`.
        unsafe { EngineError::from_db(self.db, code) }
    }
}

impl Drop for RawConnection {
    fn drop(&mut self) {
        // close_v2 defers the close until outstanding plans are finalized.
        unsafe { ffi::sqlite3_close_v2(self.db) };
    }
}

/// Owned `sqlite3_stmt*` plan handle.
///
/// Must be dropped before the [`RawConnection`] it was prepared on; callers
/// keep the connection alive alongside it.
pub(crate) struct RawStatement {
    stmt: *mut ffi::sqlite3_stmt,
}

impl RawStatement {
    pub(crate) fn parameter_count(&self) -> c_int {
        unsafe { ffi::sqlite3_bind_parameter_count(self.stmt) }
    }

    /// Resolves a placeholder name (including its prefix) to a 1-based index.
    pub(crate) fn parameter_index(&self, name: &CStr) -> c_int {
        // SAFETY: `name` is NUL-terminated and only read during the call.
        unsafe { ffi::sqlite3_bind_parameter_index(self.stmt, name.as_ptr()) }
    }

    pub(crate) fn parameter_name(&self, index: c_int) -> Option<String> {
        let name = unsafe { ffi::sqlite3_bind_parameter_name(self.stmt, index) };
        // SAFETY: the name is owned by the plan and NUL-terminated.
        (!name.is_null()).then(|| unsafe { cstr_lossy(name) })
    }

    pub(crate) fn bind_null(&self, index: c_int) -> Result<(), EngineError> {
        let rc = unsafe { ffi::sqlite3_bind_null(self.stmt, index) };
        self.check(rc)
    }

    pub(crate) fn bind_int(&self, index: c_int, value: c_int) -> Result<(), EngineError> {
        let rc = unsafe { ffi::sqlite3_bind_int(self.stmt, index, value) };
        self.check(rc)
    }

    pub(crate) fn bind_int64(&self, index: c_int, value: i64) -> Result<(), EngineError> {
        let rc = unsafe { ffi::sqlite3_bind_int64(self.stmt, index, value) };
        self.check(rc)
    }

    pub(crate) fn bind_double(&self, index: c_int, value: f64) -> Result<(), EngineError> {
        let rc = unsafe { ffi::sqlite3_bind_double(self.stmt, index, value) };
        self.check(rc)
    }

    pub(crate) fn bind_text(&self, index: c_int, value: &str) -> Result<(), EngineError> {
        // SAFETY: SQLITE_TRANSIENT makes the engine copy the bytes before returning.
        let rc = unsafe {
            ffi::sqlite3_bind_text64(
                self.stmt,
                index,
                value.as_ptr().cast(),
                value.len() as u64,
                ffi::SQLITE_TRANSIENT(),
                ffi::SQLITE_UTF8 as u8,
            )
        };
        self.check(rc)
    }

    pub(crate) fn bind_blob(&self, index: c_int, value: &[u8]) -> Result<(), EngineError> {
        // An empty slice would bind NULL through bind_blob.
        let rc = if value.is_empty() {
            unsafe { ffi::sqlite3_bind_zeroblob(self.stmt, index, 0) }
        } else {
            // SAFETY: SQLITE_TRANSIENT makes the engine copy the bytes before returning.
            unsafe {
                ffi::sqlite3_bind_blob64(
                    self.stmt,
                    index,
                    value.as_ptr().cast(),
                    value.len() as u64,
                    ffi::SQLITE_TRANSIENT(),
                )
            }
        };
        self.check(rc)
    }

    pub(crate) fn clear_bindings(&self) -> c_int {
        unsafe { ffi::sqlite3_clear_bindings(self.stmt) }
    }

    pub(crate) fn step(&self) -> c_int {
        unsafe { ffi::sqlite3_step(self.stmt) }
    }

    pub(crate) fn reset(&self) -> c_int {
        unsafe { ffi::sqlite3_reset(self.stmt) }
    }

    pub(crate) fn column_count(&self) -> c_int {
        unsafe { ffi::sqlite3_column_count(self.stmt) }
    }

    pub(crate) fn column_name(&self, col: c_int) -> Option<String> {
        let name = unsafe { ffi::sqlite3_column_name(self.stmt, col) };
        // SAFETY: valid until the plan is finalized or re-prepared; copied here.
        (!name.is_null()).then(|| unsafe { cstr_lossy(name) })
    }

    pub(crate) fn column_decltype(&self, col: c_int) -> Option<String> {
        let decltype = unsafe { ffi::sqlite3_column_decltype(self.stmt, col) };
        // SAFETY: owned by the plan and NUL-terminated; copied here.
        (!decltype.is_null()).then(|| unsafe { cstr_lossy(decltype) })
    }

    pub(crate) fn column_type(&self, col: c_int) -> c_int {
        unsafe { ffi::sqlite3_column_type(self.stmt, col) }
    }

    pub(crate) fn column_int64(&self, col: c_int) -> i64 {
        unsafe { ffi::sqlite3_column_int64(self.stmt, col) }
    }

    pub(crate) fn column_double(&self, col: c_int) -> f64 {
        unsafe { ffi::sqlite3_column_double(self.stmt, col) }
    }

    pub(crate) fn column_text(&self, col: c_int) -> String {
        // column_bytes must follow column_text so the length matches the UTF-8 form.
        let text = unsafe { ffi::sqlite3_column_text(self.stmt, col) };
        if text.is_null() {
            return String::new();
        }
        // SAFETY: the engine guarantees `column_bytes` readable bytes at `text`
        // until the next step, reset or finalize.
        let bytes = unsafe { slice::from_raw_parts(text, self.column_bytes(col)) };
        String::from_utf8_lossy(bytes).into_owned()
    }

    pub(crate) fn column_blob(&self, col: c_int) -> Vec<u8> {
        let blob = unsafe { ffi::sqlite3_column_blob(self.stmt, col) };
        if blob.is_null() {
            return Vec::new();
        }
        // SAFETY: as for `column_text`, the buffer holds `column_bytes` bytes.
        let bytes = unsafe { slice::from_raw_parts(blob.cast::<u8>(), self.column_bytes(col)) };
        bytes.to_vec()
    }

    fn column_bytes(&self, col: c_int) -> usize {
        let len = unsafe { ffi::sqlite3_column_bytes(self.stmt, col) };
        usize::try_from(len).unwrap_or(0)
    }

    /// Statement text with the current bindings substituted.
    pub(crate) fn expanded_sql(&self) -> Option<String> {
        let expanded = unsafe { ffi::sqlite3_expanded_sql(self.stmt) };
        if expanded.is_null() {
            return None;
        }
        // SAFETY: the expansion is engine-allocated and freed exactly once.
        let text = unsafe {
            let text = cstr_lossy(expanded);
            ffi::sqlite3_free(expanded.cast());
            text
        };
        Some(text)
    }

    pub(crate) fn last_error(&self, code: c_int) -> EngineError {
        // SAFETY: a live plan always reports its owning connection.
        unsafe { EngineError::from_db(ffi::sqlite3_db_handle(self.stmt), code) }
    }

    fn check(&self, rc: c_int) -> Result<(), EngineError> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(self.last_error(rc))
        }
    }
}

impl Drop for RawStatement {
    fn drop(&mut self) {
        unsafe { ffi::sqlite3_finalize(self.stmt) };
    }
}
