use std::{ffi::CString, fmt};

use libsqlite3_sys as ffi;

use crate::{
    connection::prepare_error,
    decode::{bind_value, decode_column, to_c_index},
    raw::RawStatement,
    Col, Connection, ParamValue, Params, Result, ResultMap, ResultValue, ResultVector,
    SqliteError,
};

const NAME_PREFIXES: [char; 3] = [':', '@', '$'];

/// A compiled statement with its parameter bindings and row state.
///
/// Binding is done with 1-based indexes or placeholder names. After
/// [`execute`](Statement::execute) produces a row, the `fetch_*` methods
/// read it and step to the next one; once the result is exhausted the
/// statement resets itself and can be executed again with the same or new
/// bindings.
///
/// A statement owns its plan exclusively and cannot be cloned.
pub struct Statement {
    // Declared before `connection` so the plan is finalized first.
    raw: RawStatement,
    connection: Connection,
    sql: String,
    parameters: Vec<ParamValue>,
    rows: bool,
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("parameters", &self.parameters)
            .field("rows", &self.rows)
            .finish()
    }
}

impl Statement {
    /// Compiles `sql` on `connection`.
    ///
    /// Fails with [`SqliteError::Prepare`] if the text is empty, is not valid
    /// SQL, references unknown schema objects, or holds more than one
    /// statement.
    pub fn new(connection: Connection, sql: &str) -> Result<Self> {
        if sql.trim().is_empty() {
            return Err(prepare_error(sql, "statement text is empty"));
        }
        if sql.contains('\0') {
            return Err(prepare_error(sql, "statement text contains a NUL byte"));
        }
        let (raw, consumed) = connection
            .raw()
            .prepare(sql)
            .map_err(|err| err.into_prepare(sql))?;
        let raw = raw.ok_or_else(|| prepare_error(sql, "statement text contains no SQL"))?;

        let tail = sql.get(consumed..).unwrap_or_default();
        // Only whitespace or comments may follow the first statement.
        if !tail.trim().is_empty() && !matches!(connection.raw().prepare(tail), Ok((None, _))) {
            return Err(prepare_error(sql, "text holds more than one statement"));
        }

        let count = usize::try_from(raw.parameter_count()).unwrap_or(0);

        #[cfg(feature = "tracing")]
        tracing::debug!(sql, parameters = count, "prepared statement");

        Ok(Self {
            raw,
            connection,
            sql: sql.to_owned(),
            parameters: vec![ParamValue::Null; count],
            rows: false,
        })
    }

    /// Connection the statement was prepared on.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Statement text as prepared.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Statement text with the current bindings substituted as literals.
    pub fn expanded_sql(&self) -> Option<String> {
        self.raw.expanded_sql()
    }

    /// Current bindings, one slot per placeholder.
    pub fn parameters(&self) -> &[ParamValue] {
        &self.parameters
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Name of the placeholder at 1-based `index`, `None` for `?`.
    pub fn parameter_name(&self, index: usize) -> Option<String> {
        if !self.has_parameter(index) {
            return None;
        }
        self.raw.parameter_name(to_c_index(index).ok()?)
    }

    /// Resolves a placeholder name to its 1-based index.
    ///
    /// The exact name is tried first; a name given without its prefix is
    /// also looked up as `:name`, `@name` and `$name`.
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        let lookup = |candidate: &str| {
            let candidate = CString::new(candidate).ok()?;
            let index = usize::try_from(self.raw.parameter_index(&candidate)).ok()?;
            self.has_parameter(index).then_some(index)
        };
        if let Some(index) = lookup(name) {
            return Some(index);
        }
        if name.starts_with(NAME_PREFIXES) {
            return None;
        }
        NAME_PREFIXES
            .iter()
            .find_map(|prefix| lookup(&format!("{prefix}{name}")))
    }

    /// Returns `true` while a row is pending for the `fetch_*` methods.
    pub fn rows(&self) -> bool {
        self.rows
    }

    /// Binds `value` to the placeholder at 1-based `index`.
    ///
    /// Fails with [`SqliteError::IndexOutOfRange`] outside `1..=parameter_count()`
    /// and with [`SqliteError::Range`] for a `u64` above `i64::MAX`; the
    /// binding is unchanged in both cases.
    pub fn bind(&mut self, index: usize, value: impl Into<ParamValue>) -> Result<&mut Self> {
        if !self.has_parameter(index) {
            return Err(SqliteError::IndexOutOfRange(format!(
                "the index '{index}' is not in the statement"
            )));
        }
        let value = value.into();
        bind_value(&self.raw, to_c_index(index)?, &value, &self.sql)?;
        self.parameters[index - 1] = value;
        Ok(self)
    }

    /// Binds `value` to the placeholder called `name`.
    pub fn bind_named(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<&mut Self> {
        let index = self.parameter_index(name).ok_or_else(|| {
            SqliteError::IndexOutOfRange(format!(
                "the name '{name}' is not a parameter in the statement"
            ))
        })?;
        self.bind(index, value)
    }

    /// Binds `values` to placeholders `1..=n` in order.
    ///
    /// All or nothing: if any value fails, every slot is restored to what it
    /// held before the call and the error is returned.
    pub fn bind_vector<I, V>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        let snapshot = self.parameters.clone();
        let outcome = values
            .into_iter()
            .enumerate()
            .try_for_each(|(offset, value)| self.bind(offset + 1, value).map(|_| ()));
        if let Err(err) = outcome {
            self.restore(snapshot);
            return Err(err);
        }
        Ok(self)
    }

    /// Binds each `(name, value)` pair by placeholder name, with the same
    /// all-or-nothing guarantee as [`bind_vector`](Statement::bind_vector).
    pub fn bind_map<I, K, V>(&mut self, pairs: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ParamValue>,
    {
        let snapshot = self.parameters.clone();
        let outcome = pairs
            .into_iter()
            .try_for_each(|(name, value)| self.bind_named(name.as_ref(), value).map(|_| ()));
        if let Err(err) = outcome {
            self.restore(snapshot);
            return Err(err);
        }
        Ok(self)
    }

    /// Binds a positional or named [`Params`] container atomically.
    pub fn bind_params(&mut self, params: impl Into<Params>) -> Result<&mut Self> {
        match params.into() {
            Params::Positional(values) => self.bind_vector(values),
            Params::Named(pairs) => self.bind_map(pairs),
        }
    }

    /// Steps the plan once.
    ///
    /// A produced row sets [`rows`](Statement::rows). Completion resets the
    /// plan, keeping the bindings. An engine error resets the plan, clears
    /// the row state and is returned as [`SqliteError::Execution`].
    pub fn execute(&mut self) -> Result<&mut Self> {
        match self.raw.step() {
            ffi::SQLITE_ROW => self.rows = true,
            ffi::SQLITE_DONE | ffi::SQLITE_OK => {
                self.reset()?;
            }
            code => {
                let err = self.raw.last_error(code);
                self.raw.reset();
                self.rows = false;

                #[cfg(feature = "tracing")]
                tracing::debug!(sql = %self.sql, code, message = %err.message, "statement failed");

                return Err(err.into_execution(self.sql.as_str()));
            }
        }
        Ok(self)
    }

    /// Rewinds the plan so it can run again with the same bindings.
    pub fn reset(&mut self) -> Result<&mut Self> {
        self.rows = false;
        let rc = self.raw.reset();
        if rc != ffi::SQLITE_OK {
            return Err(self.raw.last_error(rc).into_execution(self.sql.as_str()));
        }
        Ok(self)
    }

    /// Sets every binding back to `NULL`.
    pub fn clear_parameters(&mut self) -> Result<&mut Self> {
        let rc = self.raw.clear_bindings();
        if rc != ffi::SQLITE_OK {
            return Err(self.raw.last_error(rc).into_execution(self.sql.as_str()));
        }
        self.parameters.fill(ParamValue::Null);
        Ok(self)
    }

    pub fn column_count(&self) -> usize {
        usize::try_from(self.raw.column_count()).unwrap_or(0)
    }

    /// Name of result column `i` (0-based).
    pub fn column_name(&self, i: usize) -> Result<String> {
        self.check_column(i)?;
        self.raw
            .column_name(to_c_index(i)?)
            .ok_or_else(|| column_out_of_range(i))
    }

    /// Name and declared type of every result column.
    pub fn columns(&self) -> Vec<Col> {
        (0..self.raw.column_count())
            .map(|col| Col {
                name: self.raw.column_name(col).unwrap_or_default(),
                decltype: self.raw.column_decltype(col),
            })
            .collect()
    }

    /// Reads the pending row by position and steps to the next one.
    ///
    /// Returns `Ok(None)` without side effects when no row is pending.
    pub fn fetch_vector(&mut self) -> Result<Option<ResultVector>> {
        if !self.rows {
            return Ok(None);
        }
        let row = (0..self.raw.column_count())
            .map(|col| decode_column(&self.raw, col))
            .collect();
        self.execute()?;
        Ok(Some(row))
    }

    /// Reads the pending row keyed by column name and steps to the next one.
    pub fn fetch_map(&mut self) -> Result<Option<ResultMap>> {
        if !self.rows {
            return Ok(None);
        }
        let mut row = ResultMap::with_capacity(self.column_count());
        for col in 0..self.raw.column_count() {
            row.insert(
                self.raw.column_name(col).unwrap_or_default(),
                decode_column(&self.raw, col),
            );
        }
        self.execute()?;
        Ok(Some(row))
    }

    /// Reads column `i` of the pending row and steps to the next one.
    pub fn fetch_column(&mut self, i: usize) -> Result<Option<ResultValue>> {
        if !self.rows {
            return Ok(None);
        }
        self.check_column(i)?;
        let value = decode_column(&self.raw, to_c_index(i)?);
        self.execute()?;
        Ok(Some(value))
    }

    /// Drains the remaining rows by position.
    pub fn fetch_all_vector(&mut self) -> Result<Vec<ResultVector>> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch_vector()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Drains the remaining rows keyed by column name.
    pub fn fetch_all_map(&mut self) -> Result<Vec<ResultMap>> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch_map()? {
            rows.push(row);
        }
        Ok(rows)
    }

    fn has_parameter(&self, index: usize) -> bool {
        (1..=self.parameters.len()).contains(&index)
    }

    fn check_column(&self, i: usize) -> Result<()> {
        if i < self.column_count() {
            Ok(())
        } else {
            Err(column_out_of_range(i))
        }
    }

    /// Rebinds every slot that differs from `snapshot`.
    fn restore(&mut self, snapshot: Vec<ParamValue>) {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %self.sql, "batch bind failed, restoring previous bindings");

        for (offset, value) in snapshot.into_iter().enumerate() {
            if self.parameters[offset] == value {
                continue;
            }
            // Every snapshot value was accepted by the engine once already.
            let rebound = to_c_index(offset + 1)
                .and_then(|index| bind_value(&self.raw, index, &value, &self.sql));
            if let Err(err) = rebound {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    sql = %self.sql,
                    slot = offset + 1,
                    error = %err,
                    "failed to restore binding"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = err;
            }
            self.parameters[offset] = value;
        }
    }
}

fn column_out_of_range(i: usize) -> SqliteError {
    SqliteError::IndexOutOfRange(format!("the column index '{i}' is out of bounds"))
}
