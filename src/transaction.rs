use crate::{Connection, Result};

/// Scope guard for a transaction on a [`Connection`].
///
/// `BEGIN` is issued on construction. The transaction ends exactly once, by
/// [`commit`](Transaction::commit), [`roll_back`](Transaction::roll_back), or
/// an implicit rollback when the guard is dropped unfinished.
///
/// Moving the guard moves the duty to finish it; it cannot be cloned.
#[derive(Debug)]
pub struct Transaction {
    connection: Connection,
    finished: bool,
}

impl Transaction {
    /// Begins a transaction on `connection`.
    ///
    /// Fails with [`SqliteError::Execution`](crate::SqliteError::Execution)
    /// if one is already open.
    pub fn new(connection: Connection) -> Result<Self> {
        connection.execute("BEGIN TRANSACTION;")?;
        Ok(Self {
            connection,
            finished: false,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Commits. Does nothing once the transaction has finished.
    ///
    /// On failure the transaction stays open and is rolled back on drop.
    pub fn commit(&mut self) -> Result<()> {
        if !self.finished {
            self.connection.execute("COMMIT TRANSACTION;")?;
            self.finished = true;
        }
        Ok(())
    }

    /// Rolls back. Does nothing once the transaction has finished.
    pub fn roll_back(&mut self) -> Result<()> {
        if !self.finished {
            self.connection.execute("ROLLBACK TRANSACTION;")?;
            self.finished = true;
        }
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(path = %self.connection.path(), "rolling back unfinished transaction");

        if let Err(err) = self.roll_back() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %err, "implicit rollback failed");
            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }
    }
}
