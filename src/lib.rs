//! `sqlite3-access` is a typed, resource-safe access layer over embedded SQLite.
//!
//! The crate covers:
//! - [`Connection`]: a shared handle to an open database
//! - [`Transaction`]: a guard that rolls back unless committed
//! - [`Statement`]: prepared statements with bind, execute and fetch
//! - [`ParamValue`] / [`ResultValue`]: values going in and coming out, with
//!   coercions between storage classes
//!
//! ```
//! use sqlite3_access::{Connection, ParamValue};
//!
//! # fn main() -> sqlite3_access::Result<()> {
//! let db = Connection::new()?;
//! db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")?;
//!
//! let mut insert = db.prepare("INSERT INTO users (name) VALUES (?)")?;
//! insert.bind(1, "Kit")?.execute()?;
//!
//! let mut query = db.prepare("SELECT id, name FROM users WHERE name = :name")?;
//! query.bind_named(":name", ParamValue::text("Kit"))?.execute()?;
//! let rows = query.fetch_all_map()?;
//! assert_eq!(rows[0]["name"].get_text()?, "Kit");
//! # Ok(())
//! # }
//! ```

mod connection;
mod decode;
mod error;
mod options;
mod params;
mod raw;
mod statement;
mod transaction;
mod types;
mod value;

pub use connection::Connection;
pub use error::SqliteError;
pub use options::{ConnectionOptions, OpenFlags};
pub use params::{ParamValue, Params};
pub use statement::Statement;
pub use transaction::Transaction;
pub use types::{Col, ResultMap, ResultVector};
pub use value::{Null, ResultValue, ValueType};

pub type Result<T> = std::result::Result<T, SqliteError>;
