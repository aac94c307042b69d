use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ResultValue;

/// One row keyed by column position.
pub type ResultVector = Vec<ResultValue>;

/// One row keyed by column name. Duplicate names keep the last column.
pub type ResultMap = HashMap<String, ResultValue>;

/// Result column metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Col {
    pub name: String,
    /// Declared type from the table schema, absent for expressions.
    pub decltype: Option<String>,
}
