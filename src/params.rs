use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Null, ValueType};

/// Value supplied for a statement placeholder.
///
/// Every Rust primitive of the closed set keeps its own alternative so the
/// statement's parameter mirror reports exactly what was bound.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    #[default]
    Null,
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl ParamValue {
    pub fn null() -> Self {
        Self::Null
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn blob(value: impl Into<Vec<u8>>) -> Self {
        Self::Blob(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Storage class the engine records for this value once bound.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::I8(_)
            | Self::U8(_)
            | Self::I16(_)
            | Self::U16(_)
            | Self::I32(_)
            | Self::U32(_)
            | Self::I64(_)
            | Self::U64(_) => ValueType::Integer,
            Self::F32(_) | Self::F64(_) => ValueType::Real,
            Self::Text(_) => ValueType::Text,
            Self::Blob(_) => ValueType::Blob,
        }
    }
}

macro_rules! param_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

param_from! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Text,
    Vec<u8> => Blob,
}

impl From<Null> for ParamValue {
    fn from(_: Null) -> Self {
        Self::Null
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<&[u8]> for ParamValue {
    fn from(value: &[u8]) -> Self {
        Self::Blob(value.to_vec())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Parameter container for batch binding.
#[derive(Clone, Debug, PartialEq)]
pub enum Params {
    /// Values mapped to placeholders 1..=N in order.
    Positional(Vec<ParamValue>),
    /// Values mapped to placeholders by name.
    Named(Vec<(String, ParamValue)>),
}

impl Params {
    /// Builds positional parameters.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Builds named parameters.
    ///
    /// Names can be provided with or without prefix (`:`, `@`, `$`).
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Self::Named(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<Vec<ParamValue>> for Params {
    fn from(values: Vec<ParamValue>) -> Self {
        Self::Positional(values)
    }
}

impl<const N: usize> From<[ParamValue; N]> for Params {
    fn from(values: [ParamValue; N]) -> Self {
        Self::Positional(values.into())
    }
}

impl From<Vec<(String, ParamValue)>> for Params {
    fn from(values: Vec<(String, ParamValue)>) -> Self {
        Self::Named(values)
    }
}

impl<const N: usize> From<[(&str, ParamValue); N]> for Params {
    fn from(values: [(&str, ParamValue); N]) -> Self {
        Self::named(values)
    }
}

impl From<HashMap<String, ParamValue>> for Params {
    fn from(values: HashMap<String, ParamValue>) -> Self {
        Self::Named(values.into_iter().collect())
    }
}
