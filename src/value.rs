use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, SqliteError};

/// SQL `NULL`, distinct from an absent value.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Null;

/// Storage class of a result cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "NULL",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        };
        f.write_str(name)
    }
}

/// Value read back from a result cell.
///
/// Every numeric width collapses to `i64` or `f64` on read. The strict
/// `get_*` accessors fail with [`SqliteError::TypeMismatch`] when the cell
/// holds another alternative; the `as_*` accessors coerce instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ResultValue {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl ResultValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Integer(_) => ValueType::Integer,
            Self::Real(_) => ValueType::Real,
            Self::Text(_) => ValueType::Text,
            Self::Blob(_) => ValueType::Blob,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Integer(_))
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Self::Real(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, Self::Blob(_))
    }

    pub fn get_integer(&self) -> Result<i64> {
        match self {
            Self::Integer(value) => Ok(*value),
            other => Err(mismatch(ValueType::Integer, other.value_type())),
        }
    }

    pub fn get_integer_mut(&mut self) -> Result<&mut i64> {
        let actual = self.value_type();
        match self {
            Self::Integer(value) => Ok(value),
            _ => Err(mismatch(ValueType::Integer, actual)),
        }
    }

    pub fn get_real(&self) -> Result<f64> {
        match self {
            Self::Real(value) => Ok(*value),
            other => Err(mismatch(ValueType::Real, other.value_type())),
        }
    }

    pub fn get_real_mut(&mut self) -> Result<&mut f64> {
        let actual = self.value_type();
        match self {
            Self::Real(value) => Ok(value),
            _ => Err(mismatch(ValueType::Real, actual)),
        }
    }

    pub fn get_text(&self) -> Result<&str> {
        match self {
            Self::Text(value) => Ok(value.as_str()),
            other => Err(mismatch(ValueType::Text, other.value_type())),
        }
    }

    pub fn get_text_mut(&mut self) -> Result<&mut String> {
        let actual = self.value_type();
        match self {
            Self::Text(value) => Ok(value),
            _ => Err(mismatch(ValueType::Text, actual)),
        }
    }

    pub fn get_blob(&self) -> Result<&[u8]> {
        match self {
            Self::Blob(value) => Ok(value.as_slice()),
            other => Err(mismatch(ValueType::Blob, other.value_type())),
        }
    }

    pub fn get_blob_mut(&mut self) -> Result<&mut Vec<u8>> {
        let actual = self.value_type();
        match self {
            Self::Blob(value) => Ok(value),
            _ => Err(mismatch(ValueType::Blob, actual)),
        }
    }

    /// Coerces the cell to a 64-bit signed integer.
    ///
    /// - `Null` is `0`.
    /// - `Real` truncates toward zero.
    /// - `Text` is parsed as a decimal or `0x` hexadecimal literal.
    /// - `Blob` of exactly 1, 2, 4 or 8 bytes is reinterpreted as a signed
    ///   integer of that width in native byte order.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Self::Null => Ok(0),
            Self::Integer(value) => Ok(*value),
            Self::Real(value) => Ok(*value as i64),
            Self::Text(value) => parse_integer_literal(value),
            Self::Blob(value) => blob_to_i64(value),
        }
    }

    pub fn as_i8(&self) -> Result<i8> {
        narrow(self.as_i64()?, "i8")
    }

    pub fn as_u8(&self) -> Result<u8> {
        narrow(self.as_i64()?, "u8")
    }

    pub fn as_i16(&self) -> Result<i16> {
        narrow(self.as_i64()?, "i16")
    }

    pub fn as_u16(&self) -> Result<u16> {
        narrow(self.as_i64()?, "u16")
    }

    pub fn as_i32(&self) -> Result<i32> {
        narrow(self.as_i64()?, "i32")
    }

    pub fn as_u32(&self) -> Result<u32> {
        narrow(self.as_i64()?, "u32")
    }

    pub fn as_u64(&self) -> Result<u64> {
        narrow(self.as_i64()?, "u64")
    }

    /// Coerces the cell to a 64-bit float.
    ///
    /// A `Blob` must be exactly 4 (`f32`) or 8 (`f64`) bytes long.
    pub fn as_real(&self) -> Result<f64> {
        match self {
            Self::Null => Ok(0.0),
            Self::Integer(value) => Ok(*value as f64),
            Self::Real(value) => Ok(*value),
            Self::Text(value) => parse_real_literal(value),
            Self::Blob(value) => blob_to_f64(value),
        }
    }

    /// Renders the cell as text. Blob bytes that are not UTF-8 are replaced
    /// with U+FFFD.
    pub fn as_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(value) => value.to_string(),
            Self::Real(value) => value.to_string(),
            Self::Text(value) => value.clone(),
            Self::Blob(value) => String::from_utf8_lossy(value).into_owned(),
        }
    }

    /// Returns the raw bytes of the cell; numbers use their native 8-byte
    /// encoding.
    pub fn as_blob(&self) -> Vec<u8> {
        match self {
            Self::Null => Vec::new(),
            Self::Integer(value) => value.to_ne_bytes().to_vec(),
            Self::Real(value) => value.to_ne_bytes().to_vec(),
            Self::Text(value) => value.as_bytes().to_vec(),
            Self::Blob(value) => value.clone(),
        }
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Blob(value) => write!(f, "<blob {} bytes>", value.len()),
        }
    }
}

impl From<Null> for ResultValue {
    fn from(_: Null) -> Self {
        Self::Null
    }
}

impl From<i64> for ResultValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ResultValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for ResultValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<f32> for ResultValue {
    fn from(value: f32) -> Self {
        Self::Real(value.into())
    }
}

impl From<String> for ResultValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ResultValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Vec<u8>> for ResultValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl From<&[u8]> for ResultValue {
    fn from(value: &[u8]) -> Self {
        Self::Blob(value.to_vec())
    }
}

fn mismatch(expected: ValueType, actual: ValueType) -> SqliteError {
    SqliteError::TypeMismatch { expected, actual }
}

fn narrow<T: TryFrom<i64>>(value: i64, target: &str) -> Result<T> {
    T::try_from(value).map_err(|_| SqliteError::Range(format!("{value} does not fit in {target}")))
}

fn blob_to_i64(blob: &[u8]) -> Result<i64> {
    match *blob {
        [b0] => Ok(i8::from_ne_bytes([b0]).into()),
        [b0, b1] => Ok(i16::from_ne_bytes([b0, b1]).into()),
        [b0, b1, b2, b3] => Ok(i32::from_ne_bytes([b0, b1, b2, b3]).into()),
        [b0, b1, b2, b3, b4, b5, b6, b7] => {
            Ok(i64::from_ne_bytes([b0, b1, b2, b3, b4, b5, b6, b7]))
        }
        _ => Err(SqliteError::Size {
            len: blob.len(),
            target: "integer",
        }),
    }
}

fn blob_to_f64(blob: &[u8]) -> Result<f64> {
    match *blob {
        [b0, b1, b2, b3] => Ok(f32::from_ne_bytes([b0, b1, b2, b3]).into()),
        [b0, b1, b2, b3, b4, b5, b6, b7] => {
            Ok(f64::from_ne_bytes([b0, b1, b2, b3, b4, b5, b6, b7]))
        }
        _ => Err(SqliteError::Size {
            len: blob.len(),
            target: "real",
        }),
    }
}

fn split_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else {
        (false, text.strip_prefix('+').unwrap_or(text))
    }
}

fn strip_hex_prefix(digits: &str) -> Option<&str> {
    digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
}

/// Parses an integer literal the way the engine spells them: optional sign,
/// then decimal digits or `0x` followed by at most 16 significant hex digits.
fn parse_integer_literal(text: &str) -> Result<i64> {
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace());
    let (negative, digits) = split_sign(trimmed);

    if let Some(hex) = strip_hex_prefix(digits) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SqliteError::Parse(format!(
                "'{text}' is not an integer literal"
            )));
        }
        let significant = hex.trim_start_matches('0');
        if significant.len() > 16 {
            return Err(SqliteError::Range(format!(
                "hex literal '{text}' exceeds 64 bits"
            )));
        }
        let bits = if significant.is_empty() {
            0
        } else {
            u64::from_str_radix(significant, 16)
                .map_err(|err| SqliteError::Parse(format!("'{text}': {err}")))?
        };
        // Hex literals denote the two's complement bit pattern.
        let value = i64::from_ne_bytes(bits.to_ne_bytes());
        return Ok(if negative { value.wrapping_neg() } else { value });
    }

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SqliteError::Parse(format!(
            "'{text}' is not an integer literal"
        )));
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| SqliteError::Range(format!("'{text}' does not fit in i64")))
}

fn parse_real_literal(text: &str) -> Result<f64> {
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace());
    let (_, digits) = split_sign(trimmed);
    if strip_hex_prefix(digits).is_some() {
        return parse_integer_literal(trimmed).map(|value| value as f64);
    }
    trimmed
        .parse::<f64>()
        .map_err(|err| SqliteError::Parse(format!("'{text}' is not a real literal: {err}")))
}

#[cfg(test)]
mod tests {
    use crate::{Null, ResultValue, SqliteError, ValueType};

    #[test]
    fn default_is_null() {
        let value = ResultValue::default();
        assert!(value.is_null());
        assert_eq!(value.value_type(), ValueType::Null);
        assert_eq!(ResultValue::from(Null), value);
        assert!(matches!(
            value.get_integer(),
            Err(SqliteError::TypeMismatch {
                expected: ValueType::Integer,
                actual: ValueType::Null
            })
        ));
        assert!(value.get_real().is_err());
        assert!(value.get_text().is_err());
        assert!(value.get_blob().is_err());
        assert_eq!(value.as_i64().expect("null coerces"), 0);
        assert_eq!(value.as_real().expect("null coerces"), 0.0);
        assert!(value.as_string().is_empty());
        assert!(value.as_blob().is_empty());
    }

    #[test]
    fn integer_coercions() {
        let value = ResultValue::from(0xFF_i64);
        assert!(value.is_integer());
        assert_eq!(value.get_integer().expect("holds integer"), 255);
        assert_eq!(value.as_real().expect("widen"), 255.0);
        assert_eq!(value.as_string(), "255");

        let blob = value.as_blob();
        assert_eq!(blob.len(), 8);
        assert_eq!(i64::from_ne_bytes(blob.try_into().expect("8 bytes")), 255);
    }

    #[test]
    fn real_truncates_toward_zero() {
        assert_eq!(ResultValue::Real(3.99).as_i64().expect("truncate"), 3);
        assert_eq!(ResultValue::Real(-3.99).as_i64().expect("truncate"), -3);

        let value = ResultValue::from(3.14_f32);
        assert!(value.get_integer().is_err());
        assert!(value.as_string().starts_with("3.14"));
        assert_eq!(value.as_blob().len(), 8);
    }

    #[test]
    fn text_parses_decimal_and_hex() {
        assert_eq!(ResultValue::from("258").as_i64().expect("decimal"), 258);
        assert_eq!(ResultValue::from("0x0102").as_i64().expect("hex"), 258);
        assert_eq!(ResultValue::from(" -0x10 ").as_i64().expect("hex"), -16);
        assert_eq!(
            ResultValue::from("0xFFFFFFFFFFFFFFFF").as_i64().expect("hex"),
            -1
        );
        assert_eq!(ResultValue::from("0x0102").as_real().expect("hex"), 258.0);
        assert_eq!(ResultValue::from("2.5e1").as_real().expect("float"), 25.0);

        let blob = ResultValue::from("0x0102").as_blob();
        assert_eq!(blob, b"0x0102".to_vec());
    }

    #[test]
    fn unparsable_text_fails() {
        for text in ["", "hello", "12abc", "0x", "0xZZ"] {
            let value = ResultValue::from(text);
            assert!(
                matches!(value.as_i64(), Err(SqliteError::Parse(_))),
                "{text:?} must not parse as integer"
            );
        }
        assert!(matches!(
            ResultValue::from("hello").as_real(),
            Err(SqliteError::Parse(_))
        ));
        assert!(matches!(
            ResultValue::from("99999999999999999999").as_i64(),
            Err(SqliteError::Range(_))
        ));
        assert!(matches!(
            ResultValue::from("0x1FFFFFFFFFFFFFFFF").as_i64(),
            Err(SqliteError::Range(_))
        ));
    }

    #[test]
    fn display_renders_each_kind() {
        assert_eq!(ResultValue::Null.to_string(), "NULL");
        assert_eq!(ResultValue::Integer(-42).to_string(), "-42");
        assert_eq!(ResultValue::Real(2.5).to_string(), "2.5");
        assert_eq!(ResultValue::from("kit").to_string(), "kit");
        assert_eq!(ResultValue::from(vec![1_u8, 2, 3]).to_string(), "<blob 3 bytes>");
    }

    #[test]
    fn blob_reinterprets_native_widths() {
        let value = ResultValue::from(vec![0x01_u8, 0x02, 0x03, 0x04]);
        let expected = i32::from_ne_bytes([0x01, 0x02, 0x03, 0x04]);
        assert_eq!(value.as_i64().expect("4 bytes"), i64::from(expected));
        let expected = f32::from_ne_bytes([0x01, 0x02, 0x03, 0x04]);
        assert_eq!(value.as_real().expect("4 bytes"), f64::from(expected));
        assert_eq!(value.as_string(), "\u{1}\u{2}\u{3}\u{4}");

        assert_eq!(ResultValue::from(vec![0xFF_u8]).as_i64().expect("1 byte"), -1);
        assert!(matches!(
            ResultValue::from(vec![0_u8; 2]).as_real(),
            Err(SqliteError::Size { len: 2, .. })
        ));
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn blob_reinterprets_little_endian() {
        let value = ResultValue::from(vec![0x01_u8, 0x02, 0x03, 0x04]);
        assert_eq!(value.as_i64().expect("4 bytes"), 67_305_985);
    }

    #[test]
    fn odd_blob_lengths_fail() {
        for len in [0_usize, 3, 5, 9] {
            let value = ResultValue::Blob(vec![0; len]);
            assert!(matches!(value.as_i64(), Err(SqliteError::Size { .. })));
            assert!(matches!(value.as_real(), Err(SqliteError::Size { .. })));
        }
    }

    #[test]
    fn narrowing_is_checked() {
        let value = ResultValue::from(300_i64);
        assert_eq!(value.as_i16().expect("fits"), 300);
        assert_eq!(value.as_u32().expect("fits"), 300);
        assert!(matches!(value.as_i8(), Err(SqliteError::Range(_))));
        assert!(matches!(value.as_u8(), Err(SqliteError::Range(_))));
        assert!(matches!(
            ResultValue::from(-1_i64).as_u64(),
            Err(SqliteError::Range(_))
        ));
        assert_eq!(ResultValue::from("-128").as_i8().expect("fits"), -128);
    }

    #[test]
    fn mutable_getters_edit_in_place() {
        let mut value = ResultValue::from("abc");
        value.get_text_mut().expect("text").push('d');
        assert_eq!(value.get_text().expect("text"), "abcd");
        assert!(value.get_integer_mut().is_err());

        let mut value = ResultValue::from(vec![1_u8]);
        value.get_blob_mut().expect("blob").push(2);
        assert_eq!(value.get_blob().expect("blob"), &[1, 2]);
    }
}
