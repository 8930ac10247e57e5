//! Loosely-typed numeric input and the validated types built from it.
//!
//! Callers send product identifiers and quantities as JSON numbers, numeric
//! strings (path segments, form-ish clients), or not at all. [`NumericInput`]
//! captures whatever arrived; [`ProductId::parse`], [`Quantity::parse`], and
//! [`QuantityChange::parse`] turn it into something the cart can trust.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Errors that can occur when validating caller-supplied numbers.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// The product identifier is missing, non-numeric, or not positive.
    #[error("productId must be a positive integer")]
    InvalidProductId,
    /// The quantity is missing, non-numeric, or not positive.
    #[error("quantity must be a positive integer")]
    InvalidQuantity,
    /// The quantity is missing or not an integer.
    #[error("quantity must be an integer")]
    QuantityNotInteger,
    /// Adding the quantity would push the line past the largest storable value.
    #[error("quantity is too large")]
    QuantityTooLarge,
}

/// A number as received from a caller, before validation.
///
/// Deserializes from a JSON integer, a JSON float, a string, or `null`.
/// Any other JSON shape fails deserialization.
///
/// ## Examples
///
/// ```
/// use shopping_cart_core::NumericInput;
///
/// assert_eq!(NumericInput::from(5).to_integer(), Some(5));
/// assert_eq!(NumericInput::from(" 12 ").to_integer(), Some(12));
/// assert_eq!(NumericInput::from(3.0).to_integer(), Some(3));
/// assert_eq!(NumericInput::from(2.5).to_integer(), None);
/// assert_eq!(NumericInput::from("abc").to_integer(), None);
/// assert_eq!(NumericInput::Missing.to_integer(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    /// A JSON integer.
    Integer(i64),
    /// A JSON number with a fractional part or outside the `i64` range.
    Float(f64),
    /// A string that may or may not contain a number.
    Text(String),
    /// `null` or an absent field.
    #[default]
    Missing,
}

impl NumericInput {
    /// Coerce to an integer, if the input denotes one exactly.
    ///
    /// Strings are trimmed first. Floats must be finite and integral.
    #[must_use]
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Float(f) => integral_float(*f),
            Self::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral_float))
            }
            Self::Missing => None,
        }
    }

    /// Whether the input is a finite number below zero, of any magnitude.
    fn is_negative(&self) -> bool {
        let f = match self {
            Self::Integer(n) => return *n < 0,
            Self::Float(f) => *f,
            Self::Text(s) => match s.trim().parse::<f64>() {
                Ok(f) => f,
                Err(_) => return false,
            },
            Self::Missing => return false,
        };
        f.is_finite() && f < 0.0
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)] // range checked before the cast
fn integral_float(f: f64) -> Option<i64> {
    if !f.is_finite() || f.fract() != 0.0 {
        return None;
    }
    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return None;
    }
    Some(f as i64)
}

impl fmt::Display for NumericInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Missing => f.write_str("null"),
        }
    }
}

impl From<i64> for NumericInput {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for NumericInput {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for NumericInput {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for NumericInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for NumericInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<ProductId> for NumericInput {
    fn from(id: ProductId) -> Self {
        Self::Integer(id.as_i64())
    }
}

impl<T: Into<Self>> From<Option<T>> for NumericInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

impl ProductId {
    /// Validate a caller-supplied product identifier.
    ///
    /// # Errors
    ///
    /// Returns `InputError::InvalidProductId` unless the input is a positive integer.
    pub fn parse(input: &NumericInput) -> Result<Self, InputError> {
        match input.to_integer() {
            Some(id) if id > 0 => Ok(Self::new(id)),
            _ => Err(InputError::InvalidProductId),
        }
    }
}

/// A strictly positive line-item quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    /// Create a quantity, returning `None` unless `n > 0`.
    #[must_use]
    pub const fn new(n: i64) -> Option<Self> {
        if n > 0 { Some(Self(n)) } else { None }
    }

    /// Validate a caller-supplied quantity.
    ///
    /// # Errors
    ///
    /// Returns `InputError::InvalidQuantity` unless the input is a positive integer.
    pub fn parse(input: &NumericInput) -> Result<Self, InputError> {
        input
            .to_integer()
            .and_then(Self::new)
            .ok_or(InputError::InvalidQuantity)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an update request asks for: a replacement quantity, or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// Replace the line's quantity.
    Set(Quantity),
    /// The requested quantity was zero or negative.
    Remove,
}

impl QuantityChange {
    /// Validate the quantity of an update request.
    ///
    /// Zero and negative integers are accepted and mean removal. So is any
    /// other finite negative number, including ones beyond the `i64` range.
    ///
    /// # Errors
    ///
    /// Returns `InputError::QuantityNotInteger` if the input is not an integer.
    pub fn parse(input: &NumericInput) -> Result<Self, InputError> {
        match input.to_integer() {
            Some(n) => Ok(Quantity::new(n).map_or(Self::Remove, Self::Set)),
            None if input.is_negative() => Ok(Self::Remove),
            None => Err(InputError::QuantityNotInteger),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_integer_from_text() {
        assert_eq!(NumericInput::from("42").to_integer(), Some(42));
        assert_eq!(NumericInput::from("  -3 ").to_integer(), Some(-3));
        assert_eq!(NumericInput::from("4.0").to_integer(), Some(4));
        assert_eq!(NumericInput::from("").to_integer(), None);
        assert_eq!(NumericInput::from("   ").to_integer(), None);
        assert_eq!(NumericInput::from("12abc").to_integer(), None);
        assert_eq!(NumericInput::from("NaN").to_integer(), None);
        assert_eq!(NumericInput::from("inf").to_integer(), None);
    }

    #[test]
    fn test_to_integer_from_float() {
        assert_eq!(NumericInput::from(7.0).to_integer(), Some(7));
        assert_eq!(NumericInput::from(7.5).to_integer(), None);
        assert_eq!(NumericInput::from(f64::NAN).to_integer(), None);
        assert_eq!(NumericInput::from(1e300).to_integer(), None);
    }

    #[test]
    fn test_deserialize_shapes() {
        let n: NumericInput = serde_json::from_str("5").unwrap();
        assert_eq!(n, NumericInput::Integer(5));

        let f: NumericInput = serde_json::from_str("2.5").unwrap();
        assert_eq!(f, NumericInput::Float(2.5));

        let s: NumericInput = serde_json::from_str("\"300\"").unwrap();
        assert_eq!(s, NumericInput::Text("300".to_string()));

        let null: NumericInput = serde_json::from_str("null").unwrap();
        assert_eq!(null, NumericInput::Missing);

        assert!(serde_json::from_str::<NumericInput>("true").is_err());
        assert!(serde_json::from_str::<NumericInput>("{}").is_err());
    }

    #[test]
    fn test_product_id_parse() {
        assert_eq!(
            ProductId::parse(&NumericInput::from(101)),
            Ok(ProductId::new(101))
        );
        assert_eq!(
            ProductId::parse(&NumericInput::from("101")),
            Ok(ProductId::new(101))
        );
        assert_eq!(
            ProductId::parse(&NumericInput::from(0)),
            Err(InputError::InvalidProductId)
        );
        assert_eq!(
            ProductId::parse(&NumericInput::from(-4)),
            Err(InputError::InvalidProductId)
        );
        assert_eq!(
            ProductId::parse(&NumericInput::from("abc")),
            Err(InputError::InvalidProductId)
        );
        assert_eq!(
            ProductId::parse(&NumericInput::Missing),
            Err(InputError::InvalidProductId)
        );
    }

    #[test]
    fn test_quantity_parse() {
        assert_eq!(Quantity::parse(&NumericInput::from(3)).unwrap().get(), 3);
        assert_eq!(
            Quantity::parse(&NumericInput::from(0)),
            Err(InputError::InvalidQuantity)
        );
        assert_eq!(
            Quantity::parse(&NumericInput::from(-1)),
            Err(InputError::InvalidQuantity)
        );
        assert_eq!(
            Quantity::parse(&NumericInput::from(1.5)),
            Err(InputError::InvalidQuantity)
        );
    }

    #[test]
    fn test_quantity_change_parse() {
        assert_eq!(
            QuantityChange::parse(&NumericInput::from(5)),
            Ok(QuantityChange::Set(Quantity::new(5).unwrap()))
        );
        assert_eq!(
            QuantityChange::parse(&NumericInput::from(0)),
            Ok(QuantityChange::Remove)
        );
        assert_eq!(
            QuantityChange::parse(&NumericInput::from("-2")),
            Ok(QuantityChange::Remove)
        );
        assert_eq!(
            QuantityChange::parse(&NumericInput::from("many")),
            Err(InputError::QuantityNotInteger)
        );
        assert_eq!(
            QuantityChange::parse(&NumericInput::Missing),
            Err(InputError::QuantityNotInteger)
        );
    }

    #[test]
    fn test_quantity_change_huge_negative_removes() {
        assert_eq!(
            QuantityChange::parse(&NumericInput::from("-1e20")),
            Ok(QuantityChange::Remove)
        );
        assert_eq!(
            QuantityChange::parse(&NumericInput::from(-1e20)),
            Ok(QuantityChange::Remove)
        );
        assert_eq!(
            QuantityChange::parse(&NumericInput::from(" -99999999999999999999 ")),
            Ok(QuantityChange::Remove)
        );
        let literal: NumericInput = serde_json::from_str("-100000000000000000000").unwrap();
        assert_eq!(QuantityChange::parse(&literal), Ok(QuantityChange::Remove));
        // still not integers
        assert_eq!(
            QuantityChange::parse(&NumericInput::from(1e20)),
            Err(InputError::QuantityNotInteger)
        );
        assert_eq!(
            QuantityChange::parse(&NumericInput::from("-inf")),
            Err(InputError::QuantityNotInteger)
        );
        assert_eq!(
            QuantityChange::parse(&NumericInput::from("NaN")),
            Err(InputError::QuantityNotInteger)
        );
        assert_eq!(
            QuantityChange::parse(&NumericInput::from("abc")),
            Err(InputError::QuantityNotInteger)
        );
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(NumericInput::from(None::<i64>), NumericInput::Missing);
        assert_eq!(NumericInput::from(Some(9)), NumericInput::Integer(9));
    }
}
