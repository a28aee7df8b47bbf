use crate::types::errors::MonetaryError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DECIMAL_PLACES: usize = 2;
const SCALE: i64 = 10i64.pow(DECIMAL_PLACES as u32);

/// Fixed-point currency amount with two decimal places.
///
/// Stored as an `i64` count of minor units, so arithmetic is exact and
/// overflow is detectable. On the JSON wire a whole amount serializes as an
/// integer and a fractional one as a float, which is what the dashboard and
/// the device firmware both expect.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub struct Monetary(i64);

impl Monetary {
    pub const ZERO: Monetary = Monetary(0);

    /// Builds an amount from whole currency units. `None` on overflow.
    pub fn from_units(units: i64) -> Option<Self> {
        units.checked_mul(SCALE).map(Monetary)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Whether the amount has no fractional part.
    pub fn is_whole(&self) -> bool {
        self.0 % SCALE == 0
    }

    pub fn checked_add(self, rhs: Monetary) -> Option<Monetary> {
        self.0.checked_add(rhs.0).map(Monetary)
    }

    pub fn from_f64(value: f64) -> Result<Self, MonetaryError> {
        if !value.is_finite() {
            return Err(MonetaryError::InvalidFormat("Value is not a finite number".to_string()));
        }

        let scaled = value * SCALE as f64;

        if (scaled - scaled.round()).abs() > 1e-6 {
            return Err(MonetaryError::InvalidFormat("Value has too many decimal places".to_string()));
        }

        if scaled.round() > i64::MAX as f64 || scaled.round() < i64::MIN as f64 {
            return Err(MonetaryError::Overflow);
        }

        Ok(Monetary(scaled.round() as i64))
    }
}

impl Display for Monetary {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let integer = abs / SCALE;
        let fraction = abs % SCALE;

        if fraction == 0 {
            write!(formatter, "{}{}", sign, integer)
        } else {
            write!(formatter, "{}{}.{:0width$}", sign, integer, fraction, width = DECIMAL_PLACES)
        }
    }
}

impl FromStr for Monetary {
    type Err = MonetaryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();

        if value.is_empty() {
            return Err(MonetaryError::InvalidFormat("Value is an empty string".to_string()));
        }

        let parts: Vec<&str> = value.split('.').collect();

        if parts.len() > 2 {
            return Err(MonetaryError::InvalidFormat("Value has more than one decimal point".to_string()));
        }

        let integer: i64 = parts[0].parse().map_err(|error| {
            MonetaryError::InvalidFormat(format!("Value has an invalid integer part: {:?}", error))
        })?;

        let fraction: i64 = if parts.len() == 2 {
            if parts[1].len() > DECIMAL_PLACES {
                return Err(MonetaryError::InvalidFormat("Value has too many decimal places".to_string()));
            }

            let padded = format!("{:0<width$}", parts[1], width = DECIMAL_PLACES);

            padded.parse().map_err(|error| {
                MonetaryError::InvalidFormat(format!("Value has an invalid fraction part: {:?}", error))
            })?
        } else {
            0
        };

        let is_negative = value.starts_with('-');
        let sign = if is_negative { -1 } else { 1 };
        let result = integer.checked_mul(SCALE)
            .and_then(|v| v.checked_add(sign * fraction))
            .ok_or(MonetaryError::Overflow)?;

        Ok(Monetary(result))
    }
}

impl Serialize for Monetary {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_whole() {
            serializer.serialize_i64(self.0 / SCALE)
        } else {
            serializer.serialize_f64(self.0 as f64 / SCALE as f64)
        }
    }
}

struct MonetaryVisitor;

impl Visitor<'_> for MonetaryVisitor {
    type Value = Monetary;

    fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("a monetary amount as a number or a decimal string")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Monetary::from_units(value).ok_or_else(|| de::Error::custom(MonetaryError::Overflow))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        i64::try_from(value).ok()
            .and_then(Monetary::from_units)
            .ok_or_else(|| de::Error::custom(MonetaryError::Overflow))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Monetary::from_f64(value).map_err(de::Error::custom)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Monetary::from_str(value).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Monetary {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(MonetaryVisitor)
    }
}
