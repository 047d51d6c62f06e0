//! Canonical exact-integer arithmetic for order amounts.
//!
//! Every monetary or ordinal quantity in the system (item amounts, token
//! identifiers, timestamps, salts) is a [`Uint`]: an exact non-negative
//! 256-bit integer whose wire form is a decimal string. Loosely-typed inputs
//! (JSON integers, decimal or 0x-hex strings, wrapped big-integer objects)
//! are funneled through [`Uint::canonicalize`]; anything that is not a
//! non-negative integer is rejected with [`MalformedNumber`]. Floating point
//! never enters the picture.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::common::U256;

/// Decimals of the chain's native currency.
pub const NATIVE_DECIMALS: u32 = 18;

/// Maximum number of significant decimal digits in a 256-bit integer.
const MAX_DECIMAL_DIGITS: usize = 78;

/// Maximum number of significant hex digits in a 256-bit integer.
const MAX_HEX_DIGITS: usize = 64;

/// Errors produced when an input cannot be read as an exact non-negative
/// integer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedNumber {
	/// The input is not a non-negative integer (negative, fractional, or
	/// not numeric at all).
	#[error("value is not a non-negative integer: {0}")]
	NotInteger(String),
	/// The input is an integer but does not fit in 256 bits.
	#[error("value exceeds 256 bits: {0}")]
	Overflow(String),
	/// The input has more fractional digits than the native currency
	/// supports.
	#[error("value has more than {NATIVE_DECIMALS} fractional digits: {0}")]
	TooPrecise(String),
	/// The input's JSON shape is not one of the recognized numeric forms.
	#[error("unsupported numeric shape: {0}")]
	UnsupportedShape(String),
}

/// Exact non-negative integer with a canonical decimal-string wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Uint(pub U256);

/// Token identifier within the collection contract.
pub type TokenId = Uint;

impl Uint {
	pub const ZERO: Uint = Uint(U256::ZERO);

	/// Interprets a loosely-typed JSON value as a canonical integer.
	///
	/// Accepted shapes: non-negative JSON integers, decimal strings,
	/// `0x`-prefixed hex strings, and wrapped big-integer objects carrying a
	/// `hex` or `_hex` field.
	pub fn canonicalize(value: &Value) -> Result<Uint, MalformedNumber> {
		match value {
			Value::Number(n) => match n.as_u64() {
				Some(v) => Ok(Uint::from(v)),
				None => Err(MalformedNumber::NotInteger(n.to_string())),
			},
			Value::String(s) => s.parse(),
			Value::Object(map) => match map.get("hex").or_else(|| map.get("_hex")) {
				Some(Value::String(s)) => s.parse(),
				_ => Err(MalformedNumber::UnsupportedShape(value.to_string())),
			},
			other => Err(MalformedNumber::UnsupportedShape(other.to_string())),
		}
	}

	/// Converts a native-currency amount in whole units ("1.5") to its
	/// smallest-denomination integer, exactly.
	pub fn from_native(amount: &Decimal) -> Result<Uint, MalformedNumber> {
		if amount.is_sign_negative() {
			return Err(MalformedNumber::NotInteger(amount.to_string()));
		}
		let normalized = amount.normalize();
		let scale = normalized.scale();
		if scale > NATIVE_DECIMALS {
			return Err(MalformedNumber::TooPrecise(amount.to_string()));
		}
		let mantissa = U256::from(normalized.mantissa().unsigned_abs());
		let factor = U256::from(10u64).pow(U256::from(NATIVE_DECIMALS - scale));
		mantissa
			.checked_mul(factor)
			.map(Uint)
			.ok_or_else(|| MalformedNumber::Overflow(amount.to_string()))
	}

	/// Renders this amount in whole native-currency units, trimming
	/// trailing fractional zeros. Pure string arithmetic.
	pub fn format_native(&self) -> String {
		let digits = self.0.to_string();
		let decimals = NATIVE_DECIMALS as usize;
		if digits.len() <= decimals {
			let mut fraction = "0".repeat(decimals - digits.len());
			fraction.push_str(&digits);
			let trimmed = fraction.trim_end_matches('0');
			if trimmed.is_empty() {
				"0".to_string()
			} else {
				format!("0.{trimmed}")
			}
		} else {
			let (whole, fraction) = digits.split_at(digits.len() - decimals);
			let trimmed = fraction.trim_end_matches('0');
			if trimmed.is_empty() {
				whole.to_string()
			} else {
				format!("{whole}.{trimmed}")
			}
		}
	}

	pub fn is_zero(&self) -> bool {
		self.0.is_zero()
	}

	pub fn checked_add(&self, rhs: &Uint) -> Option<Uint> {
		self.0.checked_add(rhs.0).map(Uint)
	}
}

impl fmt::Display for Uint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<u64> for Uint {
	fn from(value: u64) -> Self {
		Uint(U256::from(value))
	}
}

impl From<U256> for Uint {
	fn from(value: U256) -> Self {
		Uint(value)
	}
}

impl From<Uint> for U256 {
	fn from(value: Uint) -> Self {
		value.0
	}
}

impl FromStr for Uint {
	type Err = MalformedNumber;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		if let Some(hex) = trimmed
			.strip_prefix("0x")
			.or_else(|| trimmed.strip_prefix("0X"))
		{
			if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
				return Err(MalformedNumber::NotInteger(s.to_string()));
			}
			if hex.trim_start_matches('0').len() > MAX_HEX_DIGITS {
				return Err(MalformedNumber::Overflow(s.to_string()));
			}
			U256::from_str_radix(hex, 16)
				.map(Uint)
				.map_err(|_| MalformedNumber::NotInteger(s.to_string()))
		} else {
			if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
				return Err(MalformedNumber::NotInteger(s.to_string()));
			}
			let significant = trimmed.trim_start_matches('0');
			if significant.len() > MAX_DECIMAL_DIGITS {
				return Err(MalformedNumber::Overflow(s.to_string()));
			}
			U256::from_str_radix(trimmed, 10)
				.map(Uint)
				.map_err(|_| MalformedNumber::Overflow(s.to_string()))
		}
	}
}

impl Serialize for Uint {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.0.to_string())
	}
}

impl<'de> Deserialize<'de> for Uint {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		struct UintVisitor;

		impl de::Visitor<'_> for UintVisitor {
			type Value = Uint;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a non-negative integer as a decimal string")
			}

			fn visit_str<E: de::Error>(self, v: &str) -> Result<Uint, E> {
				v.parse().map_err(E::custom)
			}

			fn visit_u64<E: de::Error>(self, v: u64) -> Result<Uint, E> {
				Ok(Uint::from(v))
			}
		}

		deserializer.deserialize_any(UintVisitor)
	}
}
