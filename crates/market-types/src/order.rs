//! Canonical order types for the marketplace.
//!
//! An order is a signed, off-chain exchange intent in the settlement
//! protocol's shape: an offer side, a consideration side, a validity window,
//! and bookkeeping fields. Item and order kinds are tagged enumerations that
//! keep the protocol's integer codes on the wire; unknown codes never enter
//! the canonical model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::Uint;
use crate::common::{Address, Bytes, Bytes32, U256};

/// Deterministic digest identifying an order, produced by the settlement
/// protocol's own hash function.
pub type Fingerprint = Bytes32;

/// Raised when an integer code does not name a known item or order kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {label} code: {code}")]
pub struct UnknownKind {
	pub label: &'static str,
	pub code: u8,
}

/// Kind of asset an order item refers to, with the settlement protocol's
/// integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ItemKind {
	/// The chain's native currency.
	Native = 0,
	/// A fungible token amount.
	Erc20 = 1,
	/// An exact non-fungible token.
	Erc721 = 2,
	/// A non-fungible token selected against a criteria root.
	Erc721Criteria = 4,
}

impl ItemKind {
	pub fn is_native(&self) -> bool {
		matches!(self, ItemKind::Native)
	}
}

impl From<ItemKind> for u8 {
	fn from(kind: ItemKind) -> Self {
		kind as u8
	}
}

impl TryFrom<u8> for ItemKind {
	type Error = UnknownKind;

	fn try_from(code: u8) -> Result<Self, Self::Error> {
		match code {
			0 => Ok(ItemKind::Native),
			1 => Ok(ItemKind::Erc20),
			2 => Ok(ItemKind::Erc721),
			4 => Ok(ItemKind::Erc721Criteria),
			code => Err(UnknownKind {
				label: "item kind",
				code,
			}),
		}
	}
}

/// Execution restriction class of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OrderKind {
	/// Anyone may fulfill, full fills only.
	FullOpen = 0,
	/// Anyone may fulfill, partial fills allowed.
	PartialOpen = 1,
	/// Zone-restricted, full fills only.
	FullRestricted = 2,
	/// Zone-restricted, partial fills allowed.
	PartialRestricted = 3,
}

impl From<OrderKind> for u8 {
	fn from(kind: OrderKind) -> Self {
		kind as u8
	}
}

impl TryFrom<u8> for OrderKind {
	type Error = UnknownKind;

	fn try_from(code: u8) -> Result<Self, Self::Error> {
		match code {
			0 => Ok(OrderKind::FullOpen),
			1 => Ok(OrderKind::PartialOpen),
			2 => Ok(OrderKind::FullRestricted),
			3 => Ok(OrderKind::PartialRestricted),
			code => Err(UnknownKind {
				label: "order kind",
				code,
			}),
		}
	}
}

/// One line of an order's offer side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferItem {
	#[serde(rename = "itemKind")]
	pub kind: ItemKind,
	/// Token contract, or the zero address for native currency.
	pub token: Address,
	pub identifier_or_criteria: Uint,
	pub start_amount: Uint,
	pub end_amount: Uint,
}

/// One line of an order's consideration side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsiderationItem {
	#[serde(rename = "itemKind")]
	pub kind: ItemKind,
	pub token: Address,
	pub identifier_or_criteria: Uint,
	pub start_amount: Uint,
	pub end_amount: Uint,
	/// Destination of this item at settlement.
	pub recipient: Address,
}

/// The signed fields of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderParameters {
	pub offerer: Address,
	/// Restriction zone; the zero address when unrestricted.
	pub zone: Address,
	pub offer: Vec<OfferItem>,
	pub consideration: Vec<ConsiderationItem>,
	pub order_type: OrderKind,
	/// Start of the validity window, unix seconds.
	pub start_time: Uint,
	/// End of the validity window, unix seconds.
	pub end_time: Uint,
	pub zone_hash: Bytes32,
	/// Uniqueness nonce.
	pub salt: Uint,
	pub conduit_key: Bytes32,
	/// Consideration length at signing time, kept for fee bookkeeping even
	/// when later fee items are appended.
	pub total_original_consideration_items: u64,
}

/// A canonical order together with the offerer's signature.
///
/// The signature is opaque to this system: it is carried and forwarded,
/// never inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOrder {
	pub parameters: OrderParameters,
	pub signature: Bytes,
}

/// One item of an order under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
	pub kind: ItemKind,
	pub token: Address,
	pub identifier: Uint,
	pub amount: Uint,
	/// Required on consideration items, ignored on offer items.
	pub recipient: Option<Address>,
}

/// Blueprint handed to the executor's order-creation capability.
///
/// The executor supplies offerer, salt handling at the protocol level, and
/// any protocol fee items; this struct carries only what the seller decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderInput {
	pub offer: Vec<InputItem>,
	pub consideration: Vec<InputItem>,
	pub start_time: Uint,
	pub end_time: Uint,
	pub salt: Uint,
}

/// Prepared fulfillment call produced by the executor.
///
/// The suggested value is advisory only; settlement always recomputes the
/// amount owed from the order itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentDraft {
	pub to: Address,
	pub data: Bytes,
	pub suggested_value: U256,
}
