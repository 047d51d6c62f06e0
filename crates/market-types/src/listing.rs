//! Persisted listing state for a single token.
//!
//! The store owns one [`ListingRecord`] per token id. The record mirrors
//! market state off-chain: while listed it carries the signed order and its
//! fingerprint; after a sale those are cleared and only the buyer and the
//! on-chain flag remain. The `order` field stays raw JSON on purpose: store
//! contents are external input and are re-normalized before every use.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::amount::TokenId;
use crate::common::Address;
use crate::order::Fingerprint;

/// Lifecycle states of a token in the market.
///
/// Only `Unlisted`, `Listed`, and `Sold` are ever derivable from a persisted
/// record; `PendingSettlement` and `Failed` exist within a running purchase
/// and are reported through events, never written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingState {
	Unlisted,
	Listed,
	PendingSettlement,
	Sold,
	Failed,
}

impl fmt::Display for ListingState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			ListingState::Unlisted => "unlisted",
			ListingState::Listed => "listed",
			ListingState::PendingSettlement => "pending-settlement",
			ListingState::Sold => "sold",
			ListingState::Failed => "failed",
		};
		f.write_str(label)
	}
}

/// Persisted mirror of a single token's market state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
	pub token_id: TokenId,
	/// Token metadata mirrored into the record; survives listing cycles.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,
	#[serde(default)]
	pub seller_address: Option<Address>,
	/// Asking price in whole native units.
	#[serde(default)]
	pub price: Option<Decimal>,
	/// The signed order as stored, non-null iff the token is listed.
	#[serde(default)]
	pub order: Option<Value>,
	#[serde(default)]
	pub order_fingerprint: Option<Fingerprint>,
	#[serde(default)]
	pub buyer_address: Option<Address>,
	#[serde(default)]
	pub on_chain: bool,
	pub updated_at: DateTime<Utc>,
}

impl ListingRecord {
	/// An empty, never-listed record for the given token.
	pub fn blank(token_id: TokenId, now: DateTime<Utc>) -> Self {
		Self {
			token_id,
			name: None,
			image: None,
			seller_address: None,
			price: None,
			order: None,
			order_fingerprint: None,
			buyer_address: None,
			on_chain: false,
			updated_at: now,
		}
	}

	/// State derivable from persisted fields alone.
	pub fn state(&self) -> ListingState {
		if self.order.is_some() {
			ListingState::Listed
		} else if self.on_chain && self.buyer_address.is_some() {
			ListingState::Sold
		} else {
			ListingState::Unlisted
		}
	}

	pub fn is_listed(&self) -> bool {
		self.state() == ListingState::Listed
	}

	/// Applies a listing upsert: sets seller, price, order, and fingerprint,
	/// clears any previous buyer and on-chain flag.
	pub fn apply_listing(&mut self, listing: &NewListing, now: DateTime<Utc>) {
		self.seller_address = Some(listing.seller_address);
		self.price = Some(listing.price);
		self.order = Some(listing.order.clone());
		self.order_fingerprint = Some(listing.fingerprint);
		self.buyer_address = None;
		self.on_chain = false;
		self.updated_at = now;
	}

	/// Applies a completed sale: clears the listing, records the buyer, and
	/// marks the token on-chain.
	pub fn apply_sale(&mut self, sale: &SaleReport, now: DateTime<Utc>) {
		self.order = None;
		self.order_fingerprint = None;
		self.price = None;
		self.buyer_address = Some(sale.buyer_address);
		self.on_chain = true;
		self.updated_at = now;
	}
}

/// Upsert payload for a new or re-priced listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
	pub token_id: TokenId,
	pub price: Decimal,
	pub seller_address: Address,
	pub order: Value,
	pub fingerprint: Fingerprint,
}

/// Report of a settled purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReport {
	pub token_id: TokenId,
	/// Fingerprint of the order that was fulfilled, for audit trails.
	pub fingerprint: Fingerprint,
	pub buyer_address: Address,
	/// Price the sale settled at, in whole native units.
	#[serde(default)]
	pub price: Option<Decimal>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::amount::Uint;
	use crate::common::Bytes32;

	fn sample_listing() -> NewListing {
		NewListing {
			token_id: Uint::from(42),
			price: "1.5".parse().unwrap(),
			seller_address: Address::repeat_byte(0x11),
			order: serde_json::json!({ "parameters": {}, "signature": "0x" }),
			fingerprint: Bytes32::repeat_byte(0xab),
		}
	}

	#[test]
	fn test_state_derivation() {
		let now = Utc::now();
		let mut record = ListingRecord::blank(Uint::from(42), now);
		assert_eq!(record.state(), ListingState::Unlisted);

		record.apply_listing(&sample_listing(), now);
		assert_eq!(record.state(), ListingState::Listed);
		assert_eq!(record.price.unwrap().to_string(), "1.5");
		assert!(record.order_fingerprint.is_some());

		let sale = SaleReport {
			token_id: Uint::from(42),
			fingerprint: Bytes32::repeat_byte(0xab),
			buyer_address: Address::repeat_byte(0x22),
			price: record.price,
		};
		record.apply_sale(&sale, now);
		assert_eq!(record.state(), ListingState::Sold);
		assert!(record.order.is_none());
		assert!(record.order_fingerprint.is_none());
		assert!(record.price.is_none());
		assert!(record.on_chain);
		assert_eq!(record.buyer_address, Some(Address::repeat_byte(0x22)));
	}

	#[test]
	fn test_listing_clears_previous_buyer() {
		let now = Utc::now();
		let mut record = ListingRecord::blank(Uint::from(7), now);
		record.buyer_address = Some(Address::repeat_byte(0x22));
		record.on_chain = true;

		record.apply_listing(&sample_listing(), now);
		assert!(record.buyer_address.is_none());
		assert!(!record.on_chain);
	}

	#[test]
	fn test_record_serde_wire_names() {
		let now = Utc::now();
		let mut record = ListingRecord::blank(Uint::from(42), now);
		record.name = Some("Ape #42".to_string());
		record.apply_listing(&sample_listing(), now);

		let value = serde_json::to_value(&record).unwrap();
		assert_eq!(value["tokenId"], "42");
		assert!(value.get("sellerAddress").is_some());
		assert_eq!(value["price"], "1.5");
		assert!(value.get("orderFingerprint").is_some());
		assert_eq!(value["onChain"], false);
		assert!(value.get("updatedAt").is_some());

		let back: ListingRecord = serde_json::from_value(value).unwrap();
		assert_eq!(back, record);
	}

	#[test]
	fn test_sparse_row_parses() {
		let raw = serde_json::json!({
			"tokenId": "3",
			"updatedAt": "2026-01-01T00:00:00Z",
		});
		let record: ListingRecord = serde_json::from_value(raw).unwrap();
		assert_eq!(record.state(), ListingState::Unlisted);
		assert!(record.seller_address.is_none());
	}
}
