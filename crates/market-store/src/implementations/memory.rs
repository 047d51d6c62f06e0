//! In-memory listing store.
//!
//! Keeps every row in a concurrent map. Used for tests and for running
//! the service without any persistence.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use market_types::{ListingRecord, NewListing, SaleReport, TokenId};

use crate::{StoreError, StoreInterface};

/// In-memory store implementation backed by a concurrent map.
#[derive(Default)]
pub struct MemoryStore {
	rows: DashMap<TokenId, ListingRecord>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a store pre-populated with the given rows. Token metadata
	/// such as name and image survives later lifecycle writes.
	pub fn with_records(records: Vec<ListingRecord>) -> Self {
		let store = Self::new();
		for record in records {
			store.rows.insert(record.token_id, record);
		}
		store
	}
}

#[async_trait]
impl StoreInterface for MemoryStore {
	async fn listings(&self) -> Result<Vec<ListingRecord>, StoreError> {
		let mut rows: Vec<ListingRecord> =
			self.rows.iter().map(|entry| entry.value().clone()).collect();
		rows.sort_by_key(|row| row.token_id);
		Ok(rows)
	}

	async fn get(&self, token_id: &TokenId) -> Result<Option<ListingRecord>, StoreError> {
		Ok(self.rows.get(token_id).map(|entry| entry.value().clone()))
	}

	async fn upsert_listing(&self, listing: NewListing) -> Result<(), StoreError> {
		let now = Utc::now();
		let mut row = self
			.rows
			.entry(listing.token_id)
			.or_insert_with(|| ListingRecord::blank(listing.token_id, now));
		row.apply_listing(&listing, now);
		Ok(())
	}

	async fn complete_sale(&self, sale: SaleReport) -> Result<(), StoreError> {
		let now = Utc::now();
		let mut row = self
			.rows
			.entry(sale.token_id)
			.or_insert_with(|| ListingRecord::blank(sale.token_id, now));
		row.apply_sale(&sale, now);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_types::{Address, Bytes32, Uint};
	use rust_decimal::Decimal;

	fn listing(token_id: u64, price: &str) -> NewListing {
		NewListing {
			token_id: Uint::from(token_id),
			price: price.parse::<Decimal>().unwrap(),
			seller_address: Address::repeat_byte(0x11),
			order: serde_json::json!({"parameters": {}}),
			fingerprint: Bytes32::repeat_byte(0xaa),
		}
	}

	#[tokio::test]
	async fn test_upsert_then_get() {
		let store = MemoryStore::new();
		store.upsert_listing(listing(42, "1.5")).await.unwrap();

		let row = store.get(&Uint::from(42)).await.unwrap().unwrap();
		assert!(row.is_listed());
		assert_eq!(row.price.unwrap().to_string(), "1.5");
	}

	#[tokio::test]
	async fn test_listings_sorted_by_token_id() {
		let store = MemoryStore::new();
		store.upsert_listing(listing(9, "1")).await.unwrap();
		store.upsert_listing(listing(2, "1")).await.unwrap();
		store.upsert_listing(listing(400, "1")).await.unwrap();

		let rows = store.listings().await.unwrap();
		let ids: Vec<u64> = rows
			.iter()
			.map(|row| u64::try_from(row.token_id.0).unwrap())
			.collect();
		assert_eq!(ids, vec![2, 9, 400]);
	}

	#[tokio::test]
	async fn test_sale_clears_listing() {
		let store = MemoryStore::new();
		store.upsert_listing(listing(7, "2")).await.unwrap();
		store
			.complete_sale(SaleReport {
				token_id: Uint::from(7),
				fingerprint: Bytes32::repeat_byte(0xaa),
				buyer_address: Address::repeat_byte(0x22),
				price: None,
			})
			.await
			.unwrap();

		let row = store.get(&Uint::from(7)).await.unwrap().unwrap();
		assert!(!row.is_listed());
		assert!(row.on_chain);
		assert_eq!(row.buyer_address, Some(Address::repeat_byte(0x22)));
		assert!(row.order.is_none());
		assert!(row.order_fingerprint.is_none());
	}

	#[tokio::test]
	async fn test_metadata_survives_relist() {
		let mut seeded = ListingRecord::blank(Uint::from(5), Utc::now());
		seeded.name = Some("Token #5".to_string());
		seeded.image = Some("ipfs://QmHash/5.png".to_string());
		let store = MemoryStore::with_records(vec![seeded]);

		store.upsert_listing(listing(5, "3")).await.unwrap();

		let row = store.get(&Uint::from(5)).await.unwrap().unwrap();
		assert_eq!(row.name.as_deref(), Some("Token #5"));
		assert_eq!(row.image.as_deref(), Some("ipfs://QmHash/5.png"));
		assert!(row.is_listed());
	}
}
