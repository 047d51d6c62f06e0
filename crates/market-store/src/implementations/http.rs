//! HTTP-backed listing store.
//!
//! Talks to a remote listing service over its JSON API. The remote side
//! owns the rows (and any token metadata); this client only reads the
//! table and posts lifecycle writes.

use async_trait::async_trait;
use serde::Deserialize;

use market_types::{ListingRecord, NewListing, SaleReport};

use crate::{StoreError, StoreInterface};

/// HTTP store implementation backed by a remote listing service.
pub struct HttpStore {
	client: reqwest::Client,
	base_url: String,
}

impl HttpStore {
	/// Creates a new HttpStore for the given base URL.
	pub fn new(base_url: String) -> Self {
		Self {
			client: reqwest::Client::new(),
			base_url: base_url.trim_end_matches('/').to_string(),
		}
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}
}

#[derive(Deserialize)]
struct ListingsPage {
	listings: Vec<ListingRecord>,
}

#[async_trait]
impl StoreInterface for HttpStore {
	async fn listings(&self) -> Result<Vec<ListingRecord>, StoreError> {
		let response = self
			.client
			.get(self.url("/api/listings"))
			.send()
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;

		if !response.status().is_success() {
			return Err(StoreError::Backend(format!(
				"listing service returned {}",
				response.status()
			)));
		}

		let page: ListingsPage = response
			.json()
			.await
			.map_err(|e| StoreError::Serialization(e.to_string()))?;

		let mut rows = page.listings;
		rows.sort_by_key(|row| row.token_id);
		Ok(rows)
	}

	async fn upsert_listing(&self, listing: NewListing) -> Result<(), StoreError> {
		let response = self
			.client
			.post(self.url("/api/listings"))
			.json(&listing)
			.send()
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;

		if !response.status().is_success() {
			return Err(StoreError::Backend(format!(
				"listing service returned {}",
				response.status()
			)));
		}
		Ok(())
	}

	async fn complete_sale(&self, sale: SaleReport) -> Result<(), StoreError> {
		let response = self
			.client
			.post(self.url("/api/sales"))
			.json(&sale)
			.send()
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;

		if !response.status().is_success() {
			return Err(StoreError::Backend(format!(
				"listing service returned {}",
				response.status()
			)));
		}
		Ok(())
	}
}
