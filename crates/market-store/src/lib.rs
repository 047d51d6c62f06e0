//! Listing store for the marketplace system.
//!
//! This module provides abstractions for persisting listing rows,
//! supporting different backend implementations: in-memory, file-based,
//! or a remote HTTP listing service.

use async_trait::async_trait;
use thiserror::Error;

use market_config::StoreSettings;
use market_types::{ListingRecord, NewListing, SaleReport, TokenId};

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod http;
	pub mod memory;
}

pub mod media;

pub use implementations::file::FileStore;
pub use implementations::http::HttpStore;
pub use implementations::memory::MemoryStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
	/// Error that occurs when a requested row is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the store backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Trait defining the interface for listing store backends.
///
/// A backend holds one row per token. Rows are updated through the two
/// lifecycle writes: `upsert_listing` when an order is created or
/// re-priced, and `complete_sale` after settlement lands on chain.
#[async_trait]
pub trait StoreInterface: Send + Sync {
	/// Returns all rows, ordered by token id ascending.
	async fn listings(&self) -> Result<Vec<ListingRecord>, StoreError>;

	/// Returns the row for one token, if any.
	async fn get(&self, token_id: &TokenId) -> Result<Option<ListingRecord>, StoreError> {
		Ok(self
			.listings()
			.await?
			.into_iter()
			.find(|row| row.token_id == *token_id))
	}

	/// Records a new or re-priced listing.
	async fn upsert_listing(&self, listing: NewListing) -> Result<(), StoreError>;

	/// Records a completed sale, clearing the listing fields.
	async fn complete_sale(&self, sale: SaleReport) -> Result<(), StoreError>;
}

/// High-level store service that wraps a backend.
pub struct StoreService {
	/// The underlying store backend implementation.
	backend: Box<dyn StoreInterface>,
}

impl StoreService {
	/// Creates a new StoreService with the specified backend.
	pub fn new(backend: Box<dyn StoreInterface>) -> Self {
		Self { backend }
	}

	/// Returns all rows, ordered by token id ascending.
	pub async fn listings(&self) -> Result<Vec<ListingRecord>, StoreError> {
		self.backend.listings().await
	}

	/// Returns the row for one token, if any.
	pub async fn get(&self, token_id: &TokenId) -> Result<Option<ListingRecord>, StoreError> {
		self.backend.get(token_id).await
	}

	/// Records a new or re-priced listing.
	pub async fn upsert_listing(&self, listing: NewListing) -> Result<(), StoreError> {
		self.backend.upsert_listing(listing).await
	}

	/// Records a completed sale, clearing the listing fields.
	pub async fn complete_sale(&self, sale: SaleReport) -> Result<(), StoreError> {
		self.backend.complete_sale(sale).await
	}
}

/// Factory function to create a store backend from configuration.
///
/// The backend name selects the implementation; the settings carry the
/// backend-specific connection details.
pub fn create_store(settings: &StoreSettings) -> Result<Box<dyn StoreInterface>, StoreError> {
	match settings.backend.as_str() {
		"memory" => Ok(Box::new(MemoryStore::new())),
		"file" => {
			let path = settings
				.path
				.as_ref()
				.ok_or_else(|| StoreError::Backend("store.path is not set".to_string()))?;
			Ok(Box::new(FileStore::new(path.into())))
		}
		"http" => {
			let url = settings
				.url
				.as_ref()
				.ok_or_else(|| StoreError::Backend("store.url is not set".to_string()))?;
			Ok(Box::new(HttpStore::new(url.clone())))
		}
		other => Err(StoreError::Backend(format!(
			"unknown store backend: {}",
			other
		))),
	}
}
