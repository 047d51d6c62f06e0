//! File-based listing store.
//!
//! Stores one JSON document per token under a base directory, providing
//! simple persistence without requiring external services.

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs;

use market_types::{ListingRecord, NewListing, SaleReport, TokenId};

use crate::{StoreError, StoreInterface};

/// File-based store implementation.
pub struct FileStore {
	/// Base directory path for storing rows.
	base_path: PathBuf,
}

impl FileStore {
	/// Creates a new FileStore instance with the specified base path.
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	fn file_path(&self, token_id: &TokenId) -> PathBuf {
		self.base_path.join(format!("{}.json", token_id))
	}

	async fn read_row(&self, token_id: &TokenId) -> Result<Option<ListingRecord>, StoreError> {
		let path = self.file_path(token_id);
		match fs::read(&path).await {
			Ok(data) => {
				let row = serde_json::from_slice(&data)
					.map_err(|e| StoreError::Serialization(e.to_string()))?;
				Ok(Some(row))
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(StoreError::Backend(e.to_string())),
		}
	}

	async fn write_row(&self, row: &ListingRecord) -> Result<(), StoreError> {
		let path = self.file_path(&row.token_id);

		// Create parent directory if it doesn't exist
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StoreError::Backend(e.to_string()))?;
		}

		let bytes =
			serde_json::to_vec(row).map_err(|e| StoreError::Serialization(e.to_string()))?;

		// Write atomically by writing to temp file then renaming
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, bytes)
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;

		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;

		Ok(())
	}
}

#[async_trait]
impl StoreInterface for FileStore {
	async fn listings(&self) -> Result<Vec<ListingRecord>, StoreError> {
		let mut dir = match fs::read_dir(&self.base_path).await {
			Ok(dir) => dir,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StoreError::Backend(e.to_string())),
		};

		let mut rows = Vec::new();
		while let Some(entry) = dir
			.next_entry()
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
				continue;
			}
			let data = fs::read(&path)
				.await
				.map_err(|e| StoreError::Backend(e.to_string()))?;
			let row: ListingRecord = serde_json::from_slice(&data)
				.map_err(|e| StoreError::Serialization(e.to_string()))?;
			rows.push(row);
		}

		rows.sort_by_key(|row| row.token_id);
		Ok(rows)
	}

	async fn get(&self, token_id: &TokenId) -> Result<Option<ListingRecord>, StoreError> {
		self.read_row(token_id).await
	}

	async fn upsert_listing(&self, listing: NewListing) -> Result<(), StoreError> {
		let now = Utc::now();
		let mut row = self
			.read_row(&listing.token_id)
			.await?
			.unwrap_or_else(|| ListingRecord::blank(listing.token_id, now));
		row.apply_listing(&listing, now);
		self.write_row(&row).await
	}

	async fn complete_sale(&self, sale: SaleReport) -> Result<(), StoreError> {
		let now = Utc::now();
		let mut row = self
			.read_row(&sale.token_id)
			.await?
			.unwrap_or_else(|| ListingRecord::blank(sale.token_id, now));
		row.apply_sale(&sale, now);
		self.write_row(&row).await
	}
}
