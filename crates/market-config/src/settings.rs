//! # Configuration Types
//!
//! Configuration structures for the marketplace service.
//!
//! This module defines the configuration schema for the whole system:
//! chain connectivity, listing store backend, listing policy, gas policy,
//! and the HTTP API surface. Fields with sensible fixed values carry
//! defaults so a minimal file only has to name the RPC endpoint and the
//! signing key.

use alloy_primitives::address;
use market_types::Address;
use serde::{Deserialize, Serialize};

/// Root configuration object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	/// Chain connectivity and contract addresses
	pub chain: ChainSettings,
	/// Listing store backend selection
	#[serde(default)]
	pub store: StoreSettings,
	/// Listing policy (validity window)
	#[serde(default)]
	pub listing: ListingSettings,
	/// Gas estimation policy
	#[serde(default)]
	pub gas: GasSettings,
	/// HTTP API server settings
	#[serde(default)]
	pub api: ApiSettings,
	/// Media URL resolution settings
	#[serde(default)]
	pub media: MediaSettings,
}

/// Chain connectivity and the two contracts everything runs against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
	/// JSON-RPC endpoint URL
	pub rpc_url: String,
	/// Hex-encoded private key for the session signer
	pub private_key: String,
	/// Chain ID the signer is bound to
	#[serde(default = "default_chain_id")]
	pub chain_id: u64,
	/// Settlement (Seaport) contract address
	#[serde(default = "default_settlement_contract")]
	pub settlement_contract: Address,
	/// ERC-721 collection address
	#[serde(default = "default_collection_contract")]
	pub collection_contract: Address,
}

/// Listing store backend settings.
///
/// `backend` selects the implementation: "memory", "file", or "http".
/// The file backend needs `path`, the http backend needs `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
	/// Backend name
	#[serde(default = "default_store_backend")]
	pub backend: String,
	/// Base URL for the http backend
	#[serde(default)]
	pub url: Option<String>,
	/// Directory for the file backend
	#[serde(default)]
	pub path: Option<String>,
}

/// Listing policy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSettings {
	/// How long a new listing stays valid, in seconds
	#[serde(default = "default_listing_duration_secs")]
	pub duration_secs: u64,
}

/// Gas estimation policy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasSettings {
	/// Safety margin applied on top of the node's estimate, in percent
	#[serde(default = "default_gas_margin_percent")]
	pub margin_percent: u64,
	/// Gas limit offered when estimation is unavailable
	#[serde(default = "default_gas_fallback_limit")]
	pub fallback_limit: u64,
}

/// HTTP API server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
	/// Socket address the listing API binds to
	#[serde(default = "default_api_bind_address")]
	pub bind_address: String,
}

/// Media URL resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSettings {
	/// HTTP gateway prefix used to rewrite ipfs:// URLs
	#[serde(default = "default_ipfs_gateway")]
	pub ipfs_gateway: String,
}

impl Default for StoreSettings {
	fn default() -> Self {
		Self {
			backend: default_store_backend(),
			url: None,
			path: None,
		}
	}
}

impl Default for ListingSettings {
	fn default() -> Self {
		Self {
			duration_secs: default_listing_duration_secs(),
		}
	}
}

impl Default for GasSettings {
	fn default() -> Self {
		Self {
			margin_percent: default_gas_margin_percent(),
			fallback_limit: default_gas_fallback_limit(),
		}
	}
}

impl Default for ApiSettings {
	fn default() -> Self {
		Self {
			bind_address: default_api_bind_address(),
		}
	}
}

impl Default for MediaSettings {
	fn default() -> Self {
		Self {
			ipfs_gateway: default_ipfs_gateway(),
		}
	}
}

fn default_chain_id() -> u64 {
	33139
}

fn default_settlement_contract() -> Address {
	address!("0x0000000000000068f116a894984e2db1123eb395")
}

fn default_collection_contract() -> Address {
	address!("0x54a88333f6e7540ea982261301309048ac431ed5")
}

fn default_store_backend() -> String {
	"memory".to_string()
}

fn default_listing_duration_secs() -> u64 {
	2_592_000
}

fn default_gas_margin_percent() -> u64 {
	20
}

fn default_gas_fallback_limit() -> u64 {
	500_000
}

fn default_api_bind_address() -> String {
	"127.0.0.1:8080".to_string()
}

fn default_ipfs_gateway() -> String {
	"https://ipfs.io/ipfs/".to_string()
}
