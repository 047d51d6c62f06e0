//! Configuration loading for the marketplace service.
//!
//! Reads a TOML file, substitutes `${VAR}` references from the
//! environment, applies a small set of environment overrides, and
//! validates the result before anything connects to a chain.

use std::env;
use std::path::Path;
use thiserror::Error;

use market_types::Address;

pub mod settings;

pub use settings::{
	ApiSettings, ChainSettings, Config, GasSettings, ListingSettings, MediaSettings,
	StoreSettings,
};

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
#[derive(Default)]
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "MARKET_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		// Load base configuration from file
		let mut config = if let Some(file_path) = &self.file_path {
			self.load_from_file(file_path).await?
		} else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		// Apply environment variable overrides
		self.apply_env_overrides(&mut config);

		// Validate configuration
		self.validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<Config, ConfigError> {
		let content = tokio::fs::read_to_string(file_path).await?;

		// Substitute environment variables
		let substituted_content = self.substitute_env_vars(&content)?;

		// Parse TOML
		let config: Config = toml::from_str(&substituted_content)
			.map_err(|e| ConfigError::ParseError(e.to_string()))?;

		Ok(config)
	}

	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let mut result = content.to_string();

		// Find and replace ${VAR_NAME} patterns
		let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();

		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let env_value = env::var(var_name)
				.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

			result = result.replace(full_match, &env_value);
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, config: &mut Config) {
		if let Ok(rpc_url) = env::var(format!("{}RPC_URL", self.env_prefix)) {
			config.chain.rpc_url = rpc_url;
		}

		if let Ok(private_key) = env::var(format!("{}PRIVATE_KEY", self.env_prefix)) {
			config.chain.private_key = private_key;
		}

		if let Ok(bind_address) = env::var(format!("{}BIND_ADDRESS", self.env_prefix)) {
			config.api.bind_address = bind_address;
		}
	}

	fn validate_config(&self, config: &Config) -> Result<(), ConfigError> {
		if config.chain.rpc_url.is_empty() {
			return Err(ConfigError::ValidationError(
				"chain.rpc_url must not be empty".to_string(),
			));
		}

		if config.chain.private_key.is_empty() {
			return Err(ConfigError::ValidationError(
				"chain.private_key must not be empty".to_string(),
			));
		}

		if config.chain.settlement_contract == Address::ZERO {
			return Err(ConfigError::ValidationError(
				"chain.settlement_contract must not be the zero address".to_string(),
			));
		}

		if config.chain.collection_contract == Address::ZERO {
			return Err(ConfigError::ValidationError(
				"chain.collection_contract must not be the zero address".to_string(),
			));
		}

		if config.listing.duration_secs == 0 {
			return Err(ConfigError::ValidationError(
				"listing.duration_secs must be greater than zero".to_string(),
			));
		}

		if config.gas.fallback_limit == 0 {
			return Err(ConfigError::ValidationError(
				"gas.fallback_limit must be greater than zero".to_string(),
			));
		}

		match config.store.backend.as_str() {
			"memory" => {}
			"file" => {
				if config.store.path.is_none() {
					return Err(ConfigError::ValidationError(
						"store.path is required for the file backend".to_string(),
					));
				}
			}
			"http" => {
				if config.store.url.is_none() {
					return Err(ConfigError::ValidationError(
						"store.url is required for the http backend".to_string(),
					));
				}
			}
			other => {
				return Err(ConfigError::ValidationError(format!(
					"unknown store backend: {}",
					other
				)));
			}
		}

		Ok(())
	}
}
