//! Error taxonomy for marketplace operations.

use thiserror::Error;

use market_chain::ExecutorError;
use market_order::{IntegrityError, NormalizeError, ValueOverflow};
use market_store::StoreError;
use market_types::{TokenId, Uint};

#[derive(Debug, Error)]
pub enum MarketError {
	#[error("Configuration error: {0}")]
	Config(String),

	#[error("invalid price: {0}")]
	InvalidPrice(String),

	#[error("token {0} is not owned by the session address")]
	NotOwner(TokenId),

	#[error("token {0} is not listed")]
	NotListed(TokenId),

	#[error("token {0} is listed by a different seller")]
	NotSeller(TokenId),

	#[error("cannot buy your own listing")]
	SelfPurchase,

	#[error(transparent)]
	Normalize(#[from] NormalizeError),

	#[error(transparent)]
	Integrity(#[from] IntegrityError),

	#[error("collection approval for the settlement contract has been revoked")]
	ApprovalRevoked,

	#[error("insufficient funds: need {required} wei, have {available} wei")]
	InsufficientFunds { required: Uint, available: Uint },

	#[error("transaction rejected by the session owner")]
	UserRejected,

	#[error(transparent)]
	Store(#[from] StoreError),

	#[error("chain error: {0}")]
	Chain(String),

	#[error(transparent)]
	Value(#[from] ValueOverflow),
}

impl MarketError {
	/// True when the stored listing itself is unusable and the seller has
	/// to create a fresh order. Retrying the purchase cannot succeed.
	pub fn requires_relist(&self) -> bool {
		matches!(self, Self::Normalize(_) | Self::Integrity(_))
	}
}

impl From<ExecutorError> for MarketError {
	fn from(err: ExecutorError) -> Self {
		match err {
			ExecutorError::Rejected(_) => Self::UserRejected,
			other => Self::Chain(other.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_types::Bytes32;

	#[test]
	fn test_relist_classification() {
		let integrity = MarketError::Integrity(IntegrityError {
			recorded: Bytes32::repeat_byte(0x01),
			computed: Bytes32::repeat_byte(0x02),
		});
		assert!(integrity.requires_relist());

		let normalize = MarketError::Normalize(NormalizeError::MissingParameters);
		assert!(normalize.requires_relist());

		assert!(!MarketError::ApprovalRevoked.requires_relist());
		assert!(!MarketError::UserRejected.requires_relist());
		assert!(!MarketError::Chain("boom".to_string()).requires_relist());
	}

	#[test]
	fn test_executor_error_mapping() {
		let rejected = MarketError::from(ExecutorError::Rejected("declined".to_string()));
		assert!(matches!(rejected, MarketError::UserRejected));

		let rpc = MarketError::from(ExecutorError::Rpc("timeout".to_string()));
		assert!(matches!(rpc, MarketError::Chain(_)));
	}
}
