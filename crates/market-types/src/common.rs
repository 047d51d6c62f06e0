//! Common types used throughout the marketplace system.

use serde::{Deserialize, Serialize};

// Re-export the primitive ethereum types the whole workspace speaks in.
pub use alloy_primitives::{Address, Bytes, B256 as Bytes32, U256};

/// Transaction hash.
pub type TxHash = Bytes32;

/// Block number.
pub type BlockNumber = u64;

/// Contract-call transaction request.
///
/// The executor owns the chain id and fee parameters; callers only describe
/// the call itself and, once quoted, the gas limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	/// Contract being called.
	pub to: Address,
	/// Call data.
	pub data: Bytes,
	/// Native value to transfer.
	pub value: U256,
	/// Gas limit, if already quoted.
	pub gas_limit: Option<u64>,
}

impl Transaction {
	/// Returns a copy of this request carrying the given gas limit.
	pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
		self.gas_limit = Some(gas_limit);
		self
	}
}

/// Receipt of a transaction after inclusion in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TxHash,
	/// The block number where the transaction was included.
	pub block_number: BlockNumber,
	/// Whether the transaction executed successfully.
	pub success: bool,
}
