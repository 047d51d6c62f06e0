//! Chain executor capability for the marketplace.
//!
//! Everything the lifecycle controller needs from the ledger goes through
//! [`ExecutorInterface`]: ownership and approval queries, order creation and
//! fingerprinting through the settlement protocol, fulfillment calldata,
//! balance checks, gas estimation, and transaction submission. The default
//! implementation talks to an EVM chain over alloy.

use async_trait::async_trait;
use thiserror::Error;

use market_types::{
	Address, Fingerprint, FulfillmentDraft, OrderInput, OrderParameters, SignedOrder, TokenId,
	Transaction, TransactionReceipt, TxHash, U256,
};

/// Re-export implementations
pub mod implementations {
	pub mod evm;
}

pub use implementations::evm::create_executor;

/// Errors that can occur while talking to the chain.
#[derive(Debug, Error)]
pub enum ExecutorError {
	/// A node call failed or returned something unusable.
	#[error("rpc error: {0}")]
	Rpc(String),
	/// The signing capability failed to produce a signature.
	#[error("signing failed: {0}")]
	Signing(String),
	/// The order handed to the executor cannot be expressed on-chain.
	#[error("invalid order: {0}")]
	InvalidOrder(String),
	/// The signing capability refused the request.
	#[error("request declined: {0}")]
	Rejected(String),
	/// The executor configuration is unusable.
	#[error("invalid executor configuration: {0}")]
	InvalidConfig(String),
}

/// Ledger operations required by the listing lifecycle.
#[async_trait]
pub trait ExecutorInterface: Send + Sync {
	/// Settlement contract the executor is bound to.
	fn settlement_contract(&self) -> Address;

	/// Collection contract the executor is bound to.
	fn collection_contract(&self) -> Address;

	/// Address of the session's signing key.
	async fn signer_address(&self) -> Result<Address, ExecutorError>;

	/// Current owner of a token in the collection.
	async fn owner_of(&self, token_id: &TokenId) -> Result<Address, ExecutorError>;

	/// Whether `operator` may transfer all of `owner`'s tokens.
	async fn is_approved(&self, owner: Address, operator: Address) -> Result<bool, ExecutorError>;

	/// Grants or revokes collection-wide transfer approval for `operator`.
	async fn set_approval(&self, operator: Address, approved: bool)
		-> Result<TxHash, ExecutorError>;

	/// Builds and signs an order for `seller` from the given blueprint.
	async fn create_order(
		&self,
		input: &OrderInput,
		seller: Address,
	) -> Result<SignedOrder, ExecutorError>;

	/// The settlement protocol's fingerprint of the given order parameters.
	async fn order_fingerprint(
		&self,
		parameters: &OrderParameters,
	) -> Result<Fingerprint, ExecutorError>;

	/// Prepares the fulfillment call for an order. The draft's suggested
	/// value is advisory; callers compute the real settlement value
	/// themselves.
	async fn build_fulfillment(
		&self,
		order: &SignedOrder,
		buyer: Address,
	) -> Result<FulfillmentDraft, ExecutorError>;

	/// Native-currency balance of an address.
	async fn native_balance(&self, address: Address) -> Result<U256, ExecutorError>;

	/// Estimated gas for the given transaction.
	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, ExecutorError>;

	/// Submits a transaction and returns its hash.
	async fn send_transaction(&self, tx: Transaction) -> Result<TxHash, ExecutorError>;

	/// Blocks until the transaction is included in a block. No internal
	/// timeout: inclusion waits are bounded only by the caller.
	async fn wait_for_inclusion(&self, hash: &TxHash)
		-> Result<TransactionReceipt, ExecutorError>;
}

/// High-level executor service wrapping a chain backend.
pub struct ExecutorService {
	backend: Box<dyn ExecutorInterface>,
}

impl ExecutorService {
	/// Creates a new ExecutorService with the specified backend.
	pub fn new(backend: Box<dyn ExecutorInterface>) -> Self {
		Self { backend }
	}

	pub fn settlement_contract(&self) -> Address {
		self.backend.settlement_contract()
	}

	pub fn collection_contract(&self) -> Address {
		self.backend.collection_contract()
	}

	pub async fn signer_address(&self) -> Result<Address, ExecutorError> {
		self.backend.signer_address().await
	}

	pub async fn owner_of(&self, token_id: &TokenId) -> Result<Address, ExecutorError> {
		self.backend.owner_of(token_id).await
	}

	pub async fn is_approved(
		&self,
		owner: Address,
		operator: Address,
	) -> Result<bool, ExecutorError> {
		self.backend.is_approved(owner, operator).await
	}

	pub async fn set_approval(
		&self,
		operator: Address,
		approved: bool,
	) -> Result<TxHash, ExecutorError> {
		self.backend.set_approval(operator, approved).await
	}

	pub async fn create_order(
		&self,
		input: &OrderInput,
		seller: Address,
	) -> Result<SignedOrder, ExecutorError> {
		self.backend.create_order(input, seller).await
	}

	pub async fn order_fingerprint(
		&self,
		parameters: &OrderParameters,
	) -> Result<Fingerprint, ExecutorError> {
		self.backend.order_fingerprint(parameters).await
	}

	pub async fn build_fulfillment(
		&self,
		order: &SignedOrder,
		buyer: Address,
	) -> Result<FulfillmentDraft, ExecutorError> {
		self.backend.build_fulfillment(order, buyer).await
	}

	pub async fn native_balance(&self, address: Address) -> Result<U256, ExecutorError> {
		self.backend.native_balance(address).await
	}

	pub async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, ExecutorError> {
		self.backend.estimate_gas(tx).await
	}

	pub async fn send_transaction(&self, tx: Transaction) -> Result<TxHash, ExecutorError> {
		self.backend.send_transaction(tx).await
	}

	pub async fn wait_for_inclusion(
		&self,
		hash: &TxHash,
	) -> Result<TransactionReceipt, ExecutorError> {
		self.backend.wait_for_inclusion(hash).await
	}
}
