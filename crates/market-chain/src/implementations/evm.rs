//! EVM chain executor built on Alloy.
//!
//! Talks to an ERC-721 collection and a Seaport-compatible settlement
//! contract: ownership and approval views, order hashing through the
//! protocol's own `getOrderHash`, EIP-712 order signing with a local key,
//! fulfillment calldata, and transaction submission through a wallet-backed
//! provider.

use async_trait::async_trait;

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::keccak256;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy::sol_types::SolCall;

use market_config::ChainSettings;
use market_types::{
	Address, Bytes, Bytes32, ConsiderationItem, Fingerprint, FulfillmentDraft, OfferItem,
	OrderInput, OrderKind, OrderParameters, SignedOrder, TokenId, Transaction,
	TransactionReceipt, TxHash, U256,
};

use crate::{ExecutorError, ExecutorInterface};

mod abi {
	alloy::sol! {
		struct OfferItem {
			uint8 itemType;
			address token;
			uint256 identifierOrCriteria;
			uint256 startAmount;
			uint256 endAmount;
		}

		struct ConsiderationItem {
			uint8 itemType;
			address token;
			uint256 identifierOrCriteria;
			uint256 startAmount;
			uint256 endAmount;
			address recipient;
		}

		struct OrderParameters {
			address offerer;
			address zone;
			OfferItem[] offer;
			ConsiderationItem[] consideration;
			uint8 orderType;
			uint256 startTime;
			uint256 endTime;
			bytes32 zoneHash;
			uint256 salt;
			bytes32 conduitKey;
			uint256 totalOriginalConsiderationItems;
		}

		struct OrderComponents {
			address offerer;
			address zone;
			OfferItem[] offer;
			ConsiderationItem[] consideration;
			uint8 orderType;
			uint256 startTime;
			uint256 endTime;
			bytes32 zoneHash;
			uint256 salt;
			bytes32 conduitKey;
			uint256 counter;
		}

		struct Order {
			OrderParameters parameters;
			bytes signature;
		}

		#[sol(rpc)]
		interface IERC721 {
			function ownerOf(uint256 tokenId) external view returns (address owner);
			function isApprovedForAll(address owner, address operator) external view returns (bool approved);
			function setApprovalForAll(address operator, bool approved) external;
		}

		#[sol(rpc)]
		interface ISeaport {
			function information() external view returns (string memory version, bytes32 domainSeparator, address conduitController);
			function getCounter(address offerer) external view returns (uint256 counter);
			function getOrderHash(OrderComponents calldata order) external view returns (bytes32 orderHash);
			function fulfillOrder(Order calldata order, bytes32 fulfillerConduitKey) external payable returns (bool fulfilled);
		}
	}
}

/// Alloy-backed executor bound to one chain, one collection, and one
/// settlement contract.
pub struct EvmExecutor {
	provider: DynProvider,
	signer: PrivateKeySigner,
	signer_address: Address,
	settlement: Address,
	collection: Address,
}

impl EvmExecutor {
	/// Creates an executor from an RPC endpoint and a hex-encoded private
	/// key. The provider signs with the key, so the session address is the
	/// key's address.
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		settlement: Address,
		collection: Address,
		private_key: &str,
	) -> Result<Self, ExecutorError> {
		let signer = private_key
			.parse::<PrivateKeySigner>()
			.map_err(|e| ExecutorError::InvalidConfig(format!("invalid private key: {}", e)))?
			.with_chain_id(Some(chain_id));
		let signer_address = signer.address();

		let url = rpc_url
			.parse()
			.map_err(|e| ExecutorError::InvalidConfig(format!("invalid rpc url: {}", e)))?;
		let wallet = EthereumWallet::from(signer.clone());
		let provider = ProviderBuilder::new().wallet(wallet).connect_http(url).erased();

		Ok(Self {
			provider,
			signer,
			signer_address,
			settlement,
			collection,
		})
	}

	fn erc721(&self) -> abi::IERC721::IERC721Instance<DynProvider> {
		abi::IERC721::new(self.collection, self.provider.clone())
	}

	fn seaport(&self) -> abi::ISeaport::ISeaportInstance<DynProvider> {
		abi::ISeaport::new(self.settlement, self.provider.clone())
	}

	fn request_from(&self, tx: &Transaction) -> TransactionRequest {
		let mut request = TransactionRequest::default()
			.with_from(self.signer_address)
			.with_to(tx.to)
			.with_input(tx.data.clone())
			.with_value(tx.value);
		if let Some(limit) = tx.gas_limit {
			request = request.with_gas_limit(limit);
		}
		request
	}
}

fn rpc_error(context: &str, err: impl std::fmt::Display) -> ExecutorError {
	ExecutorError::Rpc(format!("{}: {}", context, err))
}

/// Canonical order parameters for a blueprint: fixed-price items (equal
/// start and end amounts), open order type, no zone or conduit.
fn canonical_parameters(
	input: &OrderInput,
	seller: Address,
) -> Result<OrderParameters, ExecutorError> {
	let offer = input
		.offer
		.iter()
		.map(|item| OfferItem {
			kind: item.kind,
			token: item.token,
			identifier_or_criteria: item.identifier,
			start_amount: item.amount,
			end_amount: item.amount,
		})
		.collect::<Vec<_>>();

	let consideration = input
		.consideration
		.iter()
		.map(|item| {
			let recipient = item.recipient.ok_or_else(|| {
				ExecutorError::InvalidOrder("consideration item has no recipient".to_string())
			})?;
			Ok(ConsiderationItem {
				kind: item.kind,
				token: item.token,
				identifier_or_criteria: item.identifier,
				start_amount: item.amount,
				end_amount: item.amount,
				recipient,
			})
		})
		.collect::<Result<Vec<_>, ExecutorError>>()?;

	let total_original_consideration_items = consideration.len() as u64;

	Ok(OrderParameters {
		offerer: seller,
		zone: Address::ZERO,
		offer,
		consideration,
		order_type: OrderKind::FullOpen,
		start_time: input.start_time,
		end_time: input.end_time,
		zone_hash: Bytes32::ZERO,
		salt: input.salt,
		conduit_key: Bytes32::ZERO,
		total_original_consideration_items,
	})
}

fn sol_offer_item(item: &OfferItem) -> abi::OfferItem {
	abi::OfferItem {
		itemType: item.kind.into(),
		token: item.token,
		identifierOrCriteria: item.identifier_or_criteria.0,
		startAmount: item.start_amount.0,
		endAmount: item.end_amount.0,
	}
}

fn sol_consideration_item(item: &ConsiderationItem) -> abi::ConsiderationItem {
	abi::ConsiderationItem {
		itemType: item.kind.into(),
		token: item.token,
		identifierOrCriteria: item.identifier_or_criteria.0,
		startAmount: item.start_amount.0,
		endAmount: item.end_amount.0,
		recipient: item.recipient,
	}
}

fn sol_parameters(parameters: &OrderParameters) -> abi::OrderParameters {
	abi::OrderParameters {
		offerer: parameters.offerer,
		zone: parameters.zone,
		offer: parameters.offer.iter().map(sol_offer_item).collect(),
		consideration: parameters
			.consideration
			.iter()
			.map(sol_consideration_item)
			.collect(),
		orderType: parameters.order_type.into(),
		startTime: parameters.start_time.0,
		endTime: parameters.end_time.0,
		zoneHash: parameters.zone_hash,
		salt: parameters.salt.0,
		conduitKey: parameters.conduit_key,
		totalOriginalConsiderationItems: U256::from(
			parameters.total_original_consideration_items,
		),
	}
}

fn order_components(parameters: &OrderParameters, counter: U256) -> abi::OrderComponents {
	abi::OrderComponents {
		offerer: parameters.offerer,
		zone: parameters.zone,
		offer: parameters.offer.iter().map(sol_offer_item).collect(),
		consideration: parameters
			.consideration
			.iter()
			.map(sol_consideration_item)
			.collect(),
		orderType: parameters.order_type.into(),
		startTime: parameters.start_time.0,
		endTime: parameters.end_time.0,
		zoneHash: parameters.zone_hash,
		salt: parameters.salt.0,
		conduitKey: parameters.conduit_key,
		counter,
	}
}

/// EIP-712 envelope over the protocol's domain separator and order hash.
fn signing_digest(domain_separator: Bytes32, order_hash: Bytes32) -> Bytes32 {
	let mut message = Vec::with_capacity(66);
	message.extend_from_slice(&[0x19, 0x01]);
	message.extend_from_slice(domain_separator.as_slice());
	message.extend_from_slice(order_hash.as_slice());
	keccak256(&message)
}

fn fulfillment_calldata(order: &SignedOrder) -> Vec<u8> {
	let call = abi::ISeaport::fulfillOrderCall {
		order: abi::Order {
			parameters: sol_parameters(&order.parameters),
			signature: order.signature.clone(),
		},
		fulfillerConduitKey: Bytes32::ZERO,
	};
	call.abi_encode()
}

/// Advisory value for a fulfillment draft. Settlement recomputes the real
/// amount; this only pre-fills the suggestion.
fn native_consideration_total(parameters: &OrderParameters) -> U256 {
	parameters
		.consideration
		.iter()
		.filter(|item| item.kind.is_native())
		.fold(U256::ZERO, |total, item| {
			total.saturating_add(item.end_amount.0)
		})
}

#[async_trait]
impl ExecutorInterface for EvmExecutor {
	fn settlement_contract(&self) -> Address {
		self.settlement
	}

	fn collection_contract(&self) -> Address {
		self.collection
	}

	async fn signer_address(&self) -> Result<Address, ExecutorError> {
		Ok(self.signer_address)
	}

	async fn owner_of(&self, token_id: &TokenId) -> Result<Address, ExecutorError> {
		self.erc721()
			.ownerOf(token_id.0)
			.call()
			.await
			.map_err(|e| rpc_error("ownerOf failed", e))
	}

	async fn is_approved(&self, owner: Address, operator: Address) -> Result<bool, ExecutorError> {
		self.erc721()
			.isApprovedForAll(owner, operator)
			.call()
			.await
			.map_err(|e| rpc_error("isApprovedForAll failed", e))
	}

	async fn set_approval(
		&self,
		operator: Address,
		approved: bool,
	) -> Result<TxHash, ExecutorError> {
		let data = abi::IERC721::setApprovalForAllCall { operator, approved }.abi_encode();
		let tx = Transaction {
			to: self.collection,
			data: Bytes::from(data),
			value: U256::ZERO,
			gas_limit: None,
		};
		self.send_transaction(tx).await
	}

	async fn create_order(
		&self,
		input: &OrderInput,
		seller: Address,
	) -> Result<SignedOrder, ExecutorError> {
		if seller != self.signer_address {
			return Err(ExecutorError::InvalidOrder(format!(
				"seller {} is not the connected signer {}",
				seller, self.signer_address
			)));
		}

		let parameters = canonical_parameters(input, seller)?;
		let order_hash = self.order_fingerprint(&parameters).await?;
		let info = self
			.seaport()
			.information()
			.call()
			.await
			.map_err(|e| rpc_error("information failed", e))?;

		let digest = signing_digest(info.domainSeparator, order_hash);
		let signature = self
			.signer
			.sign_hash(&digest)
			.await
			.map_err(|e| ExecutorError::Signing(e.to_string()))?;

		tracing::info!(%order_hash, offerer = %seller, "signed order");

		Ok(SignedOrder {
			parameters,
			signature: Bytes::from(signature.as_bytes().to_vec()),
		})
	}

	async fn order_fingerprint(
		&self,
		parameters: &OrderParameters,
	) -> Result<Fingerprint, ExecutorError> {
		let seaport = self.seaport();
		let counter = seaport
			.getCounter(parameters.offerer)
			.call()
			.await
			.map_err(|e| rpc_error("getCounter failed", e))?;
		seaport
			.getOrderHash(order_components(parameters, counter))
			.call()
			.await
			.map_err(|e| rpc_error("getOrderHash failed", e))
	}

	async fn build_fulfillment(
		&self,
		order: &SignedOrder,
		buyer: Address,
	) -> Result<FulfillmentDraft, ExecutorError> {
		let data = fulfillment_calldata(order);
		let suggested_value = native_consideration_total(&order.parameters);
		tracing::debug!(%buyer, suggested_value = %suggested_value, "prepared fulfillment call");

		Ok(FulfillmentDraft {
			to: self.settlement,
			data: Bytes::from(data),
			suggested_value,
		})
	}

	async fn native_balance(&self, address: Address) -> Result<U256, ExecutorError> {
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| rpc_error("get_balance failed", e))
	}

	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, ExecutorError> {
		self.provider
			.estimate_gas(self.request_from(tx))
			.await
			.map_err(|e| rpc_error("gas estimation failed", e))
	}

	async fn send_transaction(&self, tx: Transaction) -> Result<TxHash, ExecutorError> {
		let request = self.request_from(&tx);
		let pending = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| rpc_error("failed to send transaction", e))?;
		let hash = *pending.tx_hash();
		tracing::info!(%hash, "submitted transaction");
		Ok(hash)
	}

	async fn wait_for_inclusion(
		&self,
		hash: &TxHash,
	) -> Result<TransactionReceipt, ExecutorError> {
		let poll_interval = tokio::time::Duration::from_secs(7);
		loop {
			match self.provider.get_transaction_receipt(*hash).await {
				Ok(Some(receipt)) => {
					return Ok(TransactionReceipt {
						hash: receipt.transaction_hash,
						block_number: receipt.block_number.unwrap_or_default(),
						success: receipt.status(),
					});
				}
				Ok(None) => {
					tracing::debug!(%hash, "transaction not yet included");
					tokio::time::sleep(poll_interval).await;
				}
				Err(e) => return Err(rpc_error("failed to get receipt", e)),
			}
		}
	}
}

/// Factory function to create an EVM executor from chain settings.
pub fn create_executor(settings: &ChainSettings) -> Result<Box<dyn ExecutorInterface>, ExecutorError> {
	let executor = EvmExecutor::new(
		&settings.rpc_url,
		settings.chain_id,
		settings.settlement_contract,
		settings.collection_contract,
		&settings.private_key,
	)?;
	Ok(Box::new(executor))
}
