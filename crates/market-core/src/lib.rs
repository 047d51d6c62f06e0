//! Marketplace engine for fixed-price ERC-721 listings.
//!
//! The engine drives the listing lifecycle against two services: a chain
//! executor for contract calls and transaction submission, and a listing
//! store for the off-chain table. Listings are signed settlement orders;
//! purchases re-derive everything from the stored order, verify it
//! against the settlement contract's own order hash, and only touch the
//! store after the fulfillment transaction has succeeded on chain.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use market_chain::ExecutorService;
use market_order::{listing_order_input, normalize_order, settlement_value, verify_fingerprint};
use market_session::Session;
use market_store::StoreService;
use market_types::{
	EventBus, Fingerprint, ListingEvent, ListingRecord, MarketEvent, NewListing, PurchaseEvent,
	SaleReport, TokenId, Transaction, TxHash, Uint,
};

pub mod error;
pub mod gas;

pub use error::MarketError;
pub use gas::{GasPolicy, GasQuote};

/// Engine-level settings, mapped from configuration by the service.
#[derive(Debug, Clone)]
pub struct EngineSettings {
	/// How long a new listing stays valid, in seconds.
	pub listing_duration_secs: u64,
	/// Gas quoting policy for settlement transactions.
	pub gas: GasPolicy,
}

impl Default for EngineSettings {
	fn default() -> Self {
		Self {
			listing_duration_secs: 2_592_000,
			gas: GasPolicy::default(),
		}
	}
}

/// Result of a completed purchase.
#[derive(Debug, Clone)]
pub struct SaleOutcome {
	/// Hash of the settlement transaction.
	pub tx_hash: TxHash,
	/// Native amount the buyer paid, in wei.
	pub amount: Uint,
}

/// Coordinates listing and purchase operations.
pub struct MarketplaceEngine {
	executor: Arc<ExecutorService>,
	store: Arc<StoreService>,
	settings: EngineSettings,
	event_bus: EventBus,
}

impl MarketplaceEngine {
	pub fn new(
		executor: Arc<ExecutorService>,
		store: Arc<StoreService>,
		settings: EngineSettings,
	) -> Self {
		Self {
			executor,
			store,
			settings,
			event_bus: EventBus::new(1000),
		}
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Lists a token at the given price.
	///
	/// The session address must own the token. If the settlement contract
	/// is not yet approved as an operator for the collection, an approval
	/// transaction is sent and awaited first. The signed order and its
	/// on-chain hash are written to the store; the token itself stays in
	/// the seller's wallet.
	pub async fn list(
		&self,
		session: &Session,
		token_id: TokenId,
		price: Decimal,
	) -> Result<Fingerprint, MarketError> {
		ensure_positive(&price)?;

		let owner = self.executor.owner_of(&token_id).await?;
		if owner != session.address {
			return Err(MarketError::NotOwner(token_id));
		}

		self.ensure_approval(session).await?;

		let fingerprint = self.place_listing(session, token_id, price).await?;
		self.event_bus
			.publish(MarketEvent::Listing(ListingEvent::Created {
				token_id,
				price,
				fingerprint,
			}))
			.ok();

		tracing::info!(%token_id, %price, %fingerprint, "listing created");
		Ok(fingerprint)
	}

	/// Re-lists an already listed token at a new price.
	///
	/// Only the recorded seller may change the price, and they must still
	/// own the token; a lapsed approval is re-granted just as on a first
	/// listing. A fresh order is signed, so the fingerprint changes.
	pub async fn update_price(
		&self,
		session: &Session,
		token_id: TokenId,
		price: Decimal,
	) -> Result<Fingerprint, MarketError> {
		ensure_positive(&price)?;

		let record = self
			.store
			.get(&token_id)
			.await?
			.ok_or(MarketError::NotListed(token_id))?;
		if !record.is_listed() {
			return Err(MarketError::NotListed(token_id));
		}
		if record.seller_address != Some(session.address) {
			return Err(MarketError::NotSeller(token_id));
		}

		// Re-pricing signs a fresh order, so it needs the same chain
		// preconditions as a first listing: current ownership and a live
		// transfer approval for the settlement contract.
		let owner = self.executor.owner_of(&token_id).await?;
		if owner != session.address {
			return Err(MarketError::NotOwner(token_id));
		}
		self.ensure_approval(session).await?;

		let fingerprint = self.place_listing(session, token_id, price).await?;
		self.event_bus
			.publish(MarketEvent::Listing(ListingEvent::PriceUpdated {
				token_id,
				price,
				fingerprint,
			}))
			.ok();

		tracing::info!(%token_id, %price, %fingerprint, "listing re-priced");
		Ok(fingerprint)
	}

	/// Buys a listed token with the session address.
	///
	/// The stored order is re-normalized and verified against the
	/// settlement contract's own order hash before any funds move. The
	/// transaction value is always the engine's own valuation of the
	/// order's native consideration. The store is only written once the
	/// settlement transaction has succeeded; every failure leaves the row
	/// exactly as it was.
	pub async fn buy(
		&self,
		session: &Session,
		token_id: TokenId,
	) -> Result<SaleOutcome, MarketError> {
		let record = self
			.store
			.get(&token_id)
			.await?
			.ok_or(MarketError::NotListed(token_id))?;
		if !record.is_listed() {
			return Err(MarketError::NotListed(token_id));
		}
		if record.seller_address == Some(session.address) {
			return Err(MarketError::SelfPurchase);
		}

		self.event_bus
			.publish(MarketEvent::Purchase(PurchaseEvent::Started {
				token_id,
				buyer: session.address,
			}))
			.ok();

		match self.execute_purchase(session, token_id, record).await {
			Ok(outcome) => {
				self.event_bus
					.publish(MarketEvent::Purchase(PurchaseEvent::Completed {
						token_id,
						buyer: session.address,
						tx_hash: outcome.tx_hash,
					}))
					.ok();
				tracing::info!(%token_id, tx_hash = %outcome.tx_hash, "purchase completed");
				Ok(outcome)
			}
			Err(err) => {
				self.event_bus
					.publish(MarketEvent::Purchase(PurchaseEvent::Failed {
						token_id,
						reason: err.to_string(),
					}))
					.ok();
				tracing::warn!(%token_id, error = %err, "purchase failed");
				Err(err)
			}
		}
	}

	async fn execute_purchase(
		&self,
		session: &Session,
		token_id: TokenId,
		record: ListingRecord,
	) -> Result<SaleOutcome, MarketError> {
		let raw_order = record.order.as_ref().ok_or(MarketError::NotListed(token_id))?;

		// The store is untrusted; re-derive the order from the raw row.
		let order = normalize_order(raw_order)?;

		let computed = self.executor.order_fingerprint(&order.parameters).await?;
		verify_fingerprint(computed, record.order_fingerprint.as_ref())?;

		let settlement = self.executor.settlement_contract();
		if !self
			.executor
			.is_approved(order.parameters.offerer, settlement)
			.await?
		{
			return Err(MarketError::ApprovalRevoked);
		}

		let amount = settlement_value(&order.parameters)?;

		let available = self.executor.native_balance(session.address).await?;
		if available < amount.0 {
			return Err(MarketError::InsufficientFunds {
				required: amount,
				available: Uint::from(available),
			});
		}

		// The transaction value is our own valuation, never a value the
		// draft or the store suggested.
		let draft = self.executor.build_fulfillment(&order, session.address).await?;
		let mut tx = Transaction {
			to: draft.to,
			data: draft.data,
			value: amount.0,
			gas_limit: None,
		};

		let quote = gas::quote(&self.executor, &tx, &self.settings.gas).await;
		if quote.requires_confirmation() {
			let prompt = format!(
				"Gas estimation is unavailable. Submit with a fixed limit of {} gas?",
				quote.limit()
			);
			if !session.confirm(&prompt).await {
				return Err(MarketError::UserRejected);
			}
			self.event_bus
				.publish(MarketEvent::Purchase(PurchaseEvent::FallbackGasConfirmed {
					token_id,
					gas_limit: quote.limit(),
				}))
				.ok();
		}
		tx = tx.with_gas_limit(quote.limit());

		let tx_hash = self.executor.send_transaction(tx).await?;
		self.event_bus
			.publish(MarketEvent::Purchase(PurchaseEvent::TransactionPending {
				token_id,
				tx_hash,
			}))
			.ok();

		let receipt = self.executor.wait_for_inclusion(&tx_hash).await?;
		if !receipt.success {
			return Err(MarketError::Chain(format!(
				"settlement transaction {} reverted",
				tx_hash
			)));
		}

		self.store
			.complete_sale(SaleReport {
				token_id,
				fingerprint: computed,
				buyer_address: session.address,
				price: record.price,
			})
			.await?;

		Ok(SaleOutcome { tx_hash, amount })
	}

	async fn ensure_approval(&self, session: &Session) -> Result<(), MarketError> {
		let settlement = self.executor.settlement_contract();
		if self
			.executor
			.is_approved(session.address, settlement)
			.await?
		{
			return Ok(());
		}

		tracing::info!(operator = %settlement, "granting collection approval");
		let tx_hash = self.executor.set_approval(settlement, true).await?;
		self.event_bus
			.publish(MarketEvent::Listing(ListingEvent::ApprovalRequested {
				seller: session.address,
				tx_hash,
			}))
			.ok();

		let receipt = self.executor.wait_for_inclusion(&tx_hash).await?;
		if !receipt.success {
			return Err(MarketError::Chain(
				"approval transaction reverted".to_string(),
			));
		}
		Ok(())
	}

	async fn place_listing(
		&self,
		session: &Session,
		token_id: TokenId,
		price: Decimal,
	) -> Result<Fingerprint, MarketError> {
		let amount =
			Uint::from_native(&price).map_err(|e| MarketError::InvalidPrice(e.to_string()))?;
		let start_time = Utc::now().timestamp().max(0) as u64;

		let input = listing_order_input(
			self.executor.collection_contract(),
			token_id,
			amount,
			session.address,
			start_time,
			self.settings.listing_duration_secs,
		);

		let order = self.executor.create_order(&input, session.address).await?;
		let fingerprint = self.executor.order_fingerprint(&order.parameters).await?;

		let order_value = serde_json::to_value(&order)
			.map_err(|e| MarketError::Store(market_store::StoreError::Serialization(e.to_string())))?;

		self.store
			.upsert_listing(NewListing {
				token_id,
				price,
				seller_address: session.address,
				order: order_value,
				fingerprint,
			})
			.await?;

		Ok(fingerprint)
	}
}

fn ensure_positive(price: &Decimal) -> Result<(), MarketError> {
	if *price <= Decimal::ZERO {
		return Err(MarketError::InvalidPrice(
			"price must be greater than zero".to_string(),
		));
	}
	Ok(())
}

/// Builder that wires the engine from already constructed services.
pub struct EngineBuilder {
	settings: EngineSettings,
	executor: Option<Arc<ExecutorService>>,
	store: Option<Arc<StoreService>>,
	event_capacity: usize,
}

impl EngineBuilder {
	pub fn new(settings: EngineSettings) -> Self {
		Self {
			settings,
			executor: None,
			store: None,
			event_capacity: 1000,
		}
	}

	pub fn with_executor(mut self, executor: Arc<ExecutorService>) -> Self {
		self.executor = Some(executor);
		self
	}

	pub fn with_store(mut self, store: Arc<StoreService>) -> Self {
		self.store = Some(store);
		self
	}

	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}

	pub fn build(self) -> Result<MarketplaceEngine, MarketError> {
		let executor = self
			.executor
			.ok_or_else(|| MarketError::Config("Executor not provided".into()))?;
		let store = self
			.store
			.ok_or_else(|| MarketError::Config("Store not provided".into()))?;

		Ok(MarketplaceEngine {
			executor,
			store,
			settings: self.settings,
			event_bus: EventBus::new(self.event_capacity),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use market_chain::{ExecutorError, ExecutorInterface};
	use market_session::AutoConfirm;
	use market_store::MemoryStore;
	use market_types::{
		Address, Bytes, Bytes32, ConsiderationItem, FulfillmentDraft, OfferItem, OrderInput,
		OrderKind, OrderParameters, SignedOrder, TransactionReceipt, U256,
	};
	use std::sync::Mutex;

	const SELLER: Address = Address::repeat_byte(0x11);
	const BUYER: Address = Address::repeat_byte(0x22);
	const OTHER: Address = Address::repeat_byte(0x33);
	const COLLECTION: Address = Address::repeat_byte(0x54);
	const SETTLEMENT: Address = Address::repeat_byte(0x5e);

	struct MockShared {
		owner: Mutex<Address>,
		approved: Mutex<bool>,
		balance: Mutex<U256>,
		estimate_fails: Mutex<bool>,
		revert: Mutex<bool>,
		sent: Mutex<Vec<Transaction>>,
		approvals: Mutex<Vec<(Address, bool)>>,
	}

	impl MockShared {
		fn new() -> Arc<Self> {
			Arc::new(Self {
				owner: Mutex::new(SELLER),
				approved: Mutex::new(true),
				balance: Mutex::new(U256::from(10_000_000_000_000_000_000u128)),
				estimate_fails: Mutex::new(false),
				revert: Mutex::new(false),
				sent: Mutex::new(Vec::new()),
				approvals: Mutex::new(Vec::new()),
			})
		}
	}

	struct MockExecutor {
		shared: Arc<MockShared>,
	}

	fn mock_parameters(input: &OrderInput, seller: Address) -> OrderParameters {
		OrderParameters {
			offerer: seller,
			zone: Address::ZERO,
			offer: input
				.offer
				.iter()
				.map(|item| OfferItem {
					kind: item.kind,
					token: item.token,
					identifier_or_criteria: item.identifier,
					start_amount: item.amount,
					end_amount: item.amount,
				})
				.collect(),
			consideration: input
				.consideration
				.iter()
				.map(|item| ConsiderationItem {
					kind: item.kind,
					token: item.token,
					identifier_or_criteria: item.identifier,
					start_amount: item.amount,
					end_amount: item.amount,
					recipient: item.recipient.unwrap_or(Address::ZERO),
				})
				.collect(),
			order_type: OrderKind::FullOpen,
			start_time: input.start_time,
			end_time: input.end_time,
			zone_hash: Bytes32::ZERO,
			salt: input.salt,
			conduit_key: Bytes32::ZERO,
			total_original_consideration_items: input.consideration.len() as u64,
		}
	}

	fn mock_fingerprint(parameters: &OrderParameters) -> Fingerprint {
		let bytes = serde_json::to_vec(parameters).unwrap();
		let mut out = [0u8; 32];
		for (i, byte) in bytes.iter().enumerate() {
			out[i % 32] ^= *byte;
			out[(i + 7) % 32] = out[(i + 7) % 32].wrapping_add(*byte);
		}
		Bytes32::from(out)
	}

	#[async_trait]
	impl ExecutorInterface for MockExecutor {
		fn settlement_contract(&self) -> Address {
			SETTLEMENT
		}

		fn collection_contract(&self) -> Address {
			COLLECTION
		}

		async fn signer_address(&self) -> Result<Address, ExecutorError> {
			Ok(SELLER)
		}

		async fn owner_of(&self, _token_id: &TokenId) -> Result<Address, ExecutorError> {
			Ok(*self.shared.owner.lock().unwrap())
		}

		async fn is_approved(
			&self,
			_owner: Address,
			_operator: Address,
		) -> Result<bool, ExecutorError> {
			Ok(*self.shared.approved.lock().unwrap())
		}

		async fn set_approval(
			&self,
			operator: Address,
			approved: bool,
		) -> Result<TxHash, ExecutorError> {
			self.shared.approvals.lock().unwrap().push((operator, approved));
			*self.shared.approved.lock().unwrap() = approved;
			Ok(Bytes32::repeat_byte(0xa1))
		}

		async fn create_order(
			&self,
			input: &OrderInput,
			seller: Address,
		) -> Result<SignedOrder, ExecutorError> {
			Ok(SignedOrder {
				parameters: mock_parameters(input, seller),
				signature: Bytes::from(vec![0x55; 65]),
			})
		}

		async fn order_fingerprint(
			&self,
			parameters: &OrderParameters,
		) -> Result<Fingerprint, ExecutorError> {
			Ok(mock_fingerprint(parameters))
		}

		async fn build_fulfillment(
			&self,
			order: &SignedOrder,
			_buyer: Address,
		) -> Result<FulfillmentDraft, ExecutorError> {
			let suggested_value = order
				.parameters
				.consideration
				.iter()
				.filter(|item| item.kind.is_native())
				.fold(U256::ZERO, |total, item| {
					total.saturating_add(item.end_amount.0)
				});
			Ok(FulfillmentDraft {
				to: SETTLEMENT,
				data: Bytes::from(vec![0xfb, 0x01, 0x02, 0x03]),
				suggested_value,
			})
		}

		async fn native_balance(&self, _address: Address) -> Result<U256, ExecutorError> {
			Ok(*self.shared.balance.lock().unwrap())
		}

		async fn estimate_gas(&self, _tx: &Transaction) -> Result<u64, ExecutorError> {
			if *self.shared.estimate_fails.lock().unwrap() {
				Err(ExecutorError::Rpc("estimation failed".to_string()))
			} else {
				Ok(100_000)
			}
		}

		async fn send_transaction(&self, tx: Transaction) -> Result<TxHash, ExecutorError> {
			self.shared.sent.lock().unwrap().push(tx);
			Ok(Bytes32::repeat_byte(0x77))
		}

		async fn wait_for_inclusion(
			&self,
			hash: &TxHash,
		) -> Result<TransactionReceipt, ExecutorError> {
			Ok(TransactionReceipt {
				hash: *hash,
				block_number: 1,
				success: !*self.shared.revert.lock().unwrap(),
			})
		}
	}

	struct Harness {
		engine: MarketplaceEngine,
		store: Arc<StoreService>,
		shared: Arc<MockShared>,
		seller: Session,
		buyer: Session,
	}

	fn harness() -> Harness {
		harness_confirming(true)
	}

	fn harness_confirming(accept_fallback: bool) -> Harness {
		let shared = MockShared::new();
		let executor = Arc::new(ExecutorService::new(Box::new(MockExecutor {
			shared: Arc::clone(&shared),
		})));
		let store = Arc::new(StoreService::new(Box::new(MemoryStore::new())));
		let engine = MarketplaceEngine::new(
			Arc::clone(&executor),
			Arc::clone(&store),
			EngineSettings::default(),
		);
		Harness {
			engine,
			store,
			shared,
			seller: Session::new(SELLER, Arc::new(AutoConfirm::new(true))),
			buyer: Session::new(BUYER, Arc::new(AutoConfirm::new(accept_fallback))),
		}
	}

	fn price(s: &str) -> Decimal {
		s.parse().unwrap()
	}

	fn token(id: u64) -> TokenId {
		Uint::from(id)
	}

	async fn seed_listing(h: &Harness, token_id: TokenId, price_str: &str, fingerprint: Fingerprint) {
		let amount = Uint::from_native(&price(price_str)).unwrap();
		let input = listing_order_input(
			COLLECTION,
			token_id,
			amount,
			SELLER,
			1_700_000_000,
			2_592_000,
		);
		let signed = SignedOrder {
			parameters: mock_parameters(&input, SELLER),
			signature: Bytes::from(vec![0x55; 65]),
		};
		h.store
			.upsert_listing(NewListing {
				token_id,
				price: price(price_str),
				seller_address: SELLER,
				order: serde_json::to_value(&signed).unwrap(),
				fingerprint,
			})
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn test_list_creates_listing() {
		let h = harness();
		let fingerprint = h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();

		let row = h.store.get(&token(42)).await.unwrap().unwrap();
		assert!(row.is_listed());
		assert_eq!(row.price, Some(price("1.5")));
		assert_eq!(row.seller_address, Some(SELLER));
		assert_eq!(row.order_fingerprint, Some(fingerprint));
		assert!(!row.on_chain);
		assert!(h.shared.approvals.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_list_grants_missing_approval() {
		let h = harness();
		*h.shared.approved.lock().unwrap() = false;

		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();

		let approvals = h.shared.approvals.lock().unwrap();
		assert_eq!(approvals.len(), 1);
		assert_eq!(approvals[0], (SETTLEMENT, true));
	}

	#[tokio::test]
	async fn test_list_rejects_non_owner() {
		let h = harness();
		*h.shared.owner.lock().unwrap() = OTHER;

		let err = h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap_err();
		assert!(matches!(err, MarketError::NotOwner(_)));
		assert!(h.store.get(&token(42)).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_list_rejects_non_positive_price() {
		let h = harness();
		let err = h.engine.list(&h.seller, token(42), price("0")).await.unwrap_err();
		assert!(matches!(err, MarketError::InvalidPrice(_)));

		let err = h.engine.list(&h.seller, token(42), price("-1")).await.unwrap_err();
		assert!(matches!(err, MarketError::InvalidPrice(_)));
	}

	#[tokio::test]
	async fn test_update_price_requires_listed_row_and_seller() {
		let h = harness();

		let err = h
			.engine
			.update_price(&h.seller, token(42), price("2"))
			.await
			.unwrap_err();
		assert!(matches!(err, MarketError::NotListed(_)));

		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();

		let stranger = Session::new(OTHER, Arc::new(AutoConfirm::new(true)));
		let err = h
			.engine
			.update_price(&stranger, token(42), price("2"))
			.await
			.unwrap_err();
		assert!(matches!(err, MarketError::NotSeller(_)));

		let row = h.store.get(&token(42)).await.unwrap().unwrap();
		assert_eq!(row.price, Some(price("1.5")));
	}

	#[tokio::test]
	async fn test_update_price_restores_missing_approval() {
		let h = harness();
		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();
		*h.shared.approved.lock().unwrap() = false;

		h.engine
			.update_price(&h.seller, token(42), price("2"))
			.await
			.unwrap();

		let approvals = h.shared.approvals.lock().unwrap();
		assert_eq!(approvals.len(), 1);
		assert_eq!(approvals[0], (SETTLEMENT, true));
	}

	#[tokio::test]
	async fn test_update_price_rejects_departed_owner() {
		let h = harness();
		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();
		// The token left the seller's wallet after the listing was written.
		*h.shared.owner.lock().unwrap() = OTHER;

		let err = h
			.engine
			.update_price(&h.seller, token(42), price("2"))
			.await
			.unwrap_err();
		assert!(matches!(err, MarketError::NotOwner(_)));

		let row = h.store.get(&token(42)).await.unwrap().unwrap();
		assert_eq!(row.price, Some(price("1.5")));
	}

	#[tokio::test]
	async fn test_update_price_resigns_order() {
		let h = harness();
		let first = h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();
		let second = h
			.engine
			.update_price(&h.seller, token(42), price("2"))
			.await
			.unwrap();

		assert_ne!(first, second);
		let row = h.store.get(&token(42)).await.unwrap().unwrap();
		assert_eq!(row.price, Some(price("2")));
		assert_eq!(row.order_fingerprint, Some(second));
	}

	#[tokio::test]
	async fn test_buy_settles_and_records_sale() {
		let h = harness();
		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();

		let outcome = h.engine.buy(&h.buyer, token(42)).await.unwrap();
		assert_eq!(outcome.amount, Uint::from_native(&price("1.5")).unwrap());

		let sent = h.shared.sent.lock().unwrap();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].to, SETTLEMENT);
		assert_eq!(sent[0].value, U256::from(1_500_000_000_000_000_000u64));
		// 100k estimate plus the 20 percent margin
		assert_eq!(sent[0].gas_limit, Some(120_000));
		drop(sent);

		let row = h.store.get(&token(42)).await.unwrap().unwrap();
		assert!(!row.is_listed());
		assert!(row.on_chain);
		assert_eq!(row.buyer_address, Some(BUYER));
		assert!(row.order.is_none());
	}

	#[tokio::test]
	async fn test_buy_rejects_unlisted_token() {
		let h = harness();
		let err = h.engine.buy(&h.buyer, token(42)).await.unwrap_err();
		assert!(matches!(err, MarketError::NotListed(_)));
	}

	#[tokio::test]
	async fn test_buy_rejects_self_purchase() {
		let h = harness();
		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();

		let err = h.engine.buy(&h.seller, token(42)).await.unwrap_err();
		assert!(matches!(err, MarketError::SelfPurchase));
		assert!(h.store.get(&token(42)).await.unwrap().unwrap().is_listed());
	}

	#[tokio::test]
	async fn test_buy_detects_fingerprint_mismatch() {
		let h = harness();
		seed_listing(&h, token(42), "1.5", Bytes32::repeat_byte(0xbb)).await;

		let err = h.engine.buy(&h.buyer, token(42)).await.unwrap_err();
		assert!(matches!(err, MarketError::Integrity(_)));
		assert!(err.requires_relist());
		assert!(h.shared.sent.lock().unwrap().is_empty());
		assert!(h.store.get(&token(42)).await.unwrap().unwrap().is_listed());
	}

	#[tokio::test]
	async fn test_buy_rejects_malformed_stored_order() {
		let h = harness();
		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();

		// Corrupt the stored row the way a buggy writer would: a decimal
		// string where an integer amount belongs.
		let row = h.store.get(&token(42)).await.unwrap().unwrap();
		let mut raw = row.order.clone().unwrap();
		raw["parameters"]["consideration"][0]["endAmount"] = serde_json::json!("1.5");
		h.store
			.upsert_listing(NewListing {
				token_id: token(42),
				price: price("1.5"),
				seller_address: SELLER,
				order: raw,
				fingerprint: row.order_fingerprint.unwrap(),
			})
			.await
			.unwrap();

		let err = h.engine.buy(&h.buyer, token(42)).await.unwrap_err();
		assert!(matches!(err, MarketError::Normalize(_)));
		assert!(err.requires_relist());
		assert!(h.shared.sent.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_buy_detects_revoked_approval() {
		let h = harness();
		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();
		*h.shared.approved.lock().unwrap() = false;

		let err = h.engine.buy(&h.buyer, token(42)).await.unwrap_err();
		assert!(matches!(err, MarketError::ApprovalRevoked));
		assert!(!err.requires_relist());
		assert!(h.shared.sent.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_buy_rejects_insufficient_funds() {
		let h = harness();
		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();
		*h.shared.balance.lock().unwrap() = U256::from(1u64);

		let err = h.engine.buy(&h.buyer, token(42)).await.unwrap_err();
		match err {
			MarketError::InsufficientFunds { required, available } => {
				assert_eq!(required, Uint::from_native(&price("1.5")).unwrap());
				assert_eq!(available, Uint::from(1));
			}
			other => panic!("unexpected error: {other:?}"),
		}
		assert!(h.shared.sent.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_buy_declined_fallback_sends_nothing() {
		let h = harness_confirming(false);
		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();
		*h.shared.estimate_fails.lock().unwrap() = true;

		let err = h.engine.buy(&h.buyer, token(42)).await.unwrap_err();
		assert!(matches!(err, MarketError::UserRejected));
		assert!(h.shared.sent.lock().unwrap().is_empty());
		assert!(h.store.get(&token(42)).await.unwrap().unwrap().is_listed());
	}

	#[tokio::test]
	async fn test_buy_accepted_fallback_uses_fixed_limit() {
		let h = harness_confirming(true);
		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();
		*h.shared.estimate_fails.lock().unwrap() = true;

		let mut events = h.engine.event_bus().subscribe();
		h.engine.buy(&h.buyer, token(42)).await.unwrap();

		let sent = h.shared.sent.lock().unwrap();
		assert_eq!(sent[0].gas_limit, Some(500_000));
		drop(sent);

		let mut saw_fallback = false;
		while let Ok(event) = events.try_recv() {
			if matches!(
				event,
				MarketEvent::Purchase(PurchaseEvent::FallbackGasConfirmed { gas_limit: 500_000, .. })
			) {
				saw_fallback = true;
			}
		}
		assert!(saw_fallback);
	}

	#[tokio::test]
	async fn test_buy_revert_leaves_store_untouched() {
		let h = harness();
		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();
		*h.shared.revert.lock().unwrap() = true;

		let err = h.engine.buy(&h.buyer, token(42)).await.unwrap_err();
		assert!(matches!(err, MarketError::Chain(_)));

		let row = h.store.get(&token(42)).await.unwrap().unwrap();
		assert!(row.is_listed());
		assert!(!row.on_chain);
		assert!(row.buyer_address.is_none());
	}

	#[tokio::test]
	async fn test_buy_publishes_lifecycle_events() {
		let h = harness();
		h.engine.list(&h.seller, token(42), price("1.5")).await.unwrap();

		let mut events = h.engine.event_bus().subscribe();
		h.engine.buy(&h.buyer, token(42)).await.unwrap();

		assert!(matches!(
			events.recv().await.unwrap(),
			MarketEvent::Purchase(PurchaseEvent::Started { buyer, .. }) if buyer == BUYER
		));
		assert!(matches!(
			events.recv().await.unwrap(),
			MarketEvent::Purchase(PurchaseEvent::TransactionPending { .. })
		));
		assert!(matches!(
			events.recv().await.unwrap(),
			MarketEvent::Purchase(PurchaseEvent::Completed { buyer, .. }) if buyer == BUYER
		));
	}

	#[tokio::test]
	async fn test_builder_requires_services() {
		let result = EngineBuilder::new(EngineSettings::default()).build();
		assert!(matches!(result, Err(MarketError::Config(_))));
	}
}
