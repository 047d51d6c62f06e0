use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{Address, Fingerprint, TokenId, TxHash};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
	Listing(ListingEvent),
	Purchase(PurchaseEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ListingEvent {
	ApprovalRequested {
		seller: Address,
		tx_hash: TxHash,
	},
	Created {
		token_id: TokenId,
		price: Decimal,
		fingerprint: Fingerprint,
	},
	PriceUpdated {
		token_id: TokenId,
		price: Decimal,
		fingerprint: Fingerprint,
	},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PurchaseEvent {
	Started {
		token_id: TokenId,
		buyer: Address,
	},
	FallbackGasConfirmed {
		token_id: TokenId,
		gas_limit: u64,
	},
	TransactionPending {
		token_id: TokenId,
		tx_hash: TxHash,
	},
	Completed {
		token_id: TokenId,
		buyer: Address,
		tx_hash: TxHash,
	},
	Failed {
		token_id: TokenId,
		reason: String,
	},
}

pub struct EventBus {
	sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
		self.sender.subscribe()
	}

	pub fn publish(
		&self,
		event: MarketEvent,
	) -> Result<(), broadcast::error::SendError<MarketEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Uint;

	#[tokio::test]
	async fn test_publish_reaches_subscribers() {
		let bus = EventBus::new(16);
		let mut receiver = bus.subscribe();

		bus.publish(MarketEvent::Purchase(PurchaseEvent::Started {
			token_id: Uint::from(42),
			buyer: Address::repeat_byte(0x22),
		}))
		.unwrap();

		match receiver.recv().await.unwrap() {
			MarketEvent::Purchase(PurchaseEvent::Started { token_id, .. }) => {
				assert_eq!(token_id, Uint::from(42));
			}
			other => panic!("unexpected event: {other:?}"),
		}
	}
}
