//! Construction of fixed-price listing orders.

use market_types::{Address, InputItem, ItemKind, OrderInput, TokenId, Uint, U256};

/// Builds the order blueprint for a fixed-price listing: the token itself on
/// the offer side, the full price in native currency to the seller on the
/// consideration side, valid from `start_time` for `duration_secs`.
pub fn listing_order_input(
	collection: Address,
	token_id: TokenId,
	price: Uint,
	seller: Address,
	start_time: u64,
	duration_secs: u64,
) -> OrderInput {
	OrderInput {
		offer: vec![InputItem {
			kind: ItemKind::Erc721,
			token: collection,
			identifier: token_id,
			amount: Uint::from(1),
			recipient: None,
		}],
		consideration: vec![InputItem {
			kind: ItemKind::Native,
			token: Address::ZERO,
			identifier: Uint::ZERO,
			amount: price,
			recipient: Some(seller),
		}],
		start_time: Uint::from(start_time),
		end_time: Uint::from(start_time.saturating_add(duration_secs)),
		salt: random_salt(),
	}
}

/// A fresh 128-bit salt. Uniqueness is what matters; the value is otherwise
/// meaningless.
pub fn random_salt() -> Uint {
	Uint(U256::from(uuid::Uuid::new_v4().as_u128()))
}
