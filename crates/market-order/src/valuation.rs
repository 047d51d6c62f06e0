//! Settlement valuation: the exact native amount a buyer owes.

use thiserror::Error;

use market_types::{OrderParameters, Uint};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("settlement value exceeds 256 bits")]
pub struct ValueOverflow;

/// Sums `endAmount` over the native-currency consideration items of an
/// order. The end amount is always the one summed: fixed-price listings have
/// equal start and end amounts, and for any price curve the end amount is
/// what settlement actually charges. Exact integer arithmetic throughout.
pub fn settlement_value(parameters: &OrderParameters) -> Result<Uint, ValueOverflow> {
	let mut total = Uint::ZERO;
	for item in &parameters.consideration {
		if item.kind.is_native() {
			total = total.checked_add(&item.end_amount).ok_or(ValueOverflow)?;
		}
	}
	Ok(total)
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_types::{Address, Bytes32, ConsiderationItem, ItemKind, OrderKind, U256};

	fn consideration_item(kind: ItemKind, end_amount: &str) -> ConsiderationItem {
		ConsiderationItem {
			kind,
			token: Address::ZERO,
			identifier_or_criteria: Uint::ZERO,
			start_amount: Uint::ZERO,
			end_amount: end_amount.parse().unwrap(),
			recipient: Address::repeat_byte(0x11),
		}
	}

	fn parameters_with(consideration: Vec<ConsiderationItem>) -> OrderParameters {
		OrderParameters {
			offerer: Address::repeat_byte(0x11),
			zone: Address::ZERO,
			offer: vec![],
			consideration,
			order_type: OrderKind::FullOpen,
			start_time: Uint::from(0),
			end_time: Uint::from(1),
			zone_hash: Bytes32::ZERO,
			salt: Uint::ZERO,
			conduit_key: Bytes32::ZERO,
			total_original_consideration_items: 0,
		}
	}

	#[test]
	fn test_sums_only_native_items() {
		let parameters = parameters_with(vec![
			consideration_item(ItemKind::Native, "9500000000000000000"),
			consideration_item(ItemKind::Erc20, "5"),
			consideration_item(ItemKind::Native, "500000000000000000"),
		]);
		assert_eq!(
			settlement_value(&parameters).unwrap().to_string(),
			"10000000000000000000"
		);
	}

	#[test]
	fn test_uses_end_amount_not_start_amount() {
		let mut item = consideration_item(ItemKind::Native, "2000000000000000000");
		item.start_amount = "1000000000000000000".parse().unwrap();
		let parameters = parameters_with(vec![item]);
		assert_eq!(
			settlement_value(&parameters).unwrap().to_string(),
			"2000000000000000000"
		);
	}

	#[test]
	fn test_no_native_items_is_zero() {
		let parameters = parameters_with(vec![consideration_item(ItemKind::Erc20, "7")]);
		assert_eq!(settlement_value(&parameters).unwrap(), Uint::ZERO);
	}

	#[test]
	fn test_overflow_is_an_error() {
		let max = Uint(U256::MAX);
		let mut a = consideration_item(ItemKind::Native, "1");
		a.end_amount = max;
		let b = consideration_item(ItemKind::Native, "1");
		let parameters = parameters_with(vec![a, b]);
		assert_eq!(settlement_value(&parameters), Err(ValueOverflow));
	}
}
