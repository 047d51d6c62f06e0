//! Normalization of untrusted order payloads into the canonical model.
//!
//! Payloads arrive from wallets, stores, and third-party tooling in loosely
//! typed JSON: amounts as integers, strings, or wrapped big-integer objects;
//! optional fields absent or null; the order itself sometimes nested under an
//! `order` key. [`normalize_order`] maps all of that onto [`SignedOrder`] or
//! rejects it. Unknown shapes are errors, never silent coercions, and
//! normalizing an already-canonical order yields an equal value.

use serde_json::{Map, Value};
use thiserror::Error;

use market_types::{
	Address, Bytes, Bytes32, ConsiderationItem, ItemKind, MalformedNumber, OfferItem, OrderKind,
	OrderParameters, SignedOrder, Uint,
};

/// Reasons an untrusted payload cannot be read as a canonical order.
#[derive(Debug, Error)]
pub enum NormalizeError {
	#[error("order payload is not a JSON object")]
	NotAnObject,
	#[error("order payload has no parameters object")]
	MissingParameters,
	#[error("missing required field: {0}")]
	MissingField(&'static str),
	#[error("field {0} is not an array")]
	NotAnArray(&'static str),
	#[error("{side} item {index} is not an object")]
	NotAnItem { side: &'static str, index: usize },
	#[error("numeric field {field}: {source}")]
	Number {
		field: String,
		#[source]
		source: MalformedNumber,
	},
	#[error("field {field} is not an address: {value}")]
	BadAddress { field: String, value: String },
	#[error("field {field} is not a 32-byte hex value: {value}")]
	BadHash { field: String, value: String },
	#[error("signature is not a hex byte string")]
	BadSignature,
	#[error("unknown {label} code: {value}")]
	UnknownCode { label: &'static str, value: String },
	#[error("consideration item {0} has no recipient")]
	MissingRecipient(usize),
	#[error("startTime {start} is not before endTime {end}")]
	InvalidWindow { start: Uint, end: Uint },
}

/// Builds a canonical signed order from an untrusted payload.
///
/// The payload may be the order itself or may wrap it under an `order` key.
/// Defaults follow the settlement protocol: absent `zone` becomes the zero
/// address, absent `zoneHash`/`conduitKey` the zero hash, and an absent
/// `totalOriginalConsiderationItems` the consideration length.
pub fn normalize_order(payload: &Value) -> Result<SignedOrder, NormalizeError> {
	let body = unwrap_order(payload)?;
	let raw_parameters = body
		.get("parameters")
		.and_then(Value::as_object)
		.ok_or(NormalizeError::MissingParameters)?;

	let signature = parse_signature(body)?;
	let parameters = normalize_parameters(raw_parameters)?;
	if parameters.start_time >= parameters.end_time {
		return Err(NormalizeError::InvalidWindow {
			start: parameters.start_time,
			end: parameters.end_time,
		});
	}

	Ok(SignedOrder {
		parameters,
		signature,
	})
}

fn unwrap_order(payload: &Value) -> Result<&Map<String, Value>, NormalizeError> {
	let object = payload.as_object().ok_or(NormalizeError::NotAnObject)?;
	match object.get("order") {
		Some(inner) => inner.as_object().ok_or(NormalizeError::NotAnObject),
		None => Ok(object),
	}
}

fn normalize_parameters(params: &Map<String, Value>) -> Result<OrderParameters, NormalizeError> {
	let offerer = address_at(required(params, "offerer")?, "offerer")?;
	let zone = optional_address(params, "zone")?;

	let offer = array_at(params, "offer")?
		.iter()
		.enumerate()
		.map(|(index, item)| offer_item(item, index))
		.collect::<Result<Vec<_>, _>>()?;
	let consideration = array_at(params, "consideration")?
		.iter()
		.enumerate()
		.map(|(index, item)| consideration_item(item, index))
		.collect::<Result<Vec<_>, _>>()?;

	let order_type = order_kind(required(params, "orderType")?)?;
	let start_time = uint_at(required(params, "startTime")?, "startTime")?;
	let end_time = uint_at(required(params, "endTime")?, "endTime")?;
	let zone_hash = optional_hash(params, "zoneHash")?;
	let salt = uint_at(required(params, "salt")?, "salt")?;
	let conduit_key = optional_hash(params, "conduitKey")?;

	let total_original_consideration_items =
		match params.get("totalOriginalConsiderationItems").filter(|v| !v.is_null()) {
			Some(value) => {
				let total = uint_at(value, "totalOriginalConsiderationItems")?;
				u64::try_from(total.0).map_err(|_| NormalizeError::Number {
					field: "totalOriginalConsiderationItems".to_string(),
					source: MalformedNumber::Overflow(total.to_string()),
				})?
			}
			None => consideration.len() as u64,
		};

	Ok(OrderParameters {
		offerer,
		zone,
		offer,
		consideration,
		order_type,
		start_time,
		end_time,
		zone_hash,
		salt,
		conduit_key,
		total_original_consideration_items,
	})
}

fn offer_item(value: &Value, index: usize) -> Result<OfferItem, NormalizeError> {
	let item = value.as_object().ok_or(NormalizeError::NotAnItem {
		side: "offer",
		index,
	})?;
	let path = |field: &str| format!("offer[{index}].{field}");

	Ok(OfferItem {
		kind: item_kind(kind_value(item, index, "offer")?)?,
		token: address_at(required(item, "token")?, &path("token"))?,
		identifier_or_criteria: uint_at(
			required(item, "identifierOrCriteria")?,
			&path("identifierOrCriteria"),
		)?,
		start_amount: uint_at(required(item, "startAmount")?, &path("startAmount"))?,
		end_amount: uint_at(required(item, "endAmount")?, &path("endAmount"))?,
	})
}

fn consideration_item(value: &Value, index: usize) -> Result<ConsiderationItem, NormalizeError> {
	let item = value.as_object().ok_or(NormalizeError::NotAnItem {
		side: "consideration",
		index,
	})?;
	let path = |field: &str| format!("consideration[{index}].{field}");

	let recipient = item
		.get("recipient")
		.filter(|v| !v.is_null())
		.ok_or(NormalizeError::MissingRecipient(index))?;

	Ok(ConsiderationItem {
		kind: item_kind(kind_value(item, index, "consideration")?)?,
		token: address_at(required(item, "token")?, &path("token"))?,
		identifier_or_criteria: uint_at(
			required(item, "identifierOrCriteria")?,
			&path("identifierOrCriteria"),
		)?,
		start_amount: uint_at(required(item, "startAmount")?, &path("startAmount"))?,
		end_amount: uint_at(required(item, "endAmount")?, &path("endAmount"))?,
		recipient: address_at(recipient, &path("recipient"))?,
	})
}

/// Accepts both the canonical `itemKind` key and the raw protocol's
/// `itemType`.
fn kind_value<'a>(
	item: &'a Map<String, Value>,
	index: usize,
	side: &'static str,
) -> Result<&'a Value, NormalizeError> {
	item.get("itemKind")
		.or_else(|| item.get("itemType"))
		.filter(|v| !v.is_null())
		.ok_or(NormalizeError::NotAnItem { side, index })
}

fn item_kind(value: &Value) -> Result<ItemKind, NormalizeError> {
	let raw = uint_at(value, "itemKind")?;
	let code = u8::try_from(raw.0).map_err(|_| NormalizeError::UnknownCode {
		label: "item kind",
		value: raw.to_string(),
	})?;
	ItemKind::try_from(code).map_err(|err| NormalizeError::UnknownCode {
		label: err.label,
		value: err.code.to_string(),
	})
}

fn order_kind(value: &Value) -> Result<OrderKind, NormalizeError> {
	let raw = uint_at(value, "orderType")?;
	let code = u8::try_from(raw.0).map_err(|_| NormalizeError::UnknownCode {
		label: "order kind",
		value: raw.to_string(),
	})?;
	OrderKind::try_from(code).map_err(|err| NormalizeError::UnknownCode {
		label: err.label,
		value: err.code.to_string(),
	})
}

fn parse_signature(body: &Map<String, Value>) -> Result<Bytes, NormalizeError> {
	let value = body
		.get("signature")
		.filter(|v| !v.is_null())
		.ok_or(NormalizeError::MissingField("signature"))?;
	let text = value.as_str().ok_or(NormalizeError::BadSignature)?;
	text.parse::<Bytes>().map_err(|_| NormalizeError::BadSignature)
}

fn required<'a>(
	map: &'a Map<String, Value>,
	field: &'static str,
) -> Result<&'a Value, NormalizeError> {
	map.get(field)
		.filter(|v| !v.is_null())
		.ok_or(NormalizeError::MissingField(field))
}

fn array_at<'a>(
	map: &'a Map<String, Value>,
	field: &'static str,
) -> Result<&'a Vec<Value>, NormalizeError> {
	match map.get(field).filter(|v| !v.is_null()) {
		Some(value) => value.as_array().ok_or(NormalizeError::NotAnArray(field)),
		None => Err(NormalizeError::MissingField(field)),
	}
}

fn uint_at(value: &Value, field: &str) -> Result<Uint, NormalizeError> {
	Uint::canonicalize(value).map_err(|source| NormalizeError::Number {
		field: field.to_string(),
		source,
	})
}

fn address_at(value: &Value, field: &str) -> Result<Address, NormalizeError> {
	let bad = || NormalizeError::BadAddress {
		field: field.to_string(),
		value: value.to_string(),
	};
	let text = value.as_str().ok_or_else(bad)?;
	text.trim().parse::<Address>().map_err(|_| bad())
}

fn optional_address(
	map: &Map<String, Value>,
	field: &'static str,
) -> Result<Address, NormalizeError> {
	match map.get(field).filter(|v| !v.is_null()) {
		Some(value) => address_at(value, field),
		None => Ok(Address::ZERO),
	}
}

fn optional_hash(map: &Map<String, Value>, field: &'static str) -> Result<Bytes32, NormalizeError> {
	match map.get(field).filter(|v| !v.is_null()) {
		Some(value) => {
			let bad = || NormalizeError::BadHash {
				field: field.to_string(),
				value: value.to_string(),
			};
			let text = value.as_str().ok_or_else(bad)?;
			text.trim().parse::<Bytes32>().map_err(|_| bad())
		}
		None => Ok(Bytes32::ZERO),
	}
}
