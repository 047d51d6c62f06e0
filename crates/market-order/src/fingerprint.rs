//! Verification of a freshly computed order fingerprint against the one
//! recorded with a listing.
//!
//! The fingerprint itself comes from the settlement protocol's own hash
//! function, reached through the chain executor; this module only compares.
//! A mismatch means the stored order is not the order that was listed:
//! settlement against it must not be attempted, and the token has to be
//! re-listed.

use thiserror::Error;

use market_types::Fingerprint;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("listing corrupted: recorded fingerprint {recorded} does not match recomputed {computed}; the seller must re-list")]
pub struct IntegrityError {
	pub recorded: Fingerprint,
	pub computed: Fingerprint,
}

/// Checks a recomputed fingerprint against the recorded one, if any.
///
/// A record without a fingerprint passes: there is nothing to contradict,
/// and the chain's own signature validation remains the final gate.
pub fn verify_fingerprint(
	computed: Fingerprint,
	recorded: Option<&Fingerprint>,
) -> Result<Fingerprint, IntegrityError> {
	match recorded {
		Some(stored) if *stored != computed => Err(IntegrityError {
			recorded: *stored,
			computed,
		}),
		_ => Ok(computed),
	}
}
