//! Gas limit policy for settlement transactions.
//!
//! A node estimate gets a safety margin on top. When the node cannot
//! estimate at all the purchase may still go ahead with a fixed fallback
//! limit, but only after the session owner explicitly agrees.

use market_chain::ExecutorService;
use market_types::Transaction;

/// Margin and fallback parameters for gas quoting.
#[derive(Debug, Clone)]
pub struct GasPolicy {
	/// Safety margin applied on top of the node's estimate, in percent.
	pub margin_percent: u64,
	/// Gas limit offered when estimation is unavailable.
	pub fallback_limit: u64,
}

impl Default for GasPolicy {
	fn default() -> Self {
		Self {
			margin_percent: 20,
			fallback_limit: 500_000,
		}
	}
}

/// Outcome of a gas estimation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasQuote {
	/// The node produced an estimate; `limit` already includes the margin.
	Estimated { limit: u64 },
	/// Estimation failed; `fallback_limit` needs explicit approval.
	Unavailable { fallback_limit: u64 },
}

impl GasQuote {
	pub fn limit(&self) -> u64 {
		match self {
			Self::Estimated { limit } => *limit,
			Self::Unavailable { fallback_limit } => *fallback_limit,
		}
	}

	/// Fallback limits are only used with the session owner's consent.
	pub fn requires_confirmation(&self) -> bool {
		matches!(self, Self::Unavailable { .. })
	}
}

/// Quotes a gas limit for the given transaction. Estimation failure is
/// not an error here; it degrades to the fallback branch.
pub async fn quote(executor: &ExecutorService, tx: &Transaction, policy: &GasPolicy) -> GasQuote {
	match executor.estimate_gas(tx).await {
		Ok(estimate) => {
			let limit = estimate.saturating_mul(100 + policy.margin_percent) / 100;
			GasQuote::Estimated { limit }
		}
		Err(e) => {
			tracing::warn!(
				error = %e,
				fallback_limit = policy.fallback_limit,
				"gas estimation failed, offering fallback limit"
			);
			GasQuote::Unavailable {
				fallback_limit: policy.fallback_limit,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_quote_limits() {
		let estimated = GasQuote::Estimated { limit: 120_000 };
		assert_eq!(estimated.limit(), 120_000);
		assert!(!estimated.requires_confirmation());

		let fallback = GasQuote::Unavailable {
			fallback_limit: 500_000,
		};
		assert_eq!(fallback.limit(), 500_000);
		assert!(fallback.requires_confirmation());
	}
}
