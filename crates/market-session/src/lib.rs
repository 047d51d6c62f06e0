//! Session context for marketplace operations.
//!
//! A session binds the connected signer's address to a confirmation
//! channel. Engine operations act on behalf of the session address and
//! route any "are you sure" questions through it.

use std::sync::Arc;

use market_chain::{ExecutorError, ExecutorService};
use market_types::Address;

pub mod confirm;

pub use confirm::{AutoConfirm, ConfirmationInterface, TerminalConfirm};

/// The acting identity for listing and purchase operations.
#[derive(Clone)]
pub struct Session {
	/// Address of the connected signer.
	pub address: Address,
	confirmations: Arc<dyn ConfirmationInterface>,
}

impl Session {
	/// Creates a session for a known address.
	pub fn new(address: Address, confirmations: Arc<dyn ConfirmationInterface>) -> Self {
		Self {
			address,
			confirmations,
		}
	}

	/// Creates a session bound to the executor's signer.
	pub async fn connect(
		executor: &ExecutorService,
		confirmations: Arc<dyn ConfirmationInterface>,
	) -> Result<Self, ExecutorError> {
		let address = executor.signer_address().await?;
		tracing::info!(%address, "session connected");
		Ok(Self::new(address, confirmations))
	}

	/// Asks the session owner to approve the operation described by
	/// `prompt`.
	pub async fn confirm(&self, prompt: &str) -> bool {
		self.confirmations.confirm(prompt).await
	}
}
