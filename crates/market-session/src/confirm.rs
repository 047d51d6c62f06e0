//! Confirmation prompts for operations that need explicit approval.

use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Trait for answering yes/no prompts on behalf of the session owner.
#[async_trait]
pub trait ConfirmationInterface: Send + Sync {
	/// Returns true if the operation described by `prompt` may proceed.
	async fn confirm(&self, prompt: &str) -> bool;
}

/// Fixed-answer confirmation, used by non-interactive runs.
pub struct AutoConfirm {
	accept: bool,
}

impl AutoConfirm {
	pub fn new(accept: bool) -> Self {
		Self { accept }
	}
}

#[async_trait]
impl ConfirmationInterface for AutoConfirm {
	async fn confirm(&self, prompt: &str) -> bool {
		tracing::debug!(prompt, accept = self.accept, "auto-answering confirmation");
		self.accept
	}
}

/// Interactive confirmation that asks on the terminal.
///
/// Anything other than an explicit yes, including a read failure, counts
/// as a decline.
pub struct TerminalConfirm;

#[async_trait]
impl ConfirmationInterface for TerminalConfirm {
	async fn confirm(&self, prompt: &str) -> bool {
		print!("{} [y/N]: ", prompt);
		if std::io::stdout().flush().is_err() {
			return false;
		}

		let mut line = String::new();
		let mut reader = BufReader::new(tokio::io::stdin());
		match reader.read_line(&mut line).await {
			Ok(0) => false,
			Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
			Err(_) => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_auto_confirm_answers() {
		assert!(AutoConfirm::new(true).confirm("proceed?").await);
		assert!(!AutoConfirm::new(false).confirm("proceed?").await);
	}
}
