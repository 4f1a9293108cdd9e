//! Turning a decision into a key press, and checking that it took.

use std::time::Duration;

use ie::{ItemRecord, TemplateId};

use crate::{classify::Outcome, config::Keys, input::Controller, vision::Vision};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionResult {
	/// Key sent and the marker showed up.
	Applied,
	/// The echo already carried the marker; nothing was sent.
	AlreadyInState,
	/// Key sent (or sending failed) and the marker didn't show up.
	VerificationFailed,
	/// Nothing to do for this outcome.
	NoAction,
}

pub struct ActionExecutor<'a, C, V> {
	controller: &'a C,
	vision: &'a V,
	keys: Keys,
	settle: Duration,
}

impl<'a, C: Controller, V: Vision> ActionExecutor<'a, C, V> {
	pub fn new(controller: &'a C, vision: &'a V, keys: Keys, settle: Duration) -> Self {
		Self {
			controller,
			vision,
			keys,
			settle,
		}
	}

	/// Lock or discard `item` as `outcome` says. Never retries.
	pub fn apply_outcome(&self, outcome: Outcome, item: &ItemRecord) -> ActionResult {
		let (already, key, icon) = match outcome {
			Outcome::Lock => (item.locked, self.keys.lock, TemplateId::LockedIcon),
			Outcome::Discard => (item.discarded, self.keys.discard, TemplateId::DiscardIcon),
			_ => return ActionResult::NoAction,
		};
		if already {
			tracing::debug!(name = %item.name, %outcome, "already in state");
			return ActionResult::AlreadyInState;
		}

		if !self.controller.send_key(key) {
			tracing::warn!(name = %item.name, %key, "key press failed");
			return ActionResult::VerificationFailed;
		}
		std::thread::sleep(self.settle);

		match self.vision.state_icon(icon) {
			Ok(true) => {
				tracing::info!(name = %item.name, %outcome, "applied");
				ActionResult::Applied
			}
			Ok(false) => {
				tracing::warn!(name = %item.name, %outcome, "marker did not appear after key press");
				ActionResult::VerificationFailed
			}
			Err(err) => {
				tracing::warn!(name = %item.name, %outcome, %err, "could not verify action");
				ActionResult::VerificationFailed
			}
		}
	}
}
