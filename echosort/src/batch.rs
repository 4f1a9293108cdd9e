//! The sorting loop: select, recognize, classify, act, advance.
//!
//! Items are visited left to right, ten to a row. After the last slot of a
//! row the inventory is scrolled one row down and the anchor captured
//! earlier (an item of the second row) must now show in the first row;
//! otherwise the view is out of step and the run stops before it can touch
//! the wrong echo.

use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

use data::{Catalog, RuleSet};
use ie::{CaptureError, ItemRecord, Template, screen::inventory::Layout};

use crate::{
	action::{ActionExecutor, ActionResult},
	classify::{Outcome, classify},
	config::{Attempts, Keys, Pacing},
	input::Controller,
	vision::Vision,
};

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
	#[error("could not read echo {processed} after {attempts} attempts: {last}")]
	RecognitionExhausted { processed: u32, attempts: u32, last: String },
	#[error("page {page} did not line up with the anchor after scrolling")]
	PaginationFailed { page: u32 },
	#[error(transparent)]
	Capture(#[from] CaptureError),
	#[error("cancelled")]
	Cancelled,
}

/// How a run ended.
#[derive(Debug)]
pub enum Terminal {
	Success,
	Aborted(BatchError),
}

/// Status pushed to whoever started the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
	Running,
	Success,
	Error(String),
	Paused,
}

pub trait StatusSink {
	fn status(&self, event: StatusEvent);
}

/// Reports status through the log.
pub struct LogStatus;

impl StatusSink for LogStatus {
	fn status(&self, event: StatusEvent) {
		match event {
			StatusEvent::Error(reason) => tracing::error!(%reason, "sorting stopped"),
			event => tracing::info!(?event, "status"),
		}
	}
}

/// Cooperative stop flag, checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
	pub fn cancel(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchState {
	pub processed: u32,
	/// Slot within the visible row.
	pub page_slot: u32,
	pub page_index: u32,
}

/// Per-run tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchReport {
	pub processed: u32,
	pub locked: u32,
	pub discarded: u32,
	pub already_in_state: u32,
	/// Echoes left alone because no rule applied or the read didn't add up.
	pub skipped: u32,
	pub verification_failed: u32,
}

impl BatchReport {
	fn record(&mut self, outcome: Outcome, result: ActionResult) {
		self.processed += 1;
		match (outcome, result) {
			(Outcome::Lock, ActionResult::Applied) => self.locked += 1,
			(Outcome::Discard, ActionResult::Applied) => self.discarded += 1,
			(_, ActionResult::AlreadyInState) => self.already_in_state += 1,
			(_, ActionResult::VerificationFailed) => self.verification_failed += 1,
			_ => self.skipped += 1,
		}
	}
}

#[derive(Debug)]
pub struct RunOutcome {
	pub terminal: Terminal,
	pub state: BatchState,
	pub report: BatchReport,
}

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct BatchConfig {
	pub max_items: u32,
	pub keys: Keys,
	pub pacing: Pacing,
	pub attempts: Attempts,
	pub layout: Layout,
}

pub struct BatchController<'a, C, V> {
	controller: &'a C,
	vision: &'a V,
	catalog: &'a Catalog,
	rules: &'a RuleSet,
	config: BatchConfig,
	status: &'a dyn StatusSink,
	cancel: CancelToken,
	state: BatchState,
	report: BatchReport,
}

impl<'a, C: Controller, V: Vision> BatchController<'a, C, V> {
	pub fn new(
		controller: &'a C,
		vision: &'a V,
		catalog: &'a Catalog,
		rules: &'a RuleSet,
		config: BatchConfig,
		status: &'a dyn StatusSink,
		cancel: CancelToken,
	) -> Self {
		Self {
			controller,
			vision,
			catalog,
			rules,
			config,
			status,
			cancel,
			state: BatchState::default(),
			report: BatchReport::default(),
		}
	}

	/// Sort until `max_items` echoes were processed or something goes wrong.
	pub fn run(&mut self) -> RunOutcome {
		self.state = BatchState::default();
		self.report = BatchReport::default();

		let terminal = match self.sort() {
			Ok(()) => {
				tracing::info!(report = ?self.report, "sorting finished");
				self.status.status(StatusEvent::Success);
				Terminal::Success
			}
			Err(BatchError::Cancelled) => {
				tracing::info!(state = ?self.state, "sorting cancelled");
				self.status.status(StatusEvent::Paused);
				Terminal::Aborted(BatchError::Cancelled)
			}
			Err(err) => {
				self.status.status(StatusEvent::Error(err.to_string()));
				Terminal::Aborted(err)
			}
		};

		RunOutcome {
			terminal,
			state: self.state,
			report: self.report,
		}
	}

	fn check_cancel(&self) -> Result<(), BatchError> {
		if self.cancel.is_cancelled() {
			Err(BatchError::Cancelled)
		} else {
			Ok(())
		}
	}

	fn sort(&mut self) -> Result<(), BatchError> {
		let mut anchor = self.vision.snapshot_anchor()?;
		self.status.status(StatusEvent::Running);
		tracing::info!(max_items = self.config.max_items, "sorting started");

		let executor = ActionExecutor::new(
			self.controller,
			self.vision,
			self.config.keys,
			self.config.pacing.key_settle(),
		);

		while self.state.processed < self.config.max_items {
			self.check_cancel()?;
			let item = self.recognize()?;

			self.check_cancel()?;
			let outcome = classify(&item, self.rules, self.catalog);
			let result = executor.apply_outcome(outcome, &item);
			if !outcome.is_action() {
				tracing::info!(
					n = self.state.processed,
					name = %item.name,
					set = %item.set,
					cost = item.cost,
					%outcome,
					"left alone"
				);
			}
			self.report.record(outcome, result);

			self.state.processed += 1;
			self.state.page_slot += 1;
			if self.state.processed >= self.config.max_items {
				break;
			}
			if self.state.page_slot >= self.config.layout.slots_per_page {
				self.check_cancel()?;
				self.paginate(&anchor)?;
				anchor = self.vision.snapshot_anchor()?;
			}
		}
		Ok(())
	}

	/// Select the current slot and read it, re-clicking on every attempt.
	fn recognize(&self) -> Result<ItemRecord, BatchError> {
		let attempts = self.config.attempts.recognition.max(1);
		let pos = self.config.layout.slot_position(self.state.page_slot);
		let mut last = String::new();

		for attempt in 1..=attempts {
			if attempt > 1 {
				self.check_cancel()?;
				std::thread::sleep(self.config.pacing.recognition_backoff());
			}
			if !self.controller.click(pos.x, pos.y) {
				tracing::warn!(attempt, x = pos.x, y = pos.y, "slot click failed");
				last = "slot click failed".to_owned();
				continue;
			}
			std::thread::sleep(self.config.pacing.click_settle());

			match self.vision.read_echo() {
				Ok(item) => return Ok(item),
				Err(err) => {
					tracing::warn!(attempt, slot = self.state.page_slot, %err, "recognition failed");
					last = err.to_string();
				}
			}
		}

		Err(BatchError::RecognitionExhausted {
			processed: self.state.processed,
			attempts,
			last,
		})
	}

	/// Scroll one row and check the anchor moved into the first row.
	fn paginate(&mut self, anchor: &Template) -> Result<(), BatchError> {
		let attempts = self.config.attempts.pagination.max(1);
		let page = self.state.page_index + 1;

		for attempt in 1..=attempts {
			if !self.controller.scroll(self.config.pacing.scroll_amount) {
				tracing::warn!(attempt, "scroll failed");
				continue;
			}
			std::thread::sleep(self.config.pacing.scroll_settle());

			match self.vision.anchor_visible(anchor) {
				Ok(true) => {
					self.state.page_slot = 0;
					self.state.page_index = page;
					tracing::debug!(page, "next page");
					return Ok(());
				}
				Ok(false) => tracing::warn!(attempt, page, "anchor not in place after scrolling"),
				Err(err) => tracing::warn!(attempt, page, %err, "anchor check failed"),
			}
		}

		Err(BatchError::PaginationFailed { page })
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use ie::RecognitionError;

	use super::*;
	use crate::{
		action::tests::{FakeController, FakeVision},
		classify::tests::{catalog, echo, rules},
	};

	#[derive(Default)]
	struct RecordingStatus(RefCell<Vec<StatusEvent>>);

	impl StatusSink for RecordingStatus {
		fn status(&self, event: StatusEvent) {
			self.0.borrow_mut().push(event);
		}
	}

	fn config(max_items: u32) -> BatchConfig {
		BatchConfig {
			max_items,
			keys: Keys::default(),
			pacing: Pacing::ZERO,
			attempts: Attempts::default(),
			layout: Layout::default(),
		}
	}

	fn lockable() -> Result<ItemRecord, RecognitionError> {
		Ok(echo("3", 4, "Sentry Construct", "Crit Rate"))
	}

	fn unreadable() -> Result<ItemRecord, RecognitionError> {
		Err(RecognitionError::Unreadable("empty echo name".into()))
	}

	fn vision(reads: impl IntoIterator<Item = Result<ItemRecord, RecognitionError>>) -> FakeVision {
		let v = FakeVision::default();
		v.reads.borrow_mut().extend(reads);
		v.icon.set(Some(true));
		v
	}

	fn run(c: &FakeController, v: &FakeVision, status: &RecordingStatus, cfg: BatchConfig, cancel: CancelToken) -> RunOutcome {
		let (catalog, rules) = (catalog(), rules());
		BatchController::new(c, v, &catalog, &rules, cfg, status, cancel).run()
	}

	#[test]
	fn stops_at_max_items() {
		let (c, status) = (FakeController::default(), RecordingStatus::default());
		let v = vision((0..5).map(|_| lockable()));

		let out = run(&c, &v, &status, config(3), CancelToken::default());
		assert!(matches!(out.terminal, Terminal::Success), "{:?}", out.terminal);
		assert_eq!(out.state, BatchState { processed: 3, page_slot: 3, page_index: 0 });
		assert_eq!(out.report.locked, 3);
		assert_eq!(*c.keys.borrow(), vec!['c'; 3]);
		assert_eq!(*c.clicks.borrow(), vec![(375, 275), (595, 275), (815, 275)]);
		assert_eq!(*status.0.borrow(), vec![StatusEvent::Running, StatusEvent::Success]);
	}

	#[test]
	fn full_row_paginates_and_anchor_mismatch_aborts() {
		let (c, status) = (FakeController::default(), RecordingStatus::default());
		let v = vision((0..20).map(|_| lockable()));
		v.anchors.borrow_mut().push_back(false);

		let out = run(&c, &v, &status, config(3000), CancelToken::default());
		assert!(
			matches!(out.terminal, Terminal::Aborted(BatchError::PaginationFailed { page: 1 })),
			"{:?}",
			out.terminal
		);
		assert_eq!(out.state.processed, 10);
		assert_eq!(*c.scrolls.borrow(), vec![-933]);
		assert!(matches!(status.0.borrow().last(), Some(StatusEvent::Error(_))));
	}

	#[test]
	fn pagination_resets_the_slot() {
		let (c, status) = (FakeController::default(), RecordingStatus::default());
		let v = vision((0..12).map(|_| lockable()));
		v.anchors.borrow_mut().push_back(true);

		let out = run(&c, &v, &status, config(12), CancelToken::default());
		assert!(matches!(out.terminal, Terminal::Success), "{:?}", out.terminal);
		assert_eq!(out.state, BatchState { processed: 12, page_slot: 2, page_index: 1 });
		assert_eq!(c.clicks.borrow()[10], (375, 275));
		// Run start plus the fresh second row after scrolling.
		assert_eq!(v.snapshots.get(), 2);
	}

	#[test]
	fn recognition_failures_exhaust_the_budget() {
		let (c, status) = (FakeController::default(), RecordingStatus::default());
		let v = vision([lockable(), lockable(), unreadable(), unreadable(), unreadable(), lockable()]);

		let out = run(&c, &v, &status, config(3000), CancelToken::default());
		match out.terminal {
			Terminal::Aborted(BatchError::RecognitionExhausted { processed, attempts, .. }) => {
				assert_eq!((processed, attempts), (2, 3));
			}
			other => panic!("unexpected {other:?}"),
		}
		assert_eq!(out.state.processed, 2);
		assert_eq!(&c.clicks.borrow()[2..], &[(815, 275); 3]);
		assert!(matches!(status.0.borrow().last(), Some(StatusEvent::Error(_))));
	}

	#[test]
	fn recognition_recovers_within_budget() {
		let (c, status) = (FakeController::default(), RecordingStatus::default());
		let v = vision([unreadable(), unreadable(), lockable()]);

		let out = run(&c, &v, &status, config(1), CancelToken::default());
		assert!(matches!(out.terminal, Terminal::Success), "{:?}", out.terminal);
		assert_eq!(c.clicks.borrow().len(), 3);
	}

	#[test]
	fn outcomes_are_tallied_and_never_fatal() {
		let (c, status) = (FakeController::default(), RecordingStatus::default());
		let mut locked = echo("3", 4, "Sentry Construct", "Crit DMG");
		locked.locked = true;
		let v = vision([
			lockable(),
			Ok(locked),
			Ok(echo("3", 4, "Sentry Construct", "HP")),
			Ok(echo("unknown", 4, "Sentry Construct", "HP")),
			Ok(echo("3", 1, "Sentry Construct", "ATK")),
			Ok(echo("3", 4, "Sentry Construct", "Healing Bonus")),
		]);

		let out = run(&c, &v, &status, config(6), CancelToken::default());
		assert!(matches!(out.terminal, Terminal::Success), "{:?}", out.terminal);
		assert_eq!(
			out.report,
			BatchReport {
				processed: 6,
				locked: 1,
				discarded: 1,
				already_in_state: 1,
				skipped: 3,
				verification_failed: 0,
			}
		);
	}

	#[test]
	fn cancellation_pauses() {
		let (c, status) = (FakeController::default(), RecordingStatus::default());
		let v = vision([lockable()]);
		let cancel = CancelToken::default();
		cancel.cancel();

		let out = run(&c, &v, &status, config(5), cancel);
		assert!(matches!(out.terminal, Terminal::Aborted(BatchError::Cancelled)), "{:?}", out.terminal);
		assert_eq!(out.state.processed, 0);
		assert!(c.clicks.borrow().is_empty());
		assert_eq!(*status.0.borrow(), vec![StatusEvent::Running, StatusEvent::Paused]);
	}

	#[test]
	fn pagination_retries_within_budget() {
		let (c, status) = (FakeController::default(), RecordingStatus::default());
		let v = vision((0..11).map(|_| lockable()));
		v.anchors.borrow_mut().extend([false, true]);
		let mut cfg = config(11);
		cfg.attempts.pagination = 2;

		let out = run(&c, &v, &status, cfg, CancelToken::default());
		assert!(matches!(out.terminal, Terminal::Success), "{:?}", out.terminal);
		assert_eq!(*c.scrolls.borrow(), vec![-933, -933]);
		assert_eq!(out.state, BatchState { processed: 11, page_slot: 1, page_index: 1 });
	}

	#[test]
	fn failed_scroll_uses_up_the_budget() {
		let (c, status) = (FakeController::default(), RecordingStatus::default());
		c.scroll_fails.set(true);
		let v = vision((0..20).map(|_| lockable()));
		v.anchors.borrow_mut().extend([true, true]);
		let mut cfg = config(3000);
		cfg.attempts.pagination = 2;

		let out = run(&c, &v, &status, cfg, CancelToken::default());
		assert!(
			matches!(out.terminal, Terminal::Aborted(BatchError::PaginationFailed { page: 1 })),
			"{:?}",
			out.terminal
		);
		assert_eq!(c.scrolls.borrow().len(), 2);
		// The anchor is never checked after a failed scroll.
		assert_eq!(v.anchors.borrow().len(), 2);
		assert_eq!(out.state.processed, 10);
	}

	#[test]
	fn failed_slot_clicks_exhaust_recognition() {
		let (c, status) = (FakeController::default(), RecordingStatus::default());
		c.fail.set(true);
		let v = vision([lockable(), lockable(), lockable()]);

		let out = run(&c, &v, &status, config(5), CancelToken::default());
		match out.terminal {
			Terminal::Aborted(BatchError::RecognitionExhausted { processed, attempts, last }) => {
				assert_eq!((processed, attempts), (0, 3));
				assert_eq!(last, "slot click failed");
			}
			other => panic!("unexpected {other:?}"),
		}
		assert_eq!(*c.clicks.borrow(), vec![(375, 275); 3]);
		// Nothing was read off an unselected slot.
		assert_eq!(v.reads.borrow().len(), 3);
	}

	/// Sets the cancel flag on the `n`th click, like an interrupt arriving mid-run.
	struct CancelOnClick<'a> {
		inner: &'a FakeController,
		cancel: CancelToken,
		n: usize,
	}

	impl Controller for CancelOnClick<'_> {
		fn activate_window(&self) -> bool {
			self.inner.activate_window()
		}

		fn send_key(&self, key: char) -> bool {
			self.inner.send_key(key)
		}

		fn click(&self, x: u32, y: u32) -> bool {
			let ok = self.inner.click(x, y);
			if self.inner.clicks.borrow().len() == self.n {
				self.cancel.cancel();
			}
			ok
		}

		fn scroll(&self, amount: i32) -> bool {
			self.inner.scroll(amount)
		}
	}

	#[test]
	fn cancellation_mid_run_stops_before_acting() {
		let (inner, status) = (FakeController::default(), RecordingStatus::default());
		let v = vision((0..5).map(|_| lockable()));
		let cancel = CancelToken::default();
		let c = CancelOnClick {
			inner: &inner,
			cancel: cancel.clone(),
			n: 3,
		};
		let (catalog, rules) = (catalog(), rules());

		let out = BatchController::new(&c, &v, &catalog, &rules, config(5), &status, cancel).run();
		assert!(matches!(out.terminal, Terminal::Aborted(BatchError::Cancelled)), "{:?}", out.terminal);
		// The third echo was selected and read but never locked.
		assert_eq!(out.state.processed, 2);
		assert_eq!(out.report.locked, 2);
		assert_eq!(*inner.keys.borrow(), vec!['c'; 2]);
		assert_eq!(*status.0.borrow(), vec![StatusEvent::Running, StatusEvent::Paused]);
	}

	#[test]
	fn anchor_capture_failure_aborts_before_running() {
		let (c, status) = (FakeController::default(), RecordingStatus::default());
		let v = vision([lockable()]);
		v.snapshot_fails.set(true);

		let out = run(&c, &v, &status, config(5), CancelToken::default());
		assert!(matches!(out.terminal, Terminal::Aborted(BatchError::Capture(_))), "{:?}", out.terminal);
		assert!(c.clicks.borrow().is_empty());
		assert_eq!(status.0.borrow().len(), 1);
	}
}
