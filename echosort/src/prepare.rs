//! Getting the game from wherever it is to a time-sorted echo inventory.
//!
//! Each step has a goal that is checked on screen before anything is done,
//! so a step whose goal already holds costs one capture and no input.

use std::thread::sleep;

use ie::{CaptureError, Point, TemplateId};

use crate::{
	config::{Keys, Pacing},
	input::Controller,
	vision::Vision,
};

const HUD_CONFIDENCE: f32 = 0.8;
const INVENTORY_CONFIDENCE: f32 = 0.85;
const ECHO_TAB_CONFIDENCE: f32 = 0.7;
const ECHO_FILTER_CONFIDENCE: f32 = 0.8;
const SORT_MENU_CONFIDENCE: f32 = 0.6;
const SORT_LIST_CONFIDENCE: f32 = 0.8;
const SORT_OPTION_CONFIDENCE: f32 = 0.75;
const TIME_SORT_CONFIDENCE: f32 = 0.85;

#[derive(Debug, thiserror::Error)]
pub enum PrepareError {
	#[error("{step}: {target} still not on screen after {attempts} attempts")]
	NotReached {
		step: &'static str,
		target: TemplateId,
		attempts: u32,
	},
	#[error(transparent)]
	Capture(#[from] CaptureError),
}

/// Why one attempt at a step went nowhere.
#[derive(Debug, thiserror::Error)]
enum Stumble {
	#[error("{0} not found")]
	Missing(TemplateId),
	#[error("{0} failed")]
	Input(&'static str),
	#[error(transparent)]
	Capture(#[from] CaptureError),
}

pub struct Preparer<'a, C, V> {
	controller: &'a C,
	vision: &'a V,
	keys: Keys,
	pacing: Pacing,
	attempts: u32,
}

impl<'a, C: Controller, V: Vision> Preparer<'a, C, V> {
	pub fn new(controller: &'a C, vision: &'a V, keys: Keys, pacing: Pacing, attempts: u32) -> Self {
		Self {
			controller,
			vision,
			keys,
			pacing,
			attempts: attempts.max(1),
		}
	}

	pub fn run(&self) -> Result<(), PrepareError> {
		self.activate_window()?;
		self.open_inventory()?;
		self.open_echo_tab()?;
		self.sort_by_time()?;
		tracing::info!("inventory ready");
		Ok(())
	}

	/// Foreground the window and wait for the in-game HUD. Activation is
	/// always attempted since a visible HUD says nothing about focus.
	pub fn activate_window(&self) -> Result<(), PrepareError> {
		for attempt in 1..=self.attempts {
			if attempt > 1 {
				sleep(self.pacing.prepare_retry());
			}
			if !self.controller.activate_window() {
				tracing::warn!(attempt, "window activation failed");
				continue;
			}
			sleep(self.pacing.window_settle());
			if self.visible(TemplateId::HudReady, HUD_CONFIDENCE)? {
				tracing::debug!(attempt, "window active");
				return Ok(());
			}
		}
		Err(PrepareError::NotReached {
			step: "activate window",
			target: TemplateId::HudReady,
			attempts: self.attempts,
		})
	}

	pub fn open_inventory(&self) -> Result<(), PrepareError> {
		self.reach("open inventory", TemplateId::InventoryClose, INVENTORY_CONFIDENCE, || {
			if !self.controller.send_key(self.keys.inventory) {
				return Err(Stumble::Input("inventory key"));
			}
			sleep(self.pacing.ui_settle());
			Ok(())
		})
	}

	pub fn open_echo_tab(&self) -> Result<(), PrepareError> {
		self.reach("echo tab", TemplateId::EchoFilter, ECHO_FILTER_CONFIDENCE, || {
			self.click_on(TemplateId::EchoTab, ECHO_TAB_CONFIDENCE)
		})
	}

	pub fn sort_by_time(&self) -> Result<(), PrepareError> {
		self.reach("sort by time", TemplateId::TimeSort, TIME_SORT_CONFIDENCE, || {
			self.click_on(TemplateId::SortMenu, SORT_MENU_CONFIDENCE)?;
			if !self.visible(TemplateId::SortListOpen, SORT_LIST_CONFIDENCE)? {
				return Err(Stumble::Missing(TemplateId::SortListOpen));
			}
			self.click_on(TemplateId::SortTimeOption, SORT_OPTION_CONFIDENCE)
		})
	}

	/// Run `attempt` until `goal` shows, checking before every try and once
	/// after the last.
	fn reach(
		&self,
		step: &'static str,
		goal: TemplateId,
		confidence: f32,
		attempt: impl Fn() -> Result<(), Stumble>,
	) -> Result<(), PrepareError> {
		for n in 1..=self.attempts {
			if self.visible(goal, confidence)? {
				tracing::debug!(step, "done");
				return Ok(());
			}
			if n > 1 {
				sleep(self.pacing.prepare_retry());
			}
			match attempt() {
				Ok(()) => {}
				Err(Stumble::Capture(err)) => return Err(err.into()),
				Err(err) => tracing::warn!(step, attempt = n, %err, "step attempt failed"),
			}
		}
		if self.visible(goal, confidence)? {
			tracing::debug!(step, "done");
			return Ok(());
		}
		Err(PrepareError::NotReached {
			step,
			target: goal,
			attempts: self.attempts,
		})
	}

	fn visible(&self, id: TemplateId, confidence: f32) -> Result<bool, CaptureError> {
		Ok(self.vision.find(id, confidence)?.found)
	}

	fn click_on(&self, id: TemplateId, confidence: f32) -> Result<(), Stumble> {
		let Some(Point { x, y }) = self.vision.find(id, confidence)?.center else {
			return Err(Stumble::Missing(id));
		};
		if !self.controller.click(x, y) {
			return Err(Stumble::Input("click"));
		}
		sleep(self.pacing.ui_settle());
		Ok(())
	}
}
