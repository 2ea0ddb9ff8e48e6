//! Self-stopping render loop.
//!
//! The loop asks a [`FrameScheduler`] for one frame at a time and only asks
//! again while the layout still has energy. The browser shell schedules with
//! `requestAnimationFrame`; tests pump a [`ManualScheduler`].

use std::cell::Cell;
use std::rc::Rc;

use log::debug;

/// Source of animation frames.
pub trait FrameScheduler {
	/// Ask for one future call to the frame callback. Returns `false` if no
	/// frame could be scheduled.
	fn request_frame(&self) -> bool;
}

/// Outcome of one handled frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopStatus {
	/// Another frame is scheduled.
	Running,
	/// The loop is idle until the next `start`.
	Stopped,
}

/// Drives frames while the layout has energy above the threshold.
#[derive(Debug)]
pub struct RenderLoop<S> {
	scheduler: S,
	min_energy_threshold: f64,
	running: bool,
	pending: bool,
	frames: u64,
}

impl<S: FrameScheduler> RenderLoop<S> {
	/// A stopped loop.
	pub fn new(scheduler: S, min_energy_threshold: f64) -> Self {
		Self {
			scheduler,
			min_energy_threshold,
			running: false,
			pending: false,
			frames: 0,
		}
	}

	/// `true` from `start` until the layout rests or `stop` is called.
	pub fn is_running(&self) -> bool {
		self.running
	}

	/// Frames handled since creation.
	pub fn frames(&self) -> u64 {
		self.frames
	}

	/// The scheduler frames are requested from.
	pub fn scheduler(&self) -> &S {
		&self.scheduler
	}

	/// Start the loop if idle. Returns whether it was idle.
	pub fn start(&mut self) -> bool {
		if self.running {
			return false;
		}
		self.running = true;
		if !self.pending {
			self.pending = self.scheduler.request_frame();
			if !self.pending {
				self.running = false;
				return false;
			}
		}
		debug!("render loop started");
		true
	}

	/// Safe to call when already stopped.
	pub fn stop(&mut self) {
		if self.running {
			self.running = false;
			debug!("render loop stopped after {} frames", self.frames);
		}
	}

	/// Handle a scheduled frame: run `step` (which returns the remaining
	/// energy) and schedule the next frame unless the layout came to rest.
	pub fn frame(&mut self, step: impl FnOnce() -> f64) -> LoopStatus {
		self.pending = false;
		if !self.running {
			return LoopStatus::Stopped;
		}
		self.frames += 1;
		let energy = step();
		// NaN energy counts as at rest
		if !(energy >= self.min_energy_threshold) {
			self.stop();
			return LoopStatus::Stopped;
		}
		self.pending = self.scheduler.request_frame();
		if !self.pending {
			self.stop();
			return LoopStatus::Stopped;
		}
		LoopStatus::Running
	}
}

/// A scheduler that only counts requests. Whoever drives the loop calls
/// [`ManualScheduler::take`] and, when it returns `true`, runs one frame.
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
	requested: Rc<Cell<u32>>,
}

impl ManualScheduler {
	/// A scheduler with nothing requested.
	pub fn new() -> Self {
		Self::default()
	}

	/// Requests not yet taken.
	pub fn pending(&self) -> u32 {
		self.requested.get()
	}

	/// Consume one request, if there is one.
	pub fn take(&self) -> bool {
		let requested = self.requested.get();
		if requested == 0 {
			return false;
		}
		self.requested.set(requested - 1);
		true
	}
}

impl FrameScheduler for ManualScheduler {
	fn request_frame(&self) -> bool {
		self.requested.set(self.requested.get() + 1);
		true
	}
}
