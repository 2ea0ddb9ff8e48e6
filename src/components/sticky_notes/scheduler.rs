//! `requestAnimationFrame` frame source.

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;
use wasm_bindgen::prelude::*;

use crate::board::FrameScheduler;

/// The per-frame callback, filled in once the board it drives exists.
pub type FrameSlot = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Schedules frames with `requestAnimationFrame`.
#[derive(Clone, Default)]
pub struct AnimationFrameScheduler {
	slot: FrameSlot,
}

impl AnimationFrameScheduler {
	/// A scheduler with an empty slot.
	pub fn new() -> Self {
		Self::default()
	}

	/// Shared handle to the callback each frame invokes.
	pub fn slot(&self) -> FrameSlot {
		Rc::clone(&self.slot)
	}
}

impl FrameScheduler for AnimationFrameScheduler {
	fn request_frame(&self) -> bool {
		let Some(window) = web_sys::window() else {
			return false;
		};
		let slot = self.slot.borrow();
		let Some(cb) = slot.as_ref() else {
			return false;
		};
		match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
			Ok(_) => true,
			Err(err) => {
				warn!("requestAnimationFrame failed: {err:?}");
				false
			}
		}
	}
}
