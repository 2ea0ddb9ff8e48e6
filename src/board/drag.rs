//! Pointer drag sessions.
//!
//! A session captures the pointer's screen position and the subject's model
//! position at pointer-down. Each move converts the screen delta to model
//! space by dividing by the zoom and hands it to the subject, which decides
//! what "moving" means (entities follow the pointer, the viewport pans the
//! opposite way). While a session is live the subject's `dragging` flag is
//! set, and the layout leaves that subject alone.

use log::debug;

use super::entity::Point;

/// Something a pointer can drag.
pub trait Draggable {
	/// Model-space reference captured when the drag starts.
	fn drag_origin(&self) -> Point;
	/// Apply a model-space `delta` relative to the captured `start`.
	fn on_dragged(&mut self, start: Point, delta: Point);
	/// Whether a session currently holds this subject.
	fn is_dragging(&self) -> bool;
	/// Set or clear the dragging flag.
	fn set_dragging(&mut self, dragging: bool);
}

/// What a pointer-down landed on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DragTarget {
	/// An entity, by id.
	Entity(String),
	/// Empty board, which pans the view.
	Viewport,
}

/// A live drag.
#[derive(Clone, Debug, PartialEq)]
pub struct DragSession {
	/// The subject being dragged.
	pub target: DragTarget,
	/// Screen position at pointer-down.
	pub pointer_start: Point,
	/// Subject's [`Draggable::drag_origin`] at pointer-down.
	pub origin_start: Point,
	/// Set once the pointer has moved at all.
	pub moved: bool,
}

/// Single-pointer drag state machine: `Idle -> Dragging -> Idle`.
#[derive(Debug, Default)]
pub struct DragController {
	session: Option<DragSession>,
}

impl DragController {
	/// An idle controller.
	pub fn new() -> Self {
		Self::default()
	}

	/// `true` between `begin` and `end`.
	pub fn is_active(&self) -> bool {
		self.session.is_some()
	}

	/// The live session, if any.
	pub fn session(&self) -> Option<&DragSession> {
		self.session.as_ref()
	}

	/// Start dragging `subject`. Returns `false` and leaves everything
	/// untouched if a session is already live.
	pub fn begin(&mut self, target: DragTarget, pointer: Point, subject: &mut impl Draggable) -> bool {
		if self.session.is_some() {
			return false;
		}
		debug!("drag start on {target:?}");
		subject.set_dragging(true);
		self.session = Some(DragSession {
			target,
			pointer_start: pointer,
			origin_start: subject.drag_origin(),
			moved: false,
		});
		true
	}

	/// Feed a pointer move. Returns the model-space delta applied, or `None`
	/// when idle.
	pub fn update(&mut self, pointer: Point, zoom: f64, subject: &mut impl Draggable) -> Option<Point> {
		let session = self.session.as_mut()?;
		let delta = model_delta(session.pointer_start, pointer, zoom);
		session.moved |= delta != Point::ZERO;
		subject.on_dragged(session.origin_start, delta);
		Some(delta)
	}

	/// End the session regardless of whether its subject still exists. The
	/// caller clears the subject's flag if it can still reach it.
	pub fn end(&mut self) -> Option<DragSession> {
		let session = self.session.take();
		if let Some(session) = &session {
			debug!("drag end on {:?}", session.target);
		}
		session
	}
}

/// Screen-space pointer travel converted to model space.
pub fn model_delta(start: Point, current: Point, zoom: f64) -> Point {
	let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
	let delta = current - start;
	if !delta.is_finite() {
		return Point::ZERO;
	}
	Point::new(delta.x / zoom, delta.y / zoom)
}
