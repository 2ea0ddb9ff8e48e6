//! Pan and zoom.
//!
//! The viewport keeps the model-space `origin` at the pixel center of the
//! visible area at every zoom level:
//!
//! ```text
//! screen = (model - origin) * zoom + half_size
//! model  = (screen - half_size) / zoom + origin
//! ```
//!
//! Screen coordinates are relative to the viewport's top-left corner.

use log::warn;
use serde::Deserialize;

use super::drag::Draggable;
use super::entity::{Point, Size};

/// Initial view and zoom limits.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
	/// Starting zoom.
	pub zoom: f64,
	/// Starting model-space center, horizontal.
	pub origin_x: f64,
	/// Starting model-space center, vertical.
	pub origin_y: f64,
	/// Smallest allowed zoom.
	pub min_zoom: f64,
	/// Largest allowed zoom.
	pub max_zoom: f64,
	/// Exponent applied per wheel notch. Negative values zoom out when
	/// scrolling down.
	pub wheel_factor: f64,
}

impl Default for ViewportConfig {
	fn default() -> Self {
		Self {
			zoom: 0.5,
			origin_x: 0.0,
			origin_y: 0.0,
			min_zoom: 0.1,
			max_zoom: 5.0,
			wheel_factor: -0.1,
		}
	}
}

/// Affine map from model space to screen space: `screen = model * k + (x, y)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewTransform {
	/// Horizontal translation in pixels.
	pub x: f64,
	/// Vertical translation in pixels.
	pub y: f64,
	/// Scale.
	pub k: f64,
}

/// Current pan and zoom over a canvas of known size.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
	origin: Point,
	zoom: f64,
	min_zoom: f64,
	max_zoom: f64,
	wheel_factor: f64,
	size: Size,
	panning: bool,
}

impl Viewport {
	/// Invalid limits fall back to the defaults. The canvas size starts at zero
	/// until [`Viewport::resize`] is called.
	pub fn new(config: &ViewportConfig) -> Self {
		let (mut min_zoom, mut max_zoom) = (config.min_zoom, config.max_zoom);
		if !(min_zoom.is_finite() && min_zoom > 0.0) {
			min_zoom = ViewportConfig::default().min_zoom;
		}
		if !max_zoom.is_finite() || max_zoom < min_zoom {
			max_zoom = min_zoom.max(ViewportConfig::default().max_zoom);
		}
		let wheel_factor = if config.wheel_factor.is_finite() {
			config.wheel_factor
		} else {
			ViewportConfig::default().wheel_factor
		};

		let mut viewport = Self {
			origin: Point::ZERO,
			zoom: 1.0_f64.clamp(min_zoom, max_zoom),
			min_zoom,
			max_zoom,
			wheel_factor,
			size: Size::default(),
			panning: false,
		};
		viewport.set_zoom(config.zoom);
		viewport.set_origin(Point::new(config.origin_x, config.origin_y));
		viewport
	}

	/// Current zoom.
	pub fn zoom(&self) -> f64 {
		self.zoom
	}

	/// `(min, max)`.
	pub fn zoom_limits(&self) -> (f64, f64) {
		(self.min_zoom, self.max_zoom)
	}

	/// Clamped to the zoom limits; non-finite values keep the current zoom.
	pub fn set_zoom(&mut self, zoom: f64) {
		if zoom.is_finite() {
			self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
		} else {
			warn!("ignoring non-finite zoom {zoom}");
		}
	}

	/// Model point at the canvas center.
	pub fn origin(&self) -> Point {
		self.origin
	}

	/// Recenter. Non-finite origins are ignored.
	pub fn set_origin(&mut self, origin: Point) {
		if origin.is_finite() {
			self.origin = origin;
		} else {
			warn!("ignoring non-finite viewport origin");
		}
	}

	/// Canvas size in pixels.
	pub fn size(&self) -> Size {
		self.size
	}

	/// Track a new canvas size.
	pub fn resize(&mut self, width: f64, height: f64) {
		let clean = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
		self.size = Size::new(clean(width), clean(height));
	}

	fn half_size(&self) -> Point {
		Point::new(self.size.width / 2.0, self.size.height / 2.0)
	}

	/// Canvas pixel to model point.
	pub fn screen_to_model(&self, screen: Point) -> Point {
		let offset = screen - self.half_size();
		Point::new(
			offset.x / self.zoom + self.origin.x,
			offset.y / self.zoom + self.origin.y,
		)
	}

	/// Model point to canvas pixel.
	pub fn model_to_screen(&self, model: Point) -> Point {
		let half = self.half_size();
		Point::new(
			(model.x - self.origin.x) * self.zoom + half.x,
			(model.y - self.origin.y) * self.zoom + half.y,
		)
	}

	/// The same map as [`Viewport::model_to_screen`], for the canvas context.
	pub fn transform(&self) -> ViewTransform {
		let half = self.half_size();
		ViewTransform {
			x: half.x - self.origin.x * self.zoom,
			y: half.y - self.origin.y * self.zoom,
			k: self.zoom,
		}
	}

	/// Zoom one wheel step about `cursor` (screen space). Only the sign of
	/// `delta_y` matters. The model point under the cursor stays put.
	pub fn wheel(&mut self, delta_y: f64, cursor: Point) -> f64 {
		let notch = if delta_y > 0.0 {
			1.0
		} else if delta_y < 0.0 {
			-1.0
		} else {
			0.0
		};
		let old_zoom = self.zoom;
		let new_zoom = (old_zoom * (notch * self.wheel_factor).exp()).clamp(self.min_zoom, self.max_zoom);
		if !cursor.is_finite() {
			self.zoom = new_zoom;
			return new_zoom;
		}

		let offset = cursor - self.half_size();
		let shift = Point::new(
			offset.x / old_zoom - offset.x / new_zoom,
			offset.y / old_zoom - offset.y / new_zoom,
		);
		self.set_origin(self.origin + shift);
		self.zoom = new_zoom;
		new_zoom
	}
}

impl Draggable for Viewport {
	fn drag_origin(&self) -> Point {
		self.origin
	}

	/// Dragging the canvas moves the origin against the pointer.
	fn on_dragged(&mut self, start: Point, delta: Point) {
		self.set_origin(start - delta);
	}

	fn is_dragging(&self) -> bool {
		self.panning
	}

	fn set_dragging(&mut self, dragging: bool) {
		self.panning = dragging;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::board::drag::{DragController, DragTarget};

	const EPS: f64 = 1e-9;

	fn viewport(zoom: f64) -> Viewport {
		let mut viewport = Viewport::new(&ViewportConfig {
			zoom,
			..ViewportConfig::default()
		});
		viewport.resize(800.0, 600.0);
		viewport
	}

	fn assert_close(a: Point, b: Point) {
		assert!((a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS, "{a:?} != {b:?}");
	}

	#[test]
	fn origin_maps_to_center_at_any_zoom() {
		for zoom in [0.1, 0.5, 1.0, 3.3, 5.0] {
			let mut vp = viewport(zoom);
			vp.set_origin(Point::new(-120.0, 45.5));
			assert_close(vp.model_to_screen(vp.origin()), Point::new(400.0, 300.0));
			let t = vp.transform();
			assert_close(
				Point::new(vp.origin().x * t.k + t.x, vp.origin().y * t.k + t.y),
				Point::new(400.0, 300.0),
			);
		}
	}

	#[test]
	fn screen_and_model_are_inverse() {
		let mut vp = viewport(1.7);
		vp.set_origin(Point::new(33.0, -8.0));
		let screen = Point::new(123.0, 456.0);
		assert_close(vp.model_to_screen(vp.screen_to_model(screen)), screen);
	}

	#[test]
	fn wheel_keeps_point_under_cursor() {
		let cursors = [Point::new(10.0, 20.0), Point::new(400.0, 300.0), Point::new(790.0, 5.0)];
		for (i, cursor) in cursors.into_iter().enumerate() {
			for delta in [120.0, -120.0] {
				let mut vp = viewport(1.0);
				vp.set_origin(Point::new(i as f64 * 17.0, -30.0));
				let before = vp.screen_to_model(cursor);
				vp.wheel(delta, cursor);
				assert_close(vp.model_to_screen(before), cursor);
			}
		}
	}

	#[test]
	fn wheel_direction_follows_factor_sign() {
		let mut vp = viewport(1.0);
		let zoom = vp.wheel(100.0, Point::new(400.0, 300.0));
		assert!((zoom - (-0.1f64).exp()).abs() < EPS);
		let zoom = vp.wheel(-3.0, Point::new(400.0, 300.0));
		assert!((zoom - 1.0).abs() < EPS);
		assert_eq!(vp.wheel(0.0, Point::new(0.0, 0.0)), zoom);
	}

	#[test]
	fn zoom_is_clamped() {
		let mut vp = viewport(1.0);
		vp.set_zoom(100.0);
		assert_eq!(vp.zoom(), 5.0);
		vp.set_zoom(0.0);
		assert_eq!(vp.zoom(), 0.1);
		vp.set_zoom(f64::NAN);
		assert_eq!(vp.zoom(), 0.1);
		for _ in 0..100 {
			vp.wheel(-1.0, Point::new(1.0, 1.0));
		}
		assert_eq!(vp.zoom(), 5.0);
	}

	#[test]
	fn inverted_limits_are_repaired() {
		let vp = Viewport::new(&ViewportConfig {
			min_zoom: 2.0,
			max_zoom: 1.0,
			zoom: 0.5,
			..ViewportConfig::default()
		});
		let (min, max) = vp.zoom_limits();
		assert!(min <= max);
		assert!(vp.zoom() >= min && vp.zoom() <= max);
	}

	#[test]
	fn panning_moves_origin_against_pointer() {
		let mut vp = viewport(2.0);
		vp.set_origin(Point::new(50.0, 50.0));
		let mut drag = DragController::new();
		drag.begin(DragTarget::Viewport, Point::new(0.0, 0.0), &mut vp);
		assert!(vp.is_dragging());

		drag.update(Point::new(40.0, -20.0), vp.zoom(), &mut vp);
		assert_close(vp.origin(), Point::new(30.0, 60.0));

		drag.end();
		vp.set_dragging(false);
		assert!(!vp.is_dragging());
	}
}
