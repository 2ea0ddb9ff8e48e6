//! Board entities: notes, topics and the links between them.

use std::ops::{Add, Sub};

use log::warn;

use super::drag::Draggable;

/// A point or offset in pixel (model) space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate, growing downwards.
	pub y: f64,
}

impl Point {
	/// The model-space origin.
	pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

	/// Build a point from its coordinates.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// `false` if either coordinate is NaN or infinite.
	pub fn is_finite(&self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}
}

impl Add for Point {
	type Output = Point;

	fn add(self, rhs: Point) -> Point {
		Point::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl Sub for Point {
	type Output = Point;

	fn sub(self, rhs: Point) -> Point {
		Point::new(self.x - rhs.x, self.y - rhs.y)
	}
}

/// Width and height in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
	/// Horizontal extent.
	pub width: f64,
	/// Vertical extent.
	pub height: f64,
}

impl Size {
	/// Build a size from its extents.
	pub const fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}
}

/// Pastel note colors.
pub const PALETTE: &[&str] = &[
	"rgb(255, 209, 220)",
	"rgb(174, 198, 207)",
	"rgb(119, 221, 119)",
	"rgb(253, 253, 150)",
	"rgb(195, 177, 225)",
	"rgb(255, 179, 71)",
	"rgb(255, 105, 97)",
	"rgb(153, 197, 196)",
	"rgb(201, 160, 220)",
	"rgb(255, 218, 185)",
];

/// Pick a palette color, wrapping around.
pub fn palette_color(seed: usize) -> &'static str {
	PALETTE[seed % PALETTE.len()]
}

/// Discriminator the sync layer inspects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
	/// A sticky note.
	Note,
	/// A heavy cluster label.
	Topic,
	/// A topic-to-entity relationship.
	Link,
}

/// A relationship record from a topic to another entity. Links have no
/// position of their own.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Link {
	/// Id of the owning topic.
	pub topic: String,
	/// Id of the linked entity.
	pub target: String,
}

impl Link {
	/// Link `topic` to `target`.
	pub fn new(topic: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			topic: topic.into(),
			target: target.into(),
		}
	}

	/// Always [`Kind::Link`].
	pub fn kind(&self) -> Kind {
		Kind::Link
	}
}

/// What an entity is, with the data only that kind carries.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityKind {
	/// A note and its text.
	Note {
		/// Free text shown on the note.
		text: String,
	},
	/// A topic and the ids it points at.
	Topic {
		/// Heading shown on the topic.
		title: String,
		/// Linked ids in insertion order.
		links: Vec<String>,
	},
}

/// A positioned, sized, colored item on the board.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
	id: String,
	position: Point,
	size: Size,
	color: String,
	dragging: bool,
	kind: EntityKind,
}

impl Entity {
	/// A note that is not being dragged. Non-finite positions fall back to
	/// the origin.
	pub fn note(
		id: impl Into<String>,
		text: impl Into<String>,
		position: Point,
		size: Size,
		color: impl Into<String>,
	) -> Self {
		Self::new(
			id.into(),
			position,
			size,
			color.into(),
			EntityKind::Note { text: text.into() },
		)
	}

	/// A topic with no links yet.
	pub fn topic(
		id: impl Into<String>,
		title: impl Into<String>,
		position: Point,
		size: Size,
		color: impl Into<String>,
	) -> Self {
		Self::new(
			id.into(),
			position,
			size,
			color.into(),
			EntityKind::Topic {
				title: title.into(),
				links: Vec::new(),
			},
		)
	}

	fn new(id: String, position: Point, size: Size, color: String, kind: EntityKind) -> Self {
		let position = if position.is_finite() {
			position
		} else {
			warn!("entity {id} created at a non-finite position, placing it at the origin");
			Point::ZERO
		};
		Self {
			id,
			position,
			size,
			color,
			dragging: false,
			kind,
		}
	}

	/// Unique across notes and topics.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// [`Kind::Note`] or [`Kind::Topic`].
	pub fn kind(&self) -> Kind {
		match self.kind {
			EntityKind::Note { .. } => Kind::Note,
			EntityKind::Topic { .. } => Kind::Topic,
		}
	}

	/// Shorthand for `kind() == Kind::Topic`.
	pub fn is_topic(&self) -> bool {
		self.kind() == Kind::Topic
	}

	/// Note text or topic title.
	pub fn label(&self) -> &str {
		match &self.kind {
			EntityKind::Note { text } => text,
			EntityKind::Topic { title, .. } => title,
		}
	}

	/// Ids a topic links to. Empty for notes.
	pub fn links(&self) -> &[String] {
		match &self.kind {
			EntityKind::Topic { links, .. } => links,
			EntityKind::Note { .. } => &[],
		}
	}

	pub(crate) fn links_mut(&mut self) -> Option<&mut Vec<String>> {
		match &mut self.kind {
			EntityKind::Topic { links, .. } => Some(links),
			EntityKind::Note { .. } => None,
		}
	}

	/// Entities are drawn centered on their position.
	pub fn contains(&self, point: Point) -> bool {
		let (half_w, half_h) = (self.size.width / 2.0, self.size.height / 2.0);
		(point.x - self.position.x).abs() <= half_w && (point.y - self.position.y).abs() <= half_h
	}
}

/// Something with a center on the board.
pub trait Positioned {
	/// Current center in model space.
	fn position(&self) -> Point;
	/// Move the center.
	fn set_position(&mut self, position: Point);
}

/// Something with a rectangular footprint.
pub trait Sizeable {
	/// Current footprint.
	fn size(&self) -> Size;
	/// Resize. Negative extents are clamped to zero.
	fn set_size(&mut self, size: Size);
}

/// Something painted with a CSS color.
pub trait Colorable {
	/// Fill color as a CSS color string.
	fn color(&self) -> &str;
	/// Change the fill color.
	fn set_color(&mut self, color: String);
}

impl Positioned for Entity {
	fn position(&self) -> Point {
		self.position
	}

	/// Non-finite positions are ignored; the last good position stays.
	fn set_position(&mut self, position: Point) {
		if position.is_finite() {
			self.position = position;
		} else {
			warn!("ignoring non-finite position for {}", self.id);
		}
	}
}

impl Sizeable for Entity {
	fn size(&self) -> Size {
		self.size
	}

	fn set_size(&mut self, size: Size) {
		if size.width.is_finite() && size.height.is_finite() {
			self.size = Size::new(size.width.max(0.0), size.height.max(0.0));
		}
	}
}

impl Colorable for Entity {
	fn color(&self) -> &str {
		&self.color
	}

	fn set_color(&mut self, color: String) {
		self.color = color;
	}
}

impl Draggable for Entity {
	fn drag_origin(&self) -> Point {
		self.position
	}

	fn on_dragged(&mut self, start: Point, delta: Point) {
		self.set_position(start + delta);
	}

	fn is_dragging(&self) -> bool {
		self.dragging
	}

	fn set_dragging(&mut self, dragging: bool) {
		self.dragging = dragging;
	}
}
