//! The live entity set.
//!
//! Every structural change and every external move is recorded as a
//! [`StoreEvent`]; the sync layer drains the queue before each layout step.

use std::collections::HashMap;

use log::debug;

use super::drag::Draggable;
use super::entity::{Entity, Kind, Link, Point, Positioned};
use crate::error::BoardError;

/// A recorded change, oldest first in the queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
	/// An entity went live.
	EntityAdded(String),
	/// An entity was removed.
	EntityRemoved(String),
	/// A topic gained a link.
	LinkAdded(Link),
	/// A topic lost a link.
	LinkRemoved(Link),
	/// Position or dragging state changed outside the layout.
	Moved(String),
}

/// Live entities by id, with paint order, selection and the event queue.
#[derive(Debug, Default)]
pub struct EntityStore {
	entities: HashMap<String, Entity>,
	order: Vec<String>,
	selected: Option<String>,
	events: Vec<StoreEvent>,
}

impl EntityStore {
	/// An empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of live entities.
	pub fn len(&self) -> usize {
		self.entities.len()
	}

	/// `true` when nothing is live.
	pub fn is_empty(&self) -> bool {
		self.entities.is_empty()
	}

	/// Whether `id` is live.
	pub fn contains(&self, id: &str) -> bool {
		self.entities.contains_key(id)
	}

	/// Look up a live entity.
	pub fn get(&self, id: &str) -> Option<&Entity> {
		self.entities.get(id)
	}

	/// Entities in paint order: topics beneath notes, each in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &Entity> {
		self.of_kind(Kind::Topic).chain(self.of_kind(Kind::Note))
	}

	/// Notes in insertion order.
	pub fn notes(&self) -> impl Iterator<Item = &Entity> {
		self.of_kind(Kind::Note)
	}

	/// Topics in insertion order.
	pub fn topics(&self) -> impl Iterator<Item = &Entity> {
		self.of_kind(Kind::Topic)
	}

	fn of_kind(&self, kind: Kind) -> impl Iterator<Item = &Entity> {
		self.order
			.iter()
			.filter_map(|id| self.entities.get(id))
			.filter(move |entity| entity.kind() == kind)
	}

	/// Every link under every topic.
	pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
		self.topics().flat_map(|topic| {
			topic
				.links()
				.iter()
				.map(move |target| Link::new(topic.id(), target.as_str()))
		})
	}

	/// Add an entity. Ids are unique across notes and topics.
	pub fn insert(&mut self, entity: Entity) -> Result<(), BoardError> {
		let id = entity.id().to_owned();
		if self.entities.contains_key(&id) {
			return Err(BoardError::DuplicateEntity(id));
		}
		self.entities.insert(id.clone(), entity);
		self.order.push(id.clone());
		self.events.push(StoreEvent::EntityAdded(id));
		Ok(())
	}

	/// Insert a topic that already links to `targets`. Only one
	/// [`StoreEvent::EntityAdded`] is recorded; the sync layer picks the links
	/// up from the topic itself.
	pub fn insert_topic(&mut self, mut topic: Entity, targets: &[String]) -> Result<(), BoardError> {
		let id = topic.id().to_owned();
		let links = topic.links_mut().ok_or_else(|| BoardError::NotATopic(id))?;
		for target in targets {
			if !links.contains(target) {
				links.push(target.clone());
			}
		}
		self.insert(topic)
	}

	/// Attach `target` to `topic`. Returns `Ok(false)` when the link already
	/// exists. The target does not have to be live yet.
	pub fn add_link(&mut self, topic: &str, target: &str) -> Result<bool, BoardError> {
		let entity = self
			.entities
			.get_mut(topic)
			.ok_or_else(|| BoardError::UnknownEntity(topic.to_owned()))?;
		let links = entity
			.links_mut()
			.ok_or_else(|| BoardError::NotATopic(topic.to_owned()))?;
		if links.iter().any(|existing| existing == target) {
			return Ok(false);
		}
		links.push(target.to_owned());
		self.events.push(StoreEvent::LinkAdded(Link::new(topic, target)));
		Ok(true)
	}

	/// Drop one link. Returns whether it existed.
	pub fn remove_link(&mut self, topic: &str, target: &str) -> bool {
		let Some(links) = self.entities.get_mut(topic).and_then(Entity::links_mut) else {
			return false;
		};
		let before = links.len();
		links.retain(|existing| existing != target);
		if links.len() == before {
			return false;
		}
		self.events.push(StoreEvent::LinkRemoved(Link::new(topic, target)));
		true
	}

	/// Remove an entity along with every link pointing at it. A topic's own
	/// links go with it.
	pub fn remove(&mut self, id: &str) -> Option<Entity> {
		if !self.entities.contains_key(id) {
			return None;
		}
		let inbound: Vec<Link> = self.links().filter(|link| link.target == id).collect();
		for link in inbound {
			self.remove_link(&link.topic, &link.target);
		}

		let entity = self.entities.remove(id)?;
		self.order.retain(|existing| existing != id);
		if self.selected.as_deref() == Some(id) {
			self.selected = None;
		}
		self.events.push(StoreEvent::EntityRemoved(id.to_owned()));
		Some(entity)
	}

	/// Remove every link, then every topic. Returns the number of topics removed.
	pub fn reset_topics(&mut self) -> usize {
		for link in self.links().collect::<Vec<_>>() {
			self.remove_link(&link.topic, &link.target);
		}
		let topics: Vec<String> = self.topics().map(|t| t.id().to_owned()).collect();
		for id in &topics {
			self.remove(id);
		}
		topics.len()
	}

	/// Remove every link and entity.
	pub fn clear(&mut self) {
		self.reset_topics();
		let notes: Vec<String> = self.order.clone();
		for id in notes {
			self.remove(&id);
		}
	}

	/// Move an entity and record the change.
	pub fn move_to(&mut self, id: &str, position: Point) -> bool {
		self.update(id, |entity| entity.set_position(position)).is_some()
	}

	/// Mutate an entity in place and record a [`StoreEvent::Moved`].
	pub fn update<R>(&mut self, id: &str, f: impl FnOnce(&mut Entity) -> R) -> Option<R> {
		let entity = self.entities.get_mut(id)?;
		let result = f(entity);
		self.events.push(StoreEvent::Moved(id.to_owned()));
		Some(result)
	}

	/// Layout write-back. Records nothing, so a settled layout stays settled.
	pub(crate) fn place(&mut self, id: &str, position: Point) {
		if let Some(entity) = self.entities.get_mut(id) {
			entity.set_position(position);
		}
	}

	/// Flag an entity as held by a drag.
	pub fn set_dragging(&mut self, id: &str, dragging: bool) -> bool {
		self.update(id, |entity| entity.set_dragging(dragging)).is_some()
	}

	/// Select an entity. Unknown ids clear the selection.
	pub fn select(&mut self, id: Option<&str>) {
		self.selected = id.filter(|id| self.entities.contains_key(*id)).map(str::to_owned);
	}

	/// The selected entity, if still live.
	pub fn selected(&self) -> Option<&Entity> {
		self.selected.as_deref().and_then(|id| self.entities.get(id))
	}

	/// Topmost entity under a model-space point.
	pub fn entity_at(&self, point: Point) -> Option<&Entity> {
		let painted: Vec<&Entity> = self.iter().collect();
		painted.into_iter().rev().find(|entity| entity.contains(point))
	}

	/// Whether changes are waiting to be drained.
	pub fn has_pending_events(&self) -> bool {
		!self.events.is_empty()
	}

	/// Take every recorded change.
	pub fn drain_events(&mut self) -> Vec<StoreEvent> {
		let events = std::mem::take(&mut self.events);
		if !events.is_empty() {
			debug!("store: {} pending change(s)", events.len());
		}
		events
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::board::entity::Size;

	fn note(id: &str, x: f64, y: f64) -> Entity {
		Entity::note(id, id, Point::new(x, y), Size::new(100.0, 100.0), "#fff")
	}

	fn topic(id: &str, x: f64, y: f64) -> Entity {
		Entity::topic(id, id, Point::new(x, y), Size::new(300.0, 300.0), "#eee")
	}

	#[test]
	fn ids_are_unique_across_kinds() {
		let mut store = EntityStore::new();
		store.insert(note("a", 0.0, 0.0)).unwrap();
		let err = store.insert(topic("a", 0.0, 0.0)).unwrap_err();
		assert!(matches!(err, BoardError::DuplicateEntity(id) if id == "a"));
		assert_eq!(store.get("a").unwrap().kind(), Kind::Note);
	}

	#[test]
	fn links_hang_off_topics_only() {
		let mut store = EntityStore::new();
		store.insert(note("n", 0.0, 0.0)).unwrap();
		store.insert(topic("t", 0.0, 0.0)).unwrap();

		assert!(matches!(store.add_link("n", "t"), Err(BoardError::NotATopic(_))));
		assert!(matches!(store.add_link("ghost", "n"), Err(BoardError::UnknownEntity(_))));
		assert!(store.add_link("t", "n").unwrap());
		assert!(!store.add_link("t", "n").unwrap());
		assert_eq!(store.links().collect::<Vec<_>>(), vec![Link::new("t", "n")]);
	}

	#[test]
	fn topics_can_arrive_with_their_links() {
		let mut store = EntityStore::new();
		store.insert(note("n", 0.0, 0.0)).unwrap();
		store.drain_events();

		let targets = ["n".to_owned(), "n".to_owned(), "later".to_owned()];
		store.insert_topic(topic("t", 0.0, 0.0), &targets).unwrap();
		assert_eq!(store.get("t").unwrap().links(), ["n", "later"]);
		assert_eq!(store.drain_events(), vec![StoreEvent::EntityAdded("t".into())]);

		let err = store.insert_topic(note("m", 0.0, 0.0), &targets).unwrap_err();
		assert!(matches!(err, BoardError::NotATopic(id) if id == "m"));
	}

	#[test]
	fn removing_a_note_drops_inbound_links_first() {
		let mut store = EntityStore::new();
		store.insert(note("n", 0.0, 0.0)).unwrap();
		store.insert(topic("t", 0.0, 0.0)).unwrap();
		store.add_link("t", "n").unwrap();
		store.drain_events();

		store.remove("n").unwrap();
		assert_eq!(
			store.drain_events(),
			vec![
				StoreEvent::LinkRemoved(Link::new("t", "n")),
				StoreEvent::EntityRemoved("n".into()),
			]
		);
		assert!(store.get("t").unwrap().links().is_empty());
		assert!(store.remove("n").is_none());
	}

	#[test]
	fn reset_topics_keeps_notes() {
		let mut store = EntityStore::new();
		store.insert(note("n1", 0.0, 0.0)).unwrap();
		store.insert(note("n2", 0.0, 0.0)).unwrap();
		store.insert(topic("t", 0.0, 0.0)).unwrap();
		store.add_link("t", "n1").unwrap();

		assert_eq!(store.reset_topics(), 1);
		assert_eq!(store.len(), 2);
		assert_eq!(store.links().count(), 0);

		store.clear();
		assert!(store.is_empty());
	}

	#[test]
	fn hit_test_prefers_notes_over_topics() {
		let mut store = EntityStore::new();
		store.insert(note("n", 0.0, 0.0)).unwrap();
		store.insert(topic("t", 0.0, 0.0)).unwrap();

		assert_eq!(store.entity_at(Point::new(10.0, 10.0)).unwrap().id(), "n");
		assert_eq!(store.entity_at(Point::new(120.0, 0.0)).unwrap().id(), "t");
		assert!(store.entity_at(Point::new(1000.0, 0.0)).is_none());
	}

	#[test]
	fn layout_writes_are_silent() {
		let mut store = EntityStore::new();
		store.insert(note("n", 0.0, 0.0)).unwrap();
		store.drain_events();

		store.place("n", Point::new(4.0, 4.0));
		assert!(!store.has_pending_events());

		assert!(store.move_to("n", Point::new(5.0, 5.0)));
		assert_eq!(store.drain_events(), vec![StoreEvent::Moved("n".into())]);
		assert!(!store.move_to("ghost", Point::ZERO));
	}

	#[test]
	fn selection_follows_removal() {
		let mut store = EntityStore::new();
		store.insert(note("n", 0.0, 0.0)).unwrap();
		store.select(Some("ghost"));
		assert!(store.selected().is_none());
		store.select(Some("n"));
		assert_eq!(store.selected().unwrap().id(), "n");
		store.remove("n");
		assert!(store.selected().is_none());
	}
}
