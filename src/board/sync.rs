//! Keeps the force graph's topology equal to the live entity set.
//!
//! The sync layer is the only owner of the [`ForceGraph`]. It applies
//! [`StoreEvent`]s incrementally and converts between pixel space and node
//! space with a fixed `scale` (pixels per node unit).

use log::debug;

use super::drag::Draggable;
use super::entity::{Entity, Kind, Link, Point, Positioned};
use super::graph::{ForceGraph, SimulationParameters, Vector};
use super::store::{EntityStore, StoreEvent};
use crate::config::BoardConfig;

/// Owns the layout graph and mirrors the store into it.
#[derive(Debug)]
pub struct GraphSync {
	graph: ForceGraph,
	scale: f64,
	note_mass: f64,
	topic_mass: f64,
}

impl GraphSync {
	/// Non-positive or non-finite scales fall back to `1.0`.
	pub fn new(params: SimulationParameters, scale: f64, note_mass: f64, topic_mass: f64) -> Self {
		let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
		Self {
			graph: ForceGraph::new(params),
			scale,
			note_mass,
			topic_mass,
		}
	}

	/// Build from the layout section of a board config.
	pub fn from_config(config: &BoardConfig) -> Self {
		Self::new(
			config.layout.clone(),
			config.graph_layout_scale,
			config.note_mass,
			config.topic_mass,
		)
	}

	/// The mirrored graph.
	pub fn graph(&self) -> &ForceGraph {
		&self.graph
	}

	/// Pixels per node unit.
	pub fn scale(&self) -> f64 {
		self.scale
	}

	/// Pixels to node units.
	pub fn to_node_space(&self, point: Point) -> Vector {
		Vector::new(point.x / self.scale, point.y / self.scale)
	}

	/// Node units to pixels.
	pub fn to_pixel_space(&self, vector: Vector) -> Point {
		Point::new(vector.x * self.scale, vector.y * self.scale)
	}

	/// Populate the graph from everything already in the store.
	pub fn attach(&mut self, store: &EntityStore) {
		for note in store.notes() {
			self.upsert_entity(note);
		}
		for topic in store.topics() {
			self.add_topic(store, topic);
		}
	}

	/// Bring the graph in line with one drained store event. `store` is read
	/// as it is now, not as it was when the event was recorded.
	pub fn apply(&mut self, store: &EntityStore, event: &StoreEvent) {
		match event {
			StoreEvent::EntityAdded(id) => match store.get(id) {
				Some(entity) => {
					if entity.kind() == Kind::Topic {
						self.add_topic(store, entity);
					} else {
						self.upsert_entity(entity);
					}
					self.add_inbound_links(store, id);
				}
				None => debug!("sync: {id} was removed before it could be added"),
			},
			StoreEvent::EntityRemoved(id) => {
				self.graph.remove_node(id);
			}
			StoreEvent::LinkAdded(link) => self.add_link(store, link),
			StoreEvent::LinkRemoved(link) => {
				self.graph.remove_edge(&link.topic, &link.target);
			}
			StoreEvent::Moved(_) => {}
		}
	}

	fn upsert_entity(&mut self, entity: &Entity) -> bool {
		let mass = match entity.kind() {
			Kind::Topic => self.topic_mass,
			_ => self.note_mass,
		};
		let position = self.to_node_space(entity.position());
		self.graph.upsert_node(entity.id(), position, mass)
	}

	fn add_topic(&mut self, store: &EntityStore, topic: &Entity) {
		self.upsert_entity(topic);
		for target in topic.links() {
			self.add_link(store, &Link::new(topic.id(), target.as_str()));
		}
	}

	/// Links that were made before `target` went live.
	fn add_inbound_links(&mut self, store: &EntityStore, target: &str) {
		let inbound: Vec<Link> = store.links().filter(|link| link.target == target).collect();
		for link in &inbound {
			self.add_link(store, link);
		}
	}

	/// Targets that are not live are skipped until they are added.
	fn add_link(&mut self, store: &EntityStore, link: &Link) {
		let Some(target) = store.get(&link.target) else {
			debug!("sync: link target {} is not live, skipping", link.target);
			return;
		};
		self.upsert_entity(target);
		self.graph.upsert_edge(&link.topic, &link.target);
	}

	/// Copy entity positions into the graph, skipping dragged entities.
	pub fn pull_positions(&mut self, store: &EntityStore) {
		let updates: Vec<(String, Vector)> = self
			.graph
			.nodes()
			.filter_map(|node| store.get(&node.id))
			.filter(|entity| !entity.is_dragging())
			.map(|entity| (entity.id().to_owned(), self.to_node_space(entity.position())))
			.collect();
		for (id, position) in updates {
			self.graph.set_position(&id, position);
		}
	}

	/// Copy simulated positions back onto entities, skipping dragged ones.
	pub fn push_positions(&self, store: &mut EntityStore) {
		for node in self.graph.nodes() {
			let dragging = store.get(&node.id).is_none_or(|entity| entity.is_dragging());
			if !dragging {
				store.place(&node.id, self.to_pixel_space(node.position));
			}
		}
	}

	/// Pull, tick, push. Returns the energy left after the step.
	pub fn step(&mut self, store: &mut EntityStore, dt: f64) -> f64 {
		self.pull_positions(store);
		self.graph.tick(dt);
		self.push_positions(store);
		self.graph.total_energy()
	}
}
