//! Force-directed layout engine.
//!
//! Nodes repel each other with a Coulomb-like inverse-square force, edges
//! pull their endpoints toward a rest length with Hooke's law, and velocity
//! is multiplied by `damping` every step. All math happens in node space;
//! the sync layer owns the conversion to pixels.
//!
//! Nodes and edges live in ordered maps so a step visits them in the same
//! order every time, which keeps `tick` deterministic.

use std::collections::{BTreeMap, HashMap};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use log::debug;
use serde::Deserialize;

/// Timesteps below this (including zero, negative and NaN) are raised to it.
pub const MIN_TIMESTEP: f64 = 1e-4;
/// Added to every pair distance so coincident nodes never divide by zero.
pub const DISTANCE_SOFTENING: f64 = 0.1;
const MIN_MASS: f64 = 1e-6;

/// A position, velocity or force in node space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector {
	/// Horizontal component.
	pub x: f64,
	/// Vertical component.
	pub y: f64,
}

impl Vector {
	/// The zero vector.
	pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

	/// Build a vector from its components.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Euclidean length.
	pub fn magnitude(self) -> f64 {
		(self.x * self.x + self.y * self.y).sqrt()
	}

	/// Unit vector, or `fallback` when too short to have a direction.
	pub fn normalize_or(self, fallback: Vector) -> Vector {
		let magnitude = self.magnitude();
		if magnitude > f64::EPSILON && magnitude.is_finite() {
			self / magnitude
		} else {
			fallback
		}
	}

	/// `false` if either component is NaN or infinite.
	pub fn is_finite(self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}
}

impl Add for Vector {
	type Output = Vector;

	fn add(self, rhs: Vector) -> Vector {
		Vector::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl Sub for Vector {
	type Output = Vector;

	fn sub(self, rhs: Vector) -> Vector {
		Vector::new(self.x - rhs.x, self.y - rhs.y)
	}
}

impl Mul<f64> for Vector {
	type Output = Vector;

	fn mul(self, rhs: f64) -> Vector {
		Vector::new(self.x * rhs, self.y * rhs)
	}
}

impl Div<f64> for Vector {
	type Output = Vector;

	fn div(self, rhs: f64) -> Vector {
		Vector::new(self.x / rhs, self.y / rhs)
	}
}

impl Neg for Vector {
	type Output = Vector;

	fn neg(self) -> Vector {
		Vector::new(-self.x, -self.y)
	}
}

impl AddAssign for Vector {
	fn add_assign(&mut self, rhs: Vector) {
		*self = *self + rhs;
	}
}

impl SubAssign for Vector {
	fn sub_assign(&mut self, rhs: Vector) {
		*self = *self - rhs;
	}
}

/// Global simulation constants.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
	/// Spring constant shared by every edge.
	pub stiffness: f64,
	/// Coulomb constant shared by every node pair.
	pub repulsion: f64,
	/// Fraction of velocity kept after each step.
	pub damping: f64,
	/// The layout is at rest once kinetic energy drops below this.
	pub min_energy_threshold: f64,
	/// Per-step speed cap. `None` leaves speed unbounded.
	pub max_speed: Option<f64>,
	/// Pull toward the node-space origin. Zero disables it.
	pub center_attraction: f64,
	/// Rest length of new edges.
	pub spring_length: f64,
}

impl Default for SimulationParameters {
	fn default() -> Self {
		Self {
			stiffness: 300.0,
			repulsion: 200.0,
			damping: 0.5,
			min_energy_threshold: 0.5,
			max_speed: None,
			center_attraction: 0.0,
			spring_length: 1.0,
		}
	}
}

/// A simulated body.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	/// Id of the entity this node stands for.
	pub id: String,
	/// Resistance to acceleration. Topics are much heavier than notes.
	pub mass: f64,
	/// Current position.
	pub position: Vector,
	/// Current velocity.
	pub velocity: Vector,
}

/// A spring between two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
	/// `"{source}-{target}"`.
	pub id: String,
	/// Id of the first endpoint.
	pub source: String,
	/// Id of the second endpoint.
	pub target: String,
	/// Rest length.
	pub length: f64,
}

impl GraphEdge {
	/// Edge ids are derived from the ordered endpoint pair.
	pub fn edge_id(source: &str, target: &str) -> String {
		format!("{source}-{target}")
	}
}

fn edge_key(source: &str, target: &str) -> (String, String) {
	(source.to_owned(), target.to_owned())
}

/// The simulated graph: nodes, springs and the constants that drive them.
#[derive(Clone, Debug, Default)]
pub struct ForceGraph {
	params: SimulationParameters,
	nodes: BTreeMap<String, GraphNode>,
	edges: BTreeMap<(String, String), GraphEdge>,
}

impl ForceGraph {
	/// An empty graph.
	pub fn new(params: SimulationParameters) -> Self {
		Self {
			params,
			nodes: BTreeMap::new(),
			edges: BTreeMap::new(),
		}
	}

	/// Constants the graph was built with.
	pub fn params(&self) -> &SimulationParameters {
		&self.params
	}

	/// Look up a node by id.
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.get(id)
	}

	/// Nodes in id order.
	pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
		self.nodes.values()
	}

	/// Edges in endpoint order.
	pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
		self.edges.values()
	}

	/// Number of nodes.
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	/// Number of edges.
	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	/// Whether a node with `id` exists.
	pub fn contains_node(&self, id: &str) -> bool {
		self.nodes.contains_key(id)
	}

	/// Whether the ordered pair is connected.
	pub fn contains_edge(&self, source: &str, target: &str) -> bool {
		self.edges.contains_key(&edge_key(source, target))
	}

	/// Insert a node at rest unless one with `id` already exists. Returns
	/// whether a node was created.
	pub fn upsert_node(&mut self, id: &str, position: Vector, mass: f64) -> bool {
		if self.nodes.contains_key(id) {
			return false;
		}
		let mass = if mass.is_finite() { mass.max(MIN_MASS) } else { 1.0 };
		let position = if position.is_finite() { position } else { Vector::ZERO };
		debug!("graph: add node {id} (mass {mass})");
		self.nodes.insert(
			id.to_owned(),
			GraphNode {
				id: id.to_owned(),
				mass,
				position,
				velocity: Vector::ZERO,
			},
		);
		true
	}

	/// Remove a node and every edge touching it. Missing ids are a no-op.
	pub fn remove_node(&mut self, id: &str) -> bool {
		if self.nodes.remove(id).is_none() {
			return false;
		}
		self.edges.retain(|_, edge| edge.source != id && edge.target != id);
		debug!("graph: remove node {id}");
		true
	}

	/// Connect two existing nodes. Re-adding the same ordered pair is a
	/// no-op; a missing endpoint leaves the graph unchanged.
	pub fn upsert_edge(&mut self, source: &str, target: &str) -> bool {
		if !self.nodes.contains_key(source) || !self.nodes.contains_key(target) {
			return false;
		}
		let key = edge_key(source, target);
		if self.edges.contains_key(&key) {
			return false;
		}
		let id = GraphEdge::edge_id(source, target);
		debug!("graph: add edge {id}");
		self.edges.insert(
			key,
			GraphEdge {
				id,
				source: source.to_owned(),
				target: target.to_owned(),
				length: self.params.spring_length,
			},
		);
		true
	}

	/// Disconnect the ordered pair. Missing edges are ignored.
	pub fn remove_edge(&mut self, source: &str, target: &str) -> bool {
		let removed = self.edges.remove(&edge_key(source, target)).is_some();
		if removed {
			debug!("graph: remove edge {source}-{target}");
		}
		removed
	}

	/// Overwrite a node's position, keeping its velocity.
	pub fn set_position(&mut self, id: &str, position: Vector) {
		if let Some(node) = self.nodes.get_mut(id) {
			if position.is_finite() {
				node.position = position;
			}
		}
	}

	/// Advance the simulation by `dt` seconds.
	pub fn tick(&mut self, dt: f64) {
		let dt = if dt.is_finite() { dt.max(MIN_TIMESTEP) } else { MIN_TIMESTEP };
		let positions: Vec<Vector> = self.nodes.values().map(|node| node.position).collect();
		let index: HashMap<&str, usize> = self
			.nodes
			.keys()
			.enumerate()
			.map(|(i, id)| (id.as_str(), i))
			.collect();
		let mut forces = vec![Vector::ZERO; positions.len()];
		let params = &self.params;

		for i in 0..positions.len() {
			for j in (i + 1)..positions.len() {
				let delta = positions[i] - positions[j];
				let distance = delta.magnitude() + DISTANCE_SOFTENING;
				// coincident nodes get pushed apart along x
				let direction = delta.normalize_or(Vector::new(1.0, 0.0));
				let force = direction * (params.repulsion / (distance * distance * 0.5));
				forces[i] += force;
				forces[j] -= force;
			}
		}

		for edge in self.edges.values() {
			let (Some(&a), Some(&b)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str()))
			else {
				continue;
			};
			let delta = positions[b] - positions[a];
			let displacement = edge.length - delta.magnitude();
			let direction = delta.normalize_or(Vector::new(1.0, 0.0));
			let force = direction * (params.stiffness * displacement * 0.5);
			forces[a] -= force;
			forces[b] += force;
		}

		if params.center_attraction > 0.0 {
			for (force, position) in forces.iter_mut().zip(&positions) {
				*force += -*position * params.center_attraction;
			}
		}

		for (node, force) in self.nodes.values_mut().zip(forces) {
			let acceleration = force / node.mass;
			let mut velocity = (node.velocity + acceleration * dt) * params.damping;
			if let Some(max_speed) = params.max_speed {
				if velocity.magnitude() > max_speed {
					velocity = velocity.normalize_or(Vector::ZERO) * max_speed;
				}
			}
			let position = node.position + velocity * dt;
			if velocity.is_finite() && position.is_finite() {
				node.velocity = velocity;
				node.position = position;
			} else {
				node.velocity = Vector::ZERO;
			}
		}
	}

	/// Kinetic energy of the whole graph, `sum(m * v^2 / 2)`.
	pub fn total_energy(&self) -> f64 {
		self.nodes
			.values()
			.map(|node| {
				let speed = node.velocity.magnitude();
				0.5 * node.mass * speed * speed
			})
			.sum()
	}

	/// Kinetic energy is below `min_energy_threshold`.
	pub fn is_at_rest(&self) -> bool {
		self.total_energy() < self.params.min_energy_threshold
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn graph() -> ForceGraph {
		ForceGraph::new(SimulationParameters::default())
	}

	fn run_to_rest(graph: &mut ForceGraph, max_ticks: usize) -> usize {
		for i in 1..=max_ticks {
			graph.tick(0.03);
			if graph.is_at_rest() {
				return i;
			}
		}
		panic!("layout did not settle within {max_ticks} ticks");
	}

	#[test]
	fn upsert_node_is_idempotent() {
		let mut g = graph();
		assert!(g.upsert_node("a", Vector::new(1.0, 2.0), 1.0));
		assert!(!g.upsert_node("a", Vector::new(9.0, 9.0), 5.0));
		assert_eq!(g.node_count(), 1);
		assert_eq!(g.node("a").unwrap().position, Vector::new(1.0, 2.0));
	}

	#[test]
	fn edges_need_both_endpoints_and_dedupe() {
		let mut g = graph();
		g.upsert_node("t", Vector::ZERO, 10_000.0);
		assert!(!g.upsert_edge("t", "n"));
		g.upsert_node("n", Vector::new(1.0, 0.0), 1.0);
		assert!(g.upsert_edge("t", "n"));
		assert!(!g.upsert_edge("t", "n"));
		assert_eq!(g.edge_count(), 1);
		assert_eq!(g.edges().next().unwrap().id, "t-n");
	}

	#[test]
	fn removals_are_silent_noops_when_missing() {
		let mut g = graph();
		g.upsert_node("t", Vector::ZERO, 1.0);
		g.upsert_node("n", Vector::new(2.0, 0.0), 1.0);
		g.upsert_edge("t", "n");

		assert!(!g.remove_edge("n", "t"));
		assert!(!g.remove_node("ghost"));
		assert_eq!(g.edge_count(), 1);

		assert!(g.remove_node("n"));
		assert_eq!(g.edge_count(), 0);
		assert!(!g.remove_edge("t", "n"));
	}

	#[test]
	fn tick_is_deterministic() {
		let build = || {
			let mut g = graph();
			g.upsert_node("t", Vector::new(0.0, 0.0), 10_000.0);
			for (i, (x, y)) in [(3.0, 1.0), (-2.0, 4.0), (5.0, -5.0)].into_iter().enumerate() {
				let id = format!("n{i}");
				g.upsert_node(&id, Vector::new(x, y), 1.0);
				g.upsert_edge("t", &id);
			}
			g
		};
		let (mut a, mut b) = (build(), build());
		for dt in [0.03, 0.016, 0.05, 0.03] {
			a.tick(dt);
			b.tick(dt);
		}
		for (na, nb) in a.nodes().zip(b.nodes()) {
			assert_eq!(na, nb);
		}
	}

	#[test]
	fn bad_timesteps_do_not_corrupt_state() {
		let mut g = graph();
		g.upsert_node("a", Vector::new(0.0, 0.0), 1.0);
		g.upsert_node("b", Vector::new(0.5, 0.0), 1.0);
		for dt in [0.0, -1.0, f64::NAN, f64::NEG_INFINITY] {
			g.tick(dt);
		}
		for node in g.nodes() {
			assert!(node.position.is_finite());
			assert!(node.velocity.is_finite());
		}
		assert!(g.total_energy().is_finite());
	}

	#[test]
	fn coincident_nodes_separate_without_nan() {
		let mut g = graph();
		g.upsert_node("a", Vector::new(1.0, 1.0), 1.0);
		g.upsert_node("b", Vector::new(1.0, 1.0), 1.0);
		g.upsert_edge("a", "b");
		g.tick(0.03);
		let (a, b) = (g.node("a").unwrap(), g.node("b").unwrap());
		assert!(a.position.is_finite() && b.position.is_finite());
		assert!((a.position - b.position).magnitude() > 0.0);
	}

	#[test]
	fn heavy_topic_pulls_notes_in_and_barely_moves() {
		let mut g = graph();
		let topic_start = Vector::new(0.0, 0.0);
		g.upsert_node("T1", topic_start, 10_000.0);
		g.upsert_node("N1", Vector::new(20.0, 0.0), 1.0);
		g.upsert_node("N2", Vector::new(0.0, -20.0), 1.0);
		g.upsert_edge("T1", "N1");
		g.upsert_edge("T1", "N2");

		let start_n1 = (g.node("N1").unwrap().position - topic_start).magnitude();
		let start_n2 = (g.node("N2").unwrap().position - topic_start).magnitude();
		run_to_rest(&mut g, 5_000);

		let topic = g.node("T1").unwrap().position;
		assert!((topic - topic_start).magnitude() < 1.0);
		assert!((g.node("N1").unwrap().position - topic).magnitude() < start_n1);
		assert!((g.node("N2").unwrap().position - topic).magnitude() < start_n2);
	}

	#[test]
	fn small_cluster_settles() {
		let mut g = graph();
		g.upsert_node("topic", Vector::new(0.0, 0.0), 10_000.0);
		for i in 0..5 {
			let id = format!("note-{i}");
			let angle = i as f64 * 1.3;
			g.upsert_node(&id, Vector::new(6.0 * angle.cos(), 6.0 * angle.sin()), 1.0);
			g.upsert_edge("topic", &id);
		}
		run_to_rest(&mut g, 5_000);
	}

	#[test]
	fn max_speed_caps_velocity() {
		let mut g = ForceGraph::new(SimulationParameters {
			max_speed: Some(0.25),
			..SimulationParameters::default()
		});
		g.upsert_node("a", Vector::new(0.0, 0.0), 1.0);
		g.upsert_node("b", Vector::new(0.2, 0.0), 1.0);
		g.tick(0.03);
		for node in g.nodes() {
			assert!(node.velocity.magnitude() <= 0.25 + 1e-12);
		}
	}
}
