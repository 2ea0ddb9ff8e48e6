//! The board as the browser shell sees it.
//!
//! [`Board`] ties the store, the sync layer, the viewport, drag handling and
//! the render loop together. Every mutation goes through it so that a
//! change always wakes the loop.

use log::{debug, info};

use super::drag::{DragController, DragTarget, Draggable};
use super::entity::{Entity, Point, Positioned, Size, palette_color};
use super::frame_loop::{FrameScheduler, LoopStatus, RenderLoop};
use super::graph::ForceGraph;
use super::organize::{OrganizeGuard, cluster_position};
use super::store::EntityStore;
use super::sync::GraphSync;
use super::viewport::Viewport;
use crate::config::BoardConfig;
use crate::error::BoardError;

/// Short brainstorm items used by "Add demo notes".
pub const DEMO_NOTES: &[&str] = &[
	"Buy oat milk",
	"Pick up dry cleaning",
	"Restock coffee beans",
	"Book flights to Lisbon",
	"Renew passport",
	"Find a pet sitter for the trip",
	"Write quarterly report",
	"Prepare slides for Monday standup",
	"Reply to recruiter email",
	"Fix flaky integration test",
	"Review pull request backlog",
	"Upgrade build toolchain",
	"Call mom on Sunday",
	"Plan birthday dinner",
	"Send thank-you cards",
	"Go for a run",
	"Schedule dentist appointment",
	"Try the new yoga class",
	"Read the rest of that novel",
	"Learn three chords on guitar",
];

/// Same pseudo-random sequence on every run, like the demo data generator.
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// The whole board: entities, layout, viewport, drag and render loop.
pub struct Board<S> {
	/// Settings the board was created with.
	pub config: BoardConfig,
	store: EntityStore,
	sync: GraphSync,
	viewport: Viewport,
	drag: DragController,
	render_loop: RenderLoop<S>,
	organize: OrganizeGuard,
	next_note: usize,
}

impl<S: FrameScheduler> Board<S> {
	/// An empty board with a stopped render loop.
	pub fn new(config: BoardConfig, scheduler: S) -> Self {
		let render_loop = RenderLoop::new(scheduler, config.layout.min_energy_threshold);
		Self {
			sync: GraphSync::from_config(&config),
			viewport: Viewport::new(&config.viewport),
			store: EntityStore::new(),
			drag: DragController::new(),
			render_loop,
			organize: OrganizeGuard::new(),
			next_note: 0,
			config,
		}
	}

	/// Live entities.
	pub fn store(&self) -> &EntityStore {
		&self.store
	}

	/// Current pan and zoom.
	pub fn viewport(&self) -> &Viewport {
		&self.viewport
	}

	/// The layout graph, as of the last frame.
	pub fn graph(&self) -> &ForceGraph {
		self.sync.graph()
	}

	/// Pointer drag state.
	pub fn drag(&self) -> &DragController {
		&self.drag
	}

	/// The loop driving layout frames.
	pub fn render_loop(&self) -> &RenderLoop<S> {
		&self.render_loop
	}

	/// Guard shared with any organize pass on this board.
	pub fn organize_guard(&self) -> &OrganizeGuard {
		&self.organize
	}

	/// Restart the render loop if idle.
	pub fn wake(&mut self) -> bool {
		self.render_loop.start()
	}

	/// One animation frame: apply pending structural changes, then step the
	/// layout. Returns whether another frame was scheduled.
	pub fn frame(&mut self) -> LoopStatus {
		let dt = self.config.timestep;
		let Self {
			render_loop,
			sync,
			store,
			..
		} = self;
		render_loop.frame(|| {
			for event in store.drain_events() {
				sync.apply(store, &event);
			}
			sync.step(store, dt)
		})
	}

	fn changed(&mut self) {
		if self.store.has_pending_events() {
			self.wake();
		}
	}

	/// The canvas changed size.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.viewport.resize(width, height);
		self.wake();
	}

	/// Add an entity. See [`EntityStore::insert`].
	pub fn insert(&mut self, entity: Entity) -> Result<(), BoardError> {
		self.store.insert(entity)?;
		self.changed();
		Ok(())
	}

	/// Link `topic` to `target`. See [`EntityStore::add_link`].
	pub fn add_link(&mut self, topic: &str, target: &str) -> Result<bool, BoardError> {
		let added = self.store.add_link(topic, target)?;
		self.changed();
		Ok(added)
	}

	/// Drop one link.
	pub fn remove_link(&mut self, topic: &str, target: &str) -> bool {
		let removed = self.store.remove_link(topic, target);
		self.changed();
		removed
	}

	/// Remove an entity and every link pointing at it.
	pub fn remove(&mut self, id: &str) -> Option<Entity> {
		let removed = self.store.remove(id);
		self.changed();
		removed
	}

	/// Move an entity from outside the layout.
	pub fn move_to(&mut self, id: &str, position: Point) -> bool {
		let moved = self.store.move_to(id, position);
		self.changed();
		moved
	}

	/// Add a note with a palette color near the origin. Returns its id.
	pub fn add_note(&mut self, text: &str) -> Result<String, BoardError> {
		let mut seed = self.next_note;
		while self.store.contains(&format!("note-{seed}")) {
			seed += 1;
		}
		self.next_note = seed + 1;

		let id = format!("note-{seed}");
		let position = Point::new(
			rand_simple(seed * 2) * 200.0 - 100.0,
			rand_simple(seed * 2 + 1) * 200.0 - 100.0,
		);
		let style = &self.config.notes;
		let note = Entity::note(
			id.clone(),
			text,
			position,
			Size::new(style.note_width, style.note_height),
			palette_color(seed),
		);
		self.insert(note)?;
		Ok(id)
	}

	/// Add every [`DEMO_NOTES`] item. Returns how many were added.
	pub fn add_demo_notes(&mut self) -> Result<usize, BoardError> {
		for text in DEMO_NOTES {
			self.add_note(text)?;
		}
		info!("added {} demo notes", DEMO_NOTES.len());
		Ok(DEMO_NOTES.len())
	}

	/// Remove the selected entity, if any.
	pub fn delete_selected(&mut self) -> Option<Entity> {
		let id = self.store.selected()?.id().to_owned();
		self.remove(&id)
	}

	/// Remove every topic and link, keeping notes.
	pub fn reset_topics(&mut self) -> usize {
		let removed = self.store.reset_topics();
		self.changed();
		removed
	}

	/// Remove everything.
	pub fn clear(&mut self) {
		self.store.clear();
		info!("cleared the board");
		self.changed();
	}

	/// Insert topic `cluster-{index}` placed on an ellipse around the origin
	/// and linked to `members`.
	pub fn insert_cluster_topic(
		&mut self,
		index: usize,
		count: usize,
		title: &str,
		members: &[String],
	) -> Result<String, BoardError> {
		let id = format!("cluster-{index}");
		let style = &self.config.notes;
		let topic = Entity::topic(
			id.clone(),
			title,
			cluster_position(index, count, self.config.llm.cluster_layout_radius),
			Size::new(style.topic_width, style.topic_height),
			style.topic_color.clone(),
		);
		self.store.insert_topic(topic, members)?;
		self.changed();
		Ok(id)
	}

	/// Pointer pressed at a screen position. An entity under the pointer
	/// claims the drag and is selected; otherwise the viewport pans.
	pub fn pointer_down(&mut self, screen: Point) -> Option<DragTarget> {
		if self.drag.is_active() {
			return None;
		}
		let model = self.viewport.screen_to_model(screen);
		let hit = self.store.entity_at(model).map(|entity| entity.id().to_owned());
		let target = match hit {
			Some(id) => {
				self.store.select(Some(&id));
				let drag = &mut self.drag;
				self.store
					.update(&id, |entity| drag.begin(DragTarget::Entity(id.clone()), screen, entity))?;
				DragTarget::Entity(id)
			}
			None => {
				self.store.select(None);
				self.drag.begin(DragTarget::Viewport, screen, &mut self.viewport);
				DragTarget::Viewport
			}
		};
		self.wake();
		Some(target)
	}

	/// Pointer moved. Returns `false` when no drag is live.
	pub fn pointer_move(&mut self, screen: Point) -> bool {
		let Some(session) = self.drag.session() else {
			return false;
		};
		let zoom = self.viewport.zoom();
		match session.target.clone() {
			DragTarget::Entity(id) => {
				let drag = &mut self.drag;
				if self.store.update(&id, |entity| drag.update(screen, zoom, entity)).is_none() {
					debug!("dragged entity {id} is gone");
				}
			}
			DragTarget::Viewport => {
				self.drag.update(screen, zoom, &mut self.viewport);
			}
		}
		self.wake();
		true
	}

	/// End any drag, even if its entity was removed mid-drag.
	pub fn pointer_up(&mut self) -> Option<DragTarget> {
		let session = self.drag.end()?;
		match &session.target {
			DragTarget::Entity(id) => {
				self.store.set_dragging(id, false);
			}
			DragTarget::Viewport => self.viewport.set_dragging(false),
		}
		self.wake();
		Some(session.target)
	}

	/// Wheel zoom around the cursor. Returns the new zoom.
	pub fn wheel(&mut self, delta_y: f64, cursor: Point) -> f64 {
		let zoom = self.viewport.wheel(delta_y, cursor);
		self.wake();
		zoom
	}

	/// Set the zoom, clamped to the configured limits.
	pub fn set_zoom(&mut self, zoom: f64) {
		self.viewport.set_zoom(zoom);
		self.wake();
	}

	/// Model position of an entity, if live.
	pub fn position_of(&self, id: &str) -> Option<Point> {
		self.store.get(id).map(Positioned::position)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::board::frame_loop::ManualScheduler;

	fn board() -> (Board<ManualScheduler>, ManualScheduler) {
		let scheduler = ManualScheduler::new();
		let mut board = Board::new(BoardConfig::default(), scheduler.clone());
		board.viewport.resize(800.0, 600.0);
		(board, scheduler)
	}

	fn settle(board: &mut Board<ManualScheduler>, scheduler: &ManualScheduler) -> usize {
		let mut frames = 0;
		while scheduler.take() {
			board.frame();
			frames += 1;
			assert!(frames < 10_000, "render loop never stopped");
		}
		frames
	}

	#[test]
	fn adding_notes_wakes_the_loop_and_it_stops_at_rest() {
		let (mut board, scheduler) = board();
		let id = board.add_note("first").unwrap();
		assert!(board.render_loop().is_running());

		settle(&mut board, &scheduler);
		assert!(!board.render_loop().is_running());
		assert!(board.graph().contains_node(&id));
	}

	#[test]
	fn note_ids_skip_taken_ones() {
		let (mut board, _) = board();
		board
			.insert(Entity::note("note-0", "taken", Point::ZERO, Size::new(1.0, 1.0), "#fff"))
			.unwrap();
		assert_eq!(board.add_note("next").unwrap(), "note-1");
		assert_eq!(board.add_note("again").unwrap(), "note-2");
	}

	#[test]
	fn demo_topic_cluster_converges_in_bounded_frames() {
		let (mut board, scheduler) = board();
		let notes: Vec<String> = (0..5).map(|i| board.add_note(&format!("n{i}")).unwrap()).collect();
		board.insert_cluster_topic(0, 1, "Errands", &notes).unwrap();

		let frames = settle(&mut board, &scheduler);
		assert!(frames > 0);
		assert_eq!(board.graph().edge_count(), 5);
		assert!(!board.render_loop().is_running());
	}

	#[test]
	fn dragging_a_note_overrides_layout() {
		let (mut board, scheduler) = board();
		board
			.insert(Entity::note("n", "drag", Point::new(10.0, 10.0), Size::new(100.0, 100.0), "#fff"))
			.unwrap();
		board.set_zoom(2.0);
		settle(&mut board, &scheduler);

		let start = board.viewport().model_to_screen(board.position_of("n").unwrap());
		let origin = board.position_of("n").unwrap();
		assert_eq!(board.pointer_down(start), Some(DragTarget::Entity("n".into())));
		assert_eq!(board.store().selected().unwrap().id(), "n");

		board.pointer_move(Point::new(start.x + 20.0, start.y - 5.0));
		board.frame();
		let now = board.position_of("n").unwrap();
		assert!((now.x - (origin.x + 10.0)).abs() < 1e-9);
		assert!((now.y - (origin.y - 2.5)).abs() < 1e-9);

		assert_eq!(board.pointer_up(), Some(DragTarget::Entity("n".into())));
		assert!(!board.store().get("n").unwrap().is_dragging());
	}

	#[test]
	fn pressing_empty_space_pans() {
		let (mut board, _) = board();
		board.set_zoom(1.0);
		assert_eq!(board.pointer_down(Point::new(400.0, 300.0)), Some(DragTarget::Viewport));
		board.pointer_move(Point::new(450.0, 280.0));
		assert_eq!(board.viewport().origin(), Point::new(-50.0, 20.0));
		board.pointer_up();
		assert!(!board.drag().is_active());
	}

	#[test]
	fn removing_the_dragged_note_still_ends_the_drag() {
		let (mut board, _) = board();
		board
			.insert(Entity::note("n", "bye", Point::ZERO, Size::new(100.0, 100.0), "#fff"))
			.unwrap();
		board.set_zoom(1.0);
		board.pointer_down(Point::new(400.0, 300.0));
		board.remove("n");

		assert!(board.pointer_move(Point::new(410.0, 310.0)));
		assert_eq!(board.pointer_up(), Some(DragTarget::Entity("n".into())));
		assert!(!board.drag().is_active());
		assert!(board.pointer_up().is_none());
	}

	#[test]
	fn delete_selected_and_reset_topics() {
		let (mut board, _) = board();
		let a = board.add_note("a").unwrap();
		board.add_note("b").unwrap();
		board.insert_cluster_topic(0, 2, "Things", &[a.clone()]).unwrap();

		assert_eq!(board.reset_topics(), 1);
		assert_eq!(board.store().len(), 2);

		board.store.select(Some(&a));
		assert_eq!(board.delete_selected().unwrap().id(), a);
		assert!(board.delete_selected().is_none());

		board.clear();
		assert!(board.store().is_empty());
	}
}
