//! Board core: entities, force layout, viewport and pointer handling.
//!
//! Nothing in here touches the DOM. The browser shell feeds pointer and
//! wheel input into a [`Board`] and paints whatever it reports.

pub mod drag;
pub mod entity;
pub mod frame_loop;
pub mod graph;
pub mod organize;
pub mod state;
pub mod store;
pub mod sync;
pub mod viewport;

pub use drag::{DragController, DragTarget, Draggable};
pub use entity::{Entity, Kind, Link, Point, Size};
pub use frame_loop::{FrameScheduler, LoopStatus, ManualScheduler, RenderLoop};
pub use graph::{ForceGraph, SimulationParameters};
pub use organize::{LanguageModel, OrganizeGuard, organize};
pub use state::Board;
pub use store::{EntityStore, StoreEvent};
pub use sync::GraphSync;
pub use viewport::{Viewport, ViewportConfig};
