mod component;
mod render;
mod scheduler;

pub use component::StickyNotesBoard;
pub use scheduler::AnimationFrameScheduler;
