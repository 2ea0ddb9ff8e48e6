//! Browser entry point: mounts the sticky-notes app.

use sticky_notes_canvas::{App, init_logging};

fn main() {
	init_logging();
	leptos::mount::mount_to_body(App);
}
