//! Sticky-notes canvas: a pannable, zoomable board of notes that a force
//! layout pulls towards the topics they belong to.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info, warn};

// Modules
pub mod board;
pub mod config;
pub mod error;
pub mod llm;
mod components;
mod pages;

pub use components::sticky_notes::{AnimationFrameScheduler, StickyNotesBoard};

// Top-Level pages
use crate::config::BoardConfig;
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

/// Id of the optional inline JSON element holding a [`BoardConfig`].
pub const CONFIG_ELEMENT_ID: &str = "sticky-notes-config";

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// Read the board configuration from the page, falling back to defaults when
/// it is missing or malformed.
pub fn load_config() -> BoardConfig {
	let raw = web_sys::window()
		.and_then(|window| window.document())
		.and_then(|document| document.get_element_by_id(CONFIG_ELEMENT_ID))
		.and_then(|element| element.text_content());
	let Some(raw) = raw else {
		return BoardConfig::default();
	};
	match BoardConfig::from_json(&raw) {
		Ok(config) => {
			info!("loaded board configuration from #{CONFIG_ELEMENT_ID}");
			config
		}
		Err(err) => {
			warn!("{err}; using the default configuration");
			BoardConfig::default()
		}
	}
}

/// An app router which renders the board and handles 404's
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />

		// sets the document title
		<Title text="Sticky Notes" />

		// injects metadata in the <head> of the page
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
