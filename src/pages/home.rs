use leptos::prelude::*;

use crate::components::sticky_notes::StickyNotesBoard;
use crate::load_config;

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let config = load_config();

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>
			<StickyNotesBoard config=config />
		</ErrorBoundary>
	}
}
