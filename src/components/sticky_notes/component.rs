use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::scheduler::AnimationFrameScheduler;
use crate::board::entity::Point;
use crate::board::{Board, DragTarget, FrameScheduler, OrganizeGuard, organize};
use crate::config::BoardConfig;
use crate::llm::LlamafileClient;

type SharedBoard = Rc<RefCell<Board<AnimationFrameScheduler>>>;
type ListenerSlot = Rc<RefCell<Option<Closure<dyn FnMut(MouseEvent)>>>>;

const NEW_NOTE_TEXT: &str = "New note";
const CLEAR_PROMPT: &str = "Are you sure you want to clear all notes?";

fn canvas_point(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> Point {
	let rect = canvas.get_bounding_client_rect();
	Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

fn window_size(window: &Window) -> (f64, f64) {
	let dimension = |value: Result<JsValue, JsValue>| value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
	(dimension(window.inner_width()), dimension(window.inner_height()))
}

fn fit_to_window(window: &Window, canvas: &HtmlCanvasElement, board: &SharedBoard) {
	let (w, h) = window_size(window);
	canvas.set_width(w as u32);
	canvas.set_height(h as u32);
	board.borrow_mut().resize(w, h);
}

fn status_line<S: FrameScheduler>(board: &Board<S>) -> String {
	let store = board.store();
	format!(
		"{} notes, {} topics, zoom {:.0}%",
		store.notes().count(),
		store.topics().count(),
		board.viewport().zoom() * 100.0
	)
}

/// `None` while a pass is already running, so its message stays up.
fn organizing_message(guard: &OrganizeGuard) -> Option<String> {
	(!guard.is_busy()).then(|| "Organizing notes...".to_owned())
}

/// A dismissed or failed prompt counts as "no".
fn clear_confirmed(ask: impl FnOnce(&str) -> Option<bool>) -> bool {
	ask(CLEAR_PROMPT).unwrap_or(false)
}

fn listen(window: &Window, event: &str, slot: &ListenerSlot) {
	if let Some(ref cb) = *slot.borrow() {
		let _ = window.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref());
	}
}

fn unlisten(window: &Window, event: &str, slot: &ListenerSlot) {
	if let Some(ref cb) = *slot.borrow() {
		let _ = window.remove_event_listener_with_callback(event, cb.as_ref().unchecked_ref());
	}
}

/// Full-window sticky-notes board with its control panel.
#[component]
pub fn StickyNotesBoard(
	/// Layout, viewport and model server settings.
	config: BoardConfig,
) -> impl IntoView {
	let scheduler = AnimationFrameScheduler::new();
	let frame_slot = scheduler.slot();
	let client = LlamafileClient::new(config.llm.base_url.clone());
	let board: SharedBoard = Rc::new(RefCell::new(Board::new(config, scheduler)));

	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let status = RwSignal::new(String::new());
	let message = RwSignal::new(None::<String>);
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let drag_move: ListenerSlot = Rc::new(RefCell::new(None));
	let drag_end: ListenerSlot = Rc::new(RefCell::new(None));
	let (board_init, move_init, end_init) = (board.clone(), drag_move.clone(), drag_end.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			warn!("canvas has no 2d context");
			return;
		};

		let board_frame = board_init.clone();
		*frame_slot.borrow_mut() = Some(Closure::new(move || {
			let mut board = board_frame.borrow_mut();
			board.frame();
			render::render(&board, &ctx);
			status.set(status_line(&board));
		}));

		let (board_resize, canvas_resize) = (board_init.clone(), canvas.clone());
		*resize_cb.borrow_mut() = Some(Closure::new(move || {
			if let Some(win) = web_sys::window() {
				fit_to_window(&win, &canvas_resize, &board_resize);
			}
		}));
		if let Some(ref cb) = *resize_cb.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (board_move, canvas_move) = (board_init.clone(), canvas.clone());
		*move_init.borrow_mut() = Some(Closure::new(move |ev: MouseEvent| {
			board_move.borrow_mut().pointer_move(canvas_point(&canvas_move, &ev));
		}));

		// listeners stay stored after mouseup; only the registration goes
		let (board_up, move_up, end_up) = (board_init.clone(), move_init.clone(), end_init.clone());
		*end_init.borrow_mut() = Some(Closure::new(move |_: MouseEvent| {
			board_up.borrow_mut().pointer_up();
			if let Some(win) = web_sys::window() {
				unlisten(&win, "mousemove", &move_up);
				unlisten(&win, "mouseup", &end_up);
			}
		}));

		fit_to_window(&window, &canvas, &board_init);
		info!("board mounted");
	});

	let (board_md, move_md, end_md) = (board.clone(), drag_move.clone(), drag_end.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let target = board_md.borrow_mut().pointer_down(canvas_point(&canvas, &ev));
		if let Some(DragTarget::Entity(_)) = target {
			ev.prevent_default();
			ev.stop_propagation();
		}
		if let (Some(_), Some(window)) = (target, web_sys::window()) {
			listen(&window, "mousemove", &move_md);
			listen(&window, "mouseup", &end_md);
		}
	};

	let board_wh = board.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		board_wh.borrow_mut().wheel(ev.delta_y(), canvas_point(&canvas, &ev));
	};

	let board_org = board.clone();
	let on_organize = move |_: MouseEvent| {
		let Some(started) = organizing_message(board_org.borrow().organize_guard()) else {
			return;
		};
		let (board, client) = (board_org.clone(), client.clone());
		message.set(Some(started));
		spawn_local(async move {
			match organize(&board, &client).await {
				Ok(count) => message.set(Some(format!("Organized notes into {count} topics"))),
				Err(err) => {
					warn!("organize failed: {err}");
					message.set(Some(err.to_string()));
				}
			}
		});
	};

	let board_add = board.clone();
	let on_add_note = move |_: MouseEvent| {
		if let Err(err) = board_add.borrow_mut().add_note(NEW_NOTE_TEXT) {
			warn!("could not add note: {err}");
		}
	};

	let board_demo = board.clone();
	let on_demo_notes = move |_: MouseEvent| {
		if let Err(err) = board_demo.borrow_mut().add_demo_notes() {
			warn!("could not add demo notes: {err}");
		}
	};

	let board_del = board.clone();
	let on_delete_selected = move |_: MouseEvent| {
		board_del.borrow_mut().delete_selected();
	};

	let board_topics = board.clone();
	let on_delete_topics = move |_: MouseEvent| {
		board_topics.borrow_mut().reset_topics();
		message.set(None);
	};

	let board_clear = board.clone();
	let on_clear = move |_: MouseEvent| {
		let window = web_sys::window();
		let ask = |prompt: &str| window.as_ref().and_then(|w| w.confirm_with_message(prompt).ok());
		if !clear_confirmed(ask) {
			return;
		}
		board_clear.borrow_mut().clear();
		message.set(None);
	};

	view! {
		<div class="sticky-notes">
			<canvas
				node_ref=canvas_ref
				class="sticky-notes-canvas"
				on:mousedown=on_mousedown
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
			<div class="sticky-notes-controls">
				<button on:click=on_organize>"Organize"</button>
				<button on:click=on_add_note>"Add note"</button>
				<button on:click=on_demo_notes>"Add demo notes"</button>
				<button on:click=on_delete_selected>"Delete selected"</button>
				<button on:click=on_delete_topics>"Delete topics"</button>
				<button on:click=on_clear>"Delete all"</button>
				<p class="status">{move || status.get()}</p>
				<p class="message">{move || message.get()}</p>
			</div>
		</div>
	}
}
