//! Canvas 2D painting of the board.

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::board::drag::Draggable;
use crate::board::entity::{Colorable, Entity, Point, Positioned, Sizeable};
use crate::board::{Board, FrameScheduler};

const BACKGROUND: &str = "#f4f1ea";
const LINK_COLOR: &str = "rgba(90, 90, 90, 0.45)";
const SELECTION_COLOR: &str = "#3b82f6";
const TEXT_COLOR: &str = "#222";
const CORNER_RADIUS: f64 = 6.0;
const PADDING: f64 = 10.0;
const NOTE_FONT_PX: f64 = 14.0;
const TOPIC_FONT_PX: f64 = 22.0;

/// Greedy word wrap. `measure` returns the rendered width of a string.
/// Words wider than `max_width` get a line of their own.
pub fn wrap_lines(text: &str, max_width: f64, measure: impl Fn(&str) -> f64) -> Vec<String> {
	let mut lines = Vec::new();
	for paragraph in text.lines() {
		let mut line = String::new();
		for word in paragraph.split_whitespace() {
			if line.is_empty() {
				line.push_str(word);
				continue;
			}
			let candidate = format!("{line} {word}");
			if measure(&candidate) <= max_width {
				line = candidate;
			} else {
				lines.push(std::mem::replace(&mut line, word.to_owned()));
			}
		}
		lines.push(line);
	}
	lines
}

/// Paint one frame: background, links, topics, notes, then the selection.
pub fn render<S: FrameScheduler>(board: &Board<S>, ctx: &CanvasRenderingContext2d) {
	let size = board.viewport().size();
	let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, size.width, size.height);

	let t = board.viewport().transform();
	ctx.save();
	let _ = ctx.set_transform(t.k, 0.0, 0.0, t.k, t.x, t.y);
	draw_links(board, ctx, t.k);
	for entity in board.store().iter() {
		if entity.is_topic() {
			draw_topic(entity, ctx);
		} else {
			draw_note(entity, ctx);
		}
	}
	if let Some(selected) = board.store().selected() {
		outline(selected, ctx, t.k);
	}
	ctx.restore();
}

fn draw_links<S: FrameScheduler>(board: &Board<S>, ctx: &CanvasRenderingContext2d, k: f64) {
	let store = board.store();
	ctx.set_stroke_style_str(LINK_COLOR);
	ctx.set_line_width(2.0 / k);
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(8.0 / k),
		&JsValue::from_f64(6.0 / k),
	));
	for link in store.links() {
		let (Some(topic), Some(target)) = (store.get(&link.topic), store.get(&link.target)) else {
			continue;
		};
		let (a, b) = (topic.position(), target.position());
		ctx.begin_path();
		ctx.move_to(a.x, a.y);
		ctx.line_to(b.x, b.y);
		ctx.stroke();
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn rounded_rect(ctx: &CanvasRenderingContext2d, center: Point, width: f64, height: f64, radius: f64) {
	let (left, top) = (center.x - width / 2.0, center.y - height / 2.0);
	let (right, bottom) = (left + width, top + height);
	let r = radius.min(width / 2.0).min(height / 2.0).max(0.0);
	ctx.begin_path();
	ctx.move_to(left + r, top);
	let _ = ctx.arc_to(right, top, right, bottom, r);
	let _ = ctx.arc_to(right, bottom, left, bottom, r);
	let _ = ctx.arc_to(left, bottom, left, top, r);
	let _ = ctx.arc_to(left, top, right, top, r);
	ctx.close_path();
}

fn draw_topic(topic: &Entity, ctx: &CanvasRenderingContext2d) {
	let (center, size) = (topic.position(), topic.size());
	rounded_rect(ctx, center, size.width, size.height, CORNER_RADIUS * 2.0);
	ctx.set_fill_style_str(topic.color());
	ctx.fill();

	ctx.set_font(&format!("bold {TOPIC_FONT_PX}px sans-serif"));
	ctx.set_fill_style_str(TEXT_COLOR);
	let left = center.x - size.width / 2.0 + PADDING;
	let mut y = center.y - size.height / 2.0 + PADDING + TOPIC_FONT_PX;
	for line in wrap_lines(topic.label(), size.width - 2.0 * PADDING, |s| measure(ctx, s)) {
		let _ = ctx.fill_text(&line, left, y);
		y += TOPIC_FONT_PX * 1.2;
	}
}

fn draw_note(note: &Entity, ctx: &CanvasRenderingContext2d) {
	let (center, size) = (note.position(), note.size());
	ctx.save();
	ctx.set_shadow_color("rgba(0, 0, 0, 0.25)");
	ctx.set_shadow_blur(if note.is_dragging() { 16.0 } else { 6.0 });
	ctx.set_shadow_offset_x(2.0);
	ctx.set_shadow_offset_y(3.0);
	rounded_rect(ctx, center, size.width, size.height, CORNER_RADIUS);
	ctx.set_fill_style_str(note.color());
	ctx.fill();
	ctx.restore();

	ctx.set_font(&format!("{NOTE_FONT_PX}px sans-serif"));
	ctx.set_fill_style_str(TEXT_COLOR);
	let left = center.x - size.width / 2.0 + PADDING;
	let bottom = center.y + size.height / 2.0 - PADDING;
	let mut y = center.y - size.height / 2.0 + PADDING + NOTE_FONT_PX;
	for line in wrap_lines(note.label(), size.width - 2.0 * PADDING, |s| measure(ctx, s)) {
		if y > bottom {
			break;
		}
		let _ = ctx.fill_text(&line, left, y);
		y += NOTE_FONT_PX * 1.3;
	}
}

fn outline(entity: &Entity, ctx: &CanvasRenderingContext2d, k: f64) {
	let size = entity.size();
	let gap = 4.0 / k;
	rounded_rect(
		ctx,
		entity.position(),
		size.width + 2.0 * gap,
		size.height + 2.0 * gap,
		CORNER_RADIUS + gap,
	);
	ctx.set_stroke_style_str(SELECTION_COLOR);
	ctx.set_line_width(2.0 / k);
	ctx.stroke();
}

fn measure(ctx: &CanvasRenderingContext2d, text: &str) -> f64 {
	ctx.measure_text(text).map(|m| m.width()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chars(s: &str) -> f64 {
		s.chars().count() as f64
	}

	#[test]
	fn wraps_on_word_boundaries() {
		let lines = wrap_lines("Book flights to Lisbon", 12.0, chars);
		assert_eq!(lines, ["Book flights", "to Lisbon"]);
	}

	#[test]
	fn long_words_and_newlines() {
		let lines = wrap_lines("supercalifragilistic\nok", 5.0, chars);
		assert_eq!(lines, ["supercalifragilistic", "ok"]);
		assert!(wrap_lines("", 10.0, chars).is_empty());
	}
}
