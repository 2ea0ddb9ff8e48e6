//! Organize notes into topics with an embedding/completion model.
//!
//! The pass embeds every note, groups the vectors with spherical k-means,
//! asks the model for a short label per group and drops one topic per group
//! onto an ellipse around the origin. The layout then pulls each note
//! towards its topic.

use std::cell::{Cell, RefCell};
use std::f64::consts::TAU;
use std::future::Future;
use std::rc::Rc;

use log::{debug, info, warn};

use super::entity::Point;
use super::frame_loop::FrameScheduler;
use super::state::Board;
use crate::config::CompletionParameters;
use crate::error::BoardError;

const KMEANS_MAX_ITERATIONS: usize = 100;

/// Embedding and completion endpoints of a language model server.
pub trait LanguageModel {
	/// One vector per input text, in input order.
	fn embed(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f64>>, BoardError>>;

	/// Completion text for `prompt`.
	fn complete(
		&self,
		prompt: &str,
		parameters: &CompletionParameters,
	) -> impl Future<Output = Result<String, BoardError>>;
}

/// Allows at most one organize pass in flight.
#[derive(Clone, Debug, Default)]
pub struct OrganizeGuard {
	busy: Rc<Cell<bool>>,
}

/// Held for the duration of an organize pass.
#[derive(Debug)]
pub struct OrganizeTicket {
	busy: Rc<Cell<bool>>,
}

impl OrganizeGuard {
	/// An idle guard.
	pub fn new() -> Self {
		Self::default()
	}

	/// `true` while a ticket is alive.
	pub fn is_busy(&self) -> bool {
		self.busy.get()
	}

	/// Claim the guard. `None` while another pass holds it.
	pub fn try_begin(&self) -> Option<OrganizeTicket> {
		if self.busy.replace(true) {
			return None;
		}
		Some(OrganizeTicket {
			busy: Rc::clone(&self.busy),
		})
	}
}

impl Drop for OrganizeTicket {
	fn drop(&mut self) {
		self.busy.set(false);
	}
}

/// Build a chat prompt in the Zephyr format. `{{{items}}}` in either part
/// becomes a bulleted list.
pub fn render_prompt(system: &str, user: &str, items: &[&str]) -> String {
	let list = items
		.iter()
		.map(|item| format!("- {item}"))
		.collect::<Vec<_>>()
		.join("\n");
	format!("<|system|>\n{system}</s>\n<|user|>\n{user}\n</s>\n<|assistant|>").replacen("{{{items}}}", &list, 1)
}

/// Where topic `index` of `count` goes.
pub fn cluster_position(index: usize, count: usize, radius: f64) -> Point {
	let angle = index as f64 / count.max(1) as f64 * TAU;
	Point::new(angle.cos() * radius, angle.sin() * radius / 2.0)
}

fn normalized(vector: &[f64]) -> Vec<f64> {
	let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
	if norm > 0.0 && norm.is_finite() {
		vector.iter().map(|v| v / norm).collect()
	} else {
		vec![0.0; vector.len()]
	}
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
	a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cluster vectors by cosine similarity into at most `k` groups. Returns the
/// member indices of each non-empty group. Centroids start at evenly spaced
/// inputs, so the result is deterministic.
pub fn spherical_kmeans(vectors: &[Vec<f64>], k: usize) -> Vec<Vec<usize>> {
	let n = vectors.len();
	let k = k.min(n);
	if k == 0 {
		return Vec::new();
	}
	let points: Vec<Vec<f64>> = vectors.iter().map(|v| normalized(v)).collect();
	let mut centroids: Vec<Vec<f64>> = (0..k).map(|i| points[i * n / k].clone()).collect();
	let mut assignment = vec![usize::MAX; n];

	for iteration in 0..KMEANS_MAX_ITERATIONS {
		let mut changed = false;
		for (point, slot) in points.iter().zip(assignment.iter_mut()) {
			let mut best = 0;
			let mut best_score = f64::NEG_INFINITY;
			for (c, centroid) in centroids.iter().enumerate() {
				let score = dot(point, centroid);
				if score > best_score {
					best = c;
					best_score = score;
				}
			}
			if *slot != best {
				*slot = best;
				changed = true;
			}
		}
		if !changed {
			debug!("k-means converged after {iteration} iterations");
			break;
		}

		for (c, centroid) in centroids.iter_mut().enumerate() {
			let mut sum = vec![0.0; centroid.len()];
			let mut members = 0;
			for (point, _) in points.iter().zip(&assignment).filter(|(_, a)| **a == c) {
				for (s, v) in sum.iter_mut().zip(point) {
					*s += v;
				}
				members += 1;
			}
			// an empty cluster keeps its old centroid
			if members > 0 {
				*centroid = normalized(&sum);
			}
		}
	}

	(0..k)
		.map(|c| (0..n).filter(|&i| assignment[i] == c).collect::<Vec<_>>())
		.filter(|members| !members.is_empty())
		.collect()
}

/// Replace all topics with freshly clustered ones. Returns the number of
/// topics created.
///
/// The board is only borrowed between awaits, so it stays usable while the
/// model answers. Notes deleted in the meantime are left out of their topic.
pub async fn organize<S, M>(board: &RefCell<Board<S>>, model: &M) -> Result<usize, BoardError>
where
	S: FrameScheduler,
	M: LanguageModel,
{
	let guard = board.borrow().organize_guard().clone();
	let _ticket = guard.try_begin().ok_or(BoardError::OrganizeInProgress)?;

	let (ids, texts, llm) = {
		let mut board = board.borrow_mut();
		board.reset_topics();
		let (ids, texts): (Vec<String>, Vec<String>) = board
			.store()
			.notes()
			.map(|note| (note.id().to_owned(), note.label().to_owned()))
			.unzip();
		(ids, texts, board.config.llm.clone())
	};
	if ids.is_empty() {
		return Err(BoardError::NothingToOrganize);
	}
	info!("organizing {} notes", ids.len());

	let embeddings = model.embed(&texts).await?;
	if embeddings.len() != texts.len() {
		return Err(BoardError::EmbeddingCount {
			expected: texts.len(),
			actual: embeddings.len(),
		});
	}

	let clusters = spherical_kmeans(&embeddings, llm.num_clusters);
	for (index, members) in clusters.iter().enumerate() {
		let items: Vec<&str> = members.iter().map(|&i| texts[i].as_str()).collect();
		let prompt = render_prompt(&llm.system_prompt, &llm.user_prompt, &items);
		let content = match model.complete(&prompt, &llm.parameters).await {
			Ok(content) => content,
			Err(err) => {
				warn!("no label for cluster {index}: {err}");
				String::new()
			}
		};
		let title = match content.trim() {
			"" => format!("Topic {index}"),
			title => title.to_owned(),
		};

		let mut board = board.borrow_mut();
		let live: Vec<String> = members
			.iter()
			.map(|&i| ids[i].clone())
			.filter(|id| board.store().contains(id))
			.collect();
		board.insert_cluster_topic(index, clusters.len(), &title, &live)?;
	}

	info!("organized notes into {} topics", clusters.len());
	Ok(clusters.len())
}

#[cfg(test)]
mod tests {
	use std::pin::pin;
	use std::task::{Context, Poll, Waker};

	use super::*;
	use crate::board::entity::Positioned;
	use crate::board::frame_loop::ManualScheduler;
	use crate::config::BoardConfig;

	fn block_on<F: Future>(future: F) -> F::Output {
		let mut future = pin!(future);
		let mut cx = Context::from_waker(Waker::noop());
		loop {
			if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
				return output;
			}
		}
	}

	/// Embeds shopping notes along x and everything else along y.
	struct KeywordModel {
		prompts: RefCell<Vec<String>>,
	}

	impl KeywordModel {
		fn new() -> Self {
			Self {
				prompts: RefCell::new(Vec::new()),
			}
		}
	}

	impl LanguageModel for KeywordModel {
		async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, BoardError> {
			Ok(texts
				.iter()
				.map(|text| if text.starts_with("Buy") { vec![1.0, 0.1] } else { vec![0.1, 1.0] })
				.collect())
		}

		async fn complete(&self, prompt: &str, _: &CompletionParameters) -> Result<String, BoardError> {
			self.prompts.borrow_mut().push(prompt.to_owned());
			Ok(if prompt.contains("- Buy") { "  Shopping\n".into() } else { String::new() })
		}
	}

	fn board_with(notes: &[&str]) -> RefCell<Board<ManualScheduler>> {
		let config = BoardConfig::from_json(r#"{ "llm": { "num_clusters": 2 } }"#).unwrap();
		let mut board = Board::new(config, ManualScheduler::new());
		for text in notes {
			board.add_note(text).unwrap();
		}
		RefCell::new(board)
	}

	#[test]
	fn prompt_lists_items() {
		let prompt = render_prompt("Be terse.", "Label these:\n\n{{{items}}}", &["milk", "eggs"]);
		assert_eq!(
			prompt,
			"<|system|>\nBe terse.</s>\n<|user|>\nLabel these:\n\n- milk\n- eggs\n</s>\n<|assistant|>"
		);
	}

	#[test]
	fn topics_sit_on_an_ellipse() {
		let first = cluster_position(0, 4, 1200.0);
		assert!((first.x - 1200.0).abs() < 1e-9 && first.y.abs() < 1e-9);
		let second = cluster_position(1, 4, 1200.0);
		assert!(second.x.abs() < 1e-9 && (second.y - 600.0).abs() < 1e-9);
	}

	#[test]
	fn kmeans_groups_by_direction() {
		let vectors = vec![vec![1.0, 0.0], vec![0.0, 2.0], vec![3.0, 0.3], vec![0.1, 0.9]];
		assert_eq!(spherical_kmeans(&vectors, 2), vec![vec![0, 2], vec![1, 3]]);
	}

	#[test]
	fn kmeans_drops_empty_clusters_and_caps_k() {
		let same = vec![vec![1.0, 1.0]; 3];
		assert_eq!(spherical_kmeans(&same, 10), vec![vec![0, 1, 2]]);
		assert!(spherical_kmeans(&[], 3).is_empty());
	}

	#[test]
	fn guard_rejects_a_second_pass() {
		let guard = OrganizeGuard::new();
		let ticket = guard.try_begin().unwrap();
		assert!(guard.is_busy());
		assert!(guard.try_begin().is_none());
		drop(ticket);
		assert!(guard.try_begin().is_some());
	}

	#[test]
	fn organize_creates_linked_topics() {
		let board = board_with(&["Buy milk", "Buy eggs", "Call mom", "Go for a run"]);
		let model = KeywordModel::new();

		assert_eq!(block_on(organize(&board, &model)).unwrap(), 2);
		let board = board.borrow();
		let shopping = board.store().get("cluster-0").unwrap();
		assert_eq!(shopping.label(), "Shopping");
		assert_eq!(shopping.links(), ["note-0", "note-1"]);
		assert_eq!(shopping.position(), cluster_position(0, 2, 1200.0));

		let other = board.store().get("cluster-1").unwrap();
		assert_eq!(other.label(), "Topic 1");
		assert_eq!(other.links(), ["note-2", "note-3"]);
		assert!(model.prompts.borrow()[0].contains("- Buy milk\n- Buy eggs"));
		assert!(!board.organize_guard().is_busy());
	}

	#[test]
	fn organize_replaces_previous_topics() {
		let board = board_with(&["Buy milk", "Call mom"]);
		let model = KeywordModel::new();
		block_on(organize(&board, &model)).unwrap();
		block_on(organize(&board, &model)).unwrap();
		assert_eq!(board.borrow().store().topics().count(), 2);
	}

	#[test]
	fn organize_refuses_while_busy_or_empty() {
		let board = board_with(&["Buy milk"]);
		let ticket = board.borrow().organize_guard().try_begin().unwrap();
		let err = block_on(organize(&board, &KeywordModel::new())).unwrap_err();
		assert!(matches!(err, BoardError::OrganizeInProgress));
		drop(ticket);

		let empty = board_with(&[]);
		let err = block_on(organize(&empty, &KeywordModel::new())).unwrap_err();
		assert!(matches!(err, BoardError::NothingToOrganize));
		assert!(!empty.borrow().organize_guard().is_busy());
	}

	struct ShortModel;

	impl LanguageModel for ShortModel {
		async fn embed(&self, _: &[String]) -> Result<Vec<Vec<f64>>, BoardError> {
			Ok(vec![vec![1.0]])
		}

		async fn complete(&self, _: &str, _: &CompletionParameters) -> Result<String, BoardError> {
			Ok("unused".into())
		}
	}

	#[test]
	fn mismatched_embeddings_are_rejected() {
		let board = board_with(&["a", "b"]);
		let err = block_on(organize(&board, &ShortModel)).unwrap_err();
		assert!(matches!(err, BoardError::EmbeddingCount { expected: 2, actual: 1 }));
	}
}
