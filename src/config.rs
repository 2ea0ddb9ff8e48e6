//! Board configuration.
//!
//! Every section deserializes with `#[serde(default)]`, so a partial JSON
//! document only overrides the keys it names.

use serde::{Deserialize, Serialize};

use crate::board::graph::SimulationParameters;
use crate::board::viewport::ViewportConfig;
use crate::error::BoardError;

/// Top-level configuration for a board.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
	/// Force simulation constants.
	pub layout: SimulationParameters,
	/// Seconds of simulated time advanced per animation frame.
	pub timestep: f64,
	/// Pixels per node-space unit.
	pub graph_layout_scale: f64,
	/// Simulated mass of a note.
	pub note_mass: f64,
	/// Simulated mass of a topic.
	pub topic_mass: f64,
	/// Initial pan/zoom state and zoom limits.
	pub viewport: ViewportConfig,
	/// Entity sizes and colors.
	pub notes: NoteStyle,
	/// Model server and clustering options.
	pub llm: LlmConfig,
}

impl Default for BoardConfig {
	fn default() -> Self {
		Self {
			layout: SimulationParameters::default(),
			timestep: 0.03,
			graph_layout_scale: 50.0,
			note_mass: 1.0,
			topic_mass: 10_000.0,
			viewport: ViewportConfig::default(),
			notes: NoteStyle::default(),
			llm: LlmConfig::default(),
		}
	}
}

impl BoardConfig {
	/// Parse a (possibly partial) JSON configuration document.
	pub fn from_json(raw: &str) -> Result<Self, BoardError> {
		serde_json::from_str(raw).map_err(BoardError::Config)
	}
}

/// Default geometry and colors for new entities.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct NoteStyle {
	/// Note width in pixels.
	pub note_width: f64,
	/// Note height in pixels.
	pub note_height: f64,
	/// Topic width in pixels.
	pub topic_width: f64,
	/// Topic height in pixels.
	pub topic_height: f64,
	/// Topic fill color.
	pub topic_color: String,
}

impl Default for NoteStyle {
	fn default() -> Self {
		Self {
			note_width: 160.0,
			note_height: 100.0,
			topic_width: 350.0,
			topic_height: 200.0,
			topic_color: "#eee".into(),
		}
	}
}

/// Sampling parameters forwarded verbatim to the completion endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionParameters {
	/// Sampling temperature.
	pub temperature: f64,
	/// Top-k cutoff.
	pub top_k: u32,
	/// Nucleus sampling cutoff.
	pub top_p: f64,
	/// Minimum token probability relative to the best token.
	pub min_p: f64,
	/// Tokens to generate.
	pub n_predict: u32,
	/// Prompt tokens kept when the context overflows.
	pub n_keep: u32,
	/// Sampler seed. `-1` picks a random one.
	pub seed: i64,
}

impl Default for CompletionParameters {
	fn default() -> Self {
		Self {
			temperature: 0.1,
			top_k: 40,
			top_p: 0.95,
			min_p: 0.05,
			n_predict: 16,
			n_keep: 0,
			seed: -1,
		}
	}
}

/// System part of the topic-title prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful but terse assistant.";

/// User part of the topic-title prompt. `{{{items}}}` becomes the note list.
pub const DEFAULT_USER_PROMPT: &str = "Please generate a succinct label that effectively encapsulates the overall theme or purpose for the following list of items:\n\n{{{items}}}";

/// Where the model server lives and how notes get clustered.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
	/// Server root, e.g. `http://127.0.0.1:8886`.
	pub base_url: String,
	/// Sampling parameters for topic titles.
	pub parameters: CompletionParameters,
	/// See [`DEFAULT_SYSTEM_PROMPT`].
	pub system_prompt: String,
	/// See [`DEFAULT_USER_PROMPT`].
	pub user_prompt: String,
	/// Upper bound on the number of topics.
	pub num_clusters: usize,
	/// Horizontal radius of the ellipse topics are placed on.
	pub cluster_layout_radius: f64,
}

impl Default for LlmConfig {
	fn default() -> Self {
		Self {
			base_url: "http://127.0.0.1:8886".into(),
			parameters: CompletionParameters::default(),
			system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
			user_prompt: DEFAULT_USER_PROMPT.into(),
			num_clusters: 10,
			cluster_layout_radius: 1200.0,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_json_keeps_defaults() {
		let config = BoardConfig::from_json(
			r#"{ "graph_layout_scale": 25, "viewport": { "max_zoom": 2.0 }, "llm": { "num_clusters": 4 } }"#,
		)
		.unwrap();

		assert_eq!(config.graph_layout_scale, 25.0);
		assert_eq!(config.viewport.max_zoom, 2.0);
		assert_eq!(config.viewport.min_zoom, 0.1);
		assert_eq!(config.llm.num_clusters, 4);
		assert_eq!(config.llm.base_url, "http://127.0.0.1:8886");
		assert_eq!(config.layout, SimulationParameters::default());
	}

	#[test]
	fn malformed_json_is_a_config_error() {
		let err = BoardConfig::from_json("{ not json").unwrap_err();
		assert!(matches!(err, BoardError::Config(_)));
	}

	#[test]
	fn completion_parameters_serialize_flat() {
		let value = serde_json::to_value(CompletionParameters::default()).unwrap();
		assert_eq!(value["top_k"], 40);
		assert_eq!(value["seed"], -1);
	}
}
