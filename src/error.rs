//! Error type shared by the board and the model client.

use thiserror::Error;

/// Failures surfaced by the board core and its model-server glue.
///
/// Layout and sync operations never fail; lookups that miss are no-ops.
#[derive(Debug, Error)]
pub enum BoardError {
	/// An entity with this id is already live.
	#[error("entity `{0}` already exists")]
	DuplicateEntity(String),
	/// No live entity has this id.
	#[error("no entity with id `{0}`")]
	UnknownEntity(String),
	/// Links may only hang off topics.
	#[error("entity `{0}` is not a topic")]
	NotATopic(String),
	/// The board configuration could not be parsed.
	#[error("invalid board configuration: {0}")]
	Config(#[source] serde_json::Error),
	/// A request to the model server failed before a response was read.
	#[error("model server request failed: {0}")]
	Request(String),
	/// The model server answered with something we could not decode.
	#[error("could not decode model server response: {0}")]
	Decode(#[source] serde_json::Error),
	/// The embedding endpoint returned the wrong number of vectors.
	#[error("expected {expected} embeddings, got {actual}")]
	EmbeddingCount {
		/// Number of texts sent.
		expected: usize,
		/// Number of vectors received.
		actual: usize,
	},
	/// An organize pass is already running.
	#[error("notes are already being organized")]
	OrganizeInProgress,
	/// Organize was requested on an empty board.
	#[error("there are no notes to organize")]
	NothingToOrganize,
}
