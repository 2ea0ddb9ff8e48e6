//! HTTP client for a llamafile (llama.cpp) server.

use serde::{Deserialize, Serialize};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response};

use crate::board::organize::LanguageModel;
use crate::config::CompletionParameters;
use crate::error::BoardError;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
	content: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
	results: Vec<EmbeddingResult>,
}

#[derive(Deserialize)]
struct EmbeddingResult {
	embedding: Vec<f64>,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
	prompt: &'a str,
	#[serde(flatten)]
	parameters: &'a CompletionParameters,
}

#[derive(Deserialize)]
struct CompletionResponse {
	content: String,
}

/// Body for `POST /embedding`.
pub fn embedding_body(texts: &[String]) -> Result<String, BoardError> {
	serde_json::to_string(&EmbeddingRequest { content: texts }).map_err(|e| BoardError::Request(e.to_string()))
}

/// Body for `POST /completion`: the prompt plus every sampling parameter at
/// the top level.
pub fn completion_body(prompt: &str, parameters: &CompletionParameters) -> Result<String, BoardError> {
	serde_json::to_string(&CompletionRequest { prompt, parameters }).map_err(|e| BoardError::Request(e.to_string()))
}

/// Vectors from an `/embedding` response, in result order.
pub fn decode_embeddings(body: &str) -> Result<Vec<Vec<f64>>, BoardError> {
	let response: EmbeddingResponse = serde_json::from_str(body).map_err(BoardError::Decode)?;
	Ok(response.results.into_iter().map(|r| r.embedding).collect())
}

/// Generated text from a `/completion` response.
pub fn decode_completion(body: &str) -> Result<String, BoardError> {
	let response: CompletionResponse = serde_json::from_str(body).map_err(BoardError::Decode)?;
	Ok(response.content)
}

fn js_error(context: &str, err: JsValue) -> BoardError {
	BoardError::Request(format!("{context}: {err:?}"))
}

/// Talks to `{base_url}/embedding` and `{base_url}/completion` with `fetch`.
#[derive(Clone, Debug)]
pub struct LlamafileClient {
	base_url: String,
}

impl LlamafileClient {
	/// A trailing `/` on `base_url` is dropped.
	pub fn new(base_url: impl Into<String>) -> Self {
		let base_url = base_url.into().trim_end_matches('/').to_owned();
		Self { base_url }
	}

	/// Full URL of an endpoint.
	pub fn endpoint(&self, path: &str) -> String {
		format!("{}/{path}", self.base_url)
	}

	async fn post(&self, path: &str, body: String) -> Result<String, BoardError> {
		let url = self.endpoint(path);
		let window = web_sys::window().ok_or_else(|| BoardError::Request("no window".into()))?;

		let init = RequestInit::new();
		init.set_method("POST");
		init.set_body(&JsValue::from_str(&body));
		let request = Request::new_with_str_and_init(&url, &init).map_err(|e| js_error(&url, e))?;
		request
			.headers()
			.set("Content-Type", "application/json")
			.map_err(|e| js_error(&url, e))?;

		let response: Response = JsFuture::from(window.fetch_with_request(&request))
			.await
			.map_err(|e| js_error(&url, e))?
			.dyn_into()
			.map_err(|e| js_error(&url, e))?;
		if !response.ok() {
			return Err(BoardError::Request(format!("{url}: HTTP {}", response.status())));
		}
		let text = JsFuture::from(response.text().map_err(|e| js_error(&url, e))?)
			.await
			.map_err(|e| js_error(&url, e))?;
		text.as_string()
			.ok_or_else(|| BoardError::Request(format!("{url}: response body is not text")))
	}
}

impl LanguageModel for LlamafileClient {
	async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, BoardError> {
		let body = self.post("embedding", embedding_body(texts)?).await?;
		decode_embeddings(&body)
	}

	async fn complete(&self, prompt: &str, parameters: &CompletionParameters) -> Result<String, BoardError> {
		let body = self.post("completion", completion_body(prompt, parameters)?).await?;
		decode_completion(&body)
	}
}
