use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use curio_config::ProviderConfig;

/// One selected candidate handed to the episode producer.
#[derive(Clone, Debug, Serialize)]
pub struct EpisodeItem {
	pub id: String,
	pub title: String,
	pub abstract_text: Option<String>,
	pub full_text: Option<String>,
	pub category: Option<String>,
}

/// Requests an episode for the given items and returns the produced artifact id.
pub async fn produce(cfg: &ProviderConfig, items: &[EpisodeItem]) -> crate::Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "model": cfg.model, "items": items });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_artifact_id(&json)
}

pub fn parse_artifact_id(json: &Value) -> crate::Result<String> {
	json.get("id")
		.or_else(|| json.get("episode_id"))
		.and_then(crate::id_string)
		.ok_or_else(|| crate::Error::InvalidResponse {
			message: "Producer response is missing an artifact id.".to_string(),
		})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_string_or_numeric_ids() {
		assert_eq!(
			parse_artifact_id(&serde_json::json!({ "id": "ep-42" })).expect("Expected an id."),
			"ep-42"
		);
		assert_eq!(
			parse_artifact_id(&serde_json::json!({ "episode_id": 42 })).expect("Expected an id."),
			"42"
		);
		assert!(parse_artifact_id(&serde_json::json!({ "status": "queued" })).is_err());
	}
}
