use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use curio_config::ProviderConfig;

/// Asks the extraction service for the plain text behind a document URL. `None` means the
/// service found nothing usable.
pub async fn extract_text(cfg: &ProviderConfig, url: &str) -> crate::Result<Option<String>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let endpoint = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "model": cfg.model, "url": url });
	let res = client
		.post(endpoint)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	Ok(parse_text(&json))
}

fn parse_text(json: &Value) -> Option<String> {
	json.get("text")
		.or_else(|| json.get("content"))
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|text| !text.is_empty())
		.map(str::to_string)
}
