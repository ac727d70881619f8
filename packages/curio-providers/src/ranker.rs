use std::{collections::HashSet, sync::LazyLock, time::Duration};

use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use curio_config::LlmProviderConfig;

const SYSTEM_PROMPT: &str = "\
You are a science podcast producer selecting papers for a daily briefing.

Your job: rank papers by how good they'd be for a general-audience podcast.

Score each paper 1-10 on:
- CONCLUSIVE: Does it have clear findings? (Not \"we studied X\" but \"we found that Y\")
- NOVEL: Is this genuinely surprising or new?
- ACCESSIBLE: Can a non-scientist understand and care about this?
- STORY: Does it make a good 1-minute podcast segment?

Be harsh. Most papers are incremental or too niche. Only high scores for truly podcast-worthy \
papers.";
const ABSTRACT_PREVIEW_CHARS: usize = 500;

static FENCE: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"(?s)\A\s*```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)(?:```\s*)?\z").ok()
});

/// One pool member as the ranking service sees it.
#[derive(Clone, Debug)]
pub struct RankItem {
	pub id: String,
	pub title: String,
	pub abstract_text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RankedEntry {
	pub id: String,
	pub score: Option<f64>,
	pub rationale: Option<String>,
}

/// Sends one chat completion and returns the raw content text. Parsing is left to the caller so a
/// malformed answer can degrade instead of failing.
pub async fn rank(
	cfg: &LlmProviderConfig,
	items: &[RankItem],
	max_select: usize,
) -> crate::Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"max_tokens": cfg.max_tokens,
		"messages": build_messages(items, max_select),
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	completion_content(&json)
}

pub fn build_messages(items: &[RankItem], max_select: usize) -> Vec<Value> {
	let papers = items
		.iter()
		.map(|item| {
			let preview: String = item.abstract_text.chars().take(ABSTRACT_PREVIEW_CHARS).collect();
			let preview = if preview.is_empty() { "No abstract".to_string() } else { preview };

			format!("ID: {}\nTitle: {}\nAbstract: {preview}...", item.id, item.title)
		})
		.collect::<Vec<_>>()
		.join("\n\n---\n\n");
	let user = format!(
		"Rank these papers for a science podcast. Return ONLY a JSON array of paper IDs sorted \
		 from best to worst, with scores. The first {max_select} entries matter most.\n\n\
		 Papers:\n{papers}\n\n\
		 Return format (no other text):\n[\n  {{\"id\": \"<paper_id>\", \"score\": <1-10>, \
		 \"reason\": \"<1 sentence>\"}},\n  ...\n]"
	);

	vec![
		serde_json::json!({ "role": "system", "content": SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user }),
	]
}

pub fn completion_content(json: &Value) -> crate::Result<String> {
	json.get("choices")
		.and_then(Value::as_array)
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|message| message.get("content"))
		.and_then(Value::as_str)
		.map(|content| content.trim().to_string())
		.ok_or_else(|| crate::Error::InvalidResponse {
			message: "Ranking response is missing choices[0].message.content.".to_string(),
		})
}

/// Parses a ranking answer into ordered entries.
///
/// Code fences are stripped first. If the remainder is not JSON, the first balanced array that
/// parses is used. Entries without an id are dropped and repeated ids keep their first position.
pub fn parse_ranking(text: &str) -> crate::Result<Vec<RankedEntry>> {
	let stripped = strip_fences(text);
	let value = match serde_json::from_str::<Value>(stripped) {
		Ok(value) => Some(value),
		Err(_) => extract_array(stripped),
	};
	let array =
		value.as_ref().and_then(ranking_array).ok_or_else(|| crate::Error::InvalidResponse {
			message: "Ranking response does not contain a JSON array.".to_string(),
		})?;
	let mut seen = HashSet::new();
	let mut entries = Vec::new();

	for item in array {
		let Some(id) = item.get("id").and_then(crate::id_string) else {
			continue;
		};

		if !seen.insert(id.clone()) {
			continue;
		}

		let score = item.get("score").and_then(|score| match score {
			Value::Number(number) => number.as_f64(),
			Value::String(raw) => raw.trim().parse().ok(),
			_ => None,
		});
		let rationale = item
			.get("rationale")
			.or_else(|| item.get("reason"))
			.and_then(Value::as_str)
			.map(str::to_string);

		entries.push(RankedEntry { id, score, rationale });
	}

	Ok(entries)
}

fn strip_fences(text: &str) -> &str {
	let trimmed = text.trim();

	FENCE
		.as_ref()
		.and_then(|fence| fence.captures(trimmed))
		.and_then(|captures| captures.get(1))
		.map(|inner| inner.as_str().trim())
		.unwrap_or(trimmed)
}

fn ranking_array(value: &Value) -> Option<&Vec<Value>> {
	match value {
		Value::Array(items) => Some(items),
		Value::Object(map) => map.values().find_map(Value::as_array),
		_ => None,
	}
}

/// Finds the first `[...]` span with balanced brackets outside strings that parses as JSON.
fn extract_array(raw: &str) -> Option<Value> {
	let mut offset = 0;

	while let Some(found) = raw[offset..].find('[') {
		let start = offset + found;

		if let Some(end) = balanced_end(&raw[start..])
			&& let Ok(value) = serde_json::from_str::<Value>(&raw[start..start + end])
			&& value.is_array()
		{
			return Some(value);
		}

		offset = start + 1;
	}

	None
}

fn balanced_end(raw: &str) -> Option<usize> {
	let mut depth = 0_usize;
	let mut in_string = false;
	let mut escape = false;

	for (idx, ch) in raw.char_indices() {
		if in_string {
			if escape {
				escape = false;
			} else if ch == '\\' {
				escape = true;
			} else if ch == '"' {
				in_string = false;
			}

			continue;
		}

		match ch {
			'"' => in_string = true,
			'[' | '{' => depth += 1,
			']' | '}' => {
				depth = depth.checked_sub(1)?;

				if depth == 0 {
					return Some(idx + ch.len_utf8());
				}
			},
			_ => {},
		}
	}

	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_plain_array_with_mixed_id_types() {
		let entries = parse_ranking(
			r#"[{"id": "W2", "score": 9, "reason": "Clear result."}, {"id": 7, "score": "6.5"}]"#,
		)
		.expect("Expected a ranking.");

		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0].id, "W2");
		assert_eq!(entries[0].rationale.as_deref(), Some("Clear result."));
		assert_eq!(entries[1].id, "7");
		assert_eq!(entries[1].score, Some(6.5));
	}

	#[test]
	fn strips_code_fences() {
		let text = "```json\n[{\"id\": \"W1\", \"score\": 8, \"rationale\": \"Novel.\"}]\n```";
		let entries = parse_ranking(text).expect("Expected a ranking.");

		assert_eq!(
			entries,
			vec![RankedEntry {
				id: "W1".to_string(),
				score: Some(8.0),
				rationale: Some("Novel.".to_string()),
			}]
		);
	}

	#[test]
	fn extracts_array_from_prose() {
		let text = "Sure! Here is the ranking [draft]:\n\
			[{\"id\": \"W3\", \"reason\": \"uses [brackets] in text\"}]\nHope it helps.";
		let entries = parse_ranking(text).expect("Expected a ranking.");

		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].id, "W3");
		assert_eq!(entries[0].rationale.as_deref(), Some("uses [brackets] in text"));
	}

	#[test]
	fn rejects_unparseable_answers() {
		assert!(parse_ranking("").is_err());
		assert!(parse_ranking("[{\"id\": \"W1\", \"score\": 9").is_err());
		assert!(parse_ranking("I cannot rank these papers.").is_err());
	}

	#[test]
	fn skips_entries_without_ids_and_repeated_ids() {
		let entries = parse_ranking(r#"[{"score": 3}, {"id": "W1"}, {"id": "W1"}, {"id": null}]"#)
			.expect("Expected a ranking.");

		assert_eq!(entries.len(), 1);
	}

	#[test]
	fn reads_completion_content() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "  [] \n" } }]
		});

		assert_eq!(completion_content(&json).expect("Expected content."), "[]");
		assert!(completion_content(&serde_json::json!({ "choices": [] })).is_err());
	}

	#[test]
	fn prompt_lists_every_item() {
		let items = vec![
			RankItem {
				id: "W1".to_string(),
				title: "First".to_string(),
				abstract_text: String::new(),
			},
			RankItem {
				id: "W2".to_string(),
				title: "Second".to_string(),
				abstract_text: "x".repeat(800),
			},
		];
		let messages = build_messages(&items, 3);
		let user = messages[1]["content"].as_str().expect("User prompt must be a string.");

		assert!(user.contains("ID: W1\nTitle: First\nAbstract: No abstract..."));
		assert!(user.contains(&format!("Abstract: {}...", "x".repeat(500))));
		assert!(user.contains("\n\n---\n\n"));
	}
}
