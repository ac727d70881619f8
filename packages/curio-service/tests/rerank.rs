use std::time::Duration;

use time::OffsetDateTime;

use curio_config::LlmProviderConfig;
use curio_domain::work::{Candidate, RawWork};
use curio_providers::ranker::RankItem;
use curio_service::{
	BoxFuture, Error, FallbackReason, RankingOutcome, RankingProvider, Result,
	rerank::{self, resolve_answer},
};

struct FailingRanker;
impl RankingProvider for FailingRanker {
	fn rank<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_items: &'a [RankItem],
		_max_select: usize,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Err(Error::Provider { message: "Connection reset.".to_string() }) })
	}
}

struct StalledRanker;
impl RankingProvider for StalledRanker {
	fn rank<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_items: &'a [RankItem],
		_max_select: usize,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			tokio::time::sleep(Duration::from_secs(5)).await;

			Ok("[]".to_string())
		})
	}
}

fn ranker_cfg() -> LlmProviderConfig {
	LlmProviderConfig {
		provider_id: "ranker".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: "test-key".to_string(),
		path: "/v1/chat/completions".to_string(),
		model: "ranker-model".to_string(),
		temperature: 0.0,
		max_tokens: 500,
		timeout_ms: 1_000,
		default_headers: serde_json::Map::new(),
	}
}

fn pool(size: usize) -> Vec<Candidate> {
	(1..=size)
		.map(|idx| {
			let work = RawWork {
				id: Some(format!("https://openalex.org/W{idx}")),
				title: Some(format!("Paper {idx}")),
				publication_date: Some("2026-10-14".to_string()),
				..Default::default()
			};

			Candidate::from_work(&work, Some("ai_tech"), OffsetDateTime::UNIX_EPOCH)
				.expect("Expected a valid candidate.")
		})
		.collect()
}

fn ids(items: &[Candidate]) -> Vec<&str> {
	items.iter().map(|candidate| candidate.source_id.as_str()).collect()
}

#[test]
fn unparseable_answers_fall_back_to_input_order() {
	let candidates = pool(5);

	for answer in ["", "[{\"id\": \"W3\", \"score\": 9", "The papers are all excellent."] {
		let outcome = resolve_answer(candidates.clone(), answer, 2);
		let expected = RankingOutcome::Fallback {
			items: candidates[..2].to_vec(),
			reason: FallbackReason::Unparseable,
		};

		assert_eq!(outcome, expected);
	}
}

#[test]
fn fenced_answers_are_ranked() {
	let answer = "```json\n[{\"id\": \"W4\", \"score\": 9}, {\"id\": \"W2\", \"score\": 7}]\n```";
	let outcome = resolve_answer(pool(5), answer, 2);

	assert!(matches!(outcome, RankingOutcome::Ranked(_)));
	assert_eq!(ids(outcome.items()), vec!["W4", "W2"]);
	assert_eq!(outcome.items()[0].rank_position, Some(1));
	assert_eq!(outcome.items()[1].rank_position, Some(2));
}

#[test]
fn answers_naming_unknown_ids_fall_back() {
	let outcome = resolve_answer(pool(4), "[{\"id\": \"W99\"}, {\"id\": \"W98\"}]", 3);

	assert_eq!(outcome.label(), "fallback:no_matches");
	assert_eq!(ids(outcome.items()), vec!["W1", "W2", "W3"]);
}

#[test]
fn unknown_ids_are_dropped_from_partial_matches() {
	let outcome = resolve_answer(pool(4), "[{\"id\": \"W99\"}, {\"id\": \"W3\"}]", 3);

	assert_eq!(outcome.label(), "ranked");
	assert_eq!(ids(outcome.items()), vec!["W3"]);
}

#[tokio::test]
async fn small_pools_skip_the_call() {
	let candidates = pool(3);
	let timeout = Duration::from_secs(1);
	let outcome =
		rerank::rerank(&FailingRanker, &ranker_cfg(), candidates.clone(), 3, timeout).await;

	assert_eq!(outcome, RankingOutcome::Unranked(candidates));
}

#[tokio::test]
async fn provider_errors_fall_back() {
	let outcome =
		rerank::rerank(&FailingRanker, &ranker_cfg(), pool(6), 2, Duration::from_secs(1)).await;

	assert_eq!(outcome.label(), "fallback:provider");
	assert_eq!(ids(outcome.items()), vec!["W1", "W2"]);
}

#[tokio::test]
async fn slow_rankers_time_out_and_fall_back() {
	let candidates = pool(6);
	let timeout = Duration::from_millis(20);
	let outcome =
		rerank::rerank(&StalledRanker, &ranker_cfg(), candidates.clone(), 2, timeout).await;

	let expected = RankingOutcome::Fallback {
		items: candidates[..2].to_vec(),
		reason: FallbackReason::Timeout,
	};

	assert_eq!(outcome, expected);
}
