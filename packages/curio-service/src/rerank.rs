use std::{collections::HashMap, fmt, time::Duration};

use curio_config::LlmProviderConfig;
use curio_domain::work::Candidate;
use curio_providers::ranker::{self, RankItem, RankedEntry};

use crate::RankingProvider;

const ABSTRACT_PREVIEW_CHARS: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackReason {
	/// The ranking call returned an error.
	Provider,
	Timeout,
	/// No ranking array could be recovered from the answer.
	Unparseable,
	/// The answer parsed but named none of the submitted ids.
	NoMatches,
}
impl FallbackReason {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Provider => "provider",
			Self::Timeout => "timeout",
			Self::Unparseable => "unparseable",
			Self::NoMatches => "no_matches",
		}
	}
}

impl fmt::Display for FallbackReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Result of the rerank step. A degraded ranking is a value, not an error.
#[derive(Clone, Debug, PartialEq)]
pub enum RankingOutcome {
	/// Candidates in the order the ranking service chose, capped at `max_select`.
	Ranked(Vec<Candidate>),
	/// The pool already fit within `max_select`, so no call was made.
	Unranked(Vec<Candidate>),
	/// The first `max_select` candidates in their original order.
	Fallback { items: Vec<Candidate>, reason: FallbackReason },
}
impl RankingOutcome {
	pub fn items(&self) -> &[Candidate] {
		match self {
			Self::Ranked(items) | Self::Unranked(items) | Self::Fallback { items, .. } => items,
		}
	}

	pub fn into_items(self) -> Vec<Candidate> {
		match self {
			Self::Ranked(items) | Self::Unranked(items) | Self::Fallback { items, .. } => items,
		}
	}

	/// Short label recorded in run results.
	pub fn label(&self) -> String {
		match self {
			Self::Ranked(_) => "ranked".to_string(),
			Self::Unranked(_) => "unranked".to_string(),
			Self::Fallback { reason, .. } => format!("fallback:{reason}"),
		}
	}
}

pub fn rank_items(pool: &[Candidate]) -> Vec<RankItem> {
	pool.iter()
		.map(|candidate| RankItem {
			id: candidate.source_id.clone(),
			title: candidate.title.clone(),
			abstract_text: candidate.abstract_preview(ABSTRACT_PREVIEW_CHARS),
		})
		.collect()
}

/// Reranks `pool` through the external service and keeps at most `max_select` candidates.
///
/// Pools that already fit skip the call. Any failure to obtain a usable ranking falls back to the
/// first `max_select` candidates in input order.
pub async fn rerank(
	ranker: &dyn RankingProvider,
	cfg: &LlmProviderConfig,
	pool: Vec<Candidate>,
	max_select: usize,
	timeout: Duration,
) -> RankingOutcome {
	if pool.len() <= max_select {
		return RankingOutcome::Unranked(pool);
	}

	let items = rank_items(&pool);
	let answer = match tokio::time::timeout(timeout, ranker.rank(cfg, &items, max_select)).await {
		Ok(Ok(answer)) => answer,
		Ok(Err(err)) => {
			tracing::warn!(error = %err, "Ranking call failed. Using input order.");

			return fallback(pool, max_select, FallbackReason::Provider);
		},
		Err(_) => {
			tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Ranking call timed out.");

			return fallback(pool, max_select, FallbackReason::Timeout);
		},
	};

	resolve_answer(pool, &answer, max_select)
}

/// Turns a raw ranking answer into an outcome over `pool`.
pub fn resolve_answer(pool: Vec<Candidate>, answer: &str, max_select: usize) -> RankingOutcome {
	let entries = match ranker::parse_ranking(answer) {
		Ok(entries) => entries,
		Err(err) => {
			tracing::warn!(error = %err, "Ranking answer is unparseable. Using input order.");

			return fallback(pool, max_select, FallbackReason::Unparseable);
		},
	};

	match apply_ranking(pool.clone(), &entries, max_select) {
		Some(ranked) => RankingOutcome::Ranked(ranked),
		None => {
			tracing::warn!(
				entries = entries.len(),
				"Ranking answer matched no submitted ids. Using input order."
			);

			fallback(pool, max_select, FallbackReason::NoMatches)
		},
	}
}

/// Reorders `pool` by `entries`, keeping matched candidates only. Returns `None` when nothing
/// matches.
pub fn apply_ranking(
	pool: Vec<Candidate>,
	entries: &[RankedEntry],
	max_select: usize,
) -> Option<Vec<Candidate>> {
	let mut by_id: HashMap<String, Candidate> =
		pool.into_iter().map(|candidate| (candidate.source_id.clone(), candidate)).collect();
	let mut ranked = Vec::new();

	for entry in entries {
		if ranked.len() == max_select {
			break;
		}

		let Some(mut candidate) = by_id.remove(&entry.id) else {
			continue;
		};

		candidate.rank_position = i32::try_from(ranked.len() + 1).ok();

		ranked.push(candidate);
	}

	(!ranked.is_empty()).then_some(ranked)
}

fn fallback(pool: Vec<Candidate>, max_select: usize, reason: FallbackReason) -> RankingOutcome {
	let items = pool.into_iter().take(max_select).collect();

	RankingOutcome::Fallback { items, reason }
}
