use std::time::Duration;

use futures::future::join_all;
use serde_json::{Value, json};
use time::OffsetDateTime;

use curio_config::ProviderConfig;
use curio_domain::{
	quality,
	work::{Candidate, RawWork},
};
use curio_providers::openalex::WorksQuery;

use crate::{
	CurioService, Error, Result, rerank,
	runs::{self, CURATE_AI_JOB, JobOptions, RunOutcome, RunStatus},
};

fn no_candidates(stage: &str, detail: Value) -> RunOutcome {
	tracing::info!(stage, "AI curation ended without candidates.");

	RunOutcome::with_status(RunStatus::NoCandidates, json!({ "stage": stage, "detail": detail }))
}

impl CurioService {
	/// Single-pick curation for the AI category. Works pass the keyword and full-text gates, get a
	/// quality score and a rerank, and the winner is upserted.
	pub async fn curate_ai(&self, options: JobOptions) -> Result<RunOutcome> {
		self.track(CURATE_AI_JOB, options.run_date, async {
			if let Some(prior) = self.prior_completion(CURATE_AI_JOB, &options).await? {
				return Ok(runs::skipped(&prior));
			}

			self.run_ai_curation(&options).await
		})
		.await
	}

	async fn run_ai_curation(&self, options: &JobOptions) -> Result<RunOutcome> {
		let ai = &self.cfg.ai_curation;
		let category = self.categories.get(&ai.category).ok_or_else(|| Error::InvalidRequest {
			message: format!("AI curation category {:?} is not configured.", ai.category),
		})?;
		let query = WorksQuery {
			from_date: options.run_date.saturating_sub(time::Duration::days(ai.lookback_days)),
			field_filter: Some(category.filter_value()),
			per_page: ai.max_candidates,
		};
		let fetch = self.fetch_with_timeout(&query, self.cfg.harvest.branch_timeout_ms).await;
		let works = match fetch {
			Ok(works) => works,
			Err(err) => {
				tracing::warn!(error = %err, "AI curation fetch failed.");

				return Ok(no_candidates("fetch", json!({ "error": err.to_string() })));
			},
		};
		let fetched = works.len();
		let matched = quality::filter_by_keywords(works, &ai.keywords);

		tracing::info!(fetched, matched = matched.len(), "AI keyword filter applied.");

		if matched.is_empty() {
			return Ok(no_candidates("keywords", json!({ "fetched": fetched })));
		}

		let now = OffsetDateTime::now_utc();
		let mut staged: Vec<(RawWork, Candidate)> = Vec::with_capacity(matched.len());

		for work in matched {
			match Candidate::from_work(&work, Some(&category.slug), now) {
				Ok(candidate) => staged.push((work, candidate)),
				Err(err) => tracing::warn!(error = %err, "Skipping work."),
			}
		}

		if let Some(full_text_cfg) = self.cfg.providers.full_text.as_ref() {
			let before = staged.len();

			staged = self.attach_full_text(full_text_cfg, staged).await;

			tracing::info!(before, after = staged.len(), "AI full-text gate applied.");
		}
		if staged.is_empty() {
			return Ok(no_candidates("full_text", json!({ "fetched": fetched })));
		}

		let mut scored: Vec<Candidate> = staged
			.into_iter()
			.map(|(work, mut candidate)| {
				let score = quality::quality_score(&work, options.run_date, &ai.quality);

				candidate.quality_score = Some(score);
				candidate.curation_score = Some(score);

				candidate
			})
			.collect();

		scored.sort_by(|a, b| {
			b.quality_score.unwrap_or_default().total_cmp(&a.quality_score.unwrap_or_default())
		});
		scored.truncate(ai.rerank_pool);

		let ranking = rerank::rerank(
			self.providers.ranker.as_ref(),
			&self.cfg.providers.ranker,
			scored,
			ai.max_select,
			Duration::from_millis(self.cfg.selection.rank_timeout_ms),
		)
		.await;
		let ranking_label = ranking.label();
		let Some(mut top) = ranking.into_items().into_iter().next() else {
			return Ok(no_candidates("rerank", json!({ "ranking": ranking_label })));
		};

		top.rank_position = Some(1);

		let mut result = json!({
			"id": top.source_id,
			"title": top.title,
			"quality_score": top.quality_score,
			"has_full_text": top.has_full_text(),
			"ranking": ranking_label,
		});

		if options.dry_run {
			return Ok(RunOutcome::with_status(RunStatus::DryRun, result));
		}

		let candidate_id = self.store.upsert_curated(&top).await?;

		tracing::info!(id = %top.source_id, %candidate_id, "AI pick stored.");

		result["candidate_id"] = json!(candidate_id);

		Ok(RunOutcome::success(result))
	}

	/// Keeps works whose open-access document yields more than `min_full_text_chars` characters.
	async fn attach_full_text(
		&self,
		cfg: &ProviderConfig,
		staged: Vec<(RawWork, Candidate)>,
	) -> Vec<(RawWork, Candidate)> {
		let min_chars = self.cfg.ai_curation.min_full_text_chars;
		let timeout = Duration::from_millis(cfg.timeout_ms);
		let fetches = staged.iter().map(|(_, candidate)| async move {
			let url = candidate.pdf_url.as_deref()?;

			match tokio::time::timeout(timeout, self.providers.full_text.extract_text(cfg, url))
				.await
			{
				Ok(Ok(text)) => text,
				Ok(Err(err)) => {
					tracing::warn!(
						id = %candidate.source_id,
						error = %err,
						"Full-text fetch failed."
					);

					None
				},
				Err(_) => {
					tracing::warn!(id = %candidate.source_id, "Full-text fetch timed out.");

					None
				},
			}
		});
		let texts = join_all(fetches).await;

		staged
			.into_iter()
			.zip(texts)
			.filter_map(|((work, mut candidate), text)| {
				let text = text.filter(|text| text.chars().count() > min_chars)?;

				candidate.full_text = Some(text);
				candidate.full_text_source = Some(cfg.provider_id.clone());

				Some((work, candidate))
			})
			.collect()
	}
}
