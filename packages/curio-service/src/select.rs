use std::time::Duration;

use rand::{SeedableRng, rngs::StdRng};
use serde_json::{Value, json};
use uuid::Uuid;

use curio_domain::{selector, work::Candidate};
use curio_providers::producer::EpisodeItem;

use crate::{
	CurioService, Error, Result, rerank,
	runs::{self, JobOptions, RunOutcome, RunStatus, SELECT_JOB},
};

pub fn episode_items(selection: &[Candidate]) -> Vec<EpisodeItem> {
	selection
		.iter()
		.map(|candidate| EpisodeItem {
			id: candidate.source_id.clone(),
			title: candidate.title.clone(),
			abstract_text: candidate.abstract_text.clone(),
			full_text: candidate.full_text.clone(),
			category: candidate.category.clone(),
		})
		.collect()
}

fn selection_summary(selection: &[Candidate]) -> Vec<Value> {
	selection
		.iter()
		.map(|candidate| {
			json!({
				"id": candidate.source_id,
				"title": candidate.title,
				"category": candidate.category,
				"rank_position": candidate.rank_position,
				"has_full_text": candidate.has_full_text(),
			})
		})
		.collect()
}

impl CurioService {
	/// Picks the next episode from the unconsumed pool, hands it to the producer, and marks the
	/// picked candidates consumed.
	///
	/// `seed` makes the weighted draws reproducible. A fresh one is drawn and recorded when absent.
	pub async fn select(&self, options: JobOptions, seed: Option<u64>) -> Result<RunOutcome> {
		self.track(SELECT_JOB, options.run_date, async {
			if let Some(prior) = self.prior_completion(SELECT_JOB, &options).await? {
				return Ok(runs::skipped(&prior));
			}

			self.run_selection(&options, seed.unwrap_or_else(rand::random)).await
		})
		.await
	}

	async fn run_selection(&self, options: &JobOptions, seed: u64) -> Result<RunOutcome> {
		let selection_cfg = &self.cfg.selection;
		let pool = self.store.list_unconsumed_selected().await?;
		let pool_size = pool.len();

		if pool.is_empty() {
			tracing::info!("No unconsumed candidates to select from.");

			return Ok(RunOutcome::with_status(
				RunStatus::NoCandidates,
				json!({ "seed": seed, "pool_size": 0 }),
			));
		}

		let mut rng = StdRng::seed_from_u64(seed);
		let narrowed = selector::weighted_select(
			pool,
			selection_cfg.ranking_budget,
			&self.categories,
			selection_cfg.full_text_boost,
			&mut rng,
		);
		let narrowed_size = narrowed.len();
		let ranking = rerank::rerank(
			self.providers.ranker.as_ref(),
			&self.cfg.providers.ranker,
			narrowed,
			selection_cfg.curated_pool_size,
			Duration::from_millis(selection_cfg.rank_timeout_ms),
		)
		.await;
		let ranking_label = ranking.label();
		let episode = selector::weighted_select(
			ranking.into_items(),
			selection_cfg.episode_size,
			&self.categories,
			selection_cfg.full_text_boost,
			&mut rng,
		);
		let mut result = json!({
			"seed": seed,
			"pool_size": pool_size,
			"narrowed_size": narrowed_size,
			"ranking": ranking_label,
			"selected": selection_summary(&episode),
		});

		tracing::info!(
			seed,
			pool_size,
			narrowed_size,
			ranking = %ranking_label,
			selected = episode.len(),
			"Selection drawn."
		);

		if episode.is_empty() {
			return Ok(RunOutcome::with_status(RunStatus::NoCandidates, result));
		}
		if options.dry_run {
			return Ok(RunOutcome::with_status(RunStatus::DryRun, result));
		}

		let artifact_id = self.produce_episode(&episode).await?;
		let ids: Vec<Uuid> = episode.iter().map(|candidate| candidate.candidate_id).collect();
		let consumed = self.store.mark_consumed(&ids, &artifact_id).await?;

		tracing::info!(artifact_id = %artifact_id, consumed, "Episode produced.");

		result["artifact_id"] = json!(artifact_id);
		result["consumed"] = json!(consumed);

		Ok(RunOutcome::success(result))
	}

	async fn produce_episode(&self, episode: &[Candidate]) -> Result<String> {
		let items = episode_items(episode);
		let timeout_ms = self.cfg.selection.produce_timeout_ms;
		let produce = self.providers.producer.produce(&self.cfg.providers.producer, &items);

		tokio::time::timeout(Duration::from_millis(timeout_ms), produce).await.map_err(|_| {
			Error::Timeout { message: format!("Episode production exceeded {timeout_ms} ms.") }
		})?
	}
}
