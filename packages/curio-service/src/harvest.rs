use std::{collections::BTreeMap, time::Duration};

use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use time::Date;

use curio_domain::{categories::Category, scoring, work::RawWork};
use curio_providers::openalex::WorksQuery;

use crate::{
	CurioService, Error, Result,
	runs::{self, HARVEST_JOB, JobOptions, RunOutcome, RunStatus},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
	Ok,
	Error,
	NoCandidates,
}

/// What one category branch of a harvest produced.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryOutcome {
	pub status: BranchStatus,
	pub fetched: usize,
	pub stored: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl CategoryOutcome {
	fn failed(err: &Error) -> Self {
		Self { status: BranchStatus::Error, fetched: 0, stored: 0, error: Some(err.to_string()) }
	}
}

/// Highest-scoring works first. Ties keep the source order.
pub fn top_scored(works: Vec<RawWork>, today: Date, keep: usize) -> Vec<RawWork> {
	let mut scored: Vec<(f64, RawWork)> =
		works.into_iter().map(|work| (scoring::curation_score(&work, today), work)).collect();

	scored.sort_by(|a, b| b.0.total_cmp(&a.0));
	scored.truncate(keep);

	scored.into_iter().map(|(_, work)| work).collect()
}

impl CurioService {
	/// Fans out one harvest branch per active category and waits for all of them.
	///
	/// Branch failures are reported in the summary and never fail the job. The job ends as
	/// `no_candidates` when no branch stored anything.
	pub async fn harvest(&self, options: JobOptions) -> Result<RunOutcome> {
		self.track(HARVEST_JOB, options.run_date, async {
			if let Some(prior) = self.prior_completion(HARVEST_JOB, &options).await? {
				return Ok(runs::skipped(&prior));
			}

			let categories = self.categories.list_active();
			let branches =
				categories.iter().map(|category| self.harvest_category(category, &options));
			let outcomes = join_all(branches).await;
			let summary: BTreeMap<&str, CategoryOutcome> = categories
				.iter()
				.map(|category| category.slug.as_str())
				.zip(outcomes)
				.collect();
			let stored: u64 = summary.values().map(|outcome| outcome.stored).sum();
			let status = if stored == 0 {
				RunStatus::NoCandidates
			} else if options.dry_run {
				RunStatus::DryRun
			} else {
				RunStatus::Success
			};

			Ok(RunOutcome::with_status(
				status,
				json!({ "stored": stored, "dry_run": options.dry_run, "categories": summary }),
			))
		})
		.await
	}

	/// Fetches, scores, and ingests one category. Never returns an error.
	pub async fn harvest_category(
		&self,
		category: &Category,
		options: &JobOptions,
	) -> CategoryOutcome {
		let harvest = &self.cfg.harvest;
		let query = WorksQuery {
			from_date: options.run_date.saturating_sub(time::Duration::days(harvest.lookback_days)),
			field_filter: Some(category.filter_value()),
			per_page: harvest.per_page,
		};
		let works = match self.fetch_with_timeout(&query, harvest.branch_timeout_ms).await {
			Ok(works) => works,
			Err(err) => {
				tracing::warn!(category = %category.slug, error = %err, "Harvest branch failed.");

				return CategoryOutcome::failed(&err);
			},
		};
		let fetched = works.len();

		if fetched == 0 {
			tracing::info!(category = %category.slug, "Harvest branch found no works.");

			return CategoryOutcome {
				status: BranchStatus::NoCandidates,
				fetched,
				stored: 0,
				error: None,
			};
		}

		let top = top_scored(works, options.run_date, harvest.keep_per_category);

		match self.ingest(&top, Some(&category.slug), options.run_date, options.dry_run).await {
			Ok(report) => CategoryOutcome {
				status: if report.stored == 0 && report.duplicates == 0 {
					BranchStatus::NoCandidates
				} else {
					BranchStatus::Ok
				},
				fetched,
				stored: report.stored,
				error: None,
			},
			Err(err) => {
				tracing::warn!(category = %category.slug, error = %err, "Harvest ingest failed.");

				CategoryOutcome { fetched, ..CategoryOutcome::failed(&err) }
			},
		}
	}

	pub(crate) async fn fetch_with_timeout(
		&self,
		query: &WorksQuery,
		timeout_ms: u64,
	) -> Result<Vec<RawWork>> {
		let fetch = self.providers.metadata.fetch_works(&self.cfg.providers.metadata, query);

		tokio::time::timeout(Duration::from_millis(timeout_ms), fetch).await.map_err(|_| {
			Error::Timeout { message: format!("Metadata fetch exceeded {timeout_ms} ms.") }
		})?
	}
}
