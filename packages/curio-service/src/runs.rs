use std::{future::Future, time::Instant};

use serde_json::Value;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

pub use curio_storage::models::RunStatus;

use curio_storage::models::RunRecord;

use crate::{CurioService, Error, Result};

pub const HARVEST_JOB: &str = "harvest";
pub const SELECT_JOB: &str = "select";
pub const CURATE_AI_JOB: &str = "curate_ai";

/// What a job body reports back to the tracker.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutcome {
	pub status: RunStatus,
	pub result: Value,
}
impl RunOutcome {
	pub fn success(result: Value) -> Self {
		Self { status: RunStatus::Success, result }
	}

	pub fn with_status(status: RunStatus, result: Value) -> Self {
		Self { status, result }
	}
}

/// Per-invocation switches shared by every job.
#[derive(Clone, Copy, Debug)]
pub struct JobOptions {
	/// Logical date the run belongs to. Also the "today" used for recency scoring.
	pub run_date: Date,
	/// Run every stage but skip the writes and the production hand-off.
	pub dry_run: bool,
	/// Ignore an earlier completion recorded for the same date.
	pub force: bool,
}

impl CurioService {
	/// Runs `body` and appends exactly one run record when it finishes.
	///
	/// A failing body is recorded as `failed` with its error kind and detail, then the error is
	/// returned unchanged.
	pub async fn track<F>(&self, job_name: &str, run_date: Date, body: F) -> Result<RunOutcome>
	where
		F: Future<Output = Result<RunOutcome>>,
	{
		let started_at = OffsetDateTime::now_utc();
		let clock = Instant::now();

		tracing::info!(job = job_name, %run_date, "Job started.");

		let outcome = body.await;
		let finished_at = OffsetDateTime::now_utc();
		let duration_ms = i64::try_from(clock.elapsed().as_millis()).unwrap_or(i64::MAX);
		let mut record = RunRecord {
			run_id: Uuid::new_v4(),
			job_name: job_name.to_string(),
			run_date,
			started_at,
			finished_at,
			duration_ms,
			status: RunStatus::Running,
			result: None,
			error_detail: None,
		};

		match outcome {
			Ok(outcome) => {
				record.status = outcome.status;
				record.result = Some(outcome.result.clone());

				self.runs.append(&record).await?;

				tracing::info!(
					job = job_name,
					status = %outcome.status,
					duration_ms,
					"Job finished."
				);

				Ok(outcome)
			},
			Err(err) => {
				record.status = RunStatus::Failed;
				record.error_detail = Some(error_detail(&err));

				if let Err(log_err) = self.runs.append(&record).await {
					tracing::error!(
						job = job_name,
						error = %log_err,
						"Failed to record failed run."
					);
				}

				tracing::error!(job = job_name, error = %err, duration_ms, "Job failed.");

				Err(err)
			},
		}
	}

	/// The earlier record that makes a new run for `run_date` redundant, if any.
	///
	/// Any `success` with a result satisfies a real run. A dry run is also satisfied by an earlier
	/// dry run. Records written after the completing one, such as skips or failed forced runs, do
	/// not hide it.
	pub async fn prior_completion(
		&self,
		job_name: &str,
		options: &JobOptions,
	) -> Result<Option<RunRecord>> {
		if options.force {
			return Ok(None);
		}

		let statuses: &[RunStatus] = if options.dry_run {
			&[RunStatus::Success, RunStatus::DryRun]
		} else {
			&[RunStatus::Success]
		};

		self.runs.latest_completed(job_name, options.run_date, statuses).await
	}
}

/// Body result for a run short-circuited by an earlier completion.
pub(crate) fn skipped(prior: &RunRecord) -> RunOutcome {
	tracing::info!(
		job = %prior.job_name,
		run_date = %prior.run_date,
		prior_status = %prior.status,
		"Job already completed for this date. Skipping."
	);

	RunOutcome::with_status(
		RunStatus::Skipped,
		serde_json::json!({
			"reason": "already_completed",
			"prior_run_id": prior.run_id,
			"prior_status": prior.status.as_str(),
		}),
	)
}

fn error_detail(err: &Error) -> String {
	format!("{}: {err}\n\n{err:?}", err.kind())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn error_detail_carries_kind_message_and_debug_form() {
		let detail = error_detail(&Error::Timeout { message: "Producer call.".to_string() });

		assert!(detail.starts_with("timeout: Timed out: Producer call.\n\n"));
		assert!(detail.contains("Timeout {"));
	}
}
