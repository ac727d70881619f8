use std::collections::HashSet;

use time::{Date, OffsetDateTime};

use curio_domain::{
	scoring,
	work::{Candidate, RawWork},
};

use crate::{CurioService, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
	/// New candidates written (or, on a dry run, that would have been written).
	pub stored: u64,
	/// Records whose identity was already stored or repeated earlier in the batch.
	pub duplicates: usize,
	/// Records skipped for a missing identity or an unusable publication date.
	pub rejected: usize,
}

/// Candidates staged for one commit, plus what was left out.
#[derive(Debug, Default)]
pub struct StagedBatch {
	pub candidates: Vec<Candidate>,
	pub duplicates: usize,
	pub rejected: usize,
}

/// Maps raw records to scored candidates, dropping rejects and known identities.
pub fn stage_candidates(
	works: &[RawWork],
	category: Option<&str>,
	existing: &HashSet<String>,
	today: Date,
	now: OffsetDateTime,
) -> StagedBatch {
	let mut batch = StagedBatch::default();
	let mut seen = HashSet::new();

	for work in works {
		let mut candidate = match Candidate::from_work(work, category, now) {
			Ok(candidate) => candidate,
			Err(err) => {
				tracing::warn!(
					error = %err,
					id = work.id.as_deref().unwrap_or_default(),
					"Skipping work."
				);

				batch.rejected += 1;

				continue;
			},
		};

		if existing.contains(&candidate.source_id) || !seen.insert(candidate.source_id.clone()) {
			batch.duplicates += 1;

			continue;
		}

		candidate.curation_score = Some(scoring::curation_score(work, today));

		batch.candidates.push(candidate);
	}

	batch
}

impl CurioService {
	/// Stores the new-by-identity subset of `works` in a single commit.
	///
	/// A supplied category marks the stored candidates as selected. Nothing is written on a dry
	/// run, but the report still counts what would have been stored.
	pub async fn ingest(
		&self,
		works: &[RawWork],
		category: Option<&str>,
		today: Date,
		dry_run: bool,
	) -> Result<IngestReport> {
		let ids: Vec<String> =
			works.iter().filter_map(RawWork::source_id).map(str::to_string).collect();
		let existing = self.store.existing_source_ids(&ids).await?;
		let batch = stage_candidates(works, category, &existing, today, OffsetDateTime::now_utc());
		let stored = if dry_run || batch.candidates.is_empty() {
			batch.candidates.len() as u64
		} else {
			self.store.insert_candidates(&batch.candidates).await?
		};

		tracing::info!(
			category = category.unwrap_or("none"),
			stored,
			duplicates = batch.duplicates,
			rejected = batch.rejected,
			dry_run,
			"Ingested works."
		);

		Ok(IngestReport { stored, duplicates: batch.duplicates, rejected: batch.rejected })
	}
}
