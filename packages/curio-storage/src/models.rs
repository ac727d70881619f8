use std::fmt;

use serde_json::Value;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use curio_domain::work::Candidate;

use crate::Error;

#[derive(Debug, sqlx::FromRow)]
pub struct CandidateRow {
	pub candidate_id: Uuid,
	pub source_id: String,
	pub doi: Option<String>,
	pub title: String,
	pub abstract_text: Option<String>,
	pub full_text: Option<String>,
	pub full_text_source: Option<String>,
	pub publication_date: Date,
	pub pdf_url: Option<String>,
	pub landing_page_url: Option<String>,
	pub citation_count: i64,
	pub fwci: Option<f64>,
	pub category: Option<String>,
	pub curation_score: Option<f64>,
	pub quality_score: Option<f64>,
	pub rank_position: Option<i32>,
	pub metrics: Value,
	pub authors: Value,
	pub topics: Value,
	pub is_selected: bool,
	pub is_consumed: bool,
	pub created_at: OffsetDateTime,
}
impl From<CandidateRow> for Candidate {
	fn from(row: CandidateRow) -> Self {
		Self {
			candidate_id: row.candidate_id,
			source_id: row.source_id,
			doi: row.doi,
			title: row.title,
			abstract_text: row.abstract_text,
			full_text: row.full_text,
			full_text_source: row.full_text_source,
			publication_date: row.publication_date,
			pdf_url: row.pdf_url,
			landing_page_url: row.landing_page_url,
			citation_count: row.citation_count,
			fwci: row.fwci,
			category: row.category,
			curation_score: row.curation_score,
			quality_score: row.quality_score,
			rank_position: row.rank_position,
			metrics: row.metrics,
			authors: row.authors,
			topics: row.topics,
			is_selected: row.is_selected,
			is_consumed: row.is_consumed,
			created_at: row.created_at,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
	Running,
	Success,
	Failed,
	Skipped,
	NoCandidates,
	DryRun,
}
impl RunStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Running => "running",
			Self::Success => "success",
			Self::Failed => "failed",
			Self::Skipped => "skipped",
			Self::NoCandidates => "no_candidates",
			Self::DryRun => "dry_run",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"running" => Some(Self::Running),
			"success" => Some(Self::Success),
			"failed" => Some(Self::Failed),
			"skipped" => Some(Self::Skipped),
			"no_candidates" => Some(Self::NoCandidates),
			"dry_run" => Some(Self::DryRun),
			_ => None,
		}
	}
}

impl fmt::Display for RunStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl TryFrom<String> for RunStatus {
	type Error = Error;

	fn try_from(raw: String) -> Result<Self, Self::Error> {
		Self::parse(&raw)
			.ok_or_else(|| Error::InvalidArgument(format!("Unknown run status {raw:?}.")))
	}
}

/// One finished job invocation. Written once and never updated.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct RunRecord {
	pub run_id: Uuid,
	pub job_name: String,
	pub run_date: Date,
	pub started_at: OffsetDateTime,
	pub finished_at: OffsetDateTime,
	pub duration_ms: i64,
	#[sqlx(try_from = "String")]
	pub status: RunStatus,
	pub result: Option<Value>,
	pub error_detail: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_names_round_trip() {
		for status in [
			RunStatus::Running,
			RunStatus::Success,
			RunStatus::Failed,
			RunStatus::Skipped,
			RunStatus::NoCandidates,
			RunStatus::DryRun,
		] {
			assert_eq!(RunStatus::try_from(status.as_str().to_string()).ok(), Some(status));
		}

		assert!(RunStatus::try_from("SUCCESS".to_string()).is_err());
	}
}
