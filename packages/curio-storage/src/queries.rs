use std::collections::HashSet;

use sqlx::PgExecutor;
use time::Date;
use uuid::Uuid;

use curio_domain::work::Candidate;

use crate::{
	Error, Result,
	db::Db,
	models::{CandidateRow, RunRecord, RunStatus},
};

const CANDIDATE_COLUMNS: &str = "\
candidate_id,
	source_id,
	doi,
	title,
	abstract_text,
	full_text,
	full_text_source,
	publication_date,
	pdf_url,
	landing_page_url,
	citation_count,
	fwci,
	category,
	curation_score,
	quality_score,
	rank_position,
	metrics,
	authors,
	topics,
	is_selected,
	is_consumed,
	created_at";

/// Returns the subset of `source_ids` already stored.
pub async fn existing_source_ids<'e, E>(
	executor: E,
	source_ids: &[String],
) -> Result<HashSet<String>>
where
	E: PgExecutor<'e>,
{
	if source_ids.is_empty() {
		return Ok(HashSet::new());
	}

	let rows: Vec<String> =
		sqlx::query_scalar("SELECT source_id FROM candidates WHERE source_id = ANY($1)")
			.bind(source_ids)
			.fetch_all(executor)
			.await?;

	Ok(rows.into_iter().collect())
}

/// Inserts one candidate unless its identity already exists. Returns whether a row was written.
pub async fn insert_candidate<'e, E>(executor: E, candidate: &Candidate) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
INSERT INTO candidates (
	candidate_id,
	source_id,
	doi,
	title,
	abstract_text,
	full_text,
	full_text_source,
	publication_date,
	pdf_url,
	landing_page_url,
	citation_count,
	fwci,
	category,
	curation_score,
	quality_score,
	rank_position,
	metrics,
	authors,
	topics,
	is_selected,
	is_consumed,
	created_at,
	updated_at
)
VALUES (
	$1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
	$13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $22
)
ON CONFLICT (source_id) DO NOTHING",
	)
	.bind(candidate.candidate_id)
	.bind(candidate.source_id.as_str())
	.bind(candidate.doi.as_deref())
	.bind(candidate.title.as_str())
	.bind(candidate.abstract_text.as_deref())
	.bind(candidate.full_text.as_deref())
	.bind(candidate.full_text_source.as_deref())
	.bind(candidate.publication_date)
	.bind(candidate.pdf_url.as_deref())
	.bind(candidate.landing_page_url.as_deref())
	.bind(candidate.citation_count)
	.bind(candidate.fwci)
	.bind(candidate.category.as_deref())
	.bind(candidate.curation_score)
	.bind(candidate.quality_score)
	.bind(candidate.rank_position)
	.bind(&candidate.metrics)
	.bind(&candidate.authors)
	.bind(&candidate.topics)
	.bind(candidate.is_selected)
	.bind(candidate.is_consumed)
	.bind(candidate.created_at)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Inserts a batch in one transaction. Either every new row lands or none do.
pub async fn insert_candidates(db: &Db, candidates: &[Candidate]) -> Result<u64> {
	let mut tx = db.pool.begin().await?;
	let mut stored = 0;

	for candidate in candidates {
		if insert_candidate(&mut *tx, candidate).await? {
			stored += 1;
		}
	}

	tx.commit().await?;

	Ok(stored)
}

/// Inserts a curated candidate, or refreshes the curation fields of the stored one with the same
/// identity. Returns the stored candidate id.
pub async fn upsert_curated<'e, E>(executor: E, candidate: &Candidate) -> Result<Uuid>
where
	E: PgExecutor<'e>,
{
	let candidate_id: Uuid = sqlx::query_scalar(
		"\
INSERT INTO candidates (
	candidate_id,
	source_id,
	doi,
	title,
	abstract_text,
	full_text,
	full_text_source,
	publication_date,
	pdf_url,
	landing_page_url,
	citation_count,
	fwci,
	category,
	curation_score,
	quality_score,
	rank_position,
	metrics,
	authors,
	topics,
	is_selected,
	is_consumed,
	created_at,
	updated_at
)
VALUES (
	$1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
	$13, $14, $15, $16, $17, $18, $19, true, false, $20, $20
)
ON CONFLICT (source_id) DO UPDATE
SET
	full_text = EXCLUDED.full_text,
	full_text_source = EXCLUDED.full_text_source,
	quality_score = EXCLUDED.quality_score,
	rank_position = EXCLUDED.rank_position,
	category = EXCLUDED.category,
	is_selected = true,
	updated_at = EXCLUDED.updated_at
RETURNING candidate_id",
	)
	.bind(candidate.candidate_id)
	.bind(candidate.source_id.as_str())
	.bind(candidate.doi.as_deref())
	.bind(candidate.title.as_str())
	.bind(candidate.abstract_text.as_deref())
	.bind(candidate.full_text.as_deref())
	.bind(candidate.full_text_source.as_deref())
	.bind(candidate.publication_date)
	.bind(candidate.pdf_url.as_deref())
	.bind(candidate.landing_page_url.as_deref())
	.bind(candidate.citation_count)
	.bind(candidate.fwci)
	.bind(candidate.category.as_deref())
	.bind(candidate.curation_score)
	.bind(candidate.quality_score)
	.bind(candidate.rank_position)
	.bind(&candidate.metrics)
	.bind(&candidate.authors)
	.bind(&candidate.topics)
	.bind(candidate.created_at)
	.fetch_one(executor)
	.await?;

	Ok(candidate_id)
}

/// Selected candidates not yet used in an episode, newest publication first.
pub async fn list_unconsumed_selected<'e, E>(executor: E) -> Result<Vec<Candidate>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT
	{CANDIDATE_COLUMNS}
FROM candidates
WHERE is_selected AND NOT is_consumed
ORDER BY publication_date DESC, curation_score DESC NULLS LAST, source_id ASC"
	);
	let rows: Vec<CandidateRow> = sqlx::query_as(&sql).fetch_all(executor).await?;

	Ok(rows.into_iter().map(Candidate::from).collect())
}

/// Flags candidates as used by the given artifact. Already consumed rows are left untouched.
pub async fn mark_consumed<'e, E>(
	executor: E,
	candidate_ids: &[Uuid],
	consumed_by: &str,
) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	if candidate_ids.is_empty() {
		return Ok(0);
	}
	if consumed_by.trim().is_empty() {
		return Err(Error::InvalidArgument("consumed_by must be non-empty.".to_string()));
	}

	let result = sqlx::query(
		"\
UPDATE candidates
SET is_consumed = true, consumed_by = $2, updated_at = now()
WHERE candidate_id = ANY($1) AND NOT is_consumed",
	)
	.bind(candidate_ids)
	.bind(consumed_by)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

pub async fn insert_run_record<'e, E>(executor: E, record: &RunRecord) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO run_records (
	run_id,
	job_name,
	run_date,
	started_at,
	finished_at,
	duration_ms,
	status,
	result,
	error_detail
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
	)
	.bind(record.run_id)
	.bind(record.job_name.as_str())
	.bind(record.run_date)
	.bind(record.started_at)
	.bind(record.finished_at)
	.bind(record.duration_ms)
	.bind(record.status.as_str())
	.bind(record.result.as_ref())
	.bind(record.error_detail.as_deref())
	.execute(executor)
	.await?;

	Ok(())
}

/// Most recent record for a job on one logical date that ended in one of `statuses` and carries a
/// result. Later records with other statuses do not hide it.
pub async fn latest_completed_run<'e, E>(
	executor: E,
	job_name: &str,
	run_date: Date,
	statuses: &[RunStatus],
) -> Result<Option<RunRecord>>
where
	E: PgExecutor<'e>,
{
	if statuses.is_empty() {
		return Ok(None);
	}

	let statuses: Vec<String> = statuses.iter().map(|status| status.as_str().to_string()).collect();
	let record = sqlx::query_as::<_, RunRecord>(
		"\
SELECT
	run_id,
	job_name,
	run_date,
	started_at,
	finished_at,
	duration_ms,
	status,
	result,
	error_detail
FROM run_records
WHERE job_name = $1
	AND run_date = $2
	AND status = ANY($3)
	AND result IS NOT NULL
ORDER BY started_at DESC
LIMIT 1",
	)
	.bind(job_name)
	.bind(run_date)
	.bind(statuses)
	.fetch_optional(executor)
	.await?;

	Ok(record)
}

pub async fn list_runs<'e, E>(
	executor: E,
	job_name: Option<&str>,
	limit: i64,
) -> Result<Vec<RunRecord>>
where
	E: PgExecutor<'e>,
{
	if limit <= 0 {
		return Err(Error::InvalidArgument("limit must be greater than zero.".to_string()));
	}

	let records = sqlx::query_as::<_, RunRecord>(
		"\
SELECT
	run_id,
	job_name,
	run_date,
	started_at,
	finished_at,
	duration_ms,
	status,
	result,
	error_detail
FROM run_records
WHERE $1::text IS NULL OR job_name = $1
ORDER BY started_at DESC
LIMIT $2",
	)
	.bind(job_name)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(records)
}
