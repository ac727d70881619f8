use time::Date;

use crate::{round2, work::RawWork};

const CITATION_CAP: f64 = 25.0;
const CITATION_NORMALIZER: f64 = 100.0;
const IMPACT_CAP: f64 = 25.0;
const IMPACT_NORMALIZER: f64 = 5.0;
const TOP_INDEX_BONUS: f64 = 5.0;
const SECONDARY_INDEX_BONUS: f64 = 3.0;
const OPEN_ACCESS_BONUS: f64 = 5.0;
const RECENCY_CAP: f64 = 25.0;
const RECENCY_FULL_DAYS: i64 = 2;
const RECENCY_ZERO_DAYS: i64 = 7;
const TOP_INDEXES: &[&str] = &["pubmed"];
const SECONDARY_INDEXES: &[&str] = &["scopus", "crossref"];

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScoreBreakdown {
	pub citations: f64,
	pub impact: f64,
	pub indexing: f64,
	pub open_access: f64,
	pub recency: f64,
}
impl ScoreBreakdown {
	pub fn total(&self) -> f64 {
		round2(self.citations + self.impact + self.indexing + self.open_access + self.recency)
	}
}

/// Deterministic curation score in `[0, 100]`, rounded to two decimals.
pub fn curation_score(work: &RawWork, today: Date) -> f64 {
	score_breakdown(work, today).total()
}

pub fn score_breakdown(work: &RawWork, today: Date) -> ScoreBreakdown {
	let citations = normalized(work.citation_count() as f64, CITATION_NORMALIZER) * CITATION_CAP;
	let impact = normalized(work.fwci.unwrap_or(0.0), IMPACT_NORMALIZER) * IMPACT_CAP;
	let indexing = if TOP_INDEXES.iter().any(|name| work.is_indexed_in(name)) {
		TOP_INDEX_BONUS
	} else if SECONDARY_INDEXES.iter().any(|name| work.is_indexed_in(name)) {
		SECONDARY_INDEX_BONUS
	} else {
		0.0
	};
	let open_access = if work.is_open_access() { OPEN_ACCESS_BONUS } else { 0.0 };
	let recency = work
		.parse_publication_date()
		.map(|published| recency_score((today - published).whole_days()))
		.unwrap_or(0.0);

	ScoreBreakdown { citations, impact, indexing, open_access, recency }
}

/// Full marks up to two days old, linear decay to zero at seven days.
pub fn recency_score(days_ago: i64) -> f64 {
	if days_ago <= RECENCY_FULL_DAYS {
		RECENCY_CAP
	} else if days_ago <= RECENCY_ZERO_DAYS {
		let span = (RECENCY_ZERO_DAYS - RECENCY_FULL_DAYS) as f64;

		RECENCY_CAP * (1.0 - (days_ago - RECENCY_FULL_DAYS) as f64 / span)
	} else {
		0.0
	}
}

fn normalized(value: f64, divisor: f64) -> f64 {
	if !value.is_finite() {
		return 0.0;
	}

	(value / divisor).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
	use time::{Duration, macros::date};

	use super::*;

	fn work(cites: i64, fwci: f64, indexed: &[&str], is_oa: bool, published: Date) -> RawWork {
		RawWork {
			id: Some("W1".to_string()),
			cited_by_count: Some(cites),
			fwci: Some(fwci),
			indexed_in: Some(indexed.iter().map(|name| name.to_string()).collect()),
			open_access: Some(crate::work::OpenAccess { is_oa: Some(is_oa), oa_url: None }),
			publication_date: Some(published.to_string()),
			..Default::default()
		}
	}

	#[test]
	fn capped_citations_and_fresh_pubmed_paper_scores_75() {
		let today = date!(2026 - 10 - 15);
		let work = work(120, 3.0, &["pubmed"], true, today - Duration::days(1));

		assert_eq!(curation_score(&work, today), 75.0);
	}

	#[test]
	fn index_bonus_takes_first_match() {
		let today = date!(2026 - 10 - 15);
		let old = today - Duration::days(30);

		let indexing =
			|indexed: &[&str]| score_breakdown(&work(0, 0.0, indexed, false, old), today).indexing;

		assert_eq!(indexing(&["crossref", "pubmed"]), 5.0);
		assert_eq!(indexing(&["scopus"]), 3.0);
		assert_eq!(indexing(&["doaj"]), 0.0);
	}

	#[test]
	fn recency_decays_linearly_between_two_and_seven_days() {
		assert_eq!(recency_score(-3), 25.0);
		assert_eq!(recency_score(2), 25.0);
		assert_eq!(recency_score(3), 20.0);
		assert_eq!(recency_score(7), 0.0);
		assert_eq!(recency_score(8), 0.0);
	}

	#[test]
	fn missing_metadata_scores_zero_and_stays_in_range() {
		let today = date!(2026 - 10 - 15);
		let empty = RawWork::default();

		assert_eq!(curation_score(&empty, today), 0.0);

		let maxed = work(10_000, 50.0, &["pubmed"], true, today);

		assert_eq!(curation_score(&maxed, today), 85.0);

		let negative = work(-10, -2.0, &[], false, today - Duration::days(60));

		assert_eq!(curation_score(&negative, today), 0.0);
	}

	#[test]
	fn scoring_is_deterministic() {
		let today = date!(2026 - 10 - 15);
		let work = work(37, 1.3, &["scopus"], false, today - Duration::days(4));

		assert_eq!(curation_score(&work, today), curation_score(&work, today));
		assert_eq!(curation_score(&work, today), 33.75);
	}
}
