use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::{
	Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};
use uuid::Uuid;

const SOURCE_ID_PREFIX: &str = "https://openalex.org/";
const UNTITLED: &str = "Untitled";
/// Largest abstract length, in tokens, that is rebuilt from an inverted index.
pub const MAX_ABSTRACT_TOKENS: usize = 100_000;
const PUBLICATION_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day]");

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum WorkRejection {
	#[error("Work is missing its source id.")]
	MissingId,
	#[error("Work is missing its publication date.")]
	MissingPublicationDate,
	#[error("Work has a malformed publication date: {raw:?}.")]
	MalformedPublicationDate { raw: String },
}

/// One record as returned by the metadata source. Every field tolerates absence and `null`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawWork {
	pub id: Option<String>,
	pub doi: Option<String>,
	pub title: Option<String>,
	pub abstract_inverted_index: Option<BTreeMap<String, Vec<usize>>>,
	pub publication_date: Option<String>,
	pub cited_by_count: Option<i64>,
	pub fwci: Option<f64>,
	pub indexed_in: Option<Vec<String>>,
	pub open_access: Option<OpenAccess>,
	pub authorships: Option<Value>,
	pub topics: Option<Value>,
	pub primary_location: Option<Value>,
}
impl RawWork {
	/// The stable identity with the source's URL prefix removed.
	pub fn source_id(&self) -> Option<&str> {
		let id = self.id.as_deref()?.trim();

		if id.is_empty() {
			return None;
		}

		Some(id.strip_prefix(SOURCE_ID_PREFIX).unwrap_or(id))
	}

	pub fn title_or_default(&self) -> &str {
		self.title.as_deref().filter(|title| !title.trim().is_empty()).unwrap_or(UNTITLED)
	}

	pub fn abstract_text(&self) -> String {
		self.abstract_inverted_index.as_ref().map(reconstruct_abstract).unwrap_or_default()
	}

	pub fn citation_count(&self) -> i64 {
		self.cited_by_count.unwrap_or(0)
	}

	pub fn is_indexed_in(&self, database: &str) -> bool {
		self.indexed_in.as_ref().is_some_and(|indexed| indexed.iter().any(|name| name == database))
	}

	pub fn is_open_access(&self) -> bool {
		self.open_access.as_ref().is_some_and(|oa| oa.is_oa.unwrap_or(false))
	}

	pub fn parse_publication_date(&self) -> Result<Date, WorkRejection> {
		let raw = self
			.publication_date
			.as_deref()
			.map(str::trim)
			.filter(|raw| !raw.is_empty())
			.ok_or(WorkRejection::MissingPublicationDate)?;

		Date::parse(raw, PUBLICATION_DATE_FORMAT)
			.map_err(|_| WorkRejection::MalformedPublicationDate { raw: raw.to_string() })
	}

	/// Display name of the primary venue, when the source reports one.
	pub fn venue(&self) -> Option<&str> {
		self.primary_location.as_ref()?.get("source")?.get("display_name")?.as_str()
	}

	/// Highest author h-index across the authorship list. Authors without one count as zero.
	pub fn max_author_h_index(&self) -> Option<f64> {
		let authorships = self.authorships.as_ref()?.as_array()?;

		authorships
			.iter()
			.filter(|authorship| authorship.is_object())
			.map(|authorship| {
				authorship
					.get("author")
					.and_then(|author| author.get("h_index"))
					.and_then(Value::as_f64)
					.unwrap_or(0.0)
			})
			.reduce(f64::max)
	}
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenAccess {
	pub is_oa: Option<bool>,
	pub oa_url: Option<String>,
}

/// A candidate paper as the pipeline tracks it. Fields the pipeline reads are typed; `metrics`
/// carries whatever else the source reported.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
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
impl Candidate {
	/// Builds a candidate from a raw record. `is_selected` is set only when a category is given.
	pub fn from_work(
		work: &RawWork,
		category: Option<&str>,
		now: OffsetDateTime,
	) -> Result<Self, WorkRejection> {
		let source_id = work.source_id().ok_or(WorkRejection::MissingId)?.to_string();
		let publication_date = work.parse_publication_date()?;
		let abstract_text = Some(work.abstract_text()).filter(|text| !text.is_empty());
		let pdf_url = work
			.open_access
			.as_ref()
			.filter(|oa| oa.is_oa.unwrap_or(false))
			.and_then(|oa| oa.oa_url.clone());
		let category = category.map(str::to_string);
		let metrics = json!({
			"indexed_in": work.indexed_in.clone().unwrap_or_default(),
			"venue": work.venue(),
			"category": category,
		});

		Ok(Self {
			candidate_id: Uuid::new_v4(),
			source_id,
			doi: work.doi.clone(),
			title: work.title_or_default().to_string(),
			abstract_text,
			full_text: None,
			full_text_source: None,
			publication_date,
			pdf_url,
			landing_page_url: work.doi.clone(),
			citation_count: work.citation_count(),
			fwci: work.fwci,
			is_selected: category.is_some(),
			category,
			curation_score: None,
			quality_score: None,
			rank_position: None,
			metrics,
			authors: work.authorships.clone().unwrap_or_else(|| Value::Array(Vec::new())),
			topics: work.topics.clone().unwrap_or_else(|| Value::Array(Vec::new())),
			is_consumed: false,
			created_at: now,
		})
	}

	pub fn has_full_text(&self) -> bool {
		self.full_text.as_deref().is_some_and(|text| !text.is_empty())
	}

	/// Compact text handed to the ranking service.
	pub fn abstract_preview(&self, max_chars: usize) -> String {
		self.abstract_text
			.as_deref()
			.map(|text| text.chars().take(max_chars).collect())
			.unwrap_or_default()
	}
}

/// Rebuilds abstract text from `{word: [positions]}`.
///
/// Positions no word claims stay as empty tokens, so gaps show up as repeated spaces. An index
/// with a position at or past [`MAX_ABSTRACT_TOKENS`] yields an empty abstract.
pub fn reconstruct_abstract(inverted_index: &BTreeMap<String, Vec<usize>>) -> String {
	let Some(&max) = inverted_index.values().flatten().max() else {
		return String::new();
	};

	if max >= MAX_ABSTRACT_TOKENS {
		return String::new();
	}

	let len = max + 1;
	let mut tokens = vec![""; len];

	for (word, positions) in inverted_index {
		for &position in positions {
			tokens[position] = word.as_str();
		}
	}

	tokens.join(" ")
}

#[cfg(test)]
mod tests {
	use super::*;

	fn index(entries: &[(&str, &[usize])]) -> BTreeMap<String, Vec<usize>> {
		entries.iter().map(|(word, positions)| (word.to_string(), positions.to_vec())).collect()
	}

	#[test]
	fn reconstructs_words_in_position_order() {
		let text = reconstruct_abstract(&index(&[("world", &[1]), ("hello", &[0, 2])]));

		assert_eq!(text, "hello world hello");
	}

	#[test]
	fn unfilled_positions_become_empty_tokens() {
		let text = reconstruct_abstract(&index(&[("a", &[0]), ("b", &[3])]));

		assert_eq!(text, "a   b");
	}

	#[test]
	fn empty_index_yields_empty_text() {
		assert_eq!(reconstruct_abstract(&BTreeMap::new()), "");
		assert_eq!(reconstruct_abstract(&index(&[("orphan", &[])])), "");
	}

	#[test]
	fn out_of_range_positions_yield_empty_text() {
		let last = MAX_ABSTRACT_TOKENS - 1;
		let text = reconstruct_abstract(&index(&[("a", &[0]), ("b", &[last])]));

		assert_eq!(text.split(' ').count(), MAX_ABSTRACT_TOKENS);
		assert!(text.starts_with("a ") && text.ends_with(" b"));
		assert_eq!(reconstruct_abstract(&index(&[("a", &[0]), ("b", &[MAX_ABSTRACT_TOKENS])])), "");
		assert_eq!(reconstruct_abstract(&index(&[("huge", &[usize::MAX])])), "");
	}

	#[test]
	fn from_work_maps_identity_and_urls() {
		let work: RawWork = serde_json::from_value(json!({
			"id": "https://openalex.org/W123",
			"doi": "https://doi.org/10.1/abc",
			"title": null,
			"publication_date": "2026-10-14",
			"cited_by_count": 4,
			"open_access": { "is_oa": true, "oa_url": "https://example.org/paper.pdf" },
			"authorships": null
		}))
		.expect("Failed to parse work.");
		let now = OffsetDateTime::UNIX_EPOCH;
		let candidate =
			Candidate::from_work(&work, Some("ai_tech"), now).expect("Expected mapping.");

		assert_eq!(candidate.source_id, "W123");
		assert_eq!(candidate.title, "Untitled");
		assert_eq!(candidate.pdf_url.as_deref(), Some("https://example.org/paper.pdf"));
		assert_eq!(candidate.landing_page_url.as_deref(), Some("https://doi.org/10.1/abc"));
		assert_eq!(candidate.category.as_deref(), Some("ai_tech"));
		assert!(candidate.is_selected);
		assert!(candidate.abstract_text.is_none());
		assert_eq!(candidate.metrics["category"], json!("ai_tech"));
	}

	#[test]
	fn from_work_without_category_is_unselected_inventory() {
		let work = RawWork {
			id: Some("W1".to_string()),
			publication_date: Some("2026-01-02".to_string()),
			..Default::default()
		};
		let candidate = Candidate::from_work(&work, None, OffsetDateTime::UNIX_EPOCH)
			.expect("Expected mapping.");

		assert!(!candidate.is_selected);
		assert!(candidate.category.is_none());
	}

	#[test]
	fn from_work_rejects_missing_identity_and_bad_dates() {
		let missing_id =
			RawWork { publication_date: Some("2026-01-02".to_string()), ..Default::default() };
		let missing_date = RawWork { id: Some("W1".to_string()), ..Default::default() };
		let bad_date = RawWork {
			id: Some("W1".to_string()),
			publication_date: Some("2026-13-45".to_string()),
			..Default::default()
		};
		let now = OffsetDateTime::UNIX_EPOCH;

		assert_eq!(Candidate::from_work(&missing_id, None, now), Err(WorkRejection::MissingId));
		assert_eq!(
			Candidate::from_work(&missing_date, None, now),
			Err(WorkRejection::MissingPublicationDate)
		);
		assert!(matches!(
			Candidate::from_work(&bad_date, None, now),
			Err(WorkRejection::MalformedPublicationDate { .. })
		));
	}

	#[test]
	fn reads_venue_and_author_reputation() {
		let work: RawWork = serde_json::from_value(json!({
			"primary_location": { "source": { "display_name": "NeurIPS 2026" } },
			"authorships": [
				{ "author": { "h_index": 12 } },
				{ "author": {} },
				{ "author": { "h_index": 40.5 } }
			]
		}))
		.expect("Failed to parse work.");

		assert_eq!(work.venue(), Some("NeurIPS 2026"));
		assert_eq!(work.max_author_h_index(), Some(40.5));
	}
}
