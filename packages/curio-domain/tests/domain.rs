use rand::{SeedableRng, rngs::StdRng};
use serde_json::json;
use time::{Duration, OffsetDateTime, macros::date};

use curio_domain::{
	categories::CategoryTable,
	scoring, selector,
	work::{Candidate, RawWork},
};

fn raw(value: serde_json::Value) -> RawWork {
	serde_json::from_value(value).expect("Failed to parse work.")
}

#[test]
fn openalex_payload_scores_and_maps_into_a_candidate() {
	let today = date!(2026 - 10 - 15);
	let published = today - Duration::days(1);
	let work = raw(json!({
		"id": "https://openalex.org/W4401",
		"doi": "https://doi.org/10.1000/xyz",
		"title": "Sparse attention at scale",
		"abstract_inverted_index": { "Sparse": [0], "attention": [1], "works": [2] },
		"publication_date": published.to_string(),
		"cited_by_count": 120,
		"fwci": 3.0,
		"indexed_in": ["pubmed", "crossref"],
		"open_access": { "is_oa": true, "oa_url": null },
		"authorships": [],
		"topics": [{ "id": "T1" }]
	}));

	assert_eq!(scoring::curation_score(&work, today), 75.0);

	let candidate = Candidate::from_work(&work, Some("ai_tech"), OffsetDateTime::UNIX_EPOCH)
		.expect("Expected a valid candidate.");

	assert_eq!(candidate.source_id, "W4401");
	assert_eq!(candidate.abstract_text.as_deref(), Some("Sparse attention works"));
	assert_eq!(candidate.pdf_url, None);
	assert_eq!(candidate.citation_count, 120);
	assert_eq!(candidate.topics, json!([{ "id": "T1" }]));
}

#[test]
fn three_candidate_pool_with_k_three_skips_sampling() {
	let table = CategoryTable::new(&curio_config::default_categories(), 0.05);
	let now = OffsetDateTime::UNIX_EPOCH;
	let pool: Vec<Candidate> = [("W1", "ai_tech"), ("W2", "chemistry"), ("W3", "unlisted")]
		.into_iter()
		.map(|(id, category)| {
			let work = RawWork {
				id: Some(id.to_string()),
				publication_date: Some("2026-10-01".to_string()),
				..Default::default()
			};

			Candidate::from_work(&work, Some(category), now).expect("Expected a valid candidate.")
		})
		.collect();
	let weights: Vec<f64> =
		pool.iter().map(|candidate| selector::candidate_weight(candidate, &table, 2.0)).collect();

	assert_eq!(weights, vec![0.15, 0.05, 0.05]);

	let mut rng = StdRng::seed_from_u64(3);
	let selected = selector::weighted_select(pool.clone(), 3, &table, 2.0, &mut rng);

	assert_eq!(selected, pool);
}
