use time::Date;

use curio_config::QualityWeights;

use crate::{round2, work::RawWork};

/// True when the title or abstract contains any keyword. Keywords are expected in lowercase.
pub fn matches_keywords(work: &RawWork, keywords: &[String]) -> bool {
	let text = searchable_text(work);

	keywords.iter().any(|keyword| text.contains(keyword.as_str()))
}

pub fn filter_by_keywords(works: Vec<RawWork>, keywords: &[String]) -> Vec<RawWork> {
	works.into_iter().filter(|work| matches_keywords(work, keywords)).collect()
}

/// Additive heuristic over venue, author reputation, code availability, open access, and
/// citation velocity. Rounded to two decimals.
pub fn quality_score(work: &RawWork, today: Date, weights: &QualityWeights) -> f64 {
	let mut score = venue_points(work.venue().unwrap_or_default(), weights);

	if let Some(h_index) = work.max_author_h_index() {
		score += (h_index / weights.h_index_divisor).min(weights.h_index_cap);
	}

	let text = searchable_text(work);

	if weights.code_markers.iter().any(|marker| text.contains(&marker.to_lowercase())) {
		score += weights.code_points;
	}
	if work.is_open_access() {
		score += weights.open_access_points;
	}
	if let Ok(published) = work.parse_publication_date() {
		let days = (today - published).whole_days();

		if days > 0 {
			let velocity = work.citation_count() as f64 / days as f64;

			score += (velocity * weights.velocity_multiplier).min(weights.velocity_cap);
		}
	}

	round2(score)
}

fn venue_points(venue: &str, weights: &QualityWeights) -> f64 {
	for tier in &weights.venue_tiers {
		if tier.venues.iter().any(|name| venue.contains(name.as_str())) {
			return tier.points;
		}
	}

	if venue.to_lowercase().contains(&weights.preprint_marker.to_lowercase()) {
		weights.preprint_points
	} else {
		0.0
	}
}

fn searchable_text(work: &RawWork) -> String {
	format!("{} {}", work.title.as_deref().unwrap_or_default(), work.abstract_text()).to_lowercase()
}
