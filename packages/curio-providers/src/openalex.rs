use std::time::Duration;

use reqwest::{Client, header::USER_AGENT};
use serde::Deserialize;
use time::Date;

use curio_config::MetadataProviderConfig;
use curio_domain::work::RawWork;

const SORT: &str = "cited_by_count:desc";

#[derive(Clone, Debug)]
pub struct WorksQuery {
	pub from_date: Date,
	/// Field ids joined with `|`. No field filter is applied when absent.
	pub field_filter: Option<String>,
	pub per_page: u32,
}

#[derive(Debug, Deserialize)]
struct WorksPage {
	#[serde(default)]
	results: Vec<RawWork>,
}

pub async fn fetch_works(
	cfg: &MetadataProviderConfig,
	query: &WorksQuery,
) -> crate::Result<Vec<RawWork>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut headers = crate::extra_headers(&cfg.default_headers)?;

	if let Some(mailto) = cfg.mailto.as_deref() {
		headers.insert(USER_AGENT, crate::header_value("user-agent", &format!("mailto:{mailto}"))?);
	}

	let params = query_params(cfg, query);
	let res = client.get(url).headers(headers).query(&params).send().await?;
	let page: WorksPage = res.error_for_status()?.json().await?;

	Ok(page.results)
}

pub fn build_filter_string(from_date: Date, field_filter: Option<&str>) -> String {
	let mut terms = vec![
		format!("from_publication_date:{from_date}"),
		"type:article|review".to_string(),
		"has_abstract:true".to_string(),
		"primary_location.version:publishedVersion".to_string(),
	];

	if let Some(fields) = field_filter.filter(|fields| !fields.is_empty()) {
		terms.push(format!("topics.field.id:{fields}"));
	}

	terms.join(",")
}

fn query_params(cfg: &MetadataProviderConfig, query: &WorksQuery) -> Vec<(&'static str, String)> {
	vec![
		("filter", build_filter_string(query.from_date, query.field_filter.as_deref())),
		("sort", SORT.to_string()),
		("per_page", query.per_page.min(cfg.per_page_max).to_string()),
	]
}

#[cfg(test)]
mod tests {
	use serde_json::Map;
	use time::macros::date;

	use super::*;

	fn cfg() -> MetadataProviderConfig {
		MetadataProviderConfig {
			api_base: "https://api.openalex.org".to_string(),
			path: "/works".to_string(),
			mailto: None,
			per_page_max: 200,
			timeout_ms: 1_000,
			default_headers: Map::new(),
		}
	}

	#[test]
	fn filter_includes_field_ids_when_given() {
		let filter = build_filter_string(date!(2026 - 10 - 08), Some("28|32"));

		assert_eq!(
			filter,
			"from_publication_date:2026-10-08,type:article|review,has_abstract:true,\
			 primary_location.version:publishedVersion,topics.field.id:28|32"
		);
		assert!(!build_filter_string(date!(2026 - 10 - 08), None).contains("topics.field.id"));
	}

	#[test]
	fn page_size_is_capped() {
		let query =
			WorksQuery { from_date: date!(2026 - 10 - 08), field_filter: None, per_page: 500 };
		let params = query_params(&cfg(), &query);

		assert!(params.contains(&("per_page", "200".to_string())));
		assert!(params.contains(&("sort", "cited_by_count:desc".to_string())));
	}

	#[test]
	fn page_tolerates_missing_results() {
		let page: WorksPage =
			serde_json::from_str("{\"meta\": {}}").expect("Failed to parse page.");

		assert!(page.results.is_empty());
	}
}
