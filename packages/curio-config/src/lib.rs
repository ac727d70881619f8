mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	AiCuration, CategoryConfig, Config, Harvest, LlmProviderConfig, MetadataProviderConfig,
	Postgres, ProviderConfig, Providers, QualityWeights, Schedule, Selection, Service, Storage,
	VenueTier, default_ai_keywords, default_categories,
};

use std::{collections::HashSet, fs, path::Path};

/// Upper bound for every `lookback_days` window.
pub const MAX_LOOKBACK_DAYS: i64 = 3_650;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.metadata.api_base.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.metadata.api_base must be non-empty.".to_string(),
		});
	}
	if cfg.providers.metadata.per_page_max == 0 {
		return Err(Error::Validation {
			message: "providers.metadata.per_page_max must be greater than zero.".to_string(),
		});
	}

	let mut keys = vec![
		("ranker", &cfg.providers.ranker.api_key),
		("producer", &cfg.providers.producer.api_key),
	];

	if let Some(full_text) = cfg.providers.full_text.as_ref() {
		keys.push(("full_text", &full_text.api_key));
	}

	for (label, key) in keys {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if !(0..=MAX_LOOKBACK_DAYS).contains(&cfg.harvest.lookback_days) {
		return Err(Error::Validation {
			message: format!("harvest.lookback_days must be between 0 and {MAX_LOOKBACK_DAYS}."),
		});
	}
	if cfg.harvest.per_page == 0 {
		return Err(Error::Validation {
			message: "harvest.per_page must be greater than zero.".to_string(),
		});
	}
	if cfg.harvest.keep_per_category == 0 {
		return Err(Error::Validation {
			message: "harvest.keep_per_category must be greater than zero.".to_string(),
		});
	}
	if cfg.harvest.branch_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "harvest.branch_timeout_ms must be greater than zero.".to_string(),
		});
	}

	validate_selection(&cfg.selection)?;
	validate_ai_curation(&cfg.ai_curation)?;
	validate_schedule(&cfg.schedule)?;
	validate_categories(&cfg.categories)?;

	if !cfg.categories.iter().any(|category| category.slug == cfg.ai_curation.category) {
		return Err(Error::Validation {
			message: format!(
				"ai_curation.category {:?} must name a configured category.",
				cfg.ai_curation.category
			),
		});
	}

	Ok(())
}

/// Parses an `HH:MM` wall-clock time into `(hour, minute)`.
pub fn parse_time_of_day(raw: &str) -> Option<(u8, u8)> {
	let (hour, minute) = raw.trim().split_once(':')?;

	if hour.len() != 2 || minute.len() != 2 {
		return None;
	}

	let hour: u8 = hour.parse().ok()?;
	let minute: u8 = minute.parse().ok()?;

	(hour < 24 && minute < 60).then_some((hour, minute))
}

pub fn is_valid_slug(slug: &str) -> bool {
	let mut chars = slug.chars();
	let Some(first) = chars.next() else {
		return false;
	};

	slug.len() <= 50
		&& first.is_ascii_lowercase()
		&& chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
}

fn validate_selection(selection: &Selection) -> Result<()> {
	for (label, value) in [
		("selection.ranking_budget", selection.ranking_budget),
		("selection.curated_pool_size", selection.curated_pool_size),
		("selection.episode_size", selection.episode_size),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if selection.curated_pool_size < selection.episode_size {
		return Err(Error::Validation {
			message: "selection.curated_pool_size must be at least selection.episode_size."
				.to_string(),
		});
	}
	if selection.ranking_budget < selection.curated_pool_size {
		return Err(Error::Validation {
			message: "selection.ranking_budget must be at least selection.curated_pool_size."
				.to_string(),
		});
	}

	for (label, value) in [
		("selection.default_weight", selection.default_weight),
		("selection.full_text_boost", selection.full_text_boost),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if value < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}

	if selection.rank_timeout_ms == 0 || selection.produce_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "selection timeouts must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_ai_curation(ai: &AiCuration) -> Result<()> {
	if !(0..=MAX_LOOKBACK_DAYS).contains(&ai.lookback_days) {
		return Err(Error::Validation {
			message: format!(
				"ai_curation.lookback_days must be between 0 and {MAX_LOOKBACK_DAYS}."
			),
		});
	}
	if ai.max_candidates == 0 || ai.rerank_pool == 0 || ai.max_select == 0 {
		return Err(Error::Validation {
			message: "ai_curation.max_candidates, rerank_pool, and max_select must be greater than \
			          zero."
				.to_string(),
		});
	}
	if ai.keywords.is_empty() {
		return Err(Error::Validation {
			message: "ai_curation.keywords must be non-empty.".to_string(),
		});
	}
	if ai.quality.h_index_divisor <= 0.0 {
		return Err(Error::Validation {
			message: "ai_curation.quality.h_index_divisor must be greater than zero.".to_string(),
		});
	}

	let quality = &ai.quality;
	let mut numbers = vec![
		quality.preprint_points,
		quality.h_index_cap,
		quality.code_points,
		quality.open_access_points,
		quality.velocity_multiplier,
		quality.velocity_cap,
	];

	numbers.extend(quality.venue_tiers.iter().map(|tier| tier.points));

	if numbers.iter().any(|value| !value.is_finite() || *value < 0.0) {
		return Err(Error::Validation {
			message: "ai_curation.quality points must be finite and zero or greater.".to_string(),
		});
	}

	Ok(())
}

fn validate_schedule(schedule: &Schedule) -> Result<()> {
	let mut times = vec![
		("schedule.harvest_at", &schedule.harvest_at),
		("schedule.select_at", &schedule.select_at),
	];

	if let Some(curate_ai_at) = schedule.curate_ai_at.as_ref() {
		times.push(("schedule.curate_ai_at", curate_ai_at));
	}

	for (label, value) in times {
		if parse_time_of_day(value).is_none() {
			return Err(Error::Validation {
				message: format!("{label} must be an HH:MM time, got {value:?}."),
			});
		}
	}

	if schedule.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "schedule.poll_interval_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_categories(categories: &[CategoryConfig]) -> Result<()> {
	if categories.is_empty() {
		return Err(Error::Validation { message: "categories must be non-empty.".to_string() });
	}

	let mut seen = HashSet::new();

	for category in categories {
		if !is_valid_slug(&category.slug) {
			return Err(Error::Validation {
				message: format!(
					"Category slug {:?} must match ^[a-z][a-z0-9_]*$ and be at most 50 characters.",
					category.slug
				),
			});
		}
		if !seen.insert(category.slug.as_str()) {
			return Err(Error::Validation {
				message: format!("Category slug {:?} is defined more than once.", category.slug),
			});
		}
		if category.field_ids.is_empty() {
			return Err(Error::Validation {
				message: format!("Category {:?} must list at least one field id.", category.slug),
			});
		}
		if let Some(weight) = category.weight
			&& (!weight.is_finite() || weight < 0.0)
		{
			return Err(Error::Validation {
				message: format!(
					"Category {:?} weight must be finite and zero or greater.",
					category.slug
				),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.providers.metadata.mailto.as_deref().is_some_and(|mailto| mailto.trim().is_empty()) {
		cfg.providers.metadata.mailto = None;
	}
	if cfg.schedule.curate_ai_at.as_deref().is_some_and(|at| at.trim().is_empty()) {
		cfg.schedule.curate_ai_at = None;
	}

	for keyword in &mut cfg.ai_curation.keywords {
		*keyword = keyword.trim().to_lowercase();
	}

	cfg.ai_curation.keywords.retain(|keyword| !keyword.is_empty());
}
