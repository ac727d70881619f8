use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use curio_config::{CategoryConfig, Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(path: &[&str], key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let mut table = root.as_table_mut().expect("Template config must be a table.");

	for section in path {
		table = table
			.get_mut(*section)
			.and_then(Value::as_table_mut)
			.expect("Template config must include the requested section.");
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("curio_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads_with_builtin_categories() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let result = curio_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected sample config to load.");

	assert_eq!(cfg.categories.len(), 12);
	assert!(cfg.categories.iter().any(|category| category.slug == "ai_tech"));
	assert_eq!(cfg.providers.metadata.path, "/works");
	assert_eq!(cfg.ai_curation.keywords.len(), 50);
	assert!(cfg.providers.full_text.is_none());
}

#[test]
fn blank_mailto_is_normalized_away() {
	let payload =
		sample_toml_with(&["providers", "metadata"], "mailto", Value::String("   ".into()));
	let path = write_temp_config(payload);
	let result = curio_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected config to load.");

	assert!(cfg.providers.metadata.mailto.is_none());
}

#[test]
fn malformed_schedule_time_is_rejected() {
	let payload = sample_toml_with(&["schedule"], "harvest_at", Value::String("4am".into()));
	let path = write_temp_config(payload);
	let result = curio_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected schedule validation error.");

	assert!(
		err.to_string().contains("schedule.harvest_at must be an HH:MM time"),
		"Unexpected error: {err}"
	);
}

#[test]
fn episode_size_cannot_exceed_curated_pool() {
	let mut cfg = base_config();

	cfg.selection.episode_size = 11;

	let err = curio_config::validate(&cfg).expect_err("Expected selection validation error.");

	assert!(
		err.to_string()
			.contains("selection.curated_pool_size must be at least selection.episode_size."),
		"Unexpected error: {err}"
	);
}

#[test]
fn negative_category_weight_is_rejected() {
	let mut cfg = base_config();

	cfg.categories.push(CategoryConfig {
		slug: "maths".to_string(),
		display_name: "Mathematics".to_string(),
		field_ids: vec![26],
		weight: Some(-0.1),
		active: true,
	});

	let err = curio_config::validate(&cfg).expect_err("Expected category validation error.");

	assert!(err.to_string().contains("weight must be finite"), "Unexpected error: {err}");
}

#[test]
fn duplicate_category_slug_is_rejected() {
	let mut cfg = base_config();
	let duplicate = cfg.categories[0].clone();

	cfg.categories.push(duplicate);

	let err = curio_config::validate(&cfg).expect_err("Expected duplicate slug error.");

	assert!(err.to_string().contains("is defined more than once."), "Unexpected error: {err}");
}

#[test]
fn ai_curation_category_must_exist() {
	let mut cfg = base_config();

	cfg.ai_curation.category = "robotics".to_string();

	let err = curio_config::validate(&cfg).expect_err("Expected ai_curation validation error.");

	assert!(matches!(err, Error::Validation { .. }));
	assert!(err.to_string().contains("must name a configured category."));
}

#[test]
fn empty_ranker_key_is_rejected() {
	let mut cfg = base_config();

	cfg.providers.ranker.api_key = "  ".to_string();

	let err = curio_config::validate(&cfg).expect_err("Expected provider key validation error.");

	assert!(
		err.to_string().contains("Provider ranker api_key must be non-empty."),
		"Unexpected error: {err}"
	);
}

#[test]
fn lookback_windows_are_bounded() {
	let mut cfg = base_config();

	cfg.harvest.lookback_days = curio_config::MAX_LOOKBACK_DAYS;

	curio_config::validate(&cfg).expect("Expected the largest lookback to validate.");

	cfg.harvest.lookback_days = i64::MAX;

	let err = curio_config::validate(&cfg).expect_err("Expected harvest lookback error.");

	assert!(
		err.to_string().contains("harvest.lookback_days must be between 0 and 3650."),
		"Unexpected error: {err}"
	);

	let mut cfg = base_config();

	cfg.ai_curation.lookback_days = -1;

	let err = curio_config::validate(&cfg).expect_err("Expected ai_curation lookback error.");

	assert!(
		err.to_string().contains("ai_curation.lookback_days must be between 0 and 3650."),
		"Unexpected error: {err}"
	);
}
