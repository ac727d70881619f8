use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub harvest: Harvest,
	#[serde(default)]
	pub selection: Selection,
	#[serde(default)]
	pub ai_curation: AiCuration,
	#[serde(default)]
	pub schedule: Schedule,
	/// Optional. The built-in category table is used when no `[[categories]]` entries exist.
	#[serde(default = "default_categories")]
	pub categories: Vec<CategoryConfig>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub metadata: MetadataProviderConfig,
	pub ranker: LlmProviderConfig,
	pub producer: ProviderConfig,
	pub full_text: Option<ProviderConfig>,
}

#[derive(Debug, Deserialize)]
pub struct MetadataProviderConfig {
	pub api_base: String,
	#[serde(default = "default_works_path")]
	pub path: String,
	/// Optional. Sent as `User-Agent: mailto:<address>` to join the polite pool.
	pub mailto: Option<String>,
	#[serde(default = "default_per_page_max")]
	pub per_page_max: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	#[serde(default = "default_max_tokens")]
	pub max_tokens: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Harvest {
	pub lookback_days: i64,
	pub per_page: u32,
	pub keep_per_category: usize,
	pub branch_timeout_ms: u64,
}
impl Default for Harvest {
	fn default() -> Self {
		Self { lookback_days: 7, per_page: 50, keep_per_category: 2, branch_timeout_ms: 45_000 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Selection {
	/// Pool size above which the selector pre-narrows before the ranking call.
	pub ranking_budget: usize,
	pub curated_pool_size: usize,
	pub episode_size: usize,
	pub default_weight: f64,
	pub full_text_boost: f64,
	pub rank_timeout_ms: u64,
	pub produce_timeout_ms: u64,
}
impl Default for Selection {
	fn default() -> Self {
		Self {
			ranking_budget: 50,
			curated_pool_size: 10,
			episode_size: 3,
			default_weight: 0.05,
			full_text_boost: 2.0,
			rank_timeout_ms: 60_000,
			produce_timeout_ms: 300_000,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AiCuration {
	pub category: String,
	pub lookback_days: i64,
	pub max_candidates: u32,
	pub rerank_pool: usize,
	pub max_select: usize,
	pub min_full_text_chars: usize,
	pub keywords: Vec<String>,
	pub quality: QualityWeights,
}
impl Default for AiCuration {
	fn default() -> Self {
		Self {
			category: "ai_tech".to_string(),
			lookback_days: 2,
			max_candidates: 50,
			rerank_pool: 20,
			max_select: 5,
			min_full_text_chars: 1_000,
			keywords: default_ai_keywords(),
			quality: QualityWeights::default(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
	/// Ordered from most to least prestigious; the first matching tier wins.
	pub venue_tiers: Vec<VenueTier>,
	pub preprint_marker: String,
	pub preprint_points: f64,
	pub h_index_divisor: f64,
	pub h_index_cap: f64,
	pub code_markers: Vec<String>,
	pub code_points: f64,
	pub open_access_points: f64,
	pub velocity_multiplier: f64,
	pub velocity_cap: f64,
}
impl Default for QualityWeights {
	fn default() -> Self {
		Self {
			venue_tiers: vec![
				VenueTier {
					points: 40.0,
					venues: strings(&["NeurIPS", "ICML", "ICLR", "CVPR", "ICCV", "ECCV"]),
				},
				VenueTier {
					points: 30.0,
					venues: strings(&["ACL", "EMNLP", "AAAI", "IJCAI", "CoRL", "NAACL", "SIGIR"]),
				},
				VenueTier {
					points: 20.0,
					venues: strings(&["WACV", "EACL", "COLING", "AISTATS", "UAI"]),
				},
			],
			preprint_marker: "arxiv".to_string(),
			preprint_points: 10.0,
			h_index_divisor: 5.0,
			h_index_cap: 20.0,
			code_markers: strings(&["github", "huggingface", "code available"]),
			code_points: 15.0,
			open_access_points: 10.0,
			velocity_multiplier: 5.0,
			velocity_cap: 15.0,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct VenueTier {
	pub points: f64,
	pub venues: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Schedule {
	/// UTC wall-clock time, `HH:MM`.
	pub harvest_at: String,
	/// UTC wall-clock time, `HH:MM`.
	pub select_at: String,
	/// Optional. The AI curation job only runs on a schedule when this is set.
	pub curate_ai_at: Option<String>,
	pub poll_interval_ms: u64,
}
impl Default for Schedule {
	fn default() -> Self {
		Self {
			harvest_at: "04:00".to_string(),
			select_at: "06:00".to_string(),
			curate_ai_at: None,
			poll_interval_ms: 30_000,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
	pub slug: String,
	pub display_name: String,
	pub field_ids: Vec<u32>,
	/// Optional. Falls back to `selection.default_weight`.
	pub weight: Option<f64>,
	#[serde(default = "default_true")]
	pub active: bool,
}

fn category(
	slug: &str,
	display_name: &str,
	field_ids: &[u32],
	weight: Option<f64>,
) -> CategoryConfig {
	CategoryConfig {
		slug: slug.to_string(),
		display_name: display_name.to_string(),
		field_ids: field_ids.to_vec(),
		weight,
		active: true,
	}
}

pub fn default_categories() -> Vec<CategoryConfig> {
	vec![
		category("ai_tech", "AI & Technology", &[17], Some(0.15)),
		category("health_medicine", "Health & Medicine", &[27, 36], Some(0.15)),
		category("brain_mind", "Brain & Mind", &[28, 32], Some(0.12)),
		category("climate_environment", "Climate & Environment", &[23, 19], Some(0.12)),
		category("biology", "Biology & Genetics", &[13, 24], Some(0.10)),
		category("physics", "Physics & Space", &[31], Some(0.10)),
		category("economics", "Economics & Finance", &[20], Some(0.08)),
		category("business", "Business & Management", &[14, 18], None),
		category("arts_culture", "Arts & Culture", &[12], None),
		category("food_agriculture", "Food & Agriculture", &[11], Some(0.05)),
		category("energy", "Energy & Sustainability", &[21, 15], Some(0.08)),
		category("chemistry", "Chemistry & Materials", &[16, 25], Some(0.05)),
	]
}

pub fn default_ai_keywords() -> Vec<String> {
	strings(&[
		"llm",
		"large language model",
		"gpt",
		"transformer",
		"neural network",
		"deep learning",
		"machine learning",
		"artificial intelligence",
		"bert",
		"attention mechanism",
		"diffusion model",
		"generative ai",
		"language model",
		"foundation model",
		"multimodal",
		"vision language",
		"fine-tuning",
		"fine tuning",
		"rlhf",
		"reinforcement learning",
		"prompt",
		"embedding",
		"tokenizer",
		"inference",
		"training",
		"chatbot",
		"text generation",
		"image generation",
		"code generation",
		"summarization",
		"translation",
		"sentiment",
		"classification",
		"openai",
		"anthropic",
		"claude",
		"gemini",
		"llama",
		"mistral",
		"deepseek",
		"stable diffusion",
		"midjourney",
		"agent",
		"reasoning",
		"chain of thought",
		"in-context learning",
		"few-shot",
		"zero-shot",
		"retrieval augmented",
		"rag",
	])
}

fn strings(values: &[&str]) -> Vec<String> {
	values.iter().map(|value| value.to_string()).collect()
}

fn default_works_path() -> String {
	"/works".to_string()
}

fn default_per_page_max() -> u32 {
	200
}

fn default_max_tokens() -> u32 {
	500
}

fn default_true() -> bool {
	true
}
