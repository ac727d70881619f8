pub mod curate_ai;
pub mod harvest;
pub mod ingest;
pub mod rerank;
pub mod runs;
pub mod select;

mod error;

pub use error::{Error, Result};
pub use harvest::{BranchStatus, CategoryOutcome};
pub use ingest::IngestReport;
pub use rerank::{FallbackReason, RankingOutcome};
pub use runs::{CURATE_AI_JOB, HARVEST_JOB, JobOptions, RunOutcome, RunStatus, SELECT_JOB};

use std::{collections::HashSet, future::Future, pin::Pin, sync::Arc};

use time::Date;
use uuid::Uuid;

use curio_config::{Config, LlmProviderConfig, MetadataProviderConfig, ProviderConfig};
use curio_domain::{
	categories::CategoryTable,
	work::{Candidate, RawWork},
};
use curio_providers::{
	fulltext,
	openalex::{self, WorksQuery},
	producer::{self, EpisodeItem},
	ranker::{self, RankItem},
};
use curio_storage::{db::Db, models::RunRecord, queries};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait CandidateStore
where
	Self: Send + Sync,
{
	fn existing_source_ids<'a>(
		&'a self,
		source_ids: &'a [String],
	) -> BoxFuture<'a, Result<HashSet<String>>>;

	/// Stores every new candidate in one commit. Returns how many rows were written.
	fn insert_candidates<'a>(&'a self, candidates: &'a [Candidate]) -> BoxFuture<'a, Result<u64>>;

	fn upsert_curated<'a>(&'a self, candidate: &'a Candidate) -> BoxFuture<'a, Result<Uuid>>;

	fn list_unconsumed_selected(&self) -> BoxFuture<'_, Result<Vec<Candidate>>>;

	fn mark_consumed<'a>(
		&'a self,
		candidate_ids: &'a [Uuid],
		consumed_by: &'a str,
	) -> BoxFuture<'a, Result<u64>>;
}

pub trait RunLog
where
	Self: Send + Sync,
{
	fn append<'a>(&'a self, record: &'a RunRecord) -> BoxFuture<'a, Result<()>>;

	/// Newest record for `(job_name, run_date)` whose status is one of `statuses` and that
	/// carries a result.
	fn latest_completed<'a>(
		&'a self,
		job_name: &'a str,
		run_date: Date,
		statuses: &'a [RunStatus],
	) -> BoxFuture<'a, Result<Option<RunRecord>>>;

	fn recent<'a>(
		&'a self,
		job_name: Option<&'a str>,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<RunRecord>>>;
}

pub trait MetadataSource
where
	Self: Send + Sync,
{
	fn fetch_works<'a>(
		&'a self,
		cfg: &'a MetadataProviderConfig,
		query: &'a WorksQuery,
	) -> BoxFuture<'a, Result<Vec<RawWork>>>;
}

pub trait RankingProvider
where
	Self: Send + Sync,
{
	/// Returns the raw answer text. Parsing happens in the rerank adapter.
	fn rank<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		items: &'a [RankItem],
		max_select: usize,
	) -> BoxFuture<'a, Result<String>>;
}

pub trait EpisodeProducer
where
	Self: Send + Sync,
{
	fn produce<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		items: &'a [EpisodeItem],
	) -> BoxFuture<'a, Result<String>>;
}

pub trait FullTextSource
where
	Self: Send + Sync,
{
	fn extract_text<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		url: &'a str,
	) -> BoxFuture<'a, Result<Option<String>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub metadata: Arc<dyn MetadataSource>,
	pub ranker: Arc<dyn RankingProvider>,
	pub producer: Arc<dyn EpisodeProducer>,
	pub full_text: Arc<dyn FullTextSource>,
}
impl Providers {
	pub fn new(
		metadata: Arc<dyn MetadataSource>,
		ranker: Arc<dyn RankingProvider>,
		producer: Arc<dyn EpisodeProducer>,
		full_text: Arc<dyn FullTextSource>,
	) -> Self {
		Self { metadata, ranker, producer, full_text }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			metadata: provider.clone(),
			ranker: provider.clone(),
			producer: provider.clone(),
			full_text: provider,
		}
	}
}

/// Postgres-backed candidate store and run log.
pub struct PgStore {
	pub db: Db,
}
impl PgStore {
	pub fn new(db: Db) -> Self {
		Self { db }
	}
}

impl CandidateStore for PgStore {
	fn existing_source_ids<'a>(
		&'a self,
		source_ids: &'a [String],
	) -> BoxFuture<'a, Result<HashSet<String>>> {
		Box::pin(async move { Ok(queries::existing_source_ids(&self.db.pool, source_ids).await?) })
	}

	fn insert_candidates<'a>(&'a self, candidates: &'a [Candidate]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(queries::insert_candidates(&self.db, candidates).await?) })
	}

	fn upsert_curated<'a>(&'a self, candidate: &'a Candidate) -> BoxFuture<'a, Result<Uuid>> {
		Box::pin(async move { Ok(queries::upsert_curated(&self.db.pool, candidate).await?) })
	}

	fn list_unconsumed_selected(&self) -> BoxFuture<'_, Result<Vec<Candidate>>> {
		Box::pin(async move { Ok(queries::list_unconsumed_selected(&self.db.pool).await?) })
	}

	fn mark_consumed<'a>(
		&'a self,
		candidate_ids: &'a [Uuid],
		consumed_by: &'a str,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			Ok(queries::mark_consumed(&self.db.pool, candidate_ids, consumed_by).await?)
		})
	}
}

impl RunLog for PgStore {
	fn append<'a>(&'a self, record: &'a RunRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(queries::insert_run_record(&self.db.pool, record).await?) })
	}

	fn latest_completed<'a>(
		&'a self,
		job_name: &'a str,
		run_date: Date,
		statuses: &'a [RunStatus],
	) -> BoxFuture<'a, Result<Option<RunRecord>>> {
		Box::pin(async move {
			Ok(queries::latest_completed_run(&self.db.pool, job_name, run_date, statuses).await?)
		})
	}

	fn recent<'a>(
		&'a self,
		job_name: Option<&'a str>,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<RunRecord>>> {
		Box::pin(async move { Ok(queries::list_runs(&self.db.pool, job_name, limit).await?) })
	}
}

struct DefaultProviders;

impl MetadataSource for DefaultProviders {
	fn fetch_works<'a>(
		&'a self,
		cfg: &'a MetadataProviderConfig,
		query: &'a WorksQuery,
	) -> BoxFuture<'a, Result<Vec<RawWork>>> {
		Box::pin(async move { Ok(openalex::fetch_works(cfg, query).await?) })
	}
}

impl RankingProvider for DefaultProviders {
	fn rank<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		items: &'a [RankItem],
		max_select: usize,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(ranker::rank(cfg, items, max_select).await?) })
	}
}

impl EpisodeProducer for DefaultProviders {
	fn produce<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		items: &'a [EpisodeItem],
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			producer::produce(cfg, items)
				.await
				.map_err(|err| Error::Production { message: err.to_string() })
		})
	}
}

impl FullTextSource for DefaultProviders {
	fn extract_text<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		url: &'a str,
	) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(async move { Ok(fulltext::extract_text(cfg, url).await?) })
	}
}

pub struct CurioService {
	pub cfg: Config,
	pub categories: CategoryTable,
	pub store: Arc<dyn CandidateStore>,
	pub runs: Arc<dyn RunLog>,
	pub providers: Providers,
}
impl CurioService {
	pub fn new(cfg: Config, db: Db) -> Self {
		let store = Arc::new(PgStore::new(db));

		Self::with_parts(cfg, store.clone(), store, Providers::default())
	}

	pub fn with_parts(
		cfg: Config,
		store: Arc<dyn CandidateStore>,
		runs: Arc<dyn RunLog>,
		providers: Providers,
	) -> Self {
		let categories = CategoryTable::from_config(&cfg);

		Self { cfg, categories, store, runs, providers }
	}

	/// Most recent run records, newest first.
	pub async fn recent_runs(&self, job_name: Option<&str>, limit: i64) -> Result<Vec<RunRecord>> {
		self.runs.recent(job_name, limit).await
	}
}
