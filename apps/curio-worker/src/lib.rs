pub mod scheduler;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use time::{Date, OffsetDateTime, macros::format_description};
use tracing_subscriber::EnvFilter;

use curio_service::{CurioService, JobOptions, RunOutcome};
use curio_storage::{db::Db, models::RunRecord};

const ERROR_DISPLAY_CHARS: usize = 500;

#[derive(Debug, Parser)]
#[command(
	version = curio_cli::VERSION,
	rename_all = "kebab",
	styles = curio_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Run the daily scheduler until interrupted.
	Serve,
	/// Harvest every active category now.
	Harvest(JobArgs),
	/// Draw and produce the next episode now.
	Select {
		#[command(flatten)]
		job: JobArgs,
		/// Seed for the weighted draws. A random seed is used and recorded when omitted.
		#[arg(long)]
		seed: Option<u64>,
	},
	/// Run the AI category curation now.
	CurateAi(JobArgs),
	/// List recent run records.
	Runs {
		#[arg(long, default_value_t = 20)]
		limit: i64,
		#[arg(long)]
		job: Option<String>,
	},
}

#[derive(Debug, clap::Args)]
pub struct JobArgs {
	/// Run every stage but skip writes and the production hand-off.
	#[arg(long)]
	pub dry_run: bool,
	/// Run even if this date already completed.
	#[arg(long)]
	pub force: bool,
	/// Logical run date. Defaults to today in UTC.
	#[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
	pub date: Option<Date>,
}
impl JobArgs {
	pub fn options(&self) -> JobOptions {
		JobOptions {
			run_date: self.date.unwrap_or_else(|| OffsetDateTime::now_utc().date()),
			dry_run: self.dry_run,
			force: self.force,
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = curio_config::load(&args.config)?;

	init_tracing(&config);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let service = CurioService::new(config, db);

	match args.command {
		Command::Serve => scheduler::run(&service).await,
		Command::Harvest(job) => print_outcome(&service.harvest(job.options()).await?),
		Command::Select { job, seed } => {
			print_outcome(&service.select(job.options(), seed).await?)
		},
		Command::CurateAi(job) => print_outcome(&service.curate_ai(job.options()).await?),
		Command::Runs { limit, job } => {
			for record in service.recent_runs(job.as_deref(), limit).await? {
				println!("{}", format_run(&record));
			}

			Ok(())
		},
	}
}

fn init_tracing(config: &curio_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_outcome(outcome: &RunOutcome) -> color_eyre::Result<()> {
	let rendered = serde_json::json!({
		"status": outcome.status.as_str(),
		"result": outcome.result,
	});

	println!("{}", serde_json::to_string_pretty(&rendered)?);

	Ok(())
}

/// One line per run, followed by the error detail cut to a readable length.
pub fn format_run(record: &RunRecord) -> String {
	let mut line = format!(
		"{} {} {} {} {}ms",
		record.run_date,
		record.started_at,
		record.job_name,
		record.status,
		record.duration_ms
	);

	if let Some(detail) = record.error_detail.as_deref() {
		let mut shown: String = detail.chars().take(ERROR_DISPLAY_CHARS).collect();

		if detail.chars().count() > ERROR_DISPLAY_CHARS {
			shown.push_str("...");
		}

		line.push_str("\n  ");
		line.push_str(&shown.replace('\n', "\n  "));
	}

	line
}

fn parse_date(raw: &str) -> Result<Date, String> {
	Date::parse(raw, format_description!("[year]-[month]-[day]"))
		.map_err(|_| format!("Expected a YYYY-MM-DD date, got {raw:?}."))
}
