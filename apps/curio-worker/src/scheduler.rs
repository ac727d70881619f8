use std::time::Duration;

use color_eyre::eyre;
use time::{Date, OffsetDateTime};

use curio_config::Schedule;
use curio_service::{CurioService, JobOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduledJob {
	Harvest,
	Select,
	CurateAi,
}
impl ScheduledJob {
	pub fn name(self) -> &'static str {
		match self {
			Self::Harvest => curio_service::HARVEST_JOB,
			Self::Select => curio_service::SELECT_JOB,
			Self::CurateAi => curio_service::CURATE_AI_JOB,
		}
	}
}

/// Fires a job once per UTC day, at the first poll after its time of day.
#[derive(Clone, Debug)]
pub struct DailyTrigger {
	pub job: ScheduledJob,
	pub hour: u8,
	pub minute: u8,
	last_fired: Option<Date>,
}
impl DailyTrigger {
	pub fn new(job: ScheduledJob, at: &str) -> color_eyre::Result<Self> {
		let (hour, minute) = curio_config::parse_time_of_day(at)
			.ok_or_else(|| eyre::eyre!("Invalid time of day {at:?} for {}.", job.name()))?;

		Ok(Self { job, hour, minute, last_fired: None })
	}

	pub fn is_due(&self, now: OffsetDateTime) -> bool {
		let reached = (now.hour(), now.minute()) >= (self.hour, self.minute);

		reached && self.last_fired != Some(now.date())
	}

	pub fn mark_fired(&mut self, today: Date) {
		self.last_fired = Some(today);
	}
}

pub fn triggers(schedule: &Schedule) -> color_eyre::Result<Vec<DailyTrigger>> {
	let mut triggers = vec![
		DailyTrigger::new(ScheduledJob::Harvest, &schedule.harvest_at)?,
		DailyTrigger::new(ScheduledJob::Select, &schedule.select_at)?,
	];

	if let Some(at) = schedule.curate_ai_at.as_deref() {
		triggers.push(DailyTrigger::new(ScheduledJob::CurateAi, at)?);
	}

	Ok(triggers)
}

/// Polls until Ctrl-C. An interrupted job leaves no run record; the run log decides on the next
/// start whether it runs again.
pub async fn run(service: &CurioService) -> color_eyre::Result<()> {
	let mut triggers = triggers(&service.cfg.schedule)?;
	let poll = Duration::from_millis(service.cfg.schedule.poll_interval_ms);
	let shutdown = tokio::signal::ctrl_c();

	tokio::pin!(shutdown);

	tracing::info!(jobs = triggers.len(), poll_ms = poll.as_millis() as u64, "Scheduler started.");

	loop {
		tokio::select! {
			signal = &mut shutdown => {
				signal?;

				tracing::info!("Shutdown signal received. Scheduler stopping.");

				return Ok(());
			},
			_ = tick(service, &mut triggers, poll) => {},
		}
	}
}

async fn tick(service: &CurioService, triggers: &mut [DailyTrigger], poll: Duration) {
	tokio::time::sleep(poll).await;

	let now = OffsetDateTime::now_utc();

	for trigger in triggers.iter_mut().filter(|trigger| trigger.is_due(now)) {
		trigger.mark_fired(now.date());

		fire(service, trigger.job, now.date()).await;
	}
}

async fn fire(service: &CurioService, job: ScheduledJob, run_date: Date) {
	let options = JobOptions { run_date, dry_run: false, force: false };
	let result = match job {
		ScheduledJob::Harvest => service.harvest(options).await,
		ScheduledJob::Select => service.select(options, None).await,
		ScheduledJob::CurateAi => service.curate_ai(options).await,
	};

	match result {
		Ok(outcome) => {
			tracing::info!(job = job.name(), status = %outcome.status, "Scheduled job finished.");
		},
		Err(err) => {
			tracing::error!(job = job.name(), error = %err, "Scheduled job failed.");
		},
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn fires_once_per_day_after_its_time() {
		let mut trigger =
			DailyTrigger::new(ScheduledJob::Harvest, "04:00").expect("Expected a valid trigger.");

		assert!(!trigger.is_due(datetime!(2026-10-15 03:59 UTC)));
		assert!(trigger.is_due(datetime!(2026-10-15 04:00 UTC)));
		assert!(trigger.is_due(datetime!(2026-10-15 13:30 UTC)));

		trigger.mark_fired(datetime!(2026-10-15 04:00 UTC).date());

		assert!(!trigger.is_due(datetime!(2026-10-15 23:59 UTC)));
		assert!(!trigger.is_due(datetime!(2026-10-16 03:00 UTC)));
		assert!(trigger.is_due(datetime!(2026-10-16 04:01 UTC)));
	}

	#[test]
	fn curation_trigger_is_optional() {
		let mut schedule = Schedule::default();

		assert_eq!(triggers(&schedule).expect("Expected triggers.").len(), 2);

		schedule.curate_ai_at = Some("05:30".to_string());

		let jobs: Vec<ScheduledJob> = triggers(&schedule)
			.expect("Expected triggers.")
			.into_iter()
			.map(|trigger| trigger.job)
			.collect();

		assert_eq!(jobs, vec![ScheduledJob::Harvest, ScheduledJob::Select, ScheduledJob::CurateAi]);
	}

	#[test]
	fn rejects_malformed_times() {
		assert!(DailyTrigger::new(ScheduledJob::Select, "6am").is_err());
	}
}
