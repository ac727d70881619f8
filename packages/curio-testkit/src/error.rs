pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid Postgres DSN: {0}.")]
	InvalidDsn(sqlx::Error),
	#[error("No maintenance database reachable on the test server: {0}.")]
	NoMaintenanceDatabase(sqlx::Error),
	#[error("Scratch database {name} could not be created: {source}.")]
	Create { name: String, source: sqlx::Error },
	#[error("Scratch database {name} could not be dropped: {source}.")]
	Drop { name: String, source: sqlx::Error },
}
