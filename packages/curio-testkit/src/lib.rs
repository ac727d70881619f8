//! Scratch Postgres databases for the storage tests.
//!
//! Each scratch database lives on the server named by `CURIO_PG_DSN` and is dropped when the test
//! calls [`TestDatabase::cleanup`], or on drop as a last resort.

mod error;

pub use error::{Error, Result};

use std::thread;

use sqlx::{
	ConnectOptions, Connection,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

pub const DSN_ENV: &str = "CURIO_PG_DSN";

/// Database used for CREATE and DROP statements. `template1` is tried when it is missing.
const MAINTENANCE_DATABASE: &str = "postgres";

/// The base DSN, when the environment provides a non-blank one.
pub fn env_dsn() -> Option<String> {
	std::env::var(DSN_ENV).ok().filter(|dsn| !dsn.trim().is_empty())
}

pub struct TestDatabase {
	name: String,
	dsn: String,
	maintenance: PgConnectOptions,
	dropped: bool,
}
impl TestDatabase {
	/// Creates an empty `curio_test_*` database next to the one `base_dsn` points at.
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let server: PgConnectOptions = base_dsn.parse().map_err(Error::InvalidDsn)?;
		let (maintenance, mut conn) = maintenance_connection(&server).await?;
		let name = format!("curio_test_{}", Uuid::new_v4().simple());

		sqlx::query(&format!(r#"CREATE DATABASE "{name}""#))
			.execute(&mut conn)
			.await
			.map_err(|source| Error::Create { name: name.clone(), source })?;

		let _ = conn.close().await;
		let dsn = server.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, maintenance, dropped: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub async fn cleanup(mut self) -> Result<()> {
		drop_database(&self.name, &self.maintenance).await?;

		self.dropped = true;

		Ok(())
	}
}

impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let name = std::mem::take(&mut self.name);
		let maintenance = self.maintenance.clone();

		// Drop cannot await, so the cleanup gets a private runtime.
		let handle = thread::spawn(move || {
			let runtime =
				match tokio::runtime::Builder::new_current_thread().enable_all().build() {
					Ok(runtime) => runtime,
					Err(err) => {
						eprintln!("Leaked scratch database {name}: {err}.");

						return;
					},
				};

			if let Err(err) = runtime.block_on(drop_database(&name, &maintenance)) {
				eprintln!("Leaked scratch database: {err}");
			}
		});

		let _ = handle.join();
	}
}

async fn maintenance_connection(
	server: &PgConnectOptions,
) -> Result<(PgConnectOptions, PgConnection)> {
	let primary = server.clone().database(MAINTENANCE_DATABASE);

	if let Ok(conn) = PgConnection::connect_with(&primary).await {
		return Ok((primary, conn));
	}

	let fallback = server.clone().database("template1");
	let conn =
		PgConnection::connect_with(&fallback).await.map_err(Error::NoMaintenanceDatabase)?;

	Ok((fallback, conn))
}

async fn drop_database(name: &str, maintenance: &PgConnectOptions) -> Result<()> {
	let drop_err = |source| Error::Drop { name: name.to_string(), source };
	let mut conn = PgConnection::connect_with(maintenance).await.map_err(drop_err)?;

	sqlx::query(&format!(r#"DROP DATABASE IF EXISTS "{name}" WITH (FORCE)"#))
		.execute(&mut conn)
		.await
		.map_err(drop_err)?;

	let _ = conn.close().await;

	Ok(())
}
