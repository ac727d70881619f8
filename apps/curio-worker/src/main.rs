use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = curio_worker::Args::parse();

	curio_worker::run(args).await
}
