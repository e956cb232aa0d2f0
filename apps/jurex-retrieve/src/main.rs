use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = jurex_retrieve::Args::parse();

	jurex_retrieve::run(args).await
}
