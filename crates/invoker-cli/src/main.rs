//! Command-line front end for the contract invoker.
//!
//! Every invoker operation is exposed as a subcommand. Results are printed to
//! stdout as JSON; logs go to stderr.

use clap::Parser;
use std::path::PathBuf;

mod commands;

use commands::Command;

/// Command-line arguments for the invoker.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "invoker.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "warn")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let output = commands::execute(&args.config, args.command).await?;
	println!("{}", serde_json::to_string_pretty(&output)?);

	Ok(())
}
