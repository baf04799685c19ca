use clap::{Args, Parser, Subcommand};
use rcall::Endpoint;

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "rcall")]
#[command(about = "Call methods on a remote compute service")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Service endpoint (tcp://, http://, ws://, wss:// or host:port)
	#[arg(
		short,
		long,
		global = true,
		env = "RCALL_ENDPOINT",
		value_name = "URL",
		default_value = "tcp://127.0.0.1:8080"
	)]
	pub endpoint: Endpoint,

	/// Per-call timeout in milliseconds (0 waits indefinitely)
	#[arg(short, long, global = true, value_name = "MS", default_value_t = 30_000)]
	pub timeout_ms: u64,

	/// Output format: text (default) or json
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Invoke a method and print its result
	Call(CallArgs),

	/// Connect, print what the server reports about itself, and disconnect
	Ping,
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Call(_) => "call",
			Commands::Ping => "ping",
		}
	}
}

#[derive(Args, Debug)]
pub struct CallArgs {
	/// Fully qualified method name, e.g. project::greet
	pub method: String,

	/// Positional arguments; each is parsed as JSON, or taken as a string
	#[arg(allow_negative_numbers = true)]
	pub args: Vec<String>,
}
