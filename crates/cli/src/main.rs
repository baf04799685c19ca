use clap::Parser;
use rcall_cli::{
	cli::Cli,
	commands, error, logging,
	output::{self, OutputFormat, ResultBuilder},
};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli).await {
		handle_error(&err, command, format);
		std::process::exit(1);
	}
}

fn handle_error(err: &anyhow::Error, command: &str, format: OutputFormat) {
	let cmd_error = error::to_command_error(err);

	// Always print to stderr for humans
	output::print_error_stderr(&cmd_error);

	// Scripts reading JSON still get an envelope with ok=false
	if format == OutputFormat::Json {
		let result: output::CommandResult<()> = ResultBuilder::new(command).error(cmd_error).build();
		output::print_result(&result, format);
	}
}
