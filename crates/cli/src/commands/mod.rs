pub mod call;
pub mod ping;

use std::time::Duration;

use rcall::SessionConfig;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use crate::output::{self, ResultBuilder};

/// Session settings derived from global flags.
pub fn session_config(cli: &Cli) -> SessionConfig {
	let call_timeout = match cli.timeout_ms {
		0 => None,
		ms => Some(Duration::from_millis(ms)),
	};
	SessionConfig::new(cli.endpoint.clone())
		.with_call_timeout(call_timeout)
		.with_client_name(concat!("rcall-cli/", env!("CARGO_PKG_VERSION")))
}

/// Runs the selected command and prints its result.
pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = session_config(&cli);
	let format = cli.format;

	match cli.command {
		Commands::Call(args) => {
			let builder = ResultBuilder::new("call").method(args.method.clone());
			let value = call::run(config, &args).await?;
			output::print_result(&builder.data(value).build(), format);
		}
		Commands::Ping => {
			let builder = ResultBuilder::new("ping");
			let info = ping::run(config).await?;
			output::print_result(&builder.data(info).build(), format);
		}
	}
	Ok(())
}
