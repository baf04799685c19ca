use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Default filter for a `-v` count. `RUST_LOG` overrides it.
pub fn default_filter(verbosity: u8) -> &'static str {
	// 0 = errors only, runtime frame traffic off
	// 1 (-v) = info for the session, warn for the runtime
	// 2+ (-vv) = debug for everything
	match verbosity {
		0 => "error,rcall_runtime=off",
		1 => "info,rcall_runtime=warn",
		_ => "debug",
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filters_parse() {
		for verbosity in 0..=3 {
			assert!(EnvFilter::try_new(default_filter(verbosity)).is_ok());
		}
	}

	#[test]
	fn verbosity_widens_filter() {
		assert!(default_filter(0).starts_with("error"));
		assert!(default_filter(1).starts_with("info"));
		assert_eq!(default_filter(2), "debug");
		assert_eq!(default_filter(9), "debug");
	}
}
