use serde_json::json;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = anyhow::Result<T>;

/// Converts a command failure into structured output.
///
/// Session errors anywhere in the context chain keep their kind; anything
/// else is internal. The message includes the whole chain.
pub fn to_command_error(err: &anyhow::Error) -> CommandError {
	let message = format!("{err:#}");

	let Some(rpc) = err.chain().find_map(|cause| cause.downcast_ref::<rcall::Error>()) else {
		return CommandError {
			code: ErrorCode::InternalError,
			message,
			details: None,
		};
	};

	let code = ErrorCode::from_kind(rpc.kind(), rpc.is_timeout());
	let details = rpc.error_name().map(|name| {
		json!({
			"name": name,
			"stack": rpc.stack_trace(),
		})
	});

	CommandError { code, message, details }
}

#[cfg(test)]
mod tests {
	use anyhow::Context;

	use super::*;

	fn remote(name: &str, stack: Option<&str>) -> rcall::Error {
		rcall::Error::Remote {
			name: name.to_string(),
			message: "boom".to_string(),
			stack: stack.map(str::to_string),
		}
	}

	#[test]
	fn context_is_kept_in_message() {
		let err = Err::<(), _>(rcall::Error::ConnectionClosed)
			.context("calling project::helloWorld")
			.unwrap_err();
		let cmd = to_command_error(&err);

		assert_eq!(cmd.code, ErrorCode::ConnectionFailed);
		assert_eq!(cmd.message, "calling project::helloWorld: Connection closed");
	}

	#[test]
	fn remote_error_carries_details() {
		let err = anyhow::Error::new(remote("RuntimeError", Some("at main")));
		let cmd = to_command_error(&err);

		assert_eq!(cmd.code, ErrorCode::RemoteError);
		let details = cmd.details.unwrap();
		assert_eq!(details["name"], "RuntimeError");
		assert_eq!(details["stack"], "at main");
	}

	#[test]
	fn remote_names_select_code() {
		let cmd = to_command_error(&anyhow::Error::new(remote("InvalidMethodError", None)));
		assert_eq!(cmd.code, ErrorCode::InvalidMethod);

		let cmd = to_command_error(&anyhow::Error::new(remote("ArgumentError", None)));
		assert_eq!(cmd.code, ErrorCode::InvalidArgument);
	}

	#[test]
	fn timeout_has_its_own_code() {
		let err = anyhow::Error::new(rcall::Error::Timeout("too slow".into()));
		assert_eq!(to_command_error(&err).code, ErrorCode::Timeout);
	}

	#[test]
	fn foreign_errors_are_internal() {
		let err = anyhow::anyhow!("stdout closed");
		let cmd = to_command_error(&err);
		assert_eq!(cmd.code, ErrorCode::InternalError);
		assert!(cmd.details.is_none());
	}
}
