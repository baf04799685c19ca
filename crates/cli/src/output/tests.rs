use serde_json::{Value, json};

use super::*;

#[test]
fn result_builder_success() {
	let result: CommandResult<Value> = ResultBuilder::new("call")
		.method("project::greet")
		.data(json!("Hello, John Doe!"))
		.build();

	assert!(result.ok);
	assert_eq!(result.command, "call");
	assert_eq!(result.method.as_deref(), Some("project::greet"));
	assert!(result.error.is_none());
	assert!(result.timings.is_some());
}

#[test]
fn result_builder_error() {
	let result: CommandResult<Value> = ResultBuilder::new("call")
		.error(CommandError {
			code: ErrorCode::InvalidMethod,
			message: "unknown method".into(),
			details: None,
		})
		.build();

	assert!(!result.ok);
	assert!(result.data.is_none());
	assert_eq!(result.error.as_ref().unwrap().code, ErrorCode::InvalidMethod);
}

#[test]
fn json_envelope_shape() {
	let result: CommandResult<Value> = ResultBuilder::new("call").data(json!([1, 2, 3])).build();
	let value: Value = serde_json::from_str(&render_result(&result, OutputFormat::Json)).unwrap();

	assert_eq!(value["schemaVersion"], json!(SCHEMA_VERSION));
	assert_eq!(value["ok"], json!(true));
	assert_eq!(value["data"], json!([1, 2, 3]));
	assert!(value["timings"]["durationMs"].is_u64());
	assert!(value.get("error").is_none());
	assert!(value.get("method").is_none());
}

#[test]
fn error_code_serializes_screaming_snake() {
	let json = serde_json::to_value(ErrorCode::InvalidArgument).unwrap();
	assert_eq!(json, json!("INVALID_ARGUMENT"));
	assert_eq!(ErrorCode::InvalidArgument.to_string(), "INVALID_ARGUMENT");
}

#[test]
fn text_prints_strings_bare() {
	let result: CommandResult<Value> = ResultBuilder::new("call").data(json!("Hello, world!")).build();
	assert_eq!(render_result(&result, OutputFormat::Text), "Hello, world!");
}

#[test]
fn text_pretty_prints_structures() {
	let result: CommandResult<Value> = ResultBuilder::new("call").data(json!({"a": 1})).build();
	assert_eq!(render_result(&result, OutputFormat::Text), "{\n  \"a\": 1\n}");
}

#[test]
fn text_null_result() {
	let result: CommandResult<Value> = ResultBuilder::new("call").data(Value::Null).build();
	assert_eq!(render_result(&result, OutputFormat::Text), "null");
}

#[test]
fn kinds_map_to_codes() {
	assert_eq!(ErrorCode::from_kind(ErrorKind::Connection, false), ErrorCode::ConnectionFailed);
	assert_eq!(ErrorCode::from_kind(ErrorKind::Connection, true), ErrorCode::Timeout);
	assert_eq!(ErrorCode::from_kind(ErrorKind::InvalidMethod, false), ErrorCode::InvalidMethod);
	assert_eq!(ErrorCode::from_kind(ErrorKind::Argument, false), ErrorCode::InvalidArgument);
	assert_eq!(ErrorCode::from_kind(ErrorKind::RemoteExecution, false), ErrorCode::RemoteError);
}

#[test]
fn display_matches_serialized_code() {
	for code in [
		ErrorCode::ConnectionFailed,
		ErrorCode::Timeout,
		ErrorCode::InvalidMethod,
		ErrorCode::InvalidArgument,
		ErrorCode::RemoteError,
		ErrorCode::InternalError,
	] {
		assert_eq!(serde_json::to_value(code).unwrap(), json!(code.to_string()));
	}
}
