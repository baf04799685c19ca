//! Turning command-line words into call arguments.

use serde_json::Value;

/// Parses one positional argument.
///
/// Valid JSON is taken as-is, so `42`, `true`, `null`, `"quoted"` and
/// `[1,2]` keep their types. Anything else becomes a JSON string.
pub fn parse_arg(raw: &str) -> Value {
	serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn parse_args<S: AsRef<str>>(raw: &[S]) -> Vec<Value> {
	raw.iter().map(|arg| parse_arg(arg.as_ref())).collect()
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn json_literals_keep_their_type() {
		assert_eq!(parse_arg("42"), json!(42));
		assert_eq!(parse_arg("-1.5"), json!(-1.5));
		assert_eq!(parse_arg("true"), json!(true));
		assert_eq!(parse_arg("null"), Value::Null);
		assert_eq!(parse_arg(r#"{"a":[1,2]}"#), json!({"a": [1, 2]}));
	}

	#[test]
	fn bare_words_become_strings() {
		assert_eq!(parse_arg("John"), json!("John"));
		assert_eq!(parse_arg("John Doe"), json!("John Doe"));
		assert_eq!(parse_arg(""), json!(""));
	}

	#[test]
	fn quoted_json_string_is_unwrapped() {
		assert_eq!(parse_arg(r#""42""#), json!("42"));
	}

	#[test]
	fn truncated_json_falls_back_to_string() {
		assert_eq!(parse_arg("[1, 2"), json!("[1, 2"));
	}

	#[test]
	fn order_is_preserved() {
		assert_eq!(parse_args(&["John", "Doe", "3"]), vec![json!("John"), json!("Doe"), json!(3)]);
	}
}
