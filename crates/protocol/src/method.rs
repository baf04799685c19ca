//! Remote method names.
//!
//! Methods are addressed as `<namespace>::<function>`. The namespace may be
//! nested (`runtime::Runtime::abi`), but there is always at least one `::`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Separator between namespace segments and the function name.
pub const METHOD_SEPARATOR: &str = "::";

/// Why a method name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MethodNameError {
	#[error("method name is empty")]
	Empty,

	#[error("method name '{0}' has no namespace (expected '<namespace>::<function>')")]
	MissingNamespace(String),

	#[error("method name '{name}' has an invalid segment '{segment}'")]
	InvalidSegment { name: String, segment: String },
}

/// A validated `<namespace>::<function>` method name.
///
/// The original string is kept verbatim and sent to the server unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodName(String);

impl MethodName {
	/// Parses and validates a method name.
	pub fn parse(name: &str) -> Result<Self, MethodNameError> {
		if name.is_empty() {
			return Err(MethodNameError::Empty);
		}
		if !name.contains(METHOD_SEPARATOR) {
			return Err(MethodNameError::MissingNamespace(name.to_string()));
		}
		for segment in name.split(METHOD_SEPARATOR) {
			if !is_identifier(segment) {
				return Err(MethodNameError::InvalidSegment {
					name: name.to_string(),
					segment: segment.to_string(),
				});
			}
		}
		Ok(Self(name.to_string()))
	}

	/// Everything before the last `::`.
	pub fn namespace(&self) -> &str {
		self.0.rsplit_once(METHOD_SEPARATOR).map(|(ns, _)| ns).unwrap_or_default()
	}

	/// The segment after the last `::`.
	pub fn function(&self) -> &str {
		self.0.rsplit_once(METHOD_SEPARATOR).map(|(_, f)| f).unwrap_or(&self.0)
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

fn is_identifier(segment: &str) -> bool {
	let mut chars = segment.chars();
	match chars.next() {
		Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
		_ => return false,
	}
	chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for MethodName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for MethodName {
	type Err = MethodNameError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl TryFrom<&str> for MethodName {
	type Error = MethodNameError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

impl AsRef<str> for MethodName {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl Serialize for MethodName {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for MethodName {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		Self::parse(&raw).map_err(serde::de::Error::custom)
	}
}
