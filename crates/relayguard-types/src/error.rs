//! Error Types
//!
//! A rejection is never an error: evaluators return `Ok(Verdict::Deny(..))` for
//! ordinary policy outcomes. `Error` covers fatal configuration problems at
//! construction time and genuine operational failures at evaluation time.

use std::fmt;

pub type RgResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// Configuration that cannot be used safely; construction is aborted
	ConfigError(String),
	/// The content classifier could not produce an answer
	ClassifierUnavailable(String),
	/// Event could not be (de)serialized
	Serialization(String),
	Internal(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::ConfigError(msg) => write!(f, "invalid configuration: {}", msg),
			Error::ClassifierUnavailable(msg) => write!(f, "classifier unavailable: {}", msg),
			Error::Serialization(msg) => write!(f, "serialization error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
	fn from(e: serde_json::Error) -> Self {
		Error::Serialization(e.to_string())
	}
}

/// A recoverable configuration anomaly.
///
/// The offending item is ignored and construction proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning(pub String);

impl ConfigWarning {
	pub fn new(msg: impl Into<String>) -> Self {
		Self(msg.into())
	}
}

impl fmt::Display for ConfigWarning {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.0)
	}
}


// vim: ts=4
