//! Error type shared by the samplers, the document layer and data loading.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by sampling, document parsing and reference data loading.
///
/// Every variant is local to the call that produced it: samplers hold no
/// mutable state, so an error never leaves a sampler in a degraded state.
#[derive(Debug, Error)]
pub enum Error {
	/// The pool has no selectable item once exclusions and zero weights are removed.
	#[error("sampling pool is empty")]
	EmptyPool,

	/// More unique draws were requested than the pool can provide, or zero
	/// items were requested where at least one is required.
	#[error("invalid count: requested {requested}, available {available}")]
	InvalidCount {
		/// Number of items requested.
		requested: usize,
		/// Number of selectable items.
		available: usize,
	},

	/// A filter matched nothing in the loaded reference data.
	#[error("no match for {0}")]
	NoMatch(String),

	/// The requested time period has no name entries.
	#[error("no names available for time period '{0}'")]
	InvalidTimePeriod(String),

	/// A document number could not be parsed into its digits.
	#[error("malformed {kind} input '{input}': {reason}")]
	MalformedInput {
		/// Document kind being parsed.
		kind: &'static str,
		/// The raw input.
		input: String,
		/// Why it was rejected.
		reason: String,
	},

	/// A weight was negative, NaN or infinite.
	#[error("invalid weight {weight} for '{item}'")]
	InvalidWeight {
		/// Debug rendering of the offending item.
		item: String,
		/// The rejected weight.
		weight: f64,
	},

	/// Reference data violates an invariant (unknown state code, bad CEP range...).
	#[error("invalid reference data: {0}")]
	InvalidData(String),

	/// Reading or writing a reference data file failed.
	#[error("I/O error on '{path}': {source}")]
	Io {
		/// File being accessed.
		path: PathBuf,
		/// Underlying I/O error.
		#[source]
		source: std::io::Error,
	},

	/// A JSON reference document could not be decoded.
	#[error("failed to parse {origin}: {source}")]
	Json {
		/// File name or description of the document being parsed.
		origin: String,
		/// Underlying decoder error.
		#[source]
		source: serde_json::Error,
	},

	/// The postcard snapshot could not be encoded or decoded.
	#[error("snapshot error: {0}")]
	Snapshot(#[from] postcard::Error),
}

impl Error {
	pub(crate) fn malformed(kind: &'static str, input: &str, reason: impl Into<String>) -> Self {
		Self::MalformedInput {
			kind,
			input: input.to_owned(),
			reason: reason.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn invalid_count_formats_correctly() {
		let err = Error::InvalidCount { requested: 5, available: 3 };
		assert_eq!(err.to_string(), "invalid count: requested 5, available 3");
	}

	#[test]
	fn malformed_input_formats_correctly() {
		let err = Error::malformed("CPF", "12a", "unexpected character 'a'");
		assert_eq!(err.to_string(), "malformed CPF input '12a': unexpected character 'a'");
	}

	#[test]
	fn invalid_time_period_formats_correctly() {
		let err = Error::InvalidTimePeriod("until_1920".to_owned());
		assert_eq!(err.to_string(), "no names available for time period 'until_1920'");
	}
}
