//! Streaming decoder for the toolchain's JSON-stream protocol (spec.md §6).
//!
//! `go mod download -json` and `go list -json` emit concatenated JSON objects,
//! not a JSON array. `serde_json::Deserializer::into_iter` already streams
//! whitespace-separated values without buffering the whole input into one
//! string, and surfaces a truncated trailing object as an `Err` rather than
//! silently dropping it, so we lean on it directly instead of hand-rolling a
//! brace-counting scanner.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Parse a sequence of concatenated JSON objects into `T`s.
///
/// Fails fatally (spec.md §6: "reject mid-object truncation as a fatal
/// error") on the first malformed or truncated object.
pub fn parse_concatenated<T: DeserializeOwned>(input: &str) -> Result<Vec<T>> {
    serde_json::Deserializer::from_str(input)
        .into_iter::<T>()
        .collect::<std::result::Result<Vec<T>, serde_json::Error>>()
        .map_err(Error::Json)
}
