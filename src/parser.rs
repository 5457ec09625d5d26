//! JSON decoding for GBFS documents.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::gbfs::Envelope;

/// Parses raw bytes into a JSON document without committing to a schema.
///
/// # Errors
///
/// Returns an error if the bytes are not valid JSON.
pub fn parse_document(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).context("feed body is not valid JSON")
}

/// Decodes a GBFS document into its typed [`Envelope`].
///
/// # Errors
///
/// Returns an error if the document does not match the expected schema.
pub fn parse_feed<T: DeserializeOwned>(document: &Value) -> Result<Envelope<T>> {
    Envelope::<T>::deserialize(document).context("feed does not match the GBFS schema")
}
