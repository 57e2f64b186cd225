//! Envelope unwrapping

use super::dates::normalize_dates;
use crate::error::{Error, Result};
use crate::types::{JsonValue, Page};
use tracing::debug;

/// Decode a response body into the records under `resource`.
///
/// A body that is not valid JSON is a malformed response. An envelope
/// without the resource key yields an empty page.
pub fn decode_page(body: &str, resource: &str) -> Result<Page> {
    let mut value: JsonValue =
        serde_json::from_str(body).map_err(|e| Error::malformed(resource, e.to_string()))?;

    let JsonValue::Object(envelope) = &mut value else {
        return Err(Error::malformed(resource, "response body is not a JSON object"));
    };

    let Some(mut records) = envelope.remove(resource) else {
        debug!(resource, "Response envelope has no records key");
        return Ok(Vec::new());
    };

    normalize_dates(&mut records);

    match records {
        JsonValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                JsonValue::Object(record) => Ok(record),
                other => Err(Error::malformed(
                    resource,
                    format!("expected record object, found {other}"),
                )),
            })
            .collect(),
        JsonValue::Null => Ok(Vec::new()),
        other => Err(Error::malformed(
            resource,
            format!("expected record array, found {other}"),
        )),
    }
}
