//! Permissive decoding of catalog payloads.

use serde::de::DeserializeOwned;
use tracing::debug;

/// Decode a JSON array, dropping elements that fail to decode.
///
/// Returns an error only when the payload itself is not a JSON array. A damaged element never
/// invalidates the rest of the array.
pub fn decode_optional_array<T: DeserializeOwned>(data: &[u8]) -> Result<Vec<T>, serde_json::Error> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(data)?;
    let total = values.len();

    let decoded: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!("Dropping catalog element {}: {}", index, e);
                None
            }
        })
        .collect();

    if decoded.len() < total {
        debug!(
            "Decoded {} of {} catalog elements",
            decoded.len(),
            total
        );
    }

    Ok(decoded)
}

/// Decode a JSON array permissively, treating an undecodable payload as empty.
pub fn decode_valid_objects<T: DeserializeOwned>(data: &[u8]) -> Vec<T> {
    decode_optional_array(data).unwrap_or_default()
}
