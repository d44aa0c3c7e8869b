//! Live update stream in `text/event-stream` framing

mod streamer;

pub use streamer::{Sample, UpdateStreamer};

use bytes::Bytes;
use serde::Serialize;

/// Replace line breaks so a name cannot break event framing
pub fn sanitize_event_name(name: &str) -> String {
    name.replace(['\n', '\r'], " ")
}

/// Encode one event as `event: <name>\ndata: <json>\n\n`.
///
/// The payload is compact JSON. Equal inputs encode to identical bytes.
pub fn encode_event<T: Serialize + ?Sized>(name: &str, payload: &T) -> serde_json::Result<Bytes> {
    let data = serde_json::to_string(payload)?;
    let name = sanitize_event_name(name);

    let mut frame = String::with_capacity(name.len() + data.len() + 16);
    frame.push_str("event: ");
    frame.push_str(&name);
    frame.push('\n');
    frame.push_str("data: ");
    frame.push_str(&data);
    frame.push_str("\n\n");
    Ok(Bytes::from(frame))
}
