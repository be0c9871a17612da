//! Vehicle telemetry display
//!
//! Status messages are JSON objects with optional `speed`, `battery` and
//! `statu` fields. Anything that is not a JSON object is kept verbatim and
//! shown as-is; a bad payload is never an error. Other JSON values (`42`,
//! `"x"`, `[1]`) carry none of the fields, so they blank the display;
//! unparseable text and `null` leave it alone.

use serde_json::{Map, Value};

/// Shown for fields the vehicle did not report
pub const PLACEHOLDER: &str = "—";

/// What a status payload turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    /// JSON object; known fields refreshed
    Parsed,
    /// JSON, but not an object: fields reset to the placeholder
    Cleared,
    /// Not JSON, or `null`; fields untouched, kept as raw text
    Raw,
}

/// Rendered telemetry fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub speed: String,
    pub battery: String,
    pub status: String,
    /// Last payload that could not be parsed, shown verbatim
    pub raw: Option<String>,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            speed: PLACEHOLDER.to_string(),
            battery: PLACEHOLDER.to_string(),
            status: PLACEHOLDER.to_string(),
            raw: None,
        }
    }
}

impl StatusView {
    /// Apply one inbound status payload
    ///
    /// A JSON object refreshes every known field (missing ones fall back to
    /// the placeholder). Any other payload is stored in `raw`.
    pub fn apply(&mut self, payload: &str) -> StatusUpdate {
        match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(fields)) => {
                self.speed = render_field(&fields, "speed");
                self.battery = render_field(&fields, "battery");
                self.status = render_field(&fields, "statu");
                self.raw = None;
                StatusUpdate::Parsed
            },
            Ok(Value::Null) | Err(_) => {
                self.raw = Some(payload.to_string());
                StatusUpdate::Raw
            },
            Ok(_) => {
                self.speed = PLACEHOLDER.to_string();
                self.battery = PLACEHOLDER.to_string();
                self.status = PLACEHOLDER.to_string();
                self.raw = Some(payload.to_string());
                StatusUpdate::Cleared
            },
        }
    }
}

fn render_field(fields: &Map<String, Value>, name: &str) -> String {
    match fields.get(name) {
        None | Some(Value::Null) => PLACEHOLDER.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
