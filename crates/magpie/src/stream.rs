use serde_json::{Map, Value};

/// One event observed on a run stream, discriminated by the SSE `event` tag.
///
/// Payload shapes vary per graph deployment, so the carried data stays
/// loosely typed; the reducer applies its own shape checks per variant.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Whole-state snapshot; may carry the terminal `final_report`.
    Values(Value),
    /// Incremental message payload; the only source of visible typing.
    Messages(Value),
    /// Per-node outputs keyed by node name.
    Updates(Map<String, Value>),
}

impl StreamEvent {
    /// Map a decoded frame onto an event. Unknown tags and payload shapes
    /// the reducer cannot consume yield `None` and are skipped upstream.
    pub fn from_parts(event: &str, data: Value) -> Option<StreamEvent> {
        match event {
            "values" => Some(StreamEvent::Values(data)),
            "messages" => Some(StreamEvent::Messages(data)),
            "updates" => match data {
                Value::Object(map) => Some(StreamEvent::Updates(map)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Incremental decoder for `text/event-stream` bodies. Frames are separated
/// by a blank line; partial frames stay buffered until the next chunk.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
    }

    /// Next complete frame, if the buffer holds one.
    pub fn next_frame(&mut self) -> Option<String> {
        let pos = self.buffer.find("\n\n")?;
        let frame = self.buffer[..pos].to_string();
        self.buffer.drain(..pos + 2);
        Some(frame)
    }
}

/// Decode one SSE frame into a stream event.
///
/// Frames missing an `event:` field or JSON `data:` payload are dropped, as
/// are tags the reducer does not consume. Malformed frames never abort the
/// stream.
pub fn decode_frame(frame: &str) -> Option<StreamEvent> {
    let mut event = String::new();
    let mut data = String::new();

    for line in frame.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = line.strip_prefix("event:") {
            event = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.trim_start());
        }
    }

    if event.is_empty() || data.is_empty() {
        return None;
    }

    let value: Value = serde_json::from_str(&data).ok()?;
    StreamEvent::from_parts(&event, value)
}
