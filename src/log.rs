use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug, Serialize)]
pub struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    pub timestamp_ms: i64,
    pub level: LogLevel,
    pub event: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    pub details: Value,
}

impl StructuredLogLine {
    pub fn new(
        level: LogLevel,
        event: &str,
        session_id: &str,
        seed: Option<u32>,
        tick: Option<u64>,
        details: Value,
    ) -> Self {
        Self {
            timestamp_ms: Utc::now().timestamp_millis(),
            level,
            event: event.to_string(),
            session_id: session_id.to_string(),
            seed,
            tick,
            details,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub fn emit_log(
    level: LogLevel,
    event: &str,
    session_id: &str,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let line = StructuredLogLine::new(level, event, session_id, seed, tick, details);
    match line.to_json() {
        Ok(text) => eprintln!("{text}"),
        Err(error) => eprintln!("[log] dropped {event}: {error}"),
    }
}
