//! Progress events surfaced while fetching a repository.

use std::sync::Mutex;

/// Identifies what an [`Event`] is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCode {
    Success,
    DestNotEmpty,
    DestIsEmpty,
    Removed,
    UsingCache,
    FoundMatch,
    FileDoesNotExist,
    Downloading,
    Proxy,
    Extracting,
    FileExists,
    CouldNotFetch,
    CacheFailure,
    UnsafePath,
}

impl EventCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::DestNotEmpty => "DEST_NOT_EMPTY",
            Self::DestIsEmpty => "DEST_IS_EMPTY",
            Self::Removed => "REMOVED",
            Self::UsingCache => "USING_CACHE",
            Self::FoundMatch => "FOUND_MATCH",
            Self::FileDoesNotExist => "FILE_DOES_NOT_EXIST",
            Self::Downloading => "DOWNLOADING",
            Self::Proxy => "PROXY",
            Self::Extracting => "EXTRACTING",
            Self::FileExists => "FILE_EXISTS",
            Self::CouldNotFetch => "COULD_NOT_FETCH",
            Self::CacheFailure => "CACHE_FAILURE",
            Self::UnsafePath => "UNSAFE_PATH",
        }
    }
}

impl std::fmt::Display for EventCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
}

/// A single progress report. `context` carries key/value details such as the URL or path involved.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Event {
    pub level: Level,
    pub code: EventCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<(String, String)>,
}

impl Event {
    pub fn info<S: Into<String>>(code: EventCode, message: S) -> Self {
        Self {
            level: Level::Info,
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn warn<S: Into<String>>(code: EventCode, message: S) -> Self {
        Self {
            level: Level::Warn,
            ..Self::info(code, message)
        }
    }

    pub fn with<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.context.push((key.into(), value.to_string()));
        self
    }

    /// Look up a context value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Receives events as they happen.
pub trait EventSink: Send + Sync {
    fn on_info(&self, event: &Event);
    fn on_warn(&self, event: &Event);

    fn emit(&self, event: Event) {
        log::debug!("{event}");
        match event.level {
            Level::Info => self.on_info(&event),
            Level::Warn => self.on_warn(&event),
        }
    }
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn on_info(&self, event: &Event) {
        log::info!("{}", event.message);
    }

    fn on_warn(&self, event: &Event) {
        log::warn!("{}", event.message);
    }
}

/// Accumulates every event in order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the events received so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn with_code(&self, code: EventCode) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.code == code)
            .collect()
    }

    fn push(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

impl EventSink for EventLog {
    fn on_info(&self, event: &Event) {
        self.push(event);
    }

    fn on_warn(&self, event: &Event) {
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_records_in_order() {
        let log = EventLog::new();
        log.emit(Event::info(EventCode::Downloading, "downloading"));
        log.emit(Event::warn(EventCode::FileDoesNotExist, "gone").with("file", "a.txt"));
        let events = log.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, Level::Info);
        assert_eq!(events[1].level, Level::Warn);
        assert_eq!(events[1].get("file"), Some("a.txt"));
        assert_eq!(log.with_code(EventCode::Downloading).len(), 1);
    }

    #[test]
    fn code_serialises_like_display() {
        let json = serde_json::to_string(&EventCode::FileDoesNotExist).unwrap();
        assert_eq!(json, format!("\"{}\"", EventCode::FileDoesNotExist));
    }
}
