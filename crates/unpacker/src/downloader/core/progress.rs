//! Lifecycle events and event sinks
//!
//! The pipeline reports everything through [`UnpackEvent`]s delivered to an
//! [`EventCallback`]. Front ends either pass a closure directly or implement
//! [`EventSink`] and convert it with [`IntoEventCallback`].

use std::sync::Arc;
use tracing::info;

/// Callback receiving pipeline events
pub type EventCallback = Arc<dyn Fn(UnpackEvent) + Send + Sync>;

/// Phase of an unpack run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackState {
    Idle,
    Downloading,
    UnpackingOverrides,
    Finished,
    Cancelled,
}

impl std::fmt::Display for UnpackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnpackState::Idle => write!(f, "idle"),
            UnpackState::Downloading => write!(f, "downloading"),
            UnpackState::UnpackingOverrides => write!(f, "unpacking overrides"),
            UnpackState::Finished => write!(f, "finished"),
            UnpackState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Events emitted during an unpack run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackEvent {
    StateChanged(UnpackState),
    /// Free-form log line
    Output(String),
    /// Completed tasks as a percentage, 0 to 100
    Progress(u8),
    /// Terminal event, emitted exactly once per dispatched run
    Finished(bool),
}

/// Trait for event handling with per-event hooks
pub trait EventSink: Send + Sync {
    fn on_state_changed(&self, _state: UnpackState) {}
    fn on_output(&self, _line: &str) {}
    fn on_progress(&self, _percent: u8) {}
    fn on_finished(&self, _success: bool) {}
}

/// Extension trait to convert an EventSink into an EventCallback
pub trait IntoEventCallback {
    fn into_callback(self) -> EventCallback;
}

impl<T: EventSink + 'static> IntoEventCallback for T {
    fn into_callback(self) -> EventCallback {
        Arc::new(move |event| match event {
            UnpackEvent::StateChanged(state) => self.on_state_changed(state),
            UnpackEvent::Output(line) => self.on_output(&line),
            UnpackEvent::Progress(percent) => self.on_progress(percent),
            UnpackEvent::Finished(success) => self.on_finished(success),
        })
    }
}

/// Prints events to stdout
#[derive(Debug, Default)]
pub struct ConsoleEventSink {
    pub show_progress: bool,
}

impl ConsoleEventSink {
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }
}

impl EventSink for ConsoleEventSink {
    fn on_state_changed(&self, state: UnpackState) {
        println!("==> {}", state);
    }

    fn on_output(&self, line: &str) {
        println!("{}", line);
    }

    fn on_progress(&self, percent: u8) {
        if self.show_progress {
            println!("[{:>3}%]", percent);
        }
    }

    fn on_finished(&self, success: bool) {
        if success {
            println!("Done.");
        } else {
            println!("Stopped before completion.");
        }
    }
}

/// Event sink that does nothing
#[derive(Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {}

/// Forwards events to multiple sinks
#[derive(Default)]
pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl std::fmt::Debug for CompositeEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeEventSink")
            .field("sinks_count", &self.sinks.len())
            .finish()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink<S: EventSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for CompositeEventSink {
    fn on_state_changed(&self, state: UnpackState) {
        for sink in &self.sinks {
            sink.on_state_changed(state);
        }
    }

    fn on_output(&self, line: &str) {
        for sink in &self.sinks {
            sink.on_output(line);
        }
    }

    fn on_progress(&self, percent: u8) {
        for sink in &self.sinks {
            sink.on_progress(percent);
        }
    }

    fn on_finished(&self, success: bool) {
        for sink in &self.sinks {
            sink.on_finished(success);
        }
    }
}

/// Cloneable handle the pipeline uses to emit events
///
/// Output lines are mirrored to `tracing` so they show up in logs even when
/// the callback discards them.
#[derive(Clone)]
pub struct EventEmitter {
    callback: EventCallback,
}

impl EventEmitter {
    pub fn new(callback: EventCallback) -> Self {
        Self { callback }
    }

    pub fn state(&self, state: UnpackState) {
        (self.callback)(UnpackEvent::StateChanged(state));
    }

    pub fn output<S: Into<String>>(&self, line: S) {
        let line = line.into();
        info!("{}", line);
        (self.callback)(UnpackEvent::Output(line));
    }

    pub fn progress(&self, percent: u8) {
        (self.callback)(UnpackEvent::Progress(percent.min(100)));
    }

    pub fn finished(&self, success: bool) {
        (self.callback)(UnpackEvent::Finished(success));
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(NullEventSink.into_callback())
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl EventSink for RecordingSink {
        fn on_output(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }

        fn on_progress(&self, percent: u8) {
            self.lines.lock().unwrap().push(format!("{percent}%"));
        }
    }

    #[test]
    fn test_composite_forwards_to_every_sink() {
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));
        let composite = CompositeEventSink::new()
            .add_sink(RecordingSink { lines: first.clone() })
            .add_sink(RecordingSink { lines: second.clone() })
            .add_sink(NullEventSink);

        let emitter = EventEmitter::new(composite.into_callback());
        emitter.output("hello");
        emitter.progress(150);

        assert_eq!(*first.lock().unwrap(), vec!["hello".to_string(), "100%".to_string()]);
        assert_eq!(*second.lock().unwrap(), vec!["hello".to_string(), "100%".to_string()]);
    }
}
