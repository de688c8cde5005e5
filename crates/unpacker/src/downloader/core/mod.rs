//! Core types used throughout the downloader
//!
//! Errors, events and HTTP helpers that every other downloader module
//! depends on.

pub mod error;
pub mod http;
pub mod progress;

pub use error::{FileOperation, TaskError, TaskResult};
pub use progress::{
    CompositeEventSink, ConsoleEventSink, EventCallback, EventEmitter, EventSink,
    IntoEventCallback, NullEventSink, UnpackEvent, UnpackState,
};
