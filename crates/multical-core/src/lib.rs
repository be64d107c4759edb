//! Core types: canonical events, time windows, tracing setup

pub mod event;
pub mod time;
pub mod tracing;

pub use event::{
    CanonicalAttendee, CanonicalEvent, EventDateTime, EventDraft, ORGANIZER_STATUS,
    UNKNOWN_STATUS,
};
pub use time::TimeWindow;
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
