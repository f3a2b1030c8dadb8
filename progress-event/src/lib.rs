//! Streaming progress event protocol: type + payload + envelope.
//!
//! This crate defines the wire shape of a single progress event and envelope
//! injection. It has no dependency on the orchestrator; the orchestrator builds
//! `ProgressEvent`s as the pipeline runs and calls `to_json` to serialize them
//! onto a subscriber's channel.

pub mod envelope;
pub mod event;

pub use envelope::{to_json, Envelope, EnvelopeState};
pub use event::ProgressEvent;
