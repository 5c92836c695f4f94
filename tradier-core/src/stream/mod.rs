//! Market event streaming: line reader, envelopes, and typed dispatch.
//!
//! An [`EventStreamReader`] turns a byte source into [`StreamEnvelope`]s on a
//! bounded channel; a [`StreamDemuxer`] consumes that channel and routes each
//! envelope to the handler registered for its event type.

mod demux;
mod envelope;
mod reader;

pub use demux::{DemuxStats, StreamDemuxer};
pub use envelope::{EventKind, StreamEnvelope};
pub use reader::{EventStreamReader, MAX_RECORD_BYTES};
