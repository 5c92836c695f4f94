//! Test doubles for tradier-rs.
//!
//! - [`ScriptedTransport`]: replays queued [`MockReply`]s or computes them from
//!   the request, recording every request it sees.
//! - [`ManualClock`]: records retry sleeps and advances time without waiting.
//! - [`line_source`] / [`stream_feed`]: finite and open-ended stream bodies.

mod clock;
mod source;
mod transport;

pub use clock::ManualClock;
pub use source::{StreamFeed, line_source, stream_feed};
pub use transport::{MockReply, ScriptedTransport};
