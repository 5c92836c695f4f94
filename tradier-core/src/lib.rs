//! tradier-core
//!
//! Transport-agnostic building blocks of the tradier-rs client:
//! - [`rate_limit`]: estimate when the server's request quota renews.
//! - [`executor`]: bounded retries with backoff and rate-limit aware waits.
//! - [`bisect`]: split oversized history requests into smaller time ranges.
//! - [`stream`]: read and demultiplex newline-delimited market events.
//!
//! The HTTP layer is abstracted behind [`HttpTransport`] and time behind
//! [`Clock`] so every piece can be driven deterministically in tests.
#![warn(missing_docs)]

pub mod backoff;
pub mod bisect;
pub mod clock;
pub mod executor;
pub mod rate_limit;
pub mod stream;
pub mod transport;

pub use backoff::{Backoff, ConstantBackoff, ExponentialBackoff, StopBackoff};
pub use bisect::{MIN_BISECT_SPAN, RangeFetcher, fetch_range};
pub use clock::{Clock, SystemClock};
pub use executor::{RATE_LIMIT_MARGIN, RetryingExecutor};
pub use rate_limit::estimate_wait_until;
pub use stream::{
    DemuxStats, EventKind, EventStreamReader, MAX_RECORD_BYTES, StreamDemuxer, StreamEnvelope,
};
pub use transport::{BodyReader, HttpResponse, HttpTransport, RequestDescriptor};

pub use tradier_types;
