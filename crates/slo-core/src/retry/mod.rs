//! Retry and backoff policy for object-store requests.
//!
//! Classifies storage errors (timeouts, throttling, connection failures,
//! 5xx) and decides exponential backoff. Used inside the Swift client only;
//! the upload core itself never retries a segment.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
