//! Segment planning for Static Large Object uploads.
//!
//! Computes the effective segment size and count for a source file under the
//! provider's segment-count ceiling, and splits the file into byte ranges.

mod plan;
mod range;

pub use plan::{plan_upload, PlanLimits, UploadPlan, DEFAULT_MAX_SEGMENTS, MIB};
pub use range::SegmentJob;
