pub mod config;
pub mod logging;

pub mod budget;
pub mod coordinator;
pub mod error;
pub mod manifest;
pub mod planner;
pub mod progress;
pub mod retry;
pub mod storage;
pub mod store;
pub mod upload;
pub mod worker;

pub use error::{SegmentError, UploadError};
pub use upload::{prepare_upload, upload, UploadOptions, UploadOutcome};
