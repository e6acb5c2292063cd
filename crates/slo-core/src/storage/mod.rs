//! Local file primitives: positional reads from the source file and the
//! run directory holding segment files while they await upload.

mod segment_dir;
mod source;

pub use segment_dir::SegmentDir;
pub use source::SourceFile;
