pub mod extract;
pub mod kind;

pub use extract::Extractor;
pub use kind::{detect, detect_type, ArchiveType, DetectedArchive};
