pub mod candidate;
pub mod search;

pub use candidate::{
    keep_best, CandidateFile, NamingConvention, DEFAULT_COMPILED_EXTENSION,
    DEFAULT_SOURCE_EXTENSION,
};
pub use search::Locator;
