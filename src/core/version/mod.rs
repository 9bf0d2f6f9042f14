pub mod vector;

pub use vector::VersionVector;
