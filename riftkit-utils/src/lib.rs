//! Helpers shared by the riftkit crates

#[cfg(feature = "parsing")]
pub mod parsing;
#[cfg(feature = "guarded_file")]
mod guarded_file;
#[cfg(feature = "guarded_file")]
pub use guarded_file::GuardedFile;

/// Default generic result type
pub type Result<T, E = Box<dyn std::error::Error>> = std::result::Result<T, E>;
