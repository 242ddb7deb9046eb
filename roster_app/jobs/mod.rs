pub mod chunking;
pub mod executor;
pub mod job;
pub mod supervisor;

pub use job::*;
