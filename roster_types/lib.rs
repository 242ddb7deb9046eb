pub mod collection;
pub mod company;
pub mod errors;

pub use errors::Result;
