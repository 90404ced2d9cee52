pub mod error;
pub mod slack;
pub mod timestamp;
