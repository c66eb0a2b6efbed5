//! Small shared helpers.

pub mod duration;

pub use duration::parse_interval;
