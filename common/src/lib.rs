//! Units and error helpers shared by the motion sensor crates

pub mod error;
pub mod types;
