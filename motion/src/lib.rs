//! MPU9250 motion sensor: register driver and the calibrated wrapper around it

pub mod config;
pub mod motion;
pub mod peripheral;

pub use crate::config::MotionConfig;
pub use crate::motion::Motion;
