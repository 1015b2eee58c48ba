//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and operations
//! - Coordinate conventions shared with the link
//! - Time measurement and fixed time-stepping
//! - Logging utilities

pub mod math;
pub mod coordinates;
pub mod time;
pub mod logging;
